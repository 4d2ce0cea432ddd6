//! Game world data model and procedural generation.

mod tile;
pub use tile::{Atlas, DoorState, ImageHandle, SpriteRef, Tile, TileTags};

mod level;
pub use level::{Level, LevelSave, TileSave};

mod layers;
pub use layers::{LayerLink, LayeredLevel, LayeredLevelSave};

pub mod mapgen;
pub use mapgen::{generate, generate_full, GenOutput, GenParams, Rect};

pub mod throats;
pub use throats::{find_throats, Throat};

/// Default edge length of a tile in world units.
pub const DEFAULT_TILE_SIZE: f32 = 64.0;
