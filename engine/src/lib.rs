//! Simulation core: pathfinding, visibility, movement, monsters, spells
//! and the fixed-timestep world tick.

/// Cap on rays cast per field-of-view update.
pub const MAX_FOV_RAYS: usize = 360;

/// How far a sight ray travels before giving up, in tile units.
pub const MAX_RAY_RANGE: f32 = 48.0;

/// Sub-tile sweep increment for collision clipping, in tile units.
pub const COLLISION_STEP: f32 = 0.05;

/// Horizontal shift between a sprite's visual base and its logical tile.
pub const X_WALL_VISUAL_OFFSET: f32 = 0.21;

/// Vertical shift between a sprite's visual base and its logical tile.
pub const Y_WALL_VISUAL_OFFSET: f32 = 0.75;

pub const MAX_DASH_CHARGES: u32 = 5;
pub const DASH_RECHARGE: f32 = 5.0;
pub const DASH_DURATION: f32 = 0.2;
pub const DASH_SPEED_MULTIPLIER: f32 = 3.0;

pub const GRAPPLE_MAX_DISTANCE: i32 = 12;
pub const GRAPPLE_SPEED: f32 = 30.0;
pub const GRAPPLE_DELAY: f32 = 0.1;

pub const FIREBALL_HIT_RADIUS: f32 = 0.75;

/// Vertical bob amplitude for idle monsters, in world units.
pub const BOB_AMPLITUDE: f32 = 1.5;

/// Bob phase advance per tick, in radians.
pub const BOB_FREQUENCY: f32 = 0.15;

mod collision;
pub use collision::{predict_and_clip, Aabb, Clip};

mod fov;
pub use fov::{has_line_of_sight, wall_segments, Fov, Ray, WallSegment};

mod mob;
pub use mob::{Actor, Behavior, Monster};

mod movement;
pub use movement::{MovementController, MoveMode};

mod pathing;
pub use pathing::a_star;

mod progression;
pub use progression::{exp_reward, exp_to_level, Progression};

mod runtime;
pub use runtime::{
    Command, DamageNumber, HitMarker, Player, Runtime,
};

mod save;
pub use save::{ItemSave, PlayerSave, StatsSave};

mod spell;
pub use spell::{
    ActiveSpells, Caster, ChaosRay, CooldownSlot, EffectResolver, Fireball,
    FractalBloom, FractalCanopy, FractalNode, LightningStorm,
    LightningStrike, Spell, SpellInfo, SpellKind,
};
