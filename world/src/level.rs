use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::{Atlas, DoorState, ImageHandle, SpriteRef, Tile, TileTags};

/// A rectangular grid of tiles.
///
/// Coordinates run x east, y south. All reads outside the grid resolve to
/// an unwalkable sentinel tile and all writes outside the grid are ignored,
/// so callers never need to bounds-check.
#[derive(Clone, Debug, PartialEq)]
pub struct Level {
    width: i32,
    height: i32,
    tile_size: f32,
    tiles: Vec<Tile>,
}

impl Level {
    /// Create a level of entirely unwalkable, empty tiles.
    pub fn blank(width: i32, height: i32, tile_size: f32) -> Self {
        let (width, height) = (width.max(0), height.max(0));
        Level {
            width,
            height,
            tile_size,
            tiles: vec![Tile::default(); (width * height) as usize],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn in_bounds(&self, pos: impl Into<IVec2>) -> bool {
        let pos = pos.into();
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    fn idx(&self, pos: IVec2) -> usize {
        (pos.y * self.width + pos.x) as usize
    }

    pub fn tile(&self, pos: impl Into<IVec2>) -> &Tile {
        let pos = pos.into();
        if self.in_bounds(pos) {
            &self.tiles[self.idx(pos)]
        } else {
            Tile::SENTINEL
        }
    }

    fn tile_mut(&mut self, pos: IVec2) -> Option<&mut Tile> {
        if self.in_bounds(pos) {
            let i = self.idx(pos);
            Some(&mut self.tiles[i])
        } else {
            None
        }
    }

    pub fn is_walkable(&self, pos: impl Into<IVec2>) -> bool {
        self.tile(pos).is_walkable()
    }

    pub fn set_walkable(&mut self, pos: impl Into<IVec2>, walkable: bool) {
        if let Some(t) = self.tile_mut(pos.into()) {
            t.walkable = walkable;
        }
    }

    pub fn has_tag(&self, pos: impl Into<IVec2>, tag: TileTags) -> bool {
        self.tile(pos).has_tag(tag)
    }

    pub fn set_tag(&mut self, pos: impl Into<IVec2>, tag: TileTags, on: bool) {
        if let Some(t) = self.tile_mut(pos.into()) {
            t.tags.set(tag, on);
        }
    }

    /// Set the door state of a tile, keeping the door tag and walkability
    /// consistent: an open door is walkable, any door state tags the tile.
    pub fn set_door_state(&mut self, pos: impl Into<IVec2>, state: DoorState) {
        if let Some(t) = self.tile_mut(pos.into()) {
            t.door = state;
            t.tags.set(TileTags::DOOR, state != DoorState::None);
            match state {
                DoorState::Open => t.walkable = true,
                DoorState::Closed | DoorState::Locked => t.walkable = false,
                DoorState::None => {}
            }
        }
    }

    pub fn add_sprite(
        &mut self,
        pos: impl Into<IVec2>,
        id: impl Into<String>,
        handle: ImageHandle,
    ) {
        if let Some(t) = self.tile_mut(pos.into()) {
            t.sprites.push(SpriteRef {
                id: id.into(),
                handle,
            });
        }
    }

    pub fn remove_last_sprite(
        &mut self,
        pos: impl Into<IVec2>,
    ) -> Option<SpriteRef> {
        self.tile_mut(pos.into()).and_then(|t| t.sprites.pop())
    }

    pub fn clear_sprites(&mut self, pos: impl Into<IVec2>) {
        if let Some(t) = self.tile_mut(pos.into()) {
            t.sprites.clear();
        }
    }

    pub fn has_sprite_id(&self, pos: impl Into<IVec2>, id: &str) -> bool {
        self.tile(pos).has_sprite_id(id)
    }

    /// Iterate all tiles with their positions in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (IVec2, &Tile)> {
        let w = self.width;
        self.tiles
            .iter()
            .enumerate()
            .map(move |(i, t)| (IVec2::new(i as i32 % w, i as i32 / w), t))
    }

    pub fn walkable_tiles(&self) -> impl Iterator<Item = IVec2> + '_ {
        self.iter()
            .filter(|(_, t)| t.is_walkable())
            .map(|(p, _)| p)
    }

    /// Fraction of all tiles that are walkable.
    pub fn floor_coverage(&self) -> f32 {
        if self.tiles.is_empty() {
            return 0.0;
        }
        self.walkable_tiles().count() as f32 / self.tiles.len() as f32
    }

    pub fn save(&self) -> LevelSave {
        LevelSave {
            width: self.width,
            height: self.height,
            tile_size: self.tile_size,
            tiles: (0..self.height)
                .map(|y| {
                    (0..self.width)
                        .map(|x| {
                            let t = self.tile([x, y]);
                            TileSave {
                                sprites: t
                                    .sprites
                                    .iter()
                                    .map(|s| s.id.clone())
                                    .collect(),
                                walkable: t.walkable,
                                tags: t.tags.bits(),
                                door: t.door,
                            }
                        })
                        .collect()
                })
                .collect(),
        }
    }

    /// Rebuild a level from its save model, resolving sprite handles through
    /// the atlas. Sprites whose id the atlas does not know are skipped.
    pub fn from_save(save: &LevelSave, atlas: &impl Atlas) -> Self {
        let mut level =
            Level::blank(save.width, save.height, save.tile_size);
        for (y, row) in save.tiles.iter().enumerate().take(save.height as usize)
        {
            for (x, ts) in row.iter().enumerate().take(save.width as usize) {
                let pos = IVec2::new(x as i32, y as i32);
                for id in &ts.sprites {
                    match atlas.image(id) {
                        Some(handle) => level.add_sprite(pos, id, handle),
                        None => {
                            log::warn!("unknown sprite id {id:?}, skipping")
                        }
                    }
                }
                level.set_walkable(pos, ts.walkable);
                if let Some(t) = level.tile_mut(pos) {
                    t.tags = TileTags::from_bits_truncate(ts.tags);
                    t.door = ts.door;
                }
            }
        }
        level
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.save())
            .expect("level save is always serializable")
    }

    pub fn from_json(json: &str, atlas: &impl Atlas) -> anyhow::Result<Self> {
        let save: LevelSave = serde_json::from_str(json)?;
        Ok(Level::from_save(&save, atlas))
    }
}

/// Thin JSON model of a level, image handles stripped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelSave {
    pub width: i32,
    pub height: i32,
    pub tile_size: f32,
    pub tiles: Vec<Vec<TileSave>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TileSave {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sprites: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub walkable: bool,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub tags: u8,
    #[serde(default, skip_serializing_if = "is_no_door")]
    pub door: DoorState,
}

fn is_zero(n: &u8) -> bool {
    *n == 0
}

fn is_no_door(d: &DoorState) -> bool {
    *d == DoorState::None
}
