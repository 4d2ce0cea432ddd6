use std::{any::Any, fmt, sync::Arc};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Gameplay markers on a tile.
    #[derive(Copy, Clone, Default, Eq, PartialEq, Debug, Serialize, Deserialize)]
    pub struct TileTags: u8 {
        /// Tile is part of a straight band long enough to dash along.
        const DASH_LANE = 1;
        /// Tile is a valid grappling hook target.
        const GRAPPLE_ANCHOR = 2;
        /// Tile holds a door.
        const DOOR = 4;
    }
}

/// Door state for tiles tagged with [`TileTags::DOOR`].
#[derive(
    Copy, Clone, Default, Eq, PartialEq, Debug, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DoorState {
    #[default]
    None,
    Open,
    Closed,
    Locked,
}

/// Shared handle to renderer-owned image data.
///
/// The world core never inspects the payload. It keeps the handle alive
/// alongside the sprite id so renderers can draw tiles without doing an
/// atlas lookup per frame. Handles compare by identity.
#[derive(Clone)]
pub struct ImageHandle(Arc<dyn Any + Send + Sync>);

impl ImageHandle {
    pub fn new(payload: impl Any + Send + Sync) -> Self {
        ImageHandle(Arc::new(payload))
    }

    /// Recover the renderer-side payload.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl PartialEq for ImageHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageHandle({:p})", Arc::as_ptr(&self.0))
    }
}

/// Source of image handles, implemented by the external asset system.
pub trait Atlas {
    fn image(&self, sprite_id: &str) -> Option<ImageHandle>;
}

/// A sprite stacked on a tile.
#[derive(Clone, Debug, PartialEq)]
pub struct SpriteRef {
    pub id: String,
    pub handle: ImageHandle,
}

/// One cell of the level grid.
///
/// Walkability is stored, not derived: the generator and the editor are the
/// only writers and both maintain the invariant that a tile carrying a
/// blocking sprite and no door is unwalkable, and that an open door is
/// walkable.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tile {
    pub(crate) walkable: bool,
    pub(crate) tags: TileTags,
    pub(crate) sprites: Vec<SpriteRef>,
    pub(crate) door: DoorState,
}

impl Tile {
    /// The out-of-bounds sentinel, an unwalkable tile with nothing on it.
    pub(crate) const SENTINEL: &'static Tile = &Tile {
        walkable: false,
        tags: TileTags::empty(),
        sprites: Vec::new(),
        door: DoorState::None,
    };

    pub fn is_walkable(&self) -> bool {
        self.walkable
    }

    pub fn has_tag(&self, tag: TileTags) -> bool {
        self.tags.contains(tag)
    }

    pub fn tags(&self) -> TileTags {
        self.tags
    }

    pub fn door_state(&self) -> DoorState {
        self.door
    }

    pub fn sprites(&self) -> &[SpriteRef] {
        &self.sprites
    }

    pub fn has_sprite_id(&self, id: &str) -> bool {
        self.sprites.iter().any(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_encoding() {
        assert_eq!(TileTags::DASH_LANE.bits(), 1);
        assert_eq!(TileTags::GRAPPLE_ANCHOR.bits(), 2);
        assert_eq!(TileTags::DOOR.bits(), 4);
        assert_eq!(TileTags::empty().bits(), 0);
    }

    #[test]
    fn handles_compare_by_identity() {
        let a = ImageHandle::new(17u32);
        let b = a.clone();
        let c = ImageHandle::new(17u32);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.payload::<u32>(), Some(&17));
        assert_eq!(a.payload::<i64>(), None);
    }

    #[test]
    fn sentinel_blocks() {
        assert!(!Tile::SENTINEL.is_walkable());
        assert!(Tile::SENTINEL.tags().is_empty());
    }
}
