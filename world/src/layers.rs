use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::{Atlas, Level, LevelSave};

/// A connection between tiles on two layers, such as a stairwell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerLink {
    pub from_layer: usize,
    pub from_tile: IVec2,
    pub to_layer: usize,
    pub to_tile: IVec2,
    /// Sprite id that marks the trigger tile, for renderers and editors.
    pub trigger_sprite: String,
    pub one_way: bool,
}

/// An ordered stack of levels with exactly one active at a time.
///
/// Switching layers never mutates the layers themselves, so anything cached
/// against an inactive layer stays valid.
#[derive(Clone, Debug, PartialEq)]
pub struct LayeredLevel {
    layers: Vec<Level>,
    active: usize,
    links: Vec<LayerLink>,
}

impl LayeredLevel {
    pub fn new(layers: Vec<Level>) -> Self {
        assert!(!layers.is_empty(), "layered level needs at least one layer");
        LayeredLevel {
            layers,
            active: 0,
            links: Vec::new(),
        }
    }

    pub fn with_links(mut self, links: Vec<LayerLink>) -> Self {
        self.links = links;
        self
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> &Level {
        &self.layers[self.active]
    }

    pub fn active_mut(&mut self) -> &mut Level {
        &mut self.layers[self.active]
    }

    pub fn layer(&self, i: usize) -> Option<&Level> {
        self.layers.get(i)
    }

    /// Switch the active layer. Out-of-range indices are ignored.
    pub fn activate(&mut self, i: usize) {
        if i < self.layers.len() {
            self.active = i;
        }
    }

    pub fn links(&self) -> &[LayerLink] {
        &self.links
    }

    /// Find the link that can be taken from the given tile on the active
    /// layer. One-way links only match in their forward direction.
    pub fn link_at(&self, tile: IVec2) -> Option<&LayerLink> {
        self.links.iter().find(|l| {
            (l.from_layer == self.active && l.from_tile == tile)
                || (!l.one_way
                    && l.to_layer == self.active
                    && l.to_tile == tile)
        })
    }

    /// Follow a link from the given tile: returns the destination layer and
    /// tile if a link is available.
    pub fn traverse(&mut self, tile: IVec2) -> Option<(usize, IVec2)> {
        let (layer, dest) = {
            let link = self.link_at(tile)?;
            if link.from_layer == self.active && link.from_tile == tile {
                (link.to_layer, link.to_tile)
            } else {
                (link.from_layer, link.from_tile)
            }
        };
        self.activate(layer);
        Some((layer, dest))
    }

    pub fn save(&self) -> LayeredLevelSave {
        LayeredLevelSave {
            layers: self.layers.iter().map(Level::save).collect(),
            active_index: self.active,
            stairwells: self.links.clone(),
        }
    }

    pub fn from_save(save: &LayeredLevelSave, atlas: &impl Atlas) -> Self {
        let mut ret = LayeredLevel::new(
            save.layers
                .iter()
                .map(|s| Level::from_save(s, atlas))
                .collect(),
        )
        .with_links(save.stairwells.clone());
        ret.activate(save.active_index);
        ret
    }
}

/// Thin JSON model of a layered level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayeredLevelSave {
    pub layers: Vec<LevelSave>,
    pub active_index: usize,
    pub stairwells: Vec<LayerLink>,
}

#[cfg(test)]
mod tests {
    use glam::ivec2;

    use super::*;
    use crate::DEFAULT_TILE_SIZE;

    fn stack() -> LayeredLevel {
        LayeredLevel::new(vec![
            Level::blank(8, 8, DEFAULT_TILE_SIZE),
            Level::blank(8, 8, DEFAULT_TILE_SIZE),
        ])
        .with_links(vec![LayerLink {
            from_layer: 0,
            from_tile: ivec2(2, 2),
            to_layer: 1,
            to_tile: ivec2(5, 5),
            trigger_sprite: "stairs_down".into(),
            one_way: false,
        }])
    }

    #[test]
    fn traverse_and_return() {
        let mut s = stack();
        assert_eq!(s.traverse(ivec2(2, 2)), Some((1, ivec2(5, 5))));
        assert_eq!(s.active_index(), 1);

        // Two-way link works backwards from the destination.
        assert_eq!(s.traverse(ivec2(5, 5)), Some((0, ivec2(2, 2))));
        assert_eq!(s.active_index(), 0);
    }

    #[test]
    fn one_way_blocks_return() {
        let mut s = stack();
        if let Some(l) = s.links.first_mut() {
            l.one_way = true;
        }
        assert_eq!(s.traverse(ivec2(2, 2)), Some((1, ivec2(5, 5))));
        assert_eq!(s.traverse(ivec2(5, 5)), None);
        assert_eq!(s.active_index(), 1);
    }

    #[test]
    fn switching_does_not_mutate_layers() {
        let mut s = stack();
        let before = s.layer(0).unwrap().clone();
        s.activate(1);
        s.activate(0);
        assert_eq!(s.layer(0).unwrap(), &before);

        // Out-of-range activation is a no-op.
        s.activate(7);
        assert_eq!(s.active_index(), 0);
    }
}
