use glam::{IVec2, Vec2};
use util::{bresenham_line, HashSet};
use world::Level;

use crate::{MAX_FOV_RAYS, MAX_RAY_RANGE};

/// One face of an unwalkable tile, in tile units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WallSegment {
    pub a: Vec2,
    pub b: Vec2,
    /// The solid tile this face belongs to.
    pub tile: IVec2,
}

/// Derive occluder segments from the level.
///
/// Only faces exposed to walkable floor are emitted; interior faces between
/// two solid tiles can never be hit by a ray that started on the floor.
pub fn wall_segments(level: &Level) -> Vec<WallSegment> {
    let mut segs = Vec::new();
    for (p, tile) in level.iter() {
        if tile.is_walkable() {
            continue;
        }
        let (x, y) = (p.x as f32, p.y as f32);
        // (face endpoints, neighbor offset)
        let faces = [
            (Vec2::new(x, y), Vec2::new(x + 1.0, y), IVec2::new(0, -1)),
            (
                Vec2::new(x, y + 1.0),
                Vec2::new(x + 1.0, y + 1.0),
                IVec2::new(0, 1),
            ),
            (Vec2::new(x, y), Vec2::new(x, y + 1.0), IVec2::new(-1, 0)),
            (
                Vec2::new(x + 1.0, y),
                Vec2::new(x + 1.0, y + 1.0),
                IVec2::new(1, 0),
            ),
        ];
        for (a, b, n) in faces {
            if level.is_walkable(p + n) {
                segs.push(WallSegment { a, b, tile: p });
            }
        }
    }
    segs
}

/// A cast ray: direction, clipped endpoint and the tile that stopped it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    pub dir: Vec2,
    pub end: Vec2,
    pub hit: Option<IVec2>,
}

/// Rotating field of view with a persistent fog-of-war mask.
///
/// The ray fan is memoized by the origin's integer tile; moving within a
/// tile reuses the previous fan. [`Fov::invalidate`] forces a recompute
/// after the level changes under the same origin.
#[derive(Clone, Debug)]
pub struct Fov {
    width: i32,
    height: i32,
    rays: Vec<Ray>,
    visible: HashSet<IVec2>,
    seen: Vec<bool>,
    origin_tile: Option<IVec2>,
    dirty: bool,
    recomputes: u32,
}

impl Fov {
    pub fn new(width: i32, height: i32) -> Self {
        Fov {
            width: width.max(0),
            height: height.max(0),
            rays: Vec::new(),
            visible: HashSet::default(),
            seen: vec![false; (width.max(0) * height.max(0)) as usize],
            origin_tile: None,
            dirty: true,
            recomputes: 0,
        }
    }

    pub fn rays(&self) -> &[Ray] {
        &self.rays
    }

    pub fn is_visible(&self, tile: IVec2) -> bool {
        self.visible.contains(&tile)
    }

    pub fn is_seen(&self, tile: IVec2) -> bool {
        if tile.x < 0 || tile.y < 0 || tile.x >= self.width || tile.y >= self.height
        {
            return false;
        }
        self.seen[(tile.y * self.width + tile.x) as usize]
    }

    /// Row-major ever-seen bitmap, for renderer dimming.
    pub fn seen_mask(&self) -> &[bool] {
        &self.seen
    }

    /// How many times the fan has actually been recast.
    pub fn recompute_count(&self) -> u32 {
        self.recomputes
    }

    /// Force the next update to recast even if the origin tile is unchanged.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Recast the fan from the given origin if needed.
    pub fn update(&mut self, origin: Vec2, walls: &[WallSegment]) {
        let tile = origin.floor().as_ivec2();
        if self.origin_tile == Some(tile) && !self.dirty {
            return;
        }
        self.origin_tile = Some(tile);
        self.dirty = false;
        self.recomputes += 1;

        self.rays.clear();
        self.visible.clear();
        self.mark(tile);

        for i in 0..MAX_FOV_RAYS {
            let angle =
                i as f32 * std::f32::consts::TAU / MAX_FOV_RAYS as f32;
            let dir = Vec2::from_angle(angle);
            let ray = cast_ray(origin, dir, walls);

            for p in bresenham_line(tile, ray.end.floor().as_ivec2()) {
                self.mark(p);
            }
            if let Some(hit) = ray.hit {
                self.mark(hit);
            } else {
                self.mark(ray.end.floor().as_ivec2());
            }
            self.rays.push(ray);
        }
    }

    fn mark(&mut self, tile: IVec2) {
        self.visible.insert(tile);
        if tile.x >= 0
            && tile.y >= 0
            && tile.x < self.width
            && tile.y < self.height
        {
            self.seen[(tile.y * self.width + tile.x) as usize] = true;
        }
    }
}

/// Clip one ray against every wall segment, keeping the nearest hit.
fn cast_ray(origin: Vec2, dir: Vec2, walls: &[WallSegment]) -> Ray {
    let d = dir * MAX_RAY_RANGE;
    let mut best_t = 1.0f32;
    let mut hit = None;

    for seg in walls {
        let s = seg.b - seg.a;
        let denom = d.perp_dot(s);
        if denom == 0.0 {
            continue;
        }
        let ao = seg.a - origin;
        let t = ao.perp_dot(s) / denom;
        let u = ao.perp_dot(d) / denom;
        if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) && t < best_t {
            best_t = t;
            hit = Some(seg.tile);
        }
    }

    Ray {
        dir,
        end: origin + d * best_t,
        hit,
    }
}

/// True when no solid tile lies strictly between the two endpoints.
pub fn has_line_of_sight(level: &Level, a: IVec2, b: IVec2) -> bool {
    bresenham_line(a, b).skip(1).all(|p| level.is_walkable(p))
}

#[cfg(test)]
mod tests {
    use glam::{ivec2, vec2};
    use pretty_assertions::assert_eq;

    use super::*;
    use world::DEFAULT_TILE_SIZE;

    fn open_field(w: i32, h: i32) -> Level {
        let mut level = Level::blank(w, h, DEFAULT_TILE_SIZE);
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                level.set_walkable([x, y], true);
            }
        }
        level
    }

    #[test]
    fn interior_faces_are_skipped() {
        // A 2x1 solid block inside open floor has 6 exposed faces, not 8.
        let mut level = open_field(8, 8);
        level.set_walkable([3, 3], false);
        level.set_walkable([4, 3], false);
        let segs = wall_segments(&level);
        assert_eq!(
            segs.iter().filter(|s| s.tile == ivec2(3, 3)).count(),
            3
        );
        assert_eq!(
            segs.iter().filter(|s| s.tile == ivec2(4, 3)).count(),
            3
        );
    }

    #[test]
    fn fan_is_memoized_by_origin_tile() {
        let level = open_field(12, 12);
        let walls = wall_segments(&level);
        let mut fov = Fov::new(12, 12);

        fov.update(vec2(5.2, 5.2), &walls);
        fov.update(vec2(5.8, 5.6), &walls);
        assert_eq!(fov.recompute_count(), 1);

        fov.update(vec2(6.1, 5.6), &walls);
        assert_eq!(fov.recompute_count(), 2);

        fov.invalidate();
        fov.update(vec2(6.1, 5.6), &walls);
        assert_eq!(fov.recompute_count(), 3);
    }

    #[test]
    fn seen_mask_accumulates() {
        let level = open_field(12, 12);
        let walls = wall_segments(&level);
        let mut fov = Fov::new(12, 12);

        fov.update(vec2(2.5, 2.5), &walls);
        assert!(fov.is_seen(ivec2(2, 2)));

        fov.update(vec2(9.5, 9.5), &walls);
        // No longer visible, still seen.
        assert!(!fov.is_visible(ivec2(2, 2)) || fov.is_seen(ivec2(2, 2)));
        assert!(fov.is_seen(ivec2(2, 2)));
        assert!(fov.is_seen(ivec2(9, 9)));
    }

    #[test]
    fn walls_block_visibility() {
        let mut level = open_field(12, 12);
        for y in 1..11 {
            level.set_walkable([6, y], false);
        }
        let walls = wall_segments(&level);
        let mut fov = Fov::new(12, 12);
        fov.update(vec2(2.5, 5.5), &walls);

        assert!(fov.is_visible(ivec2(4, 5)));
        assert!(!fov.is_visible(ivec2(9, 5)));
    }

    #[test]
    fn los_excludes_endpoints() {
        let mut level = open_field(10, 10);
        level.set_walkable([5, 5], false);

        assert!(has_line_of_sight(&level, ivec2(2, 5), ivec2(4, 5)));
        assert!(!has_line_of_sight(&level, ivec2(2, 5), ivec2(8, 5)));
        // A solid endpoint does not block sight to itself.
        assert!(has_line_of_sight(&level, ivec2(4, 5), ivec2(5, 5)));
    }
}
