use glam::{ivec2, Vec2};
use world::Level;

use crate::{COLLISION_STEP, X_WALL_VISUAL_OFFSET, Y_WALL_VISUAL_OFFSET};

/// Axis-aligned bounding box in tile units, anchored at the top left.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Aabb {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Aabb { x, y, w, h }
    }
}

/// Outcome of a clipped movement attempt.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Clip {
    /// Final position after sweeping as far as the level allows.
    pub moved: Aabb,
    pub blocked_x: bool,
    pub blocked_y: bool,
}

/// Whether the box overlaps any solid tile.
///
/// Sprite art hangs below and right of its logical tile, so the box is
/// shifted by the visual offsets before it is tested against the grid.
fn hits_wall(level: &Level, aabb: &Aabb) -> bool {
    let left = aabb.x - X_WALL_VISUAL_OFFSET;
    let top = aabb.y - Y_WALL_VISUAL_OFFSET;
    let right = left + aabb.w;
    let bottom = top + aabb.h;

    for ty in (top.floor() as i32)..=(bottom.floor() as i32) {
        for tx in (left.floor() as i32)..=(right.floor() as i32) {
            if !level.is_walkable(ivec2(tx, ty)) {
                return true;
            }
        }
    }
    false
}

/// Sweep a box along a displacement, clipping against solid tiles.
///
/// The x axis is resolved fully before the y axis, in fixed
/// [`COLLISION_STEP`] increments, so sliding along a wall keeps the free
/// axis component. The box never ends up inside a wall: each step is taken
/// only if the stepped position is clear.
pub fn predict_and_clip(level: &Level, start: Aabb, delta: Vec2) -> Clip {
    let mut aabb = start;
    let mut blocked_x = false;
    let mut blocked_y = false;

    let mut remaining = delta.x;
    while remaining != 0.0 {
        let step = remaining.clamp(-COLLISION_STEP, COLLISION_STEP);
        let candidate = Aabb {
            x: aabb.x + step,
            ..aabb
        };
        if hits_wall(level, &candidate) {
            blocked_x = true;
            break;
        }
        aabb = candidate;
        remaining -= step;
    }

    let mut remaining = delta.y;
    while remaining != 0.0 {
        let step = remaining.clamp(-COLLISION_STEP, COLLISION_STEP);
        let candidate = Aabb {
            y: aabb.y + step,
            ..aabb
        };
        if hits_wall(level, &candidate) {
            blocked_y = true;
            break;
        }
        aabb = candidate;
        remaining -= step;
    }

    Clip {
        moved: aabb,
        blocked_x,
        blocked_y,
    }
}

#[cfg(test)]
mod tests {
    use glam::vec2;
    use pretty_assertions::assert_eq;

    use super::*;
    use world::DEFAULT_TILE_SIZE;

    fn corridor() -> Level {
        // Walkable strip y=1..=2, x=1..=8, wall at x=4 on row 1.
        let mut level = Level::blank(10, 4, DEFAULT_TILE_SIZE);
        for x in 1..9 {
            level.set_walkable([x, 1], true);
            level.set_walkable([x, 2], true);
        }
        level.set_walkable([4, 1], false);
        level
    }

    #[test]
    fn free_movement_is_unclipped() {
        let level = corridor();
        let start = Aabb::new(1.5, 2.0, 0.5, 0.5);
        let clip = predict_and_clip(&level, start, vec2(1.0, 0.0));
        assert!(!clip.blocked_x);
        assert!(!clip.blocked_y);
        assert!((clip.moved.x - 2.5).abs() < 1e-4);
    }

    #[test]
    fn wall_stops_x_but_keeps_y() {
        let level = corridor();
        // Heading diagonally into the wall column at x=4, row 1.
        let start = Aabb::new(3.0 + X_WALL_VISUAL_OFFSET, 1.2 + Y_WALL_VISUAL_OFFSET, 0.5, 0.5);
        let clip = predict_and_clip(&level, start, vec2(2.0, 0.5));
        assert!(clip.blocked_x);
        assert!(!clip.blocked_y);
        // The y sweep still ran to completion.
        assert!(
            (clip.moved.y - (start.y + 0.5)).abs() < 1e-4,
            "y was {}",
            clip.moved.y
        );
        // Stopped strictly before the wall column.
        assert!(clip.moved.x - X_WALL_VISUAL_OFFSET + clip.moved.w < 4.0);
    }

    #[test]
    fn box_never_ends_inside_wall() {
        let level = corridor();
        let start = Aabb::new(2.0 + X_WALL_VISUAL_OFFSET, 1.0 + Y_WALL_VISUAL_OFFSET, 0.9, 0.9);
        let clip = predict_and_clip(&level, start, vec2(5.0, 0.0));
        assert!(clip.blocked_x);
        assert!(!hits_wall(&level, &clip.moved));
    }

    #[test]
    fn zero_delta_is_identity() {
        let level = corridor();
        let start = Aabb::new(2.0, 1.8, 0.4, 0.4);
        let clip = predict_and_clip(&level, start, Vec2::ZERO);
        assert_eq!(clip.moved, start);
        assert!(!clip.blocked_x && !clip.blocked_y);
    }
}
