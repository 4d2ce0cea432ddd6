use glam::IVec2;
use pathfinding::prelude::astar;
use util::{VecExt, DIR_4};
use world::Level;

/// Shortest 4-connected path over walkable tiles.
///
/// The returned path includes both the start and the goal tile. Neighbor
/// expansion follows [`DIR_4`], so equal-cost routes always resolve the same
/// way for a given level.
pub fn a_star(level: &Level, start: IVec2, goal: IVec2) -> Option<Vec<IVec2>> {
    if !level.is_walkable(start) || !level.is_walkable(goal) {
        return None;
    }

    let (path, _cost) = astar(
        &start,
        |&p| {
            DIR_4
                .iter()
                .map(move |&d| (p + d, 1))
                .filter(|(q, _)| level.is_walkable(*q))
                .collect::<Vec<_>>()
        },
        |&p| (goal - p).taxi_len(),
        |&p| p == goal,
    )?;
    Some(path)
}

#[cfg(test)]
mod tests {
    use glam::ivec2;
    use pretty_assertions::assert_eq;

    use super::*;
    use world::DEFAULT_TILE_SIZE;

    fn open_level(w: i32, h: i32) -> Level {
        let mut level = Level::blank(w, h, DEFAULT_TILE_SIZE);
        for y in 0..h {
            for x in 0..w {
                level.set_walkable([x, y], true);
            }
        }
        level
    }

    #[test]
    fn straight_line_path() {
        let level = open_level(8, 8);
        let path = a_star(&level, ivec2(1, 1), ivec2(5, 1)).unwrap();
        assert_eq!(path.first(), Some(&ivec2(1, 1)));
        assert_eq!(path.last(), Some(&ivec2(5, 1)));
        assert_eq!(path.len(), 5);
    }

    #[test]
    fn no_path_through_walls() {
        let mut level = open_level(8, 8);
        for y in 0..8 {
            level.set_walkable([4, y], false);
        }
        assert_eq!(a_star(&level, ivec2(1, 1), ivec2(6, 1)), None);
    }

    #[test]
    fn unwalkable_endpoints_fail_fast() {
        let level = open_level(4, 4);
        assert_eq!(a_star(&level, ivec2(-1, 0), ivec2(2, 2)), None);
        let mut level = level;
        level.set_walkable([2, 2], false);
        assert_eq!(a_star(&level, ivec2(0, 0), ivec2(2, 2)), None);
    }

    #[test]
    fn trivial_path_is_just_the_start() {
        let level = open_level(4, 4);
        assert_eq!(
            a_star(&level, ivec2(2, 2), ivec2(2, 2)),
            Some(vec![ivec2(2, 2)])
        );
    }
}
