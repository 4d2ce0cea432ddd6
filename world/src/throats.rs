//! Offline chokepoint analysis.
//!
//! A throat is a degree-2 walkable tile whose removal disconnects two
//! regions, the 1-tile gap an enemy wave has to squeeze through. Tiles with
//! three or more walkable neighbours read as room interior, degree ≤ 2
//! tiles as corridor. A corridor that only closes a loop does not qualify:
//! removing a loop tile disconnects nothing.

use glam::IVec2;
use util::{flood_fill_4, HashSet, DIR_4};

use crate::Level;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Throat {
    pub pos: IVec2,
    /// The two walkable tiles the throat joins.
    pub sides: (IVec2, IVec2),
}

fn degree(level: &Level, p: IVec2) -> usize {
    DIR_4
        .iter()
        .filter(|&&d| level.is_walkable(p + d))
        .count()
}

/// Find all throat tiles of a level.
pub fn find_throats(level: &Level) -> Vec<Throat> {
    let mut out = Vec::new();

    for p in level.walkable_tiles() {
        // Only corridor tiles qualify as throats.
        if degree(level, p) != 2 {
            continue;
        }
        let sides: Vec<IVec2> = DIR_4
            .iter()
            .map(|&d| p + d)
            .filter(|&n| level.is_walkable(n))
            .collect();
        let (a, b) = (sides[0], sides[1]);

        // Loop-only tiles disconnect nothing; check that the two sides
        // actually fall apart when the candidate is removed.
        let reach: HashSet<IVec2> =
            flood_fill_4(a, |t| t != p && level.is_walkable(t)).collect();
        if !reach.contains(&b) {
            out.push(Throat { pos: p, sides: (a, b) });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use glam::ivec2;

    use super::*;
    use crate::DEFAULT_TILE_SIZE;

    fn level_from_rows(rows: &[&str]) -> Level {
        let mut level = Level::blank(
            rows[0].len() as i32,
            rows.len() as i32,
            DEFAULT_TILE_SIZE,
        );
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                if c == '.' {
                    level.set_walkable([x as i32, y as i32], true);
                }
            }
        }
        level
    }

    #[test]
    fn bridge_between_rooms_is_a_throat() {
        let level = level_from_rows(&[
            "#######",
            "#..#..#",
            "#.....#",
            "#..#..#",
            "#######",
        ]);
        let throats = find_throats(&level);
        assert_eq!(
            throats.iter().map(|t| t.pos).collect::<Vec<_>>(),
            vec![ivec2(3, 2)]
        );
    }

    #[test]
    fn loops_have_no_throats() {
        // A ring of corridor; every tile has degree 2 but removal never
        // disconnects the rest.
        let level = level_from_rows(&[
            "#####",
            "#...#",
            "#.#.#",
            "#...#",
            "#####",
        ]);
        assert!(find_throats(&level).is_empty());
    }

    #[test]
    fn room_interior_is_not_a_throat() {
        let level = level_from_rows(&[
            "#####",
            "#...#",
            "#...#",
            "#...#",
            "#####",
        ]);
        assert!(find_throats(&level).is_empty());
    }
}
