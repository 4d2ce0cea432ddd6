use std::collections::VecDeque;

use glam::IVec2;

use crate::{HashSet, DIR_4};

/// Flood-fill the 4-connected component of cells satisfying a predicate,
/// starting from `seed`.
pub fn flood_fill_4(
    seed: IVec2,
    mut pred: impl FnMut(IVec2) -> bool,
) -> impl Iterator<Item = IVec2> {
    let mut edge = VecDeque::from([seed]);
    let mut seen: HashSet<IVec2> = HashSet::default();

    std::iter::from_fn(move || {
        while let Some(p) = edge.pop_front() {
            if seen.contains(&p) || !pred(p) {
                continue;
            }
            seen.insert(p);
            for d in DIR_4 {
                edge.push_back(p + d);
            }
            return Some(p);
        }
        None
    })
}

#[cfg(test)]
mod tests {
    use glam::ivec2;

    use super::*;

    #[test]
    fn fill_is_bounded() {
        // 3x3 open box around origin.
        let cells: Vec<IVec2> = flood_fill_4(ivec2(0, 0), |p| {
            p.x.abs() <= 1 && p.y.abs() <= 1
        })
        .collect();
        assert_eq!(cells.len(), 9);
    }

    #[test]
    fn fill_respects_predicate() {
        assert_eq!(flood_fill_4(ivec2(0, 0), |_| false).count(), 0);

        // A wall at x == 0 splits the band in two, seed is on the left.
        let cells: Vec<IVec2> = flood_fill_4(ivec2(-2, 0), |p| {
            p.x != 0 && p.x.abs() <= 2 && p.y == 0
        })
        .collect();
        assert_eq!(cells.len(), 2);
    }

}
