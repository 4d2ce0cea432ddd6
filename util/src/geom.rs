use glam::{ivec2, IVec2};

/// 4 directions in the fixed iteration order used by grid searches.
///
/// Changing the order changes pathfinding tie-breaks, so it is part of the
/// deterministic surface of the engine.
pub const DIR_4: [IVec2; 4] = [
    IVec2::from_array([0, 1]),
    IVec2::from_array([1, 0]),
    IVec2::from_array([0, -1]),
    IVec2::from_array([-1, 0]),
];

pub trait VecExt: Sized + Default {
    /// Absolute size of vector in taxicab metric.
    fn taxi_len(&self) -> i32;

    /// Absolute size of vector in chessboard metric.
    fn cheb_len(&self) -> i32;

    /// Vec points to an adjacent cell, left, right, up or down.
    fn is_adjacent(&self) -> bool {
        self.taxi_len() == 1
    }
}

impl VecExt for IVec2 {
    fn taxi_len(&self) -> i32 {
        self[0].abs() + self[1].abs()
    }

    fn cheb_len(&self) -> i32 {
        self[0].abs().max(self[1].abs())
    }
}

/// Walk the grid cells of a line segment, excluding the end cell.
pub fn bresenham_line(
    a: impl Into<IVec2>,
    b: impl Into<IVec2>,
) -> impl Iterator<Item = IVec2> {
    let (a, b): (IVec2, IVec2) = (a.into(), b.into());

    let d = b - a;
    let step = d.signum();
    let d = d.abs() * ivec2(1, -1);
    let mut p = a;
    let mut err = d.x + d.y;

    std::iter::from_fn(move || {
        if p == b {
            None
        } else {
            let ret = p;

            let e2 = 2 * err;
            if e2 >= d.y {
                err += d.y;
                p.x += step.x;
            }
            if e2 <= d.x {
                err += d.x;
                p.y += step.y;
            }
            Some(ret)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxi_and_cheb() {
        assert_eq!(ivec2(3, -4).taxi_len(), 7);
        assert_eq!(ivec2(3, -4).cheb_len(), 4);
        assert!(ivec2(0, -1).is_adjacent());
        assert!(!ivec2(1, -1).is_adjacent());
    }

    #[test]
    fn bresenham_endpoints() {
        let pts: Vec<IVec2> = bresenham_line([0, 0], [4, 2]).collect();
        assert_eq!(pts[0], ivec2(0, 0));
        assert!(!pts.contains(&ivec2(4, 2)));
        assert_eq!(pts.len(), 4);

        // Degenerate segment yields nothing.
        assert_eq!(bresenham_line([2, 2], [2, 2]).count(), 0);
    }
}
