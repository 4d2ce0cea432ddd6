//! Unopinionated standalone utilities.

mod geom;
pub use geom::{bresenham_line, VecExt, DIR_4};

mod path;
pub use path::flood_fill_4;

mod rng;
pub use rng::{gen_rng, srng, RngExt};

pub type FastHasher = rustc_hash::FxHasher;

/// Map with an efficient hash function.
pub use rustc_hash::FxHashMap as HashMap;

/// Set with an efficient hash function.
pub use rustc_hash::FxHashSet as HashSet;

/// Good default concrete rng.
pub type GameRng = rand_xorshift::XorShiftRng;
