use std::hash::{Hash, Hasher};

use rand::prelude::*;

use crate::GameRng;

/// Construct the deterministic generator rng for a given seed.
///
/// The seed is split into two halves, `seed` and `seed XOR 0xface`, so the
/// full xorshift state is populated and small numeric seeds still diverge
/// from each other immediately.
pub fn gen_rng(seed: u64) -> GameRng {
    let mut state = [0u8; 16];
    state[..8].copy_from_slice(&seed.to_le_bytes());
    state[8..].copy_from_slice(&(seed ^ 0xface).to_le_bytes());
    GameRng::from_seed(state)
}

/// Construct a throwaway random number generator seeded by a noise value.
///
/// Good for short-term use in immutable contexts given a varying source of
/// noise like map position coordinates. Also used to fork the runtime
/// effect stream off the level seed without disturbing generation.
pub fn srng(seed: &(impl Hash + ?Sized)) -> GameRng {
    let mut h = crate::FastHasher::default();
    seed.hash(&mut h);
    GameRng::seed_from_u64(h.finish())
}

pub trait RngExt {
    fn one_chance_in(&mut self, n: usize) -> bool;
}

impl<T: Rng + ?Sized> RngExt for T {
    fn one_chance_in(&mut self, n: usize) -> bool {
        if n == 0 {
            return false;
        }
        self.gen_range(0..n) == 0
    }
}
