//! Generator invariants checked over a representative seed range.

use glam::IVec2;
use util::{flood_fill_4, HashSet, DIR_4};
use world::{generate_full, mapgen::GenParams, Level, TileTags};

const SEEDS: std::ops::RangeInclusive<u64> = 1..=24;

fn connected_component_count(level: &Level) -> usize {
    let mut seen: HashSet<IVec2> = HashSet::default();
    let mut comps = 0;
    for p in level.walkable_tiles() {
        if seen.contains(&p) {
            continue;
        }
        seen.extend(flood_fill_4(p, |t| level.is_walkable(t)));
        comps += 1;
    }
    comps
}

#[test]
fn walkable_set_is_connected() {
    for seed in SEEDS {
        let level = generate_full(&GenParams::with_seed(seed)).level;
        assert_eq!(
            connected_component_count(&level),
            1,
            "seed {seed} produced a split level"
        );
    }
}

#[test]
fn floor_coverage_in_window() {
    for seed in SEEDS {
        let level = generate_full(&GenParams::with_seed(seed)).level;
        let coverage = level.floor_coverage();
        assert!(
            (0.42..=0.55).contains(&coverage),
            "seed {seed}: coverage {coverage}"
        );
    }
}

#[test]
fn every_room_has_a_grapple_anchor() {
    for seed in SEEDS {
        let out = generate_full(&GenParams::with_seed(seed));
        for room in &out.rooms {
            assert!(
                room.tiles().any(|p| out
                    .level
                    .has_tag(p, TileTags::GRAPPLE_ANCHOR)),
                "seed {seed}: room {room:?} has no anchor"
            );
        }
    }
}

#[test]
fn dash_lane_runs_on_both_axes() {
    for seed in SEEDS {
        let out = generate_full(&GenParams::with_seed(seed));
        let (h, v) = out.dash_runs;
        assert!(h >= 3, "seed {seed}: only {h} horizontal dash runs");
        assert!(v >= 3, "seed {seed}: only {v} vertical dash runs");
    }
}

#[test]
fn border_ring_is_solid() {
    for seed in SEEDS {
        let level = generate_full(&GenParams::with_seed(seed)).level;
        let (w, h) = (level.width(), level.height());
        for x in 0..w {
            assert!(!level.is_walkable([x, 0]));
            assert!(!level.is_walkable([x, h - 1]));
        }
        for y in 0..h {
            assert!(!level.is_walkable([0, y]));
            assert!(!level.is_walkable([w - 1, y]));
        }
    }
}

#[test]
fn default_params_hit_room_count() {
    for seed in SEEDS {
        let out = generate_full(&GenParams::with_seed(seed));
        assert!(
            out.rooms.len() >= 9,
            "seed {seed}: only {} rooms",
            out.rooms.len()
        );
        assert!(out.rooms.len() <= 12);
    }
}

#[test]
fn dash_lanes_are_walkable_bands() {
    let out = generate_full(&GenParams::with_seed(1));
    for p in out.level.walkable_tiles() {
        if out.level.has_tag(p, TileTags::DASH_LANE) {
            assert!(out.level.is_walkable(p));
        }
    }
}

#[test]
fn tagged_anchors_sit_on_walkable_tiles() {
    for seed in SEEDS {
        let level = generate_full(&GenParams::with_seed(seed)).level;
        for (p, tile) in level.iter() {
            if tile.has_tag(TileTags::GRAPPLE_ANCHOR) {
                // An anchor you cannot reach is useless; it must sit on or
                // next to open floor.
                assert!(
                    tile.is_walkable()
                        || DIR_4.iter().any(|&d| level.is_walkable(p + d)),
                    "seed {seed}: stranded anchor at {p}"
                );
            }
        }
    }
}
