//! Deterministic dungeon generation.
//!
//! The pipeline runs a fixed sequence of stages, each deterministic given
//! the seed: BSP regions, Poisson-like room centers, room growth, k-NN
//! candidate edges, spanning tree with extra loops, corridor carving, pinch
//! widening, dash-lane tagging, grapple-anchor placement, dead-end pruning
//! and connectivity repair. Generation is total: degenerate parameters
//! degrade to sparse but usable levels instead of failing.

use std::collections::BTreeSet;

use glam::{ivec2, IVec2};
use rand::prelude::*;
use util::{bresenham_line, flood_fill_4, gen_rng, GameRng, RngExt, DIR_4};

use crate::{Level, TileTags, DEFAULT_TILE_SIZE};

/// Fraction of the grid the room rectangles alone should cover.
///
/// Rooms grow ring by ring until this budget is met; corridors then push
/// the final floor coverage into the guaranteed [0.42, 0.55] window.
const ROOM_FLOOR_BUDGET: f32 = 0.43;

/// Squared minimum distance between accepted room centers.
const CENTER_MIN_DIST_SQ: i32 = 100;

/// Attempt cap when topping up room centers.
const CENTER_ATTEMPTS: usize = 1000;

/// Attempt cap when placing a grapple anchor on a room side.
const ANCHOR_ATTEMPTS: usize = 10;

/// Tuning parameters for dungeon generation.
#[derive(Clone, Debug, PartialEq)]
pub struct GenParams {
    pub seed: u64,
    pub width: i32,
    pub height: i32,
    pub tile_size: f32,
    pub room_count_min: usize,
    pub room_count_max: usize,
    pub room_w_min: i32,
    pub room_w_max: i32,
    pub room_h_min: i32,
    pub room_h_max: i32,
    pub corridor_width: i32,
    pub dash_lane_min_len: i32,
    pub grapple_range: i32,
    /// Extra non-tree corridors beyond the spanning tree.
    pub extras: usize,
    /// Dead-end tails shorter than this are filled back in.
    pub prune_len: usize,
}

impl Default for GenParams {
    fn default() -> Self {
        GenParams {
            seed: 0,
            width: 64,
            height: 64,
            tile_size: DEFAULT_TILE_SIZE,
            room_count_min: 9,
            room_count_max: 12,
            room_w_min: 7,
            room_w_max: 10,
            room_h_min: 7,
            room_h_max: 10,
            corridor_width: 3,
            dash_lane_min_len: 8,
            grapple_range: 12,
            extras: 2,
            prune_len: 3,
        }
    }
}

impl GenParams {
    pub fn with_seed(seed: u64) -> Self {
        GenParams {
            seed,
            ..Default::default()
        }
    }

    fn half_width(&self) -> i32 {
        self.corridor_width / 2
    }
}

/// Axis-aligned integer rectangle used by the generator.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Rect { x, y, w, h }
    }

    pub fn center(&self) -> IVec2 {
        ivec2(self.x + self.w / 2, self.y + self.h / 2)
    }

    pub fn contains(&self, p: IVec2) -> bool {
        p.x >= self.x
            && p.y >= self.y
            && p.x < self.x + self.w
            && p.y < self.y + self.h
    }

    pub fn tiles(&self) -> impl Iterator<Item = IVec2> {
        let (x, y, w, h) = (self.x, self.y, self.w, self.h);
        (y..y + h).flat_map(move |ty| (x..x + w).map(move |tx| ivec2(tx, ty)))
    }
}

/// An index pair into the room list, normalized so `a < b`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct Edge {
    pub a: usize,
    pub b: usize,
}

impl Edge {
    fn new(a: usize, b: usize) -> Self {
        Edge {
            a: a.min(b),
            b: a.max(b),
        }
    }
}

/// Full generator output for callers that need the room layout, such as
/// spawn placement and the test suite.
#[derive(Clone, Debug)]
pub struct GenOutput {
    pub level: Level,
    pub rooms: Vec<Rect>,
    pub centers: Vec<IVec2>,
    /// Maximal horizontal and vertical dash-lane runs tagged.
    pub dash_runs: (usize, usize),
}

/// Generate a level from the given parameters.
pub fn generate(params: &GenParams) -> Level {
    generate_full(params).level
}

/// Generate a level along with the room layout data.
pub fn generate_full(params: &GenParams) -> GenOutput {
    let mut gen = Gen {
        p: params.clone(),
        level: Level::blank(params.width, params.height, params.tile_size),
        rng: gen_rng(params.seed),
    };

    let regions = gen.bsp_regions();
    let seeds = gen.poisson_centers(&regions);
    let rooms = gen.grow_rooms(&seeds);
    let centers: Vec<IVec2> = rooms.iter().map(Rect::center).collect();

    let candidates = knn_edges(&centers, 3);
    let edges = gen.spanning_edges(&centers, &candidates);
    gen.carve_corridors(&rooms, &centers, &edges);
    gen.widen_pinches();
    let dash_runs = gen.tag_dash_lanes();
    gen.place_grapple_anchors(&rooms);
    gen.prune_dead_ends();
    gen.repair_connectivity();

    if rooms.is_empty() {
        log::warn!(
            "generation produced no rooms for params {:?}",
            gen.p
        );
    }

    GenOutput {
        level: gen.level,
        rooms,
        centers,
        dash_runs,
    }
}

struct Gen {
    p: GenParams,
    level: Level,
    rng: GameRng,
}

impl Gen {
    /// Stage 2: recursively split the map into BSP regions.
    fn bsp_regions(&mut self) -> Vec<Rect> {
        let depth = if self.p.room_count_min > 8 { 4 } else { 3 };
        let mut regions = Vec::new();
        let bounds = Rect::new(0, 0, self.p.width, self.p.height);
        self.split(bounds, depth, &mut regions);
        regions
    }

    fn split(&mut self, r: Rect, depth: u32, out: &mut Vec<Rect>) {
        let w_limit = 2 * (self.p.room_w_max + self.p.corridor_width * 2);
        let h_limit = 2 * (self.p.room_h_max + self.p.corridor_width * 2);
        if depth == 0 || (r.w < w_limit && r.h < h_limit) {
            out.push(r);
            return;
        }

        let ratio = self.rng.gen_range(0.4..0.6);
        if r.w >= r.h {
            let s = (r.w as f32 * ratio) as i32;
            if s < 1 || r.w - s < 1 {
                out.push(r);
                return;
            }
            self.split(Rect::new(r.x, r.y, s, r.h), depth - 1, out);
            self.split(Rect::new(r.x + s, r.y, r.w - s, r.h), depth - 1, out);
        } else {
            let s = (r.h as f32 * ratio) as i32;
            if s < 1 || r.h - s < 1 {
                out.push(r);
                return;
            }
            self.split(Rect::new(r.x, r.y, r.w, s), depth - 1, out);
            self.split(Rect::new(r.x, r.y + s, r.w, r.h - s), depth - 1, out);
        }
    }

    /// Stage 3: pick well-separated room centers, roughly one per region.
    fn poisson_centers(&mut self, regions: &[Rect]) -> Vec<IVec2> {
        let mut centers: Vec<IVec2> = Vec::new();

        let far = |centers: &[IVec2], p: IVec2| {
            centers
                .iter()
                .all(|c| (p - *c).length_squared() >= CENTER_MIN_DIST_SQ)
        };

        for r in regions {
            if r.w < 1 || r.h < 1 || self.rng.one_chance_in(5) {
                continue;
            }
            let p = ivec2(
                r.x + self.rng.gen_range(0..r.w),
                r.y + self.rng.gen_range(0..r.h),
            );
            if far(&centers, p) {
                centers.push(p);
            }
        }

        // Top up to the minimum room count with unconstrained samples.
        let mut attempts = 0;
        while centers.len() < self.p.room_count_min
            && attempts < CENTER_ATTEMPTS
            && self.p.width > 0
            && self.p.height > 0
        {
            attempts += 1;
            let p = ivec2(
                self.rng.gen_range(0..self.p.width),
                self.rng.gen_range(0..self.p.height),
            );
            if far(&centers, p) {
                centers.push(p);
            }
        }

        if centers.len() > self.p.room_count_max {
            centers.shuffle(&mut self.rng);
            centers.truncate(self.p.room_count_max);
        }
        centers
    }

    /// Stage 4: place a room rectangle around each center, then grow the
    /// rooms ring by ring until the room floor budget is met.
    fn grow_rooms(&mut self, centers: &[IVec2]) -> Vec<Rect> {
        let margin = self.p.corridor_width;
        let clamp = |mut r: Rect, p: &GenParams| {
            r.x = r.x.clamp(margin, (p.width - margin - r.w).max(margin));
            r.y = r.y.clamp(margin, (p.height - margin - r.h).max(margin));
            r
        };

        let mut rooms: Vec<Rect> = Vec::new();
        for &c in centers {
            let w = self.rng.gen_range(self.p.room_w_min..=self.p.room_w_max);
            let h = self.rng.gen_range(self.p.room_h_min..=self.p.room_h_max);
            let r = Rect::new(c.x - w / 2, c.y - h / 2, w, h);
            rooms.push(clamp(r, &self.p));
        }

        // Grow every room one tile on a rotating side per round until the
        // union of room floors reaches the budget. Rooms are allowed to
        // merge; overlap just reads as a larger open hall.
        let total = (self.p.width * self.p.height).max(1) as f32;
        let mut side = 0;
        for _ in 0..200 {
            if rooms.is_empty()
                || room_floor_area(&rooms) as f32 / total >= ROOM_FLOOR_BUDGET
            {
                break;
            }
            for r in &mut rooms {
                match side % 4 {
                    0 if r.x > margin => {
                        r.x -= 1;
                        r.w += 1;
                    }
                    1 if r.x + r.w < self.p.width - margin => r.w += 1,
                    2 if r.y > margin => {
                        r.y -= 1;
                        r.h += 1;
                    }
                    3 if r.y + r.h < self.p.height - margin => r.h += 1,
                    _ => {}
                }
            }
            side += 1;
        }

        for r in &rooms {
            for p in r.tiles() {
                self.level.set_walkable(p, true);
            }
        }
        rooms
    }

    /// Stage 6: Prim spanning tree over room centers plus a few extra loops
    /// from the k-NN candidate set.
    fn spanning_edges(
        &mut self,
        centers: &[IVec2],
        candidates: &BTreeSet<Edge>,
    ) -> Vec<Edge> {
        let n = centers.len();
        if n < 2 {
            return Vec::new();
        }

        let d2 =
            |a: usize, b: usize| (centers[a] - centers[b]).length_squared();

        let mut in_tree = vec![false; n];
        in_tree[0] = true;
        let mut edges = Vec::with_capacity(n - 1);
        for _ in 1..n {
            let mut best: Option<(i32, usize, usize)> = None;
            for i in 0..n {
                if !in_tree[i] {
                    continue;
                }
                for j in 0..n {
                    if in_tree[j] {
                        continue;
                    }
                    let d = d2(i, j);
                    if best.map_or(true, |(bd, ..)| d < bd) {
                        best = Some((d, i, j));
                    }
                }
            }
            let (_, i, j) = best.expect("tree growth starved");
            in_tree[j] = true;
            edges.push(Edge::new(i, j));
        }

        let tree: BTreeSet<Edge> = edges.iter().copied().collect();
        let mut extras: Vec<Edge> =
            candidates.iter().filter(|e| !tree.contains(e)).copied().collect();
        extras.shuffle(&mut self.rng);
        edges.extend(extras.into_iter().take(self.p.extras));
        edges
    }

    /// Stage 7: carve an L-shaped corridor for every edge.
    fn carve_corridors(
        &mut self,
        rooms: &[Rect],
        centers: &[IVec2],
        edges: &[Edge],
    ) {
        let hw = self.p.half_width();
        for e in edges {
            let pa = door_point(&rooms[e.a], centers[e.b]);
            let pb = door_point(&rooms[e.b], centers[e.a]);
            let elbow = self.carve_l(pa, pb, hw);
            self.carve_disk(elbow, hw);
            self.carve_disk(pa, hw);
            self.carve_disk(pb, hw);
        }
    }

    /// Carve the two segments of an L-corridor with random orientation and
    /// return the elbow point.
    fn carve_l(&mut self, a: IVec2, b: IVec2, hw: i32) -> IVec2 {
        if self.rng.gen::<bool>() {
            // Horizontal first.
            self.carve_band_h(a.x, b.x, a.y, hw);
            self.carve_band_v(a.y, b.y, b.x, hw);
            ivec2(b.x, a.y)
        } else {
            self.carve_band_v(a.y, b.y, a.x, hw);
            self.carve_band_h(a.x, b.x, b.y, hw);
            ivec2(a.x, b.y)
        }
    }

    /// Carve a single tile, refusing to touch the border ring.
    fn carve(&mut self, p: IVec2) {
        if p.x >= 1
            && p.y >= 1
            && p.x < self.p.width - 1
            && p.y < self.p.height - 1
        {
            self.level.set_walkable(p, true);
        }
    }

    fn carve_disk(&mut self, c: IVec2, r: i32) {
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    self.carve(c + ivec2(dx, dy));
                }
            }
        }
    }

    fn carve_band_h(&mut self, x0: i32, x1: i32, y: i32, hw: i32) {
        for x in x0.min(x1)..=x0.max(x1) {
            for o in -hw..=hw {
                self.carve(ivec2(x, y + o));
            }
        }
    }

    fn carve_band_v(&mut self, y0: i32, y1: i32, x: i32, hw: i32) {
        for y in y0.min(y1)..=y0.max(y1) {
            for o in -hw..=hw {
                self.carve(ivec2(x + o, y));
            }
        }
    }

    /// Stage 8: widen one-tile pinches up to the corridor width. A single
    /// row-major pass; later tiles see the carves of earlier ones.
    fn widen_pinches(&mut self) {
        let cw = self.p.corridor_width;
        for y in 1..self.p.height - 1 {
            for x in 1..self.p.width - 1 {
                let p = ivec2(x, y);
                if !self.level.is_walkable(p) {
                    continue;
                }

                let (l, r) = self.span(p, ivec2(1, 0));
                if r - l + 1 < cw {
                    if r + 1 < self.p.width - 1 {
                        self.carve(ivec2(r + 1, y));
                    } else {
                        self.carve(ivec2(l - 1, y));
                    }
                }

                let (t, b) = self.span(p, ivec2(0, 1));
                if b - t + 1 < cw {
                    if b + 1 < self.p.height - 1 {
                        self.carve(ivec2(x, b + 1));
                    } else {
                        self.carve(ivec2(x, t - 1));
                    }
                }
            }
        }
    }

    /// Extent of the contiguous walkable run through `p` along `axis`,
    /// as min and max coordinate on that axis.
    fn span(&self, p: IVec2, axis: IVec2) -> (i32, i32) {
        let mut lo = p;
        while self.level.is_walkable(lo - axis) {
            lo -= axis;
        }
        let mut hi = p;
        while self.level.is_walkable(hi + axis) {
            hi += axis;
        }
        if axis.x != 0 {
            (lo.x, hi.x)
        } else {
            (lo.y, hi.y)
        }
    }

    /// Stage 9: tag maximal straight bands wide enough to dash along.
    /// Returns the number of horizontal and vertical runs tagged.
    fn tag_dash_lanes(&mut self) -> (usize, usize) {
        let hw = self.p.half_width();
        let min_len = self.p.dash_lane_min_len;
        let (mut h_runs, mut v_runs) = (0, 0);

        let band_open = |level: &Level, p: IVec2, across: IVec2| {
            (-hw..=hw).all(|o| level.is_walkable(p + across * o))
        };

        for y in hw..self.p.height - hw {
            let mut x = 0;
            while x < self.p.width {
                if !band_open(&self.level, ivec2(x, y), ivec2(0, 1)) {
                    x += 1;
                    continue;
                }
                let x0 = x;
                while x < self.p.width
                    && band_open(&self.level, ivec2(x, y), ivec2(0, 1))
                {
                    x += 1;
                }
                if x - x0 >= min_len {
                    h_runs += 1;
                    for tx in x0..x {
                        for o in -hw..=hw {
                            self.level.set_tag(
                                ivec2(tx, y + o),
                                TileTags::DASH_LANE,
                                true,
                            );
                        }
                    }
                }
            }
        }

        for x in hw..self.p.width - hw {
            let mut y = 0;
            while y < self.p.height {
                if !band_open(&self.level, ivec2(x, y), ivec2(1, 0)) {
                    y += 1;
                    continue;
                }
                let y0 = y;
                while y < self.p.height
                    && band_open(&self.level, ivec2(x, y), ivec2(1, 0))
                {
                    y += 1;
                }
                if y - y0 >= min_len {
                    v_runs += 1;
                    for ty in y0..y {
                        for o in -hw..=hw {
                            self.level.set_tag(
                                ivec2(x + o, ty),
                                TileTags::DASH_LANE,
                                true,
                            );
                        }
                    }
                }
            }
        }

        (h_runs, v_runs)
    }

    /// Stage 10: tag a grapple anchor on a side of every room. A side
    /// midpoint qualifies when a ray cast away from the room lands on a
    /// walkable tile with nothing blocking the straight line in between.
    /// Rooms where no side qualifies get their center tagged instead.
    fn place_grapple_anchors(&mut self, rooms: &[Rect]) {
        for room in rooms {
            let mut placed = false;
            for _ in 0..ANCHOR_ATTEMPTS {
                let (p, dir) = match self.rng.gen_range(0..4) {
                    0 => (ivec2(room.x + room.w / 2, room.y), ivec2(0, -1)),
                    1 => (
                        ivec2(room.x + room.w - 1, room.y + room.h / 2),
                        ivec2(1, 0),
                    ),
                    2 => (
                        ivec2(room.x + room.w / 2, room.y + room.h - 1),
                        ivec2(0, 1),
                    ),
                    _ => (ivec2(room.x, room.y + room.h / 2), ivec2(-1, 0)),
                };
                let q = p + dir * self.p.grapple_range;
                if !self.level.in_bounds(q) || !self.level.is_walkable(q) {
                    continue;
                }
                if bresenham_line(p, q)
                    .skip(1)
                    .all(|t| self.level.is_walkable(t))
                {
                    self.level.set_tag(p, TileTags::GRAPPLE_ANCHOR, true);
                    placed = true;
                    break;
                }
            }
            if !placed {
                self.level.set_tag(
                    room.center(),
                    TileTags::GRAPPLE_ANCHOR,
                    true,
                );
            }
        }
    }

    fn degree(&self, p: IVec2) -> usize {
        DIR_4
            .iter()
            .filter(|&&d| self.level.is_walkable(p + d))
            .count()
    }

    /// Stage 11: fill in stubby dead-end tails until a fixpoint. Tails
    /// holding a grapple anchor are left alone.
    fn prune_dead_ends(&mut self) {
        loop {
            let ends: Vec<IVec2> = self
                .level
                .walkable_tiles()
                .filter(|&p| {
                    self.degree(p) == 1
                        && !self.level.has_tag(p, TileTags::GRAPPLE_ANCHOR)
                })
                .collect();

            let mut changed = false;
            for end in ends {
                if !self.level.is_walkable(end) || self.degree(end) != 1 {
                    continue;
                }

                let mut tail = vec![end];
                let mut prev = end;
                let mut cur = end;
                loop {
                    let next: Vec<IVec2> = DIR_4
                        .iter()
                        .map(|&d| cur + d)
                        .filter(|&n| self.level.is_walkable(n) && n != prev)
                        .collect();
                    let &[n] = &next[..] else { break };
                    if self.degree(n) != 2
                        || self.level.has_tag(n, TileTags::GRAPPLE_ANCHOR)
                    {
                        break;
                    }
                    tail.push(n);
                    prev = cur;
                    cur = n;
                }

                if tail.len() < self.p.prune_len
                    && !tail.iter().any(|&t| {
                        self.level.has_tag(t, TileTags::GRAPPLE_ANCHOR)
                    })
                {
                    for t in tail {
                        self.level.set_walkable(t, false);
                    }
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }
    }

    /// Stage 12: connect stray walkable components back to the main one by
    /// carving corridors between the closest points of the two largest
    /// components.
    fn repair_connectivity(&mut self) {
        let hw = self.p.half_width();
        for _ in 0..64 {
            let mut comps = self.components();
            if comps.len() <= 1 {
                break;
            }
            comps.sort_by_key(|c| std::cmp::Reverse(c.len()));

            let (a, b) = (&comps[0], &comps[1]);
            let mut best: Option<(i32, IVec2, IVec2)> = None;
            for &p in a {
                for &q in b {
                    let d = (p - q).length_squared();
                    if best.map_or(true, |(bd, ..)| d < bd) {
                        best = Some((d, p, q));
                    }
                }
            }
            let Some((_, p, q)) = best else { break };
            self.carve_l(p, q, hw);
        }
    }

    fn components(&self) -> Vec<Vec<IVec2>> {
        let mut seen: util::HashSet<IVec2> = Default::default();
        let mut comps = Vec::new();
        let starts: Vec<IVec2> = self.level.walkable_tiles().collect();
        for p in starts {
            if seen.contains(&p) {
                continue;
            }
            let comp: Vec<IVec2> =
                flood_fill_4(p, |t| self.level.is_walkable(t)).collect();
            seen.extend(comp.iter().copied());
            comps.push(comp);
        }
        comps
    }
}

/// Union area of the room rectangles.
fn room_floor_area(rooms: &[Rect]) -> usize {
    let mut cells: util::HashSet<IVec2> = Default::default();
    for r in rooms {
        cells.extend(r.tiles());
    }
    cells.len()
}

/// Stage 5: k nearest neighbours of every center, deduplicated.
fn knn_edges(centers: &[IVec2], k: usize) -> BTreeSet<Edge> {
    let mut out = BTreeSet::new();
    for (i, &c) in centers.iter().enumerate() {
        let mut others: Vec<(i32, usize)> = centers
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(j, &o)| ((o - c).length_squared(), j))
            .collect();
        others.sort();
        for &(_, j) in others.iter().take(k) {
            out.insert(Edge::new(i, j));
        }
    }
    out
}

/// The door point of a room facing another room's center: on the wall
/// toward the larger coordinate delta, clamped to the room's extent.
fn door_point(room: &Rect, toward: IVec2) -> IVec2 {
    let c = room.center();
    let d = toward - c;
    if d.x.abs() >= d.y.abs() {
        let x = if d.x > 0 { room.x + room.w - 1 } else { room.x };
        ivec2(x, toward.y.clamp(room.y, room.y + room.h - 1))
    } else {
        let y = if d.y > 0 { room.y + room.h - 1 } else { room.y };
        ivec2(toward.x.clamp(room.x, room.x + room.w - 1), y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn door_points_face_each_other() {
        let a = Rect::new(5, 5, 6, 6);
        let east = ivec2(30, 8);
        assert_eq!(door_point(&a, east), ivec2(10, 8));

        let south = ivec2(8, 30);
        assert_eq!(door_point(&a, south), ivec2(8, 10));
    }

    #[test]
    fn knn_dedupes_pairs() {
        let centers = vec![ivec2(0, 0), ivec2(10, 0), ivec2(20, 0)];
        let edges = knn_edges(&centers, 3);
        // Complete graph on 3 nodes.
        assert_eq!(edges.len(), 3);
    }

    #[test]
    fn generation_is_deterministic() {
        let a = generate(&GenParams::with_seed(42));
        let b = generate(&GenParams::with_seed(42));
        assert_eq!(a, b);

        let c = generate(&GenParams::with_seed(43));
        assert_ne!(a, c);
    }

    #[test]
    fn degenerate_params_do_not_panic() {
        let tiny = GenParams {
            width: 8,
            height: 8,
            room_count_min: 0,
            room_count_max: 0,
            ..GenParams::with_seed(5)
        };
        let out = generate_full(&tiny);
        assert_eq!(out.rooms.len(), 0);

        let zero = GenParams {
            width: 0,
            height: 0,
            ..GenParams::with_seed(5)
        };
        let level = generate(&zero);
        assert_eq!(level.width(), 0);
    }
}
