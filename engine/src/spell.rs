use glam::{IVec2, Vec2};
use rand::Rng;
use serde::{Deserialize, Serialize};
use util::{GameRng, HashMap, HashSet, VecExt, DIR_4};
use world::Level;

/// Seconds a beam stays on screen while fading.
const BEAM_DURATION: f32 = 0.5;

/// Distance from a beam polyline within which targets are struck.
const BEAM_HIT_DISTANCE: f32 = 0.6;

/// Ticks a projectile impact flare stays active.
const IMPACT_TICKS: u32 = 15;

/// Seconds between a strike appearing and its damage landing.
const STRIKE_DELAY: f32 = 0.3;

/// Seconds between canopy heal pulses.
const HEAL_CADENCE: f32 = 0.5;

#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SpellKind {
    Fireball,
    ChaosRay,
    LightningStrike,
    LightningStorm,
    FractalBloom,
    FractalCanopy,
}

/// Static description of a castable spell.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpellInfo {
    pub kind: SpellKind,
    pub level: u32,
    pub cooldown: f32,
    pub damage: i32,
    pub mana_cost: i32,
}

/// Per-slot cooldown readout for the HUD.
#[derive(Clone, Debug, PartialEq)]
pub struct CooldownSlot {
    pub icon: String,
    pub remaining: f32,
    pub total: f32,
}

/// Tracks cooldowns per spell kind.
#[derive(Clone, Debug, Default)]
pub struct Caster {
    cooldowns: HashMap<SpellKind, f32>,
}

impl Caster {
    pub fn update(&mut self, dt: f32) {
        for v in self.cooldowns.values_mut() {
            *v = (*v - dt).max(0.0);
        }
    }

    pub fn ready(&self, info: &SpellInfo) -> bool {
        self.remaining(info.kind) <= 0.0
    }

    pub fn remaining(&self, kind: SpellKind) -> f32 {
        self.cooldowns.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn put_on_cooldown(&mut self, info: &SpellInfo) {
        self.cooldowns.insert(info.kind, info.cooldown);
    }

    /// Start the cooldown if the spell is ready. Returns false and leaves
    /// the cooldown untouched otherwise.
    pub fn try_cast(&mut self, info: &SpellInfo) -> bool {
        if self.ready(info) {
            self.put_on_cooldown(info);
            true
        } else {
            false
        }
    }

    pub fn cooldown_slot(&self, info: &SpellInfo) -> CooldownSlot {
        CooldownSlot {
            icon: info.kind.to_string(),
            remaining: self.remaining(info.kind),
            total: info.cooldown,
        }
    }
}

/// Applies spell effects to the game's actors.
///
/// The spell side never inspects actor types; whoever owns the actors
/// implements this and maps spell geometry to damage and healing.
pub trait EffectResolver {
    fn resolve(&mut self, spell: &mut Spell, level: &Level);
}

/// An in-flight spell instance.
#[derive(Clone, Debug)]
pub enum Spell {
    Fireball(Fireball),
    ChaosRay(ChaosRay),
    LightningStrike(LightningStrike),
    LightningStorm(LightningStorm),
    FractalBloom(FractalBloom),
    FractalCanopy(FractalCanopy),
}

impl Spell {
    pub fn update(&mut self, level: &Level, dt: f32) {
        match self {
            Spell::Fireball(s) => s.update(level, dt),
            Spell::ChaosRay(s) => s.update(dt),
            Spell::LightningStrike(s) => s.update(dt),
            Spell::LightningStorm(s) => s.update(dt),
            Spell::FractalBloom(s) => s.update(dt),
            Spell::FractalCanopy(s) => s.update(dt),
        }
    }

    pub fn is_finished(&self) -> bool {
        match self {
            Spell::Fireball(s) => s.is_finished(),
            Spell::ChaosRay(s) => s.is_finished(),
            Spell::LightningStrike(s) => s.is_finished(),
            Spell::LightningStorm(s) => s.is_finished(),
            Spell::FractalBloom(s) => s.is_finished(),
            Spell::FractalCanopy(s) => s.is_finished(),
        }
    }

    /// Drain child spells emitted this tick. Only the storm produces any.
    pub fn take_spawns(&mut self) -> Vec<Spell> {
        match self {
            Spell::LightningStorm(s) => s.take_spawns(),
            _ => Vec::new(),
        }
    }
}

/// Straight-line projectile that detonates on the first solid tile.
#[derive(Clone, Debug)]
pub struct Fireball {
    pub pos: Vec2,
    dir: Vec2,
    speed: f32,
    pub level: u32,
    base_damage: i32,
    impact: Option<IVec2>,
    impact_ticks: u32,
    impact_taken: bool,
}

impl Fireball {
    pub fn new(pos: Vec2, target: Vec2, speed: f32, level: u32, damage: i32) -> Self {
        let mut fb = Fireball {
            pos,
            dir: (target - pos).normalize_or_zero(),
            speed,
            level: level.clamp(1, 3),
            base_damage: damage,
            impact: None,
            impact_ticks: 0,
            impact_taken: false,
        };
        // A cast at the caster's own position has no direction to fly in;
        // it goes off in place instead of hovering forever.
        if fb.dir == Vec2::ZERO {
            fb.detonate();
        }
        fb
    }

    pub fn in_flight(&self) -> bool {
        self.impact.is_none()
    }

    /// Manhattan blast radius, scaling with spell level.
    pub fn impact_radius(&self) -> i32 {
        self.level.min(3) as i32
    }

    pub fn damage(&self) -> i32 {
        self.base_damage * (1 << (self.level - 1))
    }

    /// Force an impact at the projectile's current tile, for contact hits.
    pub fn detonate(&mut self) {
        if self.impact.is_none() {
            self.enter_impact(self.pos.floor().as_ivec2());
        }
    }

    /// The impact tile, yielded exactly once so damage applies one tick.
    pub fn take_impact(&mut self) -> Option<IVec2> {
        if self.impact_taken {
            return None;
        }
        let tile = self.impact?;
        self.impact_taken = true;
        Some(tile)
    }

    fn enter_impact(&mut self, tile: IVec2) {
        self.pos = tile.as_vec2() + Vec2::splat(0.5);
        self.impact = Some(tile);
        self.impact_ticks = IMPACT_TICKS;
    }

    fn update(&mut self, level: &Level, dt: f32) {
        match self.impact {
            None => {
                self.pos += self.dir * self.speed * dt;
                let tile = self.pos.floor().as_ivec2();
                if !level.is_walkable(tile) {
                    self.enter_impact(tile);
                }
            }
            Some(_) => self.impact_ticks = self.impact_ticks.saturating_sub(1),
        }
    }

    fn is_finished(&self) -> bool {
        self.impact.is_some() && self.impact_ticks == 0
    }
}

/// Instant jagged beam between caster and target.
#[derive(Clone, Debug)]
pub struct ChaosRay {
    points: Vec<Vec2>,
    age: f32,
    damage: i32,
    struck: bool,
}

impl ChaosRay {
    pub fn new(from: Vec2, to: Vec2, damage: i32, rng: &mut GameRng) -> Self {
        let dist = from.distance(to);
        let segments = (dist as usize).clamp(4, 40);
        let dir = (to - from).normalize_or_zero();
        let normal = dir.perp();

        let mut points = Vec::with_capacity(segments + 1);
        points.push(from);
        for i in 1..segments {
            let t = i as f32 / segments as f32;
            let jitter = rng.gen_range(-0.4..0.4);
            points.push(from.lerp(to, t) + normal * jitter);
        }
        points.push(to);

        ChaosRay {
            points,
            age: 0.0,
            damage,
            struck: false,
        }
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Remaining brightness in [0, 1].
    pub fn fade(&self) -> f32 {
        (1.0 - self.age / BEAM_DURATION).max(0.0)
    }

    /// Whether a point lies close enough to the polyline to be struck.
    pub fn hits(&self, p: Vec2) -> bool {
        self.points
            .windows(2)
            .any(|w| point_segment_distance(p, w[0], w[1]) < BEAM_HIT_DISTANCE)
    }

    /// Damage applies exactly once, at cast time.
    pub fn take_strike(&mut self) -> Option<i32> {
        if self.struck {
            return None;
        }
        self.struck = true;
        Some(self.damage)
    }

    fn update(&mut self, dt: f32) {
        self.age += dt;
    }

    fn is_finished(&self) -> bool {
        self.age >= BEAM_DURATION
    }
}

fn point_segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Vertical bolt on a single tile with a short delay before damage.
#[derive(Clone, Debug)]
pub struct LightningStrike {
    pub tile: IVec2,
    damage: i32,
    elapsed: f32,
    damage_taken: bool,
}

impl LightningStrike {
    pub fn new(tile: IVec2, damage: i32) -> Self {
        LightningStrike {
            tile,
            damage,
            elapsed: 0.0,
            damage_taken: false,
        }
    }

    /// The single-tile damage, yielded once after the delay has passed.
    pub fn take_damage(&mut self) -> Option<(IVec2, i32)> {
        if self.damage_taken || self.elapsed < STRIKE_DELAY {
            return None;
        }
        self.damage_taken = true;
        Some((self.tile, self.damage))
    }

    fn update(&mut self, dt: f32) {
        self.elapsed += dt;
    }

    fn is_finished(&self) -> bool {
        self.elapsed >= STRIKE_DELAY
    }
}

/// Area storm that rains child strikes on a diamond of walkable tiles.
#[derive(Clone, Debug)]
pub struct LightningStorm {
    tiles: Vec<IVec2>,
    tick_rate: f32,
    damage: i32,
    elapsed: f32,
    emitted: u32,
    total: u32,
    rng: GameRng,
    spawns: Vec<Spell>,
}

impl LightningStorm {
    pub fn new(
        level: &Level,
        center: IVec2,
        radius: i32,
        tick_rate: f32,
        duration: f32,
        damage: i32,
        rng: GameRng,
    ) -> Self {
        let mut tiles = Vec::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let p = center + IVec2::new(dx, dy);
                if (p - center).taxi_len() <= radius && level.is_walkable(p) {
                    tiles.push(p);
                }
            }
        }
        let total = if tiles.is_empty() {
            0
        } else {
            (duration / tick_rate).round() as u32
        };
        LightningStorm {
            tiles,
            tick_rate,
            damage,
            elapsed: 0.0,
            emitted: 0,
            total,
            rng,
            spawns: Vec::new(),
        }
    }

    pub fn take_spawns(&mut self) -> Vec<Spell> {
        std::mem::take(&mut self.spawns)
    }

    fn update(&mut self, dt: f32) {
        self.elapsed += dt;
        // Emission is driven by elapsed time against fixed thresholds, so
        // float drift in dt accumulation cannot change the total count.
        while self.emitted < self.total
            && self.elapsed >= self.tick_rate * (self.emitted + 1) as f32
        {
            let tile = self.tiles[self.rng.gen_range(0..self.tiles.len())];
            self.spawns.push(Spell::LightningStrike(LightningStrike::new(
                tile,
                self.damage,
            )));
            self.emitted += 1;
        }
    }

    fn is_finished(&self) -> bool {
        self.emitted >= self.total && self.spawns.is_empty()
    }
}

/// One node of a fractal bloom, damaging a small square when it fires.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FractalNode {
    pub pos: IVec2,
    pub depth: u32,
    pub damage: i32,
    pub spawn_time: f32,
}

/// Recursive burst that unfolds outward over walkable tiles.
#[derive(Clone, Debug)]
pub struct FractalBloom {
    queue: Vec<FractalNode>,
    spawned: Vec<FractalNode>,
    elapsed: f32,
}

impl FractalBloom {
    const MAX_DEPTH: u32 = 3;
    const STEP: i32 = 2;
    const DEPTH_INTERVAL: f32 = 0.15;

    pub fn new(level: &Level, origin: IVec2, damage: i32) -> Self {
        let mut queue = Vec::new();
        let mut visited: HashSet<IVec2> = HashSet::default();
        let mut frontier = vec![origin];
        visited.insert(origin);

        for depth in 0..=Self::MAX_DEPTH {
            let mut next = Vec::new();
            for &pos in &frontier {
                queue.push(FractalNode {
                    pos,
                    depth,
                    damage: damage >> depth,
                    spawn_time: depth as f32 * Self::DEPTH_INTERVAL,
                });
                if depth == Self::MAX_DEPTH {
                    continue;
                }
                for &d in &DIR_4 {
                    let p = pos + d * Self::STEP;
                    // The midpoint must be open too, or the bloom would
                    // tunnel through a one-tile wall.
                    if level.is_walkable(pos + d)
                        && level.is_walkable(p)
                        && visited.insert(p)
                    {
                        next.push(p);
                    }
                }
            }
            frontier = next;
        }

        FractalBloom {
            queue,
            spawned: Vec::new(),
            elapsed: 0.0,
        }
    }

    /// Drain nodes that have fired since the last call; the resolver
    /// applies each node's damage in a square around its position.
    pub fn take_nodes(&mut self) -> Vec<FractalNode> {
        std::mem::take(&mut self.spawned)
    }

    fn update(&mut self, dt: f32) {
        self.elapsed += dt;
        let elapsed = self.elapsed;
        let (ready, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.queue)
                .into_iter()
                .partition(|n| n.spawn_time <= elapsed);
        self.spawned.extend(ready);
        self.queue = pending;
    }

    fn is_finished(&self) -> bool {
        self.queue.is_empty() && self.spawned.is_empty()
    }
}

/// Healing aura that grows to full size, then holds.
#[derive(Clone, Debug)]
pub struct FractalCanopy {
    pub center: IVec2,
    max_radius: f32,
    grow_time: f32,
    duration: f32,
    heal: i32,
    elapsed: f32,
    heal_timer: f32,
    heal_ready: bool,
}

impl FractalCanopy {
    pub fn new(
        center: IVec2,
        max_radius: f32,
        grow_time: f32,
        duration: f32,
        heal: i32,
    ) -> Self {
        FractalCanopy {
            center,
            max_radius,
            grow_time: grow_time.max(f32::EPSILON),
            duration,
            heal,
            elapsed: 0.0,
            heal_timer: 0.0,
            heal_ready: false,
        }
    }

    pub fn radius(&self) -> f32 {
        (self.max_radius * self.elapsed / self.grow_time).min(self.max_radius)
    }

    /// Heal amount, yielded once per cadence interval.
    pub fn take_heal(&mut self) -> Option<i32> {
        if self.heal_ready {
            self.heal_ready = false;
            Some(self.heal)
        } else {
            None
        }
    }

    fn update(&mut self, dt: f32) {
        self.elapsed += dt;
        self.heal_timer += dt;
        if self.heal_timer >= HEAL_CADENCE {
            self.heal_timer -= HEAL_CADENCE;
            self.heal_ready = true;
        }
    }

    fn is_finished(&self) -> bool {
        self.elapsed >= self.grow_time + self.duration
    }
}

/// Ordered list of live spells, advanced once per world tick.
#[derive(Default)]
pub struct ActiveSpells {
    spells: Vec<Spell>,
}

impl ActiveSpells {
    pub fn push(&mut self, spell: Spell) {
        self.spells.push(spell);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Spell> {
        self.spells.iter()
    }

    pub fn len(&self) -> usize {
        self.spells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }

    /// Advance every spell one tick: update, resolve effects, collect
    /// children, drop the finished. Children appended here first update on
    /// the next tick, after the spells that spawned them.
    pub fn tick(
        &mut self,
        level: &Level,
        dt: f32,
        resolver: &mut impl EffectResolver,
    ) {
        let mut spawned = Vec::new();
        for spell in &mut self.spells {
            spell.update(level, dt);
            resolver.resolve(spell, level);
            spawned.append(&mut spell.take_spawns());
        }
        self.spells.retain(|s| !s.is_finished());
        self.spells.append(&mut spawned);
    }
}
