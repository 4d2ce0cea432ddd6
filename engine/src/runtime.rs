use glam::{IVec2, Vec2};
use util::{srng, GameRng, VecExt, DIR_4};
use world::{DoorState, LayeredLevel, Level, Tile, TileTags};

use crate::{
    a_star, has_line_of_sight, predict_and_clip, wall_segments, Aabb,
    ActiveSpells, Actor, Caster, ChaosRay, CooldownSlot, EffectResolver,
    Fireball, Fov, FractalBloom, FractalCanopy, LightningStorm,
    LightningStrike, Monster, MoveMode, Progression, Ray, Spell, SpellInfo,
    SpellKind, WallSegment, DASH_DURATION, DASH_RECHARGE,
    DASH_SPEED_MULTIPLIER, FIREBALL_HIT_RADIUS, GRAPPLE_DELAY,
    GRAPPLE_MAX_DISTANCE, GRAPPLE_SPEED, MAX_DASH_CHARGES,
};

const FIREBALL_SPEED: f32 = 12.0;
const STORM_RADIUS: i32 = 2;
const STORM_TICK_RATE: f32 = 0.1;
const STORM_DURATION: f32 = 1.0;
const CANOPY_RADIUS: f32 = 4.0;
const CANOPY_GROW_TIME: f32 = 1.0;
const CANOPY_DURATION: f32 = 5.0;
const MARKER_TTL: f32 = 0.4;
const NUMBER_TTL: f32 = 0.8;

/// Input commands pushed in by the input collaborator. Coordinates are
/// level-tile integers.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    MoveTo { tile: IVec2 },
    Attack { tile: IVec2 },
    Cast { slot: usize, tile: IVec2 },
    Interact,
    Dash { dir: Vec2 },
    Grapple { tile: IVec2 },
}

/// Floating combat text, positioned in tile units.
#[derive(Clone, Debug, PartialEq)]
pub struct DamageNumber {
    pub pos: Vec2,
    pub amount: i32,
    pub ttl: f32,
}

/// Brief flash on a struck tile.
#[derive(Clone, Debug, PartialEq)]
pub struct HitMarker {
    pub tile: IVec2,
    pub ttl: f32,
}

#[derive(Clone, Debug)]
struct GrappleFlight {
    target: IVec2,
    delay_left: f32,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub actor: Actor,
    pub caster: Caster,
    /// Castable spells, indexed by HUD slot.
    pub book: Vec<SpellInfo>,
    pub mana: i32,
    pub max_mana: i32,
    pub progression: Progression,
    dash_charges: u32,
    dash_recharge_timer: f32,
    dash_time_left: f32,
    attack_cooldown: f32,
    grapple: Option<GrappleFlight>,
}

impl Player {
    pub fn new(tile: IVec2) -> Self {
        Player {
            actor: Actor::new(tile, 50, 4, 5.0),
            caster: Caster::default(),
            book: Vec::new(),
            mana: 30,
            max_mana: 30,
            progression: Progression::default(),
            dash_charges: MAX_DASH_CHARGES,
            dash_recharge_timer: DASH_RECHARGE,
            dash_time_left: 0.0,
            attack_cooldown: 0.0,
            grapple: None,
        }
    }

    pub fn dash_charges(&self) -> u32 {
        self.dash_charges
    }

    pub fn is_grappling(&self) -> bool {
        self.grapple.is_some()
    }

    pub fn cooldown_slots(&self) -> Vec<CooldownSlot> {
        self.book
            .iter()
            .map(|info| self.caster.cooldown_slot(info))
            .collect()
    }
}

/// Fixed-timestep world simulation.
///
/// Collaborators push [`Command`]s in between ticks and pull render state
/// through the query methods; the tick itself runs to completion with a
/// fixed ordering so replays with the same inputs stay deterministic.
pub struct Runtime {
    layers: LayeredLevel,
    pub player: Player,
    monsters: Vec<Monster>,
    spells: ActiveSpells,
    fovs: Vec<Fov>,
    walls: Vec<WallSegment>,
    rng: GameRng,
    queued: Vec<Command>,
    damage_numbers: Vec<DamageNumber>,
    hit_markers: Vec<HitMarker>,
    ticks: u64,
}

impl Runtime {
    pub fn new(layers: LayeredLevel, player_start: IVec2, seed: u64) -> Self {
        let fovs = (0..layers.layer_count())
            .map(|i| {
                let l = layers.layer(i).unwrap_or(layers.active());
                Fov::new(l.width(), l.height())
            })
            .collect();
        let walls = wall_segments(layers.active());
        Runtime {
            layers,
            player: Player::new(player_start),
            monsters: Vec::new(),
            spells: ActiveSpells::default(),
            fovs,
            walls,
            rng: srng(&("runtime", seed)),
            queued: Vec::new(),
            damage_numbers: Vec::new(),
            hit_markers: Vec::new(),
            ticks: 0,
        }
    }

    pub fn level(&self) -> &Level {
        self.layers.active()
    }

    pub fn spawn_monster(&mut self, monster: Monster) {
        self.monsters.push(monster);
    }

    pub fn queue_command(&mut self, cmd: Command) {
        self.queued.push(cmd);
    }

    // Render queries.

    pub fn visible_walls(&self) -> Vec<&WallSegment> {
        let fov = &self.fovs[self.layers.active_index()];
        self.walls.iter().filter(|w| fov.is_visible(w.tile)).collect()
    }

    pub fn visible_rays(&self) -> &[Ray] {
        self.fovs[self.layers.active_index()].rays()
    }

    pub fn seen_mask(&self) -> &[bool] {
        self.fovs[self.layers.active_index()].seen_mask()
    }

    pub fn is_visible(&self, tile: IVec2) -> bool {
        self.fovs[self.layers.active_index()].is_visible(tile)
    }

    /// Tiles inside a camera rectangle, paired with their grid position.
    pub fn tiles_in_view(
        &self,
        min: IVec2,
        max: IVec2,
    ) -> impl Iterator<Item = (IVec2, &Tile)> {
        let level = self.layers.active();
        (min.y.max(0)..=max.y.min(level.height() - 1)).flat_map(move |y| {
            (min.x.max(0)..=max.x.min(level.width() - 1))
                .map(move |x| (IVec2::new(x, y), level.tile([x, y])))
        })
    }

    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        std::iter::once(&self.player.actor)
            .chain(self.monsters.iter().map(|m| &m.actor))
    }

    pub fn monsters(&self) -> &[Monster] {
        &self.monsters
    }

    pub fn active_spells(&self) -> impl Iterator<Item = &Spell> {
        self.spells.iter()
    }

    pub fn damage_numbers(&self) -> &[DamageNumber] {
        &self.damage_numbers
    }

    pub fn hit_markers(&self) -> &[HitMarker] {
        &self.hit_markers
    }

    /// Advance the world one fixed timestep.
    pub fn tick(&mut self, dt: f32) {
        self.ticks += 1;
        // Monsters react to where the player was when the tick began.
        let player_tile_at_start = self.player.actor.tile;

        for cmd in std::mem::take(&mut self.queued) {
            self.run_command(cmd);
        }

        self.update_timers(dt);
        self.update_player_movement(dt);

        for m in &mut self.monsters {
            if let Some(tile) = m.actor.controller.update(dt) {
                m.actor.commit_step(tile);
            }
        }

        let mut player_hits = 0;
        for m in &mut self.monsters {
            if !m.actor.is_alive() {
                continue;
            }
            if let Some(dmg) = m.update(
                self.layers.active(),
                player_tile_at_start,
                dt,
                &mut self.rng,
            ) {
                player_hits += dmg;
            }
        }
        if player_hits > 0 {
            self.player.actor.hp -= player_hits;
            self.damage_numbers.push(DamageNumber {
                pos: self.player.actor.controller.position(),
                amount: player_hits,
                ttl: NUMBER_TTL,
            });
        }

        let Runtime {
            layers,
            spells,
            monsters,
            player,
            damage_numbers,
            hit_markers,
            ..
        } = self;
        let mut fx = WorldEffects {
            monsters,
            player,
            damage_numbers,
            hit_markers,
        };
        spells.tick(layers.active(), dt, &mut fx);

        self.reap(dt);
        self.update_fov();
    }

    fn update_timers(&mut self, dt: f32) {
        let p = &mut self.player;
        p.caster.update(dt);
        p.attack_cooldown = (p.attack_cooldown - dt).max(0.0);
        if p.attack_cooldown < 1e-4 {
            p.attack_cooldown = 0.0;
        }

        if p.dash_charges < MAX_DASH_CHARGES {
            p.dash_recharge_timer -= dt;
            if p.dash_recharge_timer <= 0.0 {
                p.dash_charges += 1;
                p.dash_recharge_timer = DASH_RECHARGE;
            }
        }

        if p.dash_time_left > 0.0 {
            p.dash_time_left -= dt;
            if p.dash_time_left <= 0.0 {
                p.actor.controller.stop();
            }
        }

        if let Some(flight) = &mut p.grapple {
            flight.delay_left -= dt;
            if flight.delay_left <= 0.0 {
                let target = flight.target.as_vec2();
                let pos = p.actor.controller.position();
                if pos.distance(target) <= GRAPPLE_SPEED * dt {
                    p.actor.controller.warp(target);
                    p.actor.controller.stop();
                    p.actor.tile = flight.target;
                    p.grapple = None;
                } else {
                    p.actor.controller.set_velocity_raw(
                        (target - pos).normalize_or_zero() * GRAPPLE_SPEED,
                    );
                }
            }
        }
    }

    fn update_player_movement(&mut self, dt: f32) {
        let level = self.layers.active();
        let p = &mut self.player;
        let prev = p.actor.controller.position();
        if let Some(tile) = p.actor.controller.update(dt) {
            p.actor.commit_step(tile);
        }
        if p.actor.controller.mode() == MoveMode::Velocity {
            let delta = p.actor.controller.position() - prev;
            let clip = predict_and_clip(level, actor_aabb(prev), delta);
            let pos = aabb_to_pos(clip.moved);
            p.actor.controller.warp(pos);
            let tile = (pos + Vec2::splat(0.5)).floor().as_ivec2();
            if level.is_walkable(tile) {
                p.actor.tile = tile;
            }
            if clip.blocked_x && clip.blocked_y {
                p.actor.controller.stop();
            }
        }
    }

    fn reap(&mut self, dt: f32) {
        let player_level = self.player.progression.level;
        let mut exp = 0;
        self.monsters.retain(|m| {
            if m.actor.is_alive() {
                true
            } else {
                exp += crate::exp_reward(m.level, player_level);
                false
            }
        });
        if exp > 0 {
            let gained = self.player.progression.grant(exp);
            if gained > 0 {
                log::info!(
                    "reached level {}",
                    self.player.progression.level
                );
            }
        }

        for n in &mut self.damage_numbers {
            n.ttl -= dt;
        }
        self.damage_numbers.retain(|n| n.ttl > 0.0);
        for m in &mut self.hit_markers {
            m.ttl -= dt;
        }
        self.hit_markers.retain(|m| m.ttl > 0.0);
    }

    fn update_fov(&mut self) {
        let fov = &mut self.fovs[self.layers.active_index()];
        let pos = self.player.actor.controller.position();
        fov.update(pos + Vec2::splat(0.5), &self.walls);
    }

    fn run_command(&mut self, cmd: Command) {
        match cmd {
            Command::MoveTo { tile } => {
                if let Some(path) =
                    a_star(self.layers.active(), self.player.actor.tile, tile)
                {
                    self.player
                        .actor
                        .controller
                        .set_path(path.into_iter().skip(1));
                }
            }
            Command::Attack { tile } => self.melee(tile),
            Command::Cast { slot, tile } => self.cast(slot, tile),
            Command::Interact => self.interact(),
            Command::Dash { dir } => self.dash(dir),
            Command::Grapple { tile } => self.grapple(tile),
        }
    }

    fn melee(&mut self, tile: IVec2) {
        let p = &mut self.player;
        if p.attack_cooldown > 0.0
            || (tile - p.actor.tile).cheb_len() > 1
        {
            return;
        }
        p.attack_cooldown = p.actor.attack_rate;
        let damage = p.actor.damage;
        if let Some(m) =
            self.monsters.iter_mut().find(|m| m.actor.tile == tile)
        {
            m.actor.hp -= damage;
            self.hit_markers.push(HitMarker {
                tile,
                ttl: MARKER_TTL,
            });
            self.damage_numbers.push(DamageNumber {
                pos: tile.as_vec2(),
                amount: damage,
                ttl: NUMBER_TTL,
            });
        }
    }

    fn cast(&mut self, slot: usize, target: IVec2) {
        let Some(info) = self.player.book.get(slot).copied() else {
            return;
        };
        if self.player.mana < info.mana_cost
            || !self.player.caster.try_cast(&info)
        {
            return;
        }
        self.player.mana -= info.mana_cost;

        let level = self.layers.active();
        let origin =
            self.player.actor.controller.position() + Vec2::splat(0.5);
        let target_center = target.as_vec2() + Vec2::splat(0.5);
        let spell = match info.kind {
            SpellKind::Fireball => Spell::Fireball(Fireball::new(
                origin,
                target_center,
                FIREBALL_SPEED,
                info.level,
                info.damage,
            )),
            SpellKind::ChaosRay => Spell::ChaosRay(ChaosRay::new(
                origin,
                target_center,
                info.damage,
                &mut self.rng,
            )),
            SpellKind::LightningStrike => Spell::LightningStrike(
                LightningStrike::new(target, info.damage),
            ),
            SpellKind::LightningStorm => {
                Spell::LightningStorm(LightningStorm::new(
                    level,
                    target,
                    STORM_RADIUS,
                    STORM_TICK_RATE,
                    STORM_DURATION,
                    info.damage,
                    // Separate stream so runtime jitter never perturbs
                    // anything seeded from the world rng.
                    srng(&("storm", self.ticks, target)),
                ))
            }
            SpellKind::FractalBloom => Spell::FractalBloom(
                FractalBloom::new(level, target, info.damage),
            ),
            SpellKind::FractalCanopy => {
                Spell::FractalCanopy(FractalCanopy::new(
                    target,
                    CANOPY_RADIUS,
                    CANOPY_GROW_TIME,
                    CANOPY_DURATION,
                    info.damage,
                ))
            }
        };
        self.spells.push(spell);
    }

    fn interact(&mut self) {
        let player_tile = self.player.actor.tile;

        if let Some((_, dest)) = self.layers.traverse(player_tile) {
            self.player.actor.tile = dest;
            self.player.actor.controller.warp(dest.as_vec2());
            self.player.actor.controller.set_path(std::iter::empty());
            self.rebuild_occlusion();
            return;
        }

        let door = DIR_4.iter().find_map(|&d| {
            let p = player_tile + d;
            let state = self.layers.active().tile(p).door_state();
            (state != DoorState::None).then_some((p, state))
        });
        match door {
            Some((p, DoorState::Closed)) => {
                self.layers.active_mut().set_door_state(p, DoorState::Open);
                self.rebuild_occlusion();
            }
            Some((p, DoorState::Open)) => {
                self.layers
                    .active_mut()
                    .set_door_state(p, DoorState::Closed);
                self.rebuild_occlusion();
            }
            Some((p, DoorState::Locked)) => {
                log::info!("the door at {p} is locked");
            }
            _ => {}
        }
    }

    fn dash(&mut self, dir: Vec2) {
        let on_lane = self
            .layers
            .active()
            .has_tag(self.player.actor.tile, TileTags::DASH_LANE);
        let p = &mut self.player;
        if p.dash_charges == 0 || dir == Vec2::ZERO || !on_lane {
            return;
        }
        p.dash_charges -= 1;
        p.dash_time_left = DASH_DURATION;
        let speed = p.actor.controller.velocity().length().max(5.0);
        p.actor.controller.set_velocity_raw(
            dir.normalize_or_zero() * speed * DASH_SPEED_MULTIPLIER,
        );
    }

    fn grapple(&mut self, target: IVec2) {
        let level = self.layers.active();
        let tile = self.player.actor.tile;
        if !level.has_tag(target, TileTags::GRAPPLE_ANCHOR)
            || (target - tile).taxi_len() > GRAPPLE_MAX_DISTANCE
            || !has_line_of_sight(level, tile, target)
        {
            return;
        }
        self.player.grapple = Some(GrappleFlight {
            target,
            delay_left: GRAPPLE_DELAY,
        });
        self.player.actor.controller.stop();
    }

    fn rebuild_occlusion(&mut self) {
        self.walls = wall_segments(self.layers.active());
        self.fovs[self.layers.active_index()].invalidate();
    }
}

/// Collision footprint for a velocity-mode actor at a tile-corner position.
fn actor_aabb(pos: Vec2) -> Aabb {
    Aabb::new(
        pos.x + crate::X_WALL_VISUAL_OFFSET + 0.2,
        pos.y + crate::Y_WALL_VISUAL_OFFSET + 0.2,
        0.6,
        0.6,
    )
}

fn aabb_to_pos(aabb: Aabb) -> Vec2 {
    Vec2::new(
        aabb.x - crate::X_WALL_VISUAL_OFFSET - 0.2,
        aabb.y - crate::Y_WALL_VISUAL_OFFSET - 0.2,
    )
}

/// Maps spell geometry onto the world's actors.
struct WorldEffects<'a> {
    monsters: &'a mut Vec<Monster>,
    player: &'a mut Player,
    damage_numbers: &'a mut Vec<DamageNumber>,
    hit_markers: &'a mut Vec<HitMarker>,
}

impl WorldEffects<'_> {
    fn damage_monster_at(&mut self, tile: IVec2, amount: i32) {
        for m in self.monsters.iter_mut().filter(|m| m.actor.tile == tile) {
            m.actor.hp -= amount;
            self.damage_numbers.push(DamageNumber {
                pos: tile.as_vec2(),
                amount,
                ttl: NUMBER_TTL,
            });
        }
        self.hit_markers.push(HitMarker {
            tile,
            ttl: MARKER_TTL,
        });
    }
}

impl EffectResolver for WorldEffects<'_> {
    fn resolve(&mut self, spell: &mut Spell, level: &Level) {
        match spell {
            Spell::Fireball(fb) => {
                if fb.in_flight() {
                    let contact = self.monsters.iter().any(|m| {
                        let center = m.actor.tile.as_vec2() + Vec2::splat(0.5);
                        center.distance(fb.pos) <= FIREBALL_HIT_RADIUS
                    });
                    if contact {
                        fb.detonate();
                    }
                }
                if let Some(tile) = fb.take_impact() {
                    let radius = fb.impact_radius();
                    let damage = fb.damage();
                    let hit: Vec<IVec2> = self
                        .monsters
                        .iter()
                        .filter(|m| {
                            (m.actor.tile - tile).taxi_len() <= radius
                                && has_line_of_sight(level, tile, m.actor.tile)
                        })
                        .map(|m| m.actor.tile)
                        .collect();
                    for t in hit {
                        self.damage_monster_at(t, damage);
                    }
                }
            }
            Spell::ChaosRay(ray) => {
                if let Some(damage) = ray.take_strike() {
                    let hit: Vec<IVec2> = self
                        .monsters
                        .iter()
                        .filter(|m| {
                            ray.hits(m.actor.tile.as_vec2() + Vec2::splat(0.5))
                        })
                        .map(|m| m.actor.tile)
                        .collect();
                    for t in hit {
                        self.damage_monster_at(t, damage);
                    }
                }
            }
            Spell::LightningStrike(s) => {
                if let Some((tile, damage)) = s.take_damage() {
                    self.damage_monster_at(tile, damage);
                }
            }
            Spell::LightningStorm(_) => {}
            Spell::FractalBloom(bloom) => {
                for node in bloom.take_nodes() {
                    let hit: Vec<IVec2> = self
                        .monsters
                        .iter()
                        .filter(|m| {
                            (m.actor.tile - node.pos).cheb_len() <= 1
                        })
                        .map(|m| m.actor.tile)
                        .collect();
                    for t in hit {
                        self.damage_monster_at(t, node.damage);
                    }
                }
            }
            Spell::FractalCanopy(c) => {
                if let Some(heal) = c.take_heal() {
                    let center = c.center.as_vec2() + Vec2::splat(0.5);
                    let player_center = self.player.actor.tile.as_vec2()
                        + Vec2::splat(0.5);
                    if player_center.distance(center) <= c.radius() {
                        self.player.actor.hp = (self.player.actor.hp
                            + heal)
                            .min(self.player.actor.max_hp);
                    }
                }
            }
        }
    }
}
