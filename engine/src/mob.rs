use glam::IVec2;
use rand::seq::SliceRandom;
use util::{GameRng, VecExt, DIR_4};
use world::Level;

use crate::{a_star, MovementController, BOB_AMPLITUDE, BOB_FREQUENCY};

/// Shared actor state for the player and monsters.
///
/// The integer tile is the authoritative logical position; the controller's
/// interpolated floats are visual-only and never read by game logic.
#[derive(Clone, Debug)]
pub struct Actor {
    pub tile: IVec2,
    pub facing_left: bool,
    pub hp: i32,
    pub max_hp: i32,
    pub damage: i32,
    /// Seconds between melee swings.
    pub attack_rate: f32,
    pub bob_offset: f32,
    pub controller: MovementController,
}

impl Actor {
    pub fn new(tile: IVec2, hp: i32, damage: i32, speed: f32) -> Self {
        let mut controller = MovementController::new(speed, 4.0);
        controller.warp(tile.as_vec2());
        Actor {
            tile,
            facing_left: false,
            hp,
            max_hp: hp,
            damage,
            attack_rate: 1.0,
            bob_offset: 0.0,
            controller,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Commit a completed movement step as the new logical position.
    pub fn commit_step(&mut self, tile: IVec2) {
        if tile.x != self.tile.x {
            self.facing_left = tile.x < self.tile.x;
        }
        self.tile = tile;
    }
}

/// Monster dispositions. Both latch into a chase once the player comes
/// within the trigger radius (chessboard distance).
#[derive(Clone, Debug, PartialEq)]
pub enum Behavior {
    /// Stands still until the player wanders close.
    Ambush { triggered: bool, trigger_radius: i32 },
    /// Takes a random cardinal step every `cooldown_ticks` while idle.
    Roam {
        cooldown_ticks: u32,
        counter: u32,
        triggered: bool,
        trigger_radius: i32,
    },
}

enum Action {
    Idle,
    Wander,
    Chase,
}

#[derive(Clone, Debug)]
pub struct Monster {
    pub actor: Actor,
    pub behavior: Behavior,
    /// Enemy level, feeds the experience reward.
    pub level: u32,
    ticks: u32,
    /// Ticks between path recomputes while chasing.
    movement_duration: u32,
    attack_cooldown: f32,
}

impl Monster {
    pub fn new(actor: Actor, behavior: Behavior, level: u32) -> Self {
        Monster {
            actor,
            behavior,
            level,
            ticks: 0,
            movement_duration: 8,
            attack_cooldown: 0.0,
        }
    }

    pub fn is_triggered(&self) -> bool {
        match self.behavior {
            Behavior::Ambush { triggered, .. } => triggered,
            Behavior::Roam { triggered, .. } => triggered,
        }
    }

    /// Run one behavior tick. Returns melee damage dealt to the player if
    /// the monster attacked.
    pub fn update(
        &mut self,
        level: &Level,
        player_tile: IVec2,
        dt: f32,
        rng: &mut GameRng,
    ) -> Option<i32> {
        self.ticks += 1;
        self.actor.bob_offset =
            BOB_AMPLITUDE * (BOB_FREQUENCY * self.ticks as f32).sin();
        // Repeated f32 subtraction leaves residue that would stall the
        // swing one tick past the rate; snap near-zero remainders down.
        self.attack_cooldown = (self.attack_cooldown - dt).max(0.0);
        if self.attack_cooldown < 1e-4 {
            self.attack_cooldown = 0.0;
        }

        match self.decide(player_tile) {
            Action::Idle => {}
            Action::Wander => self.wander(level, rng),
            Action::Chase => self.chase(level, player_tile),
        }

        let in_reach = (player_tile - self.actor.tile).cheb_len() <= 1;
        if self.is_triggered() && in_reach && self.attack_cooldown <= 0.0 {
            self.attack_cooldown = self.actor.attack_rate;
            return Some(self.actor.damage);
        }
        None
    }

    fn decide(&mut self, player_tile: IVec2) -> Action {
        let dist = (player_tile - self.actor.tile).cheb_len();
        match &mut self.behavior {
            Behavior::Ambush {
                triggered,
                trigger_radius,
            } => {
                if dist <= *trigger_radius {
                    *triggered = true;
                }
                if *triggered {
                    Action::Chase
                } else {
                    Action::Idle
                }
            }
            Behavior::Roam {
                cooldown_ticks,
                counter,
                triggered,
                trigger_radius,
            } => {
                if dist <= *trigger_radius {
                    *triggered = true;
                }
                if *triggered {
                    return Action::Chase;
                }
                *counter += 1;
                if *counter >= *cooldown_ticks {
                    *counter = 0;
                    Action::Wander
                } else {
                    Action::Idle
                }
            }
        }
    }

    fn wander(&mut self, level: &Level, rng: &mut GameRng) {
        if self.actor.controller.has_path() {
            return;
        }
        let mut dirs = DIR_4;
        dirs.shuffle(rng);
        if let Some(&d) = dirs
            .iter()
            .find(|&&d| level.is_walkable(self.actor.tile + d))
        {
            self.actor.controller.set_path([self.actor.tile + d]);
        }
    }

    fn chase(&mut self, level: &Level, player_tile: IVec2) {
        if self.ticks % self.movement_duration != 0 {
            return;
        }
        if let Some(path) = a_star(level, self.actor.tile, player_tile) {
            // Skip the start tile and stop short of the player's tile.
            let steps: Vec<IVec2> =
                path.into_iter().skip(1).collect();
            let steps = &steps[..steps.len().saturating_sub(1)];
            self.actor.controller.set_path(steps.iter().copied());
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::ivec2;
    use pretty_assertions::assert_eq;
    use util::gen_rng;

    use super::*;
    use world::DEFAULT_TILE_SIZE;

    fn arena() -> Level {
        let mut level = Level::blank(16, 16, DEFAULT_TILE_SIZE);
        for y in 1..15 {
            for x in 1..15 {
                level.set_walkable([x, y], true);
            }
        }
        level
    }

    fn ambusher(tile: IVec2, radius: i32) -> Monster {
        Monster::new(
            Actor::new(tile, 10, 2, 4.0),
            Behavior::Ambush {
                triggered: false,
                trigger_radius: radius,
            },
            1,
        )
    }

    #[test]
    fn ambush_latches_on_proximity() {
        let level = arena();
        let mut rng = gen_rng(7);
        let mut m = ambusher(ivec2(3, 3), 3);

        m.update(&level, ivec2(10, 10), 0.1, &mut rng);
        assert!(!m.is_triggered());

        m.update(&level, ivec2(5, 5), 0.1, &mut rng);
        assert!(m.is_triggered());

        // Stays latched after the player retreats.
        m.update(&level, ivec2(12, 12), 0.1, &mut rng);
        assert!(m.is_triggered());
    }

    #[test]
    fn chase_sets_a_path_toward_player() {
        let level = arena();
        let mut rng = gen_rng(7);
        let mut m = ambusher(ivec2(3, 3), 8);
        m.movement_duration = 1;

        m.update(&level, ivec2(7, 3), 0.1, &mut rng);
        assert!(m.actor.controller.has_path());
    }

    #[test]
    fn roamer_steps_only_on_cooldown() {
        let level = arena();
        let mut rng = gen_rng(3);
        let mut m = Monster::new(
            Actor::new(ivec2(8, 8), 10, 1, 4.0),
            Behavior::Roam {
                cooldown_ticks: 5,
                counter: 0,
                triggered: false,
                trigger_radius: 2,
            },
            1,
        );

        for _ in 0..4 {
            m.update(&level, ivec2(1, 1), 0.1, &mut rng);
            assert!(!m.actor.controller.has_path());
        }
        m.update(&level, ivec2(1, 1), 0.1, &mut rng);
        assert!(m.actor.controller.has_path());
    }

    #[test]
    fn melee_respects_attack_rate() {
        let level = arena();
        let mut rng = gen_rng(7);
        let mut m = ambusher(ivec2(3, 3), 3);
        m.actor.attack_rate = 0.5;

        let player = ivec2(4, 3);
        assert_eq!(m.update(&level, player, 0.1, &mut rng), Some(2));
        // Cooling down.
        assert_eq!(m.update(&level, player, 0.1, &mut rng), None);
        for _ in 0..3 {
            assert_eq!(m.update(&level, player, 0.1, &mut rng), None);
        }
        assert_eq!(m.update(&level, player, 0.1, &mut rng), Some(2));
    }
}
