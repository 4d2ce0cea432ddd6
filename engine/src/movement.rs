use std::collections::VecDeque;

use glam::{IVec2, Vec2};

/// How the controller derives its position each tick.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum MoveMode {
    #[default]
    Path,
    Velocity,
}

/// Unified movement for every actor.
///
/// The integer tile owned by the actor stays authoritative; the controller
/// only produces the interpolated visual position and reports completed
/// steps so the owner can commit the tile.
#[derive(Clone, Debug, Default)]
pub struct MovementController {
    mode: MoveMode,
    speed: f32,
    interp: Vec2,
    path: VecDeque<IVec2>,
    start: Vec2,
    target: IVec2,
    interp_ticks: f32,
    /// Ticks it takes to cross one tile in path mode.
    duration: f32,
    velocity: Vec2,
    moving: bool,
}

impl MovementController {
    pub fn new(speed: f32, duration: f32) -> Self {
        MovementController {
            speed,
            duration: duration.max(1.0),
            ..Default::default()
        }
    }

    pub fn mode(&self) -> MoveMode {
        self.mode
    }

    pub fn position(&self) -> Vec2 {
        self.interp
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub fn has_path(&self) -> bool {
        !self.path.is_empty() || (self.mode == MoveMode::Path && self.moving)
    }

    /// Teleport the interpolated position, dropping any in-flight step.
    pub fn warp(&mut self, pos: Vec2) {
        self.interp = pos;
        self.moving = false;
    }

    pub fn set_path(&mut self, path: impl IntoIterator<Item = IVec2>) {
        self.mode = MoveMode::Path;
        self.path = path.into_iter().collect();
        self.moving = false;
    }

    /// Point the controller in a direction at its configured speed.
    pub fn set_velocity(&mut self, dir: Vec2) {
        self.mode = MoveMode::Velocity;
        self.velocity = dir.normalize_or_zero() * self.speed;
    }

    /// Set an exact velocity, bypassing speed normalisation. Used by dash
    /// and grapple flight.
    pub fn set_velocity_raw(&mut self, velocity: Vec2) {
        self.mode = MoveMode::Velocity;
        self.velocity = velocity;
    }

    /// Halt. The queued path survives so movement can be resumed.
    pub fn stop(&mut self) {
        self.velocity = Vec2::ZERO;
        self.moving = false;
    }

    /// Advance one tick. Returns the tile that was reached if a path step
    /// completed this tick.
    pub fn update(&mut self, dt: f32) -> Option<IVec2> {
        match self.mode {
            MoveMode::Velocity => {
                self.interp += self.velocity * dt;
                None
            }
            MoveMode::Path => {
                if !self.moving {
                    let next = self.path.pop_front()?;
                    self.start = self.interp;
                    self.target = next;
                    self.interp_ticks = 0.0;
                    self.moving = true;
                }

                self.interp_ticks += 1.0;
                let t = (self.interp_ticks / self.duration).min(1.0);
                self.interp = self.start.lerp(self.target.as_vec2(), t);

                if t >= 1.0 {
                    self.interp = self.target.as_vec2();
                    self.moving = false;
                    Some(self.target)
                } else {
                    None
                }
            }
        }
    }
}
