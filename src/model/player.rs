use std::cell::RefCell;
use std::f64::consts::TAU;
use std::rc::{Rc, Weak};

use tracing::{debug, info};

use crate::config::PlayerConfig;
use crate::controller::input::{KeyBindings, KeyEvent, KeyboardManager};
use crate::model::actor::{Actor, ActorHandle, ActorKind, ActorOptions};
use crate::model::math::{Aabb, Vector2, Vector3};
use crate::model::observers::ListenerId;
use crate::runtime::Runtime;
use crate::view::render::RenderTarget;

/// Which of the four movement keys are held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveKeys {
    pub up: bool,
    pub left: bool,
    pub down: bool,
    pub right: bool,
}

impl MoveKeys {
    pub fn from_event(bindings: &KeyBindings, event: &KeyEvent) -> Self {
        let held = |keys: &[String]| keys.iter().any(|k| event.is_down(k));
        Self {
            up: held(&bindings.up),
            left: held(&bindings.left),
            down: held(&bindings.down),
            right: held(&bindings.right),
        }
    }

    pub fn any(&self) -> bool {
        self.up || self.left || self.down || self.right
    }

    /// Ground velocity for these keys; zero or exactly `speed` long.
    ///
    /// The scene is viewed rotated 45 degrees around y, so "up" on screen is
    /// the (-1, 0, -1) diagonal in world space.
    pub fn velocity(&self, speed: f64) -> Vector3 {
        let directions = [
            (self.up, Vector3::new(-1.0, 0.0, -1.0)),
            (self.left, Vector3::new(-1.0, 0.0, 1.0)),
            (self.down, Vector3::new(1.0, 0.0, 1.0)),
            (self.right, Vector3::new(1.0, 0.0, -1.0)),
        ];
        let sum = directions
            .iter()
            .filter(|(held, _)| *held)
            .fold(Vector3::ZERO, |acc, (_, dir)| acc + dir.normalize());
        sum.normalize().scale(speed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaddlePhase {
    Idle,
    Waddle { started_ms: f64 },
    Ending { started_ms: f64, from: f64 },
}

/// Result of advancing the waddle animation to a timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaddleStep {
    /// Nothing to animate
    Idle,
    /// Current lean angle in radians, signed
    Lean(f64),
    /// The settle-out just finished; pose should return to neutral
    Settled,
}

/// idle -> waddle -> ending -> idle
#[derive(Debug, Clone, PartialEq)]
pub struct Waddle {
    phase: WaddlePhase,
    amplitude: f64,
    period_ms: f64,
    ending_ms: f64,
}

impl Waddle {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            phase: WaddlePhase::Idle,
            amplitude: config.waddle_amplitude,
            period_ms: config.waddle_period_ms,
            ending_ms: config.ending_duration_ms,
        }
    }

    pub fn phase(&self) -> WaddlePhase {
        self.phase
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Called on every velocity change
    pub fn set_moving(&mut self, moving: bool, now_ms: f64) {
        self.phase = match (self.phase, moving) {
            (WaddlePhase::Idle, true) => WaddlePhase::Waddle { started_ms: now_ms },
            (WaddlePhase::Waddle { .. }, false) => WaddlePhase::Ending {
                started_ms: now_ms,
                from: self.lean_at(now_ms),
            },
            (WaddlePhase::Ending { .. }, true) => {
                // pick up the cycle where the current lean sits
                WaddlePhase::Waddle {
                    started_ms: now_ms - self.phase_time_for(self.lean_at(now_ms)),
                }
            }
            (phase, _) => phase,
        };
        debug!(phase = ?self.phase, "waddle transition");
    }

    /// Advance to `now_ms`
    pub fn step(&mut self, now_ms: f64) -> WaddleStep {
        match self.phase {
            WaddlePhase::Idle => WaddleStep::Idle,
            WaddlePhase::Waddle { .. } => WaddleStep::Lean(self.lean_at(now_ms)),
            WaddlePhase::Ending { started_ms, .. } => {
                if now_ms - started_ms >= self.ending_ms {
                    self.phase = WaddlePhase::Idle;
                    WaddleStep::Settled
                } else {
                    WaddleStep::Lean(self.lean_at(now_ms))
                }
            }
        }
    }

    fn lean_at(&self, now_ms: f64) -> f64 {
        match self.phase {
            WaddlePhase::Idle => 0.0,
            WaddlePhase::Waddle { started_ms } => {
                let elapsed = (now_ms - started_ms).max(0.0);
                self.amplitude * (TAU * elapsed / self.period_ms).sin()
            }
            WaddlePhase::Ending { started_ms, from } => {
                let t = ((now_ms - started_ms) / self.ending_ms).clamp(0.0, 1.0);
                from * (1.0 - t).powi(3)
            }
        }
    }

    /// Time into the cycle at which the lean first equals `lean`
    fn phase_time_for(&self, lean: f64) -> f64 {
        let ratio = if self.amplitude > 0.0 {
            (lean / self.amplitude).clamp(-1.0, 1.0)
        } else {
            0.0
        };
        let mut time = ratio.asin() / TAU * self.period_ms;
        if time < 0.0 {
            time += self.period_ms;
        }
        time
    }
}

/// Player-only actor state
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub config: PlayerConfig,
    pub waddle: Waddle,
}

impl PlayerState {
    pub fn new(config: PlayerConfig) -> Self {
        let waddle = Waddle::new(&config);
        Self { config, waddle }
    }

    /// Anchor that keeps the lean pivoting on the foot it leans toward
    pub fn foot_anchor(&self, lean: f64) -> Vector3 {
        let side = if lean < 0.0 { -1.0 } else { 1.0 };
        Vector3::new(side * self.config.foot_offset, self.config.foot_height, 0.0)
    }
}

/// The waddling character: an actor plus its keyboard wiring
pub struct Player {
    actor: ActorHandle,
    keyboard: Weak<RefCell<KeyboardManager>>,
    input_listener: Option<ListenerId>,
}

impl Player {
    pub fn spawn(runtime: &Runtime, config: PlayerConfig, target: Option<Box<dyn RenderTarget>>) -> Self {
        let half = Vector2::splat(config.collision_half_extent);
        let base_yaw = config.base_yaw;
        let actor = Actor::spawn(
            runtime,
            ActorOptions {
                render_target: target,
                collision_enabled: true,
                is_static: false,
                collision_box: Aabb::new(Vector2::ZERO, half),
                kind: ActorKind::Player(PlayerState::new(config)),
            },
        );
        actor
            .borrow_mut()
            .set_rotation(Vector3::new(0.0, base_yaw, 0.0));
        info!("player spawned as {}", actor.borrow().id());

        Self {
            actor,
            keyboard: Rc::downgrade(runtime.keyboard()),
            input_listener: None,
        }
    }

    pub fn actor(&self) -> &ActorHandle {
        &self.actor
    }

    /// Drive velocity from the movement keys; replaces any earlier binding
    pub fn attach_input(&mut self, bindings: KeyBindings) {
        self.detach_input();
        let Some(keyboard) = self.keyboard.upgrade() else { return };
        let actor = Rc::downgrade(&self.actor);
        let id = keyboard.borrow_mut().on_key(move |event: &KeyEvent| {
            if !bindings.is_movement(&event.key) {
                return;
            }
            let Some(actor) = actor.upgrade() else { return };
            let keys = MoveKeys::from_event(&bindings, event);
            let mut actor = actor.borrow_mut();
            let speed = actor.player().map_or(0.0, |p| p.config.move_speed);
            actor.set_velocity(keys.velocity(speed));
        });
        self.input_listener = Some(id);
    }

    pub fn detach_input(&mut self) {
        if let (Some(id), Some(keyboard)) = (self.input_listener.take(), self.keyboard.upgrade()) {
            keyboard.borrow_mut().off_key(id);
        }
    }

    pub fn destroy(&mut self) {
        self.detach_input();
        let collisions = {
            let mut actor = self.actor.borrow_mut();
            actor.destroy();
            actor.collisions()
        };
        if let Some(collisions) = collisions {
            collisions.deliver_pending();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waddle() -> Waddle {
        Waddle::new(&PlayerConfig::default())
    }

    #[test]
    fn velocity_is_zero_or_move_speed() {
        let speed = PlayerConfig::default().move_speed;
        for bits in 0u8..16 {
            let keys = MoveKeys {
                up: bits & 1 != 0,
                left: bits & 2 != 0,
                down: bits & 4 != 0,
                right: bits & 8 != 0,
            };
            let v = keys.velocity(speed);
            let m = v.magnitude();
            assert!(m == 0.0 || (m - speed).abs() < 1e-9, "{keys:?} gave |v| = {m}");
            assert_eq!(v.y, 0.0);
        }
        assert_eq!(MoveKeys::default().velocity(speed), Vector3::ZERO);
        assert_eq!(MoveKeys { up: true, down: true, ..Default::default() }.velocity(speed), Vector3::ZERO);
    }

    #[test]
    fn up_moves_along_the_screen_diagonal() {
        let v = MoveKeys { up: true, ..Default::default() }.velocity(2.0);
        let d = 2.0 / 2f64.sqrt();
        assert!(v.approx_eq(Vector3::new(-d, 0.0, -d), 1e-9));
    }

    #[test]
    fn lean_stays_within_amplitude() {
        let mut w = waddle();
        w.set_moving(true, 1000.0);
        assert!(matches!(w.phase(), WaddlePhase::Waddle { started_ms } if started_ms == 1000.0));
        let mut peak: f64 = 0.0;
        for i in 0..500 {
            let WaddleStep::Lean(angle) = w.step(1000.0 + i as f64 * 3.7) else {
                panic!("expected a lean while waddling");
            };
            assert!(angle.abs() <= w.amplitude() + 1e-12, "lean {angle} above amplitude");
            peak = peak.max(angle.abs());
        }
        assert!(peak > w.amplitude() * 0.99, "lean should reach the amplitude");
    }

    #[test]
    fn ending_decays_monotonically_then_settles() {
        let config = PlayerConfig::default();
        let mut w = waddle();
        w.set_moving(true, 0.0);
        // a quarter period in, the lean is at its peak
        let stop = config.waddle_period_ms / 4.0;
        w.set_moving(false, stop);
        let WaddlePhase::Ending { from, .. } = w.phase() else {
            panic!("stopping should start the settle-out");
        };
        assert!((from - config.waddle_amplitude).abs() < 1e-9);

        let mut previous = from.abs();
        let mut t = stop;
        loop {
            t += 10.0;
            match w.step(t) {
                WaddleStep::Lean(angle) => {
                    assert!(angle.abs() <= previous, "lean grew from {previous} to {angle}");
                    previous = angle.abs();
                }
                WaddleStep::Settled => break,
                WaddleStep::Idle => panic!("skipped the settle step"),
            }
        }
        assert!(t - stop >= config.ending_duration_ms);
        assert_eq!(w.phase(), WaddlePhase::Idle);
        assert_eq!(w.step(t + 10.0), WaddleStep::Idle);
    }

    #[test]
    fn restarting_mid_ending_resumes_at_the_current_lean() {
        let mut w = waddle();
        w.set_moving(true, 0.0);
        w.set_moving(false, 100.0);
        let WaddleStep::Lean(before) = w.step(150.0) else {
            panic!("still settling");
        };
        w.set_moving(true, 150.0);
        let WaddleStep::Lean(after) = w.step(150.0) else {
            panic!("waddling again");
        };
        assert!((before - after).abs() < 1e-9, "lean jumped from {before} to {after}");
    }

    #[test]
    fn anchor_follows_lean_side() {
        let state = PlayerState::new(PlayerConfig::default());
        assert!(state.foot_anchor(0.1).x > 0.0);
        assert!(state.foot_anchor(-0.1).x < 0.0);
    }
}
