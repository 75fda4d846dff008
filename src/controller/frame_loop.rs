use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::controller::CollisionController;
use crate::runtime::ObjectId;

/// Something the frame controller advances every display frame
pub trait FrameUpdatable {
    /// Logic step: movement, animation, collision boxes
    fn update_frame(&mut self, delta_seconds: f64);
    /// Visual commit, runs after collision detection
    fn update_style(&mut self, delta_seconds: f64);
}

pub type UpdatableHandle = Rc<RefCell<dyn FrameUpdatable>>;

/// Timestamp of the most recent animation frame, shared with anything that
/// needs "now" outside the tick (e.g. input handlers starting animations).
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last_ms: Rc<Cell<Option<f64>>>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last frame timestamp in milliseconds, 0 before the first frame
    pub fn now_ms(&self) -> f64 {
        self.last_ms.get().unwrap_or(0.0)
    }

    pub fn last_ms(&self) -> Option<f64> {
        self.last_ms.get()
    }

    fn set(&self, ms: f64) {
        self.last_ms.set(Some(ms));
    }
}

/// Per-frame scheduler.
///
/// Each tick runs three phases over all registered updatables: every
/// `update_frame`, then one collision pass, then every `update_style`.
/// The list is snapshotted at the start of each phase, so updatables may
/// register or unregister from inside a phase.
pub struct FrameController {
    updatables: RefCell<Vec<(ObjectId, UpdatableHandle)>>,
    collisions: Rc<CollisionController>,
    clock: FrameClock,
}

impl FrameController {
    pub fn new(collisions: Rc<CollisionController>, clock: FrameClock) -> Self {
        Self {
            updatables: RefCell::new(Vec::new()),
            collisions,
            clock,
        }
    }

    pub fn add(&self, id: ObjectId, updatable: UpdatableHandle) {
        let mut updatables = self.updatables.borrow_mut();
        if updatables.iter().any(|(existing, _)| *existing == id) {
            return;
        }
        updatables.push((id, updatable));
    }

    /// Returns false if nothing was registered under `id`
    pub fn remove(&self, id: ObjectId) -> bool {
        let mut updatables = self.updatables.borrow_mut();
        let before = updatables.len();
        updatables.retain(|(existing, _)| *existing != id);
        updatables.len() != before
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.updatables.borrow().iter().any(|(existing, _)| *existing == id)
    }

    pub fn len(&self) -> usize {
        self.updatables.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.updatables.borrow().is_empty()
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Animation frame callback. The first call only records the timestamp;
    /// later calls advance the simulation and return the delta in seconds.
    pub fn on_animation_frame(&self, now_ms: f64) -> Option<f64> {
        let Some(last_ms) = self.clock.last_ms() else {
            debug!("first animation frame at {:.1}ms", now_ms);
            self.clock.set(now_ms);
            return None;
        };

        let delta_seconds = (now_ms - last_ms) / 1000.0;
        self.clock.set(now_ms);
        self.tick(delta_seconds, now_ms / 1000.0);
        Some(delta_seconds)
    }

    fn tick(&self, delta_seconds: f64, time_seconds: f64) {
        trace!(delta_seconds, "tick");

        for updatable in self.snapshot() {
            updatable.borrow_mut().update_frame(delta_seconds);
        }

        self.collisions.update(time_seconds);

        for updatable in self.snapshot() {
            updatable.borrow_mut().update_style(delta_seconds);
        }
    }

    fn snapshot(&self) -> Vec<UpdatableHandle> {
        self.updatables
            .borrow()
            .iter()
            .map(|(_, updatable)| updatable.clone())
            .collect()
    }
}
