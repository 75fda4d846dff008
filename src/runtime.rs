use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::controller::{CollisionController, FrameClock, FrameController, KeyboardManager};
use crate::model::Camera;

/// Identity of anything registered with the frame or collision controllers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Application context: the one scheduler, collision tracker, keyboard table
/// and camera of a scene. Build it once at startup and pass it by reference
/// to anything that needs to register itself.
pub struct Runtime {
    frames: Rc<FrameController>,
    collisions: Rc<CollisionController>,
    keyboard: Rc<RefCell<KeyboardManager>>,
    camera: Rc<RefCell<Camera>>,
    camera_id: ObjectId,
    clock: FrameClock,
    next_id: Cell<u64>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        let clock = FrameClock::new();
        let collisions = Rc::new(CollisionController::new());
        let frames = Rc::new(FrameController::new(collisions.clone(), clock.clone()));

        let camera = Rc::new(RefCell::new(Camera::new()));
        let camera_id = ObjectId::new(0);
        frames.add(camera_id, camera.clone());

        Self {
            frames,
            collisions,
            keyboard: Rc::new(RefCell::new(KeyboardManager::new())),
            camera,
            camera_id,
            clock,
            next_id: Cell::new(1),
        }
    }

    pub fn next_id(&self) -> ObjectId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        ObjectId::new(id)
    }

    pub fn frames(&self) -> &Rc<FrameController> {
        &self.frames
    }

    pub fn collisions(&self) -> &Rc<CollisionController> {
        &self.collisions
    }

    pub fn keyboard(&self) -> &Rc<RefCell<KeyboardManager>> {
        &self.keyboard
    }

    pub fn camera(&self) -> &Rc<RefCell<Camera>> {
        &self.camera
    }

    pub fn camera_id(&self) -> ObjectId {
        self.camera_id
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Forward a platform animation frame timestamp (ms)
    pub fn on_animation_frame(&self, now_ms: f64) -> Option<f64> {
        self.frames.on_animation_frame(now_ms)
    }
}
