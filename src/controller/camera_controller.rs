use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, info, warn};

use crate::config::{CameraRig, DebugFlyConfig};
use crate::controller::input::{FlyBindings, KeyEvent, KeyEventKind, KeyboardManager};
use crate::model::actor::{Actor, ActorHandle, Property};
use crate::model::math::{Matrix3, Vector3};
use crate::model::observers::{ListenerId, Observers};
use crate::model::Camera;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEvent {
    CameraUpdated,
    SceneTransitioningUpdated(bool),
}

/// Free-fly camera: every key press moves or turns the camera by a fixed step
pub struct DebugFly {
    config: DebugFlyConfig,
    bindings: FlyBindings,
    keyboard: Weak<RefCell<KeyboardManager>>,
    listener: Option<ListenerId>,
}

impl DebugFly {
    pub fn new(config: DebugFlyConfig, bindings: FlyBindings) -> Self {
        Self {
            config,
            bindings,
            keyboard: Weak::new(),
            listener: None,
        }
    }

    /// Returns false for keys this controller does not handle
    pub fn apply_key(&self, camera: &mut Camera, key: &str) -> bool {
        fly_step(&self.config, &self.bindings, camera, key)
    }

    fn attach(&mut self, keyboard: &Rc<RefCell<KeyboardManager>>, camera: &Rc<RefCell<Camera>>) {
        self.detach();
        let config = self.config.clone();
        let bindings = self.bindings.clone();
        let camera = Rc::downgrade(camera);
        let id = keyboard.borrow_mut().on_key(move |event: &KeyEvent| {
            if event.kind != KeyEventKind::Down {
                return;
            }
            if let Some(camera) = camera.upgrade() {
                fly_step(&config, &bindings, &mut camera.borrow_mut(), &event.key);
            }
        });
        self.keyboard = Rc::downgrade(keyboard);
        self.listener = Some(id);
    }

    fn detach(&mut self) {
        let (Some(id), Some(keyboard)) = (self.listener.take(), self.keyboard.upgrade()) else { return };
        match keyboard.try_borrow_mut() {
            Ok(mut keyboard) => {
                keyboard.off_key(id);
            }
            Err(_) => warn!("keyboard busy, free-fly listener left subscribed"),
        };
    }
}

fn fly_step(config: &DebugFlyConfig, bindings: &FlyBindings, camera: &mut Camera, key: &str) -> bool {
    let step = config.move_step;
    let turn = config.rotation_step;
    let position = camera.position();
    let mut rotation = camera.rotation();
    // planar moves follow the camera's heading only
    let heading = Matrix3::from_euler_angles(0.0, rotation.y, 0.0);

    let moved = if key == bindings.forward {
        Some(heading * (Vector3::FORWARD * -step))
    } else if key == bindings.backward {
        Some(heading * (Vector3::FORWARD * step))
    } else if key == bindings.left {
        Some(heading * (Vector3::LEFT * step))
    } else if key == bindings.right {
        Some(heading * (Vector3::RIGHT * step))
    } else if key == bindings.rise {
        Some(Vector3::new(0.0, -step, 0.0))
    } else if key == bindings.sink {
        Some(Vector3::new(0.0, step, 0.0))
    } else {
        None
    };
    if let Some(delta) = moved {
        camera.set_position(position + delta);
        return true;
    }

    if key == bindings.pitch_up {
        rotation.x += turn;
    } else if key == bindings.pitch_down {
        rotation.x -= turn;
    } else if key == bindings.yaw_left {
        rotation.y += turn;
    } else if key == bindings.yaw_right {
        rotation.y -= turn;
    } else {
        return false;
    }
    camera.set_rotation(rotation);
    true
}

/// Keeps the camera at a fixed offset from a tracked actor, updated from the
/// actor's position notifications rather than polled each frame.
pub struct PlayerFollow {
    rig: CameraRig,
    tracked: Option<(Weak<RefCell<Actor>>, ListenerId)>,
}

impl PlayerFollow {
    pub fn new(rig: CameraRig) -> Self {
        Self { rig, tracked: None }
    }

    pub fn rig(&self) -> &CameraRig {
        &self.rig
    }

    pub fn is_following(&self) -> bool {
        self.tracked.as_ref().is_some_and(|(actor, _)| actor.strong_count() > 0)
    }

    fn follow(&mut self, actor: &ActorHandle, camera: &Rc<RefCell<Camera>>) {
        self.detach();
        let offset = self.rig.position_offset();
        let rotation = self.rig.rotation;

        let weak_camera = Rc::downgrade(camera);
        let id = actor.borrow_mut().on(Property::Position, move |position| {
            if let Some(camera) = weak_camera.upgrade() {
                place(&mut camera.borrow_mut(), *position + offset, rotation);
            }
        });
        place(&mut camera.borrow_mut(), actor.borrow().position() + offset, rotation);
        self.tracked = Some((Rc::downgrade(actor), id));
    }

    fn detach(&mut self) {
        let Some((actor, id)) = self.tracked.take() else { return };
        let Some(actor) = actor.upgrade() else { return };
        match actor.try_borrow_mut() {
            Ok(mut actor) => {
                actor.off(Property::Position, id);
            }
            Err(_) => warn!("tracked actor busy, follow listener left subscribed"),
        };
    }
}

fn place(camera: &mut Camera, position: Vector3, rotation: Vector3) {
    camera.set_position(position);
    camera.set_rotation(rotation);
}

pub enum ControllerKind {
    Debug(DebugFly),
    PlayerFollow(PlayerFollow),
}

/// Drives the shared camera in one of two modes. Dropping the controller
/// detaches it.
pub struct CameraController {
    camera: Rc<RefCell<Camera>>,
    scene_transitioning: bool,
    events: Observers<ControllerEvent>,
    kind: ControllerKind,
    keyboard: Weak<RefCell<KeyboardManager>>,
}

impl CameraController {
    /// Free-fly controller; marks the scene as transitioning
    pub fn debug(
        camera: Rc<RefCell<Camera>>,
        keyboard: &Rc<RefCell<KeyboardManager>>,
        config: DebugFlyConfig,
        bindings: FlyBindings,
    ) -> Self {
        let mut fly = DebugFly::new(config, bindings);
        fly.attach(keyboard, &camera);
        info!("debug camera controller active");
        Self {
            camera,
            scene_transitioning: true,
            events: Observers::new(),
            kind: ControllerKind::Debug(fly),
            keyboard: Rc::downgrade(keyboard),
        }
    }

    pub fn player_follow(camera: Rc<RefCell<Camera>>, rig: CameraRig) -> Self {
        Self {
            camera,
            scene_transitioning: false,
            events: Observers::new(),
            kind: ControllerKind::PlayerFollow(PlayerFollow::new(rig)),
            keyboard: Weak::new(),
        }
    }

    pub fn kind(&self) -> &ControllerKind {
        &self.kind
    }

    pub fn camera(&self) -> &Rc<RefCell<Camera>> {
        &self.camera
    }

    /// Start tracking `actor`; the camera snaps to it immediately.
    /// Ignored by the free-fly controller.
    pub fn follow(&mut self, actor: &ActorHandle) {
        match &mut self.kind {
            ControllerKind::PlayerFollow(follow) => {
                follow.follow(actor, &self.camera);
                debug!("camera following actor {}", actor.borrow().id());
            }
            ControllerKind::Debug(_) => debug!("free-fly camera ignores follow"),
        }
    }

    /// Drop every input or actor subscription this controller holds
    pub fn detach(&mut self) {
        match &mut self.kind {
            ControllerKind::Debug(fly) => fly.detach(),
            ControllerKind::PlayerFollow(follow) => follow.detach(),
        }
    }

    /// Point the controller at another camera, moving its subscriptions over
    pub fn set_camera(&mut self, camera: Rc<RefCell<Camera>>) {
        self.camera = camera;
        match &mut self.kind {
            ControllerKind::Debug(fly) => {
                if let Some(keyboard) = self.keyboard.upgrade() {
                    fly.attach(&keyboard, &self.camera);
                }
            }
            ControllerKind::PlayerFollow(follow) => {
                let actor = follow.tracked.as_ref().and_then(|(actor, _)| actor.upgrade());
                if let Some(actor) = actor {
                    follow.follow(&actor, &self.camera);
                }
            }
        }
        self.events.emit(&ControllerEvent::CameraUpdated);
    }

    pub fn scene_transitioning(&self) -> bool {
        self.scene_transitioning
    }

    pub fn set_scene_transitioning(&mut self, transitioning: bool) {
        self.scene_transitioning = transitioning;
        self.events
            .emit(&ControllerEvent::SceneTransitioningUpdated(transitioning));
    }

    pub fn on_event(&mut self, listener: impl FnMut(&ControllerEvent) + 'static) -> ListenerId {
        self.events.subscribe(listener)
    }

    pub fn off_event(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }
}

impl Drop for CameraController {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::actor::ActorOptions;
    use crate::runtime::Runtime;
    use std::f64::consts::FRAC_PI_2;

    fn fly() -> DebugFly {
        DebugFly::new(DebugFlyConfig::default(), FlyBindings::default())
    }

    #[test]
    fn forward_moves_against_the_heading() {
        let mut camera = Camera::new();
        assert!(fly().apply_key(&mut camera, "w"));
        assert!(camera.position().approx_eq(Vector3::new(0.0, 0.0, -5.0), 1e-9));

        // turned a quarter to the left, forward is now -x
        camera.set_position(Vector3::ZERO);
        camera.set_rotation(Vector3::new(0.0, FRAC_PI_2, 0.0));
        fly().apply_key(&mut camera, "w");
        assert!(camera.position().approx_eq(Vector3::new(-5.0, 0.0, 0.0), 1e-9), "{}", camera.position());
    }

    #[test]
    fn rotation_keys_step_and_unknown_keys_are_ignored() {
        let mut camera = Camera::new();
        let step = DebugFlyConfig::default().rotation_step;
        fly().apply_key(&mut camera, "i");
        fly().apply_key(&mut camera, "j");
        fly().apply_key(&mut camera, "j");
        assert!(camera.rotation().approx_eq(Vector3::new(step, 2.0 * step, 0.0), 1e-12));

        fly().apply_key(&mut camera, " ");
        assert_eq!(camera.position().y, -5.0);

        let before = camera.position();
        assert!(!fly().apply_key(&mut camera, "q"));
        assert_eq!(camera.position(), before);
    }

    #[test]
    fn debug_controller_reacts_to_key_presses_only() {
        let runtime = Runtime::new();
        let controller = CameraController::debug(
            runtime.camera().clone(),
            runtime.keyboard(),
            DebugFlyConfig::default(),
            FlyBindings::default(),
        );
        assert!(controller.scene_transitioning());

        runtime.keyboard().borrow_mut().key_down("s");
        runtime.keyboard().borrow_mut().key_up("s");
        let z = runtime.camera().borrow().position().z;
        assert!((z - 5.0).abs() < 1e-9, "one step per press, got {z}");
    }

    #[test]
    fn follow_tracks_position_updates() {
        let runtime = Runtime::new();
        let rig = CameraRig::default();
        let offset = rig.position_offset();
        let mut controller = CameraController::player_follow(runtime.camera().clone(), rig.clone());
        assert!(!controller.scene_transitioning());

        let actor = Actor::spawn(&runtime, ActorOptions::default());
        actor.borrow_mut().set_position(Vector3::new(2.0, 0.0, 3.0));
        controller.follow(&actor);

        let camera = runtime.camera().clone();
        assert!(camera.borrow().position().approx_eq(Vector3::new(2.0, 0.0, 3.0) + offset, 1e-9));
        assert_eq!(camera.borrow().rotation(), rig.rotation);

        actor.borrow_mut().set_velocity(Vector3::new(1.0, 0.0, 0.0));
        runtime.on_animation_frame(0.0);
        runtime.on_animation_frame(1000.0);
        assert!(camera.borrow().position().approx_eq(Vector3::new(3.0, 0.0, 3.0) + offset, 1e-9));

        controller.detach();
        actor.borrow_mut().set_position(Vector3::new(50.0, 0.0, 50.0));
        assert!(camera.borrow().position().approx_eq(Vector3::new(3.0, 0.0, 3.0) + offset, 1e-9));
    }

    #[test]
    fn controller_events() {
        let runtime = Runtime::new();
        let mut controller = CameraController::player_follow(runtime.camera().clone(), CameraRig::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        controller.on_event(move |e| sink.borrow_mut().push(*e));

        controller.set_scene_transitioning(true);
        controller.set_camera(Rc::new(RefCell::new(Camera::new())));
        assert_eq!(
            *seen.borrow(),
            vec![ControllerEvent::SceneTransitioningUpdated(true), ControllerEvent::CameraUpdated]
        );
    }

    #[test]
    fn dropping_a_controller_releases_its_subscriptions() {
        let runtime = Runtime::new();
        let camera = runtime.camera().clone();
        let fly = CameraController::debug(
            camera.clone(),
            runtime.keyboard(),
            DebugFlyConfig::default(),
            FlyBindings::default(),
        );
        drop(fly);
        runtime.keyboard().borrow_mut().key_down("w");
        assert_eq!(camera.borrow().position(), Vector3::ZERO);

        let actor = Actor::spawn(&runtime, ActorOptions::default());
        let mut follow = CameraController::player_follow(camera.clone(), CameraRig::default());
        follow.follow(&actor);
        let placed = camera.borrow().position();
        drop(follow);
        actor.borrow_mut().set_position(Vector3::new(9.0, 0.0, 9.0));
        assert_eq!(camera.borrow().position(), placed);
    }
}
