use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::controller::frame_loop::{FrameClock, FrameController, FrameUpdatable};
use crate::controller::CollisionController;
use crate::model::math::{Aabb, Vector2, Vector3};
use crate::model::observers::{ListenerId, Observers};
use crate::model::player::{PlayerState, WaddleStep};
use crate::model::Transform;
use crate::runtime::{ObjectId, Runtime};
use crate::view::render::{RenderTarget, TransformDescriptor};

pub type ActorHandle = Rc<RefCell<Actor>>;

/// Transform fields that emit change notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Position,
    Rotation,
    Scale,
    Anchor,
}

/// What an actor is, beyond its transform
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ActorKind {
    #[default]
    Prop,
    /// Invisible static wall
    Barrier,
    Player(PlayerState),
}

pub struct ActorOptions {
    pub render_target: Option<Box<dyn RenderTarget>>,
    pub collision_enabled: bool,
    pub is_static: bool,
    pub collision_box: Aabb,
    pub kind: ActorKind,
}

impl Default for ActorOptions {
    fn default() -> Self {
        Self {
            render_target: None,
            collision_enabled: false,
            is_static: false,
            collision_box: Aabb::default(),
            kind: ActorKind::Prop,
        }
    }
}

impl ActorOptions {
    /// Static collidable wall with the given ground-plane half extents
    pub fn barrier(half_extents: Vector2) -> Self {
        Self {
            collision_enabled: true,
            is_static: true,
            collision_box: Aabb::new(Vector2::ZERO, half_extents),
            kind: ActorKind::Barrier,
            ..Self::default()
        }
    }
}

#[derive(Default)]
struct PropertyListeners {
    position: Observers<Vector3>,
    rotation: Observers<Vector3>,
    scale: Observers<Vector3>,
    anchor: Observers<Vector3>,
}

impl PropertyListeners {
    fn get(&mut self, property: Property) -> &mut Observers<Vector3> {
        match property {
            Property::Position => &mut self.position,
            Property::Rotation => &mut self.rotation,
            Property::Scale => &mut self.scale,
            Property::Anchor => &mut self.anchor,
        }
    }
}

/// An animatable, collidable scene object.
///
/// Actors register with the frame controller when spawned and, when
/// collision is enabled, with the collision controller's static or moving
/// bucket. Both registrations are undone by [`Actor::destroy`].
///
/// Property listeners run synchronously inside the setter while the actor
/// is mutably borrowed, so they must not borrow the actor again.
pub struct Actor {
    id: ObjectId,
    this: Weak<RefCell<Actor>>,
    transform: Transform,
    velocity: Vector3,
    dirty: bool,
    needs_commit: bool,
    render_target: Option<Box<dyn RenderTarget>>,
    collision_box: Aabb,
    collision_enabled: bool,
    is_static: bool,
    kind: ActorKind,
    listeners: PropertyListeners,
    frames: Weak<FrameController>,
    collisions: Weak<CollisionController>,
    clock: FrameClock,
    destroyed: bool,
}

impl Actor {
    pub fn spawn(runtime: &Runtime, options: ActorOptions) -> ActorHandle {
        let id = runtime.next_id();
        let actor = Rc::new_cyclic(|this| {
            RefCell::new(Actor {
                id,
                this: this.clone(),
                transform: Transform::new(),
                velocity: Vector3::ZERO,
                dirty: true,
                needs_commit: false,
                render_target: options.render_target,
                collision_box: options.collision_box,
                collision_enabled: options.collision_enabled,
                is_static: options.is_static,
                kind: options.kind,
                listeners: PropertyListeners::default(),
                frames: Rc::downgrade(runtime.frames()),
                collisions: Rc::downgrade(runtime.collisions()),
                clock: runtime.clock().clone(),
                destroyed: false,
            })
        });

        runtime.frames().add(id, actor.clone());
        actor.borrow().sync_collision_membership();
        debug!("actor {} spawned", id);
        actor
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn kind(&self) -> &ActorKind {
        &self.kind
    }

    pub fn player(&self) -> Option<&PlayerState> {
        match &self.kind {
            ActorKind::Player(state) => Some(state),
            _ => None,
        }
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn position(&self) -> Vector3 {
        self.transform.position()
    }

    pub fn rotation(&self) -> Vector3 {
        self.transform.rotation()
    }

    pub fn scale(&self) -> Vector3 {
        self.transform.scale()
    }

    pub fn anchor(&self) -> Vector3 {
        self.transform.anchor()
    }

    /// Live position; call [`Actor::mark_dirty`] after writing through it.
    /// No notification is emitted.
    pub fn position_mut(&mut self) -> &mut Vector3 {
        self.transform.position_mut()
    }

    /// Live rotation; call [`Actor::mark_dirty`] after writing through it.
    pub fn rotation_mut(&mut self) -> &mut Vector3 {
        self.transform.rotation_mut()
    }

    /// Live scale; call [`Actor::mark_dirty`] after writing through it.
    pub fn scale_mut(&mut self) -> &mut Vector3 {
        self.transform.scale_mut()
    }

    /// Live anchor; call [`Actor::mark_dirty`] after writing through it.
    pub fn anchor_mut(&mut self) -> &mut Vector3 {
        self.transform.anchor_mut()
    }

    pub fn set_position(&mut self, position: Vector3) {
        self.transform.set_position(position);
        self.changed(Property::Position, position);
    }

    pub fn set_rotation(&mut self, rotation: Vector3) {
        self.transform.set_rotation(rotation);
        self.changed(Property::Rotation, rotation);
    }

    pub fn set_scale(&mut self, scale: Vector3) {
        self.transform.set_scale(scale);
        self.changed(Property::Scale, scale);
    }

    pub fn set_anchor(&mut self, anchor: Vector3) {
        self.transform.set_anchor(anchor);
        self.changed(Property::Anchor, anchor);
    }

    fn changed(&mut self, property: Property, value: Vector3) {
        self.dirty = true;
        debug!("actor {} {:?} updated to {}", self.id, property, value);
        self.listeners.get(property).emit(&value);
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Subscribe to `<property>-updated` notifications carrying the new value
    pub fn on(&mut self, property: Property, listener: impl FnMut(&Vector3) + 'static) -> ListenerId {
        self.listeners.get(property).subscribe(listener)
    }

    pub fn off(&mut self, property: Property, id: ListenerId) -> bool {
        self.listeners.get(property).unsubscribe(id)
    }

    pub fn velocity(&self) -> Vector3 {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Vector3) {
        self.velocity = velocity;
        if let ActorKind::Player(state) = &mut self.kind {
            state.waddle.set_moving(!velocity.is_zero(), self.clock.now_ms());
        }
    }

    pub fn set_render_target(&mut self, target: Option<Box<dyn RenderTarget>>) {
        self.render_target = target;
        self.dirty = true;
    }

    pub fn has_render_target(&self) -> bool {
        self.render_target.is_some()
    }

    pub fn collision_box(&self) -> &Aabb {
        &self.collision_box
    }

    pub fn set_collision_box(&mut self, collision_box: Aabb) {
        self.collision_box = collision_box;
    }

    /// Re-centre the box on the ground position with new half extents
    pub fn set_extent(&mut self, half_extents: Vector2) {
        let center = self.transform.position().ground();
        self.collision_box = Aabb::new(center, half_extents);
    }

    pub fn collision_enabled(&self) -> bool {
        self.collision_enabled
    }

    pub fn set_collision_enabled(&mut self, enabled: bool) {
        self.collision_enabled = enabled;
        self.sync_collision_membership();
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn set_static(&mut self, is_static: bool) {
        self.is_static = is_static;
        self.sync_collision_membership();
    }

    fn sync_collision_membership(&self) {
        if self.destroyed {
            return;
        }
        let Some(collisions) = self.collisions.upgrade() else { return };
        if !self.collision_enabled {
            collisions.detach(self.id);
        } else if self.is_static {
            collisions.detach_moving(self.id);
            collisions.add_static(self.id, self.this.clone());
        } else {
            collisions.detach_static(self.id);
            collisions.add_moving(self.id, self.this.clone());
        }
    }

    /// Unregister from the frame and collision controllers. Idempotent.
    ///
    /// Open contacts end, but their `Ended` events are delivered on the next
    /// collision pass or [`CollisionController::deliver_pending`], once this
    /// actor is no longer borrowed. The same holds for leaving a bucket via
    /// [`Actor::set_collision_enabled`] or [`Actor::set_static`].
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Some(frames) = self.frames.upgrade() {
            frames.remove(self.id);
        }
        if let Some(collisions) = self.collisions.upgrade() {
            collisions.detach(self.id);
        }
        debug!("actor {} destroyed", self.id);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub(crate) fn collisions(&self) -> Option<Rc<CollisionController>> {
        self.collisions.upgrade()
    }

    fn animate(&mut self) {
        let ActorKind::Player(state) = &mut self.kind else { return };
        let (rotation, anchor) = match state.waddle.step(self.clock.now_ms()) {
            WaddleStep::Idle => return,
            WaddleStep::Lean(angle) => {
                let mut rotation = self.transform.rotation();
                rotation.z = angle;
                (rotation, state.foot_anchor(angle))
            }
            WaddleStep::Settled => {
                let mut rotation = self.transform.rotation();
                rotation.z = 0.0;
                (rotation, Vector3::ZERO)
            }
        };
        self.set_rotation(rotation);
        self.set_anchor(anchor);
    }
}

impl FrameUpdatable for Actor {
    fn update_frame(&mut self, delta_seconds: f64) {
        self.animate();

        if !self.dirty && self.velocity.is_zero() {
            return;
        }

        if !self.velocity.is_zero() {
            let position = self.transform.position() + self.velocity * delta_seconds;
            self.set_position(position);
        }
        let center = self.transform.position().ground();
        self.collision_box.center = center;

        self.needs_commit = true;
        self.dirty = false;
    }

    fn update_style(&mut self, _delta_seconds: f64) {
        if !self.needs_commit {
            return;
        }
        let Some(target) = self.render_target.as_mut() else { return };
        let descriptor = TransformDescriptor::for_object(&self.transform);
        trace!("actor {} commit {}", self.id, descriptor.to_css());
        target.apply_transform(&descriptor);
        self.needs_commit = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::render::RecordingTarget;

    fn recorded(runtime: &Runtime) -> (ActorHandle, RecordingTarget) {
        let target = RecordingTarget::new();
        let actor = Actor::spawn(
            runtime,
            ActorOptions {
                render_target: Some(Box::new(target.clone())),
                ..ActorOptions::default()
            },
        );
        (actor, target)
    }

    #[test]
    fn setters_emit_synchronously() {
        let runtime = Runtime::new();
        let (actor, _) = recorded(&runtime);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let id = actor
            .borrow_mut()
            .on(Property::Position, move |p| sink.borrow_mut().push(*p));

        actor.borrow_mut().set_position(Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(*seen.borrow(), vec![Vector3::new(1.0, 2.0, 3.0)]);

        // other properties go to other lists
        actor.borrow_mut().set_scale(Vector3::splat(2.0));
        assert_eq!(seen.borrow().len(), 1);

        assert!(actor.borrow_mut().off(Property::Position, id));
        actor.borrow_mut().set_position(Vector3::ZERO);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn idle_clean_actor_skips_the_frame() {
        let runtime = Runtime::new();
        let (actor, target) = recorded(&runtime);
        runtime.on_animation_frame(0.0);
        runtime.on_animation_frame(16.0);
        assert_eq!(target.count(), 1, "spawn leaves the actor dirty once");

        runtime.on_animation_frame(32.0);
        assert_eq!(target.count(), 1);

        actor.borrow_mut().set_rotation(Vector3::new(0.0, 1.0, 0.0));
        runtime.on_animation_frame(48.0);
        assert_eq!(target.count(), 2);
    }

    #[test]
    fn velocity_integrates_position_and_box() {
        let runtime = Runtime::new();
        let (actor, target) = recorded(&runtime);
        actor.borrow_mut().set_collision_box(Aabb::new(Vector2::ZERO, Vector2::ONE));
        actor.borrow_mut().set_velocity(Vector3::new(2.0, 0.0, -4.0));

        runtime.on_animation_frame(1000.0);
        runtime.on_animation_frame(1500.0);

        let a = actor.borrow();
        assert!(a.position().approx_eq(Vector3::new(1.0, 0.0, -2.0), 1e-9));
        assert_eq!(a.collision_box().center, Vector2::new(1.0, -2.0));
        assert_eq!(
            target.last_css().as_deref(),
            Some(
                "translate3d(1em, 0em, -2em) rotateY(0rad) translate3d(0em, 0em, 0em) \
                 rotateX(0rad) rotateZ(0rad) scale3d(1, 1, 1) translate3d(-0em, -0em, -0em)"
            )
        );
    }

    #[test]
    fn mutable_accessor_needs_mark_dirty() {
        let runtime = Runtime::new();
        let (actor, target) = recorded(&runtime);
        runtime.on_animation_frame(0.0);
        runtime.on_animation_frame(10.0);
        let commits = target.count();

        actor.borrow_mut().position_mut().x = 5.0;
        runtime.on_animation_frame(20.0);
        assert_eq!(target.count(), commits, "live write alone is not committed");

        actor.borrow_mut().mark_dirty();
        runtime.on_animation_frame(30.0);
        assert_eq!(target.count(), commits + 1);
    }

    #[test]
    fn collision_membership_follows_flags() {
        let runtime = Runtime::new();
        let collisions = runtime.collisions().clone();
        let actor = Actor::spawn(&runtime, ActorOptions::default());
        let id = actor.borrow().id();
        assert!(!collisions.is_static(id) && !collisions.is_moving(id));

        actor.borrow_mut().set_collision_enabled(true);
        assert!(collisions.is_moving(id));

        actor.borrow_mut().set_static(true);
        assert!(collisions.is_static(id) && !collisions.is_moving(id));

        actor.borrow_mut().set_collision_enabled(false);
        assert!(!collisions.is_static(id) && !collisions.is_moving(id));
    }

    #[test]
    fn destroy_unregisters_everywhere() {
        let runtime = Runtime::new();
        let actor = Actor::spawn(&runtime, ActorOptions::barrier(Vector2::ONE));
        let id = actor.borrow().id();
        assert!(runtime.frames().contains(id));
        assert!(runtime.collisions().is_static(id));

        actor.borrow_mut().destroy();
        assert!(!runtime.frames().contains(id));
        assert!(!runtime.collisions().is_static(id));

        // flags changed after destroy do not re-register
        actor.borrow_mut().set_static(false);
        assert!(!runtime.collisions().is_moving(id));
    }

    #[test]
    fn barrier_extent_centres_on_ground_position() {
        let runtime = Runtime::new();
        let actor = Actor::spawn(&runtime, ActorOptions::barrier(Vector2::ONE));
        actor.borrow_mut().set_position(Vector3::new(4.0, 1.0, -3.0));
        actor.borrow_mut().set_extent(Vector2::new(20.0, 1.0));
        let b = *actor.borrow().collision_box();
        assert_eq!(b, Aabb::new(Vector2::new(4.0, -3.0), Vector2::new(20.0, 1.0)));
    }
}
