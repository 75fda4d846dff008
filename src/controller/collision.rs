use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Weak;

use tracing::{debug, info};

use crate::model::observers::{ListenerId, Observers};
use crate::model::Actor;
use crate::runtime::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPhase {
    Started,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEvent {
    pub static_id: ObjectId,
    pub moving_id: ObjectId,
    pub phase: ContactPhase,
    /// Frame time the transition was detected at
    pub time_seconds: f64,
}

/// Latch for one (static, moving) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollisionPair {
    pub colliding: bool,
}

type PairKey = (ObjectId, ObjectId);
type Bucket = Vec<(ObjectId, Weak<RefCell<Actor>>)>;

/// Broad-phase contact tracker.
///
/// Every moving object is tested against every static object once per
/// tick; there is no spatial partitioning, object counts are small. Each
/// pair latches independently, so a sustained overlap produces exactly one
/// `Started` and a separation exactly one `Ended`.
#[derive(Default)]
pub struct CollisionController {
    static_objects: RefCell<Bucket>,
    moving_objects: RefCell<Bucket>,
    pairs: RefCell<HashMap<PairKey, CollisionPair>>,
    pending: RefCell<Vec<ContactEvent>>,
    observers: RefCell<Observers<ContactEvent>>,
    last_time_seconds: Cell<f64>,
}

impl CollisionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_static(&self, id: ObjectId, actor: Weak<RefCell<Actor>>) {
        insert_unique(&mut self.static_objects.borrow_mut(), id, actor);
    }

    pub fn add_moving(&self, id: ObjectId, actor: Weak<RefCell<Actor>>) {
        insert_unique(&mut self.moving_objects.borrow_mut(), id, actor);
    }

    /// Also ends every open contact involving `id`
    pub fn remove_static(&self, id: ObjectId) -> bool {
        let removed = self.detach_static(id);
        self.flush();
        removed
    }

    /// Also ends every open contact involving `id`
    pub fn remove_moving(&self, id: ObjectId) -> bool {
        let removed = self.detach_moving(id);
        self.flush();
        removed
    }

    /// Drop `id` from both buckets
    pub fn remove(&self, id: ObjectId) {
        self.detach(id);
        self.flush();
    }

    /// Like [`CollisionController::remove_static`], but the forced `Ended`
    /// events stay queued until the next [`CollisionController::update`] or
    /// [`CollisionController::deliver_pending`]. Used by actors, which are
    /// still borrowed when they leave a bucket.
    pub(crate) fn detach_static(&self, id: ObjectId) -> bool {
        let removed = remove_from(&mut self.static_objects.borrow_mut(), id);
        if removed {
            self.close_pairs(|(static_id, _)| static_id == id);
        }
        removed
    }

    pub(crate) fn detach_moving(&self, id: ObjectId) -> bool {
        let removed = remove_from(&mut self.moving_objects.borrow_mut(), id);
        if removed {
            self.close_pairs(|(_, moving_id)| moving_id == id);
        }
        removed
    }

    pub(crate) fn detach(&self, id: ObjectId) {
        self.detach_static(id);
        self.detach_moving(id);
    }

    /// Deliver queued contact events now, e.g. after destroying actors
    /// outside the frame loop
    pub fn deliver_pending(&self) {
        self.flush();
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    pub fn is_static(&self, id: ObjectId) -> bool {
        self.static_objects.borrow().iter().any(|(e, _)| *e == id)
    }

    pub fn is_moving(&self, id: ObjectId) -> bool {
        self.moving_objects.borrow().iter().any(|(e, _)| *e == id)
    }

    pub fn pair(&self, static_id: ObjectId, moving_id: ObjectId) -> Option<CollisionPair> {
        self.pairs.borrow().get(&(static_id, moving_id)).copied()
    }

    pub fn is_colliding(&self, static_id: ObjectId, moving_id: ObjectId) -> bool {
        self.pair(static_id, moving_id).is_some_and(|p| p.colliding)
    }

    /// Contact transitions are delivered after each pass, in detection order.
    ///
    /// Listeners may add or remove objects, but must not subscribe or
    /// unsubscribe contact listeners themselves: the listener list is
    /// borrowed while events are delivered.
    pub fn on_contact(&self, listener: impl FnMut(&ContactEvent) + 'static) -> ListenerId {
        self.observers.borrow_mut().subscribe(listener)
    }

    pub fn off_contact(&self, id: ListenerId) -> bool {
        self.observers.borrow_mut().unsubscribe(id)
    }

    /// One broad-phase pass over moving x static. Events still queued from
    /// earlier removals are delivered first.
    pub fn update(&self, time_seconds: f64) {
        self.last_time_seconds.set(time_seconds);
        {
            let moving = self.moving_objects.borrow();
            let statics = self.static_objects.borrow();
            let mut pairs = self.pairs.borrow_mut();
            let mut pending = self.pending.borrow_mut();

            for (moving_id, moving_actor) in moving.iter() {
                let Some(moving_actor) = moving_actor.upgrade() else { continue };
                let moving_box = *moving_actor.borrow().collision_box();

                for (static_id, static_actor) in statics.iter() {
                    let Some(static_actor) = static_actor.upgrade() else { continue };
                    let intersecting = static_actor.borrow().collision_box().intersects_aabb(&moving_box);

                    let key = (*static_id, *moving_id);
                    let was_colliding = pairs.get(&key).is_some_and(|p| p.colliding);

                    let phase = match (was_colliding, intersecting) {
                        (false, true) => ContactPhase::Started,
                        (true, false) => ContactPhase::Ended,
                        _ => continue,
                    };
                    pairs.entry(key).or_default().colliding = intersecting;
                    pending.push(ContactEvent {
                        static_id: *static_id,
                        moving_id: *moving_id,
                        phase,
                        time_seconds,
                    });
                }
            }
        }
        self.flush();
    }

    fn close_pairs(&self, matches: impl Fn(PairKey) -> bool) {
        let time_seconds = self.last_time_seconds.get();
        {
            let mut pairs = self.pairs.borrow_mut();
            let mut pending = self.pending.borrow_mut();
            pairs.retain(|key, pair| {
                if !matches(*key) {
                    return true;
                }
                if pair.colliding {
                    pending.push(ContactEvent {
                        static_id: key.0,
                        moving_id: key.1,
                        phase: ContactPhase::Ended,
                        time_seconds,
                    });
                }
                false
            });
        }
    }

    fn flush(&self) {
        loop {
            // a flush further up the stack will pick up anything queued now
            let Ok(mut observers) = self.observers.try_borrow_mut() else { return };
            let batch: Vec<ContactEvent> = self.pending.borrow_mut().drain(..).collect();
            if batch.is_empty() {
                return;
            }
            for event in &batch {
                match event.phase {
                    ContactPhase::Started => info!(
                        "collision started: static {} / moving {} at {:.3}s",
                        event.static_id, event.moving_id, event.time_seconds
                    ),
                    ContactPhase::Ended => info!(
                        "collision ended: static {} / moving {} at {:.3}s",
                        event.static_id, event.moving_id, event.time_seconds
                    ),
                }
                observers.emit(event);
            }
        }
    }
}

fn insert_unique(bucket: &mut Bucket, id: ObjectId, actor: Weak<RefCell<Actor>>) {
    if bucket.iter().any(|(e, _)| *e == id) {
        return;
    }
    debug!("collision bucket add {}", id);
    bucket.push((id, actor));
}

fn remove_from(bucket: &mut Bucket, id: ObjectId) -> bool {
    let before = bucket.len();
    bucket.retain(|(e, _)| *e != id);
    bucket.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use crate::model::math::{Aabb, Vector2, Vector3};
    use crate::model::{ActorHandle, ActorOptions};
    use crate::runtime::Runtime;

    fn record(runtime: &Runtime) -> Rc<RefCell<Vec<ContactEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        runtime.collisions().on_contact(move |e| sink.borrow_mut().push(*e));
        events
    }

    fn spawn(runtime: &Runtime, is_static: bool, center: Vector2, half: Vector2) -> ActorHandle {
        let actor = Actor::spawn(
            runtime,
            ActorOptions {
                collision_enabled: true,
                is_static,
                ..ActorOptions::default()
            },
        );
        actor.borrow_mut().set_position(Vector3::new(center.x, 0.0, center.y));
        actor.borrow_mut().set_collision_box(Aabb::new(center, half));
        actor
    }

    fn phases(events: &Rc<RefCell<Vec<ContactEvent>>>) -> Vec<ContactPhase> {
        events.borrow().iter().map(|e| e.phase).collect()
    }

    #[test]
    fn moving_object_crossing_a_static_one_starts_and_ends_once() {
        let runtime = Runtime::new();
        let events = record(&runtime);
        let a = spawn(&runtime, true, Vector2::new(10.0, 10.0), Vector2::new(10.0, 10.0));
        let b = spawn(&runtime, false, Vector2::new(-2.5, -2.5), Vector2::new(1.0, 1.0));
        let (a_id, b_id) = (a.borrow().id(), b.borrow().id());

        // 10 units per second along the ground diagonal, 10 fps
        b.borrow_mut().set_velocity(Vector3::new(10.0, 0.0, 10.0));
        let mut first_overlap_frame = None;
        for frame in 0..=40 {
            runtime.on_animation_frame(frame as f64 * 100.0);
            if first_overlap_frame.is_none() && runtime.collisions().is_colliding(a_id, b_id) {
                first_overlap_frame = Some(frame);
                assert_eq!(phases(&events), vec![ContactPhase::Started]);
            }
        }

        // b's box reaches past a's corner at (0, 0) on its second step
        assert_eq!(first_overlap_frame, Some(2));
        assert_eq!(phases(&events), vec![ContactPhase::Started, ContactPhase::Ended]);
        let ended = events.borrow()[1];
        assert_eq!((ended.static_id, ended.moving_id), (a_id, b_id));
        assert!(!runtime.collisions().is_colliding(a_id, b_id));
    }

    #[test]
    fn corner_touch_starts_once_and_holds_while_inside() {
        let runtime = Runtime::new();
        let events = record(&runtime);
        let a = spawn(&runtime, true, Vector2::new(10.0, 10.0), Vector2::new(10.0, 10.0));
        let b = spawn(&runtime, false, Vector2::ZERO, Vector2::ZERO);
        let (a_id, b_id) = (a.borrow().id(), b.borrow().id());

        // b starts exactly on a's corner; closed intervals make that an overlap
        runtime.collisions().update(0.0);
        assert_eq!(phases(&events), vec![ContactPhase::Started]);
        assert_eq!(events.borrow()[0].time_seconds, 0.0);

        // 1.5 units per frame along the diagonal, stopping at (15, 15)
        for step in 1..=10 {
            let p = Vector2::new(1.5 * step as f64, 1.5 * step as f64);
            b.borrow_mut().set_collision_box(Aabb::new(p, Vector2::ZERO));
            runtime.collisions().update(step as f64 * 0.1);
        }
        assert_eq!(b.borrow().collision_box().center, Vector2::new(15.0, 15.0));

        // still inside a: no repeat start, no end
        runtime.collisions().update(2.0);
        assert_eq!(phases(&events), vec![ContactPhase::Started]);
        assert!(runtime.collisions().is_colliding(a_id, b_id));
    }

    #[test]
    fn pairs_latch_independently() {
        let runtime = Runtime::new();
        let events = record(&runtime);
        let left = spawn(&runtime, true, Vector2::new(-5.0, 0.0), Vector2::new(1.0, 1.0));
        let right = spawn(&runtime, true, Vector2::new(5.0, 0.0), Vector2::new(1.0, 1.0));
        let mover = spawn(&runtime, false, Vector2::new(-5.0, 0.0), Vector2::new(1.0, 1.0));

        runtime.collisions().update(0.0);
        assert_eq!(phases(&events), vec![ContactPhase::Started]);

        // overlap the later static object while still touching the first
        mover.borrow_mut().set_collision_box(Aabb::new(Vector2::ZERO, Vector2::new(6.0, 1.0)));
        runtime.collisions().update(0.1);
        runtime.collisions().update(0.2);
        let right_id = right.borrow().id();
        let left_id = left.borrow().id();
        let mover_id = mover.borrow().id();
        assert!(runtime.collisions().is_colliding(left_id, mover_id));
        assert!(runtime.collisions().is_colliding(right_id, mover_id));
        assert_eq!(events.borrow().len(), 2, "no duplicate starts while overlapping");

        mover.borrow_mut().set_collision_box(Aabb::new(Vector2::new(5.0, 0.0), Vector2::new(1.0, 1.0)));
        runtime.collisions().update(0.3);
        let last = events.borrow()[2];
        assert_eq!((last.static_id, last.phase), (left_id, ContactPhase::Ended));
        assert!(runtime.collisions().is_colliding(right_id, mover_id));
    }

    #[test]
    fn removing_an_object_closes_its_contacts() {
        let runtime = Runtime::new();
        let events = record(&runtime);
        let wall = spawn(&runtime, true, Vector2::ZERO, Vector2::new(2.0, 2.0));
        let mover = spawn(&runtime, false, Vector2::new(1.0, 0.0), Vector2::new(1.0, 1.0));
        runtime.collisions().update(1.0);

        let (wall_id, mover_id) = (wall.borrow().id(), mover.borrow().id());
        assert!(runtime.collisions().remove_moving(mover_id));
        assert_eq!(phases(&events), vec![ContactPhase::Started, ContactPhase::Ended]);
        assert!(!runtime.collisions().is_colliding(wall_id, mover_id));
        assert!(runtime.collisions().pair(wall_id, mover_id).is_none());

        runtime.collisions().update(2.0);
        assert_eq!(events.borrow().len(), 2);
    }

    /// Subscribes a listener that reads the moving actor on every event
    fn record_reading(runtime: &Runtime, actor: &ActorHandle) -> Rc<RefCell<Vec<(ContactPhase, Vector3)>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let watched = Rc::downgrade(actor);
        runtime.collisions().on_contact(move |e| {
            if let Some(actor) = watched.upgrade() {
                sink.borrow_mut().push((e.phase, actor.borrow().position()));
            }
        });
        seen
    }

    #[test]
    fn destroying_a_colliding_actor_ends_after_the_borrow_is_released() {
        let runtime = Runtime::new();
        let _wall = spawn(&runtime, true, Vector2::ZERO, Vector2::new(2.0, 2.0));
        let mover = spawn(&runtime, false, Vector2::new(1.0, 0.0), Vector2::new(1.0, 1.0));
        let seen = record_reading(&runtime, &mover);
        runtime.collisions().update(0.0);

        mover.borrow_mut().destroy();
        assert!(runtime.collisions().has_pending());
        assert_eq!(seen.borrow().len(), 1);

        runtime.collisions().deliver_pending();
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], (ContactPhase::Ended, Vector3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn disabling_collision_while_colliding_ends_on_the_next_pass() {
        let runtime = Runtime::new();
        let _wall = spawn(&runtime, true, Vector2::ZERO, Vector2::new(2.0, 2.0));
        let mover = spawn(&runtime, false, Vector2::new(1.0, 0.0), Vector2::new(1.0, 1.0));
        let seen = record_reading(&runtime, &mover);
        runtime.collisions().update(0.0);

        mover.borrow_mut().set_collision_enabled(false);
        runtime.collisions().update(0.1);

        let phases: Vec<_> = seen.borrow().iter().map(|(p, _)| *p).collect();
        assert_eq!(phases, vec![ContactPhase::Started, ContactPhase::Ended]);
        assert!(!runtime.collisions().has_pending());
    }

    #[test]
    fn toggling_static_while_colliding_ends_once() {
        let runtime = Runtime::new();
        let wall = spawn(&runtime, true, Vector2::ZERO, Vector2::new(2.0, 2.0));
        let mover = spawn(&runtime, false, Vector2::new(1.0, 0.0), Vector2::new(1.0, 1.0));
        let seen = record_reading(&runtime, &mover);
        runtime.collisions().update(0.0);

        mover.borrow_mut().set_static(true);
        runtime.collisions().update(0.1);
        let (wall_id, mover_id) = (wall.borrow().id(), mover.borrow().id());
        assert!(runtime.collisions().is_static(mover_id));
        assert!(runtime.collisions().pair(wall_id, mover_id).is_none());

        // two static objects never pair up; back to moving starts afresh
        mover.borrow_mut().set_static(false);
        runtime.collisions().update(0.2);
        let phases: Vec<_> = seen.borrow().iter().map(|(p, _)| *p).collect();
        assert_eq!(
            phases,
            vec![ContactPhase::Started, ContactPhase::Ended, ContactPhase::Started]
        );
    }

    #[test]
    fn contact_listener_may_remove_objects() {
        let runtime = Runtime::new();
        let collisions = runtime.collisions().clone();
        let wall = spawn(&runtime, true, Vector2::ZERO, Vector2::new(2.0, 2.0));
        let _mover = spawn(&runtime, false, Vector2::ZERO, Vector2::new(1.0, 1.0));
        let wall_id = wall.borrow().id();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let inner = collisions.clone();
        collisions.on_contact(move |e| {
            sink.borrow_mut().push(e.phase);
            if e.phase == ContactPhase::Started {
                inner.remove_static(wall_id);
            }
        });

        collisions.update(0.0);
        assert_eq!(*seen.borrow(), vec![ContactPhase::Started, ContactPhase::Ended]);
    }
}
