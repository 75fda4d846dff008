use tracing::trace;

use crate::controller::frame_loop::FrameUpdatable;
use crate::model::math::Vector3;
use crate::model::observers::{ListenerId, Observers};
use crate::model::Transform;
use crate::view::render::{RenderTarget, TransformDescriptor};

/// The view transform. Changes are committed to the scene root once per
/// frame, after which `update` listeners receive the committed transform.
#[derive(Default)]
pub struct Camera {
    transform: Transform,
    dirty: bool,
    render_target: Option<Box<dyn RenderTarget>>,
    observers: Observers<Transform>,
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Live transform; call [`Camera::mark_dirty`] after writing through it.
    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
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

    pub fn set_position(&mut self, position: Vector3) {
        self.transform.set_position(position);
        self.dirty = true;
    }

    pub fn set_rotation(&mut self, rotation: Vector3) {
        self.transform.set_rotation(rotation);
        self.dirty = true;
    }

    pub fn set_scale(&mut self, scale: Vector3) {
        self.transform.set_scale(scale);
        self.dirty = true;
    }

    pub fn set_render_target(&mut self, target: Option<Box<dyn RenderTarget>>) {
        self.render_target = target;
        self.dirty = true;
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn on_update(&mut self, listener: impl FnMut(&Transform) + 'static) -> ListenerId {
        self.observers.subscribe(listener)
    }

    pub fn off_update(&mut self, id: ListenerId) -> bool {
        self.observers.unsubscribe(id)
    }
}

impl FrameUpdatable for Camera {
    fn update_frame(&mut self, _delta_seconds: f64) {}

    fn update_style(&mut self, _delta_seconds: f64) {
        if !self.dirty {
            return;
        }
        let Some(target) = self.render_target.as_mut() else { return };
        let descriptor = TransformDescriptor::for_camera(&self.transform);
        trace!("camera commit {}", descriptor.to_css());
        target.apply_transform(&descriptor);
        self.dirty = false;
        self.observers.emit(&self.transform);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::render::RecordingTarget;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn commits_once_per_change_and_notifies() {
        let target = RecordingTarget::new();
        let mut camera = Camera::new();
        let updates = Rc::new(RefCell::new(0));
        let sink = updates.clone();
        camera.on_update(move |_| *sink.borrow_mut() += 1);

        camera.set_position(Vector3::new(1.0, 2.0, 3.0));
        camera.update_style(0.016);
        assert_eq!(target.count(), 0, "no target bound yet");
        assert_eq!(*updates.borrow(), 0);
        assert!(camera.is_dirty(), "change is kept until a target exists");

        camera.set_render_target(Some(Box::new(target.clone())));
        camera.update_style(0.016);
        camera.update_style(0.016);
        assert_eq!(target.count(), 1);
        assert_eq!(*updates.borrow(), 1);
        assert_eq!(
            target.last_css().as_deref(),
            Some("rotateX(-0rad) rotateY(-0rad) rotateZ(-0rad) translate3d(-1em, -2em, -3em)")
        );
    }
}
