use std::cell::RefCell;
use std::rc::Rc;

use glam::{Mat4, Vec3};

use crate::model::math::Vector3;
use crate::model::Transform;

/// One step of a CSS-style transform list. Lengths are in `em`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformStep {
    Translate(Vector3),
    RotateX(f64),
    RotateY(f64),
    RotateZ(f64),
    Scale(Vector3),
}

impl TransformStep {
    fn css(&self) -> String {
        match self {
            TransformStep::Translate(v) => format!("translate3d({}em, {}em, {}em)", v.x, v.y, v.z),
            TransformStep::RotateX(a) => format!("rotateX({a}rad)"),
            TransformStep::RotateY(a) => format!("rotateY({a}rad)"),
            TransformStep::RotateZ(a) => format!("rotateZ({a}rad)"),
            TransformStep::Scale(v) => format!("scale3d({}, {}, {})", v.x, v.y, v.z),
        }
    }

    fn matrix(&self) -> Mat4 {
        match self {
            TransformStep::Translate(v) => Mat4::from_translation(Vec3::from(*v)),
            TransformStep::RotateX(a) => Mat4::from_rotation_x(*a as f32),
            TransformStep::RotateY(a) => Mat4::from_rotation_y(*a as f32),
            TransformStep::RotateZ(a) => Mat4::from_rotation_z(*a as f32),
            TransformStep::Scale(v) => Mat4::from_scale(Vec3::from(*v)),
        }
    }
}

/// A composed transform, ready to hand to a render target.
///
/// Steps compose left to right like a CSS `transform` list, so the last step
/// is applied to the element first.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformDescriptor {
    pub steps: Vec<TransformStep>,
}

impl TransformDescriptor {
    pub fn new(steps: Vec<TransformStep>) -> Self {
        Self { steps }
    }

    /// Object placement: rotation and scale pivot around the anchor.
    pub fn for_object(transform: &Transform) -> Self {
        let position = transform.position();
        let rotation = transform.rotation();
        let anchor = transform.anchor();
        Self::new(vec![
            TransformStep::Translate(position),
            TransformStep::RotateY(rotation.y),
            TransformStep::Translate(anchor),
            TransformStep::RotateX(rotation.x),
            TransformStep::RotateZ(rotation.z),
            TransformStep::Scale(transform.scale()),
            TransformStep::Translate(-anchor),
        ])
    }

    /// Inverse view: moving the camera moves the world the opposite way.
    pub fn for_camera(transform: &Transform) -> Self {
        let position = transform.position();
        let rotation = transform.rotation();
        Self::new(vec![
            TransformStep::RotateX(-rotation.x),
            TransformStep::RotateY(-rotation.y),
            TransformStep::RotateZ(-rotation.z),
            TransformStep::Translate(-position),
        ])
    }

    pub fn to_css(&self) -> String {
        self.steps
            .iter()
            .map(TransformStep::css)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn to_matrix(&self) -> Mat4 {
        self.steps
            .iter()
            .fold(Mat4::IDENTITY, |acc, step| acc * step.matrix())
    }
}

/// Anything that can display a composed transform, e.g. a DOM element
pub trait RenderTarget {
    fn apply_transform(&mut self, descriptor: &TransformDescriptor);
}

/// Keeps every applied transform; shared so tests can inspect it after
/// handing the target to an actor.
#[derive(Debug, Clone, Default)]
pub struct RecordingTarget {
    applied: Rc<RefCell<Vec<TransformDescriptor>>>,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.applied.borrow().len()
    }

    pub fn last(&self) -> Option<TransformDescriptor> {
        self.applied.borrow().last().cloned()
    }

    pub fn last_css(&self) -> Option<String> {
        self.last().map(|d| d.to_css())
    }
}

impl RenderTarget for RecordingTarget {
    fn apply_transform(&mut self, descriptor: &TransformDescriptor) {
        self.applied.borrow_mut().push(descriptor.clone());
    }
}

/// Headless target: logs each commit under its label
pub struct TracingTarget {
    label: String,
}

impl TracingTarget {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl RenderTarget for TracingTarget {
    fn apply_transform(&mut self, descriptor: &TransformDescriptor) {
        tracing::trace!(target: "waddle::render", label = %self.label, transform = %descriptor.to_css());
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::ElementTarget;

#[cfg(target_arch = "wasm32")]
mod web {
    use super::{RenderTarget, TransformDescriptor};
    use web_sys::HtmlElement;

    /// Writes `style.transform` on a DOM element
    pub struct ElementTarget {
        element: HtmlElement,
    }

    impl ElementTarget {
        pub fn new(element: HtmlElement) -> Self {
            Self { element }
        }
    }

    impl RenderTarget for ElementTarget {
        fn apply_transform(&mut self, descriptor: &TransformDescriptor) {
            if let Err(e) = self
                .element
                .style()
                .set_property("transform", &descriptor.to_css())
            {
                tracing::warn!("failed to set transform: {:?}", e);
            }
        }
    }
}
