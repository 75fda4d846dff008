use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::model::math::Vector3;
use crate::model::observers::ListenerId;
use crate::model::{Camera, Transform};

/// Camera transform formatted for display
#[derive(Debug, Clone, PartialEq)]
pub struct CameraStats {
    pub position: String,
    /// Degrees
    pub rotation: String,
    pub scale: String,
}

fn triple(v: Vector3) -> String {
    format!("{:.2}, {:.2}, {:.2}", v.x, v.y, v.z)
}

impl CameraStats {
    pub fn from_transform(transform: &Transform) -> Self {
        let r = transform.rotation();
        Self {
            position: triple(transform.position()),
            rotation: triple(Vector3::new(r.x.to_degrees(), r.y.to_degrees(), r.z.to_degrees())),
            scale: triple(transform.scale()),
        }
    }

    pub fn lines(&self) -> [String; 3] {
        [
            format!("Position: {}", self.position),
            format!("Rotation: {}", self.rotation),
            format!("Scale: {}", self.scale),
        ]
    }
}

impl fmt::Display for CameraStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines().join(" | "))
    }
}

/// Camera readout refreshed on every committed camera change
pub struct DebugReadout {
    latest: Rc<RefCell<Option<CameraStats>>>,
    camera: Weak<RefCell<Camera>>,
    listener: Option<ListenerId>,
}

impl DebugReadout {
    /// `on_change` receives the new stats after each camera commit
    pub fn attach(camera: &Rc<RefCell<Camera>>, mut on_change: impl FnMut(&CameraStats) + 'static) -> Self {
        let latest = Rc::new(RefCell::new(Some(CameraStats::from_transform(
            camera.borrow().transform(),
        ))));
        let sink = latest.clone();
        let listener = camera.borrow_mut().on_update(move |transform| {
            let stats = CameraStats::from_transform(transform);
            on_change(&stats);
            *sink.borrow_mut() = Some(stats);
        });
        Self {
            latest,
            camera: Rc::downgrade(camera),
            listener: Some(listener),
        }
    }

    pub fn latest(&self) -> Option<CameraStats> {
        self.latest.borrow().clone()
    }

    pub fn detach(&mut self) {
        if let (Some(id), Some(camera)) = (self.listener.take(), self.camera.upgrade()) {
            camera.borrow_mut().off_update(id);
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::text_sink;

#[cfg(target_arch = "wasm32")]
mod web {
    use super::CameraStats;
    use web_sys::Element;

    /// Writes the stats into `element`, one line per `<p>`
    pub fn text_sink(element: Element) -> impl FnMut(&CameraStats) {
        move |stats| {
            let html: String = stats.lines().iter().map(|l| format!("<p>{l}</p>")).collect();
            element.set_inner_html(&format!("<h3>Camera</h3>{html}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::FrameUpdatable;
    use crate::view::render::RecordingTarget;
    use std::f64::consts::FRAC_PI_4;

    #[test]
    fn formats_two_decimals_and_degrees() {
        let mut t = Transform::new();
        t.set_position(Vector3::new(1.0, -2.5, 1.0 / 3.0));
        t.set_rotation(Vector3::new(FRAC_PI_4, 0.0, -FRAC_PI_4));
        let stats = CameraStats::from_transform(&t);
        assert_eq!(stats.position, "1.00, -2.50, 0.33");
        assert_eq!(stats.rotation, "45.00, 0.00, -45.00");
        assert_eq!(stats.scale, "1.00, 1.00, 1.00");
    }

    #[test]
    fn refreshes_on_camera_commit() {
        let camera = Rc::new(RefCell::new(Camera::new()));
        camera
            .borrow_mut()
            .set_render_target(Some(Box::new(RecordingTarget::new())));
        let pushed = Rc::new(RefCell::new(0));
        let sink = pushed.clone();
        let mut readout = DebugReadout::attach(&camera, move |_| *sink.borrow_mut() += 1);

        camera.borrow_mut().set_position(Vector3::new(3.0, 0.0, 0.0));
        camera.borrow_mut().update_style(0.0);
        assert_eq!(*pushed.borrow(), 1);
        assert_eq!(readout.latest().map(|s| s.position).as_deref(), Some("3.00, 0.00, 0.00"));

        readout.detach();
        camera.borrow_mut().set_position(Vector3::ZERO);
        camera.borrow_mut().update_style(0.0);
        assert_eq!(*pushed.borrow(), 1);
    }
}
