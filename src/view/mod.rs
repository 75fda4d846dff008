// VIEW: turning transforms into something visible
pub mod render;

pub use render::{RecordingTarget, RenderTarget, TracingTarget, TransformDescriptor};
