// MODEL: scene objects and the math they are built on
pub mod math;
pub mod transform;
pub mod observers;
pub mod actor;
pub mod camera;
pub mod player;

pub use actor::{Actor, ActorHandle, ActorKind, ActorOptions, Property};
pub use camera::Camera;
pub use player::{Player, PlayerState};
pub use transform::Transform;
