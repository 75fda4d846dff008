// CONTROLLER: input, collision tracking and the frame loop
pub mod input;
pub mod collision;
pub mod camera_controller;
pub mod frame_loop;

pub use input::{InputEvent, KeyBindings, KeyEvent, KeyEventKind, KeyboardManager};
pub use collision::{CollisionController, CollisionPair, ContactEvent, ContactPhase};
pub use camera_controller::{CameraController, ControllerEvent, ControllerKind};
pub use frame_loop::{FrameClock, FrameController, FrameUpdatable};
