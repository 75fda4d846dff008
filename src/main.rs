//! Headless run: builds the scene with logging render targets, walks the
//! player around with a scripted key sequence on a synthetic 60 Hz clock
//! and logs every wall contact.

use tracing::info;

use waddle::config::SceneConfig;
use waddle::controller::{ContactPhase, InputEvent};
use waddle::logging;
use waddle::scene::{Scene, SceneTargets};
use waddle::ui::DebugReadout;
use waddle::view::render::{RenderTarget, TracingTarget};

const FRAME_MS: f64 = 1000.0 / 60.0;

/// (frame, key, pressed)
const SCRIPT: &[(u32, &str, bool)] = &[
    (30, "d", true),
    (150, "s", true),
    (240, "d", false),
    (330, "s", false),
    (360, "a", true),
    (600, "a", false),
    (660, "w", true),
    (700, "w", false),
];

fn main() {
    logging::init();

    let query = std::env::args().nth(1).unwrap_or_default();
    let config = SceneConfig::from_query(&query);
    let targets = SceneTargets {
        camera: Some(Box::new(TracingTarget::new("camera"))),
        player: Some(Box::new(TracingTarget::new("player"))),
        barrier: Some(Box::new(|i: usize| {
            Some(Box::new(TracingTarget::new(format!("barrier-{i}"))) as Box<dyn RenderTarget>)
        })),
    };
    let mut scene = Scene::new(config, targets);

    scene.on_contact(|event| {
        let verb = match event.phase {
            ContactPhase::Started => "hit",
            ContactPhase::Ended => "left",
        };
        info!("player {} wall {} at {:.2}s", verb, event.static_id, event.time_seconds);
    });
    let mut readout = DebugReadout::attach(scene.runtime().camera(), |_| {});

    let last_frame = SCRIPT.iter().map(|(frame, _, _)| *frame).max().unwrap_or(0) + 60;
    for frame in 0..=last_frame {
        for (_, key, pressed) in SCRIPT.iter().filter(|(at, _, _)| *at == frame) {
            let event = if *pressed {
                InputEvent::KeyDown { key: key.to_string(), repeat: false }
            } else {
                InputEvent::KeyUp(key.to_string())
            };
            scene.handle_input(&event);
        }
        scene.tick(frame as f64 * FRAME_MS);

        if frame % 60 == 0 {
            let position = scene.player().actor().borrow().position();
            let camera = readout.latest().map(|s| s.to_string()).unwrap_or_default();
            info!("t={:>2}s player at {} | camera {}", frame / 60, position, camera);
        }
    }

    readout.detach();
    scene.shutdown();
}
