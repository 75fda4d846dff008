use tracing::info;

use crate::config::SceneConfig;
use crate::controller::collision::ContactEvent;
use crate::controller::input::{InputEvent, KeyBindings};
use crate::controller::CameraController;
use crate::model::math::{Vector2, Vector3};
use crate::model::observers::ListenerId;
use crate::model::{Actor, ActorHandle, ActorOptions, Player};
use crate::runtime::Runtime;
use crate::view::render::RenderTarget;

/// Render targets handed to the scene by whatever displays it. Missing
/// targets leave the matching object invisible but still simulated.
#[derive(Default)]
pub struct SceneTargets {
    pub camera: Option<Box<dyn RenderTarget>>,
    pub player: Option<Box<dyn RenderTarget>>,
    /// Factory for barrier area targets, called with the barrier index
    pub barrier: Option<Box<dyn FnMut(usize) -> Option<Box<dyn RenderTarget>>>>,
}

/// The decorative scene: camera, invisible walls and the waddling player
pub struct Scene {
    runtime: Runtime,
    config: SceneConfig,
    player: Player,
    barriers: Vec<ActorHandle>,
    controller: CameraController,
}

impl Scene {
    pub fn new(config: SceneConfig, mut targets: SceneTargets) -> Self {
        let runtime = Runtime::new();
        runtime.camera().borrow_mut().set_render_target(targets.camera.take());

        let barriers = config
            .barriers
            .iter()
            .enumerate()
            .map(|(i, b)| {
                let mut options = ActorOptions::barrier(Vector2::new(b.half_x, b.half_y));
                if config.show_barriers {
                    options.render_target = targets.barrier.as_mut().and_then(|make| make(i));
                }
                let barrier = Actor::spawn(&runtime, options);
                {
                    let mut barrier = barrier.borrow_mut();
                    barrier.set_position(Vector3::new(b.x, 1.0, b.y));
                    barrier.set_extent(Vector2::new(b.half_x, b.half_y));
                }
                barrier
            })
            .collect();

        let mut player = Player::spawn(&runtime, config.player.clone(), targets.player.take());
        let bindings = KeyBindings::default();

        let controller = if config.debug_camera {
            CameraController::debug(
                runtime.camera().clone(),
                runtime.keyboard(),
                config.debug_fly.clone(),
                bindings.fly,
            )
        } else {
            player.attach_input(bindings);
            let mut controller = CameraController::player_follow(runtime.camera().clone(), config.rig.clone());
            controller.follow(player.actor());
            controller
        };

        info!(
            debug_camera = config.debug_camera,
            barriers = config.barriers.len(),
            "scene ready"
        );

        Self {
            runtime,
            config,
            player,
            barriers,
            controller,
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn barriers(&self) -> &[ActorHandle] {
        &self.barriers
    }

    pub fn controller(&self) -> &CameraController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut CameraController {
        &mut self.controller
    }

    /// One animation frame; returns the simulated delta, if any
    pub fn tick(&self, now_ms: f64) -> Option<f64> {
        self.runtime.on_animation_frame(now_ms)
    }

    pub fn handle_input(&self, event: &InputEvent) {
        self.runtime.keyboard().borrow_mut().process_event(event);
    }

    pub fn on_contact(&self, listener: impl FnMut(&ContactEvent) + 'static) -> ListenerId {
        self.runtime.collisions().on_contact(listener)
    }

    /// Tear everything down; the scene stops simulating
    pub fn shutdown(&mut self) {
        self.controller.detach();
        self.player.destroy();
        for barrier in &self.barriers {
            barrier.borrow_mut().destroy();
        }
        self.runtime.collisions().deliver_pending();
        info!("scene shut down");
    }
}
