pub mod config;
pub mod logging;
pub mod runtime;
pub mod scene;
pub mod ui;

// MVC Architecture
pub mod model;
pub mod view;
pub mod controller;

pub use config::SceneConfig;
pub use runtime::{ObjectId, Runtime};
pub use scene::{Scene, SceneTargets};

#[cfg(target_arch = "wasm32")]
pub use web::{mount, SceneHandle};

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use tracing::{info, warn};
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::{prelude::wasm_bindgen, JsCast, JsValue};
    use web_sys::{Document, Event, HtmlElement, KeyboardEvent, Window};

    use crate::config::{BarrierConfig, SceneConfig};
    use crate::controller::input::wasm::keyboard_event_to_input;
    use crate::controller::InputEvent;
    use crate::scene::{Scene, SceneTargets};
    use crate::ui::{self, DebugReadout};
    use crate::view::render::{ElementTarget, RenderTarget};

    const PLAYER_ELEMENT: &str = "player";
    const DEBUG_STATS_ELEMENT: &str = "debug-stats";

    #[wasm_bindgen(start)]
    pub fn start() {
        crate::logging::init();
    }

    /// A running scene. Dropping the handle does not stop it; call `stop`.
    #[wasm_bindgen]
    pub struct SceneHandle {
        scene: Rc<RefCell<Scene>>,
        animation: AnimationLoop,
        readout: Option<DebugReadout>,
    }

    #[wasm_bindgen]
    impl SceneHandle {
        pub fn stop(&mut self) {
            self.animation.stop();
            if let Some(readout) = self.readout.as_mut() {
                readout.detach();
            }
            self.scene.borrow_mut().shutdown();
        }
    }

    /// Build the scene under the element with id `root_id` and start animating
    #[wasm_bindgen]
    pub fn mount(root_id: &str) -> Result<SceneHandle, JsValue> {
        let window = web_sys::window().ok_or_else(|| js_error("no global `window`"))?;
        let document = window.document().ok_or_else(|| js_error("no document on window"))?;
        let root = html_element(&document, root_id)?
            .ok_or_else(|| js_error(format!("no scene root #{root_id}")))?;

        let query = window.location().search().unwrap_or_default();
        let config = SceneConfig::from_query(&query);

        let player = html_element(&document, PLAYER_ELEMENT)?;
        if player.is_none() {
            warn!("no #{PLAYER_ELEMENT} element, player will be invisible");
        }
        let targets = SceneTargets {
            camera: Some(Box::new(ElementTarget::new(root.clone()))),
            player: player.map(|el| Box::new(ElementTarget::new(el)) as Box<dyn RenderTarget>),
            barrier: Some(barrier_factory(document.clone(), root, config.barriers.clone())),
        };
        let scene = Rc::new(RefCell::new(Scene::new(config, targets)));

        let readout = match document.get_element_by_id(DEBUG_STATS_ELEMENT) {
            Some(el) => Some(DebugReadout::attach(scene.borrow().runtime().camera(), ui::text_sink(el))),
            None => None,
        };

        install_input_listeners(&window, &document, &scene)?;

        let animation = {
            let scene = scene.clone();
            AnimationLoop::start(window, move |now_ms| {
                scene.borrow().tick(now_ms);
            })?
        };

        info!("scene mounted on #{root_id}");
        Ok(SceneHandle { scene, animation, readout })
    }

    fn html_element(document: &Document, id: &str) -> Result<Option<HtmlElement>, JsValue> {
        match document.get_element_by_id(id) {
            Some(el) => el
                .dyn_into::<HtmlElement>()
                .map(Some)
                .map_err(|_| js_error(format!("#{id} is not an HTML element"))),
            None => Ok(None),
        }
    }

    /// Creates a visible area div per barrier inside the scene root
    fn barrier_factory(
        document: Document,
        root: HtmlElement,
        barriers: Vec<BarrierConfig>,
    ) -> Box<dyn FnMut(usize) -> Option<Box<dyn RenderTarget>>> {
        Box::new(move |index: usize| {
            let barrier = barriers.get(index)?;
            match barrier_area(&document, &root, barrier) {
                Ok(el) => Some(Box::new(ElementTarget::new(el)) as Box<dyn RenderTarget>),
                Err(e) => {
                    warn!("failed to create barrier area {index}: {e:?}");
                    None
                }
            }
        })
    }

    fn barrier_area(document: &Document, root: &HtmlElement, b: &BarrierConfig) -> Result<HtmlElement, JsValue> {
        let el: HtmlElement = document
            .create_element("div")?
            .dyn_into()
            .map_err(|_| js_error("created div is not an HTML element"))?;
        el.set_class_name("simple-barrier");
        let style = el.style();
        style.set_property("left", &format!("{}em", -b.half_x))?;
        style.set_property("top", &format!("{}em", -b.half_y))?;
        style.set_property("width", &format!("{}em", b.half_x * 2.0))?;
        style.set_property("height", &format!("{}em", b.half_y * 2.0))?;
        root.append_child(&el)?;
        Ok(el)
    }

    fn install_input_listeners(
        window: &Window,
        document: &Document,
        scene: &Rc<RefCell<Scene>>,
    ) -> Result<(), JsValue> {
        // Keyboard down / up
        for (name, is_down) in [("keydown", true), ("keyup", false)] {
            let scene = scene.clone();
            let handler = Closure::wrap(Box::new(move |e: KeyboardEvent| {
                scene.borrow().handle_input(&keyboard_event_to_input(&e, is_down));
            }) as Box<dyn FnMut(KeyboardEvent)>);
            document.add_event_listener_with_callback(name, handler.as_ref().unchecked_ref())?;
            handler.forget();
        }

        // Focus loss - release all keys
        {
            let scene = scene.clone();
            let blur = Closure::wrap(Box::new(move |_e: Event| {
                scene.borrow().handle_input(&InputEvent::FocusLost);
            }) as Box<dyn FnMut(Event)>);
            window.add_event_listener_with_callback("blur", blur.as_ref().unchecked_ref())?;
            blur.forget();
        }

        // Visibility change
        {
            let scene = scene.clone();
            let doc = document.clone();
            let visibility = Closure::wrap(Box::new(move |_e: Event| {
                let visible = !doc.hidden();
                scene.borrow().handle_input(&InputEvent::VisibilityChanged { visible });
            }) as Box<dyn FnMut(Event)>);
            document.add_event_listener_with_callback("visibilitychange", visibility.as_ref().unchecked_ref())?;
            visibility.forget();
        }

        Ok(())
    }

    fn js_error<E: Into<String>>(msg: E) -> JsValue {
        JsValue::from_str(&msg.into())
    }

    /// `requestAnimationFrame` loop that keeps rescheduling itself until stopped
    struct AnimationLoop {
        running: Rc<Cell<bool>>,
    }

    type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

    impl AnimationLoop {
        fn start(window: Window, mut frame: impl FnMut(f64) + 'static) -> Result<Self, JsValue> {
            let running = Rc::new(Cell::new(true));
            let callback: FrameCallback = Rc::new(RefCell::new(None));

            let next = callback.clone();
            let still_running = running.clone();
            let loop_window = window.clone();
            *callback.borrow_mut() = Some(Closure::wrap(Box::new(move |now_ms: f64| {
                if !still_running.get() {
                    // drop the closure, breaking its reference to itself
                    let _ = next.borrow_mut().take();
                    return;
                }
                frame(now_ms);

                if let Some(cb) = next.borrow().as_ref() {
                    if let Err(e) = loop_window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                        warn!("failed to schedule animation frame: {e:?}");
                    }
                }
            }) as Box<dyn FnMut(f64)>));

            if let Some(cb) = callback.borrow().as_ref() {
                window.request_animation_frame(cb.as_ref().unchecked_ref())?;
            }
            Ok(Self { running })
        }

        fn stop(&self) {
            self.running.set(false);
        }
    }
}
