//! Platform-agnostic keyboard handling
use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::model::observers::{ListenerId, Observers};

/// Platform-independent input events
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyDown { key: String, repeat: bool },
    KeyUp(String),

    // Window events
    FocusLost,
    VisibilityChanged { visible: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Down,
    Up,
}

/// One key edge, with the full key table as it stands after the edge
#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent {
    pub key: String,
    pub kind: KeyEventKind,
    pub pressed: HashSet<String>,
}

impl KeyEvent {
    pub fn is_down(&self, key: &str) -> bool {
        self.pressed.contains(key)
    }
}

/// Edge-triggered key table.
///
/// A key-down is reported once until the matching key-up, however many
/// repeats the platform sends in between.
#[derive(Default)]
pub struct KeyboardManager {
    key_states: HashMap<String, bool>,
    observers: Observers<KeyEvent>,
}

impl KeyboardManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process an input event and update state
    pub fn process_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown { key, repeat } => {
                if !repeat {
                    self.key_down(key);
                }
            }
            InputEvent::KeyUp(key) => self.key_up(key),
            InputEvent::FocusLost => self.release_all(),
            InputEvent::VisibilityChanged { visible } => {
                if !visible {
                    self.release_all();
                }
            }
        }
    }

    pub fn key_down(&mut self, key: &str) {
        if self.is_key_down(key) {
            return;
        }
        self.key_states.insert(key.to_string(), true);
        self.emit(key, KeyEventKind::Down);
    }

    pub fn key_up(&mut self, key: &str) {
        if !self.is_key_down(key) {
            return;
        }
        self.key_states.insert(key.to_string(), false);
        self.emit(key, KeyEventKind::Up);
    }

    pub fn is_key_down(&self, key: &str) -> bool {
        self.key_states.get(key).copied().unwrap_or(false)
    }

    /// Key-up for everything held, e.g. when the window loses focus
    pub fn release_all(&mut self) {
        let mut held: Vec<String> = self
            .key_states
            .iter()
            .filter(|(_, down)| **down)
            .map(|(k, _)| k.clone())
            .collect();
        held.sort();
        if !held.is_empty() {
            debug!("releasing {} held keys", held.len());
        }
        for key in held {
            self.key_up(&key);
        }
    }

    /// Listeners get a snapshot of the key table; they must not borrow the
    /// manager itself, which also rules out subscribing or unsubscribing
    /// from inside a listener.
    pub fn on_key(&mut self, listener: impl FnMut(&KeyEvent) + 'static) -> ListenerId {
        self.observers.subscribe(listener)
    }

    pub fn off_key(&mut self, id: ListenerId) -> bool {
        self.observers.unsubscribe(id)
    }

    fn emit(&mut self, key: &str, kind: KeyEventKind) {
        let pressed = self
            .key_states
            .iter()
            .filter(|(_, down)| **down)
            .map(|(k, _)| k.clone())
            .collect();
        self.observers.emit(&KeyEvent {
            key: key.to_string(),
            kind,
            pressed,
        });
    }
}

/// Key mapping configuration. Every action accepts several keys.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyBindings {
    pub up: Vec<String>,
    pub left: Vec<String>,
    pub down: Vec<String>,
    pub right: Vec<String>,
    pub fly: FlyBindings,
}

/// Debug free-fly camera keys
#[derive(Debug, Clone, PartialEq)]
pub struct FlyBindings {
    pub forward: String,
    pub backward: String,
    pub left: String,
    pub right: String,
    pub pitch_up: String,
    pub pitch_down: String,
    pub yaw_left: String,
    pub yaw_right: String,
    pub rise: String,
    pub sink: String,
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            up: keys(&["w", "ArrowUp"]),
            left: keys(&["a", "ArrowLeft"]),
            down: keys(&["s", "ArrowDown"]),
            right: keys(&["d", "ArrowRight"]),
            fly: FlyBindings::default(),
        }
    }
}

impl Default for FlyBindings {
    fn default() -> Self {
        Self {
            forward: "w".to_string(),
            backward: "s".to_string(),
            left: "a".to_string(),
            right: "d".to_string(),
            pitch_up: "i".to_string(),
            pitch_down: "k".to_string(),
            yaw_left: "j".to_string(),
            yaw_right: "l".to_string(),
            // the scene's y axis points down the screen
            rise: " ".to_string(),
            sink: "Control".to_string(),
        }
    }
}

impl KeyBindings {
    pub fn is_movement(&self, key: &str) -> bool {
        [&self.up, &self.left, &self.down, &self.right]
            .iter()
            .any(|keys| keys.iter().any(|k| k == key))
    }
}

#[cfg(target_arch = "wasm32")]
pub mod wasm {
    use super::*;
    use web_sys::KeyboardEvent;

    pub fn keyboard_event_to_input(e: &KeyboardEvent, is_down: bool) -> InputEvent {
        let key = e.key();
        if is_down {
            InputEvent::KeyDown { key, repeat: e.repeat() }
        } else {
            InputEvent::KeyUp(key)
        }
    }
}
