//! Input state management

use std::collections::{HashMap, HashSet};

/// Player intent for one simulation step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlInput {
    /// Combined keyboard + touch steer, clamped to [-1, 1]; positive turns left
    pub steer: f32,
    /// Jump is held (the controller does its own edge detection)
    pub jump: bool,
    /// A boost was requested this step
    pub boost: bool,
}

impl ControlInput {
    pub fn new(steer: f32, jump: bool, boost: bool) -> Self {
        Self {
            steer: steer.clamp(-1.0, 1.0),
            jump,
            boost,
        }
    }
}

/// Tracks key and touch input and folds it into a `ControlInput`
///
/// Keys are identified by their DOM-style code (`"KeyA"`, `"ArrowLeft"`,
/// `"Space"`), which is what every front end we feed from already speaks.
pub struct InputState {
    /// Keys currently held down
    keys_down: HashSet<String>,

    /// Touch steer axis in [-1, 1], set by an on-screen control
    touch_steer: f32,
    /// Touch jump button held
    touch_jump: bool,
    /// Latched touch boost tap, held until a simulation step has read it
    touch_boost: bool,

    /// Action map: action name -> list of key codes
    action_map: HashMap<String, Vec<String>>,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        Self {
            keys_down: HashSet::new(),
            touch_steer: 0.0,
            touch_jump: false,
            touch_boost: false,
            action_map: Self::default_action_map(),
        }
    }

    fn default_action_map() -> HashMap<String, Vec<String>> {
        let bind = |keys: &[&str]| keys.iter().map(|k| k.to_string()).collect::<Vec<_>>();
        let mut map = HashMap::new();
        map.insert("steer_left".into(), bind(&["KeyA", "ArrowLeft"]));
        map.insert("steer_right".into(), bind(&["KeyD", "ArrowRight"]));
        map.insert("jump".into(), bind(&["Space"]));
        map.insert("boost".into(), bind(&["ShiftLeft", "ShiftRight"]));
        map
    }

    /// Process a key press event
    pub fn process_key_down(&mut self, key: &str) {
        self.keys_down.insert(key.to_string());
    }

    /// Process a key release event
    pub fn process_key_up(&mut self, key: &str) {
        self.keys_down.remove(key);
    }

    /// Set the touch steer axis (clamped to [-1, 1])
    pub fn set_touch_steer(&mut self, steer: f32) {
        self.touch_steer = if steer.is_finite() {
            steer.clamp(-1.0, 1.0)
        } else {
            0.0
        };
    }

    /// Set whether the touch jump button is held
    pub fn set_touch_jump(&mut self, held: bool) {
        self.touch_jump = held;
    }

    /// Register a boost tap; stays latched until `consume_boost`
    pub fn request_boost(&mut self) {
        self.touch_boost = true;
    }

    /// Clear a latched boost tap. Call once a simulation step has run with
    /// the input from `control_input`, so frames that run no step keep it.
    pub fn consume_boost(&mut self) {
        self.touch_boost = false;
    }

    /// Is an action currently held? (any bound key is down)
    pub fn is_action_pressed(&self, action: &str) -> bool {
        self.action_map
            .get(action)
            .map(|keys| keys.iter().any(|k| self.keys_down.contains(k)))
            .unwrap_or(false)
    }

    /// Fold keys and touch into the controller input
    pub fn control_input(&self) -> ControlInput {
        let mut key_steer = 0.0;
        if self.is_action_pressed("steer_left") {
            key_steer += 1.0;
        }
        if self.is_action_pressed("steer_right") {
            key_steer -= 1.0;
        }

        let jump = self.is_action_pressed("jump") || self.touch_jump;
        let boost = self.is_action_pressed("boost") || self.touch_boost;

        ControlInput::new(key_steer + self.touch_steer, jump, boost)
    }
}
