use serde::Deserialize;

/// Key codes as reported by the platform layer (GLFW-style numbering).
pub mod keys {
    pub const A: i64 = 65;
    pub const D: i64 = 68;
    pub const S: i64 = 83;
    pub const W: i64 = 87;
    pub const RIGHT: i64 = 262;
    pub const LEFT: i64 = 263;
    pub const DOWN: i64 = 264;
    pub const UP: i64 = 265;
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputEvent {
    Key { code: i64 },
    GamepadButton { code: i64 },
    GamepadAxis { code: i64, value: f64 },
}

/// Discrete input collected for one frame. Each event is delivered to the
/// scenes exactly once; the scene system clears it after the update pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameInput {
    pub keys_pressed: Vec<i64>,
    pub gamepad_pressed: Vec<i64>,
    pub gamepad_axes: Vec<(i64, f64)>,
}

impl FrameInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: InputEvent) {
        match event {
            InputEvent::Key { code } => self.keys_pressed.push(code),
            InputEvent::GamepadButton { code } => self.gamepad_pressed.push(code),
            InputEvent::GamepadAxis { code, value } => self.gamepad_axes.push((code, value)),
        }
    }

    pub fn with_key(mut self, code: i64) -> Self {
        self.keys_pressed.push(code);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.keys_pressed.is_empty() && self.gamepad_pressed.is_empty() && self.gamepad_axes.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys_pressed.clear();
        self.gamepad_pressed.clear();
        self.gamepad_axes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_routes_events_by_kind() {
        let mut input = FrameInput::new();
        input.push(InputEvent::Key { code: keys::LEFT });
        input.push(InputEvent::GamepadButton { code: 3 });
        input.push(InputEvent::GamepadAxis { code: 1, value: -0.5 });
        assert_eq!(input.keys_pressed, vec![keys::LEFT]);
        assert_eq!(input.gamepad_pressed, vec![3]);
        assert_eq!(input.gamepad_axes, vec![(1, -0.5)]);
        input.clear();
        assert!(input.is_empty());
    }

    #[test]
    fn replay_events_deserialize_from_tagged_json() {
        let event: InputEvent = serde_json::from_str(r#"{"kind":"gamepad_axis","code":0,"value":0.25}"#)
            .expect("axis event should parse");
        assert_eq!(event, InputEvent::GamepadAxis { code: 0, value: 0.25 });
    }
}
