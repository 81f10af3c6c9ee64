use std::collections::HashSet;
use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::viewport::Viewport;

/// Two presses of the same button closer than this count as a double click.
pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(300);

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
    Digit(u8),
    Function(u8),
}

/// Friendly names for the non-character keys the hosts react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedKey {
    Space,
    Enter,
    Tab,
    Left,
    Right,
    Up,
    Down,
    Escape,
    Backspace,
}

/// Identifier for a mouse button (left button is zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MouseButton(u8);

impl MouseButton {
    pub const LEFT: Self = Self(0);
    pub const RIGHT: Self = Self(1);
    pub const MIDDLE: Self = Self(2);

    pub fn new(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

/// Keyboard and pointer state collected by a host between frames.
#[derive(Debug, Default)]
pub struct InputState {
    keys: HashSet<KeyCode>,
    mouse_buttons: HashSet<MouseButton>,
    pointer: Vec2,
    cursor: Vec2,
    last_press: Option<(MouseButton, Duration)>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key_down(&mut self, key: KeyCode) {
        self.keys.insert(key);
    }

    pub fn set_key_up(&mut self, key: KeyCode) {
        self.keys.remove(&key);
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    /// Records a button press at time `at`. Returns true when the press
    /// completes a double click.
    pub fn set_mouse_button_down(&mut self, button: MouseButton, at: Duration) -> bool {
        self.mouse_buttons.insert(button);
        let double = matches!(
            self.last_press,
            Some((previous, when)) if previous == button && at.saturating_sub(when) <= DOUBLE_CLICK_WINDOW
        );
        self.last_press = if double { None } else { Some((button, at)) };
        double
    }

    pub fn set_mouse_button_up(&mut self, button: MouseButton) {
        self.mouse_buttons.remove(&button);
    }

    pub fn is_mouse_button_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons.contains(&button)
    }

    /// Stores the pointer position in logical pixels and derives the
    /// normalised cursor, which spans `-0.5..=0.5` across the viewport.
    pub fn set_pointer_position(&mut self, position: Vec2, viewport: &Viewport) {
        self.pointer = position;
        self.cursor = Vec2::new(
            position.x / viewport.width as f32 - 0.5,
            position.y / viewport.height as f32 - 0.5,
        );
    }

    /// Pointer position in logical pixels.
    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    /// Pointer position normalised to the viewport, centre at zero, y down.
    pub fn cursor(&self) -> Vec2 {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_is_centered_on_the_viewport() {
        let viewport = Viewport::new(800, 600);
        let mut input = InputState::new();
        input.set_pointer_position(Vec2::new(400.0, 300.0), &viewport);
        assert_eq!(input.cursor(), Vec2::ZERO);
        input.set_pointer_position(Vec2::new(800.0, 0.0), &viewport);
        assert_eq!(input.cursor(), Vec2::new(0.5, -0.5));
    }

    #[test]
    fn double_click_needs_two_quick_presses() {
        let mut input = InputState::new();
        assert!(!input.set_mouse_button_down(MouseButton::LEFT, Duration::from_millis(0)));
        input.set_mouse_button_up(MouseButton::LEFT);
        assert!(input.set_mouse_button_down(MouseButton::LEFT, Duration::from_millis(250)));
        input.set_mouse_button_up(MouseButton::LEFT);
        // a third press starts a new sequence
        assert!(!input.set_mouse_button_down(MouseButton::LEFT, Duration::from_millis(400)));
        assert!(!input.set_mouse_button_down(MouseButton::LEFT, Duration::from_millis(900)));
        assert!(!input.set_mouse_button_down(MouseButton::RIGHT, Duration::from_millis(950)));
    }

    #[test]
    fn input_state_tracks_keys() {
        let mut state = InputState::new();
        let space = KeyCode::Named(NamedKey::Space);
        state.set_key_down(space);
        assert!(state.is_key_down(space));
        state.set_key_up(space);
        assert!(!state.is_key_down(space));
    }
}
