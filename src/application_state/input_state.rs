//! # Input State
//!
//! Per-frame snapshots of the tracked keys and mouse buttons.

use std::collections::HashMap;
use winit::{event::MouseButton, keyboard::KeyCode};

/// Transition of a key or button between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawInputState {
    /// Key/button is not pressed
    #[default]
    NotPressed,
    /// Key/button was just pressed this frame
    Pressed,
    /// Key/button has been held down for multiple frames
    Held,
    /// Key/button was just released this frame
    Released,
}

impl RawInputState {
    /// Determines if the input is actively down (either pressed or held)
    pub fn is_active(&self) -> bool {
        matches!(self, RawInputState::Pressed | RawInputState::Held)
    }

    /// Determines if the input was just pressed this frame
    pub fn is_just_pressed(&self) -> bool {
        matches!(self, RawInputState::Pressed)
    }

    /// Determines if the input was just released this frame
    pub fn is_just_released(&self) -> bool {
        matches!(self, RawInputState::Released)
    }

    /// Derives the transition from the down state in the previous and current snapshot.
    pub fn from_raw_states(previous: bool, current: bool) -> Self {
        match (previous, current) {
            (false, true) => RawInputState::Pressed,
            (true, true) => RawInputState::Held,
            (true, false) => RawInputState::Released,
            (false, false) => RawInputState::NotPressed,
        }
    }
}

/// A snapshot of the processed input states with state transitions.
#[derive(Debug, Default)]
pub struct ProcessedInputState {
    /// Current state of all tracked keyboard keys
    pub keyboard_states: HashMap<KeyCode, RawInputState>,

    /// Current state of mouse buttons
    pub mouse_button_states: HashMap<MouseButton, RawInputState>,

    /// Accumulated mouse movement since the last snapshot (x, y)
    pub mouse_delta: Option<(f64, f64)>,
}

impl ProcessedInputState {
    /// Gets the state of a keyboard key
    pub fn get_key_state(&self, key: KeyCode) -> RawInputState {
        self.keyboard_states.get(&key).copied().unwrap_or_default()
    }

    /// Gets the state of a mouse button
    pub fn get_mouse_button_state(&self, button: MouseButton) -> RawInputState {
        self.mouse_button_states
            .get(&button)
            .copied()
            .unwrap_or_default()
    }

    /// Gets the mouse movement since the last snapshot
    pub fn get_mouse_delta(&self) -> Option<(f64, f64)> {
        self.mouse_delta
    }
}
