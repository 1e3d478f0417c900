//! # Input Manager
//!
//! Accumulates window and device events between frames and turns them into one
//! [`ProcessedInputState`] per frame.

use std::collections::HashMap;

use winit::{
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use super::input_state::{ProcessedInputState, RawInputState};

/// Keys the engine reacts to: pointer grab, fullscreen and statistics.
const KEY_CODES: [KeyCode; 3] = [KeyCode::F1, KeyCode::F2, KeyCode::F3];

/// Mouse buttons the engine reacts to.
const MOUSE_BUTTONS: [MouseButton; 1] = [MouseButton::Left];

/// Tracks the down state of the keys and buttons the engine uses.
pub struct InputManager {
    keyboard_inputs_old: HashMap<KeyCode, bool>,
    keyboard_inputs_new: HashMap<KeyCode, bool>,
    mouse_button_inputs_old: HashMap<MouseButton, bool>,
    mouse_button_inputs_new: HashMap<MouseButton, bool>,
    mouse_delta: Option<(f64, f64)>,
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InputManager {
    /// Creates a manager with every tracked input released.
    pub fn new() -> Self {
        let released_keys: HashMap<KeyCode, bool> =
            KEY_CODES.iter().map(|key| (*key, false)).collect();
        let released_buttons: HashMap<MouseButton, bool> =
            MOUSE_BUTTONS.iter().map(|button| (*button, false)).collect();

        Self {
            keyboard_inputs_old: released_keys.clone(),
            keyboard_inputs_new: released_keys,
            mouse_button_inputs_old: released_buttons.clone(),
            mouse_button_inputs_new: released_buttons,
            mouse_delta: None,
        }
    }

    /// Processes a window event and updates internal input state.
    ///
    /// # Arguments
    /// * `event` - The window event to process
    pub fn intake_input(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state,
                        physical_key: PhysicalKey::Code(key),
                        ..
                    },
                ..
            } => {
                if let Some(key_state) = self.keyboard_inputs_new.get_mut(key) {
                    *key_state = *state == ElementState::Pressed;
                }
            }
            WindowEvent::MouseInput { button, state, .. } => {
                if let Some(button_state) = self.mouse_button_inputs_new.get_mut(button) {
                    *button_state = *state == ElementState::Pressed;
                }
            }
            _ => {}
        }
    }

    /// Adds raw mouse motion to the delta of the current frame.
    ///
    /// # Arguments
    /// * `delta` - The (x, y) delta of mouse movement since the last event
    pub fn intake_mouse_motion(&mut self, delta: (f64, f64)) {
        let (x, y) = self.mouse_delta.unwrap_or((0.0, 0.0));
        self.mouse_delta = Some((x + delta.0, y + delta.1));
    }

    /// Builds the snapshot of this frame and starts the next one.
    pub fn get_and_reset_processed_input(&mut self) -> ProcessedInputState {
        let keyboard_states = self
            .keyboard_inputs_new
            .iter()
            .map(|(key, &new_state)| {
                let old_state = self.keyboard_inputs_old.get(key).copied().unwrap_or(false);
                (*key, RawInputState::from_raw_states(old_state, new_state))
            })
            .collect();

        let mouse_button_states = self
            .mouse_button_inputs_new
            .iter()
            .map(|(button, &new_state)| {
                let old_state = self
                    .mouse_button_inputs_old
                    .get(button)
                    .copied()
                    .unwrap_or(false);
                (*button, RawInputState::from_raw_states(old_state, new_state))
            })
            .collect();

        let processed = ProcessedInputState {
            keyboard_states,
            mouse_button_states,
            mouse_delta: self.mouse_delta,
        };
        self.reset_inputs();
        processed
    }

    /// Carries the current down states into the previous snapshot and clears the mouse delta.
    ///
    /// Also called when the window loses focus so no motion leaks into the next frame.
    pub fn reset_inputs(&mut self) {
        self.keyboard_inputs_old.clone_from(&self.keyboard_inputs_new);
        self.mouse_button_inputs_old
            .clone_from(&self.mouse_button_inputs_new);
        self.mouse_delta = None;
    }

    /// Releases every tracked input.
    pub fn release_all(&mut self) {
        self.keyboard_inputs_new.values_mut().for_each(|down| *down = false);
        self.mouse_button_inputs_new
            .values_mut()
            .for_each(|down| *down = false);
        self.reset_inputs();
    }

    #[cfg(test)]
    fn set_key(&mut self, key: KeyCode, down: bool) {
        if let Some(state) = self.keyboard_inputs_new.get_mut(&key) {
            *state = down;
        }
    }

    #[cfg(test)]
    fn set_button(&mut self, button: MouseButton, down: bool) {
        if let Some(state) = self.mouse_button_inputs_new.get_mut(&button) {
            *state = down;
        }
    }
}
