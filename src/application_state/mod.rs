//! # Application State Management
//!
//! Drives the engine from the winit event loop:
//! - Window and graphics initialization
//! - Input handling and pointer grab
//! - Per-frame engine updates and redraws

pub mod graphics_resources_builder;
pub mod input_manager;
pub mod input_state;

use std::sync::Arc;

use graphics_resources_builder::{Graphics, MaybeGraphics};
use input_manager::InputManager;
use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Fullscreen, Window, WindowId},
};

use crate::{
    config::EngineConfig,
    engine_state::{
        rendering::gpu::WgpuSubmission, simulation_clock::SystemPerformanceCounter, EngineState,
    },
};

/// The engine as run by the application.
pub type WindowedEngine = EngineState<WgpuSubmission, SystemPerformanceCounter>;

/// The main application state container that manages the application's lifecycle.
pub struct ApplicationState {
    /// The current graphics state
    pub graphics: MaybeGraphics,

    /// The initialized application state, if the application has started
    pub state: Option<InitializedApplicationState>,

    /// Settings the engine is built from once graphics are ready
    pub config: EngineConfig,
}

/// Represents the fully initialized and running state of the application.
pub struct InitializedApplicationState {
    /// The engine
    pub engine_state: WindowedEngine,

    /// Handle to the application window
    pub window: Arc<Window>,

    /// Manages input state and event processing
    pub input_manager: InputManager,

    /// Whether mouse motion currently steers the camera
    pub pointer_grabbed: bool,
}

impl ApplicationState {
    /// Creates the application in its pre-graphics state.
    pub fn new(graphics: MaybeGraphics, config: EngineConfig) -> Self {
        Self {
            graphics,
            state: None,
            config,
        }
    }

    /// Builds the engine on top of freshly created graphics resources.
    fn initialize_application_state(&mut self, graphics: Graphics) -> anyhow::Result<()> {
        let Graphics {
            window,
            surface,
            surface_config,
            device,
            queue,
        } = graphics;

        let submission = WgpuSubmission::new(surface, surface_config, device, queue);
        let engine_state = EngineState::new(
            self.config.clone(),
            submission,
            SystemPerformanceCounter::new(),
        )?;

        self.state = Some(InitializedApplicationState {
            engine_state,
            window,
            input_manager: InputManager::new(),
            pointer_grabbed: false,
        });
        self.graphics = MaybeGraphics::Moved;
        Ok(())
    }
}

impl InitializedApplicationState {
    /// Grabs or releases the pointer.
    fn set_pointer_grab(&mut self, grabbed: bool) {
        let result = if grabbed {
            self.window
                .set_cursor_grab(CursorGrabMode::Confined)
                .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Locked))
        } else {
            self.window.set_cursor_grab(CursorGrabMode::None)
        };

        match result {
            Ok(()) => {
                self.window.set_cursor_visible(!grabbed);
                self.pointer_grabbed = grabbed;
                info!("Pointer {}", if grabbed { "grabbed" } else { "released" });
            }
            Err(err) => warn!("Could not change the pointer grab: {}", err),
        }
    }

    /// Switches between borderless fullscreen and windowed mode.
    fn toggle_fullscreen(&self) {
        let fullscreen = self.window.fullscreen().is_none();
        self.window
            .set_fullscreen(fullscreen.then_some(Fullscreen::Borderless(None)));
        info!("Fullscreen: {}", fullscreen);
    }
}

impl ApplicationHandler<Graphics> for ApplicationState {
    /// Handles window-related events such as resize, focus changes, and input events.
    ///
    /// # Arguments
    /// * `event_loop` - Reference to the active event loop
    /// * `_window_id` - ID of the window that generated the event
    /// * `event` - The window event to process
    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = &mut self.state else {
            if let WindowEvent::CloseRequested = event {
                event_loop.exit();
            }
            return;
        };

        state.input_manager.intake_input(&event);

        match event {
            WindowEvent::Resized(size) => {
                state.engine_state.resize(size.width, size.height);
            }
            WindowEvent::Focused(false) => {
                state.input_manager.release_all();
                if state.pointer_grabbed {
                    state.set_pointer_grab(false);
                }
            }
            WindowEvent::RedrawRequested => {
                state.engine_state.frame();
            }
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),
            _ => (),
        }
    }

    /// Feeds raw mouse motion to the input manager while the pointer is grabbed.
    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let Some(state) = &mut self.state {
            if let DeviceEvent::MouseMotion { delta } = event {
                if state.pointer_grabbed {
                    state.input_manager.intake_mouse_motion(delta);
                }
            }
        }
    }

    /// Starts graphics initialization the first time the application is resumed.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let MaybeGraphics::Builder(builder) = &mut self.graphics {
            builder.build_and_send(event_loop);
        }
    }

    /// Receives the initialized graphics resources and builds the engine.
    fn user_event(&mut self, event_loop: &ActiveEventLoop, graphics: Graphics) {
        if let Err(err) = self.initialize_application_state(graphics) {
            error!("Engine initialization failed: {:#}", err);
            event_loop.exit();
        }
    }

    /// Hands this frame's input to the engine and schedules the next redraw.
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &mut self.state {
            let processed_input = state.input_manager.get_and_reset_processed_input();
            if processed_input.get_key_state(KeyCode::F1).is_just_pressed() {
                let grabbed = !state.pointer_grabbed;
                state.set_pointer_grab(grabbed);
            }
            if processed_input.get_key_state(KeyCode::F2).is_just_pressed() {
                state.toggle_fullscreen();
            }
            state.engine_state.set_input_commands(processed_input);
            state.window.request_redraw();
        }
    }
}
