#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Cubewar
//!
//! A single-chunk voxel world with a physics-driven player, rendered with wgpu.
//!
//! ## Key Modules
//!
//! * `application_state` - Window, input and the winit event loop
//! * `config` - Settings loaded from `settings.json`
//! * `core` - Shared single-threaded resource handles
//! * `engine_state` - Voxels, meshing, physics, scene graph, clock and rendering
//!
//! ## Architecture
//!
//! Everything runs on one thread. Each frame the simulation clock drains fixed physics steps,
//! the scene graph blends the last two physics snapshots, the mesher rebuilds the chunk's
//! point buffer if the grid changed, and the frame is submitted to the render backend.
//!
//! ## Usage
//!
//! ```no_run
//! fn main() -> anyhow::Result<()> {
//!     cubewar::run()
//! }
//! ```

use application_state::{
    graphics_resources_builder::{GraphicsBuilder, MaybeGraphics},
    ApplicationState,
};
use anyhow::Context;
use log::info;
use winit::event_loop::EventLoop;

pub mod application_state;
pub mod config;
pub mod core;
pub mod engine_state;

/// Loads the settings, opens the window and runs the event loop until the window closes.
pub fn run() -> anyhow::Result<()> {
    env_logger::Builder::new()
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();
    info!("Logger initialized");

    let config = config::EngineConfig::load()?;

    let event_loop = EventLoop::with_user_event()
        .build()
        .context("failed to create the event loop")?;

    let mut state = ApplicationState::new(
        MaybeGraphics::Builder(GraphicsBuilder::new(
            event_loop.create_proxy(),
            config.window.clone(),
        )),
        config,
    );

    event_loop
        .run_app(&mut state)
        .context("event loop terminated with an error")
}
