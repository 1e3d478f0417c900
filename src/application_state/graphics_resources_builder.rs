//! # Graphics Resources Builder
//!
//! Creates the window and the wgpu context the render backend needs.
//!
//! The main components are:
//! - `Graphics`: Holds all graphics-related resources
//! - `GraphicsBuilder`: Helper for asynchronous graphics initialization
//! - `MaybeGraphics`: Represents the various states of graphics initialization

use std::sync::Arc;

use anyhow::Context;
use log::{error, info};
use wgpu::{Device, Queue, Surface, SurfaceConfiguration};
use winit::{
    dpi::PhysicalSize,
    event_loop::{ActiveEventLoop, EventLoopProxy},
    window::Window,
};

use crate::config::WindowConfig;

/// Everything the wgpu backend is built from.
pub struct Graphics {
    /// The application window
    pub window: Arc<Window>,
    /// Surface presenting into the window, already configured
    pub surface: Surface<'static>,
    /// Configuration applied to the surface
    pub surface_config: SurfaceConfiguration,
    /// The WebGPU device
    pub device: Device,
    /// The WebGPU queue
    pub queue: Queue,
}

/// Asynchronously requests an adapter and device for `window` and configures its surface.
///
/// # Arguments
/// * `window` - The window to present into
///
/// # Returns
/// The initialized `Graphics`, or the first wgpu call that failed
async fn create_graphics(window: Arc<Window>) -> anyhow::Result<Graphics> {
    // Backends::PRIMARY => Vulkan + Metal + DX12 + Browser WebGPU
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        flags: wgpu::InstanceFlags::empty(),
        backend_options: wgpu::BackendOptions::from_env_or_default(),
    });

    let surface = instance
        .create_surface(window.clone())
        .context("failed to create a surface for the window")?;

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        })
        .await
        .context("no graphics adapter can present to the window")?;

    info!("Using adapter {:?}", adapter.get_info().name);

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            label: None,
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::Off,
        })
        .await
        .context("failed to open the graphics device")?;

    let size = window.inner_size();

    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .find(|f| f.is_srgb())
        .copied()
        .or_else(|| surface_caps.formats.first().copied())
        .context("the surface supports no texture format")?;
    let surface_config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: wgpu::PresentMode::AutoVsync,
        alpha_mode: surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto),
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(&device, &surface_config);

    Ok(Graphics {
        window,
        surface,
        surface_config,
        device,
        queue,
    })
}

/// Helper struct for managing the initialization of graphics resources.
pub struct GraphicsBuilder {
    event_loop_proxy: Option<EventLoopProxy<Graphics>>,
    window_config: WindowConfig,
}

/// Represents the possible states of the graphics initialization process.
pub enum MaybeGraphics {
    /// Waiting for the event loop to resume
    Builder(GraphicsBuilder),
    /// Graphics resources have been handed to the engine
    Moved,
}

impl GraphicsBuilder {
    /// Creates a new GraphicsBuilder with the specified event loop proxy.
    ///
    /// # Arguments
    /// * `event_loop_proxy` - Used to send the initialized graphics resources back to the main thread
    /// * `window_config` - Title and initial size of the window
    pub fn new(event_loop_proxy: EventLoopProxy<Graphics>, window_config: WindowConfig) -> Self {
        Self {
            event_loop_proxy: Some(event_loop_proxy),
            window_config,
        }
    }

    /// Creates the window and the wgpu context and sends them to the event loop.
    ///
    /// Failures are logged and end the event loop.
    ///
    /// # Arguments
    /// * `event_loop` - The active event loop used to create the window
    pub fn build_and_send(&mut self, event_loop: &ActiveEventLoop) {
        let Some(event_loop_proxy) = self.event_loop_proxy.take() else {
            // event_loop_proxy is already spent - we already constructed Graphics
            return;
        };

        let result = self.create_window(event_loop).and_then(|window| {
            pollster::block_on(create_graphics(window))
        });

        match result {
            Ok(graphics) => {
                if event_loop_proxy.send_event(graphics).is_err() {
                    error!("Event loop closed before graphics were ready");
                    event_loop.exit();
                }
            }
            Err(err) => {
                error!("Graphics initialization failed: {:#}", err);
                event_loop.exit();
            }
        }
    }

    fn create_window(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<Arc<Window>> {
        let window_attrs = Window::default_attributes()
            .with_title(self.window_config.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.window_config.width,
                self.window_config.height,
            ));
        let window = event_loop
            .create_window(window_attrs)
            .context("failed to create the window")?;
        Ok(Arc::new(window))
    }
}
