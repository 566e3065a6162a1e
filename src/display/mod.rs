//! On-screen presentation
//!
//! [`PlayerWindow`] is the event pump and [`Display`] is the frame sink the
//! playback loop drives.

mod renderer;
mod texture;
mod window;

use std::sync::Arc;

use thiserror::Error;
use winit::window::Window;

pub use renderer::{VideoParams, VideoRenderer};
pub use texture::{expand_to_rgba, VideoTexture};
pub use window::{initial_size, PlayerWindow};

use crate::playback::FrameSink;
use crate::video::PresentationFrame;

/// Window and GPU failures
#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("platform never provided a window")]
    NoWindow,
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface supports no formats on this adapter")]
    NoSurfaceFormat,
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

/// GPU-backed frame sink drawing into a window surface
pub struct Display {
    // Keeps the surface's window alive
    _window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    renderer: VideoRenderer,
    video: Option<(VideoTexture, wgpu::BindGroup)>,
    staging: Vec<u8>,
}

impl Display {
    pub fn new(window: Arc<Window>) -> Result<Self, DisplayError> {
        pollster::block_on(Self::new_async(window))
    }

    async fn new_async(window: Arc<Window>) -> Result<Self, DisplayError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(DisplayError::NoAdapter)?;

        let info = adapter.get_info();
        tracing::info!("Using GPU: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("hwplay Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(DisplayError::NoSurfaceFormat)?;

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

        let renderer = VideoRenderer::new(&device, surface_format);

        Ok(Self {
            _window: window,
            surface,
            device,
            queue,
            surface_config,
            renderer,
            video: None,
            staging: Vec::new(),
        })
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Resize the surface to the drawable size; `false` while it is empty
    fn sync_surface(&mut self, (width, height): (u32, u32)) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        if width != self.surface_config.width || height != self.surface_config.height {
            tracing::debug!("Resizing surface to {}x{}", width, height);
            self.surface_config.width = width;
            self.surface_config.height = height;
            self.reconfigure();
        }
        true
    }

    fn upload(&mut self, frame: &PresentationFrame<'_>) {
        let reuse = matches!(
            &self.video,
            Some((texture, _)) if texture.matches(frame.width, frame.height)
        );
        if !reuse {
            let texture = VideoTexture::new(&self.device, frame.width, frame.height);
            let bind_group = self.renderer.create_bind_group(&self.device, &texture);
            self.video = Some((texture, bind_group));
        }

        expand_to_rgba(frame, &mut self.staging);
        if let Some((texture, _)) = &self.video {
            texture.upload_rgba(&self.queue, &self.staging);
        }
    }
}

impl FrameSink for Display {
    type Error = DisplayError;

    fn present(
        &mut self,
        frame: &PresentationFrame<'_>,
        drawable_size: (u32, u32),
    ) -> Result<(), DisplayError> {
        if !self.sync_surface(drawable_size) {
            // Minimized
            return Ok(());
        }

        self.upload(frame);
        self.renderer.set_params(
            &self.queue,
            VideoParams::fit_aspect_ratio(
                frame.width,
                frame.height,
                self.surface_config.width,
                self.surface_config.height,
            ),
        );

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("Surface lost or outdated, reconfiguring");
                self.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("Surface timed out, dropping frame");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Present Encoder"),
            });

        if let Some((_, bind_group)) = &self.video {
            self.renderer.render(&mut encoder, &view, bind_group);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
