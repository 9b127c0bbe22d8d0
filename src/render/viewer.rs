//! Presenter: a winit window drawing slideshow layers with wgpu.
//!
//! The render thread owns every GPU object. Pixel buffers are uploaded when a
//! display slot's generation changes, and the surface resolution is passed
//! into each frame explicitly.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wgpu::SurfaceError;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Fullscreen, Window, WindowAttributes, WindowId},
};

use crate::config::Configuration;
use crate::processing::layout::{center_offset, cover_scale};
use crate::render::texture::{GpuImage, Handle, HandleTable, LayerUniform};
use crate::tasks::files::LocalCatalog;
use crate::tasks::slideshow::{Layer, Slideshow};

/// Screen-space rectangle in pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    /// Left, top, right, bottom in normalized device coordinates.
    pub fn to_ndc(&self, screen: (u32, u32)) -> [f32; 4] {
        let sw = screen.0.max(1) as f32;
        let sh = screen.1.max(1) as f32;
        [
            self.x / sw * 2.0 - 1.0,
            1.0 - self.y / sh * 2.0,
            (self.x + self.w) / sw * 2.0 - 1.0,
            1.0 - (self.y + self.h) / sh * 2.0,
        ]
    }
}

/// The blurred background stretched to cover the screen, centered.
pub fn background_rect(background: (u32, u32), screen: (u32, u32)) -> Rect {
    let s = cover_scale(background.0, background.1, screen.0, screen.1);
    let w = background.0 as f32 * s;
    let h = background.1 as f32 * s;
    let (x, y) = center_offset(w, h, screen.0 as f32, screen.1 as f32);
    Rect { x, y, w, h }
}

/// The foreground at native size, centered and displaced by its pan offset.
pub fn foreground_rect(image: (u32, u32), screen: (u32, u32), offset: [f32; 2]) -> Rect {
    let w = image.0 as f32;
    let h = image.1 as f32;
    let (x, y) = center_offset(w, h, screen.0 as f32, screen.1 as f32);
    Rect {
        x: x + offset[0],
        y: y + offset[1],
        w,
        h,
    }
}

#[derive(Debug)]
enum ViewerEvent {
    Cancelled,
}

struct SlotTextures {
    generation: u64,
    foreground: Handle,
    background: Handle,
}

struct Renderer {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    textures: HandleTable<GpuImage>,
    slots: [Option<SlotTextures>; 2],
}

impl Renderer {
    fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("slide-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/slide.wgsl").into()),
        });
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("slide-bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("slide-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("slide-pipeline-layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("slide-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        Self {
            pipeline,
            layout,
            sampler,
            textures: HandleTable::new(),
            slots: [None, None],
        }
    }

    /// Re-upload any slot whose pixels changed since the last frame.
    fn sync(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, layers: &[Layer<'_>]) {
        for layer in layers {
            let current = self.slots[layer.slot].as_ref().map(|s| s.generation);
            if current == Some(layer.generation) {
                continue;
            }
            self.release_slot(layer.slot);
            let foreground = GpuImage::upload(
                device,
                queue,
                &self.layout,
                &self.sampler,
                layer.image,
                "slide-foreground",
            );
            let background = GpuImage::upload(
                device,
                queue,
                &self.layout,
                &self.sampler,
                layer.background,
                "slide-background",
            );
            self.slots[layer.slot] = Some(SlotTextures {
                generation: layer.generation,
                foreground: self.textures.insert(foreground),
                background: self.textures.insert(background),
            });
            debug!(slot = layer.slot, generation = layer.generation, "slot textures replaced");
        }
    }

    fn release_slot(&mut self, slot: usize) {
        if let Some(old) = self.slots[slot].take() {
            for handle in [old.foreground, old.background] {
                if let Some(image) = self.textures.remove(handle) {
                    image.release();
                }
            }
        }
    }

    fn release_all(&mut self) {
        self.slots = [None, None];
        for image in self.textures.drain() {
            image.release();
        }
    }

    fn render(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        layers: &[Layer<'_>],
        resolution: (u32, u32),
    ) {
        // Each texture owns its uniform buffer, so all writes can precede the pass.
        let mut draws = Vec::with_capacity(layers.len() * 2);
        for layer in layers {
            let Some(slot) = self.slots[layer.slot].as_ref() else {
                continue;
            };
            let (Some(bg), Some(fg)) = (
                self.textures.get(slot.background),
                self.textures.get(slot.foreground),
            ) else {
                continue;
            };
            let opacity = [layer.opacity.clamp(0.0, 1.0), 0.0, 0.0, 0.0];
            bg.write_uniform(
                queue,
                &LayerUniform {
                    rect: background_rect(bg.size(), resolution).to_ndc(resolution),
                    opacity,
                },
            );
            fg.write_uniform(
                queue,
                &LayerUniform {
                    rect: foreground_rect(fg.size(), resolution, layer.offset).to_ndc(resolution),
                    opacity,
                },
            );
            draws.push(bg);
            draws.push(fg);
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("slide-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        for image in draws {
            pass.set_bind_group(0, image.bind_group(), &[]);
            pass.draw(0..4, 0..1);
        }
    }
}

struct Gpu {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,
    renderer: Renderer,
}

struct SlideshowApp {
    cfg: Configuration,
    cancel: CancellationToken,
    source: Option<LocalCatalog>,
    slideshow: Option<Slideshow<LocalCatalog>>,
    window: Option<Arc<Window>>,
    gpu: Option<Gpu>,
    last_frame: Option<Instant>,
    fatal: Option<anyhow::Error>,
}

impl SlideshowApp {
    fn new(cfg: Configuration, source: LocalCatalog, cancel: CancellationToken) -> Self {
        Self {
            cfg,
            cancel,
            source: Some(source),
            slideshow: None,
            window: None,
            gpu: None,
            last_frame: None,
            fatal: None,
        }
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Result<Arc<Window>> {
        if let Some(window) = self.window.as_ref() {
            return Ok(window.clone());
        }
        let mut attrs = WindowAttributes::default().with_title("slideshow");
        if self.cfg.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create slideshow window")?,
        );
        self.window = Some(window.clone());
        Ok(window)
    }

    fn init_gpu(&mut self, window: Arc<Window>) -> Result<()> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to acquire GPU adapter")?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|fmt| fmt.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow!("surface reports no texture formats"))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("slideshow-device"),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        }))
        .context("failed to acquire GPU device")?;

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        info!(
            width = config.width,
            height = config.height,
            format = ?config.format,
            "slideshow surface configured",
        );

        let renderer = Renderer::new(&device, format);
        self.gpu = Some(Gpu {
            surface,
            config,
            device,
            queue,
            renderer,
        });
        Ok(())
    }

    fn init_slideshow(&mut self) -> Result<()> {
        let Some(source) = self.source.take() else {
            return Ok(());
        };
        let target = self.target_resolution();
        self.slideshow = Some(Slideshow::new(source, &self.cfg, target)?);
        Ok(())
    }

    fn target_resolution(&self) -> (u32, u32) {
        match (self.cfg.target_resolution, self.gpu.as_ref()) {
            (Some(res), _) => (res.width, res.height),
            (None, Some(gpu)) => (gpu.config.width, gpu.config.height),
            (None, None) => (1920, 1080),
        }
    }

    fn handle_resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        gpu.config.width = new_size.width.max(1);
        gpu.config.height = new_size.height.max(1);
        gpu.surface.configure(&gpu.device, &gpu.config);
        debug!(
            width = gpu.config.width,
            height = gpu.config.height,
            "slideshow surface resized",
        );
        if self.cfg.target_resolution.is_none() {
            let target = (gpu.config.width, gpu.config.height);
            if let Some(show) = self.slideshow.as_mut() {
                show.pipeline_mut().set_target(target);
            }
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!(error = ?err, "slideshow stopped");
        self.fatal = Some(err);
        event_loop.exit();
    }

    fn draw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = self
            .last_frame
            .replace(now)
            .map_or(0.0, |prev| (now - prev).as_secs_f32());

        let (Some(gpu), Some(show)) = (self.gpu.as_mut(), self.slideshow.as_mut()) else {
            return;
        };
        let layers = match show.tick(dt) {
            Ok(layers) => layers,
            Err(err) => {
                let err = anyhow::Error::new(err).context("prefetch pipeline failed");
                self.fail(event_loop, err);
                return;
            }
        };

        let frame = match gpu.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Outdated | SurfaceError::Lost) => {
                info!("slideshow surface lost; reconfiguring");
                gpu.surface.configure(&gpu.device, &gpu.config);
                return;
            }
            Err(SurfaceError::OutOfMemory) => {
                self.fail(event_loop, anyhow!("surface out of memory"));
                return;
            }
            Err(SurfaceError::Timeout) => {
                warn!("slideshow surface acquisition timed out");
                return;
            }
            Err(err) => {
                warn!(error = %err, "slideshow surface error; reconfiguring");
                gpu.surface.configure(&gpu.device, &gpu.config);
                return;
            }
        };

        gpu.renderer.sync(&gpu.device, &gpu.queue, &layers);
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("slideshow-encoder"),
            });
        let resolution = (gpu.config.width, gpu.config.height);
        gpu.renderer
            .render(&gpu.queue, &mut encoder, &view, &layers, resolution);
        gpu.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }
}

impl ApplicationHandler<ViewerEvent> for SlideshowApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.cancel.is_cancelled() {
            event_loop.exit();
            return;
        }
        let window = match self.ensure_window(event_loop) {
            Ok(window) => window,
            Err(err) => return self.fail(event_loop, err),
        };
        if self.gpu.is_none() {
            if let Err(err) = self.init_gpu(window.clone()) {
                return self.fail(event_loop, err.context("failed to initialize GPU state"));
            }
        }
        if let Err(err) = self.init_slideshow() {
            return self.fail(event_loop, err.context("failed to start slideshow"));
        }
        window.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.clone() else {
            return;
        };
        if window.id() != window_id {
            return;
        }
        match event {
            WindowEvent::CloseRequested => {
                info!("slideshow window close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => self.handle_resize(new_size),
            WindowEvent::ScaleFactorChanged {
                mut inner_size_writer,
                ..
            } => {
                let size = window.inner_size();
                let _ = inner_size_writer.request_inner_size(size);
                self.handle_resize(size);
            }
            WindowEvent::RedrawRequested => self.draw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        // Animation runs every frame.
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Cancelled => {
                info!("slideshow received cancellation event");
                event_loop.exit();
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.renderer.release_all();
        }
        // Joins the prefetch worker before the window goes away.
        self.slideshow = None;
    }
}

/// Open the window and run the slideshow until it is closed or `cancel` fires.
///
/// Must be called from the main thread inside a tokio runtime.
pub fn run_windowed(cfg: Configuration, source: LocalCatalog, cancel: CancellationToken) -> Result<()> {
    let event_loop = EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .context("failed to build slideshow event loop")?;
    let proxy = event_loop.create_proxy();

    let cancel_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            cancel.cancelled().await;
            let _ = proxy.send_event(ViewerEvent::Cancelled);
        })
    };

    let mut app = SlideshowApp::new(cfg, source, cancel);
    let run_result = event_loop.run_app(&mut app);
    cancel_task.abort();

    run_result.context("slideshow event loop failed")?;
    match app.fatal.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
