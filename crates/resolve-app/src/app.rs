use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use resolve_core::sampler::{SamplerDesc, Texture2d};
use resolve_core::OutputSlot;
use resolve_gpu::{
    context::GpuContext, image::GpuImage, renderer::PreviewPass,
    resolve_pipeline::ResolvePass, targets::ResolveTargets, vertex::Vertex,
};
use winit::window::Window;

use crate::input::{next_slot, toggled_filter, InputAction};
use crate::scene::plane_quad;

// ---------------------------------------------------------------------------
// Simple FPS counter — logs to console once per second
// ---------------------------------------------------------------------------

struct FpsCounter {
    frames: u32,
    last_report: Instant,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            frames: 0,
            last_report: Instant::now(),
        }
    }

    /// Increment the frame count.  Returns the FPS value if a full second has
    /// elapsed since the last report (so the caller can log it).
    fn tick(&mut self) -> Option<f32> {
        self.frames += 1;
        let elapsed = self.last_report.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            let fps = self.frames as f32 / elapsed;
            self.frames = 0;
            self.last_report = Instant::now();
            Some(fps)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// App — live preview of the two resolve targets
// ---------------------------------------------------------------------------

pub struct App {
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    ctx: GpuContext,

    resolve_pass: ResolvePass,
    preview: PreviewPass,

    // Size-dependent: rebuilt on resize, then re-resolved.
    targets: ResolveTargets,
    texture: Texture2d,
    sampler: SamplerDesc,
    image: GpuImage,
    quad: [Vertex; 6],
    dirty: bool,

    shown: OutputSlot,
    fps: FpsCounter,
}

impl App {
    /// Initialise wgpu for a given window.  The window is wrapped in `Arc` so
    /// that the surface can safely hold a `'static` reference to it.
    pub fn new(
        window: Arc<Window>,
        texture: Texture2d,
        sampler: SamplerDesc,
        uv_scale: f32,
    ) -> Result<Self> {
        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        // ---- Instance & surface --------------------------------------------
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(Arc::clone(&window))
            .context("failed to create wgpu surface")?;

        // ---- Adapter & device ----------------------------------------------
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no suitable GPU adapter found")?;
        let ctx = pollster::block_on(GpuContext::from_adapter(instance, adapter))?;

        // ---- Surface configuration ------------------------------------------
        let surface_caps = surface.get_capabilities(&ctx.adapter);
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&ctx.device, &surface_config);
        log::info!(
            "Surface configured: {}×{} {:?} Fifo",
            surface_config.width,
            surface_config.height,
            format
        );

        // ---- Passes ---------------------------------------------------------
        let resolve_pass = pollster::block_on(ResolvePass::for_targets(&ctx))?;
        let preview = PreviewPass::new(&ctx.device, format);
        let targets = ResolveTargets::new(&ctx.device, width, height)?;
        let image = GpuImage::upload(&ctx, &texture, &sampler)?;

        Ok(Self {
            surface,
            surface_config,
            ctx,
            resolve_pass,
            preview,
            targets,
            texture,
            sampler,
            image,
            quad: plane_quad(uv_scale),
            dirty: true,
            shown: OutputSlot::Color,
            fps: FpsCounter::new(),
        })
    }

    // -------------------------------------------------------------------------
    // Resize
    // -------------------------------------------------------------------------

    /// Reconfigure the surface and rebuild the resolve targets at the new size.
    pub fn resize(&mut self, new_width: u32, new_height: u32) -> Result<()> {
        if new_width == 0 || new_height == 0 {
            return Ok(());
        }
        self.surface_config.width = new_width;
        self.surface_config.height = new_height;
        self.surface.configure(&self.ctx.device, &self.surface_config);

        self.targets = ResolveTargets::new(&self.ctx.device, new_width, new_height)?;
        self.dirty = true;

        log::debug!("Surface resized to {}×{}", new_width, new_height);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Input
    // -------------------------------------------------------------------------

    /// Apply an action to the app state.
    ///
    /// Returns `true` if the app should exit (i.e. action was `Quit`).
    pub fn handle_action(&mut self, action: InputAction) -> Result<bool> {
        match action {
            InputAction::ToggleSlot => {
                self.shown = next_slot(self.shown);
                log::info!("Showing slot {} ({:?})", self.shown.location(), self.shown);
            }
            InputAction::ToggleFilter => {
                self.sampler.filter = toggled_filter(self.sampler.filter);
                self.image = GpuImage::upload(&self.ctx, &self.texture, &self.sampler)?;
                self.dirty = true;
                log::info!("Filter → {:?}", self.sampler.filter);
            }
            InputAction::Quit => return Ok(true),
        }
        Ok(false)
    }

    // -------------------------------------------------------------------------
    // Render
    // -------------------------------------------------------------------------

    /// Re-run the resolve pass if anything it depends on changed, then present
    /// the selected target.
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        if let Some(fps) = self.fps.tick() {
            log::debug!("FPS: {:.1}  slot: {:?}", fps, self.shown);
        }

        if self.dirty {
            self.resolve_pass
                .draw(&self.ctx, &self.image, &self.targets, &self.quad);
            self.dirty = false;
        }

        let output = self.surface.get_current_texture()?;
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });
        self.preview.encode(
            &self.ctx.device,
            &mut encoder,
            &surface_view,
            self.targets.view(self.shown),
            self.shown,
        );

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
