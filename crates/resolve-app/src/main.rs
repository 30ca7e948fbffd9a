use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use resolve_core::dispatch::resolve_parallel;
use resolve_core::sampler::SampledImage;
use resolve_core::StageBuilder;
use resolve_gpu::{
    context::GpuContext, image::GpuImage, resolve_pipeline::ResolvePass,
    targets::ResolveTargets,
};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

mod app;
mod config;
mod input;
mod scene;

use app::App;
use config::{Backend, Config};
use input::{action_for, Key};
use scene::{checker_texture, fragments, plane_quad, Summary};

// ---------------------------------------------------------------------------
// Headless runs
// ---------------------------------------------------------------------------

fn run_cpu(config: &Config) -> Result<()> {
    let texture = checker_texture(config.texture_size, config.checker_cells);
    let stage = StageBuilder::new()
        .image(SampledImage::new(texture, config.sampler()))
        .build()
        .context("building resolve stage")?;

    let inputs = fragments(config.width, config.height, config.uv_scale);
    let started = std::time::Instant::now();
    let targets = resolve_parallel(&stage, &inputs, config.workers);
    log::info!(
        "cpu: resolved in {:.2} ms",
        started.elapsed().as_secs_f64() * 1e3
    );
    log::info!("cpu: {}", Summary::of(&targets));
    Ok(())
}

fn run_gpu(config: &Config) -> Result<()> {
    let ctx = pollster::block_on(GpuContext::new_headless()).context("opening GPU")?;
    let pass = pollster::block_on(ResolvePass::for_targets(&ctx))
        .context("building resolve pipeline")?;

    let texture = checker_texture(config.texture_size, config.checker_cells);
    let image = GpuImage::upload(&ctx, &texture, &config.sampler())?;
    let targets = ResolveTargets::new(&ctx.device, config.width, config.height)?;

    pass.draw(&ctx, &image, &targets, &plane_quad(config.uv_scale));

    let out = targets.read_back(&ctx)?;
    log::info!("gpu: {}", Summary::of(&out));
    Ok(())
}

// ---------------------------------------------------------------------------
// Handler — winit ApplicationHandler for the preview window
// ---------------------------------------------------------------------------

struct Handler {
    config: Config,
    window: Option<Arc<Window>>,
    app: Option<App>,
    error: Option<anyhow::Error>,
}

impl Handler {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for Handler {
    /// Called once on desktop when the event loop starts.
    /// Creates the window then builds the resolve and preview passes.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let window_attrs = Window::default_attributes()
            .with_title("Fragment Resolve")
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.width,
                self.config.height,
            ));

        let window = match event_loop.create_window(window_attrs) {
            Ok(w) => Arc::new(w),
            Err(err) => return self.fail(event_loop, err.into()),
        };
        log::info!("Window created ({}×{})", self.config.width, self.config.height);

        let texture = checker_texture(self.config.texture_size, self.config.checker_cells);
        match App::new(
            Arc::clone(&window),
            texture,
            self.config.sampler(),
            self.config.uv_scale,
        ) {
            Ok(app) => {
                self.window = Some(window);
                self.app = Some(app);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested — exiting");
                event_loop.exit();
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                let key = match code {
                    KeyCode::Tab => Key::Tab,
                    KeyCode::KeyF => Key::F,
                    KeyCode::KeyQ => Key::Q,
                    KeyCode::Escape => Key::Escape,
                    _ => return,
                };
                let Some(app) = &mut self.app else { return };
                match app.handle_action(action_for(key)) {
                    Ok(true) => event_loop.exit(),
                    Ok(false) => {}
                    Err(err) => self.fail(event_loop, err),
                }
            }

            WindowEvent::Resized(new_size) => {
                let Some(app) = &mut self.app else { return };
                if let Err(err) = app.resize(new_size.width, new_size.height) {
                    self.fail(event_loop, err);
                }
            }

            WindowEvent::RedrawRequested => {
                if let Some(app) = &mut self.app {
                    match app.render() {
                        Ok(()) => {}
                        // Surface lost / outdated: reconfigure and try again next frame.
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            if let Some(window) = &self.window {
                                let size = window.inner_size();
                                if let Err(err) = app.resize(size.width, size.height) {
                                    self.fail(event_loop, err);
                                }
                            }
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            log::error!("GPU out of memory — exiting");
                            event_loop.exit();
                        }
                        Err(e) => log::warn!("render error: {e:?}"),
                    }
                }
            }

            _ => {}
        }
    }

    /// Drive continuous redraws (game-loop style).
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn run_window(config: Config) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut handler = Handler {
        config,
        window: None,
        app: None,
        error: None,
    };
    event_loop
        .run_app(&mut handler)
        .context("event loop error")?;
    match handler.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    config.validate()?;
    log::debug!("{config:?}");

    match config.backend {
        Backend::Cpu => run_cpu(&config),
        Backend::Gpu => run_gpu(&config),
        Backend::Window => run_window(config),
    }
}
