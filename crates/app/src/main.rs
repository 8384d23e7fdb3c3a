//! glint - Main Entry Point
//!
//! Window setup and event loop for the Vulkan frame driver. Resize events
//! are forwarded to the renderer through a coalescing signal and applied at
//! the start of the next frame.

use std::path::Path;

use anyhow::Result;
use tracing::{debug, error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use glint_core::{RendererConfig, Timer};
use glint_platform::{ResizeSignal, Window};
use glint_renderer::Renderer;

/// Configuration file looked up next to the working directory.
const CONFIG_PATH: &str = "glint.toml";

struct App {
    config: RendererConfig,
    window: Option<Window>,
    renderer: Option<Renderer>,
    resize: ResizeSignal,
    timer: Timer,
    frame_count: u64,
}

impl App {
    fn new(config: RendererConfig) -> Self {
        Self {
            config,
            window: None,
            renderer: None,
            resize: ResizeSignal::new(),
            timer: Timer::new(),
            frame_count: 0,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            match Window::new(
                event_loop,
                self.config.width,
                self.config.height,
                &self.config.title,
            ) {
                Ok(window) => {
                    match Renderer::new(&window, &self.config, self.resize.clone()) {
                        Ok(renderer) => {
                            info!("Initialization complete, entering main loop");
                            self.renderer = Some(renderer);
                            self.window = Some(window);
                        }
                        Err(e) => {
                            error!("Failed to create renderer: {:?}", e);
                            event_loop.exit();
                        }
                    }
                }
                Err(e) => {
                    error!("Failed to create window: {}", e);
                    event_loop.exit();
                }
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                debug!("Window resized to {}x{}", size.width, size.height);
                if let Some(ref mut window) = self.window {
                    window.resize(size.width, size.height);
                }
                // The renderer picks this up at the start of its next frame
                self.resize.notify(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                self.timer.tick();
                self.frame_count += 1;
                if self.frame_count.is_multiple_of(300) {
                    debug!("{:.1} fps", self.timer.fps());
                }

                if let Some(ref mut renderer) = self.renderer
                    && let Err(e) = renderer.render_frame()
                {
                    error!("Render error: {:?}", e);
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    glint_core::init_logging();

    let config = RendererConfig::load_or_default(Path::new(CONFIG_PATH))?;
    info!("Starting {}", config.title);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    Ok(())
}
