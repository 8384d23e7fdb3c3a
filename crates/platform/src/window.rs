//! Window and Vulkan surface creation.

use std::sync::Arc;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, info};
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window as WinitWindow, WindowAttributes};

use glint_core::{Error, Result};

/// Wrapper around the winit window that tracks the current physical size.
///
/// The stored size is what the renderer reads when it rebuilds the
/// swapchain; `resize` must be called from the resize event handler to keep
/// it current.
pub struct Window {
    inner: Arc<WinitWindow>,
    width: u32,
    height: u32,
}

impl Window {
    pub fn new(event_loop: &ActiveEventLoop, width: u32, height: u32, title: &str) -> Result<Self> {
        let attributes = WindowAttributes::default()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(true);

        let inner = event_loop
            .create_window(attributes)
            .map_err(|e| Error::Window(e.to_string()))?;

        info!("Created {}x{} window", width, height);

        Ok(Self {
            inner: Arc::new(inner),
            width,
            height,
        })
    }

    pub fn inner(&self) -> &WinitWindow {
        &self.inner
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Records a new physical size from the event loop.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn request_redraw(&self) {
        self.inner.request_redraw();
    }

    /// Creates a Vulkan surface for this window.
    ///
    /// The instance must outlive the returned [`Surface`]; the surface
    /// destroys itself on drop through its own copy of the loader.
    pub fn create_surface(&self, entry: &ash::Entry, instance: &ash::Instance) -> Result<Surface> {
        let display = self
            .inner
            .display_handle()
            .map_err(|e| Error::Window(format!("no display handle: {e}")))?;
        let window = self
            .inner
            .window_handle()
            .map_err(|e| Error::Window(format!("no window handle: {e}")))?;

        // SAFETY: both raw handles come from a live winit window, and the
        // entry/instance pair is the one the surface loader below is built
        // from.
        let handle = unsafe {
            ash_window::create_surface(entry, instance, display.as_raw(), window.as_raw(), None)
                .map_err(|e| Error::Surface(e.to_string()))?
        };

        let loader = ash::khr::surface::Instance::new(entry, instance);
        debug!("Vulkan surface created");

        Ok(Surface { handle, loader })
    }
}

/// Owned `vk::SurfaceKHR`, destroyed on drop.
pub struct Surface {
    handle: vk::SurfaceKHR,
    loader: ash::khr::surface::Instance,
}

impl Surface {
    /// Raw surface handle; valid only while this `Surface` is alive.
    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// Surface loader, for capability and present-mode queries.
    #[inline]
    pub fn loader(&self) -> &ash::khr::surface::Instance {
        &self.loader
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        // SAFETY: the handle was created by ash_window::create_surface and
        // is destroyed exactly once, here.
        unsafe {
            self.loader.destroy_surface(self.handle, None);
        }
        debug!("Vulkan surface destroyed");
    }
}
