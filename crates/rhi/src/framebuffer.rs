//! Framebuffer management.
//!
//! One framebuffer per swapchain image, binding that image's view to the
//! forward render pass. The whole set is dropped and rebuilt whenever the
//! swapchain is recreated.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::render_pass::RenderPass;
use crate::swapchain::Swapchain;

/// RAII wrapper for a single framebuffer.
pub struct Framebuffer {
    device: Arc<Device>,
    framebuffer: vk::Framebuffer,
}

impl Framebuffer {
    /// Creates a framebuffer binding the given attachments to a render pass.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::ResourceCreation`] if framebuffer creation fails.
    pub fn new(
        device: Arc<Device>,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> RhiResult<Self> {
        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe {
            device
                .handle()
                .create_framebuffer(&create_info, None)
                .map_err(|e| RhiError::resource("framebuffer", e))?
        };

        Ok(Self {
            device,
            framebuffer,
        })
    }

    /// Creates one framebuffer per swapchain image view.
    ///
    /// # Errors
    ///
    /// Returns an error if any framebuffer creation fails; already-created
    /// framebuffers are released by their Drop impls.
    pub fn for_swapchain(
        device: &Arc<Device>,
        render_pass: &RenderPass,
        swapchain: &Swapchain,
    ) -> RhiResult<Vec<Self>> {
        let extent = swapchain.extent();
        let framebuffers = swapchain
            .image_views()
            .iter()
            .map(|&view| Self::new(device.clone(), render_pass.handle(), &[view], extent))
            .collect::<RhiResult<Vec<_>>>()?;

        debug!(
            "Created {} framebuffers at {}x{}",
            framebuffers.len(),
            extent.width,
            extent.height
        );

        Ok(framebuffers)
    }

    /// Returns the Vulkan framebuffer handle.
    #[inline]
    pub fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_framebuffer(self.framebuffer, None);
        }
    }
}
