//! Frame driver.
//!
//! [`Renderer`] owns the full Vulkan resource chain and runs the per-frame
//! loop: wait for the current slot's fence, acquire a swapchain image,
//! record and submit the frame, present, advance the slot. Swapchain
//! rebuilds are triggered by resize notifications and by out-of-date or
//! suboptimal reports from acquire and present.
//!
//! # Resource Destruction Order
//!
//! Vulkan resources are torn down in reverse creation order:
//! 1. Wait for all GPU work to complete
//! 2. Per-slot sync objects and command pool
//! 3. Vertex buffer
//! 4. Pipeline and pipeline layout
//! 5. Framebuffers, render pass
//! 6. Swapchain
//! 7. Surface
//! 8. Device (last Arc reference released here)
//! 9. Instance
//!
//! ManuallyDrop pins this order regardless of field declaration order.

use std::mem::ManuallyDrop;
use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::{debug, error, info, warn};

use glint_core::{PresentPreference, RendererConfig};
use glint_platform::{ResizeSignal, Surface, Window};
use glint_rhi::buffer::{Buffer, BufferUsage};
use glint_rhi::command::{CommandBuffer, CommandPool};
use glint_rhi::device::{Device, QueueRole};
use glint_rhi::framebuffer::Framebuffer;
use glint_rhi::instance::Instance;
use glint_rhi::physical_device::select_physical_device;
use glint_rhi::pipeline::{CullMode, GraphicsPipelineBuilder, Pipeline, PipelineLayout};
use glint_rhi::render_pass::RenderPass;
use glint_rhi::shader::{Shader, ShaderStage};
use glint_rhi::swapchain::Swapchain;
use glint_rhi::sync::{FrameSync, MAX_FRAMES_IN_FLIGHT};
use glint_rhi::vertex::{TRIANGLE, Vertex};
use glint_rhi::{RhiError, RhiResult};

use crate::frame::FramePacer;

/// Compiled shader locations, relative to the working directory.
const VERTEX_SHADER_PATH: &str = "shaders/spirv/triangle.vert.spv";
const FRAGMENT_SHADER_PATH: &str = "shaders/spirv/triangle.frag.spv";

/// Background clear color (dark blue-gray).
const CLEAR_COLOR: [f32; 4] = [0.1, 0.1, 0.15, 1.0];

/// Maps the configured present preference to the Vulkan mode handed to
/// swapchain creation. Unsupported modes fall back inside the swapchain.
pub fn present_mode_from_preference(preference: PresentPreference) -> vk::PresentModeKHR {
    match preference {
        PresentPreference::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentPreference::Fifo => vk::PresentModeKHR::FIFO,
        PresentPreference::Immediate => vk::PresentModeKHR::IMMEDIATE,
    }
}

/// Main renderer that owns all Vulkan resources and drives frames.
pub struct Renderer {
    /// Vulkan instance (destroyed last).
    instance: ManuallyDrop<Instance>,
    /// Logical device, shared with every RHI object. The renderer holds the
    /// last strong reference and releases it before the instance.
    device: ManuallyDrop<Arc<Device>>,
    /// Window surface (destroyed after swapchain, before instance).
    surface: ManuallyDrop<Surface>,
    /// Swapchain (destroyed after framebuffers).
    swapchain: ManuallyDrop<Swapchain>,
    /// Forward render pass.
    render_pass: ManuallyDrop<RenderPass>,
    /// One framebuffer per swapchain image; rebuilt with the swapchain.
    framebuffers: Vec<Framebuffer>,
    /// Triangle pipeline.
    pipeline: ManuallyDrop<Pipeline>,
    /// Triangle pipeline layout.
    pipeline_layout: ManuallyDrop<PipelineLayout>,
    /// Triangle vertex buffer.
    vertex_buffer: ManuallyDrop<Buffer>,
    /// Command pool for the graphics family.
    command_pool: ManuallyDrop<CommandPool>,
    /// One command buffer per in-flight slot, re-recorded each visit.
    command_buffers: Vec<CommandBuffer>,
    /// Per-slot synchronization objects.
    frame_syncs: Vec<FrameSync>,
    /// Slot cycling and per-image slot records.
    pacer: FramePacer,
    /// Resize notifications from the window thread.
    resize: ResizeSignal,
    /// Optional fence wait timeout; a timed-out frame is skipped.
    fence_timeout_ns: Option<u64>,
    /// Current window width.
    width: u32,
    /// Current window height.
    height: u32,
}

impl Renderer {
    /// Creates a renderer for the given window.
    ///
    /// # Errors
    ///
    /// Returns an error if any Vulkan resource creation fails.
    pub fn new(
        window: &Window,
        config: &RendererConfig,
        resize: ResizeSignal,
    ) -> RhiResult<Self> {
        let width = window.width();
        let height = window.height();

        info!("Initializing Vulkan renderer ({}x{})", width, height);

        let instance = Instance::new(config.validation)?;

        let surface = window
            .create_surface(instance.entry(), instance.handle())
            .map_err(|e| RhiError::Surface(e.to_string()))?;

        let physical_device_info =
            select_physical_device(instance.handle(), surface.handle(), surface.loader())?;

        let device = Device::new(&instance, &physical_device_info)?;

        let preferred_present_mode = present_mode_from_preference(config.present_preference);
        let swapchain = Swapchain::new(
            &instance,
            device.clone(),
            surface.handle(),
            width,
            height,
            preferred_present_mode,
        )?;

        let render_pass = RenderPass::new_forward(device.clone(), swapchain.format())?;
        let framebuffers = Framebuffer::for_swapchain(&device, &render_pass, &swapchain)?;

        let (pipeline, pipeline_layout) =
            Self::create_triangle_pipeline(device.clone(), &render_pass)?;

        let vertex_buffer = Buffer::new_with_data(
            device.clone(),
            BufferUsage::Vertex,
            bytemuck::cast_slice(&TRIANGLE),
        )?;

        let graphics_family = device.queue_families().graphics_family.unwrap();
        let command_pool = CommandPool::new(device.clone(), graphics_family)?;
        let command_buffers = command_pool
            .allocate_command_buffers(MAX_FRAMES_IN_FLIGHT as u32)?
            .into_iter()
            .map(|handle| CommandBuffer::from_handle(device.clone(), handle))
            .collect();

        let frame_syncs = (0..MAX_FRAMES_IN_FLIGHT)
            .map(|_| FrameSync::new(device.clone()))
            .collect::<RhiResult<Vec<_>>>()?;

        let pacer = FramePacer::new(swapchain.image_count());

        info!(
            "Renderer initialized: {} swapchain images, {} frames in flight",
            swapchain.image_count(),
            MAX_FRAMES_IN_FLIGHT
        );

        Ok(Self {
            instance: ManuallyDrop::new(instance),
            device: ManuallyDrop::new(device),
            surface: ManuallyDrop::new(surface),
            swapchain: ManuallyDrop::new(swapchain),
            render_pass: ManuallyDrop::new(render_pass),
            framebuffers,
            pipeline: ManuallyDrop::new(pipeline),
            pipeline_layout: ManuallyDrop::new(pipeline_layout),
            vertex_buffer: ManuallyDrop::new(vertex_buffer),
            command_pool: ManuallyDrop::new(command_pool),
            command_buffers,
            frame_syncs,
            pacer,
            resize,
            fence_timeout_ns: config.fence_timeout_ns,
            width,
            height,
        })
    }

    /// Creates the triangle pipeline against the forward render pass.
    fn create_triangle_pipeline(
        device: Arc<Device>,
        render_pass: &RenderPass,
    ) -> RhiResult<(Pipeline, PipelineLayout)> {
        let vertex_shader = Shader::from_spirv_file(
            device.clone(),
            Path::new(VERTEX_SHADER_PATH),
            ShaderStage::Vertex,
            "main",
        )?;

        let fragment_shader = Shader::from_spirv_file(
            device.clone(),
            Path::new(FRAGMENT_SHADER_PATH),
            ShaderStage::Fragment,
            "main",
        )?;

        let pipeline_layout = PipelineLayout::new(device.clone(), &[], &[])?;

        let pipeline = GraphicsPipelineBuilder::new()
            .vertex_shader(&vertex_shader)
            .fragment_shader(&fragment_shader)
            .vertex_binding(Vertex::binding_description())
            .vertex_attributes(&Vertex::attribute_descriptions())
            .cull_mode(CullMode::Back)
            .render_pass(render_pass.handle(), 0)
            .build(device, &pipeline_layout)?;

        Ok((pipeline, pipeline_layout))
    }

    /// Renders one frame.
    ///
    /// A pending resize is applied before the frame. A fence wait that
    /// exceeds the configured timeout skips the frame without advancing the
    /// slot; out-of-date and suboptimal swapchains trigger a rebuild.
    ///
    /// # Errors
    ///
    /// Returns an error for genuine Vulkan failures; recoverable swapchain
    /// conditions are absorbed.
    pub fn render_frame(&mut self) -> RhiResult<()> {
        // Coalesced resize delivery; only the latest size matters.
        if let Some((width, height)) = self.resize.take() {
            debug!("Resize pending: {}x{}", width, height);
            self.width = width;
            self.height = height;
            self.rebuild_swapchain()?;
        }

        // A minimized window has a zero extent; nothing to render.
        if self.width == 0 || self.height == 0 {
            return Ok(());
        }

        let slot = self.pacer.current_slot();

        // Wait for this slot's previous submission to retire.
        match self.frame_syncs[slot].in_flight_fence().wait(self.fence_timeout_ns) {
            Ok(()) => {}
            Err(RhiError::WaitTimeout { timeout_ns }) => {
                warn!(
                    "Slot {} fence wait timed out after {} ns, skipping frame",
                    slot, timeout_ns
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        let acquire_semaphore = self.frame_syncs[slot].image_available_handle();

        let (image_index, suboptimal_on_acquire) =
            match self.swapchain.acquire_next_image(acquire_semaphore) {
                Ok(result) => result,
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    debug!("Swapchain out of date on acquire, rebuilding");
                    self.rebuild_swapchain()?;
                    // Nothing was submitted, but the iteration still counts.
                    self.pacer.advance();
                    return Ok(());
                }
                Err(e) => return Err(RhiError::Vulkan(e)),
            };

        // If another slot's submission still targets this image, wait it out
        // before overwriting.
        if let Some(last_slot) = self.pacer.last_slot_for_image(image_index as usize)
            && last_slot != slot
        {
            self.frame_syncs[last_slot].in_flight_fence().wait(None)?;
        }
        self.pacer.record_image_use(image_index as usize);

        // Reset only once submission is certain; an early return above must
        // leave the fence signaled or the next wait deadlocks.
        self.frame_syncs[slot].in_flight_fence().reset()?;

        self.record_commands(slot, image_index)?;

        let wait_semaphores = [acquire_semaphore];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [self.frame_syncs[slot].render_finished_handle()];
        let command_buffers = [self.command_buffers[slot].handle()];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device
                .submit_graphics(&[submit_info], self.frame_syncs[slot].in_flight_fence_handle())?;
        }

        let present_result = self.swapchain.present(
            self.device.queue(QueueRole::Present),
            image_index,
            self.frame_syncs[slot].render_finished_handle(),
        );

        let needs_rebuild = match present_result {
            Ok(suboptimal) => {
                if suboptimal {
                    debug!("Present reported suboptimal swapchain");
                }
                suboptimal || suboptimal_on_acquire
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                debug!("Swapchain out of date on present");
                true
            }
            Err(e) => return Err(RhiError::Present(e)),
        };

        self.pacer.advance();

        if needs_rebuild {
            self.rebuild_swapchain()?;
        }

        Ok(())
    }

    /// Records the frame's commands into the slot's command buffer.
    fn record_commands(&self, slot: usize, image_index: u32) -> RhiResult<()> {
        let cmd = &self.command_buffers[slot];
        let extent = self.swapchain.extent();

        cmd.reset()?;
        cmd.begin()?;

        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: CLEAR_COLOR,
            },
        }];

        cmd.begin_render_pass(
            self.render_pass.handle(),
            self.framebuffers[image_index as usize].handle(),
            extent,
            &clear_values,
        );

        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        cmd.set_viewport(&viewport);

        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        cmd.set_scissor(&scissor);

        cmd.bind_pipeline(self.pipeline.bind_point(), self.pipeline.handle());
        cmd.bind_vertex_buffers(0, &[self.vertex_buffer.handle()], &[0]);
        cmd.draw(TRIANGLE.len() as u32, 1, 0, 0);

        cmd.end_render_pass();
        cmd.end()?;

        Ok(())
    }

    /// Rebuilds the swapchain and its dependents for the current size.
    ///
    /// Framebuffers are recreated against the new image views and the
    /// pacer's per-image records are cleared. A zero-sized window defers
    /// the rebuild to the next non-zero resize.
    fn rebuild_swapchain(&mut self) -> RhiResult<()> {
        if self.width == 0 || self.height == 0 {
            debug!("Skipping swapchain rebuild at zero extent");
            return Ok(());
        }

        // Up to MAX_FRAMES_IN_FLIGHT submissions may still be executing
        // render passes that target the old framebuffers. Drain the device
        // before any of them are destroyed.
        self.device.wait_idle()?;
        self.framebuffers.clear();

        self.swapchain.recreate(
            &self.instance,
            self.surface.handle(),
            self.width,
            self.height,
        )?;

        self.framebuffers =
            Framebuffer::for_swapchain(&self.device, &self.render_pass, &self.swapchain)?;

        self.pacer.reset_images(self.swapchain.image_count());

        Ok(())
    }

    /// Returns the current swapchain extent.
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    /// Returns the swapchain format.
    pub fn format(&self) -> vk::Format {
        self.swapchain.format()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            error!(
                "Failed to wait for device idle during renderer drop: {:?}",
                e
            );
        }

        // Command buffers are freed with the pool.
        self.command_buffers.clear();
        self.frame_syncs.clear();
        self.framebuffers.clear();

        unsafe {
            ManuallyDrop::drop(&mut self.command_pool);
            ManuallyDrop::drop(&mut self.vertex_buffer);
            ManuallyDrop::drop(&mut self.pipeline);
            ManuallyDrop::drop(&mut self.pipeline_layout);
            ManuallyDrop::drop(&mut self.render_pass);
            ManuallyDrop::drop(&mut self.swapchain);
            ManuallyDrop::drop(&mut self.surface);
            // Every RHI object holding a device clone is gone by now, so
            // this releases the last reference and destroys the device
            // while the instance is still alive.
            debug_assert_eq!(Arc::strong_count(&self.device), 1);
            ManuallyDrop::drop(&mut self.device);
            ManuallyDrop::drop(&mut self.instance);
        }

        info!("Renderer destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_mode_mapping() {
        assert_eq!(
            present_mode_from_preference(PresentPreference::Mailbox),
            vk::PresentModeKHR::MAILBOX
        );
        assert_eq!(
            present_mode_from_preference(PresentPreference::Fifo),
            vk::PresentModeKHR::FIFO
        );
        assert_eq!(
            present_mode_from_preference(PresentPreference::Immediate),
            vk::PresentModeKHR::IMMEDIATE
        );
    }
}
