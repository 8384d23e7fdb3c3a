//! Frame-pacing synchronization objects.
//!
//! One [`FrameSync`] exists per in-flight slot: a semaphore for image
//! acquisition, a semaphore for render completion, and a fence the host
//! waits on before reusing the slot's command buffer.

use std::sync::Arc;

use ash::vk;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Number of frames the CPU may record ahead of the GPU.
///
/// Two slots overlap recording with rendering without piling up latency.
/// Independent of the swapchain image count.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Binary semaphore for queue-to-queue ordering.
pub struct Semaphore {
    device: Arc<Device>,
    handle: vk::Semaphore,
}

impl Semaphore {
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::default();
        let handle = unsafe { device.handle().create_semaphore(&create_info, None)? };
        Ok(Self { device, handle })
    }

    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.handle
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_semaphore(self.handle, None);
        }
    }
}

/// Fence the host waits on to observe submission retirement.
pub struct Fence {
    device: Arc<Device>,
    handle: vk::Fence,
}

impl Fence {
    /// Creates a fence, optionally already signaled.
    ///
    /// A fence that gets waited on before its first arming submission must
    /// start signaled, or that first wait never returns.
    pub fn new(device: Arc<Device>, signaled: bool) -> RhiResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::default().flags(flags);
        let handle = unsafe { device.handle().create_fence(&create_info, None)? };
        Ok(Self { device, handle })
    }

    #[inline]
    pub fn handle(&self) -> vk::Fence {
        self.handle
    }

    /// Blocks until the fence signals or `timeout_ns` elapses (`None` waits
    /// forever).
    ///
    /// # Errors
    ///
    /// An elapsed timeout comes back as [`RhiError::WaitTimeout`], distinct
    /// from device loss and other [`RhiError::Vulkan`] failures, so the
    /// caller can treat it as a skippable frame.
    pub fn wait(&self, timeout_ns: Option<u64>) -> Result<(), RhiError> {
        let timeout = timeout_ns.unwrap_or(u64::MAX);
        match unsafe {
            self.device
                .handle()
                .wait_for_fences(&[self.handle], true, timeout)
        } {
            Ok(()) => Ok(()),
            Err(vk::Result::TIMEOUT) => Err(RhiError::WaitTimeout {
                timeout_ns: timeout,
            }),
            Err(e) => Err(RhiError::Vulkan(e)),
        }
    }

    /// Returns the fence to the unsignaled state. Must not race a pending
    /// submission that signals it.
    pub fn reset(&self) -> Result<(), RhiError> {
        unsafe { self.device.handle().reset_fences(&[self.handle])? };
        Ok(())
    }

    /// Non-blocking signal check.
    pub fn is_signaled(&self) -> bool {
        matches!(
            unsafe { self.device.handle().get_fence_status(self.handle) },
            Ok(true)
        )
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_fence(self.handle, None);
        }
    }
}

/// The synchronization bundle for one in-flight slot.
///
/// Per frame: wait `in_flight_fence`, acquire (signals image-available),
/// reset the fence once submission is certain, submit waiting on
/// image-available and signaling render-finished plus the fence, present
/// waiting on render-finished.
pub struct FrameSync {
    image_available: Semaphore,
    render_finished: Semaphore,
    in_flight: Fence,
}

impl FrameSync {
    /// Creates the slot's semaphores and a signaled fence, so the slot's
    /// first visit does not block.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        Ok(Self {
            image_available: Semaphore::new(device.clone())?,
            render_finished: Semaphore::new(device.clone())?,
            in_flight: Fence::new(device, true)?,
        })
    }

    #[inline]
    pub fn in_flight_fence(&self) -> &Fence {
        &self.in_flight
    }

    #[inline]
    pub fn image_available_handle(&self) -> vk::Semaphore {
        self.image_available.handle()
    }

    #[inline]
    pub fn render_finished_handle(&self) -> vk::Semaphore {
        self.render_finished.handle()
    }

    #[inline]
    pub fn in_flight_fence_handle(&self) -> vk::Fence {
        self.in_flight.handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_frames_in_flight_is_sane() {
        assert!((1..=4).contains(&MAX_FRAMES_IN_FLIGHT));
    }

    #[test]
    fn test_sync_objects_are_send_sync() {
        assert_send_sync::<Semaphore>();
        assert_send_sync::<Fence>();
        assert_send_sync::<FrameSync>();
    }
}
