//! Logical device, queues, and the GPU allocator.

use std::sync::{Arc, Mutex};

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use tracing::{debug, info};

use crate::error::RhiError;
use crate::instance::Instance;
use crate::physical_device::{PhysicalDeviceInfo, QueueFamilyIndices};

const DEVICE_EXTENSIONS: &[&std::ffi::CStr] = &[ash::khr::swapchain::NAME];

/// What a queue is used for.
///
/// Call sites name the role they need instead of carrying family indices
/// around, so a queue that was never retrieved cannot be asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueueRole {
    Graphics,
    Present,
}

/// Queue handles fetched once at device creation. When one family serves
/// both roles, both fields hold the same `vk::Queue`.
#[derive(Clone, Copy, Debug)]
pub struct Queues {
    graphics: vk::Queue,
    present: vk::Queue,
}

impl Queues {
    #[inline]
    pub fn get(&self, role: QueueRole) -> vk::Queue {
        match role {
            QueueRole::Graphics => self.graphics,
            QueueRole::Present => self.present,
        }
    }
}

/// Shared logical device.
///
/// Handed around as `Arc<Device>`; the allocator sits behind a `Mutex` so
/// buffer creation can happen from any thread.
pub struct Device {
    device: ash::Device,
    physical_device: vk::PhysicalDevice,
    allocator: Mutex<Allocator>,
    queues: Queues,
    queue_families: QueueFamilyIndices,
}

impl Device {
    /// Creates the logical device with one queue per unique family, enables
    /// the swapchain extension, and brings up the allocator.
    pub fn new(
        instance: &Instance,
        physical_device_info: &PhysicalDeviceInfo,
    ) -> Result<Arc<Self>, RhiError> {
        let queue_families = &physical_device_info.queue_families;
        let unique_families = queue_families.unique_families();
        let priorities = [1.0f32];

        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
            })
            .collect();

        let features = vk::PhysicalDeviceFeatures::default();
        let extension_names: Vec<*const i8> =
            DEVICE_EXTENSIONS.iter().map(|ext| ext.as_ptr()).collect();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&features);

        let device = unsafe {
            instance
                .handle()
                .create_device(physical_device_info.device, &create_info, None)?
        };

        // Selection only returns devices with complete families
        let graphics_family = queue_families.graphics_family.unwrap();
        let present_family = queue_families.present_family.unwrap();
        let queues = Queues {
            graphics: unsafe { device.get_device_queue(graphics_family, 0) },
            present: unsafe { device.get_device_queue(present_family, 0) },
        };
        debug!(
            graphics_family,
            present_family, "Logical device created, queues retrieved"
        );

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.handle().clone(),
            device: device.clone(),
            physical_device: physical_device_info.device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })?;

        Ok(Arc::new(Self {
            device,
            physical_device: physical_device_info.device,
            allocator: Mutex::new(allocator),
            queues,
            queue_families: physical_device_info.queue_families,
        }))
    }

    #[inline]
    pub fn handle(&self) -> &ash::Device {
        &self.device
    }

    #[inline]
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    #[inline]
    pub fn queue(&self, role: QueueRole) -> vk::Queue {
        self.queues.get(role)
    }

    #[inline]
    pub fn queue_families(&self) -> &QueueFamilyIndices {
        &self.queue_families
    }

    #[inline]
    pub fn allocator(&self) -> &Mutex<Allocator> {
        &self.allocator
    }

    /// Blocks until every queue on the device drains. Used before teardown
    /// and swapchain recreation.
    pub fn wait_idle(&self) -> Result<(), RhiError> {
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }

    /// Submits to the graphics queue, arming `fence` on completion.
    ///
    /// A rejected submission maps to [`RhiError::Submission`], which the
    /// frame driver treats as fatal.
    ///
    /// # Safety
    ///
    /// Command buffers must be fully recorded, the fence unsignaled and not
    /// in use, and all semaphores in the submit infos valid.
    pub unsafe fn submit_graphics(
        &self,
        submit_infos: &[vk::SubmitInfo],
        fence: vk::Fence,
    ) -> Result<(), RhiError> {
        unsafe {
            self.device
                .queue_submit(self.queues.graphics, submit_infos, fence)
                .map_err(RhiError::Submission)?;
        }
        Ok(())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                tracing::error!("device_wait_idle failed in drop: {:?}", e);
            }
            // Allocator drops with the Mutex; owners must have freed their
            // allocations already
            self.device.destroy_device(None);
        }
        info!("Logical device destroyed");
    }
}

// SAFETY: ash::Device is Send+Sync, the raw handles are plain u64s, and
// the allocator is Mutex-guarded.
unsafe impl Send for Device {}
unsafe impl Sync for Device {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swapchain_extension_required() {
        assert!(DEVICE_EXTENSIONS.contains(&ash::khr::swapchain::NAME));
    }

    #[test]
    fn test_queue_role_lookup() {
        let queues = Queues {
            graphics: vk::Queue::null(),
            present: vk::Queue::null(),
        };
        assert_eq!(queues.get(QueueRole::Graphics), vk::Queue::null());
        assert_eq!(queues.get(QueueRole::Present), vk::Queue::null());
    }

    #[test]
    fn test_device_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Device>();
    }
}
