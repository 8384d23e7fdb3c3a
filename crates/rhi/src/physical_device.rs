//! GPU enumeration and selection.
//!
//! Candidates must expose a graphics queue family and a family that can
//! present to the target surface. Among those, the highest-scoring device
//! wins, with discrete GPUs weighted far above everything else.

use std::ffi::CStr;

use ash::vk;
use tracing::{debug, info, warn};

use crate::error::RhiError;

/// Graphics and present queue family indices for one device.
///
/// The two often coincide, but nothing guarantees it, so they are resolved
/// independently.
#[derive(Clone, Copy, Debug, Default)]
pub struct QueueFamilyIndices {
    pub graphics_family: Option<u32>,
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    /// Deduplicated family indices, for logical device queue create infos.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = Vec::with_capacity(2);
        if let Some(graphics) = self.graphics_family {
            families.push(graphics);
        }
        if let Some(present) = self.present_family
            && !families.contains(&present)
        {
            families.push(present);
        }
        families
    }

    /// True when graphics and present live in different families, which
    /// forces CONCURRENT sharing on swapchain images.
    #[inline]
    pub fn needs_concurrent_sharing(&self) -> bool {
        self.is_complete() && self.graphics_family != self.present_family
    }
}

/// Selected physical device plus the properties the rest of the crate needs.
#[derive(Clone)]
pub struct PhysicalDeviceInfo {
    pub device: vk::PhysicalDevice,
    pub properties: vk::PhysicalDeviceProperties,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    pub queue_families: QueueFamilyIndices,
}

impl PhysicalDeviceInfo {
    pub fn device_name(&self) -> &str {
        unsafe {
            CStr::from_ptr(self.properties.device_name.as_ptr())
                .to_str()
                .unwrap_or("unknown")
        }
    }

    pub fn device_type_name(&self) -> &'static str {
        match self.properties.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => "discrete",
            vk::PhysicalDeviceType::INTEGRATED_GPU => "integrated",
            vk::PhysicalDeviceType::VIRTUAL_GPU => "virtual",
            vk::PhysicalDeviceType::CPU => "cpu",
            _ => "other",
        }
    }

    pub fn api_version(&self) -> (u32, u32, u32) {
        let v = self.properties.api_version;
        (
            vk::api_version_major(v),
            vk::api_version_minor(v),
            vk::api_version_patch(v),
        )
    }

    /// Total size of all DEVICE_LOCAL heaps, in bytes.
    pub fn device_local_memory(&self) -> u64 {
        self.memory_properties
            .memory_heaps
            .iter()
            .take(self.memory_properties.memory_heap_count as usize)
            .filter(|heap| heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
            .map(|heap| heap.size)
            .sum()
    }
}

impl std::fmt::Debug for PhysicalDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (major, minor, patch) = self.api_version();
        f.debug_struct("PhysicalDeviceInfo")
            .field("name", &self.device_name())
            .field("type", &self.device_type_name())
            .field("api", &format_args!("{major}.{minor}.{patch}"))
            .field("queue_families", &self.queue_families)
            .finish()
    }
}

/// Picks the best GPU that can render and present to `surface`.
///
/// # Errors
///
/// [`RhiError::NoSuitableGpu`] when no device has both required queue
/// families.
pub fn select_physical_device(
    instance: &ash::Instance,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Result<PhysicalDeviceInfo, RhiError> {
    let devices = unsafe { instance.enumerate_physical_devices()? };
    debug!("Enumerated {} physical device(s)", devices.len());

    let best = devices
        .into_iter()
        .filter_map(|device| query_candidate(instance, device, surface, surface_loader))
        .max_by_key(|info| score_device(info));

    match best {
        Some(info) => {
            let (major, minor, patch) = info.api_version();
            info!(
                "Using GPU '{}' ({}, Vulkan {}.{}.{})",
                info.device_name(),
                info.device_type_name(),
                major,
                minor,
                patch
            );
            Ok(info)
        }
        None => {
            warn!("No GPU with graphics and present support found");
            Err(RhiError::NoSuitableGpu)
        }
    }
}

/// Resolves a device's queue families; `None` when it cannot both render
/// and present.
fn query_candidate(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Option<PhysicalDeviceInfo> {
    let properties = unsafe { instance.get_physical_device_properties(device) };
    let memory_properties = unsafe { instance.get_physical_device_memory_properties(device) };
    let queue_families = find_queue_families(instance, device, surface, surface_loader);

    let info = PhysicalDeviceInfo {
        device,
        properties,
        memory_properties,
        queue_families,
    };

    if queue_families.is_complete() {
        debug!(
            "Candidate '{}' ({}), score {}",
            info.device_name(),
            info.device_type_name(),
            score_device(&info)
        );
        Some(info)
    } else {
        debug!(
            "Rejecting '{}': graphics={} present={}",
            info.device_name(),
            queue_families.graphics_family.is_some(),
            queue_families.present_family.is_some()
        );
        None
    }
}

fn find_queue_families(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> QueueFamilyIndices {
    let families = unsafe { instance.get_physical_device_queue_family_properties(device) };
    let mut indices = QueueFamilyIndices::default();

    for (index, family) in families.iter().enumerate() {
        let index = index as u32;
        if family.queue_count == 0 {
            continue;
        }

        if indices.graphics_family.is_none()
            && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        {
            indices.graphics_family = Some(index);
        }

        if indices.present_family.is_none() {
            let can_present = unsafe {
                surface_loader
                    .get_physical_device_surface_support(device, index, surface)
                    .unwrap_or(false)
            };
            if can_present {
                indices.present_family = Some(index);
            }
        }

        if indices.is_complete() {
            break;
        }
    }

    indices
}

/// Device desirability: type dominates, then texture limits and VRAM.
fn score_device(info: &PhysicalDeviceInfo) -> u32 {
    let type_score = match info.properties.device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 10_000,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 1_000,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 100,
        vk::PhysicalDeviceType::CPU => 10,
        _ => 1,
    };

    let vram_mb = (info.device_local_memory() / (1024 * 1024)) as u32;

    type_score + info.properties.limits.max_image_dimension2_d + vram_mb.min(16_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_indices_incomplete() {
        assert!(!QueueFamilyIndices::default().is_complete());
    }

    #[test]
    fn test_complete_requires_both_families() {
        let both = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(0),
        };
        assert!(both.is_complete());

        let graphics_only = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: None,
        };
        assert!(!graphics_only.is_complete());

        let present_only = QueueFamilyIndices {
            graphics_family: None,
            present_family: Some(1),
        };
        assert!(!present_only.is_complete());
    }

    #[test]
    fn test_unique_families_deduplicates() {
        let shared = QueueFamilyIndices {
            graphics_family: Some(2),
            present_family: Some(2),
        };
        assert_eq!(shared.unique_families(), vec![2]);
        assert!(!shared.needs_concurrent_sharing());
    }

    #[test]
    fn test_split_families_need_concurrent_sharing() {
        let split = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(1),
        };
        assert_eq!(split.unique_families(), vec![0, 1]);
        assert!(split.needs_concurrent_sharing());
    }
}
