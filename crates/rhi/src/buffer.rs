//! Host-visible geometry buffers.
//!
//! Memory comes from gpu-allocator's `CpuToGpu` pool and stays mapped for
//! the buffer's lifetime, so writes are plain memcpys with no staging pass.

use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
}

impl BufferUsage {
    pub fn to_vk_usage(self) -> vk::BufferUsageFlags {
        let base = vk::BufferUsageFlags::TRANSFER_DST;
        match self {
            BufferUsage::Vertex => base | vk::BufferUsageFlags::VERTEX_BUFFER,
            BufferUsage::Index => base | vk::BufferUsageFlags::INDEX_BUFFER,
        }
    }

    pub fn memory_location(self) -> MemoryLocation {
        MemoryLocation::CpuToGpu
    }

    pub fn name(self) -> &'static str {
        match self {
            BufferUsage::Vertex => "vertex",
            BufferUsage::Index => "index",
        }
    }
}

/// A `vk::Buffer` plus its allocation; both released on drop, allocation
/// first.
pub struct Buffer {
    device: Arc<Device>,
    handle: vk::Buffer,
    allocation: Option<Allocation>,
    size: vk::DeviceSize,
    usage: BufferUsage,
}

impl Buffer {
    /// Allocates an empty buffer of `size` bytes.
    ///
    /// # Errors
    ///
    /// Zero-size buffers are rejected; creation and allocation failures
    /// propagate.
    pub fn new(device: Arc<Device>, usage: BufferUsage, size: vk::DeviceSize) -> RhiResult<Self> {
        if size == 0 {
            return Err(RhiError::InvalidHandle("zero-size buffer".into()));
        }

        let create_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage.to_vk_usage())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let handle = unsafe { device.handle().create_buffer(&create_info, None)? };
        let requirements = unsafe { device.handle().get_buffer_memory_requirements(handle) };

        let allocation = device.allocator().lock().unwrap().allocate(
            &AllocationCreateDesc {
                name: usage.name(),
                requirements,
                location: usage.memory_location(),
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            },
        )?;

        unsafe {
            device
                .handle()
                .bind_buffer_memory(handle, allocation.memory(), allocation.offset())?;
        }

        debug!("Allocated {} buffer ({} bytes)", usage.name(), size);

        Ok(Self {
            device,
            handle,
            allocation: Some(allocation),
            size,
            usage,
        })
    }

    /// Allocates a buffer sized to `data` and fills it.
    pub fn new_with_data(device: Arc<Device>, usage: BufferUsage, data: &[u8]) -> RhiResult<Self> {
        let buffer = Self::new(device, usage, data.len() as vk::DeviceSize)?;
        buffer.write_data(0, data)?;
        Ok(buffer)
    }

    /// Copies `data` into the mapped allocation at `offset`.
    ///
    /// # Errors
    ///
    /// Fails when the write would run past the end of the buffer or the
    /// allocation is not host-mapped.
    pub fn write_data(&self, offset: vk::DeviceSize, data: &[u8]) -> RhiResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        if offset + data.len() as vk::DeviceSize > self.size {
            return Err(RhiError::InvalidHandle(format!(
                "write of {} bytes at offset {} overruns {}-byte buffer",
                data.len(),
                offset,
                self.size
            )));
        }

        let mapped = self
            .allocation
            .as_ref()
            .and_then(|a| a.mapped_ptr())
            .ok_or_else(|| RhiError::InvalidHandle("buffer memory not mapped".into()))?;

        // SAFETY: bounds checked above; CpuToGpu allocations stay mapped.
        unsafe {
            let dst = mapped.as_ptr().cast::<u8>().add(offset as usize);
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
        }

        Ok(())
    }

    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.handle
    }

    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take()
            && let Err(e) = self.device.allocator().lock().unwrap().free(allocation)
        {
            tracing::error!("Leaked {} buffer allocation: {:?}", self.usage.name(), e);
        }

        unsafe {
            self.device.handle().destroy_buffer(self.handle, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_flags() {
        let vertex = BufferUsage::Vertex.to_vk_usage();
        assert!(vertex.contains(vk::BufferUsageFlags::VERTEX_BUFFER));
        assert!(vertex.contains(vk::BufferUsageFlags::TRANSFER_DST));

        let index = BufferUsage::Index.to_vk_usage();
        assert!(index.contains(vk::BufferUsageFlags::INDEX_BUFFER));
        assert!(!index.contains(vk::BufferUsageFlags::VERTEX_BUFFER));
    }

    #[test]
    fn test_geometry_buffers_are_host_visible() {
        assert_eq!(
            BufferUsage::Vertex.memory_location(),
            MemoryLocation::CpuToGpu
        );
        assert_eq!(
            BufferUsage::Index.memory_location(),
            MemoryLocation::CpuToGpu
        );
    }

    #[test]
    fn test_usage_names() {
        assert_eq!(BufferUsage::Vertex.name(), "vertex");
        assert_eq!(BufferUsage::Index.name(), "index");
    }
}
