//! RHI-specific error types.
//!
//! Recoverable swapchain conditions (out-of-date, suboptimal) are not errors:
//! they are reported through the acquire/present return values and handled
//! inside the frame driver. Everything here is a genuine failure.

use thiserror::Error;

/// RHI-specific error type.
#[derive(Error, Debug)]
pub enum RhiError {
    /// Vulkan API error
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] ash::vk::Result),

    /// Failed to load Vulkan library
    #[error("Failed to load Vulkan: {0}")]
    Loading(#[from] ash::LoadingError),

    /// GPU allocator error
    #[error("Allocator error: {0}")]
    Allocator(#[from] gpu_allocator::AllocationError),

    /// No suitable GPU found
    #[error("No suitable GPU found")]
    NoSuitableGpu,

    /// Device-level resource creation failure (views, framebuffers, pools, ...)
    #[error("Failed to create {resource}: {result}")]
    ResourceCreation {
        resource: &'static str,
        result: ash::vk::Result,
    },

    /// The graphics queue rejected a submission. Fatal for the frame driver.
    #[error("Queue submission failed: {0}")]
    Submission(ash::vk::Result),

    /// Presentation failed with something other than out-of-date/suboptimal.
    #[error("Presentation failed: {0}")]
    Present(ash::vk::Result),

    /// A fence wait exceeded the configured timeout.
    #[error("Fence wait timed out after {timeout_ns} ns")]
    WaitTimeout { timeout_ns: u64 },

    /// Surface query or creation error
    #[error("Surface error: {0}")]
    Surface(String),

    /// Shader loading error
    #[error("Shader error: {0}")]
    Shader(String),

    /// Pipeline configuration or creation error
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// Invalid handle or buffer state
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),
}

impl RhiError {
    /// Wrap a `vk::Result` from a named resource-creation call.
    pub fn resource(resource: &'static str, result: ash::vk::Result) -> Self {
        Self::ResourceCreation { resource, result }
    }
}

/// Result type alias for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vk_result_conversion() {
        let err: RhiError = ash::vk::Result::ERROR_DEVICE_LOST.into();
        assert!(matches!(err, RhiError::Vulkan(_)));
    }

    #[test]
    fn test_resource_creation_display() {
        let err = RhiError::resource("framebuffer", ash::vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        let msg = err.to_string();
        assert!(msg.contains("framebuffer"));
    }

    #[test]
    fn test_wait_timeout_display() {
        let err = RhiError::WaitTimeout { timeout_ns: 5_000 };
        assert!(err.to_string().contains("5000"));
    }
}
