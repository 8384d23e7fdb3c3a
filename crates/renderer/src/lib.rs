//! Frame driver and pacing.
//!
//! This crate orchestrates rendering on top of the RHI:
//! - [`Renderer`] owns the Vulkan resource chain and renders frames
//! - [`FramePacer`] cycles in-flight slots and tracks image reuse

pub mod frame;
pub mod renderer;

pub use frame::FramePacer;
pub use renderer::Renderer;
