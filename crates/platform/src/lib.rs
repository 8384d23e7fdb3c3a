//! Platform abstraction layer for the Vulkan renderer.
//!
//! This crate provides platform-specific functionality:
//! - Window management via winit
//! - Raw window handles for Vulkan surface creation
//! - The resize signal shared between the event loop and the frame driver

mod resize;
mod window;

pub use resize::ResizeSignal;
pub use window::{Surface, Window};

// Re-export winit types that users might need
pub use winit::event::WindowEvent;
pub use winit::event_loop::EventLoop;
