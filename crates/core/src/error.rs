//! Application-facing error type.
//!
//! Vulkan-layer failures have their own taxonomy in the RHI crate; this one
//! covers the windowing, configuration, and IO paths above it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("window: {0}")]
    Window(String),

    #[error("surface: {0}")]
    Surface(String),

    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
