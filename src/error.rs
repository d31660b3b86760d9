//! Backend error type
//!
//! Initialization and window construction report structured errors
//! instead of leaving the subsystem silently inert; recoverable
//! conditions (keymap compilation, decoration creation) are logged at
//! their site and never surface here.

use thiserror::Error;

use crate::pixel::ColorDepth;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to connect to the wayland display: {0}")]
    Connect(#[from] wayland_client::ConnectError),

    #[error("wayland dispatch failed: {0}")]
    Dispatch(#[from] wayland_client::DispatchError),

    #[error("wayland connection i/o failed: {0}")]
    Connection(#[from] wayland_client::backend::WaylandError),

    #[error("compositor did not advertise required global '{0}'")]
    MissingGlobal(&'static str),

    #[error("no supported wl_shm format advertised for {0:?}")]
    NoPixelFormat(ColorDepth),

    #[error("no shell protocol available to bind a toplevel")]
    NoShell,

    #[error("XDG_RUNTIME_DIR is not set and no runtime_dir was configured")]
    NoRuntimeDir,

    #[error("shared memory allocation failed: {0}")]
    Shm(#[from] std::io::Error),
}
