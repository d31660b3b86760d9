//! # Waybridge
//!
//! Wayland display and input backend for an embedded retained-mode
//! GUI library. The rendering library draws into shared-memory
//! framebuffers; this crate turns those frames into Wayland surfaces
//! and routes seat input back into the library's input model.
//!
//! ## Architecture
//!
//! - `backend`: connection, global verification and the frame cycle
//!   coordinator
//! - `registry`: global discovery and binding
//! - `window`: window lifecycle, shm pool and the frame barrier
//! - `shell`: xdg-shell / wl_shell toplevel abstraction
//! - `seat`: pointer, keyboard and touch routing; keymap translation
//! - `decoration`: client-side title bar and buttons
//! - `pixel`: color depths, wl_shm format negotiation, blitting
//! - `driver`: the contract the rendering library programs against
//! - `config`: file- and environment-driven configuration
//!
//! ## Usage
//!
//! ```rust,no_run
//! use waybridge::{Backend, BackendConfig, DisplayDriver};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut backend = Backend::new(BackendConfig::from_env())?;
//!     let mut driver = DisplayDriver::new(800, 480);
//!     // Hand `backend.draw(..)` / `backend.render_complete(..)` to
//!     // the rendering library's flush hooks.
//!     # let _ = (&mut backend, &mut driver);
//!     Ok(())
//! }
//! ```

pub mod area;
pub mod backend;
pub mod config;
pub mod decoration;
pub mod driver;
pub mod error;
pub mod pixel;
pub mod registry;
pub mod seat;
pub mod shell;
pub mod shm;
pub mod window;

// Re-export the types an embedder touches directly.
pub use area::Area;
pub use backend::Backend;
pub use config::BackendConfig;
pub use driver::{
    AxisData, DisplayDriver, InputState, Key, KeyData, MonitorCallback, Point, PointerData,
    TouchData,
};
pub use error::BackendError;
pub use pixel::{ColorDepth, Rgba};
pub use window::WindowId;

/// Version information for the backend.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
