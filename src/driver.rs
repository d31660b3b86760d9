//! Rendering-library-facing driver contract
//!
//! The embedding GUI library registers one [`DisplayDriver`] per
//! display it renders to. The backend materializes a window for the
//! driver on its first draw, takes over the driver's render-complete
//! hook (preserving any callback that was already installed), and
//! feeds input back through the small read structs below.

use crate::window::WindowId;

/// Render-complete hook: `(time_ms, px_rendered)`.
pub type MonitorCallback = Box<dyn FnMut(u32, u32)>;

/// State of a key or button in the generic input model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputState {
    #[default]
    Released,
    Pressed,
}

/// A point in window-local pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Logical key code in the GUI library's input model. Printable ASCII
/// passes through as-is; navigation and editing keys use the control
/// codes below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Key(pub u32);

impl Key {
    pub const NONE: Key = Key(0);
    pub const UP: Key = Key(17);
    pub const DOWN: Key = Key(18);
    pub const RIGHT: Key = Key(19);
    pub const LEFT: Key = Key(20);
    pub const ESC: Key = Key(27);
    pub const DEL: Key = Key(127);
    pub const BACKSPACE: Key = Key(8);
    pub const ENTER: Key = Key(10);
    pub const NEXT: Key = Key(9);
    pub const PREV: Key = Key(11);
    pub const HOME: Key = Key(2);
    pub const END: Key = Key(3);
}

/// One display the rendering library draws into. Created by the
/// embedder; the backend fills in `window` lazily on the first draw.
pub struct DisplayDriver {
    pub hor_res: i32,
    pub ver_res: i32,
    /// Swapped-resolution rendering; the backend only uses this to
    /// size the window.
    pub rotated: bool,
    /// Render-complete callback installed by the embedder. Captured by
    /// the backend when the window is created and invoked from the
    /// frame cycle afterwards.
    pub monitor_cb: Option<MonitorCallback>,
    pub(crate) window: Option<WindowId>,
}

impl DisplayDriver {
    pub fn new(hor_res: i32, ver_res: i32) -> Self {
        Self {
            hor_res,
            ver_res,
            rotated: false,
            monitor_cb: None,
            window: None,
        }
    }

    /// Effective horizontal resolution after rotation.
    pub fn effective_hor_res(&self) -> i32 {
        if self.rotated {
            self.ver_res
        } else {
            self.hor_res
        }
    }

    /// Effective vertical resolution after rotation.
    pub fn effective_ver_res(&self) -> i32 {
        if self.rotated {
            self.hor_res
        } else {
            self.ver_res
        }
    }

    /// The backing window, if one has been materialized.
    pub fn window_id(&self) -> Option<WindowId> {
        self.window
    }
}

/// Pointer position and primary-button state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerData {
    pub point: Point,
    pub state: InputState,
}

/// Wheel-button state and the accumulated discrete scroll delta.
/// Reading the delta consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisData {
    pub state: InputState,
    pub diff: i16,
}

/// Last translated key and its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyData {
    pub key: Key,
    pub state: InputState,
}

/// Single-contact touch position and state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TouchData {
    pub point: Point,
    pub state: InputState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_swaps_resolution() {
        let mut drv = DisplayDriver::new(800, 480);
        assert_eq!(drv.effective_hor_res(), 800);
        assert_eq!(drv.effective_ver_res(), 480);
        drv.rotated = true;
        assert_eq!(drv.effective_hor_res(), 480);
        assert_eq!(drv.effective_ver_res(), 800);
    }
}
