//! Pixel-space rectangles
//!
//! Areas use inclusive corner coordinates, matching the rendering
//! library's damage rectangles: `(x1, y1)` through `(x2, y2)`.

/// An inclusive rectangle in window-local pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Area {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Area {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Width in pixels (inclusive corners).
    pub fn width(&self) -> i32 {
        self.x2 - self.x1 + 1
    }

    /// Height in pixels (inclusive corners).
    pub fn height(&self) -> i32 {
        self.y2 - self.y1 + 1
    }

    /// True if no pixel of the area lies inside `[0,width) x [0,height)`.
    pub fn is_outside(&self, width: i32, height: i32) -> bool {
        self.x2 < 0 || self.y2 < 0 || self.x1 > width - 1 || self.y1 > height - 1
    }
}
