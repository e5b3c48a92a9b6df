//! Caller-supplied output records and render viewports
//!
//! Coordinate queries write into these records instead of returning new
//! values, so a host can reuse one record across many calls.

/// Page size in points, truncated to integers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

/// Device-space point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Rectangle with float edges.
///
/// Page-space rectangles have `top > bottom`; device-space rectangles
/// produced by [`crate::Bridge::map_rect_to_device`] have `top < bottom`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RectF {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl RectF {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Width of the rectangle.
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Height of the rectangle (absolute, independent of axis direction).
    pub fn height(&self) -> f32 {
        (self.top - self.bottom).abs()
    }
}

/// Destination area of a render or coordinate mapping, in device pixels.
///
/// `x`/`y` may be negative and `width`/`height` may exceed the target
/// surface; the renderer clips where it writes pixels itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}
