//! Hit-testing primitives for drop-target resolution.

/// A normalized pointer sample in board coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned region of a drop target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }

    /// Clip this rect vertically to a scrollable ancestor's visible band.
    /// Returns `None` when nothing visible remains.
    pub fn clip_vertical(&self, top: f64, bottom: f64) -> Option<Rect> {
        let clipped = Rect {
            left: self.left,
            top: self.top.max(top),
            right: self.right,
            bottom: self.bottom.min(bottom),
        };
        (clipped.height() > 0.0).then_some(clipped)
    }
}

/// Visible vertical band of a scrollable ancestor. Targets inside a
/// scrolling panel are only hittable within this band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollBounds {
    pub top: f64,
    pub bottom: f64,
}
