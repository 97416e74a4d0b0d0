//! Page-space rectangles used for caret anchoring and dropdown placement.

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// True when either dimension is at most `limit` (hidden proxy inputs).
    pub fn is_degenerate(&self, limit: f32) -> bool {
        self.width <= limit || self.height <= limit
    }
}
