//! Dropdown placement relative to the caret.
//!
//! The box opens below the caret and flips above it when it would overflow
//! the bottom of the viewport and there is room above. Horizontally it is
//! shifted left to stay inside the viewport.

use crate::{DropdownView, render_lines};
use core_text::Rect;

pub const DROPDOWN_GAP: f32 = 4.0;
pub const ROW_HEIGHT: f32 = 24.0;
pub const MIN_WIDTH: f32 = 240.0;
pub const MAX_WIDTH: f32 = 480.0;
const TEXT_CHAR_WIDTH: f32 = 7.0;
const PADDING: f32 = 8.0;

/// Pixel size `(width, height)` of the rendered view.
pub fn measure(view: &DropdownView) -> (f32, f32) {
    let lines = render_lines(view);
    let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let width = (widest as f32 * TEXT_CHAR_WIDTH + 2.0 * PADDING).clamp(MIN_WIDTH, MAX_WIDTH);
    let height = lines.len().max(1) as f32 * ROW_HEIGHT + 2.0 * PADDING;
    (width, height)
}

pub fn place(anchor: Rect, size: (f32, f32), viewport: Rect) -> Rect {
    let (w, h) = size;
    let max_x = (viewport.right() - w).max(viewport.x);
    let x = anchor.x.clamp(viewport.x, max_x);
    let below = anchor.bottom() + DROPDOWN_GAP;
    let above = anchor.y - DROPDOWN_GAP - h;
    let y = if below + h > viewport.bottom() && above >= viewport.y {
        above
    } else {
        below
    };
    Rect::new(x, y, w, h)
}
