/// Rows rendered above and below the viewport so fast scrolling does not
/// flash empty space before the next frame.
pub const OVERSCAN_ROWS: usize = 4;

/// Slice of a list that should be materialized, plus the spacer heights that
/// stand in for everything outside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleRange {
    pub start: usize,
    pub end: usize,
    pub top_spacer: f32,
    pub bottom_spacer: f32,
}

impl VisibleRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Computes the materialized row range `[start, end)` for a uniform-height list.
///
/// `viewport_height` and `row_height` are floored at 1 so a collapsed panel or
/// an unmeasured row never divides by zero. `start` never exceeds `end`, which
/// keeps both spacers non-negative when the offset lies past the content.
pub fn visible_range(
    total: usize,
    scroll_top: f32,
    viewport_height: f32,
    row_height: f32,
    overscan: usize,
) -> VisibleRange {
    let row = row_height.max(1.0);
    let viewport = viewport_height.max(1.0);
    let scroll = scroll_top.max(0.0);

    let first_visible = (scroll / row).floor() as usize;
    let last_visible = ((scroll + viewport) / row).ceil() as usize;

    let end = last_visible.saturating_add(overscan).min(total);
    let start = first_visible.saturating_sub(overscan).min(end);

    VisibleRange {
        start,
        end,
        top_spacer: start as f32 * row,
        bottom_spacer: (total - end) as f32 * row,
    }
}
