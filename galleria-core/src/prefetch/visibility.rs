use galleria_model::Cursor;

/// Layout of one rendered item along the scroll axis, with the cursor that
/// continues pagination after it.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleItem {
    pub cursor: Cursor,
    pub offset: f64,
    pub extent: f64,
}

impl VisibleItem {
    pub fn new(cursor: Cursor, offset: f64, extent: f64) -> Self {
        Self {
            cursor,
            offset,
            extent,
        }
    }

    /// Share of this item inside `[viewport_start, viewport_start + viewport_extent)`.
    pub fn visible_ratio(&self, viewport_start: f64, viewport_extent: f64) -> f64 {
        if self.extent <= 0.0 {
            return 0.0;
        }
        let start = self.offset.max(viewport_start);
        let end = (self.offset + self.extent).min(viewport_start + viewport_extent);
        ((end - start).max(0.0) / self.extent).min(1.0)
    }
}

/// Cursor of the last rendered item that is at least `min_ratio` inside the
/// viewport, scanning from the most recently rendered item backwards.
pub fn last_visible_cursor(
    rendered: &[VisibleItem],
    viewport_start: f64,
    viewport_extent: f64,
    min_ratio: f64,
) -> Option<&Cursor> {
    rendered
        .iter()
        .rev()
        .find(|item| item.visible_ratio(viewport_start, viewport_extent) >= min_ratio)
        .map(|item| &item.cursor)
}
