//! Grid placement: pointer-to-cell mapping for panel drags and live
//! fractional track resizing.
//!
//! Tracks are proportional weights, not pixels; a pointer maps to the
//! track whose cumulative weight fraction first exceeds the pointer's
//! relative position.

use crate::store::{GridPatch, GridSpec, Panel};

use super::geometry::{Point, Rect};

/// Floor for any single track weight during divider drags.
pub const MIN_TRACK_WEIGHT: f64 = 0.3;

/// Map a relative fraction (0..1) onto a track index by walking
/// cumulative weights. Pointers beyond the last boundary clamp to the
/// last track.
fn track_at(fraction: f64, sizes: &[f64]) -> u32 {
    let total: f64 = sizes.iter().sum();
    if total <= 0.0 || sizes.is_empty() {
        return 0;
    }
    let mut acc = 0.0;
    for (i, size) in sizes.iter().enumerate() {
        acc += size;
        if fraction < acc / total {
            return i as u32;
        }
    }
    (sizes.len() - 1) as u32
}

/// Map a pointer inside the grid's rect to `(row, col)`.
pub fn cell_at(pointer: Point, grid_rect: Rect, grid: &GridSpec) -> (u32, u32) {
    let rel_x = (pointer.x - grid_rect.left) / grid_rect.width().max(1.0);
    let rel_y = (pointer.y - grid_rect.top) / grid_rect.height().max(1.0);
    let row = track_at(rel_y, &grid.effective_row_sizes());
    let col = track_at(rel_x, &grid.effective_col_sizes());
    (row, col)
}

/// Final placement for a released panel drag: origin clamped into the
/// grid, span clamped so the panel never extends past the grid edge.
/// A degenerate grid (zero rows or columns) is treated as 1×1.
pub fn place_panel(panel: &Panel, row: u32, col: u32, grid: &GridSpec) -> Panel {
    let rows = grid.rows.max(1);
    let cols = grid.cols.max(1);
    let mut placed = panel.clone();
    placed.row = row.min(rows - 1);
    placed.col = col.min(cols - 1);
    placed.height = placed.height.clamp(1, rows - placed.row);
    placed.width = placed.width.clamp(1, cols - placed.col);
    placed
}

/// Redistribute weight between track `index` and its right/lower
/// neighbor for a divider dragged by `delta_px` across a span of
/// `span_px` pixels. Both tracks are floor-clamped independently.
pub fn resize_tracks(sizes: &mut [f64], index: usize, delta_px: f64, span_px: f64) {
    let next = index + 1;
    if next >= sizes.len() {
        return;
    }
    let total: f64 = sizes.iter().sum();
    let fr_delta = (delta_px / span_px.max(1.0)) * total;
    sizes[index] = (sizes[index] + fr_delta).max(MIN_TRACK_WEIGHT);
    sizes[next] = (sizes[next] - fr_delta).max(MIN_TRACK_WEIGHT);
}

/// One continuous divider-drag gesture.
///
/// Pointer-moves mutate the working weights locally; the new weights are
/// emitted exactly once, on gesture end, so the transport is not flooded
/// with per-move grid updates.
#[derive(Debug, Clone)]
pub struct TrackResizeSession {
    row_sizes: Vec<f64>,
    col_sizes: Vec<f64>,
    rows_dirty: bool,
    cols_dirty: bool,
}

impl TrackResizeSession {
    pub fn begin(grid: &GridSpec) -> Self {
        Self {
            row_sizes: grid.effective_row_sizes(),
            col_sizes: grid.effective_col_sizes(),
            rows_dirty: false,
            cols_dirty: false,
        }
    }

    /// Current working weights, for live rendering.
    pub fn row_sizes(&self) -> &[f64] {
        &self.row_sizes
    }

    pub fn col_sizes(&self) -> &[f64] {
        &self.col_sizes
    }

    pub fn drag_row_divider(&mut self, index: usize, delta_px: f64, grid_height_px: f64) {
        resize_tracks(&mut self.row_sizes, index, delta_px, grid_height_px);
        self.rows_dirty = true;
    }

    pub fn drag_col_divider(&mut self, index: usize, delta_px: f64, grid_width_px: f64) {
        resize_tracks(&mut self.col_sizes, index, delta_px, grid_width_px);
        self.cols_dirty = true;
    }

    /// End the gesture. Returns the single grid patch to commit and
    /// broadcast, or `None` when no divider actually moved.
    pub fn finalize(self) -> Option<GridPatch> {
        if !self.rows_dirty && !self.cols_dirty {
            return None;
        }
        Some(GridPatch {
            row_sizes: self.rows_dirty.then_some(self.row_sizes),
            col_sizes: self.cols_dirty.then_some(self.col_sizes),
            ..GridPatch::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PanelKind;

    fn grid(rows: u32, cols: u32) -> GridSpec {
        GridSpec {
            rows,
            cols,
            ..GridSpec::new_default()
        }
    }

    fn panel(row: u32, col: u32, width: u32, height: u32) -> Panel {
        Panel {
            id: "p1".to_string(),
            kind: PanelKind::Taskbox,
            row,
            col,
            width,
            height,
            container_id: "taskbox-p1".to_string(),
        }
    }

    #[test]
    fn test_cell_at_uniform_tracks() {
        let g = grid(2, 3);
        let rect = Rect::new(0.0, 0.0, 300.0, 200.0);
        assert_eq!(cell_at(Point::new(10.0, 10.0), rect, &g), (0, 0));
        assert_eq!(cell_at(Point::new(150.0, 10.0), rect, &g), (0, 1));
        assert_eq!(cell_at(Point::new(290.0, 150.0), rect, &g), (1, 2));
    }

    #[test]
    fn test_cell_at_weighted_tracks() {
        let g = GridSpec {
            rows: 1,
            cols: 2,
            col_sizes: vec![3.0, 1.0],
            ..GridSpec::new_default()
        };
        let rect = Rect::new(0.0, 0.0, 400.0, 100.0);
        // First track covers 3/4 of the width.
        assert_eq!(cell_at(Point::new(290.0, 50.0), rect, &g), (0, 0));
        assert_eq!(cell_at(Point::new(310.0, 50.0), rect, &g), (0, 1));
    }

    #[test]
    fn test_cell_at_clamps_beyond_edges() {
        let g = grid(2, 3);
        let rect = Rect::new(0.0, 0.0, 300.0, 200.0);
        assert_eq!(cell_at(Point::new(900.0, 900.0), rect, &g), (1, 2));
        assert_eq!(cell_at(Point::new(-50.0, -50.0), rect, &g), (0, 0));
    }

    #[test]
    fn test_place_panel_clamps_origin_and_span() {
        let g = grid(2, 3);
        let placed = place_panel(&panel(0, 0, 2, 2), 5, 9, &g);
        assert_eq!((placed.row, placed.col), (1, 2));
        // From (1,2) a 2x2 panel would overflow; span shrinks to fit.
        assert_eq!((placed.width, placed.height), (1, 1));
    }

    #[test]
    fn test_place_panel_keeps_fitting_span() {
        let g = grid(3, 3);
        let placed = place_panel(&panel(2, 2, 2, 1), 0, 0, &g);
        assert_eq!((placed.row, placed.col), (0, 0));
        assert_eq!((placed.width, placed.height), (2, 1));
    }

    #[test]
    fn test_place_panel_tolerates_degenerate_grid() {
        // A zero-dimension grid can arrive through a grid patch; placement
        // must not underflow the clamp bounds.
        let placed = place_panel(&panel(0, 0, 2, 2), 3, 3, &grid(0, 0));
        assert_eq!((placed.row, placed.col), (0, 0));
        assert_eq!((placed.width, placed.height), (1, 1));

        let placed = place_panel(&panel(0, 0, 1, 1), 0, 0, &grid(0, 3));
        assert_eq!((placed.row, placed.height), (0, 1));
    }

    #[test]
    fn test_resize_redistributes_between_neighbors() {
        let mut sizes = vec![1.0, 1.0, 1.0];
        // Drag the first divider 150px right across a 300px grid: total
        // weight 3.0, so +1.5fr to track 0, -1.5fr (floored) from track 1.
        resize_tracks(&mut sizes, 0, 150.0, 300.0);
        assert!((sizes[0] - 2.5).abs() < 1e-9);
        assert_eq!(sizes[1], MIN_TRACK_WEIGHT);
        assert_eq!(sizes[2], 1.0);
    }

    #[test]
    fn test_resize_last_divider_index_is_noop() {
        let mut sizes = vec![1.0, 1.0];
        resize_tracks(&mut sizes, 1, 50.0, 100.0);
        assert_eq!(sizes, vec![1.0, 1.0]);
    }

    #[test]
    fn test_resize_session_commits_once_on_finalize() {
        let g = grid(2, 3);
        let mut session = TrackResizeSession::begin(&g);
        session.drag_col_divider(0, 30.0, 300.0);
        session.drag_col_divider(0, 30.0, 300.0);

        let patch = session.finalize().unwrap();
        assert!(patch.row_sizes.is_none());
        let cols = patch.col_sizes.unwrap();
        assert_eq!(cols.len(), 3);
        assert!(cols[0] > 1.0);
    }

    #[test]
    fn test_resize_session_without_movement_emits_nothing() {
        let g = grid(2, 3);
        let session = TrackResizeSession::begin(&g);
        assert!(session.finalize().is_none());
    }
}
