use crate::layout::{OffsetTable, Row};
use crate::WINDOW_EXTRA_ROWS;

/// Contiguous row range to render, end-exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibleWindow {
    pub start_row: usize,
    pub end_row: usize,
}

impl VisibleWindow {
    pub fn is_empty(&self) -> bool {
        self.start_row >= self.end_row
    }

    pub fn rows(&self) -> std::ops::Range<usize> {
        self.start_row..self.end_row
    }
}

/// Selects the rows whose extent, padded by `overscan`, covers the viewport.
///
/// Row bottoms and tops are both monotone, so binary search gives the same
/// answer as scanning from the top.
pub fn visible_window(
    offsets: &OffsetTable,
    rows: &[Row],
    scroll_top: f32,
    viewport_height: f32,
    overscan: f32,
) -> VisibleWindow {
    if rows.is_empty() {
        return VisibleWindow::default();
    }
    let low = (scroll_top - overscan).max(0.0);
    let high = scroll_top + viewport_height + overscan;

    // First row whose bottom edge reaches `low`.
    let mut lo = 0usize;
    let mut hi = rows.len();
    while lo < hi {
        let mid = (lo + hi) / 2;
        if offsets.offsets[mid] + rows[mid].height < low {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    let start_row = lo.min(rows.len());

    // First row whose top edge reaches `high`.
    let mut lo = start_row;
    let mut hi = rows.len();
    while lo < hi {
        let mid = (lo + hi) / 2;
        if offsets.offsets[mid] < high {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    let end_row = (lo + WINDOW_EXTRA_ROWS).min(rows.len());

    VisibleWindow { start_row, end_row }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_rows(count: usize, height: f32, per_row: usize) -> (Vec<Row>, OffsetTable) {
        let rows: Vec<Row> = (0..count)
            .map(|i| Row {
                start: i * per_row,
                len: per_row,
                height,
            })
            .collect();
        let table = OffsetTable::new(&rows, 0.0);
        (rows, table)
    }

    /// Linear reference implementation the binary search must agree with.
    fn linear_window(
        offsets: &OffsetTable,
        rows: &[Row],
        scroll_top: f32,
        viewport_height: f32,
        overscan: f32,
    ) -> VisibleWindow {
        if rows.is_empty() {
            return VisibleWindow::default();
        }
        let low = (scroll_top - overscan).max(0.0);
        let high = scroll_top + viewport_height + overscan;
        let start_row = (0..rows.len())
            .find(|&i| offsets.offsets[i] + rows[i].height >= low)
            .unwrap_or(rows.len());
        let end_row = (start_row..rows.len())
            .find(|&i| offsets.offsets[i] >= high)
            .unwrap_or(rows.len());
        VisibleWindow {
            start_row,
            end_row: (end_row + WINDOW_EXTRA_ROWS).min(rows.len()),
        }
    }

    #[test]
    fn hand_computed_window() {
        // 50 uniform 200-unit rows, scroll 5000, viewport 800, overscan 600.
        let (rows, table) = uniform_rows(50, 200.0, 4);
        let win = visible_window(&table, &rows, 5000.0, 800.0, 600.0);
        // low = 4400: first bottom >= 4400 is row 21 (bottom 4400).
        assert_eq!(win.start_row, 21);
        // high = 6400: first top >= 6400 is row 32, plus 5 extra rows.
        assert_eq!(win.end_row, 37);
    }

    #[test]
    fn empty_rows_empty_window() {
        let table = OffsetTable::new(&[], 0.0);
        let win = visible_window(&table, &[], 100.0, 500.0, 200.0);
        assert!(win.is_empty());
    }

    #[test]
    fn window_covers_every_intersecting_row() {
        let heights = [120.0, 340.0, 200.0, 180.0, 510.0, 150.0, 240.0];
        let rows: Vec<Row> = (0..240)
            .map(|i| Row {
                start: i * 3,
                len: 3,
                height: heights[i % heights.len()],
            })
            .collect();
        let table = OffsetTable::new(&rows, 8.0);
        for step in 0..80 {
            let scroll = step as f32 * 173.0;
            let win = visible_window(&table, &rows, scroll, 900.0, 600.0);
            for (i, row) in rows.iter().enumerate() {
                let top = table.offsets[i];
                let bottom = top + row.height;
                let intersects = bottom >= scroll && top <= scroll + 900.0;
                if intersects {
                    assert!(
                        win.rows().contains(&i),
                        "row {i} intersects viewport at scroll {scroll} but is not in {win:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn binary_search_matches_linear_scan() {
        let rows: Vec<Row> = (0..97)
            .map(|i| Row {
                start: i * 2,
                len: 2,
                height: 130.0 + (i % 11) as f32 * 37.0,
            })
            .collect();
        let table = OffsetTable::new(&rows, 8.0);
        for step in 0..200 {
            let scroll = step as f32 * 91.0 - 500.0;
            let fast = visible_window(&table, &rows, scroll, 760.0, 600.0);
            let slow = linear_window(&table, &rows, scroll, 760.0, 600.0);
            assert_eq!(fast, slow, "divergence at scroll {scroll}");
        }
    }

    #[test]
    fn window_clamps_at_both_ends() {
        let (rows, table) = uniform_rows(10, 200.0, 4);
        let top = visible_window(&table, &rows, 0.0, 400.0, 600.0);
        assert_eq!(top.start_row, 0);
        let bottom = visible_window(&table, &rows, 1e9, 400.0, 600.0);
        assert_eq!(bottom.end_row, 10);
        assert!(bottom.start_row <= bottom.end_row);
    }
}
