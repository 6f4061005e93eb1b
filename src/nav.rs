use crate::layout::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

/// Bidirectional flat-index ↔ (row, column) map for keyboard traversal.
///
/// Derived from the packed rows and only valid for them; rebuild whenever the
/// rows are rebuilt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavIndex {
    row_starts: Vec<usize>,
    row_lens: Vec<usize>,
    total: usize,
}

impl NavIndex {
    pub fn new(rows: &[Row]) -> Self {
        let row_starts = rows.iter().map(|r| r.start).collect();
        let row_lens = rows.iter().map(|r| r.len).collect();
        let total = rows.last().map(|r| r.end()).unwrap_or(0);
        Self {
            row_starts,
            row_lens,
            total,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn row_count(&self) -> usize {
        self.row_starts.len()
    }

    pub fn row_len(&self, row: usize) -> usize {
        self.row_lens.get(row).copied().unwrap_or(0)
    }

    pub fn flat_index_of(&self, row: usize, col: usize) -> Option<usize> {
        if row >= self.row_starts.len() || col >= self.row_lens[row] {
            return None;
        }
        Some(self.row_starts[row] + col)
    }

    pub fn position_of(&self, flat: usize) -> Option<(usize, usize)> {
        if flat >= self.total {
            return None;
        }
        // Last row whose start is <= flat.
        let row = match self.row_starts.binary_search(&flat) {
            Ok(r) => r,
            Err(insert) => insert - 1,
        };
        Some((row, flat - self.row_starts[row]))
    }

    /// One keyboard step from `flat`, clamped at the grid edges. Vertical
    /// moves shift by the source row's length, clamped into the target row
    /// when the two rows differ in length.
    pub fn step(&self, flat: usize, dir: Direction) -> usize {
        if self.total == 0 {
            return 0;
        }
        let flat = flat.min(self.total - 1);
        match dir {
            Direction::Left => flat.saturating_sub(1),
            Direction::Right => (flat + 1).min(self.total - 1),
            Direction::Up | Direction::Down => {
                let (row, _) = match self.position_of(flat) {
                    Some(pos) => pos,
                    None => return flat,
                };
                let target = match dir {
                    Direction::Up => row.checked_sub(1),
                    _ => (row + 1 < self.row_starts.len()).then_some(row + 1),
                };
                match target {
                    Some(t) => {
                        let moved = match dir {
                            Direction::Up => flat.saturating_sub(self.row_lens[row]),
                            _ => flat + self.row_lens[row],
                        };
                        moved.clamp(
                            self.row_starts[t],
                            self.row_starts[t] + self.row_lens[t] - 1,
                        )
                    }
                    None => flat,
                }
            }
        }
    }
}
