use crate::{DEFAULT_RATIO, MIN_ROW_HEIGHT};

/// One entry in a result set. Identity is the path; order in the containing
/// slice is the base order for row packing and flat indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub path: String,
    pub score: Option<f32>,
}

impl Item {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            score: None,
        }
    }
}

/// A packed row: a contiguous run of items plus the height they render at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Row {
    pub start: usize,
    pub len: usize,
    pub height: f32,
}

impl Row {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn indices(&self) -> std::ops::Range<usize> {
        self.start..self.end()
    }
}

/// Coerces a probed ratio into something the packer can divide by.
pub fn sanitize_ratio(ratio: f32) -> f32 {
    if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        DEFAULT_RATIO
    }
}

/// Packs `items` into justified rows, greedy left to right.
///
/// A row closes as soon as its contents at `target_row_height` would meet or
/// exceed `container_width`; it is then scaled down so the row spans the
/// container exactly. The trailing partial row keeps the target height
/// instead of being stretched to fill.
pub fn pack_rows<F>(
    items: &[Item],
    ratio_of: F,
    container_width: f32,
    target_row_height: f32,
    gap: f32,
) -> Vec<Row>
where
    F: Fn(&str) -> Option<f32>,
{
    if items.is_empty() || container_width <= 0.0 || target_row_height <= 0.0 {
        return Vec::new();
    }
    let mut rows = Vec::new();
    let mut start = 0usize;
    let mut len = 0usize;
    let mut ratio_sum = 0.0f32;
    for (idx, item) in items.iter().enumerate() {
        let ratio = sanitize_ratio(ratio_of(&item.path).unwrap_or(DEFAULT_RATIO));
        len += 1;
        ratio_sum += ratio;
        let gaps = gap * (len - 1) as f32;
        let candidate_width = ratio_sum * target_row_height + gaps;
        if candidate_width >= container_width {
            let height = ((container_width - gaps) / ratio_sum)
                .floor()
                .max(MIN_ROW_HEIGHT);
            rows.push(Row { start, len, height });
            start = idx + 1;
            len = 0;
            ratio_sum = 0.0;
        }
    }
    if len > 0 {
        let gaps = gap * (len - 1) as f32;
        let computed = ((container_width - gaps) / ratio_sum).floor();
        rows.push(Row {
            start,
            len,
            height: target_row_height.min(computed),
        });
    }
    rows
}

/// Cumulative top offsets for packed rows, with one gap between rows and no
/// trailing gap after the last.
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetTable {
    pub offsets: Vec<f32>,
    pub total_height: f32,
}

impl OffsetTable {
    pub fn new(rows: &[Row], gap: f32) -> Self {
        let mut offsets = Vec::with_capacity(rows.len());
        let mut top = 0.0f32;
        for row in rows {
            offsets.push(top);
            top += row.height + gap;
        }
        let total_height = match rows.last() {
            Some(last) => offsets[rows.len() - 1] + last.height,
            None => 0.0,
        };
        Self {
            offsets,
            total_height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn top_of(&self, row: usize) -> f32 {
        self.offsets[row]
    }
}
