use crate::binarization::BACKGROUND;
use crate::pixel_source::PixelSource;

/// Maximal horizontal run of background pixels on row `y`, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSegment {
    pub start_x: i32,
    pub end_x: i32,
    pub y: i32,
}

impl RowSegment {
    pub fn new(start_x: i32, end_x: i32, y: i32) -> Self {
        Self { start_x, end_x, y }
    }
}

/// Find all runs of value-0 pixels on row `y`, left to right.
///
/// A run still open at the right edge is closed at `max_x - 1`.
pub fn find_row_segments<S: PixelSource + ?Sized>(mask: &S, y: i32) -> Vec<RowSegment> {
    let bounds = mask.bounds();
    let mut segments = Vec::new();
    let mut run_start: Option<i32> = None;

    for x in bounds.min_x..bounds.max_x {
        let is_background = mask.luma_at(x, y) == BACKGROUND;
        match (is_background, run_start) {
            (true, None) => run_start = Some(x),
            (false, Some(start)) => {
                segments.push(RowSegment::new(start, x - 1, y));
                run_start = None;
            }
            _ => {}
        }
    }

    if let Some(start) = run_start {
        segments.push(RowSegment::new(start, bounds.max_x - 1, y));
    }

    segments
}
