// src/tracker.rs - Single-pass scanline contour tracing over a binary mask

use imageproc::point::Point;
use log::{debug, info};

use crate::cancel::CancelToken;
use crate::errors::Result;
use crate::pixel_source::PixelSource;
use crate::segmentation::{find_row_segments, RowSegment};

/// A recorded contour vertex in source coordinates
pub type ContourPoint = Point<i32>;

/// Stable contour label, allocated from 1 upwards in scan order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContourId(u32);

impl ContourId {
    /// Wrap a raw id; 0 is never allocated and looks up nothing
    pub fn from_raw(id: u32) -> Self {
        ContourId(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    #[inline]
    fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl std::fmt::Display for ContourId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// One edge of a traced region; left and right are always created as a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Branch {
    pub id: ContourId,
    pub side: Side,
}

/// Open contour state carried from one row into the next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSeries {
    pub segment: RowSegment,
    pub left: Branch,
    pub right: Branch,
}

impl ActiveSeries {
    #[inline]
    pub fn id(&self) -> ContourId {
        self.left.id
    }
}

/// Incremental row-by-row tracker.
///
/// Each row's segments are merged against the series left open by the
/// previous row. Overlapping runs always continue 1:1; a run split in two
/// continues on its left piece and opens a new contour for the rest, and
/// two runs merging into one close the right-hand contour.
#[derive(Debug, Default)]
pub struct ContourTracker {
    prev: Vec<ActiveSeries>,
    // arena: contour id N lives at index N - 1
    contours: Vec<Vec<ContourPoint>>,
}

impl ContourTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Series left open by the last row pushed
    pub fn active(&self) -> &[ActiveSeries] {
        &self.prev
    }

    /// Consume one row's segments, sorted by `start_x`
    pub fn push_row(&mut self, cur: &[RowSegment]) {
        let prev = std::mem::take(&mut self.prev);
        let mut next = Vec::with_capacity(cur.len());
        let (mut i, mut j) = (0, 0);

        while i < prev.len() || j < cur.len() {
            if j == cur.len() {
                self.close(&prev[i]);
                i += 1;
                continue;
            }
            if i == prev.len() {
                next.push(self.open(cur[j]));
                j += 1;
                continue;
            }

            let (ps, cs) = (prev[i].segment, cur[j]);
            if cs.end_x < ps.start_x {
                next.push(self.open(cs));
                j += 1;
            } else if ps.end_x < cs.start_x {
                self.close(&prev[i]);
                i += 1;
            } else {
                next.push(self.continue_series(&prev[i], cs));
                i += 1;
                j += 1;
            }
        }

        self.prev = next;
    }

    /// Close every still-open series at its last row and hand over the contours
    pub fn finish(mut self) -> ContourSet {
        let open = std::mem::take(&mut self.prev);
        for series in &open {
            self.close(series);
        }
        ContourSet {
            contours: self.contours,
        }
    }

    fn open(&mut self, segment: RowSegment) -> ActiveSeries {
        self.contours.push(vec![
            Point::new(segment.start_x, segment.y),
            Point::new(segment.end_x, segment.y),
        ]);
        let id = ContourId(self.contours.len() as u32);

        ActiveSeries {
            segment,
            left: Branch { id, side: Side::Left },
            right: Branch { id, side: Side::Right },
        }
    }

    fn continue_series(&mut self, series: &ActiveSeries, segment: RowSegment) -> ActiveSeries {
        let points = &mut self.contours[series.id().index()];
        points.push(Point::new(segment.start_x, segment.y));
        points.push(Point::new(segment.end_x, segment.y));

        ActiveSeries {
            segment,
            left: series.left,
            right: series.right,
        }
    }

    fn close(&mut self, series: &ActiveSeries) {
        let s = series.segment;
        let points = &mut self.contours[series.id().index()];
        // right then left
        points.push(Point::new(s.end_x, s.y));
        points.push(Point::new(s.start_x, s.y));
    }
}

/// Finished contour table, indexed by id.
///
/// Iteration order is not part of the contract; consumers that need a stable
/// order should sort by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContourSet {
    contours: Vec<Vec<ContourPoint>>,
}

impl ContourSet {
    pub fn len(&self) -> usize {
        self.contours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    pub fn points(&self, id: ContourId) -> Option<&[ContourPoint]> {
        if id.0 == 0 {
            return None;
        }
        self.contours.get(id.index()).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ContourId, &[ContourPoint])> + '_ {
        self.contours
            .iter()
            .enumerate()
            .map(|(idx, pts)| (ContourId(idx as u32 + 1), pts.as_slice()))
    }

    pub fn total_points(&self) -> usize {
        self.contours.iter().map(Vec::len).sum()
    }
}

/// Segment and trace every row of `mask`, polling `cancel` once per row
pub fn trace_mask<S: PixelSource + ?Sized>(mask: &S, cancel: &CancelToken) -> Result<ContourSet> {
    let bounds = mask.bounds();
    let mut tracker = ContourTracker::new();

    for y in bounds.min_y..bounds.max_y {
        cancel.check()?;
        let segments = find_row_segments(mask, y);
        tracker.push_row(&segments);
    }

    debug!("{} series still open after last row", tracker.active().len());
    let contours = tracker.finish();
    cancel.check()?;

    info!(
        "Traced {} contours ({} points)",
        contours.len(),
        contours.total_points()
    );
    Ok(contours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binarization::BinaryMask;
    use image::{GrayImage, Luma};

    fn mask_from_rows(rows: &[&str]) -> BinaryMask {
        // '#' is background (0), anything else foreground (255)
        let width = rows[0].len() as u32;
        let mut img = GrayImage::from_pixel(width, rows.len() as u32, Luma([255]));
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                if c == '#' {
                    img.put_pixel(x as u32, y as u32, Luma([0]));
                }
            }
        }
        BinaryMask::from_gray(img)
    }

    fn pts(coords: &[(i32, i32)]) -> Vec<ContourPoint> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    fn id(n: u32) -> ContourId {
        ContourId(n)
    }

    #[test]
    fn run_open_continue_close() {
        let mask = mask_from_rows(&["..####..", "..####..", "..####..", "........"]);
        let set = trace_mask(&mask, &CancelToken::new()).unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(
            set.points(id(1)).unwrap(),
            pts(&[(2, 0), (5, 0), (2, 1), (5, 1), (2, 2), (5, 2), (5, 2), (2, 2)]).as_slice()
        );
    }

    #[test]
    fn run_reaching_last_row_closes_on_that_row() {
        let mask = mask_from_rows(&["..####..", "..####..", "..####.."]);
        let set = trace_mask(&mask, &CancelToken::new()).unwrap();

        let points = set.points(id(1)).unwrap();
        assert_eq!(points.len(), 8);
        assert_eq!(&points[6..], pts(&[(5, 2), (2, 2)]).as_slice());
        assert!(points.iter().all(|p| p.y < 3));
    }

    #[test]
    fn simultaneous_runs_get_ids_left_to_right() {
        let mask = mask_from_rows(&["##...###", "........"]);
        let set = trace_mask(&mask, &CancelToken::new()).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.points(id(1)).unwrap(), pts(&[(0, 0), (1, 0), (1, 0), (0, 0)]).as_slice());
        assert_eq!(set.points(id(2)).unwrap(), pts(&[(5, 0), (7, 0), (7, 0), (5, 0)]).as_slice());
    }

    #[test]
    fn ids_follow_first_appearance_in_scan_order() {
        let mask = mask_from_rows(&[
            "....##..", //
            "#...##..",
            "#......#",
            ".##....#",
        ]);
        let set = trace_mask(&mask, &CancelToken::new()).unwrap();
        let first_points: Vec<(u32, ContourPoint)> =
            set.iter().map(|(id, p)| (id.get(), p[0])).collect();

        assert_eq!(
            first_points,
            vec![
                (1, Point::new(4, 0)),
                (2, Point::new(0, 1)),
                (3, Point::new(7, 2)),
                (4, Point::new(1, 3)),
            ]
        );
    }

    #[test]
    fn every_contour_is_closed() {
        let mask = mask_from_rows(&[
            "#.#.##.#",
            "##..#..#",
            ".#.###..",
            "#...#.##",
            "##.#..##",
        ]);
        let set = trace_mask(&mask, &CancelToken::new()).unwrap();
        assert!(!set.is_empty());

        for (_, points) in set.iter() {
            // opening pair + closing pair, plus one pair per continued row
            assert!(points.len() >= 4 && points.len() % 2 == 0);
            let close = &points[points.len() - 2..];
            assert_eq!(close[0].y, close[1].y);
            assert!(close[0].x >= close[1].x);
        }
    }

    #[test]
    fn split_continues_left_piece_and_opens_new_contour() {
        let mut tracker = ContourTracker::new();
        tracker.push_row(&[RowSegment::new(2, 5, 0)]);
        tracker.push_row(&[RowSegment::new(0, 2, 1), RowSegment::new(4, 6, 1)]);

        let active: Vec<u32> = tracker.active().iter().map(|s| s.id().get()).collect();
        assert_eq!(active, vec![1, 2]);

        let set = tracker.finish();
        assert_eq!(
            set.points(id(1)).unwrap(),
            pts(&[(2, 0), (5, 0), (0, 1), (2, 1), (2, 1), (0, 1)]).as_slice()
        );
        assert_eq!(set.points(id(2)).unwrap(), pts(&[(4, 1), (6, 1), (6, 1), (4, 1)]).as_slice());
    }

    #[test]
    fn merge_continues_left_contour_and_closes_right() {
        let mut tracker = ContourTracker::new();
        tracker.push_row(&[RowSegment::new(0, 1, 0), RowSegment::new(4, 5, 0)]);
        tracker.push_row(&[RowSegment::new(0, 5, 1)]);

        assert_eq!(tracker.active().len(), 1);
        assert_eq!(tracker.active()[0].id(), id(1));

        let set = tracker.finish();
        assert_eq!(set.points(id(2)).unwrap(), pts(&[(4, 0), (5, 0), (5, 0), (4, 0)]).as_slice());
        assert_eq!(
            set.points(id(1)).unwrap(),
            pts(&[(0, 0), (1, 0), (0, 1), (5, 1), (5, 1), (0, 1)]).as_slice()
        );
    }

    #[test]
    fn continuation_keeps_branch_pair() {
        let mut tracker = ContourTracker::new();
        tracker.push_row(&[RowSegment::new(3, 4, 0)]);
        let before = tracker.active()[0];
        tracker.push_row(&[RowSegment::new(1, 3, 1)]);
        let after = tracker.active()[0];

        assert_eq!(before.left, after.left);
        assert_eq!(before.right, after.right);
        assert_eq!(after.left.side, Side::Left);
        assert_eq!(after.right.side, Side::Right);
        assert_eq!(after.segment, RowSegment::new(1, 3, 1));
    }

    #[test]
    fn blank_mask_has_no_contours() {
        let mask = mask_from_rows(&["....", "...."]);
        let set = trace_mask(&mask, &CancelToken::new()).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.total_points(), 0);
        assert!(set.points(id(1)).is_none());
        assert!(set.points(ContourId(0)).is_none());
    }

    #[test]
    fn cancelled_before_start() {
        let mask = mask_from_rows(&["##", "##"]);
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(trace_mask(&mask, &cancel).unwrap_err().is_cancelled());
    }
}
