//! Genomic ranges.
//!
//! A [`Range`] uses 1-based, fully closed coordinates (GFF3 convention):
//! `Range::new(100, 200)` covers 101 positions. The constructor enforces
//! `start <= end`, so every `Range` in the crate is well formed.

use crate::error::{GfiError, Result};
use std::cmp::Ordering;
use std::fmt;

/// A closed interval `[start, end]` on a sequence.
///
/// The derived ordering compares `start` first and `end` second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Range {
    start: u64,
    end: u64,
}

impl Range {
    /// Create a new range.
    ///
    /// # Panics
    ///
    /// Panics if `start > end`. Use [`Range::try_new`] for untrusted input.
    #[inline]
    pub fn new(start: u64, end: u64) -> Self {
        assert!(start <= end, "range start {} > end {}", start, end);
        Self { start, end }
    }

    /// Create a new range, returning `InvalidRange` if `start > end`.
    #[inline]
    pub fn try_new(start: u64, end: u64) -> Result<Self> {
        if start > end {
            return Err(GfiError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Create a range from two borders given in any order.
    #[inline]
    pub fn reorder(a: u64, b: u64) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    #[inline]
    pub fn start(&self) -> u64 {
        self.start
    }

    #[inline]
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of positions covered (`end - start + 1`), saturating at `u64::MAX`.
    #[inline]
    pub fn length(&self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }

    /// Check if this range shares at least one position with `other`.
    #[inline]
    pub fn overlaps(&self, other: &Range) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    /// Check if the ranges overlap by at least `delta` positions.
    #[inline]
    pub fn overlaps_by(&self, other: &Range, delta: u64) -> bool {
        if !self.overlaps(other) {
            return false;
        }
        let overlap = (self.end.min(other.end) - self.start.max(other.start)).saturating_add(1);
        overlap >= delta
    }

    /// Check if `other` lies completely inside this range.
    #[inline]
    pub fn contains(&self, other: &Range) -> bool {
        self.start <= other.start && self.end >= other.end
    }

    /// Check if `point` lies inside this range.
    #[inline]
    pub fn within(&self, point: u64) -> bool {
        self.start <= point && self.end >= point
    }

    /// Smallest range covering both ranges.
    #[inline]
    pub fn join(&self, other: &Range) -> Range {
        Range {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Shift both borders by `offset`.
    ///
    /// Returns `InvalidRange` if a border would leave the `u64` domain.
    pub fn offset(&self, offset: i64) -> Result<Range> {
        let shift = |pos: u64| pos.checked_add_signed(offset);
        match (shift(self.start), shift(self.end)) {
            (Some(start), Some(end)) => Ok(Range { start, end }),
            _ => Err(GfiError::InvalidRange {
                start: self.start,
                end: self.end,
            }),
        }
    }

    /// Compare by start then end.
    #[inline]
    pub fn compare(&self, other: &Range) -> Ordering {
        self.cmp(other)
    }

    /// Like [`Range::compare`], but ranges whose starts and ends each differ
    /// by at most `delta` compare equal.
    pub fn compare_with_delta(&self, other: &Range, delta: u64) -> Ordering {
        if self.start.abs_diff(other.start) <= delta && self.end.abs_diff(other.end) <= delta {
            return Ordering::Equal;
        }
        self.cmp(other)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Sort ranges by start, then end.
pub fn ranges_sort(ranges: &mut [Range]) {
    ranges.sort_unstable();
}

/// Check if `ranges` is sorted by start, then end.
pub fn ranges_are_sorted(ranges: &[Range]) -> bool {
    ranges.windows(2).all(|w| w[0] <= w[1])
}

/// Check if no two neighbouring ranges overlap.
pub fn ranges_do_not_overlap(ranges: &[Range]) -> bool {
    ranges.windows(2).all(|w| !w[0].overlaps(&w[1]))
}

pub fn ranges_are_sorted_and_do_not_overlap(ranges: &[Range]) -> bool {
    ranges_are_sorted(ranges) && ranges_do_not_overlap(ranges)
}

/// Remove consecutive duplicates from a sorted slice of ranges.
pub fn ranges_uniq(ranges: &[Range]) -> Vec<Range> {
    debug_assert!(ranges_are_sorted(ranges));
    let mut out: Vec<Range> = Vec::with_capacity(ranges.len());
    for &range in ranges {
        if out.last() != Some(&range) {
            out.push(range);
        }
    }
    out
}

/// Like [`ranges_uniq`], also returning how often each range occurred.
pub fn ranges_uniq_count(ranges: &[Range]) -> Vec<(Range, usize)> {
    debug_assert!(ranges_are_sorted(ranges));
    let mut out: Vec<(Range, usize)> = Vec::with_capacity(ranges.len());
    for &range in ranges {
        match out.last_mut() {
            Some((last, count)) if *last == range => *count += 1,
            _ => out.push((range, 1)),
        }
    }
    out
}

/// Sum of the lengths of all ranges.
pub fn ranges_total_length(ranges: &[Range]) -> u64 {
    ranges.iter().map(Range::length).sum()
}

/// Length of the span from the first start to the last end.
///
/// Returns 0 for an empty slice.
pub fn ranges_spanned_length(ranges: &[Range]) -> u64 {
    match (ranges.first(), ranges.last()) {
        (Some(first), Some(last)) => Range::reorder(first.start, last.end).length(),
        _ => 0,
    }
}

/// Check if every range ends right before the next one starts.
pub fn ranges_are_consecutive(ranges: &[Range]) -> bool {
    ranges.windows(2).all(|w| w[0].end.checked_add(1) == Some(w[1].start))
}

/// Check if every range lies inside `region`.
pub fn ranges_borders_are_in_region(ranges: &[Range], region: &Range) -> bool {
    ranges.iter().all(|r| region.contains(r))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_basics() {
        let r = Range::new(100, 200);
        assert_eq!(r.length(), 101);
        assert!(r.within(100));
        assert!(r.within(200));
        assert!(!r.within(201));
        assert_eq!(Range::new(5, 5).length(), 1);
        let whole = Range::new(0, u64::MAX);
        assert_eq!(whole.length(), u64::MAX);
        assert!(whole.overlaps_by(&whole, u64::MAX));
    }

    #[test]
    fn test_try_new_rejects_reversed() {
        assert!(matches!(
            Range::try_new(10, 5),
            Err(GfiError::InvalidRange { start: 10, end: 5 })
        ));
        assert!(Range::try_new(5, 5).is_ok());
    }

    #[test]
    #[should_panic]
    fn test_new_panics_on_reversed() {
        let _ = Range::new(10, 5);
    }

    #[test]
    fn test_overlap_is_inclusive() {
        let a = Range::new(100, 200);
        assert!(a.overlaps(&Range::new(200, 300))); // Shared end position
        assert!(!a.overlaps(&Range::new(201, 300)));
        assert!(a.overlaps(&Range::new(1, 100)));
        assert!(a.overlaps_by(&Range::new(150, 300), 51));
        assert!(!a.overlaps_by(&Range::new(150, 300), 52));
    }

    #[test]
    fn test_contains_and_join() {
        let a = Range::new(100, 200);
        assert!(a.contains(&Range::new(100, 200)));
        assert!(a.contains(&Range::new(120, 180)));
        assert!(!a.contains(&Range::new(90, 180)));
        assert_eq!(a.join(&Range::new(150, 400)), Range::new(100, 400));
        assert_eq!(a.join(&Range::new(500, 600)), Range::new(100, 600));
    }

    #[test]
    fn test_offset_and_reorder() {
        let a = Range::new(100, 200);
        assert_eq!(a.offset(-50).unwrap(), Range::new(50, 150));
        assert_eq!(a.offset(10).unwrap(), Range::new(110, 210));
        assert!(a.offset(-101).is_err());
        assert_eq!(Range::reorder(100, 1), Range::new(1, 100));
        assert_eq!(Range::reorder(1, 100), Range::new(1, 100));
    }

    #[test]
    fn test_compare() {
        let a = Range::new(100, 200);
        assert_eq!(a.compare(&Range::new(100, 300)), Ordering::Less);
        assert_eq!(a.compare(&Range::new(50, 300)), Ordering::Greater);
        assert_eq!(a.compare(&a), Ordering::Equal);
        assert_eq!(a.compare_with_delta(&Range::new(103, 198), 3), Ordering::Equal);
        assert_eq!(a.compare_with_delta(&Range::new(104, 198), 3), Ordering::Less);
    }

    #[test]
    fn test_uniq_and_count() {
        let ranges = vec![
            Range::new(620432, 620536),
            Range::new(620432, 620536),
            Range::new(620957, 621056),
            Range::new(625234, 625253),
            Range::new(625533, 625655),
            Range::new(625533, 625655),
            Range::new(625533, 625655),
        ];
        assert!(ranges_are_sorted(&ranges));
        let uniq = ranges_uniq(&ranges);
        assert_eq!(uniq.len(), 4);
        let counts: Vec<usize> = ranges_uniq_count(&ranges).into_iter().map(|(_, c)| c).collect();
        assert_eq!(counts, vec![2, 1, 1, 3]);
    }

    #[test]
    fn test_slice_helpers() {
        let mut ranges = vec![Range::new(30, 40), Range::new(1, 10), Range::new(11, 29)];
        assert!(!ranges_are_sorted(&ranges));
        ranges_sort(&mut ranges);
        assert!(ranges_are_sorted_and_do_not_overlap(&ranges));
        assert!(ranges_are_consecutive(&ranges));
        assert_eq!(ranges_total_length(&ranges), 40);
        assert_eq!(ranges_spanned_length(&ranges), 40);
        assert!(ranges_borders_are_in_region(&ranges, &Range::new(1, 40)));
        assert!(!ranges_borders_are_in_region(&ranges, &Range::new(2, 40)));
        assert_eq!(ranges_spanned_length(&[]), 0);
    }
}
