//! Dirty-region algebra.
//!
//! A [`TextRegion`] is an ordered set of disjoint, non-adjacent half-open character ranges.
//! The document keeps one while search highlighting is enabled: every range in it is a part of
//! the buffer whose "found" tags may not reflect the current search pattern.
//!
//! The region must stay meaningful while the buffer changes around it, so every edit is
//! replayed onto the region with [`TextRegion::update_for_insertion`] /
//! [`TextRegion::update_for_deletion`]. The boundaries behave like text marks: a start boundary
//! has left gravity and an end boundary has right gravity, so text inserted at either boundary
//! (or inside) becomes part of the region.

use std::ops::Range;

/// Ordered set of disjoint, non-adjacent character ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextRegion {
    /// Sorted by start; `ranges[i].end < ranges[i + 1].start`; never empty ranges.
    ranges: Vec<Range<usize>>,
}

impl TextRegion {
    /// Create an empty region.
    pub fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Create a region from arbitrary (possibly overlapping) ranges.
    pub fn from_ranges(ranges: impl IntoIterator<Item = Range<usize>>) -> Self {
        let mut region = Self::new();
        for range in ranges {
            region.add(range.start, range.end);
        }
        region
    }

    /// Returns `true` if the region covers nothing.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of disjoint subregions.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Disjoint subregions, sorted by start.
    pub fn subregions(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// Range from the start of the first subregion to the end of the last one.
    pub fn bounds(&self) -> Option<Range<usize>> {
        let first = self.ranges.first()?;
        let last = self.ranges.last()?;
        Some(first.start..last.end)
    }

    /// Returns `true` if any subregion overlaps `[start, end)`.
    ///
    /// An empty query range counts as overlapping when it lies strictly inside a subregion.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        let (start, end) = ordered(start, end);
        let idx = self.first_ending_after(start);
        self.ranges.get(idx).is_some_and(|r| {
            if start == end {
                r.start < start
            } else {
                r.start < end
            }
        })
    }

    /// Add `[start, end)`, merging with overlapping or adjacent subregions.
    pub fn add(&mut self, start: usize, end: usize) {
        let (mut start, mut end) = ordered(start, end);
        if start == end {
            return;
        }

        // First subregion that touches or follows `start`.
        let first = self.ranges.partition_point(|r| r.end < start);
        let mut last = first;
        while last < self.ranges.len() && self.ranges[last].start <= end {
            start = start.min(self.ranges[last].start);
            end = end.max(self.ranges[last].end);
            last += 1;
        }

        self.ranges.splice(first..last, std::iter::once(start..end));
    }

    /// Remove `[start, end)` from the region, splitting subregions where needed.
    pub fn subtract(&mut self, start: usize, end: usize) {
        let (start, end) = ordered(start, end);
        if start == end || self.ranges.is_empty() {
            return;
        }

        let first = self.first_ending_after(start);
        let mut last = first;
        while last < self.ranges.len() && self.ranges[last].start < end {
            last += 1;
        }
        if first == last {
            return;
        }

        let mut kept: Vec<Range<usize>> = Vec::with_capacity(2);
        let head = &self.ranges[first];
        if head.start < start {
            kept.push(head.start..start);
        }
        let tail = &self.ranges[last - 1];
        if tail.end > end {
            kept.push(end..tail.end);
        }

        self.ranges.splice(first..last, kept);
    }

    /// Intersection of the region with `[start, end)`, or `None` if it is empty.
    pub fn intersect(&self, start: usize, end: usize) -> Option<TextRegion> {
        let (start, end) = ordered(start, end);
        if start == end {
            return None;
        }

        let ranges: Vec<Range<usize>> = self.ranges[self.first_ending_after(start)..]
            .iter()
            .take_while(|r| r.start < end)
            .map(|r| r.start.max(start)..r.end.min(end))
            .filter(|r| r.start < r.end)
            .collect();

        if ranges.is_empty() {
            None
        } else {
            Some(TextRegion { ranges })
        }
    }

    /// Remove every subregion.
    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// Replay an insertion of `len` characters at `pos`.
    pub fn update_for_insertion(&mut self, pos: usize, len: usize) {
        if len == 0 {
            return;
        }
        for range in &mut self.ranges {
            if range.start > pos {
                range.start += len;
                range.end += len;
            } else if range.end >= pos {
                range.end += len;
            }
        }
    }

    /// Replay a deletion of `[start, end)`.
    ///
    /// Boundaries inside the deleted span collapse onto `start`; subregions that become empty
    /// are dropped and subregions that become adjacent are merged.
    pub fn update_for_deletion(&mut self, start: usize, end: usize) {
        let (start, end) = ordered(start, end);
        if start == end {
            return;
        }
        let delta = end - start;
        let shift = |offset: usize| {
            if offset <= start {
                offset
            } else if offset >= end {
                offset - delta
            } else {
                start
            }
        };

        let mut merged: Vec<Range<usize>> = Vec::with_capacity(self.ranges.len());
        for range in self.ranges.drain(..) {
            let shifted = shift(range.start)..shift(range.end);
            if shifted.start == shifted.end {
                continue;
            }
            match merged.last_mut() {
                Some(prev) if prev.end >= shifted.start => prev.end = prev.end.max(shifted.end),
                _ => merged.push(shifted),
            }
        }
        self.ranges = merged;
    }

    /// Clamp the region to a buffer of `len` characters.
    pub fn clamp_to_len(&mut self, len: usize) {
        self.ranges.retain_mut(|r| {
            r.end = r.end.min(len);
            r.start < r.end
        });
    }

    fn first_ending_after(&self, offset: usize) -> usize {
        self.ranges.partition_point(|r| r.end <= offset)
    }
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a <= b { (a, b) } else { (b, a) }
}
