//! Range tags on the text buffer.
//!
//! A tag marks character ranges of the buffer (the document uses [`TagId::FOUND`] for search
//! matches). Ranges of the same tag never overlap: applying a tag over a range that is already
//! (partially) tagged merges them, like toggling a tag in a text widget.
//!
//! Unlike [`crate::TextRegion`], text inserted into the middle of a tagged range is **not**
//! tagged: the range is split around the insertion.

use std::collections::BTreeMap;
use std::ops::Range;

/// Tag identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TagId(pub u32);

impl TagId {
    /// Create a tag id from a raw numeric identifier.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Search match highlighting.
    pub const FOUND: Self = Self(1);
}

/// Tagged ranges of a buffer, grouped by tag.
#[derive(Debug, Clone, Default)]
pub struct TagTable {
    /// Per tag: sorted, disjoint, non-adjacent, non-empty ranges.
    tags: BTreeMap<TagId, Vec<Range<usize>>>,
}

impl TagTable {
    /// Create an empty tag table.
    pub fn new() -> Self {
        Self {
            tags: BTreeMap::new(),
        }
    }

    /// Tag `[start, end)` with `tag`.
    pub fn apply(&mut self, tag: TagId, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let ranges = self.tags.entry(tag).or_default();

        let first = ranges.partition_point(|r| r.end < start);
        let mut last = first;
        let (mut start, mut end) = (start, end);
        while last < ranges.len() && ranges[last].start <= end {
            start = start.min(ranges[last].start);
            end = end.max(ranges[last].end);
            last += 1;
        }
        ranges.splice(first..last, std::iter::once(start..end));
    }

    /// Remove `tag` from `[start, end)`.
    pub fn remove(&mut self, tag: TagId, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let Some(ranges) = self.tags.get_mut(&tag) else {
            return;
        };

        let first = ranges.partition_point(|r| r.end <= start);
        let mut last = first;
        while last < ranges.len() && ranges[last].start < end {
            last += 1;
        }
        if first == last {
            return;
        }

        let mut kept: Vec<Range<usize>> = Vec::with_capacity(2);
        if ranges[first].start < start {
            kept.push(ranges[first].start..start);
        }
        if ranges[last - 1].end > end {
            kept.push(end..ranges[last - 1].end);
        }
        ranges.splice(first..last, kept);

        if ranges.is_empty() {
            self.tags.remove(&tag);
        }
    }

    /// Remove every range of `tag`.
    pub fn clear_tag(&mut self, tag: TagId) {
        self.tags.remove(&tag);
    }

    /// All ranges of `tag`.
    pub fn ranges(&self, tag: TagId) -> &[Range<usize>] {
        self.tags.get(&tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ranges of `tag` overlapping `[start, end)`.
    pub fn ranges_in(&self, tag: TagId, start: usize, end: usize) -> &[Range<usize>] {
        let ranges = self.ranges(tag);
        let first = ranges.partition_point(|r| r.end <= start);
        let last = ranges.partition_point(|r| r.start < end);
        if first >= last {
            &[]
        } else {
            &ranges[first..last]
        }
    }

    /// Total number of tagged ranges across all tags.
    pub fn len(&self) -> usize {
        self.tags.values().map(Vec::len).sum()
    }

    /// Returns `true` if nothing is tagged.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// The range of `tag` containing the character at `pos`, if any.
    pub fn range_at(&self, tag: TagId, pos: usize) -> Option<Range<usize>> {
        let ranges = self.ranges(tag);
        let idx = ranges.partition_point(|r| r.end <= pos);
        ranges
            .get(idx)
            .filter(|r| r.start <= pos)
            .cloned()
    }

    /// Returns `true` if the character at `pos` carries `tag`.
    pub fn has_tag(&self, tag: TagId, pos: usize) -> bool {
        self.range_at(tag, pos).is_some()
    }

    /// Returns `true` if a range of `tag` starts exactly at `pos`.
    pub fn starts_tag(&self, tag: TagId, pos: usize) -> bool {
        self.range_at(tag, pos).is_some_and(|r| r.start == pos)
    }

    /// Returns `true` if a range of `tag` ends exactly at `pos`.
    pub fn ends_tag(&self, tag: TagId, pos: usize) -> bool {
        let ranges = self.ranges(tag);
        ranges.binary_search_by_key(&pos, |r| r.end).is_ok()
    }

    /// Replay an insertion of `len` characters at `pos`.
    pub fn update_for_insertion(&mut self, pos: usize, len: usize) {
        if len == 0 {
            return;
        }
        for ranges in self.tags.values_mut() {
            let mut updated: Vec<Range<usize>> = Vec::with_capacity(ranges.len() + 1);
            for range in ranges.drain(..) {
                if range.start >= pos {
                    updated.push(range.start + len..range.end + len);
                } else if range.end > pos {
                    // Inserted text is untagged: split around it.
                    updated.push(range.start..pos);
                    updated.push(pos + len..range.end + len);
                } else {
                    updated.push(range);
                }
            }
            *ranges = updated;
        }
    }

    /// Replay a deletion of `[start, end)`.
    pub fn update_for_deletion(&mut self, start: usize, end: usize) {
        if start >= end {
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

        for ranges in self.tags.values_mut() {
            let mut updated: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
            for range in ranges.drain(..) {
                let shifted = shift(range.start)..shift(range.end);
                if shifted.is_empty() {
                    continue;
                }
                match updated.last_mut() {
                    Some(prev) if prev.end >= shifted.start => {
                        prev.end = prev.end.max(shifted.end)
                    }
                    _ => updated.push(shifted),
                }
            }
            *ranges = updated;
        }
        self.tags.retain(|_, ranges| !ranges.is_empty());
    }
}
