//! Incremental search highlighting.
//!
//! While highlighting is enabled the document keeps a dirty [`TextRegion`]: the parts of the
//! buffer whose [`TagId::FOUND`] tags may not match the current search pattern. Edits add to
//! it; [`Document::reconcile_highlight`] rescans the dirty part of a visible range and marks it
//! clean. Consumers get [`DocumentEvent::SearchHighlightUpdated`] for every range that may
//! need a redraw.
//!
//! Dirty ranges are whole lines widened by the pattern's line span on both sides, so a
//! multi-line match crossing an edited line is rescanned in full. A rescan widens its bounds by
//! the line span again, so a multi-line match crossing the edge of a visible range is found
//! even when only part of it is dirty.

use std::ops::Range;

use crate::buffer::BufferChange;
use crate::document::{Document, DocumentEvent};
use crate::region::TextRegion;
use crate::tags::TagId;

impl Document {
    /// Returns `true` if search highlighting is enabled.
    pub fn is_search_highlighting_enabled(&self) -> bool {
        self.dirty_region.is_some()
    }

    /// Enable or disable search highlighting.
    ///
    /// Enabling with an active pattern highlights the whole document at once. Disabling
    /// removes every found tag.
    pub fn set_enable_search_highlighting(&mut self, enable: bool) {
        if enable == self.is_search_highlighting_enabled() {
            return;
        }
        tracing::debug!(enable, "search highlighting toggled");

        if !enable {
            self.dirty_region = None;
            self.buffer.remove_all_tags(TagId::FOUND);
            return;
        }

        self.dirty_region = Some(TextRegion::new());
        if self.search.can_search_again() {
            let len = self.buffer.len_chars();
            self.invalidate_highlight(0, len);
            self.reconcile_highlight(0..len);
        }
    }

    /// Parts of the buffer whose highlighting is stale, if highlighting is enabled.
    pub fn dirty_region(&self) -> Option<&TextRegion> {
        self.dirty_region.as_ref()
    }

    /// Returns `true` if any part of `range` still needs rescanning.
    pub fn is_highlight_stale(&self, range: Range<usize>) -> bool {
        self.dirty_region
            .as_ref()
            .is_some_and(|region| region.overlaps(range.start, range.end))
    }

    /// Rescan the dirty part of `range` and mark it clean.
    ///
    /// The bounding range of the dirty subregions inside `range`, widened by the pattern's line
    /// span, is searched; exactly those subregions leave the dirty region.
    pub fn reconcile_highlight(&mut self, range: Range<usize>) {
        let Some(dirty) = self
            .dirty_region
            .as_ref()
            .and_then(|region| region.intersect(range.start, range.end))
        else {
            return;
        };
        let Some(bounds) = dirty.bounds() else {
            return;
        };

        tracing::trace!(?range, ?bounds, subregions = dirty.len(), "reconciling highlight");
        self.search_region(bounds.start, bounds.end);

        if let Some(region) = self.dirty_region.as_mut() {
            for sub in dirty.subregions() {
                region.subtract(sub.start, sub.end);
            }
        }
    }

    /// Mark `[start, end)` (widened to whole lines and by the line span) dirty.
    pub(crate) fn invalidate_highlight(&mut self, start: usize, end: usize) {
        if self.dirty_region.is_none() {
            return;
        }
        let span = self.search.line_span();
        let start = self.buffer.backward_lines(start, span);
        let end = self
            .buffer
            .forward_lines(self.buffer.line_end(end), span);
        let (start, end) = self.snap_to_found_tags(start, end);

        tracing::trace!(start, end, "highlight invalidated");
        if let Some(region) = self.dirty_region.as_mut() {
            region.add(start, end);
        }

        let redraw = self.buffer.backward_lines(start, span)..self.buffer.forward_lines(end, span);
        self.emit(DocumentEvent::SearchHighlightUpdated { range: redraw });
    }

    /// Replay buffer edits onto the dirty region and invalidate what they touched.
    pub(crate) fn track_changes(&mut self, changes: &[BufferChange]) {
        let Some(region) = self.dirty_region.as_mut() else {
            return;
        };
        for change in changes {
            match *change {
                BufferChange::Inserted { start, len } => region.update_for_insertion(start, len),
                BufferChange::Deleted { start, end } => region.update_for_deletion(start, end),
            }
        }
        for range in affected_ranges(changes) {
            self.invalidate_highlight(range.start, range.end);
        }
    }

    /// Widen `[start, end)` so no found tag straddles either boundary.
    fn snap_to_found_tags(&self, start: usize, end: usize) -> (usize, usize) {
        let tags = self.buffer.tags();
        let start = tags
            .range_at(TagId::FOUND, start)
            .map_or(start, |tag| tag.start.min(start));
        let end = end
            .checked_sub(1)
            .and_then(|last| tags.range_at(TagId::FOUND, last))
            .map_or(end, |tag| tag.end.max(end));
        (start, end)
    }

    /// Replace the found tags of `[start, end)` with the current pattern's matches.
    fn search_region(&mut self, start: usize, end: usize) {
        let len = self.buffer.len_chars();
        let (start, end) = (start.min(len), end.min(len));
        let Some(pattern) = self.search.text() else {
            return;
        };
        let empty = pattern.is_empty();

        // Guard band on the scan itself: a match crossing either edge lies within `span`
        // lines of it.
        let span = self.search.line_span();
        let start = self.buffer.backward_lines(start, span);
        let end = self.buffer.forward_lines(end, span).max(end);
        let (start, end) = self.snap_to_found_tags(start, end);
        self.buffer.remove_tag(TagId::FOUND, start, end);
        if empty {
            return;
        }

        let matches = match self.search.matcher() {
            Ok(Some(matcher)) => matcher.find_all(&self.buffer, start, end),
            Ok(None) => return,
            Err(error) => {
                tracing::warn!(%error, "search pattern does not compile, nothing highlighted");
                return;
            }
        };
        tracing::trace!(start, end, found = matches.len(), "region searched");
        for m in matches {
            self.buffer.apply_tag(TagId::FOUND, m.start, m.end);
        }
    }
}

/// Ranges touched by a batch of edits, in post-batch offsets, merged and sorted.
fn affected_ranges(changes: &[BufferChange]) -> Vec<Range<usize>> {
    let mut touched: Vec<Range<usize>> = Vec::with_capacity(changes.len());
    for change in changes {
        match *change {
            BufferChange::Inserted { start, len } => {
                for range in &mut touched {
                    if range.start > start {
                        range.start += len;
                    }
                    if range.end >= start {
                        range.end += len;
                    }
                }
                touched.push(start..start + len);
            }
            BufferChange::Deleted { start, end } => {
                let shift = |offset: usize| {
                    if offset <= start {
                        offset
                    } else if offset >= end {
                        offset - (end - start)
                    } else {
                        start
                    }
                };
                for range in &mut touched {
                    *range = shift(range.start)..shift(range.end);
                }
                touched.push(start..start);
            }
        }
    }

    touched.sort_by_key(|range| range.start);
    let mut merged: Vec<Range<usize>> = Vec::with_capacity(touched.len());
    for range in touched {
        match merged.last_mut() {
            Some(prev) if range.start <= prev.end => prev.end = prev.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentContext;
    use crate::search::SearchFlags;

    fn highlighted(text: &str, pattern: &str) -> Document {
        let ctx = DocumentContext::local();
        let mut doc = Document::from_text(&ctx, text);
        doc.set_enable_search_highlighting(true);
        doc.set_search_text(Some(pattern), SearchFlags::empty());
        let len = doc.buffer().len_chars();
        doc.reconcile_highlight(0..len);
        doc
    }

    #[test]
    fn test_affected_ranges_map_through_later_edits() {
        let changes = [
            BufferChange::Inserted { start: 10, len: 2 },
            BufferChange::Inserted { start: 0, len: 3 },
            BufferChange::Deleted { start: 20, end: 25 },
        ];
        assert_eq!(affected_ranges(&changes), vec![0..3, 13..15, 20..20]);
    }

    #[test]
    fn test_reconcile_tags_matches() {
        let doc = highlighted("foo bar\nbar foo\n", "foo");
        assert_eq!(doc.buffer().tags().ranges(TagId::FOUND), &[0..3, 12..15]);
        assert!(doc.dirty_region().is_some_and(TextRegion::is_empty));
    }

    #[test]
    fn test_edit_dirties_whole_lines() {
        let mut doc = highlighted("one\ntwo\nthree\nfour\nfive\n", "o");
        doc.insert(15, "x").unwrap();

        // Line 3 plus one line of guard band on each side.
        let dirty = doc.dirty_region().unwrap().subregions().to_vec();
        assert_eq!(dirty, vec![8..20]);
        assert!(doc.is_highlight_stale(9..10));
        assert!(!doc.is_highlight_stale(0..4));
    }

    #[test]
    fn test_disable_removes_tags() {
        let mut doc = highlighted("foo foo", "foo");
        assert_eq!(doc.buffer().tags().ranges(TagId::FOUND).len(), 2);

        doc.set_enable_search_highlighting(false);
        assert!(doc.buffer().tags().ranges(TagId::FOUND).is_empty());
        assert!(doc.dirty_region().is_none());
        assert!(!doc.is_highlight_stale(0..7));
    }
}
