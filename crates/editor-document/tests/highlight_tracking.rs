use std::cell::RefCell;
use std::rc::Rc;

use editor_document::{
    Document, DocumentContext, DocumentEvent, DocumentSettings, Matcher, SearchFlags, TagId,
    TextRegion,
};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn ten_lines() -> String {
    (0..10).map(|i| format!("line {i}\n")).collect()
}

fn highlighted(text: &str, pattern: &str) -> Document {
    let mut doc = Document::from_text(&DocumentContext::local(), text);
    doc.set_search_text(Some(pattern), SearchFlags::empty());
    doc
}

fn expected_tags(doc: &Document, pattern: &str) -> Vec<std::ops::Range<usize>> {
    let matcher = Matcher::new(pattern, SearchFlags::empty()).unwrap();
    let len = doc.buffer().len_chars();
    let matches = matcher.find_all(doc.buffer(), 0, len);
    TextRegion::from_ranges(matches.into_iter().map(|m| m.start..m.end))
        .subregions()
        .to_vec()
}

#[test]
fn test_reconciled_range_is_clean() {
    let text = ten_lines();
    let mut doc = highlighted(&text, "line");
    assert!(doc.is_highlight_stale(0..70));

    doc.reconcile_highlight(14..35);
    assert!(!doc.is_highlight_stale(14..35));
    assert!(doc.is_highlight_stale(0..14));
    assert!(doc.is_highlight_stale(35..70));

    // Lines 2 to 5 were scanned in full.
    assert_eq!(
        doc.buffer().tags().ranges_in(TagId::FOUND, 14, 35),
        &[14..18, 21..25, 28..32]
    );
}

#[test]
fn test_reconcile_keeps_gaps_between_dirty_subregions() {
    let text = ten_lines();
    let mut doc = highlighted(&text, "line");
    doc.reconcile_highlight(0..70);
    assert!(doc.dirty_region().is_some_and(TextRegion::is_empty));

    // Two edits far apart: lines 0-1 and 6-7 become dirty, lines 2-5 stay clean.
    doc.insert(8, "x").unwrap();
    doc.insert(52, "y").unwrap();
    let dirty = doc.dirty_region().unwrap().subregions().to_vec();
    assert_eq!(dirty, vec![0..15, 43..58]);

    // A visible range covering part of both subregions and the gap between them.
    doc.reconcile_highlight(10..50);
    let dirty = doc.dirty_region().unwrap().subregions().to_vec();
    assert_eq!(dirty, vec![0..10, 50..58]);
    assert!(!doc.is_highlight_stale(15..43));
}

#[test]
fn test_edit_after_reconcile_redirties_with_line_span_guard() {
    let text = ten_lines();
    let mut doc = highlighted(&text, "foo\\nbar");
    assert_eq!(doc.search_state().line_span(), 2);
    doc.reconcile_highlight(0..70);

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    doc.subscribe(move |event| sink.borrow_mut().push(event.clone()));

    // Middle of line 5.
    doc.insert(37, "x").unwrap();

    let dirty = doc.dirty_region().unwrap().subregions().to_vec();
    assert_eq!(dirty, vec![21..50]);
    assert!(doc.is_highlight_stale(37..38));
    assert!(!doc.is_highlight_stale(0..21));
    assert!(!doc.is_highlight_stale(50..71));

    assert!(
        events
            .borrow()
            .contains(&DocumentEvent::SearchHighlightUpdated { range: 7..64 })
    );
}

#[test]
fn test_invalidation_snaps_past_found_tags() {
    let mut doc = highlighted("ab\ncd\nxx long match xx\nef\ngh\n", "long match");
    doc.reconcile_highlight(0..30);
    assert_eq!(doc.buffer().tags().ranges(TagId::FOUND), &[9..19]);

    doc.set_search_text(Some("long match xx\\nef"), SearchFlags::empty());
    doc.reconcile_highlight(0..30);
    assert_eq!(doc.buffer().tags().ranges(TagId::FOUND), &[9..25]);
    assert!(doc.dirty_region().is_some_and(TextRegion::is_empty));

    // Editing the last line dirties lines 3 to 5; the tag reaching into line 3 pulls the
    // start back to where the match begins.
    doc.insert(29, "z").unwrap();
    let dirty = doc.dirty_region().unwrap().subregions().to_vec();
    assert_eq!(dirty, vec![9..30]);
}

#[test]
fn test_enable_then_disable_leaves_no_tags() {
    let settings = DocumentSettings {
        search_highlighting: false,
        ..DocumentSettings::default()
    };
    let ctx = DocumentContext::with_settings(settings);
    let mut doc = Document::from_text(&ctx, "cat cat\ncat\n");
    doc.set_search_text(Some("cat"), SearchFlags::empty());
    assert!(!doc.is_search_highlighting_enabled());
    assert!(doc.buffer().tags().ranges(TagId::FOUND).is_empty());

    doc.set_enable_search_highlighting(true);
    assert_eq!(
        doc.buffer().tags().ranges(TagId::FOUND),
        &[0..3, 4..7, 8..11]
    );
    assert!(doc.dirty_region().is_some_and(TextRegion::is_empty));

    doc.set_enable_search_highlighting(false);
    assert!(doc.buffer().tags().ranges(TagId::FOUND).is_empty());
    assert!(doc.buffer().tags().is_empty());
}

#[test]
fn test_clearing_pattern_removes_tags() {
    let mut doc = highlighted("cat cat", "cat");
    doc.reconcile_highlight(0..7);
    assert_eq!(doc.buffer().tags().ranges(TagId::FOUND).len(), 2);

    doc.set_search_text(Some(""), SearchFlags::DONT_SET_FLAGS);
    doc.reconcile_highlight(0..7);
    assert!(doc.buffer().tags().ranges(TagId::FOUND).is_empty());
}

#[test]
fn test_undo_invalidates_restored_text() {
    let mut doc = highlighted("one\ntwo\nthree\n", "two");
    doc.reconcile_highlight(0..14);
    doc.delete(4, 7).unwrap();
    doc.reconcile_highlight(0..11);
    assert!(doc.buffer().tags().ranges(TagId::FOUND).is_empty());

    assert!(doc.undo());
    assert!(doc.is_highlight_stale(4..7));
    doc.reconcile_highlight(0..14);
    assert_eq!(doc.buffer().tags().ranges(TagId::FOUND), &[4..7]);
}

#[test]
fn test_multiline_match_across_reconcile_slices() {
    let mut doc = highlighted("a\nb\nc\nzz\n", "a\\nb\\nc");
    assert_eq!(doc.search_state().line_span(), 3);

    // The first slice holds only the start of the match, the second only its end.
    doc.reconcile_highlight(0..2);
    doc.reconcile_highlight(2..9);
    assert!(doc.dirty_region().is_some_and(TextRegion::is_empty));
    assert_eq!(doc.buffer().tags().ranges(TagId::FOUND), &[0..5]);
    assert_eq!(expected_tags(&doc, "a\nb\nc"), vec![0..5]);
}

#[test]
fn test_sliced_reconcile_equals_full_scan() {
    let text: String = (0..12)
        .map(|i| if i % 3 == 0 { "end\nstart x\n" } else { "start\nend\n" })
        .collect();
    let mut doc = highlighted(&text, "end\\nstart");
    let len = doc.buffer().len_chars();

    // Viewport-sized slices that cut most matches in two.
    let mut at = 0;
    while at < len {
        let next = (at + 7).min(len);
        doc.reconcile_highlight(at..next);
        at = next;
    }
    assert!(doc.dirty_region().is_some_and(TextRegion::is_empty));
    assert_eq!(
        doc.buffer().tags().ranges(TagId::FOUND).to_vec(),
        expected_tags(&doc, "end\nstart")
    );
}

/// Random inserts, deletes and partial reconciles, then a full reconcile must agree with a
/// fresh scan. `pattern` is what the user types, `literal` its unescaped text.
fn assert_random_edits_converge(pattern: &str, literal: &str, seed: u64) {
    const ALPHABET: &[char] = &['a', 'b', 'c', ' ', '\n'];

    let mut rng = StdRng::seed_from_u64(seed);
    let initial: String = (0..400)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())])
        .collect();
    let mut doc = highlighted(&initial, pattern);
    doc.reconcile_highlight(0..initial.len());

    for _ in 0..300 {
        let len = doc.buffer().len_chars();
        match rng.gen_range(0..3) {
            0 => {
                let pos = rng.gen_range(0..=len);
                let text: String = (0..rng.gen_range(1..4))
                    .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())])
                    .collect();
                doc.insert(pos, &text).unwrap();
                assert!(doc.is_highlight_stale(pos..pos + text.chars().count()));
            }
            1 if len > 0 => {
                let start = rng.gen_range(0..len);
                let end = (start + rng.gen_range(1..4)).min(len);
                doc.delete(start, end).unwrap();
            }
            _ => {
                let start = rng.gen_range(0..=len);
                let end = rng.gen_range(start..=len);
                doc.reconcile_highlight(start..end);
                if start < end {
                    assert!(!doc.is_highlight_stale(start..end));
                }
            }
        }
    }

    let len = doc.buffer().len_chars();
    doc.reconcile_highlight(0..len);
    assert!(doc.dirty_region().is_some_and(TextRegion::is_empty));
    assert_eq!(
        doc.buffer().tags().ranges(TagId::FOUND).to_vec(),
        expected_tags(&doc, literal)
    );
}

#[test]
fn test_random_edits_converge_to_full_scan() {
    assert_random_edits_converge("ab", "ab", 0x5eed);
}

#[test]
fn test_random_edits_converge_with_multiline_pattern() {
    assert_random_edits_converge("b\\na", "b\na", 0x5eed);
    assert_random_edits_converge("b\\na", "b\na", 0xbead);
}
