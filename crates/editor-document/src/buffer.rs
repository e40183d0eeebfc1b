//! Text storage.
//!
//! [`TextBuffer`] is the mutable text a [`crate::Document`] wraps: a [`ropey::Rope`] addressed
//! by character offsets, plus the state a text widget keeps next to its text (cursor mark, tag
//! table, modified flag, undo history).
//!
//! Every insertion and deletion is appended to a change log. The owning document drains it
//! after each operation to keep its dirty region in sync, so edits made by a content loader
//! while it fills the buffer are tracked the same way as user edits.

use ropey::Rope;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::EditError;
use crate::settings::DocumentSettings;
use crate::tags::{TagId, TagTable};
use crate::undo::{EditRecord, UndoManager};

/// One primitive edit, as reported to the owner of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferChange {
    /// `len` characters were inserted at `start`.
    Inserted {
        /// Character offset of the inserted text.
        start: usize,
        /// Number of inserted characters.
        len: usize,
    },
    /// `[start, end)` (pre-deletion offsets) was deleted.
    Deleted {
        /// Start of the deleted range.
        start: usize,
        /// End of the deleted range, exclusive.
        end: usize,
    },
}

/// Rope-backed text buffer with a cursor, tags and undo history.
#[derive(Debug)]
pub struct TextBuffer {
    rope: Rope,
    /// Cursor mark; right gravity (text inserted at the cursor ends up before it).
    cursor: usize,
    tags: TagTable,
    modified: bool,
    undo: UndoManager,
    changes: Vec<BufferChange>,
    cursor_moved: bool,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextBuffer {
    /// Create an empty, unmodified buffer.
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            cursor: 0,
            tags: TagTable::new(),
            modified: false,
            undo: UndoManager::new(DocumentSettings::DEFAULT_MAX_UNDO_ACTIONS),
            changes: Vec::new(),
            cursor_moved: false,
        }
    }

    /// Create an unmodified buffer holding `text`, with no undo history.
    pub fn from_text(text: &str) -> Self {
        let mut buffer = Self::new();
        buffer.rope = Rope::from_str(text);
        buffer
    }

    /// Number of characters.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Returns `true` if the buffer holds no text.
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// The whole text.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Text of `[start, end)`, clamped to the buffer.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let len = self.len_chars();
        let end = end.min(len);
        let start = start.min(end);
        self.rope.slice(start..end).to_string()
    }

    /// Character at `pos`.
    pub fn char_at(&self, pos: usize) -> Option<char> {
        self.rope.get_char(pos)
    }

    /// Iterate characters starting at `pos` (clamped).
    pub fn chars_at(&self, pos: usize) -> ropey::iter::Chars<'_> {
        self.rope.chars_at(pos.min(self.len_chars()))
    }

    /// Underlying rope.
    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// Number of lines (an empty buffer has one line).
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Line containing `pos` (clamped), 0-based.
    pub fn char_to_line(&self, pos: usize) -> usize {
        self.rope.char_to_line(pos.min(self.len_chars()))
    }

    /// Offset of the first character of `line` (clamped to the last line).
    pub fn line_to_char(&self, line: usize) -> usize {
        let line = line.min(self.line_count().saturating_sub(1));
        self.rope.line_to_char(line)
    }

    /// Start of the line containing `pos`.
    pub fn line_start(&self, pos: usize) -> usize {
        self.rope.line_to_char(self.char_to_line(pos))
    }

    /// End of the line containing `pos`, before its line break.
    pub fn line_end(&self, pos: usize) -> usize {
        let line = self.char_to_line(pos);
        let start = self.rope.line_to_char(line);
        let content = self.rope.line(line);
        start + content.len_chars() - line_break_len(content)
    }

    /// Start of the line `count` lines above the line containing `pos` (stops at line 0).
    pub fn backward_lines(&self, pos: usize, count: usize) -> usize {
        let line = self.char_to_line(pos).saturating_sub(count);
        self.rope.line_to_char(line)
    }

    /// Start of the line `count` lines below the line containing `pos`, or the end of the
    /// buffer when there are not enough lines.
    pub fn forward_lines(&self, pos: usize, count: usize) -> usize {
        let line = self.char_to_line(pos).saturating_add(count);
        if line >= self.line_count() {
            self.len_chars()
        } else {
            self.rope.line_to_char(line)
        }
    }

    /// Returns `true` if a word starts at `pos`.
    pub fn starts_word(&self, pos: usize) -> bool {
        let here = self.char_at(pos).is_some_and(is_word_char);
        let before = pos > 0 && self.char_at(pos - 1).is_some_and(is_word_char);
        here && !before
    }

    /// Returns `true` if a word ends at `pos`.
    pub fn ends_word(&self, pos: usize) -> bool {
        let before = pos > 0 && self.char_at(pos - 1).is_some_and(is_word_char);
        let here = self.char_at(pos).is_some_and(is_word_char);
        before && !here
    }

    /// Returns `true` if `pos` is on a grapheme cluster boundary.
    pub fn is_cursor_position(&self, pos: usize) -> bool {
        let len = self.len_chars();
        if pos > len {
            return false;
        }
        if pos == 0 || pos == len {
            return true;
        }

        let line = self.rope.char_to_line(pos);
        let line_start = self.rope.line_to_char(line);
        if pos == line_start {
            return true;
        }
        let content = self.rope.line(line).to_string();
        let Some((byte, _)) = content.char_indices().nth(pos - line_start) else {
            return true;
        };
        content.grapheme_indices(true).any(|(idx, _)| idx == byte)
    }

    /// Cursor offset.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor to `pos` (clamped).
    pub fn place_cursor(&mut self, pos: usize) {
        let pos = pos.min(self.len_chars());
        self.set_cursor(pos);
    }

    fn set_cursor(&mut self, pos: usize) {
        self.cursor = pos;
        self.cursor_moved = true;
    }

    /// Offset of the bracket matching the one at or just before `pos`.
    ///
    /// Handles `()`, `[]`, `{}` and `<>`; nesting is counted, quoting is not.
    pub fn find_matching_bracket(&self, pos: usize) -> Option<usize> {
        let candidates = [Some(pos), pos.checked_sub(1)];
        let (at, ch) = candidates.into_iter().flatten().find_map(|at| {
            self.char_at(at)
                .filter(|&c| bracket_pair(c).is_some())
                .map(|c| (at, c))
        })?;
        let (open, close, forward) = bracket_pair(ch)?;

        let mut depth = 0usize;
        if forward {
            for (offset, c) in self.rope.chars_at(at).enumerate() {
                if c == open {
                    depth += 1;
                } else if c == close {
                    depth -= 1;
                    if depth == 0 {
                        return Some(at + offset);
                    }
                }
            }
        } else {
            let mut chars = self.rope.chars_at(at + 1);
            let mut offset = at + 1;
            while let Some(c) = chars.prev() {
                offset -= 1;
                if c == close {
                    depth += 1;
                } else if c == open {
                    depth -= 1;
                    if depth == 0 {
                        return Some(offset);
                    }
                }
            }
        }
        None
    }

    /// Tag table.
    pub fn tags(&self) -> &TagTable {
        &self.tags
    }

    /// Tag `[start, end)` (clamped) with `tag`.
    pub fn apply_tag(&mut self, tag: TagId, start: usize, end: usize) {
        let end = end.min(self.len_chars());
        self.tags.apply(tag, start.min(end), end);
    }

    /// Remove `tag` from `[start, end)`.
    pub fn remove_tag(&mut self, tag: TagId, start: usize, end: usize) {
        self.tags.remove(tag, start, end);
    }

    /// Remove `tag` from the whole buffer.
    pub fn remove_all_tags(&mut self, tag: TagId) {
        self.tags.clear_tag(tag);
    }

    /// Insert `text` at `pos`.
    pub fn insert(&mut self, pos: usize, text: &str) -> Result<(), EditError> {
        if pos > self.len_chars() {
            return Err(EditError::InvalidOffset(pos));
        }
        if text.is_empty() {
            return Ok(());
        }
        let cursor_before = self.cursor;
        self.raw_insert(pos, text);
        self.modified = true;
        self.undo.record(
            EditRecord {
                start: pos,
                deleted: String::new(),
                inserted: text.to_string(),
            },
            cursor_before,
            self.cursor,
        );
        Ok(())
    }

    /// Delete `[start, end)`.
    pub fn delete(&mut self, start: usize, end: usize) -> Result<(), EditError> {
        if start > end || end > self.len_chars() {
            return Err(EditError::InvalidRange { start, end });
        }
        if start == end {
            return Ok(());
        }
        let cursor_before = self.cursor;
        let deleted = self.raw_delete(start, end);
        self.modified = true;
        self.undo.record(
            EditRecord {
                start,
                deleted,
                inserted: String::new(),
            },
            cursor_before,
            self.cursor,
        );
        Ok(())
    }

    /// Replace the whole text with `text`, as one undo step.
    pub fn set_text(&mut self, text: &str) -> Result<(), EditError> {
        self.begin_user_action();
        let len = self.len_chars();
        let result = self.delete(0, len).and_then(|()| self.insert(0, text));
        self.end_user_action();
        result
    }

    fn raw_insert(&mut self, pos: usize, text: &str) {
        let len = text.chars().count();
        self.rope.insert(pos, text);
        self.tags.update_for_insertion(pos, len);
        if self.cursor >= pos {
            self.set_cursor(self.cursor + len);
        }
        self.changes.push(BufferChange::Inserted { start: pos, len });
    }

    fn raw_delete(&mut self, start: usize, end: usize) -> String {
        let deleted = self.rope.slice(start..end).to_string();
        self.rope.remove(start..end);
        self.tags.update_for_deletion(start, end);
        if self.cursor > start {
            let cursor = if self.cursor >= end {
                self.cursor - (end - start)
            } else {
                start
            };
            self.set_cursor(cursor);
        }
        self.changes.push(BufferChange::Deleted { start, end });
        deleted
    }

    /// Returns `true` if the text changed since it was last marked unmodified.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Set the modified flag. Clearing it marks the current undo position as clean.
    pub fn set_modified(&mut self, modified: bool) {
        if !modified {
            self.undo.mark_clean();
        }
        self.modified = modified;
    }

    /// Start a user action: edits until the matching [`TextBuffer::end_user_action`] undo as
    /// one step. Nests.
    pub fn begin_user_action(&mut self) {
        self.undo.begin_user_action();
    }

    /// End a user action.
    pub fn end_user_action(&mut self) {
        self.undo.end_user_action();
    }

    /// Returns `true` inside a user action.
    pub fn in_user_action(&self) -> bool {
        self.undo.in_user_action()
    }

    /// Start an action that is not recorded in the undo history. Nests.
    pub fn begin_not_undoable_action(&mut self) {
        self.undo.begin_not_undoable_action();
    }

    /// End a not-undoable action. Ending the outermost one clears the undo history.
    pub fn end_not_undoable_action(&mut self) {
        self.undo.end_not_undoable_action();
    }

    /// Returns `true` if there is something to undo.
    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    /// Returns `true` if there is something to redo.
    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    /// Set the maximum number of undo steps kept; `0` disables undo.
    pub fn set_max_undo_levels(&mut self, levels: usize) {
        self.undo.set_max_undo(levels);
    }

    /// Undo the last step. Returns `false` if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(group) = self.undo.pop_undo_group() else {
            return false;
        };
        for edit in group.edits.iter().rev() {
            let inserted_end = edit.start + edit.inserted_len();
            if inserted_end > edit.start {
                self.raw_delete(edit.start, inserted_end);
            }
            if !edit.deleted.is_empty() {
                self.raw_insert(edit.start, &edit.deleted);
            }
        }
        let cursor = group.cursor_before.min(self.len_chars());
        self.undo.push_undone(group);
        self.set_cursor(cursor);
        self.modified = !self.undo.is_clean();
        true
    }

    /// Redo the last undone step. Returns `false` if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(group) = self.undo.pop_redo_group() else {
            return false;
        };
        for edit in &group.edits {
            let deleted_end = edit.start + edit.deleted_len();
            if deleted_end > edit.start {
                self.raw_delete(edit.start, deleted_end);
            }
            if !edit.inserted.is_empty() {
                self.raw_insert(edit.start, &edit.inserted);
            }
        }
        let cursor = group.cursor_after.min(self.len_chars());
        self.undo.push_redone(group);
        self.set_cursor(cursor);
        self.modified = !self.undo.is_clean();
        true
    }

    /// Drain the change log.
    pub(crate) fn take_changes(&mut self) -> Vec<BufferChange> {
        std::mem::take(&mut self.changes)
    }

    /// Returns whether the cursor was placed or moved since the last call, and resets it.
    pub(crate) fn take_cursor_moved(&mut self) -> bool {
        std::mem::replace(&mut self.cursor_moved, false)
    }
}

/// Word characters for whole-word matching and word boundaries.
pub(crate) fn is_word_char(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

fn line_break_len(line: ropey::RopeSlice<'_>) -> usize {
    let len = line.len_chars();
    if len >= 2 && line.char(len - 2) == '\r' && line.char(len - 1) == '\n' {
        return 2;
    }
    match line.get_char(len.wrapping_sub(1)) {
        Some('\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}') => 1,
        _ => 0,
    }
}

/// `(open, close, scan_forward)` for a bracket character.
fn bracket_pair(ch: char) -> Option<(char, char, bool)> {
    match ch {
        '(' => Some(('(', ')', true)),
        '[' => Some(('[', ']', true)),
        '{' => Some(('{', '}', true)),
        '<' => Some(('<', '>', true)),
        ')' => Some(('(', ')', false)),
        ']' => Some(('[', ']', false)),
        '}' => Some(('{', '}', false)),
        '>' => Some(('<', '>', false)),
        _ => None,
    }
}
