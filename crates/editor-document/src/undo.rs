//! Undo/redo history of a [`crate::TextBuffer`].
//!
//! History is a linear list of groups. Every primitive edit is recorded as an [`EditRecord`];
//! edits made inside a user action (`begin_user_action`/`end_user_action`) share one group, so
//! they undo and redo together. Outside a user action each edit is its own group.

/// One primitive edit: `deleted` was removed at `start`, then `inserted` was inserted there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EditRecord {
    pub(crate) start: usize,
    pub(crate) deleted: String,
    pub(crate) inserted: String,
}

impl EditRecord {
    pub(crate) fn inserted_len(&self) -> usize {
        self.inserted.chars().count()
    }

    pub(crate) fn deleted_len(&self) -> usize {
        self.deleted.chars().count()
    }
}

/// Edits that undo/redo as a unit, with the cursor before and after them.
#[derive(Debug, Clone)]
pub(crate) struct UndoGroup {
    pub(crate) edits: Vec<EditRecord>,
    pub(crate) cursor_before: usize,
    pub(crate) cursor_after: usize,
}

#[derive(Debug)]
pub(crate) struct UndoManager {
    undo_stack: Vec<UndoGroup>,
    redo_stack: Vec<UndoGroup>,
    /// `0` disables recording.
    max_undo: usize,
    /// Clean point, as `undo_stack.len()` at the time the buffer was last marked unmodified.
    /// May be greater than `undo_stack.len()` while the clean point sits in the redo area.
    clean_index: Option<usize>,
    /// Nesting depth of user actions; an open group collects edits while it is > 0.
    user_action_depth: usize,
    group_open: bool,
    /// Nesting depth of not-undoable actions; nothing is recorded while it is > 0.
    not_undoable_depth: usize,
}

impl UndoManager {
    pub(crate) fn new(max_undo: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_undo,
            clean_index: Some(0),
            user_action_depth: 0,
            group_open: false,
            not_undoable_depth: 0,
        }
    }

    pub(crate) fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty() && self.user_action_depth == 0
    }

    pub(crate) fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty() && self.user_action_depth == 0
    }

    pub(crate) fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub(crate) fn is_clean(&self) -> bool {
        self.clean_index == Some(self.undo_stack.len())
    }

    pub(crate) fn mark_clean(&mut self) {
        self.clean_index = Some(self.undo_stack.len());
        self.group_open = false;
    }

    pub(crate) fn is_recording(&self) -> bool {
        self.not_undoable_depth == 0 && self.max_undo > 0
    }

    pub(crate) fn set_max_undo(&mut self, max_undo: usize) {
        self.max_undo = max_undo;
        self.trim_to_max();
    }

    pub(crate) fn begin_user_action(&mut self) {
        if self.user_action_depth == 0 {
            self.group_open = false;
        }
        self.user_action_depth += 1;
    }

    /// Returns `true` when the outermost user action ended.
    pub(crate) fn end_user_action(&mut self) -> bool {
        match self.user_action_depth {
            0 => false,
            1 => {
                self.user_action_depth = 0;
                self.group_open = false;
                true
            }
            _ => {
                self.user_action_depth -= 1;
                false
            }
        }
    }

    pub(crate) fn in_user_action(&self) -> bool {
        self.user_action_depth > 0
    }

    pub(crate) fn begin_not_undoable_action(&mut self) {
        self.not_undoable_depth += 1;
    }

    /// Ends a not-undoable action; the outermost one forgets the whole history.
    pub(crate) fn end_not_undoable_action(&mut self) {
        if self.not_undoable_depth == 0 {
            return;
        }
        self.not_undoable_depth -= 1;
        if self.not_undoable_depth == 0 {
            self.clear();
        }
    }

    pub(crate) fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.clean_index = None;
        self.group_open = false;
    }

    fn clear_redo_and_adjust_clean(&mut self) {
        if self.redo_stack.is_empty() {
            return;
        }

        // A clean point in the redo area becomes unreachable.
        if let Some(clean_index) = self.clean_index
            && clean_index > self.undo_stack.len()
        {
            self.clean_index = None;
        }

        self.redo_stack.clear();
    }

    fn trim_to_max(&mut self) {
        if self.max_undo == 0 {
            self.clear();
            return;
        }
        while self.undo_stack.len() > self.max_undo {
            self.undo_stack.remove(0);
            self.clean_index = match self.clean_index {
                Some(0) | None => None,
                Some(clean_index) => Some(clean_index - 1),
            };
        }
    }

    /// Record an edit made while the cursor was at `cursor_before` and left it at
    /// `cursor_after`.
    pub(crate) fn record(&mut self, edit: EditRecord, cursor_before: usize, cursor_after: usize) {
        if !self.is_recording() {
            return;
        }
        self.clear_redo_and_adjust_clean();

        if self.group_open
            && self.clean_index != Some(self.undo_stack.len())
            && let Some(group) = self.undo_stack.last_mut()
        {
            group.edits.push(edit);
            group.cursor_after = cursor_after;
            return;
        }

        self.undo_stack.push(UndoGroup {
            edits: vec![edit],
            cursor_before,
            cursor_after,
        });
        self.group_open = self.user_action_depth > 0;
        self.trim_to_max();
    }

    pub(crate) fn pop_undo_group(&mut self) -> Option<UndoGroup> {
        if self.user_action_depth > 0 {
            return None;
        }
        self.group_open = false;
        self.undo_stack.pop()
    }

    pub(crate) fn pop_redo_group(&mut self) -> Option<UndoGroup> {
        if self.user_action_depth > 0 {
            return None;
        }
        self.group_open = false;
        self.redo_stack.pop()
    }

    pub(crate) fn push_undone(&mut self, group: UndoGroup) {
        self.redo_stack.push(group);
    }

    pub(crate) fn push_redone(&mut self, group: UndoGroup) {
        self.undo_stack.push(group);
    }
}
