//! The document: a [`TextBuffer`] with identity, search state and highlight tracking.
//!
//! # Overview
//!
//! A [`Document`] owns its buffer and everything an editor needs to know about it besides the
//! text: where it lives, how it is encoded, whether it changed on disk, what the user is
//! searching for and which parts of the search highlighting are stale.
//!
//! Edits go through the document (or [`Document::with_buffer`]) so the document sees every
//! change synchronously: the dirty region is updated and observers are notified before the
//! editing method returns.
//!
//! Load and save sessions live in [`crate::session`], highlight tracking in
//! [`crate::highlight`]; both are further `impl Document` blocks.
//!
//! # Example
//!
//! ```rust
//! use editor_document::{Document, DocumentContext, SearchFlags};
//!
//! let ctx = DocumentContext::local();
//! let mut doc = Document::from_text(&ctx, "a cat a");
//!
//! let replaced = doc.replace_all(Some("a"), "A", SearchFlags::ENTIRE_WORD).unwrap();
//! assert_eq!(replaced, 2);
//! assert_eq!(doc.text(), "A cat A");
//! ```

use std::ops::{Deref, DerefMut};
use std::rc::Rc;
use std::time::Instant;

use crate::buffer::TextBuffer;
use crate::content_type::{self, DEFAULT_CONTENT_TYPE, NO_LANGUAGE};
use crate::encoding::Encoding;
use crate::error::{DocumentError, EditError};
use crate::fs::{FileLoader, FileSaver};
use crate::io::{ContentLoader, ContentSaver};
use crate::line_ending::NewlineType;
use crate::location::Location;
use crate::metadata::{
    ENCODING_KEY, LANGUAGE_KEY, MemoryMetadataStore, MetadataStore, POSITION_KEY,
};
use crate::region::TextRegion;
use crate::search::{
    Matcher, SearchError, SearchFlags, SearchMatch, SearchState, unescape_search_text,
};
use crate::session::{LoadSession, SaveSession};
use crate::settings::{DocumentSettings, SettingsProvider};
use crate::untitled::{UntitledNumber, UntitledNumbers};

/// Notification sent to [`Document::subscribe`] callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// Load progress.
    Loading {
        /// Bytes read so far.
        bytes_read: u64,
        /// Total size, or 0 if unknown.
        total: u64,
    },
    /// A load finished. `error` is `None` on success.
    Loaded {
        /// Failure of the load, if any.
        error: Option<DocumentError>,
    },
    /// Save progress.
    Saving {
        /// Bytes written so far.
        bytes_written: u64,
        /// Total size to write.
        total: u64,
    },
    /// A save finished. `error` is `None` on success.
    Saved {
        /// Failure of the save, if any.
        error: Option<DocumentError>,
    },
    /// The cursor moved or the content changed.
    CursorMoved,
    /// Search highlighting in `range` may have changed and should be redrawn.
    SearchHighlightUpdated {
        /// Character range to redraw.
        range: std::ops::Range<usize>,
    },
    /// [`Document::can_search_again`] flipped.
    CanSearchAgainChanged,
}

/// Document event callback.
pub type DocumentEventCallback = Box<dyn FnMut(&DocumentEvent)>;

/// Collaborators shared by the documents of an application.
#[derive(Clone)]
pub struct DocumentContext {
    /// Policy switches.
    pub settings: Rc<dyn SettingsProvider>,
    /// Per-location metadata.
    pub metadata: Rc<dyn MetadataStore>,
    /// Untitled number pool.
    pub untitled: UntitledNumbers,
    /// Starts load jobs.
    pub loader: Rc<dyn ContentLoader>,
    /// Starts save jobs.
    pub saver: Rc<dyn ContentSaver>,
}

impl DocumentContext {
    /// Default settings, in-memory metadata and local file I/O.
    pub fn local() -> Self {
        Self::with_settings(DocumentSettings::default())
    }

    /// Like [`DocumentContext::local`] with the given settings.
    pub fn with_settings(settings: impl SettingsProvider + 'static) -> Self {
        Self {
            settings: Rc::new(settings),
            metadata: Rc::new(MemoryMetadataStore::new()),
            untitled: UntitledNumbers::new(),
            loader: Rc::new(FileLoader::new()),
            saver: Rc::new(FileSaver::new()),
        }
    }
}

impl std::fmt::Debug for DocumentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentContext")
            .field("untitled", &self.untitled)
            .finish_non_exhaustive()
    }
}

/// A text buffer with identity, load/save sessions, search state and highlight tracking.
pub struct Document {
    pub(crate) buffer: TextBuffer,
    pub(crate) settings: Rc<dyn SettingsProvider>,
    pub(crate) metadata: Rc<dyn MetadataStore>,
    pub(crate) loader: Rc<dyn ContentLoader>,
    pub(crate) saver: Rc<dyn ContentSaver>,

    pub(crate) location: Option<Location>,
    /// Held while the document has no location.
    untitled: Option<UntitledNumber>,
    short_name: Option<String>,
    pub(crate) content_type: String,
    language: Option<String>,
    language_set_by_user: bool,
    pub(crate) encoding: Encoding,
    pub(crate) newline_type: NewlineType,
    pub(crate) readonly: bool,
    /// Last known modification time, µs since the epoch.
    pub(crate) mtime: i64,
    pub(crate) last_save_or_load: Instant,
    pub(crate) hide_trailing_newline: bool,

    pub(crate) load_session: Option<LoadSession>,
    pub(crate) save_session: Option<SaveSession>,

    pub(crate) search: SearchState,
    /// Present while search highlighting is enabled.
    pub(crate) dirty_region: Option<TextRegion>,

    stop_cursor_moved_emission: bool,
    highlight_matching_brackets: bool,
    matching_bracket: Option<usize>,

    callbacks: Vec<DocumentEventCallback>,
}

impl Document {
    /// Create an empty untitled document.
    pub fn new(ctx: &DocumentContext) -> Self {
        Self::from_text(ctx, "")
    }

    /// Create an untitled, unmodified document holding `text`.
    pub fn from_text(ctx: &DocumentContext, text: &str) -> Self {
        let settings = Rc::clone(&ctx.settings);
        let mut buffer = TextBuffer::from_text(text);
        buffer.set_max_undo_levels(settings.max_undo_actions());

        let untitled = ctx.untitled.allocate();
        tracing::debug!(untitled = untitled.get(), "document created");

        Self {
            buffer,
            metadata: Rc::clone(&ctx.metadata),
            loader: Rc::clone(&ctx.loader),
            saver: Rc::clone(&ctx.saver),
            location: None,
            untitled: Some(untitled),
            short_name: None,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            language: None,
            language_set_by_user: false,
            encoding: Encoding::UTF_8,
            newline_type: NewlineType::default(),
            readonly: false,
            mtime: 0,
            last_save_or_load: Instant::now(),
            hide_trailing_newline: settings.hide_trailing_newline(),
            load_session: None,
            save_session: None,
            search: SearchState::new(),
            dirty_region: settings.search_highlighting().then(TextRegion::new),
            stop_cursor_moved_emission: false,
            highlight_matching_brackets: settings.bracket_matching(),
            matching_bracket: None,
            callbacks: Vec::new(),
            settings,
        }
    }

    /// Subscribe to document events.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&DocumentEvent) + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    pub(crate) fn emit(&mut self, event: DocumentEvent) {
        for callback in &mut self.callbacks {
            callback(&event);
        }
    }

    fn emit_cursor_moved(&mut self) {
        if !self.stop_cursor_moved_emission {
            self.emit(DocumentEvent::CursorMoved);
        }
    }

    // ---- Buffer access -------------------------------------------------------------------

    /// The text buffer.
    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    /// Run `f` on the buffer, then process the edits it made.
    pub fn with_buffer<R>(&mut self, f: impl FnOnce(&mut TextBuffer) -> R) -> R {
        let result = f(&mut self.buffer);
        self.sync_buffer();
        result
    }

    /// The whole text.
    pub fn text(&self) -> String {
        self.buffer.text()
    }

    /// Cursor offset.
    pub fn cursor(&self) -> usize {
        self.buffer.cursor()
    }

    /// Insert `text` at `pos`.
    pub fn insert(&mut self, pos: usize, text: &str) -> Result<(), EditError> {
        let result = self.buffer.insert(pos, text);
        self.sync_buffer();
        result
    }

    /// Delete `[start, end)`.
    pub fn delete(&mut self, start: usize, end: usize) -> Result<(), EditError> {
        let result = self.buffer.delete(start, end);
        self.sync_buffer();
        result
    }

    /// Replace the whole text, as one undo step.
    pub fn set_text(&mut self, text: &str) -> Result<(), EditError> {
        let result = self.buffer.set_text(text);
        self.sync_buffer();
        result
    }

    /// Move the cursor to `pos` (clamped).
    pub fn place_cursor(&mut self, pos: usize) {
        self.buffer.place_cursor(pos);
        self.sync_buffer();
    }

    /// Group the following edits into one undo step until [`Document::end_user_action`].
    pub fn begin_user_action(&mut self) {
        self.buffer.begin_user_action();
    }

    /// End a user action.
    pub fn end_user_action(&mut self) {
        self.buffer.end_user_action();
    }

    /// Undo the last step.
    pub fn undo(&mut self) -> bool {
        let undone = self.buffer.undo();
        self.sync_buffer();
        undone
    }

    /// Redo the last undone step.
    pub fn redo(&mut self) -> bool {
        let redone = self.buffer.redo();
        self.sync_buffer();
        redone
    }

    /// Returns `true` if there is something to undo.
    pub fn can_undo(&self) -> bool {
        self.buffer.can_undo()
    }

    /// Returns `true` if there is something to redo.
    pub fn can_redo(&self) -> bool {
        self.buffer.can_redo()
    }

    /// Returns `true` if the text changed since the last load or save.
    pub fn is_modified(&self) -> bool {
        self.buffer.is_modified()
    }

    /// Process edits and cursor moves recorded by the buffer since the last call.
    pub(crate) fn sync_buffer(&mut self) {
        let changes = self.buffer.take_changes();
        let cursor_moved = self.buffer.take_cursor_moved();
        if changes.is_empty() && !cursor_moved {
            return;
        }

        self.track_changes(&changes);
        if self.highlight_matching_brackets {
            self.matching_bracket = self.buffer.find_matching_bracket(self.buffer.cursor());
        }
        self.emit_cursor_moved();
    }

    // ---- Bracket matching ----------------------------------------------------------------

    /// Whether the bracket matching the one at the cursor is tracked.
    pub fn highlights_matching_brackets(&self) -> bool {
        self.highlight_matching_brackets
    }

    /// Enable or disable bracket matching.
    pub fn set_highlight_matching_brackets(&mut self, enable: bool) {
        self.highlight_matching_brackets = enable;
        self.matching_bracket = if enable {
            self.buffer.find_matching_bracket(self.buffer.cursor())
        } else {
            None
        };
    }

    /// Offset of the bracket matching the one at (or just before) the cursor.
    pub fn matching_bracket(&self) -> Option<usize> {
        self.matching_bracket
    }

    // ---- Identity -------------------------------------------------------------------------

    /// Where the document lives, or `None` for untitled documents.
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub(crate) fn set_location(&mut self, location: Location) {
        if self.location.as_ref() == Some(&location) {
            return;
        }
        self.location = Some(location);
        // Dropping the handle returns the number to the pool.
        self.untitled = None;
    }

    /// Untitled number, while the document has no location.
    pub fn untitled_number(&self) -> Option<u32> {
        self.untitled.as_ref().map(UntitledNumber::get)
    }

    /// Display name override.
    pub fn short_name(&self) -> Option<&str> {
        self.short_name.as_deref()
    }

    /// Set the display name override.
    pub fn set_short_name(&mut self, name: Option<&str>) {
        self.short_name = name.map(str::to_string);
    }

    /// MIME content type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Set the content type; `None` guesses it from the file name.
    pub fn set_content_type(&mut self, content_type: Option<&str>) {
        let guessed = match content_type {
            Some(content_type) => Some(content_type.to_string()),
            None => self
                .location
                .as_ref()
                .and_then(Location::basename)
                .and_then(|name| content_type::guess_from_name(&name))
                .map(str::to_string),
        };
        let content_type = guessed
            .filter(|ct| !content_type::is_unknown(ct))
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        if content_type == self.content_type {
            return;
        }
        tracing::debug!(content_type = %content_type, "content type changed");
        self.content_type = content_type;
        self.refresh_language();
    }

    /// Guess the language again unless the user picked one.
    pub(crate) fn refresh_language(&mut self) {
        if !self.language_set_by_user {
            let language = self.guess_language();
            self.apply_language(language, false);
        }
    }

    /// Language id (syntax), or `None` for plain text.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Set the language on behalf of the user; it is remembered in metadata.
    pub fn set_language(&mut self, language: Option<&str>) {
        self.apply_language(language.map(str::to_string), true);
    }

    /// Returns `true` if the language was chosen by the user.
    pub fn language_set_by_user(&self) -> bool {
        self.language_set_by_user
    }

    fn guess_language(&self) -> Option<String> {
        if let Some(stored) = self.get_metadata(LANGUAGE_KEY) {
            return (stored != NO_LANGUAGE).then_some(stored);
        }
        let name = self
            .location
            .as_ref()
            .and_then(Location::basename)
            .or_else(|| self.short_name.clone());
        content_type::guess_language(name.as_deref(), &self.content_type).map(str::to_string)
    }

    fn apply_language(&mut self, language: Option<String>, set_by_user: bool) {
        if self.language == language && self.language_set_by_user == set_by_user {
            return;
        }
        if set_by_user {
            self.set_metadata(LANGUAGE_KEY, Some(language.as_deref().unwrap_or(NO_LANGUAGE)));
        }
        tracing::debug!(language = ?language, set_by_user, "language changed");
        self.language = language;
        self.language_set_by_user = set_by_user;
    }

    /// Character encoding.
    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }

    pub(crate) fn set_encoding(&mut self, encoding: Encoding, set_by_user: bool) {
        if self.encoding == encoding {
            return;
        }
        if set_by_user {
            self.set_metadata(ENCODING_KEY, Some(encoding.charset()));
        }
        self.encoding = encoding;
    }

    /// Newline convention used when saving.
    pub fn newline_type(&self) -> NewlineType {
        self.newline_type
    }

    /// Set the newline convention used when saving.
    pub fn set_newline_type(&mut self, newline_type: NewlineType) {
        self.newline_type = newline_type;
    }

    /// Returns `true` if the file cannot be written.
    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Last known modification time of the file (µs since the epoch, 0 if unknown).
    pub fn mtime(&self) -> i64 {
        self.mtime
    }

    /// Whether a trailing newline is hidden on load and added back on save.
    pub fn hide_trailing_newline(&self) -> bool {
        self.hide_trailing_newline
    }

    /// Set the trailing newline policy for this document.
    pub fn set_hide_trailing_newline(&mut self, hide: bool) {
        self.hide_trailing_newline = hide;
    }

    /// Returns `true` if the document has no location.
    pub fn is_untitled(&self) -> bool {
        self.location.is_none()
    }

    /// Returns `true` for an untitled document that was never modified.
    pub fn is_untouched(&self) -> bool {
        self.location.is_none() && !self.buffer.is_modified()
    }

    /// Returns `true` if the document lives on the local filesystem.
    pub fn is_local(&self) -> bool {
        self.location.as_ref().is_some_and(Location::is_local)
    }

    /// Returns `true` if the document has a location the loader cannot find anymore.
    pub fn is_deleted(&self) -> bool {
        self.location
            .as_ref()
            .is_some_and(|location| self.loader.query_info(location).is_none())
    }

    /// Returns `true` if the file changed on disk since it was last loaded or saved.
    ///
    /// Also refreshes the read-only flag.
    pub fn check_externally_modified(&mut self) -> bool {
        let Some(location) = &self.location else {
            return false;
        };
        let Some(info) = self.loader.query_info(location) else {
            return false;
        };
        self.readonly = !info.can_write;
        info.mtime.is_some_and(|mtime| mtime.to_micros() > self.mtime)
    }

    /// Seconds since the last successful load or save (or since creation).
    pub fn seconds_since_last_save_or_load(&self) -> u64 {
        self.last_save_or_load.elapsed().as_secs()
    }

    // ---- Metadata -------------------------------------------------------------------------

    /// Metadata `key` of this document. Always `None` for untitled documents.
    pub fn get_metadata(&self, key: &str) -> Option<String> {
        let location = self.location.as_ref()?;
        self.metadata.get(location, key)
    }

    /// Set or unset metadata `key`. Ignored for untitled documents.
    pub fn set_metadata(&self, key: &str, value: Option<&str>) {
        if let Some(location) = &self.location {
            self.metadata.set(location, key, value);
        }
    }

    /// Persist the cursor position (and the user-chosen language), then drop the document.
    pub fn close(self) {
        drop(self);
    }

    fn persist_metadata(&self) {
        if self.location.is_none() {
            return;
        }
        let position = self.buffer.cursor().to_string();
        self.set_metadata(POSITION_KEY, Some(&position));
        if self.language_set_by_user {
            self.set_metadata(
                LANGUAGE_KEY,
                Some(self.language.as_deref().unwrap_or(NO_LANGUAGE)),
            );
        }
    }

    // ---- Navigation -----------------------------------------------------------------------

    /// Move the cursor to the start of `line` (0-based).
    ///
    /// Past the last line the cursor goes to the end of the buffer and `false` is returned.
    pub fn goto_line(&mut self, line: usize) -> bool {
        if line >= self.buffer.line_count() {
            let end = self.buffer.len_chars();
            self.place_cursor(end);
            return false;
        }
        let start = self.buffer.line_to_char(line);
        self.place_cursor(start);
        true
    }

    /// Move the cursor to `offset` characters into `line` (0-based, clamped to the last line).
    ///
    /// If the line is shorter than `offset` the cursor goes to the line start and `false` is
    /// returned.
    pub fn goto_line_offset(&mut self, line: usize, offset: usize) -> bool {
        let start = self.buffer.line_to_char(line);
        let line_len = self.buffer.forward_lines(start, 1) - start;
        if offset > line_len {
            self.place_cursor(start);
            return false;
        }
        self.place_cursor(start + offset);
        true
    }

    // ---- Search ---------------------------------------------------------------------------

    /// Set the search pattern and/or flags (see [`SearchState::set_text`]).
    pub fn set_search_text(&mut self, text: Option<&str>, flags: SearchFlags) {
        let update = self.search.set_text(text, flags);
        tracing::debug!(
            text = ?self.search.text(),
            flags = ?self.search.flags(),
            changed = update.changed,
            "search text set"
        );
        if update.changed {
            let len = self.buffer.len_chars();
            self.invalidate_highlight(0, len);
        }
        if update.can_search_again_changed {
            self.emit(DocumentEvent::CanSearchAgainChanged);
        }
    }

    /// Current search pattern in its escaped form.
    pub fn search_text(&self) -> Option<String> {
        self.search.escaped_text()
    }

    /// Current search flags.
    pub fn search_flags(&self) -> SearchFlags {
        self.search.flags()
    }

    /// Search state.
    pub fn search_state(&self) -> &SearchState {
        &self.search
    }

    /// Returns `true` if a non-empty search pattern is set.
    pub fn can_search_again(&self) -> bool {
        self.search.can_search_again()
    }

    /// Set the replacement template used by regex searches.
    pub fn set_last_replace_text(&mut self, text: Option<&str>) {
        self.search.set_replace_text(text);
    }

    /// Most recent replacement produced by a regex search, or the template.
    pub fn last_replace_text(&self) -> Option<&str> {
        self.search.last_replace_text()
    }

    /// Search forward from `start` (default: document start) up to `end` (default: document
    /// end). Returns `Ok(None)` when there is no match or no pattern.
    pub fn search_forward(
        &mut self,
        start: Option<usize>,
        end: Option<usize>,
    ) -> Result<Option<SearchMatch>, SearchError> {
        let len = self.buffer.len_chars();
        let from = start.unwrap_or(0).min(len);
        let limit = end.unwrap_or(len).min(len);
        let template = self.search.replace_text().map(str::to_string);

        let Some(matcher) = self.search.matcher()? else {
            tracing::debug!("search_forward without a search pattern");
            return Ok(None);
        };
        let Some(found) = matcher.find_forward(&self.buffer, from, limit, template.as_deref())
        else {
            return Ok(None);
        };
        self.search.record_replacement(found.replacement);
        Ok(Some(found.range))
    }

    /// Search backward from `end` (default: document end) down to `start` (default: document
    /// start). Returns `Ok(None)` when there is no match or no pattern.
    pub fn search_backward(
        &mut self,
        start: Option<usize>,
        end: Option<usize>,
    ) -> Result<Option<SearchMatch>, SearchError> {
        let len = self.buffer.len_chars();
        let limit = start.unwrap_or(0).min(len);
        let end = end.unwrap_or(len).min(len);
        let template = self.search.replace_text().map(str::to_string);

        let Some(matcher) = self.search.matcher()? else {
            tracing::debug!("search_backward without a search pattern");
            return Ok(None);
        };
        let Some(found) = matcher.find_backward(&self.buffer, limit, end, template.as_deref())
        else {
            return Ok(None);
        };
        self.search.record_replacement(found.replacement);
        Ok(Some(found.range))
    }

    /// Replace every occurrence of `find` (default: the current pattern) with `replace`.
    ///
    /// `find` and, for literal searches, `replace` are unescaped first; regex replacements may
    /// use `$N`, `${name}` and `\N`. The whole pass is one undo step. Returns the number of
    /// replacements, 0 when there is no pattern.
    pub fn replace_all(
        &mut self,
        find: Option<&str>,
        replace: &str,
        flags: SearchFlags,
    ) -> Result<usize, SearchError> {
        let pattern = match find {
            Some(find) => unescape_search_text(find),
            None => match self.search.text() {
                Some(text) => text.to_string(),
                None => return Ok(0),
            },
        };
        if pattern.is_empty() {
            return Ok(0);
        }
        let matcher = Matcher::new(&pattern, flags - SearchFlags::DONT_SET_FLAGS)?;
        let literal = if matcher.is_regex() {
            String::new()
        } else {
            unescape_search_text(replace)
        };

        let mut doc = ReplaceAllGuard::new(self);
        let mut count = 0;
        let mut at = 0;
        loop {
            let len = doc.buffer.len_chars();
            let Some(found) = matcher.find_forward(&doc.buffer, at, len, Some(replace)) else {
                break;
            };
            let replacement = found.replacement.unwrap_or_else(|| literal.clone());
            let SearchMatch { start, end } = found.range;

            doc.delete(start, end)?;
            doc.insert(start, &replacement)?;
            at = start + replacement.chars().count();
            count += 1;
        }

        tracing::debug!(pattern = %pattern, count, "replace all finished");
        Ok(count)
    }
}

impl Drop for Document {
    fn drop(&mut self) {
        self.persist_metadata();
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("location", &self.location)
            .field("untitled", &self.untitled)
            .field("content_type", &self.content_type)
            .field("encoding", &self.encoding)
            .field("newline_type", &self.newline_type)
            .field("readonly", &self.readonly)
            .field("len_chars", &self.buffer.len_chars())
            .finish_non_exhaustive()
    }
}

/// Suspends cursor notifications, bracket matching and search highlighting for a bulk
/// replace, inside one user action. Everything is restored on drop.
struct ReplaceAllGuard<'a> {
    doc: &'a mut Document,
    cursor_before: usize,
    brackets: bool,
    highlighting: bool,
}

impl<'a> ReplaceAllGuard<'a> {
    fn new(doc: &'a mut Document) -> Self {
        let cursor_before = doc.buffer.cursor();
        let brackets = doc.highlight_matching_brackets;
        let highlighting = doc.is_search_highlighting_enabled();

        doc.stop_cursor_moved_emission = true;
        doc.set_highlight_matching_brackets(false);
        doc.set_enable_search_highlighting(false);
        doc.buffer.begin_user_action();

        Self {
            doc,
            cursor_before,
            brackets,
            highlighting,
        }
    }
}

impl Deref for ReplaceAllGuard<'_> {
    type Target = Document;

    fn deref(&self) -> &Document {
        self.doc
    }
}

impl DerefMut for ReplaceAllGuard<'_> {
    fn deref_mut(&mut self) -> &mut Document {
        self.doc
    }
}

impl Drop for ReplaceAllGuard<'_> {
    fn drop(&mut self) {
        self.doc.buffer.end_user_action();
        self.doc.sync_buffer();

        self.doc.stop_cursor_moved_emission = false;
        if self.doc.buffer.cursor() != self.cursor_before {
            self.doc.emit_cursor_moved();
        }

        self.doc.set_highlight_matching_brackets(self.brackets);
        self.doc.set_enable_search_highlighting(self.highlighting);
    }
}
