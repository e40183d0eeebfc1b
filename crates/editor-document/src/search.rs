//! Search and replace engine.
//!
//! All public inputs/outputs are **character offsets** into a [`TextBuffer`], half-open
//! (`[start, end)`). Literal patterns are escaped and compiled into a regex, so literal and
//! regex searches share one matcher. Zero-width matches are never reported.
//!
//! [`SearchState`] is the per-document pattern/flags/replacement state; [`Matcher`] is the
//! compiled, stateless part.

use bitflags::bitflags;
use regex::{Captures, Regex, RegexBuilder};
use thiserror::Error;

use crate::buffer::TextBuffer;
use crate::error::EditError;

bitflags! {
    /// Search options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SearchFlags: u32 {
        /// Leave the current flags untouched (only the pattern is being updated).
        const DONT_SET_FLAGS = 1 << 0;
        /// Accept a match only if it starts and ends on word boundaries.
        const ENTIRE_WORD = 1 << 1;
        /// Match case exactly.
        const CASE_SENSITIVE = 1 << 2;
        /// Treat the pattern as a regular expression.
        const MATCH_REGEX = 1 << 3;
    }
}

/// A match, expressed as a half-open character range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchMatch {
    /// Inclusive start character offset.
    pub start: usize,
    /// Exclusive end character offset.
    pub end: usize,
}

impl SearchMatch {
    /// Returns the length of the match in characters.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if the match is empty.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Search errors.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid regex: {0}")]
    /// The regex pattern failed to compile.
    InvalidRegex(#[from] regex::Error),

    #[error(transparent)]
    /// A replacement edit was rejected by the buffer.
    Edit(#[from] EditError),
}

#[derive(Debug)]
struct CharIndex {
    char_to_byte: Vec<usize>,
    text_len: usize,
}

impl CharIndex {
    fn new(text: &str) -> Self {
        let mut char_to_byte: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        char_to_byte.push(text.len());
        Self {
            char_to_byte,
            text_len: text.len(),
        }
    }

    fn char_count(&self) -> usize {
        self.char_to_byte.len().saturating_sub(1)
    }

    fn char_to_byte(&self, char_offset: usize) -> usize {
        let clamped = char_offset.min(self.char_count());
        self.char_to_byte
            .get(clamped)
            .copied()
            .unwrap_or(self.text_len)
    }

    fn byte_to_char(&self, byte_offset: usize) -> usize {
        let clamped = byte_offset.min(self.text_len);
        match self.char_to_byte.binary_search(&clamped) {
            Ok(idx) => idx,
            Err(idx) => idx,
        }
    }
}

/// A slice of the buffer prepared for regex matching.
struct Haystack {
    text: String,
    index: CharIndex,
    /// Buffer offset of the first character of `text`.
    base: usize,
}

impl Haystack {
    /// The text around `[start, bound)`: from the start of the line containing `start` to the
    /// line after `bound`, so anchors and word boundaries see the real neighbours of both
    /// edges. Candidates ending past `bound` are rejected by the caller.
    fn new(buffer: &TextBuffer, start: usize, bound: usize) -> Self {
        let context = buffer.line_start(start);
        let text = buffer.slice(context, buffer.forward_lines(bound, 1));
        let index = CharIndex::new(&text);
        Self {
            text,
            index,
            base: context,
        }
    }

    fn byte_of(&self, pos: usize) -> usize {
        self.index.char_to_byte(pos.saturating_sub(self.base))
    }

    fn to_match(&self, m: regex::Match<'_>) -> SearchMatch {
        SearchMatch {
            start: self.base + self.index.byte_to_char(m.start()),
            end: self.base + self.index.byte_to_char(m.end()),
        }
    }
}

/// A match plus, for regex patterns with a replacement template, the expanded replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundMatch {
    /// Matched range.
    pub range: SearchMatch,
    /// Replacement template expanded against the match's capture groups.
    pub replacement: Option<String>,
}

/// Compiled search pattern.
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Regex,
    is_regex: bool,
    entire_word: bool,
}

impl Matcher {
    /// Compile `pattern` (already unescaped) with `flags`.
    pub fn new(pattern: &str, flags: SearchFlags) -> Result<Self, SearchError> {
        let is_regex = flags.contains(SearchFlags::MATCH_REGEX);
        let source = if is_regex {
            pattern.to_string()
        } else {
            regex::escape(pattern)
        };

        let regex = RegexBuilder::new(&source)
            .case_insensitive(!flags.contains(SearchFlags::CASE_SENSITIVE))
            .multi_line(true)
            .build()?;

        Ok(Self {
            regex,
            is_regex,
            entire_word: flags.contains(SearchFlags::ENTIRE_WORD),
        })
    }

    /// Returns `true` for regex patterns.
    pub fn is_regex(&self) -> bool {
        self.is_regex
    }

    /// First match starting at or after `from` and ending at or before `limit`.
    ///
    /// Text past `limit` is still visible to anchors and word boundaries, so a bounded search
    /// only reports matches an unbounded one would also see.
    ///
    /// A match rejected by the whole-word check resumes the scan at its end. For regex
    /// patterns, `template` is expanded against the accepted match.
    pub fn find_forward(
        &self,
        buffer: &TextBuffer,
        from: usize,
        limit: usize,
        template: Option<&str>,
    ) -> Option<FoundMatch> {
        let limit = limit.min(buffer.len_chars());
        if from > limit {
            return None;
        }
        let hay = Haystack::new(buffer, from, limit);
        self.next_in(buffer, &hay, from, limit, template)
    }

    /// Last match starting at or after `limit` and ending at or before `end`.
    ///
    /// A match rejected by the whole-word check resumes the scan before its start.
    pub fn find_backward(
        &self,
        buffer: &TextBuffer,
        limit: usize,
        end: usize,
        template: Option<&str>,
    ) -> Option<FoundMatch> {
        let end = end.min(buffer.len_chars());
        if limit > end {
            return None;
        }
        let hay = Haystack::new(buffer, limit, end);

        // Candidates are tried at every start position so overlapping occurrences are seen;
        // the last accepted one wins.
        let mut last: Option<SearchMatch> = None;
        let mut at = limit;
        while at <= end {
            let Some(m) = self.regex.find_at(&hay.text, hay.byte_of(at)) else {
                break;
            };
            let candidate = hay.to_match(m);
            if !candidate.is_empty() && candidate.end <= end && self.accepts(buffer, candidate) {
                last = Some(candidate);
            }
            at = candidate.start + 1;
        }

        let range = last?;
        let replacement = self.expand_at(&hay, range, template);
        Some(FoundMatch { range, replacement })
    }

    /// Every accepted, non-overlapping match inside `[start, end)`, scanning forward.
    pub fn find_all(&self, buffer: &TextBuffer, start: usize, end: usize) -> Vec<SearchMatch> {
        let end = end.min(buffer.len_chars());
        if start > end {
            return Vec::new();
        }
        let hay = Haystack::new(buffer, start, end);

        let mut matches = Vec::new();
        let mut at = start;
        while let Some(found) = self.next_in(buffer, &hay, at, end, None) {
            at = found.range.end;
            matches.push(found.range);
        }
        matches
    }

    fn next_in(
        &self,
        buffer: &TextBuffer,
        hay: &Haystack,
        from: usize,
        limit: usize,
        template: Option<&str>,
    ) -> Option<FoundMatch> {
        let mut at = from;
        while at <= limit {
            let caps = self.regex.captures_at(&hay.text, hay.byte_of(at))?;
            let candidate = hay.to_match(caps.get(0)?);

            if candidate.is_empty() {
                at = candidate.end + 1;
                continue;
            }
            if candidate.end > limit {
                at = candidate.start + 1;
                continue;
            }
            if !self.accepts(buffer, candidate) {
                at = candidate.end;
                continue;
            }

            let replacement = match template {
                Some(template) if self.is_regex => Some(expand_template(&caps, template)),
                _ => None,
            };
            return Some(FoundMatch {
                range: candidate,
                replacement,
            });
        }
        None
    }

    fn accepts(&self, buffer: &TextBuffer, m: SearchMatch) -> bool {
        !self.entire_word || is_whole_word(buffer, m)
    }

    fn expand_at(&self, hay: &Haystack, m: SearchMatch, template: Option<&str>) -> Option<String> {
        let template = template.filter(|_| self.is_regex)?;
        let caps = self.regex.captures_at(&hay.text, hay.byte_of(m.start))?;
        Some(expand_template(&caps, template))
    }
}

/// Returns `true` if `m` starts and ends on word boundaries of `buffer`.
pub fn is_whole_word(buffer: &TextBuffer, m: SearchMatch) -> bool {
    !m.is_empty() && buffer.starts_word(m.start) && buffer.ends_word(m.end)
}

/// Expand a replacement template against `caps`. Accepts `$N`, `${name}` and `\N`.
fn expand_template(caps: &Captures<'_>, template: &str) -> String {
    let mut converted = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        match (ch, chars.peek().copied()) {
            ('\\', Some(digit)) if digit.is_ascii_digit() => {
                chars.next();
                converted.push_str("${");
                converted.push(digit);
                converted.push('}');
            }
            ('\\', Some('\\')) => {
                chars.next();
                converted.push('\\');
            }
            _ => converted.push(ch),
        }
    }

    let mut out = String::new();
    caps.expand(&converted, &mut out);
    out
}

/// Interpret `\n`, `\r`, `\t` and `\\` in user-typed search text.
///
/// Other backslash sequences are kept as typed.
pub fn unescape_search_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.peek().copied() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => {
                out.push('\\');
                continue;
            }
        }
        chars.next();
    }
    out
}

/// Inverse of [`unescape_search_text`].
pub fn escape_search_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

/// Number of paragraph-separated segments in `text` (at least 1).
///
/// `\n`, `\r\n`, `\r` and U+2029 each end a segment.
pub fn compute_line_span(text: &str) -> usize {
    let mut span = 1;
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                span += 1;
            }
            '\n' | '\u{2029}' => span += 1,
            _ => {}
        }
    }
    span
}

/// Per-document search state.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    /// Unescaped pattern; `None` until a pattern is first set.
    text: Option<String>,
    flags: SearchFlags,
    line_span: usize,
    /// Replacement template set by the caller.
    replace_text: Option<String>,
    /// Most recent regex expansion of `replace_text`.
    last_replacement: Option<String>,
    matcher: Option<Matcher>,
}

/// What [`SearchState::set_text`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchUpdate {
    /// Pattern or flags changed: highlighting must be recomputed.
    pub changed: bool,
    /// [`SearchState::can_search_again`] flipped.
    pub can_search_again_changed: bool,
}

impl SearchState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self {
            line_span: 1,
            ..Self::default()
        }
    }

    /// Set the pattern (escaped form, see [`unescape_search_text`]) and/or the flags.
    ///
    /// `None` leaves the pattern untouched and an empty string clears it.
    /// [`SearchFlags::DONT_SET_FLAGS`] leaves the flags untouched. Setting a pattern equal to
    /// the current one is not a change.
    pub fn set_text(&mut self, text: Option<&str>, flags: SearchFlags) -> SearchUpdate {
        let could_search = self.can_search_again();
        let mut update = SearchUpdate::default();

        if let Some(text) = text {
            let unescaped = unescape_search_text(text);
            if self.text.as_deref() != Some(unescaped.as_str()) {
                self.line_span = compute_line_span(&unescaped);
                self.text = Some(unescaped);
                update.changed = true;
            }
        }

        if !flags.contains(SearchFlags::DONT_SET_FLAGS) && self.flags != flags {
            self.flags = flags;
            update.changed = true;
        }

        if update.changed {
            self.matcher = None;
        }
        update.can_search_again_changed = could_search != self.can_search_again();
        update
    }

    /// Current pattern, unescaped.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Current pattern in its escaped, user-typed form.
    pub fn escaped_text(&self) -> Option<String> {
        self.text.as_deref().map(escape_search_text)
    }

    /// Current flags.
    pub fn flags(&self) -> SearchFlags {
        self.flags
    }

    /// Line span of the pattern, used as the highlight guard band.
    pub fn line_span(&self) -> usize {
        self.line_span.max(1)
    }

    /// Returns `true` if a non-empty pattern is set.
    pub fn can_search_again(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Set the replacement template. Forgets the last expansion.
    pub fn set_replace_text(&mut self, text: Option<&str>) {
        tracing::trace!(replace_text = ?text, "replace text set");
        self.replace_text = text.map(str::to_string);
        self.last_replacement = None;
    }

    /// Replacement template set by the caller.
    pub fn replace_text(&self) -> Option<&str> {
        self.replace_text.as_deref()
    }

    /// The most recent regex expansion of the template, or the template itself.
    pub fn last_replace_text(&self) -> Option<&str> {
        self.last_replacement
            .as_deref()
            .or(self.replace_text.as_deref())
    }

    pub(crate) fn record_replacement(&mut self, replacement: Option<String>) {
        if replacement.is_some() {
            self.last_replacement = replacement;
        }
    }

    /// Compiled matcher for the current pattern, or `None` if the pattern is unset or empty.
    pub fn matcher(&mut self) -> Result<Option<&Matcher>, SearchError> {
        let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        if self.matcher.is_none() {
            self.matcher = Some(Matcher::new(text, self.flags)?);
        }
        Ok(self.matcher.as_ref())
    }
}
