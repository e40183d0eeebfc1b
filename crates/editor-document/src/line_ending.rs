//! Newline convention helpers.
//!
//! The buffer stores text using LF (`'\n'`) newlines. When a file that uses CRLF (`"\r\n"`) or
//! classic Mac CR (`'\r'`) is loaded, the content is normalized and the detected convention is
//! remembered on the document so it can be restored when saving.

use serde::{Deserialize, Serialize};

/// The newline sequence used when saving a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewlineType {
    /// Unix-style LF (`'\n'`).
    #[default]
    Lf,
    /// Classic Mac CR (`'\r'`).
    Cr,
    /// Windows-style CRLF (`"\r\n"`).
    CrLf,
}

impl NewlineType {
    /// The newline sequence as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Cr => "\r",
            Self::CrLf => "\r\n",
        }
    }

    /// Detect the newline convention from a source text.
    ///
    /// Policy: the first newline sequence found decides; text without newlines is
    /// [`NewlineType::Lf`].
    pub fn detect_in_text(text: &str) -> Self {
        let Some(idx) = text.find(['\n', '\r']) else {
            return Self::Lf;
        };
        match &text.as_bytes()[idx..] {
            [b'\r', b'\n', ..] => Self::CrLf,
            [b'\r', ..] => Self::Cr,
            _ => Self::Lf,
        }
    }

    /// Convert every newline sequence (`"\r\n"`, `'\r'`, `'\n'`) of `text` to LF.
    pub fn normalize(text: &str) -> String {
        if !text.contains('\r') {
            return text.to_string();
        }
        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch == '\r' {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            } else {
                out.push(ch);
            }
        }
        out
    }

    /// Convert an LF-normalized text to this newline convention for saving.
    pub fn apply_to_text(self, text: &str) -> String {
        match self {
            Self::Lf => text.to_string(),
            other => text.replace('\n', other.as_str()),
        }
    }
}
