//! Character encodings.
//!
//! An [`Encoding`] is identified by its canonical charset name. Decoding and encoding bytes is
//! the job of the content loader/saver; the document only carries the encoding around and
//! records it in metadata when the user picked it.

use std::borrow::Cow;
use std::fmt;

/// A character encoding identified by its charset name (e.g. `UTF-8`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Encoding {
    charset: Cow<'static, str>,
}

impl Encoding {
    /// UTF-8, the default encoding of new documents.
    pub const UTF_8: Encoding = Encoding {
        charset: Cow::Borrowed("UTF-8"),
    };

    /// ISO-8859-1 (Latin-1), used as the fallback when auto-detection fails.
    pub const ISO_8859_1: Encoding = Encoding {
        charset: Cow::Borrowed("ISO-8859-1"),
    };

    /// Look up an encoding by charset name. Common aliases are canonicalized.
    pub fn from_charset(charset: &str) -> Self {
        let upper = charset.trim().to_ascii_uppercase();
        match upper.as_str() {
            "UTF-8" | "UTF8" => Self::UTF_8,
            "ISO-8859-1" | "ISO8859-1" | "LATIN1" | "LATIN-1" | "L1" => Self::ISO_8859_1,
            _ => Self {
                charset: Cow::Owned(upper),
            },
        }
    }

    /// Canonical charset name.
    pub fn charset(&self) -> &str {
        &self.charset
    }

    /// Returns `true` for UTF-8.
    pub fn is_utf8(&self) -> bool {
        *self == Self::UTF_8
    }
}

impl Default for Encoding {
    fn default() -> Self {
        Self::UTF_8
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.charset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases() {
        assert_eq!(Encoding::from_charset("utf8"), Encoding::UTF_8);
        assert_eq!(Encoding::from_charset(" latin1 "), Encoding::ISO_8859_1);
        assert_eq!(Encoding::from_charset("windows-1252").charset(), "WINDOWS-1252");
        assert!(Encoding::default().is_utf8());
    }
}
