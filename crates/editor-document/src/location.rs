//! Document locations.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

/// Invalid location.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("invalid location URI: {0}")]
    /// The string is not a valid absolute URI.
    Parse(#[from] url::ParseError),

    #[error("not an absolute path: {0}")]
    /// The path could not be turned into a `file://` URI.
    NotAbsolute(PathBuf),
}

/// Where a document lives, as an absolute URI (`file:///home/me/notes.txt`, `sftp://...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location(Url);

impl Location {
    /// Parse an absolute URI.
    pub fn parse(uri: &str) -> Result<Self, LocationError> {
        Ok(Self(Url::parse(uri)?))
    }

    /// Build a `file://` location from an absolute filesystem path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LocationError> {
        let path = path.as_ref();
        Url::from_file_path(path)
            .map(Self)
            .map_err(|()| LocationError::NotAbsolute(path.to_path_buf()))
    }

    /// Returns `true` if the location uses the local `file` scheme.
    pub fn is_local(&self) -> bool {
        self.0.scheme() == "file"
    }

    /// URI scheme.
    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// Filesystem path of a local location.
    pub fn to_file_path(&self) -> Option<PathBuf> {
        if !self.is_local() {
            return None;
        }
        self.0.to_file_path().ok()
    }

    /// File name of a local location, or the raw last path segment of a remote one.
    pub fn basename(&self) -> Option<String> {
        if let Some(path) = self.to_file_path() {
            return path.file_name().map(|n| n.to_string_lossy().into_owned());
        }
        self.0
            .path_segments()?
            .next_back()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// The location as a URI string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The underlying URL.
    pub fn url(&self) -> &Url {
        &self.0
    }
}

impl From<Url> for Location {
    fn from(url: Url) -> Self {
        Self(url)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}
