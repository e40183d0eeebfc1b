//! Content loader/saver collaborators.
//!
//! Loading and saving are sans-I/O jobs: the document starts a job and polls it, one step per
//! call, on its own thread. A step is either progress or the terminal outcome. Loaders write
//! into the document's [`TextBuffer`] while they run; savers read from it.
//!
//! [`crate::fs`] provides implementations for local files.

use bitflags::bitflags;

use crate::buffer::TextBuffer;
use crate::encoding::Encoding;
use crate::error::DocumentError;
use crate::line_ending::NewlineType;
use crate::location::Location;

/// Modification time as reported by the filesystem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mtime {
    /// Whole seconds since the Unix epoch.
    pub secs: i64,
    /// Sub-second part, in microseconds.
    pub usecs: u32,
}

impl Mtime {
    /// Compose seconds and microseconds into one timestamp (µs since the epoch).
    pub fn to_micros(self) -> i64 {
        self.secs
            .saturating_mul(1_000_000)
            .saturating_add(i64::from(self.usecs))
    }
}

/// File metadata reported by the collaborators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInfo {
    /// MIME content type, if known.
    pub content_type: Option<String>,
    /// Last modification time.
    pub mtime: Option<Mtime>,
    /// Whether the file can be written.
    pub can_write: bool,
    /// Size in bytes.
    pub size: u64,
}

/// Parameters of a load job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    /// What to load.
    pub location: Location,
    /// Encoding to decode with; `None` auto-detects.
    pub encoding: Option<Encoding>,
    /// Drop one trailing newline from the content.
    pub trim_trailing_newline: bool,
}

/// Non-error terminal status of a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Decoded with the requested or detected encoding.
    Ok,
    /// Auto-detection failed; the content was decoded with a fallback encoding.
    FallbackEncoding,
}

/// Terminal outcome of a load job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    /// Result of the job.
    pub status: Result<LoadStatus, DocumentError>,
    /// Encoding the content was decoded with.
    pub encoding: Encoding,
    /// Newline convention detected in the content.
    pub newline: NewlineType,
    /// Whether a trailing newline was found and trimmed.
    pub trimmed_trailing_newline: bool,
    /// Metadata of the loaded file.
    pub info: Option<FileInfo>,
}

impl LoadOutcome {
    /// A failed outcome.
    pub fn failed(error: DocumentError) -> Self {
        Self {
            status: Err(error),
            encoding: Encoding::default(),
            newline: NewlineType::default(),
            trimmed_trailing_newline: false,
            info: None,
        }
    }
}

/// One step of a load job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEvent {
    /// `bytes_read` of `total` bytes read (`total` is 0 when unknown).
    Progress {
        /// Bytes read so far.
        bytes_read: u64,
        /// Total size, or 0 if unknown.
        total: u64,
    },
    /// The job ended.
    Finished(LoadOutcome),
}

/// Starts load jobs.
pub trait ContentLoader {
    /// Start loading `request`.
    fn start(&self, request: LoadRequest) -> Box<dyn LoadJob>;

    /// Current metadata of `location`, or `None` if it cannot be queried.
    fn query_info(&self, _location: &Location) -> Option<FileInfo> {
        None
    }
}

/// A running load.
pub trait LoadJob {
    /// Advance the job by one step, writing content into `buffer`.
    ///
    /// After [`LoadEvent::Finished`] the job must not be polled again.
    fn poll(&mut self, buffer: &mut TextBuffer) -> LoadEvent;

    /// Ask the job to stop. The next poll reports [`DocumentError::Canceled`].
    ///
    /// Returns `false` if the job already finished.
    fn cancel(&mut self) -> bool;
}

bitflags! {
    /// Save options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SaveFlags: u32 {
        /// Skip the external-modification check.
        const IGNORE_MTIME = 1 << 0;
        /// Write a backup copy before overwriting.
        const CREATE_BACKUP = 1 << 1;
    }
}

/// Parameters of a save job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    /// Where to save.
    pub location: Location,
    /// Encoding to write with.
    pub encoding: Encoding,
    /// Newline convention to write.
    pub newline: NewlineType,
    /// Save options.
    pub flags: SaveFlags,
    /// Append a trailing newline to the content.
    pub add_trailing_newline: bool,
    /// Modification time (µs) the document last saw; the save fails with
    /// [`DocumentError::ExternallyModified`] if the file is newer. `None` skips the check.
    pub expected_mtime: Option<i64>,
}

/// Terminal outcome of a save job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    /// Result of the job.
    pub status: Result<(), DocumentError>,
    /// Final location of the saved file.
    pub location: Location,
    /// Metadata of the saved file.
    pub info: Option<FileInfo>,
}

/// One step of a save job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveEvent {
    /// `bytes_written` of `total` bytes written.
    Progress {
        /// Bytes written so far.
        bytes_written: u64,
        /// Total size to write.
        total: u64,
    },
    /// The job ended.
    Finished(SaveOutcome),
}

/// Starts save jobs.
pub trait ContentSaver {
    /// Start saving `request`.
    fn start(&self, request: SaveRequest) -> Box<dyn SaveJob>;
}

/// A running save.
pub trait SaveJob {
    /// Advance the job by one step, reading content from `buffer`.
    ///
    /// After [`SaveEvent::Finished`] the job must not be polled again.
    fn poll(&mut self, buffer: &TextBuffer) -> SaveEvent;
}
