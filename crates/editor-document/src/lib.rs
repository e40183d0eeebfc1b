#![warn(missing_docs)]
//! Editor Document - Headless document session layer for text editors
//!
//! # Overview
//!
//! `editor-document` is the non-visual document layer of a text editor. It owns a text
//! buffer and everything an editor tracks about it: where it is stored and how it is encoded,
//! whether it changed on disk, load and save sessions with progress reporting, a search and
//! replace engine, and incremental search highlighting that only rescans what edits touched.
//!
//! Rendering, widgets and dialogs are left to the upper layer. I/O is delegated to
//! collaborators ([`ContentLoader`], [`ContentSaver`], [`MetadataStore`],
//! [`SettingsProvider`]); local file implementations are provided in [`fs`].
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Document (identity, events, search API)    │  ← Public API
//! ├──────────────────────┬──────────────────────┤
//! │  Sessions            │  Highlight tracker   │  ← Load/save, dirty region
//! │  (load / save jobs)  │  (TextRegion)        │
//! ├──────────────────────┴──────────────────────┤
//! │  Search engine (Matcher, SearchState)       │  ← Literal / regex search
//! ├─────────────────────────────────────────────┤
//! │  TextBuffer (rope, tags, undo)              │  ← Text storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use editor_document::{Document, DocumentContext, SearchFlags, TagId};
//!
//! let ctx = DocumentContext::local();
//! let mut doc = Document::from_text(&ctx, "The cat sat on the mat.\nA cat nap.\n");
//!
//! // Search
//! doc.set_search_text(Some("cat"), SearchFlags::ENTIRE_WORD);
//! let found = doc.search_forward(None, None).unwrap().unwrap();
//! assert_eq!((found.start, found.end), (4, 7));
//!
//! // Highlight what is visible
//! let len = doc.buffer().len_chars();
//! doc.reconcile_highlight(0..len);
//! assert_eq!(doc.buffer().tags().ranges(TagId::FOUND), &[4..7, 26..29]);
//! ```
//!
//! # Module Description
//!
//! - [`buffer`] - Rope based text buffer with tags and undo
//! - [`region`] - Dirty-region algebra
//! - [`search`] - Search and replace engine
//! - [`document`] - The document and its events
//! - [`session`] - Load and save sessions
//! - [`highlight`] - Incremental search highlighting
//! - [`io`] - Loader/saver collaborator traits
//! - [`fs`] - Local file loader and saver
//! - [`metadata`] - Per-location metadata stores
//! - [`settings`] - Document settings

pub mod buffer;
pub mod content_type;
pub mod document;
pub mod encoding;
pub mod error;
pub mod fs;
pub mod highlight;
pub mod io;
pub mod line_ending;
pub mod location;
pub mod metadata;
pub mod region;
pub mod search;
pub mod session;
pub mod settings;
pub mod tags;
mod undo;
pub mod untitled;

pub use buffer::{BufferChange, TextBuffer};
pub use document::{Document, DocumentContext, DocumentEvent, DocumentEventCallback};
pub use encoding::Encoding;
pub use error::{DocumentError, EditError, SessionError};
pub use fs::{FileLoader, FileSaver};
pub use io::{
    ContentLoader, ContentSaver, FileInfo, LoadEvent, LoadJob, LoadOutcome, LoadRequest,
    LoadStatus, Mtime, SaveEvent, SaveFlags, SaveJob, SaveOutcome, SaveRequest,
};
pub use line_ending::NewlineType;
pub use location::{Location, LocationError};
pub use metadata::{JsonMetadataStore, MemoryMetadataStore, MetadataError, MetadataStore};
pub use region::TextRegion;
pub use search::{Matcher, SearchError, SearchFlags, SearchMatch, SearchState};
pub use session::SessionStatus;
pub use settings::{ConfigError, DocumentSettings, SettingsProvider};
pub use tags::{TagId, TagTable};
pub use untitled::{UntitledNumber, UntitledNumbers};
