//! Load and save sessions.
//!
//! A session wraps a job started on the document's [`ContentLoader`] / [`ContentSaver`]. The
//! caller drives it with [`Document::poll_load`] / [`Document::poll_save`] (or the `finish_*`
//! helpers); every poll advances the job by one step and reports progress through
//! [`DocumentEvent`]s. At most one load and one save are alive per document. The session slot is
//! emptied when the job reports its terminal outcome.

use std::time::Instant;

use crate::document::{Document, DocumentEvent};
use crate::encoding::Encoding;
use crate::error::{DocumentError, SessionError};
use crate::io::{
    FileInfo, LoadEvent, LoadJob, LoadOutcome, LoadRequest, SaveEvent, SaveFlags, SaveJob,
    SaveOutcome, SaveRequest,
};
use crate::location::Location;
use crate::metadata::POSITION_KEY;

/// Where a session stands after a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// No session is active.
    Idle,
    /// The session is running.
    InProgress {
        /// Bytes transferred so far.
        transferred: u64,
        /// Total bytes, or 0 if unknown.
        total: u64,
    },
    /// The session ended; it is gone from the document.
    Finished(Result<(), DocumentError>),
}

impl SessionStatus {
    /// Returns `true` for [`SessionStatus::Finished`].
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished(_))
    }
}

/// A running load.
pub(crate) struct LoadSession {
    location: Location,
    /// Encoding requested by the caller; `None` auto-detects.
    encoding: Option<Encoding>,
    /// 1-based line to place the cursor on.
    line_pos: Option<usize>,
    create: bool,
    job: Box<dyn LoadJob>,
}

/// A running save.
pub(crate) struct SaveSession {
    encoding: Encoding,
    job: Box<dyn SaveJob>,
}

impl Document {
    /// Start loading `location` into the document.
    ///
    /// `encoding` of `None` auto-detects. `line_pos` is a 1-based line for the cursor. With
    /// `create`, a missing local file loads as an empty document instead of failing.
    pub fn load(
        &mut self,
        location: Location,
        encoding: Option<Encoding>,
        line_pos: Option<usize>,
        create: bool,
    ) -> Result<(), SessionError> {
        if self.load_session.is_some() {
            tracing::warn!(location = %location, "load requested while a load is in progress");
            return Err(SessionError::LoadInProgress);
        }

        tracing::debug!(location = %location, encoding = ?encoding, create, "load started");
        let job = self.loader.start(LoadRequest {
            location: location.clone(),
            encoding: encoding.clone(),
            trim_trailing_newline: self.hide_trailing_newline,
        });
        self.load_session = Some(LoadSession {
            location: location.clone(),
            encoding,
            line_pos,
            create,
            job,
        });

        self.set_location(location);
        self.set_content_type(None);
        Ok(())
    }

    /// Returns `true` while a load is running.
    pub fn is_loading(&self) -> bool {
        self.load_session.is_some()
    }

    /// Advance the running load by one step.
    pub fn poll_load(&mut self) -> SessionStatus {
        let Some(session) = self.load_session.as_mut() else {
            return SessionStatus::Idle;
        };

        match session.job.poll(&mut self.buffer) {
            LoadEvent::Progress { bytes_read, total } => {
                self.sync_buffer();
                tracing::trace!(bytes_read, total, "load progress");
                self.emit(DocumentEvent::Loading { bytes_read, total });
                SessionStatus::InProgress {
                    transferred: bytes_read,
                    total,
                }
            }
            LoadEvent::Finished(outcome) => {
                self.sync_buffer();
                let result = match self.load_session.take() {
                    Some(session) => self.finish_load_session(session, outcome),
                    None => Ok(()),
                };
                self.emit(DocumentEvent::Loaded {
                    error: result.clone().err(),
                });
                SessionStatus::Finished(result)
            }
        }
    }

    /// Poll the running load until it ends.
    pub fn finish_load(&mut self) -> SessionStatus {
        let mut status = self.poll_load();
        while let SessionStatus::InProgress { .. } = status {
            status = self.poll_load();
        }
        status
    }

    /// Ask the running load to stop. Content already inserted stays in the buffer.
    ///
    /// Returns `false` if no load is running.
    pub fn cancel_load(&mut self) -> bool {
        match self.load_session.as_mut() {
            Some(session) => {
                tracing::debug!(location = %session.location, "load canceled");
                session.job.cancel()
            }
            None => false,
        }
    }

    fn finish_load_session(
        &mut self,
        session: LoadSession,
        outcome: LoadOutcome,
    ) -> Result<(), DocumentError> {
        let status = match outcome.status {
            Ok(status) => status,
            Err(error)
                if session.create && error.is_not_found() && session.location.is_local() =>
            {
                tracing::debug!(location = %session.location, "missing file, created empty");
                self.buffer.set_modified(false);
                return Ok(());
            }
            Err(error) => {
                tracing::debug!(location = %session.location, %error, "load failed");
                return Err(error);
            }
        };

        if let Some(info) = &outcome.info {
            self.apply_file_info(info);
        }
        self.refresh_language();
        self.last_save_or_load = Instant::now();

        let set_by_user = session.encoding.is_some();
        self.set_encoding(outcome.encoding, set_by_user);
        self.newline_type = outcome.newline;

        if self.hide_trailing_newline
            && !outcome.trimmed_trailing_newline
            && !self.buffer.is_empty()
        {
            tracing::debug!("no trailing newline, keeping the content as is on save");
            self.hide_trailing_newline = false;
        }

        let cursor = self.load_cursor_position(session.line_pos);
        self.place_cursor(cursor);

        tracing::debug!(
            location = %session.location,
            status = ?status,
            encoding = %self.encoding,
            "load finished"
        );
        Ok(())
    }

    fn load_cursor_position(&self, line_pos: Option<usize>) -> usize {
        if let Some(line) = line_pos.filter(|line| *line > 0) {
            return self.buffer.line_to_char(line - 1);
        }
        if !self.settings.restore_cursor_position() {
            return 0;
        }
        self.get_metadata(POSITION_KEY)
            .and_then(|position| position.trim().parse::<usize>().ok())
            .map(|pos| pos.min(self.buffer.len_chars()))
            .filter(|pos| self.buffer.is_cursor_position(*pos))
            .unwrap_or(0)
    }

    fn apply_file_info(&mut self, info: &FileInfo) {
        self.set_content_type(info.content_type.as_deref());
        self.mtime = info.mtime.map_or(0, |mtime| mtime.to_micros());
        self.readonly = !info.can_write;
    }

    /// Start saving the document to its location.
    pub fn save(&mut self, flags: SaveFlags) -> Result<(), SessionError> {
        let Some(location) = self.location.clone() else {
            return Err(SessionError::NoLocation);
        };
        let encoding = self.encoding.clone();
        self.start_save(location, encoding, flags)
    }

    /// Start saving the document to `location` with `encoding`. The modification time check
    /// is always skipped.
    pub fn save_as(
        &mut self,
        location: Location,
        encoding: Encoding,
        flags: SaveFlags,
    ) -> Result<(), SessionError> {
        self.start_save(location, encoding, flags | SaveFlags::IGNORE_MTIME)
    }

    fn start_save(
        &mut self,
        location: Location,
        encoding: Encoding,
        flags: SaveFlags,
    ) -> Result<(), SessionError> {
        if self.save_session.is_some() {
            tracing::warn!(location = %location, "save requested while a save is in progress");
            return Err(SessionError::SaveInProgress);
        }

        tracing::debug!(location = %location, encoding = %encoding, ?flags, "save started");
        let expected_mtime = (!flags.contains(SaveFlags::IGNORE_MTIME)).then_some(self.mtime);
        let job = self.saver.start(SaveRequest {
            location,
            encoding: encoding.clone(),
            newline: self.newline_type,
            flags,
            add_trailing_newline: self.hide_trailing_newline,
            expected_mtime,
        });
        self.save_session = Some(SaveSession { encoding, job });
        Ok(())
    }

    /// Returns `true` while a save is running.
    pub fn is_saving(&self) -> bool {
        self.save_session.is_some()
    }

    /// Advance the running save by one step.
    pub fn poll_save(&mut self) -> SessionStatus {
        let Some(session) = self.save_session.as_mut() else {
            return SessionStatus::Idle;
        };

        match session.job.poll(&self.buffer) {
            SaveEvent::Progress {
                bytes_written,
                total,
            } => {
                tracing::trace!(bytes_written, total, "save progress");
                self.emit(DocumentEvent::Saving {
                    bytes_written,
                    total,
                });
                SessionStatus::InProgress {
                    transferred: bytes_written,
                    total,
                }
            }
            SaveEvent::Finished(outcome) => {
                let result = match self.save_session.take() {
                    Some(session) => self.finish_save_session(session, outcome),
                    None => Ok(()),
                };
                self.emit(DocumentEvent::Saved {
                    error: result.clone().err(),
                });
                SessionStatus::Finished(result)
            }
        }
    }

    /// Poll the running save until it ends.
    pub fn finish_save(&mut self) -> SessionStatus {
        let mut status = self.poll_save();
        while let SessionStatus::InProgress { .. } = status {
            status = self.poll_save();
        }
        status
    }

    fn finish_save_session(
        &mut self,
        session: SaveSession,
        outcome: SaveOutcome,
    ) -> Result<(), DocumentError> {
        if let Err(error) = outcome.status {
            tracing::debug!(location = %outcome.location, %error, "save failed");
            return Err(error);
        }

        self.set_location(outcome.location.clone());
        match &outcome.info {
            Some(info) => self.apply_file_info(info),
            None => self.set_content_type(None),
        }
        self.last_save_or_load = Instant::now();
        self.readonly = false;
        self.buffer.set_modified(false);
        self.set_encoding(session.encoding, true);

        tracing::debug!(location = %outcome.location, "save finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_without_session() {
        let ctx = crate::document::DocumentContext::local();
        let mut doc = Document::new(&ctx);
        assert_eq!(doc.poll_load(), SessionStatus::Idle);
        assert_eq!(doc.poll_save(), SessionStatus::Idle);
        assert!(!doc.cancel_load());
    }

    #[test]
    fn test_save_requires_location() {
        let ctx = crate::document::DocumentContext::local();
        let mut doc = Document::new(&ctx);
        assert_eq!(doc.save(SaveFlags::empty()), Err(SessionError::NoLocation));
        assert!(!doc.is_saving());
    }
}
