//! Local file loader and saver.
//!
//! [`FileLoader`] and [`FileSaver`] implement the collaborator traits of [`crate::io`] for
//! `file://` locations with blocking `std::fs` calls, split into chunks so every poll does a
//! bounded amount of work and reports progress.
//!
//! Supported encodings are UTF-8 and ISO-8859-1. When no encoding is requested the loader tries
//! UTF-8 and falls back to ISO-8859-1 (reported as [`LoadStatus::FallbackEncoding`]).

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::buffer::TextBuffer;
use crate::content_type;
use crate::encoding::Encoding;
use crate::error::{DocumentError, EditError};
use crate::io::{
    ContentLoader, ContentSaver, FileInfo, LoadEvent, LoadJob, LoadOutcome, LoadRequest,
    LoadStatus, Mtime, SaveEvent, SaveFlags, SaveJob, SaveOutcome, SaveRequest,
};
use crate::line_ending::NewlineType;
use crate::location::Location;

/// Default number of bytes read or written per poll.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Read the metadata of a local file.
pub fn file_info(path: &Path) -> std::io::Result<FileInfo> {
    let metadata = fs::metadata(path)?;
    let mtime = metadata.modified().ok().and_then(|modified| {
        let since_epoch = modified.duration_since(UNIX_EPOCH).ok()?;
        Some(Mtime {
            secs: i64::try_from(since_epoch.as_secs()).ok()?,
            usecs: since_epoch.subsec_micros(),
        })
    });
    let content_type = path
        .file_name()
        .and_then(|name| content_type::guess_from_name(&name.to_string_lossy()))
        .map(str::to_string);

    Ok(FileInfo {
        content_type,
        mtime,
        can_write: !metadata.permissions().readonly(),
        size: metadata.len(),
    })
}

fn local_path(location: &Location) -> Result<PathBuf, DocumentError> {
    location
        .to_file_path()
        .ok_or_else(|| DocumentError::UnsupportedScheme(location.scheme().to_string()))
}

fn check_supported(encoding: &Encoding) -> Result<(), DocumentError> {
    if encoding.is_utf8() || *encoding == Encoding::ISO_8859_1 {
        Ok(())
    } else {
        Err(DocumentError::UnsupportedEncoding(encoding.charset().to_string()))
    }
}

fn edit_failed(err: EditError) -> DocumentError {
    DocumentError::Io {
        kind: std::io::ErrorKind::Other,
        message: err.to_string(),
    }
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn decode(
    bytes: Vec<u8>,
    requested: Option<&Encoding>,
) -> Result<(String, Encoding, LoadStatus), DocumentError> {
    match requested {
        None => match String::from_utf8(bytes) {
            Ok(text) => Ok((text, Encoding::UTF_8, LoadStatus::Ok)),
            Err(err) => Ok((
                decode_latin1(err.as_bytes()),
                Encoding::ISO_8859_1,
                LoadStatus::FallbackEncoding,
            )),
        },
        Some(encoding) if encoding.is_utf8() => String::from_utf8(bytes)
            .map(|text| (text, Encoding::UTF_8, LoadStatus::Ok))
            .map_err(|_| DocumentError::ConversionFailed {
                encoding: encoding.charset().to_string(),
            }),
        Some(encoding) if *encoding == Encoding::ISO_8859_1 => {
            Ok((decode_latin1(&bytes), Encoding::ISO_8859_1, LoadStatus::Ok))
        }
        Some(encoding) => Err(DocumentError::UnsupportedEncoding(
            encoding.charset().to_string(),
        )),
    }
}

fn encode(text: &str, encoding: &Encoding) -> Result<Vec<u8>, DocumentError> {
    if encoding.is_utf8() {
        return Ok(text.as_bytes().to_vec());
    }
    check_supported(encoding)?;
    text.chars()
        .map(|ch| u8::try_from(u32::from(ch)).ok())
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(|| DocumentError::ConversionFailed {
            encoding: encoding.charset().to_string(),
        })
}

/// [`ContentLoader`] for local files.
#[derive(Debug, Clone)]
pub struct FileLoader {
    chunk_size: usize,
}

impl Default for FileLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl FileLoader {
    /// Loader reading [`DEFAULT_CHUNK_SIZE`] bytes per poll.
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Loader reading `chunk_size` bytes per poll.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

impl ContentLoader for FileLoader {
    fn start(&self, request: LoadRequest) -> Box<dyn LoadJob> {
        tracing::debug!(location = %request.location, "file load started");
        Box::new(FileLoadJob {
            request,
            chunk_size: self.chunk_size,
            state: LoadState::Open,
            canceled: false,
        })
    }

    fn query_info(&self, location: &Location) -> Option<FileInfo> {
        file_info(&location.to_file_path()?).ok()
    }
}

enum LoadState {
    Open,
    Reading {
        file: File,
        bytes: Vec<u8>,
        info: FileInfo,
    },
    Done,
}

struct FileLoadJob {
    request: LoadRequest,
    chunk_size: usize,
    state: LoadState,
    canceled: bool,
}

impl FileLoadJob {
    fn open(&mut self, buffer: &mut TextBuffer) -> Result<LoadEvent, DocumentError> {
        if let Some(encoding) = &self.request.encoding {
            check_supported(encoding)?;
        }
        let path = local_path(&self.request.location)?;
        let target = path.display().to_string();

        // The buffer is emptied even when the file turns out to be missing, so a
        // create-if-missing load ends with an empty document.
        buffer.begin_not_undoable_action();
        let len = buffer.len_chars();
        let cleared = buffer.delete(0, len);
        buffer.end_not_undoable_action();
        cleared.map_err(edit_failed)?;

        let info = file_info(&path).map_err(|err| DocumentError::from_io(err, &target))?;
        if path.is_dir() {
            return Err(DocumentError::IsDirectory(target));
        }
        let file = File::open(&path).map_err(|err| DocumentError::from_io(err, &target))?;

        let total = info.size;
        self.state = LoadState::Reading {
            file,
            bytes: Vec::with_capacity(usize::try_from(total).unwrap_or(0)),
            info,
        };
        Ok(LoadEvent::Progress {
            bytes_read: 0,
            total,
        })
    }

    fn read_chunk(&mut self, buffer: &mut TextBuffer) -> Result<LoadEvent, DocumentError> {
        let target = self.request.location.to_string();
        let LoadState::Reading { file, bytes, info } = &mut self.state else {
            return Err(DocumentError::Canceled);
        };

        let mut chunk = vec![0u8; self.chunk_size];
        let read = file
            .read(&mut chunk)
            .map_err(|err| DocumentError::from_io(err, &target))?;
        if read > 0 {
            bytes.extend_from_slice(&chunk[..read]);
            return Ok(LoadEvent::Progress {
                bytes_read: bytes.len() as u64,
                total: info.size,
            });
        }

        let mut bytes = std::mem::take(bytes);
        let info = info.clone();
        if bytes.starts_with(UTF8_BOM) {
            bytes.drain(..UTF8_BOM.len());
        }
        let (text, encoding, status) = decode(bytes, self.request.encoding.as_ref())?;

        let newline = NewlineType::detect_in_text(&text);
        let mut text = NewlineType::normalize(&text);
        let trimmed = self.request.trim_trailing_newline && text.ends_with('\n');
        if trimmed {
            text.pop();
        }

        buffer.begin_not_undoable_action();
        let inserted = buffer.insert(0, &text);
        buffer.end_not_undoable_action();
        inserted.map_err(edit_failed)?;
        buffer.set_modified(false);

        tracing::debug!(
            location = %self.request.location,
            encoding = %encoding,
            ?newline,
            chars = buffer.len_chars(),
            "file load finished"
        );
        Ok(LoadEvent::Finished(LoadOutcome {
            status: Ok(status),
            encoding,
            newline,
            trimmed_trailing_newline: trimmed,
            info: Some(info),
        }))
    }
}

impl LoadJob for FileLoadJob {
    fn poll(&mut self, buffer: &mut TextBuffer) -> LoadEvent {
        if self.canceled {
            self.state = LoadState::Done;
            return LoadEvent::Finished(LoadOutcome::failed(DocumentError::Canceled));
        }

        let step = match self.state {
            LoadState::Open => self.open(buffer),
            LoadState::Reading { .. } => self.read_chunk(buffer),
            LoadState::Done => Err(DocumentError::Canceled),
        };
        match step {
            Ok(event @ LoadEvent::Progress { .. }) => event,
            Ok(event) => {
                self.state = LoadState::Done;
                event
            }
            Err(err) => {
                tracing::debug!(location = %self.request.location, error = %err, "file load failed");
                self.state = LoadState::Done;
                LoadEvent::Finished(LoadOutcome::failed(err))
            }
        }
    }

    fn cancel(&mut self) -> bool {
        if matches!(self.state, LoadState::Done) {
            return false;
        }
        self.canceled = true;
        true
    }
}

/// [`ContentSaver`] for local files.
#[derive(Debug, Clone)]
pub struct FileSaver {
    chunk_size: usize,
}

impl Default for FileSaver {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSaver {
    /// Saver writing [`DEFAULT_CHUNK_SIZE`] bytes per poll.
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Saver writing `chunk_size` bytes per poll.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

impl ContentSaver for FileSaver {
    fn start(&self, request: SaveRequest) -> Box<dyn SaveJob> {
        tracing::debug!(location = %request.location, flags = ?request.flags, "file save started");
        Box::new(FileSaveJob {
            request,
            chunk_size: self.chunk_size,
            state: SaveState::Prepare,
        })
    }
}

enum SaveState {
    Prepare,
    Writing {
        path: PathBuf,
        file: File,
        data: Vec<u8>,
        written: usize,
    },
    Done,
}

struct FileSaveJob {
    request: SaveRequest,
    chunk_size: usize,
    state: SaveState,
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push("~");
    PathBuf::from(name)
}

impl FileSaveJob {
    fn prepare(&mut self, buffer: &TextBuffer) -> Result<SaveEvent, DocumentError> {
        let request = &self.request;
        let path = local_path(&request.location)?;
        let target = path.display().to_string();

        if let Some(expected) = request.expected_mtime
            && !request.flags.contains(SaveFlags::IGNORE_MTIME)
            && let Ok(current) = file_info(&path)
            && let Some(mtime) = current.mtime
            && mtime.to_micros() > expected
        {
            return Err(DocumentError::ExternallyModified);
        }

        let mut text = buffer.text();
        if request.add_trailing_newline {
            text.push('\n');
        }
        let text = request.newline.apply_to_text(&text);
        let data = encode(&text, &request.encoding)?;

        if request.flags.contains(SaveFlags::CREATE_BACKUP) && path.is_file() {
            fs::copy(&path, backup_path(&path))
                .map_err(|err| DocumentError::from_io(err, &target))?;
        }
        let file = File::create(&path).map_err(|err| DocumentError::from_io(err, &target))?;

        let total = data.len() as u64;
        self.state = SaveState::Writing {
            path,
            file,
            data,
            written: 0,
        };
        Ok(SaveEvent::Progress {
            bytes_written: 0,
            total,
        })
    }

    fn write_chunk(&mut self) -> Result<SaveEvent, DocumentError> {
        let SaveState::Writing {
            path,
            file,
            data,
            written,
        } = &mut self.state
        else {
            return Err(DocumentError::Canceled);
        };
        let target = path.display().to_string();

        if *written < data.len() {
            let end = (*written + self.chunk_size).min(data.len());
            file.write_all(&data[*written..end])
                .map_err(|err| DocumentError::from_io(err, &target))?;
            *written = end;
            return Ok(SaveEvent::Progress {
                bytes_written: *written as u64,
                total: data.len() as u64,
            });
        }

        file.sync_all()
            .map_err(|err| DocumentError::from_io(err, &target))?;
        let info = file_info(path).map_err(|err| DocumentError::from_io(err, &target))?;
        tracing::debug!(location = %self.request.location, bytes = data.len(), "file save finished");
        Ok(SaveEvent::Finished(SaveOutcome {
            status: Ok(()),
            location: self.request.location.clone(),
            info: Some(info),
        }))
    }
}

impl SaveJob for FileSaveJob {
    fn poll(&mut self, buffer: &TextBuffer) -> SaveEvent {
        let step = match self.state {
            SaveState::Prepare => self.prepare(buffer),
            SaveState::Writing { .. } => self.write_chunk(),
            SaveState::Done => Err(DocumentError::Canceled),
        };
        match step {
            Ok(event @ SaveEvent::Progress { .. }) => event,
            Ok(event) => {
                self.state = SaveState::Done;
                event
            }
            Err(err) => {
                tracing::debug!(location = %self.request.location, error = %err, "file save failed");
                self.state = SaveState::Done;
                SaveEvent::Finished(SaveOutcome {
                    status: Err(err),
                    location: self.request.location.clone(),
                    info: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_auto_detect_falls_back() {
        let (text, encoding, status) = decode(b"caf\xE9".to_vec(), None).unwrap();
        assert_eq!(text, "café");
        assert_eq!(encoding, Encoding::ISO_8859_1);
        assert_eq!(status, LoadStatus::FallbackEncoding);

        let (text, encoding, status) = decode("café".as_bytes().to_vec(), None).unwrap();
        assert_eq!(text, "café");
        assert_eq!(encoding, Encoding::UTF_8);
        assert_eq!(status, LoadStatus::Ok);
    }

    #[test]
    fn test_decode_explicit_utf8_is_strict() {
        assert_eq!(
            decode(b"caf\xE9".to_vec(), Some(&Encoding::UTF_8)),
            Err(DocumentError::ConversionFailed {
                encoding: "UTF-8".to_string()
            })
        );
        assert!(matches!(
            decode(Vec::new(), Some(&Encoding::from_charset("KOI8-R"))),
            Err(DocumentError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn test_encode_latin1() {
        assert_eq!(encode("café", &Encoding::ISO_8859_1).unwrap(), b"caf\xE9");
        assert!(matches!(
            encode("€", &Encoding::ISO_8859_1),
            Err(DocumentError::ConversionFailed { .. })
        ));
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("/tmp/a.txt")),
            PathBuf::from("/tmp/a.txt~")
        );
    }
}
