use std::cell::RefCell;
use std::fs::{self, File};
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, SystemTime};

use editor_document::{
    ContentLoader, Document, DocumentContext, DocumentError, DocumentEvent, DocumentSettings,
    Encoding, FileLoader, FileSaver, LoadEvent, LoadJob, LoadOutcome, LoadRequest, Location,
    MetadataStore, NewlineType, SaveFlags, SessionError, SessionStatus, TextBuffer,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn record(doc: &mut Document) -> Rc<RefCell<Vec<DocumentEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    doc.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    events
}

fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> Location {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    Location::from_path(&path).unwrap()
}

fn load(doc: &mut Document, location: &Location) -> SessionStatus {
    doc.load(location.clone(), None, None, false).unwrap();
    doc.finish_load()
}

fn touch_in_future(path: &Path) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(120))
        .unwrap();
}

#[test]
fn test_load_edit_save_round_trip() {
    let dir = TempDir::new().unwrap();
    let location = write_file(&dir, "notes.txt", b"hello\nworld\n");
    let ctx = DocumentContext::local();
    let mut doc = Document::new(&ctx);
    let events = record(&mut doc);

    assert_eq!(load(&mut doc, &location), SessionStatus::Finished(Ok(())));
    assert_eq!(doc.text(), "hello\nworld");
    assert!(!doc.is_modified());
    assert!(!doc.is_loading());
    assert!(!doc.can_undo());
    assert_eq!(doc.location(), Some(&location));
    assert_eq!(doc.untitled_number(), None);
    assert_eq!(doc.content_type(), "text/plain");
    assert!(!doc.is_readonly());
    assert!(doc.mtime() > 0);
    assert!(
        events
            .borrow()
            .contains(&DocumentEvent::Loaded { error: None })
    );

    doc.insert(0, "> ").unwrap();
    assert!(doc.is_modified());
    doc.save(SaveFlags::empty()).unwrap();
    assert_eq!(doc.finish_save(), SessionStatus::Finished(Ok(())));

    assert!(!doc.is_modified());
    assert!(
        events
            .borrow()
            .contains(&DocumentEvent::Saved { error: None })
    );
    let path = location.to_file_path().unwrap();
    assert_eq!(fs::read_to_string(path).unwrap(), "> hello\nworld\n");
}

#[test]
fn test_cannot_search_again_after_load() {
    let dir = TempDir::new().unwrap();
    let location = write_file(&dir, "a.txt", b"cat\n");
    let ctx = DocumentContext::local();
    let mut doc = Document::new(&ctx);

    load(&mut doc, &location);
    assert!(!doc.can_search_again());

    doc.set_search_text(Some("cat"), editor_document::SearchFlags::empty());
    assert!(doc.can_search_again());
}

#[test]
fn test_create_if_missing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("new.txt");
    let location = Location::from_path(&path).unwrap();
    let ctx = DocumentContext::local();
    let mut doc = Document::new(&ctx);
    let events = record(&mut doc);

    doc.load(location.clone(), None, None, true).unwrap();
    assert_eq!(doc.finish_load(), SessionStatus::Finished(Ok(())));

    assert_eq!(doc.text(), "");
    assert!(!doc.is_modified());
    assert_eq!(doc.location(), Some(&location));
    assert!(
        events
            .borrow()
            .contains(&DocumentEvent::Loaded { error: None })
    );
    assert!(!path.exists());
    assert!(doc.is_deleted());
}

#[test]
fn test_missing_file_without_create_fails() {
    let dir = TempDir::new().unwrap();
    let location = Location::from_path(dir.path().join("missing.txt")).unwrap();
    let ctx = DocumentContext::local();
    let mut doc = Document::new(&ctx);
    let events = record(&mut doc);

    let SessionStatus::Finished(Err(error)) = load(&mut doc, &location) else {
        panic!("expected a failed load");
    };
    assert!(error.is_not_found());
    assert!(events.borrow().contains(&DocumentEvent::Loaded {
        error: Some(error.clone())
    }));
}

#[test]
fn test_load_directory_fails() {
    let dir = TempDir::new().unwrap();
    let location = Location::from_path(dir.path()).unwrap();
    let ctx = DocumentContext::local();
    let mut doc = Document::new(&ctx);

    assert!(matches!(
        load(&mut doc, &location),
        SessionStatus::Finished(Err(DocumentError::IsDirectory(_)))
    ));
}

#[test]
fn test_stale_save_is_rejected() {
    let dir = TempDir::new().unwrap();
    let location = write_file(&dir, "stale.txt", b"one\n");
    let path = location.to_file_path().unwrap();
    let ctx = DocumentContext::local();
    let mut doc = Document::new(&ctx);
    load(&mut doc, &location);
    assert!(!doc.check_externally_modified());

    fs::write(&path, b"changed elsewhere\n").unwrap();
    touch_in_future(&path);
    assert!(doc.check_externally_modified());

    doc.insert(0, "zero ").unwrap();
    doc.save(SaveFlags::empty()).unwrap();
    assert_eq!(
        doc.finish_save(),
        SessionStatus::Finished(Err(DocumentError::ExternallyModified))
    );
    assert!(doc.is_modified());
    assert_eq!(fs::read_to_string(&path).unwrap(), "changed elsewhere\n");

    doc.save(SaveFlags::IGNORE_MTIME).unwrap();
    assert_eq!(doc.finish_save(), SessionStatus::Finished(Ok(())));
    assert_eq!(fs::read_to_string(&path).unwrap(), "zero one\n");
    assert!(!doc.check_externally_modified());
}

#[test]
fn test_save_as_skips_mtime_check() {
    let dir = TempDir::new().unwrap();
    let location = write_file(&dir, "stale.txt", b"one\n");
    let path = location.to_file_path().unwrap();
    let ctx = DocumentContext::local();
    let mut doc = Document::new(&ctx);
    load(&mut doc, &location);
    touch_in_future(&path);

    doc.save_as(location.clone(), Encoding::UTF_8, SaveFlags::empty())
        .unwrap();
    assert_eq!(doc.finish_save(), SessionStatus::Finished(Ok(())));
    assert_eq!(fs::read_to_string(&path).unwrap(), "one\n");
}

#[test]
fn test_save_with_backup() {
    let dir = TempDir::new().unwrap();
    let location = write_file(&dir, "b.txt", b"old\n");
    let path = location.to_file_path().unwrap();
    let ctx = DocumentContext::local();
    let mut doc = Document::new(&ctx);
    load(&mut doc, &location);

    doc.set_text("new").unwrap();
    doc.save(SaveFlags::CREATE_BACKUP).unwrap();
    assert_eq!(doc.finish_save(), SessionStatus::Finished(Ok(())));
    assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
    assert_eq!(
        fs::read_to_string(dir.path().join("b.txt~")).unwrap(),
        "old\n"
    );
}

#[test]
fn test_session_contract_violations() {
    let dir = TempDir::new().unwrap();
    let location = write_file(&dir, "c.txt", b"text\n");
    let ctx = DocumentContext::local();
    let mut doc = Document::new(&ctx);

    assert_eq!(doc.save(SaveFlags::empty()), Err(SessionError::NoLocation));

    doc.load(location.clone(), None, None, false).unwrap();
    assert_eq!(
        doc.load(location.clone(), None, None, false),
        Err(SessionError::LoadInProgress)
    );
    doc.finish_load();

    doc.save(SaveFlags::empty()).unwrap();
    assert_eq!(
        doc.save(SaveFlags::empty()),
        Err(SessionError::SaveInProgress)
    );
    assert!(doc.is_saving());
    doc.finish_save();
    assert!(!doc.is_saving());
}

#[test]
fn test_progress_is_reported_per_chunk() {
    let dir = TempDir::new().unwrap();
    let location = write_file(&dir, "p.txt", b"hello world\n");
    let ctx = DocumentContext {
        loader: Rc::new(FileLoader::with_chunk_size(4)),
        saver: Rc::new(FileSaver::with_chunk_size(4)),
        ..DocumentContext::local()
    };
    let mut doc = Document::new(&ctx);
    let events = record(&mut doc);

    load(&mut doc, &location);
    let loading: Vec<u64> = events
        .borrow()
        .iter()
        .filter_map(|event| match event {
            DocumentEvent::Loading { bytes_read, total } => {
                assert_eq!(*total, 12);
                Some(*bytes_read)
            }
            _ => None,
        })
        .collect();
    assert_eq!(loading, vec![0, 4, 8, 12]);

    doc.save(SaveFlags::empty()).unwrap();
    doc.finish_save();
    let saving: Vec<u64> = events
        .borrow()
        .iter()
        .filter_map(|event| match event {
            DocumentEvent::Saving { bytes_written, .. } => Some(*bytes_written),
            _ => None,
        })
        .collect();
    assert_eq!(saving, vec![0, 4, 8, 12]);
}

struct ScriptedLoader;

struct ScriptedJob {
    polls: u64,
    canceled: bool,
}

impl ContentLoader for ScriptedLoader {
    fn start(&self, _request: LoadRequest) -> Box<dyn LoadJob> {
        Box::new(ScriptedJob {
            polls: 0,
            canceled: false,
        })
    }
}

impl LoadJob for ScriptedJob {
    fn poll(&mut self, buffer: &mut TextBuffer) -> LoadEvent {
        if self.canceled {
            return LoadEvent::Finished(LoadOutcome::failed(DocumentError::Canceled));
        }
        self.polls += 1;
        let end = buffer.len_chars();
        buffer.insert(end, "part ").unwrap();
        LoadEvent::Progress {
            bytes_read: self.polls * 5,
            total: 100,
        }
    }

    fn cancel(&mut self) -> bool {
        self.canceled = true;
        true
    }
}

#[test]
fn test_cancel_load_keeps_partial_content() {
    let ctx = DocumentContext {
        loader: Rc::new(ScriptedLoader),
        ..DocumentContext::local()
    };
    let mut doc = Document::new(&ctx);
    let events = record(&mut doc);
    let location = Location::parse("sftp://example.org/remote.txt").unwrap();

    doc.load(location, None, None, false).unwrap();
    assert_eq!(
        doc.poll_load(),
        SessionStatus::InProgress {
            transferred: 5,
            total: 100
        }
    );
    doc.poll_load();
    assert!(doc.cancel_load());

    assert_eq!(
        doc.poll_load(),
        SessionStatus::Finished(Err(DocumentError::Canceled))
    );
    assert!(!doc.is_loading());
    assert!(!doc.cancel_load());
    assert_eq!(doc.text(), "part part ");
    assert!(events.borrow().contains(&DocumentEvent::Loaded {
        error: Some(DocumentError::Canceled)
    }));
}

#[test]
fn test_missing_trailing_newline_is_preserved() {
    let dir = TempDir::new().unwrap();
    let location = write_file(&dir, "bare.txt", b"abc");
    let path = location.to_file_path().unwrap();
    let ctx = DocumentContext::local();
    let mut doc = Document::new(&ctx);
    assert!(doc.hide_trailing_newline());

    load(&mut doc, &location);
    assert_eq!(doc.text(), "abc");
    assert!(!doc.hide_trailing_newline());

    doc.insert(3, "d").unwrap();
    doc.save(SaveFlags::empty()).unwrap();
    doc.finish_save();
    assert_eq!(fs::read_to_string(path).unwrap(), "abcd");
}

#[test]
fn test_crlf_files_keep_their_newlines() {
    let dir = TempDir::new().unwrap();
    let location = write_file(&dir, "dos.txt", b"a\r\nb\r\n");
    let path = location.to_file_path().unwrap();
    let ctx = DocumentContext::local();
    let mut doc = Document::new(&ctx);

    load(&mut doc, &location);
    assert_eq!(doc.text(), "a\nb");
    assert_eq!(doc.newline_type(), NewlineType::CrLf);

    doc.insert(3, "\nc").unwrap();
    doc.save(SaveFlags::empty()).unwrap();
    doc.finish_save();
    assert_eq!(fs::read(path).unwrap(), b"a\r\nb\r\nc\r\n");
}

#[test]
fn test_encoding_detection_and_metadata() {
    let dir = TempDir::new().unwrap();
    let location = write_file(&dir, "latin.txt", b"caf\xE9");
    let ctx = DocumentContext::local();

    let mut detected = Document::new(&ctx);
    load(&mut detected, &location);
    assert_eq!(detected.text(), "café");
    assert_eq!(*detected.encoding(), Encoding::ISO_8859_1);
    assert_eq!(detected.get_metadata("encoding"), None);
    drop(detected);

    let mut requested = Document::new(&ctx);
    requested
        .load(location.clone(), Some(Encoding::ISO_8859_1), None, false)
        .unwrap();
    assert_eq!(requested.finish_load(), SessionStatus::Finished(Ok(())));
    assert_eq!(
        requested.get_metadata("encoding").as_deref(),
        Some("ISO-8859-1")
    );

    requested.save(SaveFlags::empty()).unwrap();
    requested.finish_save();
    let path = location.to_file_path().unwrap();
    assert_eq!(fs::read(path).unwrap(), b"caf\xE9");
}

#[test]
fn test_strict_utf8_request_fails_on_invalid_bytes() {
    let dir = TempDir::new().unwrap();
    let location = write_file(&dir, "bad.txt", b"caf\xE9");
    let ctx = DocumentContext::local();
    let mut doc = Document::new(&ctx);

    doc.load(location, Some(Encoding::UTF_8), None, false)
        .unwrap();
    assert_eq!(
        doc.finish_load(),
        SessionStatus::Finished(Err(DocumentError::ConversionFailed {
            encoding: "UTF-8".to_string()
        }))
    );
}

#[test]
fn test_cursor_placement_after_load() {
    let dir = TempDir::new().unwrap();
    let location = write_file(&dir, "pos.txt", b"hello\nworld\n");
    let ctx = DocumentContext::local();
    ctx.metadata.set(&location, "position", Some("3"));

    let mut doc = Document::new(&ctx);
    load(&mut doc, &location);
    assert_eq!(doc.cursor(), 3);

    // An explicit line wins over the stored position.
    let mut doc = Document::new(&ctx);
    doc.load(location.clone(), None, Some(2), false).unwrap();
    doc.finish_load();
    assert_eq!(doc.cursor(), 6);

    ctx.metadata.set(&location, "position", Some("not a number"));
    let mut doc = Document::new(&ctx);
    load(&mut doc, &location);
    assert_eq!(doc.cursor(), 0);
}

#[test]
fn test_restored_cursor_inside_grapheme_falls_back_to_start() {
    let dir = TempDir::new().unwrap();
    let location = write_file(&dir, "accent.txt", "e\u{301}x\n".as_bytes());
    let ctx = DocumentContext::local();
    ctx.metadata.set(&location, "position", Some("1"));

    let mut doc = Document::new(&ctx);
    load(&mut doc, &location);
    assert_eq!(doc.cursor(), 0);

    ctx.metadata.set(&location, "position", Some("2"));
    let mut doc = Document::new(&ctx);
    load(&mut doc, &location);
    assert_eq!(doc.cursor(), 2);
}

#[test]
fn test_cursor_restore_can_be_disabled() {
    let dir = TempDir::new().unwrap();
    let location = write_file(&dir, "off.txt", b"hello\n");
    let ctx = DocumentContext::with_settings(DocumentSettings {
        restore_cursor_position: false,
        ..DocumentSettings::default()
    });
    ctx.metadata.set(&location, "position", Some("3"));

    let mut doc = Document::new(&ctx);
    load(&mut doc, &location);
    assert_eq!(doc.cursor(), 0);
}

#[test]
fn test_close_persists_position_to_json_store() {
    let dir = TempDir::new().unwrap();
    let location = write_file(&dir, "keep.txt", b"hello world\n");
    let store_path = dir.path().join("metadata.json");

    {
        let store = Rc::new(editor_document::JsonMetadataStore::open(&store_path).unwrap());
        let ctx = DocumentContext {
            metadata: store.clone(),
            ..DocumentContext::local()
        };
        let mut doc = Document::new(&ctx);
        load(&mut doc, &location);
        doc.place_cursor(6);
        doc.set_language(Some("markdown"));
        doc.close();
        store.flush().unwrap();
    }

    let store = editor_document::JsonMetadataStore::open(&store_path).unwrap();
    assert_eq!(store.get(&location, "position").as_deref(), Some("6"));
    assert_eq!(store.get(&location, "language").as_deref(), Some("markdown"));

    let ctx = DocumentContext {
        metadata: Rc::new(store),
        ..DocumentContext::local()
    };
    let mut doc = Document::new(&ctx);
    load(&mut doc, &location);
    assert_eq!(doc.cursor(), 6);
    assert_eq!(doc.language(), Some("markdown"));
}

#[test]
fn test_failed_save_keeps_identity() {
    let dir = TempDir::new().unwrap();
    let ctx = DocumentContext::local();
    let mut doc = Document::from_text(&ctx, "draft");
    let target = Location::from_path(dir.path().join("no-such-dir").join("x.txt")).unwrap();

    doc.save_as(target, Encoding::UTF_8, SaveFlags::empty())
        .unwrap();
    let SessionStatus::Finished(Err(error)) = doc.finish_save() else {
        panic!("expected a failed save");
    };
    assert!(error.is_not_found());
    assert_eq!(doc.location(), None);
    assert_eq!(doc.untitled_number(), Some(1));
}
