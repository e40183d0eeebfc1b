//! Content types and language ids.
//!
//! Content types are MIME types. When the loader/saver does not report one, it is guessed from
//! the file name; the language id (syntax) is then guessed from the file name and content type.

/// Content type of documents whose type is unknown.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Metadata value meaning "plain text, no language".
pub const NO_LANGUAGE: &str = "_NORMAL_";

const UNKNOWN_CONTENT_TYPE: &str = "application/octet-stream";

/// `(extension, content type, language id)`.
const BY_EXTENSION: &[(&str, &str, Option<&str>)] = &[
    ("txt", "text/plain", None),
    ("rs", "text/rust", Some("rust")),
    ("c", "text/x-csrc", Some("c")),
    ("h", "text/x-chdr", Some("c")),
    ("cc", "text/x-c++src", Some("cpp")),
    ("cpp", "text/x-c++src", Some("cpp")),
    ("hpp", "text/x-c++hdr", Some("cpp")),
    ("py", "text/x-python", Some("python")),
    ("js", "application/javascript", Some("js")),
    ("ts", "application/typescript", Some("typescript")),
    ("json", "application/json", Some("json")),
    ("md", "text/markdown", Some("markdown")),
    ("html", "text/html", Some("html")),
    ("htm", "text/html", Some("html")),
    ("xml", "application/xml", Some("xml")),
    ("css", "text/css", Some("css")),
    ("sh", "application/x-shellscript", Some("sh")),
    ("toml", "application/toml", Some("toml")),
    ("yml", "application/x-yaml", Some("yaml")),
    ("yaml", "application/x-yaml", Some("yaml")),
    ("go", "text/x-go", Some("go")),
    ("java", "text/x-java", Some("java")),
];

fn extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Guess a content type from a file name.
pub fn guess_from_name(name: &str) -> Option<&'static str> {
    let ext = extension(name)?;
    BY_EXTENSION
        .iter()
        .find(|(known, _, _)| *known == ext)
        .map(|(_, content_type, _)| *content_type)
}

/// Returns `true` if `content_type` carries no information.
pub fn is_unknown(content_type: &str) -> bool {
    content_type.is_empty() || content_type == UNKNOWN_CONTENT_TYPE
}

/// Guess a language id from a file name, falling back to the content type.
pub fn guess_language(name: Option<&str>, content_type: &str) -> Option<&'static str> {
    if let Some(ext) = name.and_then(extension)
        && let Some((_, _, language)) = BY_EXTENSION.iter().find(|(known, _, _)| *known == ext)
    {
        return *language;
    }
    BY_EXTENSION
        .iter()
        .find(|(_, known, _)| *known == content_type)
        .and_then(|(_, _, language)| *language)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_from_name() {
        assert_eq!(guess_from_name("main.RS"), Some("text/rust"));
        assert_eq!(guess_from_name("notes.txt"), Some("text/plain"));
        assert_eq!(guess_from_name(".bashrc"), None);
        assert_eq!(guess_from_name("Makefile"), None);
    }

    #[test]
    fn test_guess_language() {
        assert_eq!(guess_language(Some("lib.rs"), DEFAULT_CONTENT_TYPE), Some("rust"));
        assert_eq!(guess_language(None, "text/x-python"), Some("python"));
        assert_eq!(guess_language(Some("notes.txt"), "text/x-python"), None);
        assert_eq!(guess_language(Some("README"), DEFAULT_CONTENT_TYPE), None);
    }
}
