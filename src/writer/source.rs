use std::fs;
use std::path::{Path, PathBuf};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Document, Field, CONTENT_FIELD, FILENAME_FIELD, FILEPATH_FIELD};

/// Supplies the files to index under a directory
pub trait DocumentSource: Send + Sync {
    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>>;
}

/// Plain-text files directly inside a directory (not recursive), matched by
/// a case-insensitive extension. Listing is sorted by path.
#[derive(Debug, Clone)]
pub struct TextFileSource {
    pub extension: String,
}

impl Default for TextFileSource {
    fn default() -> Self {
        TextFileSource {
            extension: "txt".to_string(),
        }
    }
}

impl TextFileSource {
    pub fn with_extension(extension: impl Into<String>) -> Self {
        TextFileSource { extension: extension.into() }
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }
}

impl DocumentSource for TextFileSource {
    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(dir).map_err(|e| Error::from(e).with_context(dir.display()))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Error::from(e).with_context(dir.display()))?.path();
            if path.is_file() && self.matches(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// Read a UTF-8 text file into a document with `content` (text), `filename`
/// and `filepath` (keywords).
pub fn load_file_document(path: &Path) -> Result<Document> {
    let bytes = fs::read(path).map_err(|e| Error::from(e).with_context(path.display()))?;
    let content = String::from_utf8(bytes).map_err(|e| {
        Error::new(ErrorKind::Encoding, format!("{}: not valid UTF-8: {}", path.display(), e.utf8_error()))
    })?;

    let absolute = fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf());
    let filename = path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut doc = Document::new();
    doc.add_field(Field::text(CONTENT_FIELD, content));
    doc.add_field(Field::keyword(FILENAME_FIELD, filename));
    doc.add_field(Field::keyword(FILEPATH_FIELD, absolute.to_string_lossy().into_owned()));
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_text_files_sorted_and_non_recursive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("A.TXT"), "a").unwrap();
        fs::write(dir.path().join("notes.md"), "m").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.txt"), "c").unwrap();

        let names: Vec<String> = TextFileSource::default()
            .list(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["A.TXT", "b.txt"]);
    }

    #[test]
    fn listing_a_missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TextFileSource::default().list(&dir.path().join("absent")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn file_document_has_content_and_keyword_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "the quick brown fox").unwrap();

        let doc = load_file_document(&path).unwrap();
        assert_eq!(doc.get_field(CONTENT_FIELD).unwrap().value, "the quick brown fox");
        assert_eq!(doc.get_field(FILENAME_FIELD).unwrap().value, "a.txt");
        assert!(Path::new(&doc.get_field(FILEPATH_FIELD).unwrap().value).is_absolute());
    }

    #[test]
    fn invalid_utf8_is_an_encoding_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        fs::write(&path, [0x66, 0x6f, 0xff, 0xfe]).unwrap();

        let err = load_file_document(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
        assert!(err.context.contains("bad.txt"));
    }
}
