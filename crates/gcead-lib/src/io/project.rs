use crate::document::{Document, ProjectFile};
use crate::error::LoadError;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Loads and stores whole documents.
pub trait Persistence: Send {
    /// Read a document; on failure nothing of the candidate is kept.
    fn load(&mut self, path: &Path) -> Result<Document, LoadError>;
    /// Write `doc` to `path`. On success the document takes `path` as its
    /// filename and is no longer dirty.
    fn save_as(&mut self, doc: &mut Document, path: &Path) -> bool;
}

/// Stores documents as pretty-printed JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonProjectStore;

impl JsonProjectStore {
    pub fn new() -> Self {
        Self
    }
}

pub fn read_project(path: &Path) -> Result<Document, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let project: ProjectFile = serde_json::from_str(&text).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Document::from_project(project, Some(absolute(path))))
}

pub fn write_project(path: &Path, doc: &Document) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("creating project {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &doc.to_project())
        .with_context(|| format!("writing project {}", path.display()))?;
    Ok(())
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

impl Persistence for JsonProjectStore {
    fn load(&mut self, path: &Path) -> Result<Document, LoadError> {
        read_project(path)
    }

    fn save_as(&mut self, doc: &mut Document, path: &Path) -> bool {
        match write_project(path, doc) {
            Ok(()) => {
                doc.set_filename(Some(absolute(path)));
                doc.set_dirty(false);
                true
            }
            Err(err) => {
                log::error!("{err:#}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_restores_recordings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.ead");
        let mut doc = Document::sample_project();
        doc.set_dirty(true);
        let mut store = JsonProjectStore::new();
        assert!(store.save_as(&mut doc, &path));
        assert!(!doc.is_dirty());
        assert!(doc.filename().is_some());

        let loaded = store.load(&path).unwrap();
        assert_eq!(loaded.recording_count(), 2);
        assert_eq!(loaded.recordings()[0].ead().len(), 600);
        assert_eq!(loaded.comment(), "Sample project");
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let err = JsonProjectStore::new()
            .load(&dir.path().join("nope.ead"))
            .unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.ead");
        fs::write(&path, "{ not json").unwrap();
        let err = JsonProjectStore::new().load(&path).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }

    #[test]
    fn failed_save_keeps_document_dirty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing-dir/out.ead");
        let mut doc = Document::sample_project();
        doc.set_dirty(true);
        assert!(!JsonProjectStore::new().save_as(&mut doc, &path));
        assert!(doc.is_dirty());
        assert!(doc.filename().is_none());
    }
}
