pub mod error;
pub mod models;
pub mod queries;

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tempfile::NamedTempFile;
use tracing::{error, info, warn};

pub use error::{Result, StoreError};
pub use models::{Document, UserRecord};

/// File-backed store holding the whole `Document` as one JSON file.
///
/// Every operation, read or write, holds the same mutex across the full
/// load -> (mutate -> write back) span. Two creates can therefore never see
/// the same next id, and a revocation that returns is visible to every
/// operation that starts afterwards.
pub struct Store {
    path: PathBuf,
    lock: Mutex<()>,
}

impl Store {
    /// Open the store at `path`, seeding an empty document if the file does
    /// not exist yet. An existing file that does not parse is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            path: path.into(),
            lock: Mutex::new(()),
        };

        {
            let _guard = store.guard()?;
            store.seed_if_missing()?;
            let doc = store.load().inspect_err(|e| {
                error!("Store file {} is unreadable: {}", store.path.display(), e);
            })?;
            info!(
                "Store opened at {} ({} users, {} chirps, {} revoked tokens)",
                store.path.display(),
                doc.users.len(),
                doc.chirps.len(),
                doc.revoked.len()
            );
        }

        Ok(store)
    }

    /// Run a read-only closure against a freshly loaded document.
    pub fn with_doc<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Document) -> Result<T>,
    {
        let _guard = self.guard()?;
        let doc = self.load()?;
        f(&doc)
    }

    /// Load, mutate and write back under one lock hold. Nothing is written
    /// when the closure returns an error.
    pub fn with_doc_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Document) -> Result<T>,
    {
        let _guard = self.guard()?;
        let mut doc = self.load()?;
        let out = f(&mut doc)?;
        self.persist(&doc)?;
        Ok(out)
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.lock.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Create the backing file with an empty document. The document is
    /// written to a temp file first and only linked into place once complete,
    /// so a crash mid-seed never leaves a truncated file behind. A zero-length
    /// file can only come from an interrupted external write and is re-seeded.
    fn seed_if_missing(&self) -> Result<()> {
        match fs::metadata(&self.path) {
            Ok(meta) if meta.len() > 0 => return Ok(()),
            Ok(_) => {
                warn!(
                    "Store file {} is empty, seeding an empty document",
                    self.path.display()
                );
                return self.persist(&Document::default());
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        info!(
            "Store file {} does not exist, seeding an empty document",
            self.path.display()
        );
        let tmp = self.write_temp(&Document::default())?;

        // Another process may have seeded first; its document stands.
        match tmp.persist_noclobber(&self.path) {
            Ok(_) => Ok(()),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e.error.into()),
        }
    }

    fn load(&self) -> Result<Document> {
        let contents = fs::read(&self.path)?;
        Ok(serde_json::from_slice(&contents)?)
    }

    /// Write the document to a sibling temp file, then rename it over the
    /// backing file so the path always holds a complete document.
    fn persist(&self, doc: &Document) -> Result<()> {
        let tmp = self.write_temp(doc)?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn write_temp(&self, doc: &Document) -> Result<NamedTempFile> {
        let bytes = serde_json::to_vec(doc)?;
        let mut tmp = NamedTempFile::new_in(self.dir())?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        Ok(tmp)
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}
