//! Read-only access to ZIP containers
//!
//! Both the top-level `.talya` document and each nested page bundle are ZIP
//! archives. The loader only ever needs three things from them: look up an
//! entry by path, extract its bytes, and list entries under a prefix.
//! [`ArchiveAccessor`] captures that, so the loader can be driven by any
//! container implementation (tests wrap it to count extractions).

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use parking_lot::Mutex;
use thiserror::Error;
use zip::ZipArchive;

/// Archive access errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Container could not be opened or is not a valid archive
    #[error("Failed to open archive: {0}")]
    Open(String),

    /// No entry at the requested path
    #[error("Archive entry not found: {0}")]
    EntryNotFound(String),

    /// Entry exists but its data could not be read
    #[error("Failed to read archive entry {path}: {reason}")]
    Read { path: String, reason: String },
}

/// Result type alias for archive operations
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;

/// A file entry inside an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path inside the archive
    pub path: String,
    /// Position in the archive's central directory
    pub index: usize,
    /// Uncompressed size in bytes
    pub size: u64,
}

/// Read-only capability set over a container
pub trait ArchiveAccessor: Send + Sync {
    /// Look up a file entry by exact path
    fn entry(&self, path: &str) -> Option<ArchiveEntry>;

    /// Extract the full uncompressed contents of an entry
    fn extract(&self, entry: &ArchiveEntry) -> ArchiveResult<Vec<u8>>;

    /// All file entries whose path starts with `prefix`, in archive order
    fn entries_with_prefix(&self, prefix: &str) -> Vec<ArchiveEntry>;
}

trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// [`ArchiveAccessor`] backed by the `zip` crate
///
/// The entry table is read once at open time, so lookups never touch the
/// underlying reader. Extraction needs exclusive access to the reader and
/// is serialized through a mutex.
pub struct ZipArchiveAccessor {
    archive: Mutex<ZipArchive<Box<dyn ReadSeek>>>,
    entries: Vec<ArchiveEntry>,
    by_path: HashMap<String, usize>,
}

impl ZipArchiveAccessor {
    /// Open an archive on disk
    pub fn open<P: AsRef<Path>>(path: P) -> ArchiveResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| ArchiveError::Open(format!("{}: {}", path.display(), e)))?;
        Self::from_reader(Box::new(BufReader::new(file)))
    }

    /// Open an archive held in memory
    pub fn from_bytes(bytes: Vec<u8>) -> ArchiveResult<Self> {
        Self::from_reader(Box::new(Cursor::new(bytes)))
    }

    fn from_reader(reader: Box<dyn ReadSeek>) -> ArchiveResult<Self> {
        let mut archive = ZipArchive::new(reader).map_err(|e| ArchiveError::Open(e.to_string()))?;

        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let file = archive
                .by_index_raw(index)
                .map_err(|e| ArchiveError::Open(e.to_string()))?;
            if file.is_dir() {
                continue;
            }
            entries.push(ArchiveEntry {
                path: file.name().to_string(),
                index,
                size: file.size(),
            });
        }

        let by_path = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.path.clone(), position))
            .collect();

        Ok(Self {
            archive: Mutex::new(archive),
            entries,
            by_path,
        })
    }

    /// Number of file entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }
}

impl std::fmt::Debug for ZipArchiveAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipArchiveAccessor")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl ArchiveAccessor for ZipArchiveAccessor {
    fn entry(&self, path: &str) -> Option<ArchiveEntry> {
        self.by_path
            .get(path)
            .and_then(|&position| self.entries.get(position))
            .cloned()
    }

    fn extract(&self, entry: &ArchiveEntry) -> ArchiveResult<Vec<u8>> {
        let read_error = |reason: String| ArchiveError::Read {
            path: entry.path.clone(),
            reason,
        };

        // Entries handed out by another archive
        let known = self
            .entry(&entry.path)
            .is_some_and(|own| own.index == entry.index);
        if !known {
            return Err(ArchiveError::EntryNotFound(entry.path.clone()));
        }

        let mut archive = self.archive.lock();
        let mut file = archive
            .by_index(entry.index)
            .map_err(|e| read_error(e.to_string()))?;

        let mut buffer = Vec::with_capacity(entry.size.min(64 * 1024 * 1024) as usize);
        file.read_to_end(&mut buffer)
            .map_err(|e| read_error(e.to_string()))?;
        Ok(buffer)
    }

    fn entries_with_prefix(&self, prefix: &str) -> Vec<ArchiveEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.path.starts_with(prefix))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn build_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.add_directory("images/", options).unwrap();
        for (name, data) in files {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_entry_lookup_and_extract() {
        let bytes = build_zip(&[("manifest.json", b"{}"), ("images/a.webp", b"AAAA")]);
        let archive = ZipArchiveAccessor::from_bytes(bytes).unwrap();

        assert_eq!(archive.len(), 2);
        let entry = archive.entry("images/a.webp").unwrap();
        assert_eq!(entry.size, 4);
        assert_eq!(archive.extract(&entry).unwrap(), b"AAAA");
        let manifest = archive.entry("manifest.json").unwrap();
        assert_eq!(archive.extract(&manifest).unwrap(), b"{}");
        assert!(archive.entry("missing.json").is_none());
        assert!(archive.entry("images/").is_none());
    }

    #[test]
    fn test_prefix_listing_skips_directories() {
        let bytes = build_zip(&[
            ("images/a.webp", b"A"),
            ("text.json", b"[]"),
            ("images/b.webp", b"B"),
        ]);
        let archive = ZipArchiveAccessor::from_bytes(bytes).unwrap();

        let paths: Vec<_> = archive
            .entries_with_prefix("images/")
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(paths, vec!["images/a.webp", "images/b.webp"]);
    }

    #[test]
    fn test_missing_entry_read() {
        let other = ZipArchiveAccessor::from_bytes(build_zip(&[("pages/index.json", b"[]")])).unwrap();
        let foreign = other.entry("pages/index.json").unwrap();

        let archive = ZipArchiveAccessor::from_bytes(build_zip(&[])).unwrap();
        assert!(archive.is_empty());
        assert!(archive.entry("pages/index.json").is_none());
        assert!(matches!(
            archive.extract(&foreign),
            Err(ArchiveError::EntryNotFound(_))
        ));
    }

    #[test]
    fn test_not_an_archive() {
        let result = ZipArchiveAccessor::from_bytes(b"definitely not a zip".to_vec());
        assert!(matches!(result, Err(ArchiveError::Open(_))));
    }

    #[test]
    fn test_open_from_disk() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.zip");
        std::fs::write(&path, build_zip(&[("a.txt", b"hello")])).unwrap();

        let archive = ZipArchiveAccessor::open(&path).unwrap();
        let entry = archive.entry("a.txt").unwrap();
        assert_eq!(archive.extract(&entry).unwrap(), b"hello");

        let missing = ZipArchiveAccessor::open(temp_dir.path().join("nope.zip"));
        assert!(matches!(missing, Err(ArchiveError::Open(_))));
    }
}
