//! Object folder access and the aggregate file cache.
//!
//! Objects live one per file (`<id>.txt`) next to the id counters and the
//! per-biome ground heat files. Bulk loads read through a [`FolderCache`],
//! which snapshots every object file into one `cache.fcz` aggregate so a
//! warm start reads a single file. Any write through the store deletes the
//! aggregate.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{BankError, BankResult};

pub const CACHE_FILE: &str = "cache.fcz";
pub const NEXT_NUMBER_FILE: &str = "nextObjectNumber.txt";
pub const NEXT_NUMBER_OFFSET_FILE: &str = "nextObjectNumberOffset.txt";

/// Only object definitions go into the aggregate cache.
pub fn should_cache(file_name: &str) -> bool {
    file_name.contains(".txt")
        && !file_name.contains("groundHeat_")
        && file_name != NEXT_NUMBER_FILE
        && file_name != NEXT_NUMBER_OFFSET_FILE
}

pub fn ground_heat_file(biome: i32) -> String {
    format!("groundHeat_{biome}.txt")
}

/// Flat directory of named text files.
pub trait ObjectFolder {
    /// Whether the folder can currently be written to.
    fn is_available(&self) -> bool;

    /// Creates the backing folder if needed.
    fn ensure(&mut self) -> BankResult<()>;

    fn list_files(&self) -> BankResult<Vec<String>>;

    fn read_file(&self, name: &str) -> BankResult<Option<String>>;

    fn write_file(&mut self, name: &str, contents: &str) -> BankResult<()>;

    /// Removes `name`; removing a missing file is not an error.
    fn remove_file(&mut self, name: &str) -> BankResult<()>;
}

/// Folder on disk.
#[derive(Debug, Clone)]
pub struct DirFolder {
    root: PathBuf,
}

impl DirFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ObjectFolder for DirFolder {
    fn is_available(&self) -> bool {
        self.root.is_dir()
    }

    fn ensure(&mut self) -> BankResult<()> {
        if self.root.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(&self.root).map_err(|source| BankError::Persist {
            file: self.root.display().to_string(),
            source,
        })
    }

    fn list_files(&self) -> BankResult<Vec<String>> {
        if !self.root.is_dir() {
            return Err(BankError::MissingFolder(self.root.clone()));
        }
        let mut names = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("failed to traverse {}: {err}", self.root.display());
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn read_file(&self, name: &str) -> BankResult<Option<String>> {
        let path = self.root.join(name);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(BankError::Read {
                file: path.display().to_string(),
                source,
            }),
        }
    }

    fn write_file(&mut self, name: &str, contents: &str) -> BankResult<()> {
        let path = self.root.join(name);
        fs::write(&path, contents).map_err(|source| BankError::Persist {
            file: path.display().to_string(),
            source,
        })
    }

    fn remove_file(&mut self, name: &str) -> BankResult<()> {
        let path = self.root.join(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(BankError::Persist {
                file: path.display().to_string(),
                source,
            }),
        }
    }
}

/// In-memory folder, optionally refusing writes.
#[derive(Debug, Default, Clone)]
pub struct MemoryFolder {
    files: BTreeMap<String, String>,
    available: bool,
    read_only: bool,
    /// Names that refuse writes even when the folder does not.
    locked: BTreeSet<String>,
}

impl MemoryFolder {
    pub fn new() -> Self {
        Self {
            files: BTreeMap::new(),
            available: true,
            read_only: false,
            locked: BTreeSet::new(),
        }
    }

    /// A folder that does not exist yet and cannot be created.
    pub fn unavailable() -> Self {
        Self {
            files: BTreeMap::new(),
            available: false,
            read_only: true,
            locked: BTreeSet::new(),
        }
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn with_locked_file(mut self, name: impl Into<String>) -> Self {
        self.locked.insert(name.into());
        self
    }

    pub fn with_file(mut self, name: impl Into<String>, contents: impl Into<String>) -> Self {
        self.files.insert(name.into(), contents.into());
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    fn refuse(&self, name: &str) -> BankError {
        BankError::Persist {
            file: name.to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "folder is read-only"),
        }
    }
}

impl ObjectFolder for MemoryFolder {
    fn is_available(&self) -> bool {
        self.available
    }

    fn ensure(&mut self) -> BankResult<()> {
        if self.read_only && !self.available {
            return Err(self.refuse("."));
        }
        self.available = true;
        Ok(())
    }

    fn list_files(&self) -> BankResult<Vec<String>> {
        if !self.available {
            return Err(BankError::MissingFolder(PathBuf::from("<memory>")));
        }
        Ok(self.files.keys().cloned().collect())
    }

    fn read_file(&self, name: &str) -> BankResult<Option<String>> {
        Ok(self.files.get(name).cloned())
    }

    fn write_file(&mut self, name: &str, contents: &str) -> BankResult<()> {
        if self.read_only || self.locked.contains(name) {
            return Err(self.refuse(name));
        }
        self.files.insert(name.to_string(), contents.to_string());
        Ok(())
    }

    fn remove_file(&mut self, name: &str) -> BankResult<()> {
        if self.read_only {
            return Err(self.refuse(name));
        }
        self.files.remove(name);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedFile {
    name: String,
    contents: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct CacheSnapshot {
    files: Vec<CachedFile>,
}

/// Snapshot of every cacheable file in a folder.
#[derive(Debug, Default, Clone)]
pub struct FolderCache {
    files: Vec<CachedFile>,
    rebuilt: bool,
}

impl FolderCache {
    /// Reads the aggregate if present, otherwise scans the folder and
    /// writes a fresh aggregate.
    pub fn open(folder: &mut dyn ObjectFolder) -> BankResult<Self> {
        if !folder.is_available() {
            log::info!("object folder missing, starting with an empty bank");
            return Ok(Self::default());
        }

        if let Some(raw) = folder.read_file(CACHE_FILE)? {
            match serde_json::from_str::<CacheSnapshot>(&raw) {
                Ok(snapshot) => {
                    log::debug!("read {} objects from {CACHE_FILE}", snapshot.files.len());
                    return Ok(Self {
                        files: snapshot.files,
                        rebuilt: false,
                    });
                }
                Err(err) => {
                    log::warn!("{CACHE_FILE} unreadable ({err}), rebuilding");
                }
            }
        }

        let mut files = Vec::new();
        for name in folder.list_files()? {
            if !should_cache(&name) {
                continue;
            }
            if let Some(contents) = folder.read_file(&name)? {
                files.push(CachedFile { name, contents });
            }
        }

        let snapshot = CacheSnapshot { files };
        match serde_json::to_string(&snapshot) {
            Ok(raw) => {
                if let Err(err) = folder.write_file(CACHE_FILE, &raw) {
                    log::warn!("could not write {CACHE_FILE}: {err}");
                }
            }
            Err(source) => {
                return Err(BankError::Cache {
                    file: CACHE_FILE.to_string(),
                    source,
                });
            }
        }

        Ok(Self {
            files: snapshot.files,
            rebuilt: true,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// True when the aggregate had to be regenerated from the folder.
    pub fn rebuilt(&self) -> bool {
        self.rebuilt
    }

    pub fn file_name(&self, index: usize) -> Option<&str> {
        self.files.get(index).map(|file| file.name.as_str())
    }

    pub fn contents(&self, index: usize) -> Option<&str> {
        self.files.get(index).map(|file| file.contents.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn cache_filter_skips_counters_and_heat() {
        assert!(should_cache("12.txt"));
        assert!(!should_cache("groundHeat_3.txt"));
        assert!(!should_cache(NEXT_NUMBER_FILE));
        assert!(!should_cache(NEXT_NUMBER_OFFSET_FILE));
        assert!(!should_cache(CACHE_FILE));
    }

    #[test]
    fn cache_is_built_once_then_reused() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("1.txt"), "id=1").expect("write object");
        fs::write(dir.path().join(NEXT_NUMBER_FILE), "2").expect("write counter");

        let mut folder = DirFolder::new(dir.path());
        let first = FolderCache::open(&mut folder).expect("first open");
        assert!(first.rebuilt());
        assert_eq!(first.len(), 1);
        assert_eq!(first.file_name(0), Some("1.txt"));
        assert!(dir.path().join(CACHE_FILE).exists());

        let second = FolderCache::open(&mut folder).expect("second open");
        assert!(!second.rebuilt());
        assert_eq!(second.contents(0), Some("id=1"));
    }

    #[test]
    fn read_only_memory_folder_refuses_writes() {
        let mut folder = MemoryFolder::new().read_only();
        assert!(folder.write_file("1.txt", "id=1").is_err());
        assert!(folder.read_file("1.txt").expect("read").is_none());
    }
}
