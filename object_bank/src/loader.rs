//! Incremental bulk load of an object folder.
//!
//! Hosts call [`BankLoader::step`] once per frame to keep a progress bar
//! moving, then [`BankLoader::finish`] to run the derived-feature pass.

use log::{debug, info, warn};
use object_formats::decode;
use serde::Serialize;

use crate::error::{BankError, BankResult};
use crate::folder::FolderCache;
use crate::resolver::{resolve, ResolveReport};
use crate::store::ObjectStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
    /// The folder aggregate was regenerated during this load.
    pub rebuilt_cache: bool,
    pub resolve: ResolveReport,
}

pub struct BankLoader {
    store: ObjectStore,
    cache: FolderCache,
    cursor: usize,
    loaded: usize,
    skipped: usize,
}

impl BankLoader {
    /// Opens the store's folder, reading or rebuilding the aggregate.
    pub fn start(mut store: ObjectStore) -> BankResult<Self> {
        let cache = FolderCache::open(store.folder.as_mut())?;
        info!(
            "loading {} object files{}",
            cache.len(),
            if cache.rebuilt() { " (cache rebuilt)" } else { "" }
        );
        Ok(Self {
            store,
            cache,
            cursor: 0,
            loaded: 0,
            skipped: 0,
        })
    }

    pub fn total(&self) -> usize {
        self.cache.len()
    }

    pub fn is_done(&self) -> bool {
        self.cursor >= self.cache.len()
    }

    pub fn progress(&self) -> f32 {
        if self.cache.is_empty() {
            return 1.0;
        }
        self.cursor as f32 / self.cache.len() as f32
    }

    /// Decodes and installs the next file. Returns progress in `[0, 1]`.
    ///
    /// Malformed files are logged and skipped.
    pub fn step(&mut self) -> f32 {
        if self.is_done() {
            return 1.0;
        }
        let index = self.cursor;
        self.cursor += 1;

        let name = self.cache.file_name(index).unwrap_or_default().to_string();
        let Some(text) = self.cache.contents(index) else {
            self.skipped += 1;
            return self.progress();
        };

        match decode(text) {
            Ok(decoded) if decoded.record.id >= 0 => {
                let searchable =
                    self.store.config.enable_search && !decoded.record.links.is_dummy();
                let id = self.store.install(decoded.record, decoded.tapout, searchable);
                debug!("loaded object {id} from {name}");
                self.loaded += 1;
            }
            Ok(decoded) => {
                warn!("{name} declares negative id {}, skipped", decoded.record.id);
                self.skipped += 1;
            }
            Err(source) => {
                let err = BankError::Decode { file: name, source };
                warn!("{err}, skipped");
                self.skipped += 1;
            }
        }
        self.progress()
    }

    /// Steps until every file has been processed.
    pub fn run(&mut self) {
        while !self.is_done() {
            self.step();
        }
    }

    /// Runs the remaining steps and the derived-feature pass.
    pub fn finish(mut self) -> (ObjectStore, LoadReport) {
        self.run();
        let resolve = resolve(&mut self.store);
        info!(
            "object bank ready: {} loaded, {} skipped",
            self.loaded, self.skipped
        );
        let report = LoadReport {
            loaded: self.loaded,
            skipped: self.skipped,
            rebuilt_cache: self.cache.rebuilt(),
            resolve,
        };
        (self.store, report)
    }
}

/// Loads every object in the store's folder in one go.
pub fn load_bank(store: ObjectStore) -> BankResult<(ObjectStore, LoadReport)> {
    Ok(BankLoader::start(store)?.finish())
}
