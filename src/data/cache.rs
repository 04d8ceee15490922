use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use super::model::Dataset;

/// Holds the most recently loaded dataset, keyed by its source path.
///
/// Asking for the same path again returns the shared dataset without touching
/// the file. Asking for another path drops the old entry and loads the new
/// one. A failed load leaves the cache empty.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entry: Option<(PathBuf, Arc<Dataset>)>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached dataset for `path`, or run `load` and cache its result.
    pub fn get_or_load<F>(&mut self, path: &Path, load: F) -> Result<Arc<Dataset>>
    where
        F: FnOnce(&Path) -> Result<Dataset>,
    {
        if let Some((cached_path, dataset)) = &self.entry {
            if cached_path == path {
                log::debug!("Dataset cache hit for {}", path.display());
                return Ok(Arc::clone(dataset));
            }
            log::debug!(
                "Source changed from {} to {}; invalidating cache",
                cached_path.display(),
                path.display()
            );
        }
        self.entry = None;

        let dataset = Arc::new(load(path)?);
        self.entry = Some((path.to_path_buf(), Arc::clone(&dataset)));
        Ok(dataset)
    }

    /// Drop the cached dataset so the next request re-reads the file.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Path of the cached dataset, if any.
    pub fn cached_path(&self) -> Option<&Path> {
        self.entry.as_ref().map(|(p, _)| p.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn same_path_loads_once() {
        let mut cache = DatasetCache::new();
        let calls = Cell::new(0);
        let load = |_: &Path| {
            calls.set(calls.get() + 1);
            Ok(Dataset::default())
        };

        let a = cache.get_or_load(Path::new("a.xlsx"), load).unwrap();
        let b = cache.get_or_load(Path::new("a.xlsx"), load).unwrap();
        assert_eq!(calls.get(), 1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn new_path_or_invalidate_reloads() {
        let mut cache = DatasetCache::new();
        let calls = Cell::new(0);
        let load = |_: &Path| {
            calls.set(calls.get() + 1);
            Ok(Dataset::default())
        };

        cache.get_or_load(Path::new("a.xlsx"), load).unwrap();
        cache.get_or_load(Path::new("b.xlsx"), load).unwrap();
        assert_eq!(calls.get(), 2);
        assert_eq!(cache.cached_path(), Some(Path::new("b.xlsx")));

        cache.invalidate();
        assert_eq!(cache.cached_path(), None);
        cache.get_or_load(Path::new("b.xlsx"), load).unwrap();
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn failed_load_is_not_cached() {
        let mut cache = DatasetCache::new();
        cache
            .get_or_load(Path::new("a.xlsx"), |_| Ok(Dataset::default()))
            .unwrap();
        let err = cache.get_or_load(Path::new("broken.xlsx"), |_| anyhow::bail!("corrupt"));
        assert!(err.is_err());
        assert_eq!(cache.cached_path(), None);
    }
}
