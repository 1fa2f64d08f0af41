//! JSON file catalog store.

use crate::tool_cache::{
    domain::PersistedCatalog,
    ports::{CatalogStore, CatalogStoreError, CatalogStoreResult},
};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use mockable::{Clock, DefaultClock};
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Environment variable overriding the cache file location.
pub const CACHE_FILE_ENV: &str = "TOOL_CACHE_FILE";

/// Directory created under the user configuration directory.
const APP_DIR_NAME: &str = "toolcache";

/// File name of the cache inside [`APP_DIR_NAME`].
const CACHE_FILE_NAME: &str = "tool-cache.json";

/// Catalog store backed by a single pretty-printed JSON file.
///
/// The file is created lazily on the first successful save, together with
/// its parent directory. Saves write a sibling temporary file and rename it
/// over the target, so readers never observe a half-written catalog. No
/// cross-process locking is attempted.
pub struct JsonFileCatalogStore<C = DefaultClock> {
    path: Utf8PathBuf,
    clock: C,
    cached: Mutex<Option<PersistedCatalog>>,
    write_lock: Mutex<()>,
}

impl JsonFileCatalogStore<DefaultClock> {
    /// Creates a store for the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self::with_clock(path, DefaultClock)
    }

    /// Returns the well-known cache file location.
    ///
    /// [`CACHE_FILE_ENV`] wins when set; otherwise the file lives in the
    /// user configuration directory. Returns `None` when neither is
    /// available or the directory is not valid UTF-8.
    #[must_use]
    pub fn default_path() -> Option<Utf8PathBuf> {
        if let Some(overridden) = std::env::var_os(CACHE_FILE_ENV)
            .filter(|value| !value.is_empty())
            .and_then(|value| Utf8PathBuf::from_path_buf(value.into()).ok())
        {
            return Some(overridden);
        }

        let config_dir = Utf8PathBuf::from_path_buf(dirs::config_dir()?).ok()?;
        Some(config_dir.join(APP_DIR_NAME).join(CACHE_FILE_NAME))
    }
}

impl<C> JsonFileCatalogStore<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a store for the file at `path` stamping saves with `clock`.
    #[must_use]
    pub fn with_clock(path: impl Into<Utf8PathBuf>, clock: C) -> Self {
        Self {
            path: path.into(),
            clock,
            cached: Mutex::new(None),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn cached(&self) -> MutexGuard<'_, Option<PersistedCatalog>> {
        self.cached.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn parent_dir(&self) -> &Utf8Path {
        self.path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."))
    }

    fn file_name(&self) -> io::Result<&str> {
        self.path.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cache path '{}' has no file name", self.path),
            )
        })
    }

    fn read_contents(&self) -> io::Result<Option<String>> {
        let file_name = self.file_name()?;
        let dir = match Dir::open_ambient_dir(self.parent_dir(), ambient_authority()) {
            Ok(dir) => dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };

        match dir.read_to_string(file_name) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn read_from_disk(&self) -> PersistedCatalog {
        let contents = match self.read_contents() {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!(path = %self.path, "no tool cache file yet");
                return PersistedCatalog::empty();
            }
            Err(err) => {
                warn!(path = %self.path, error = %err, "tool cache file unreadable; starting empty");
                return PersistedCatalog::empty();
            }
        };

        match serde_json::from_str::<PersistedCatalog>(&contents) {
            Ok(catalog) if catalog.is_current_version() => {
                info!(
                    path = %self.path,
                    tool_count = catalog.tools().len(),
                    source_count = catalog.fingerprints().len(),
                    "loaded tool cache"
                );
                catalog
            }
            Ok(catalog) => {
                warn!(
                    path = %self.path,
                    version = catalog.version(),
                    "tool cache file has a different format version; starting empty"
                );
                PersistedCatalog::empty()
            }
            Err(err) => {
                warn!(path = %self.path, error = %err, "tool cache file is corrupt; starting empty");
                PersistedCatalog::empty()
            }
        }
    }

    fn write_atomically(&self, contents: &str) -> io::Result<()> {
        let file_name = self.file_name()?;
        let parent = self.parent_dir();
        Dir::create_ambient_dir_all(parent, ambient_authority())?;
        let dir = Dir::open_ambient_dir(parent, ambient_authority())?;

        let temp_name = format!(".{file_name}.tmp");
        dir.write(&temp_name, contents.as_bytes())?;
        dir.rename(&temp_name, &dir, file_name)
    }
}

impl<C> CatalogStore for JsonFileCatalogStore<C>
where
    C: Clock + Send + Sync,
{
    fn load(&self) -> PersistedCatalog {
        let mut cached = self.cached();
        cached.get_or_insert_with(|| self.read_from_disk()).clone()
    }

    fn save(&self) -> CatalogStoreResult<()> {
        // Held until the rename so files land in snapshot order.
        let _writer = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = {
            let mut cached = self.cached();
            let catalog = cached.get_or_insert_with(|| self.read_from_disk());
            catalog.touch(self.clock.utc());
            catalog.clone()
        };

        let contents =
            serde_json::to_string_pretty(&snapshot).map_err(CatalogStoreError::serialization)?;

        self.write_atomically(&contents)
            .map_err(CatalogStoreError::io)?;

        debug!(
            path = %self.path,
            tool_count = snapshot.tools().len(),
            "saved tool cache"
        );
        Ok(())
    }

    fn invalidate(&self) {
        *self.cached() = None;
    }

    fn modify(&self, change: Box<dyn FnOnce(&mut PersistedCatalog) + '_>) {
        let mut cached = self.cached();
        change(cached.get_or_insert_with(|| self.read_from_disk()));
    }

    fn inspect(&self, view: Box<dyn FnOnce(&PersistedCatalog) + '_>) {
        let mut cached = self.cached();
        view(cached.get_or_insert_with(|| self.read_from_disk()));
    }
}
