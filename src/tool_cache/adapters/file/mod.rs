//! Filesystem adapters for the tool cache ports.

mod store;

pub use store::{CACHE_FILE_ENV, JsonFileCatalogStore};
