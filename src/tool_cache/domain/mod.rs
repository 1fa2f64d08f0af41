//! Domain model for tool discovery caching.
//!
//! Tool entries, source identity and launch definitions, fingerprints,
//! per-source health, the persisted catalog, and the in-memory snapshot.
//! Nothing here performs I/O.

mod catalog;
mod error;
mod fingerprint;
mod ids;
mod launch;
mod state;
mod status;
mod tool;

pub use catalog::{CATALOG_FORMAT_VERSION, PersistedCatalog};
pub use error::{ParseSourceHealthStatusError, ToolCacheDomainError};
pub use fingerprint::{FINGERPRINT_LEN, SourceFingerprint, fingerprint};
pub use ids::{INTERNAL_SOURCE, SourceName};
pub use launch::SourceLaunchSpec;
pub use state::{CachePhase, CacheSnapshot};
pub use status::{SourceHealthStatus, SourceStatus, SourceStatusTracker};
pub use tool::ToolEntry;
