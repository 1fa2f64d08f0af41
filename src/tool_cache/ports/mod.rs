//! Port contracts for tool discovery caching.

mod config;
mod discovery;
mod store;

#[cfg(test)]
pub use config::MockSourceConfigProvider;
pub use config::SourceConfigProvider;
#[cfg(test)]
pub use discovery::MockDiscoveryProvider;
pub use discovery::{DiscoveryError, DiscoveryProvider, DiscoveryResult};
pub use store::{CatalogStore, CatalogStoreError, CatalogStoreResult};
