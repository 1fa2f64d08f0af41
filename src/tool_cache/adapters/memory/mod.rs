//! In-memory adapters for the tool cache ports.

mod config;
mod discovery;
mod store;

pub use config::StaticSourceConfig;
pub use discovery::InMemoryDiscoveryProvider;
pub use store::InMemoryCatalogStore;
