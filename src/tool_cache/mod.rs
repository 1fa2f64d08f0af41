//! Tool discovery cache for a workflow and agent platform.
//!
//! Serves the catalog of tools offered by external tool sources without
//! re-querying every source on each request. The catalog is persisted so a
//! restart can serve immediately, then reconciled against the live
//! configuration using launch fingerprints. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
