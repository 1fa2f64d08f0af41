//! Toolcache: tool discovery caching for agent workflow platforms.
//!
//! Serving the tools offered by external tool sources normally means
//! launching or contacting each source and asking it what it offers. This
//! crate keeps the answer in memory, persists it across restarts, and uses
//! launch fingerprints to tell when a persisted answer has gone stale.
//!
//! # Architecture
//!
//! Toolcache follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for discovery, configuration, and
//!   persistence
//! - **Adapters**: Concrete implementations of ports (JSON file, in-memory)
//!
//! # Modules
//!
//! - [`tool_cache`]: Tool snapshot, fingerprints, persistence, and refresh
//!   orchestration

pub mod tool_cache;
