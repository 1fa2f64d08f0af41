//! Unit tests for the tool cache services.
//!
//! Organised by operation: startup and refresh, single-source changes, and
//! reconciliation against configuration drift.

mod refresh_tests;
