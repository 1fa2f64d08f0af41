//! Adapter implementations for the tool cache ports.

pub mod file;
pub mod memory;
