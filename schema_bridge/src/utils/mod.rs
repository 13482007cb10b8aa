//! Utilities for SchemaBridge
//!
//! This module provides utility functions used across the library.

pub mod logging;
pub mod naming;
pub mod paths;

// Re-export key utility functions
pub use logging::init_logging;
pub use naming::{column_list, placeholders, quote_identifier};
pub use paths::{resolve_path, same_file};
