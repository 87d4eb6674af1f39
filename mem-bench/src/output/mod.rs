//! Output modules for rendering benchmark results.
//!
//! Supports the plain result lines, a comfy-table view, JSON, and a progress
//! spinner.

pub mod json;
pub mod progress;
pub mod summary;
pub mod table;
