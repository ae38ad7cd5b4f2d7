//! ui
//!
//! Terminal output for the `gscope` binary.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All output goes through this module so quiet mode and JSON output are
//! handled in one place. The library itself never prints.

pub mod output;
