//! core
//!
//! Types and helpers shared by every layer.
//!
//! # Modules
//!
//! - [`types`] - Revision helpers and content hashes
//! - [`version`] - Git version parsing and feature requirements
//! - [`paths`] - Path normalization, root splitting, symlink handling
//! - [`config`] - Configuration schema and loading

pub mod config;
pub mod paths;
pub mod types;
pub mod version;
