//! forge
//!
//! Rich remote providers: remotes whose hosts expose pull request lookups.
//!
//! # Architecture
//!
//! The [`RichRemoteProvider`] trait is the narrow interface the service
//! consumes. Provider instances come from a [`ProviderFactory`] registered
//! by the embedding application; this crate ships only detection,
//! selection and a [`mock`] provider.
//!
//! Provider failures never affect git results.
//!
//! # Modules
//!
//! - `traits`: Provider trait, pull request records, errors
//! - `factory`: Host detection and remote selection
//! - [`mock`]: Mock provider for deterministic testing

mod factory;
pub mod mock;
mod traits;

pub use factory::{detect_provider, provider_remotes, select_remote, ForgeProvider};
pub use traits::*;
