//! FreeIPA provider
//!
//! Manages FreeIPA users, groups, group memberships, DNS zones and DNS
//! records from declarative resource definitions, by translating them into
//! FreeIPA JSON-RPC calls.
//!
//! # Module Structure
//!
//! - [`provider`] - Provider facade: schema, configuration, dispatch
//! - [`resource`] - Resource and data-source handlers with their field mappers
//! - [`ipa`] - FreeIPA JSON-RPC client
//! - [`state`] / [`schema`] - Declarative state and the schema it is checked against
//! - [`config`] - Connection configuration and CLI settings
//! - [`error`] - Errors and diagnostics

pub mod config;
pub mod error;
pub mod ipa;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod state;

pub use config::ProviderConfig;
pub use error::{Diagnostic, ProviderError};
pub use provider::Provider;
pub use state::ResourceData;
