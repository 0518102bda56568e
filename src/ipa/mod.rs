//! FreeIPA API interaction module
//!
//! # Module Structure
//!
//! - [`http`] - JSON-RPC transport, session login and error envelopes
//! - [`client`] - Typed FreeIPA commands (users, groups, DNS)
//! - [`types`] - Remote objects and FreeIPA value decoding
//!
//! # Example
//!
//! ```ignore
//! use freeipa_provider::ipa::IpaClient;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let url = url::Url::parse("https://ipa.example.test/")?;
//!     let client = IpaClient::connect(url, "admin", "secret", false).await?;
//!     let user = client.user_show("jdoe").await?;
//!     println!("{}", user.uid);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;
pub mod types;

pub use client::{IpaClient, Options};
pub use http::{is_not_found, RpcError};
