//! Resource abstraction layer
//!
//! Each FreeIPA object kind is handled by a type implementing [`Resource`]
//! (managed objects) or [`DataSource`] (read-only lookups). Handlers follow
//! one shape: read state, build a request, call the client, copy the answer
//! back into fresh state.
//!
//! # Architecture
//!
//! - [`registry`] - Immutable table of handlers keyed by type name
//! - [`user`] - `freeipa_user` resource and data source
//! - [`group`] - `freeipa_group`
//! - [`dns_zone`] - `freeipa_dns_zone`
//! - [`dns_record`] - `freeipa_dns_record`
//! - [`membership`] - `freeipa_user_group_membership`

pub mod dns_record;
pub mod dns_zone;
pub mod group;
pub mod membership;
pub mod registry;
pub mod user;

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::ipa::http::{rpc_error_code, EMPTY_MODLIST};
use crate::ipa::{is_not_found, Options};
use crate::schema::{AttributeType, Schema};
use crate::state::ResourceData;
use async_trait::async_trait;
use serde_json::Value;

pub use registry::Registry;

/// Lifecycle handlers of a managed resource type
#[async_trait]
pub trait Resource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    /// Create the remote object, then return its state as read back
    async fn create(
        &self,
        config: &ProviderConfig,
        planned: ResourceData,
    ) -> Result<ResourceData, ProviderError>;

    /// Refresh state; a vanished remote object yields state without identity
    async fn read(
        &self,
        config: &ProviderConfig,
        current: ResourceData,
    ) -> Result<ResourceData, ProviderError>;

    async fn update(
        &self,
        config: &ProviderConfig,
        prior: &ResourceData,
        planned: ResourceData,
    ) -> Result<ResourceData, ProviderError>;

    async fn delete(
        &self,
        config: &ProviderConfig,
        current: ResourceData,
    ) -> Result<(), ProviderError>;
}

/// Read handler of a data source type
#[async_trait]
pub trait DataSource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    async fn read(
        &self,
        config: &ProviderConfig,
        input: ResourceData,
    ) -> Result<ResourceData, ProviderError>;
}

/// Handle a failed read of a managed resource: a missing remote object
/// clears the identity, anything else is an error.
pub(crate) fn vanished_or_error(
    action: &str,
    error: anyhow::Error,
    mut current: ResourceData,
) -> Result<ResourceData, ProviderError> {
    if is_not_found(&error) {
        tracing::warn!("{}: remote object is gone, removing from state", action);
        current.clear_id();
        Ok(current)
    } else {
        Err(ProviderError::remote(action, error))
    }
}

/// Accept FreeIPA's "no modifications to be performed" answer to a `*_mod`
/// call; the remote object already matches.
pub(crate) fn modified_or_unchanged<T>(result: anyhow::Result<T>) -> anyhow::Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if rpc_error_code(&e) == Some(EMPTY_MODLIST) => {
            tracing::debug!("Nothing to modify: {}", e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Fetch a required string field
pub(crate) fn required_str<'a>(
    data: &'a ResourceData,
    key: &str,
) -> Result<&'a str, ProviderError> {
    data.get_str(key)
        .ok_or_else(|| ProviderError::InvalidState(format!("{} is required", key)))
}

/// Copy state fields into request options using a `(state key, ipa attribute)` table.
///
/// With `only` set, just those state keys are considered (used by updates);
/// cleared strings and lists are sent as empty strings so the server drops them.
pub(crate) fn fields_to_options(
    data: &ResourceData,
    fields: &[(&str, &str)],
    only: Option<&[&str]>,
) -> Options {
    let mut options = Options::new();
    for (key, attribute) in fields {
        if let Some(only) = only {
            if !only.contains(key) {
                continue;
            }
        }
        let ty = data.schema().attribute(key).map(|a| a.ty);
        let value = match (ty, data.get(key)) {
            (Some(AttributeType::String), Some(Value::String(s))) if s.is_empty() => {
                only.map(|_| Value::String(String::new()))
            }
            (Some(AttributeType::StringList), Some(Value::Array(items))) if items.is_empty() => {
                only.map(|_| Value::String(String::new()))
            }
            (Some(AttributeType::String | AttributeType::StringList), None) => {
                only.map(|_| Value::String(String::new()))
            }
            (_, Some(value)) => Some(value.clone()),
            (_, None) => None,
        };
        if let Some(value) = value {
            options.insert(attribute.to_string(), value);
        }
    }
    options
}

/// Names of changed attributes that cannot be updated in place
pub(crate) fn replacement_keys(prior: &ResourceData, planned: &ResourceData) -> Vec<String> {
    planned
        .schema()
        .force_new()
        .filter(|key| planned.has_change(prior, key))
        .map(str::to_string)
        .collect()
}
