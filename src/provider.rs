//! FreeIPA provider
//!
//! Entry point for the host engine: exposes the schema, turns the provider
//! block into a [`ProviderConfig`], and dispatches lifecycle calls to the
//! registered handlers by type name.

use crate::config::{ProviderConfig, ENV_HOST, ENV_PASSWORD, ENV_USERNAME};
use crate::error::ProviderError;
use crate::resource::registry::Entry;
use crate::resource::{replacement_keys, DataSource, Registry, Resource};
use crate::schema::{Attribute, ProviderSchema, Schema};
use crate::state::ResourceData;
use serde_json::Value;
use std::sync::Arc;

fn provider_schema() -> Schema {
    Schema::new()
        .with_attribute(
            "host",
            Attribute::optional_string()
                .env_default(ENV_HOST)
                .default_value("")
                .description("The FreeIPA host"),
        )
        .with_attribute(
            "username",
            Attribute::optional_string()
                .env_default(ENV_USERNAME)
                .default_value("")
                .description("Username to use for connection"),
        )
        .with_attribute(
            "password",
            Attribute::optional_string()
                .sensitive()
                .env_default(ENV_PASSWORD)
                .default_value("")
                .description("Password to use for connection"),
        )
        .with_attribute(
            "insecure",
            Attribute::optional_bool()
                .default_value(false)
                .description("Whether to verify the server's SSL certificate"),
        )
}

/// The provider: its own schema plus the handler registry
pub struct Provider {
    schema: Arc<Schema>,
    registry: Registry,
}

impl Provider {
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    pub fn with_registry(registry: Registry) -> Self {
        Self {
            schema: Arc::new(provider_schema()),
            registry,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn schema(&self) -> ProviderSchema {
        ProviderSchema {
            provider: (*self.schema).clone(),
            resources: self.registry.resource_schemas(),
            data_sources: self.registry.data_source_schemas(),
        }
    }

    /// Parse the raw provider block against the provider schema
    pub fn provider_data(&self, raw: Value) -> Result<ResourceData, ProviderError> {
        ResourceData::from_json(self.schema.clone(), raw)
    }

    /// Build the connection configuration; never fails, connection errors
    /// surface on first client use
    pub fn configure(&self, data: &ResourceData) -> ProviderConfig {
        let config = ProviderConfig::from_data(data);
        tracing::debug!("Configured provider for host {:?}", config.host);
        config
    }

    fn resource(&self, type_name: &str) -> Result<&Entry<dyn Resource>, ProviderError> {
        self.registry
            .resource(type_name)
            .ok_or_else(|| ProviderError::UnknownType {
                kind: "resource",
                name: type_name.to_string(),
            })
    }

    fn data_source(&self, type_name: &str) -> Result<&Entry<dyn DataSource>, ProviderError> {
        self.registry
            .data_source(type_name)
            .ok_or_else(|| ProviderError::UnknownType {
                kind: "data source",
                name: type_name.to_string(),
            })
    }

    fn state(entry_schema: &Arc<Schema>, raw: Value) -> Result<ResourceData, ProviderError> {
        let data = ResourceData::from_json(entry_schema.clone(), raw)?;
        data.validate_required()?;
        Ok(data)
    }

    pub async fn read_data_source(
        &self,
        config: &ProviderConfig,
        type_name: &str,
        raw: Value,
    ) -> Result<ResourceData, ProviderError> {
        let entry = self.data_source(type_name)?;
        let input = Self::state(&entry.schema, raw)?;
        entry.handler.read(config, input).await
    }

    pub async fn create(
        &self,
        config: &ProviderConfig,
        type_name: &str,
        planned: Value,
    ) -> Result<ResourceData, ProviderError> {
        let entry = self.resource(type_name)?;
        let planned = Self::state(&entry.schema, planned)?;
        entry.handler.create(config, planned).await
    }

    pub async fn read(
        &self,
        config: &ProviderConfig,
        type_name: &str,
        current: Value,
    ) -> Result<ResourceData, ProviderError> {
        let entry = self.resource(type_name)?;
        let current = ResourceData::from_json(entry.schema.clone(), current)?;
        entry.handler.read(config, current).await
    }

    pub async fn update(
        &self,
        config: &ProviderConfig,
        type_name: &str,
        prior: Value,
        planned: Value,
    ) -> Result<ResourceData, ProviderError> {
        let entry = self.resource(type_name)?;
        let prior = ResourceData::from_json(entry.schema.clone(), prior)?;
        let mut planned = Self::state(&entry.schema, planned)?;
        planned.carry_computed(&prior);

        let replace = replacement_keys(&prior, &planned);
        if !replace.is_empty() {
            return Err(ProviderError::RequiresReplacement(replace));
        }

        entry.handler.update(config, &prior, planned).await
    }

    pub async fn delete(
        &self,
        config: &ProviderConfig,
        type_name: &str,
        current: Value,
    ) -> Result<(), ProviderError> {
        let entry = self.resource(type_name)?;
        let current = ResourceData::from_json(entry.schema.clone(), current)?;
        entry.handler.delete(config, current).await
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_configure_uses_explicit_values() {
        let provider = Provider::new();
        let data = provider
            .provider_data(json!({
                "host": "ipa.example.test",
                "username": "admin",
                "password": "secret",
                "insecure": true
            }))
            .unwrap();

        let config = provider.configure(&data);
        assert_eq!(config.host, "ipa.example.test");
        assert_eq!(config.username, "admin");
        assert_eq!(config.password, "secret");
        assert!(config.insecure_skip_verify);
    }

    #[test]
    fn test_insecure_defaults_to_false() {
        let provider = Provider::new();
        let data = provider
            .provider_data(json!({"host": "ipa.example.test"}))
            .unwrap();
        assert!(!provider.configure(&data).insecure_skip_verify);
    }

    #[test]
    fn test_provider_block_type_mismatch_is_rejected() {
        let provider = Provider::new();
        assert!(matches!(
            provider.provider_data(json!({"insecure": "yes"})),
            Err(ProviderError::InvalidState(_))
        ));
    }

    #[test]
    fn test_schema_exposes_every_handler() {
        let schema = Provider::new().schema();
        assert_eq!(schema.resources.len(), 5);
        assert!(schema.data_sources.contains_key("freeipa_user"));
        assert!(schema.provider.attribute("password").unwrap().sensitive);
    }

    #[tokio::test]
    async fn test_unknown_resource_type() {
        let provider = Provider::new();
        let err = provider
            .create(&ProviderConfig::default(), "freeipa_host", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown resource type: freeipa_host");
    }

    #[tokio::test]
    async fn test_data_source_requires_name() {
        let provider = Provider::new();
        let err = provider
            .read_data_source(&ProviderConfig::default(), "freeipa_user", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_update_rejects_force_new_change() {
        let provider = Provider::new();
        let err = provider
            .update(
                &ProviderConfig::default(),
                "freeipa_group",
                json!({"id": "devs", "name": "devs"}),
                json!({"name": "developers"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::RequiresReplacement(keys) if keys == vec!["name".to_string()]
        ));
    }

    #[tokio::test]
    async fn test_missing_host_is_configuration_error() {
        let provider = Provider::new();
        let err = provider
            .read_data_source(&ProviderConfig::default(), "freeipa_user", json!({"name": "jdoe"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }
}
