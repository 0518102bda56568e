//! Resource Registry
//!
//! Immutable table of resource and data-source handlers keyed by type name.
//! Built once by the provider and shared by reference afterwards.

use super::dns_record::DnsRecordResource;
use super::dns_zone::DnsZoneResource;
use super::group::GroupResource;
use super::membership::MembershipResource;
use super::user::{UserDataSource, UserResource};
use super::{DataSource, Resource};
use crate::schema::Schema;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A handler together with its schema, built once
pub struct Entry<H: ?Sized> {
    pub schema: Arc<Schema>,
    pub handler: Box<H>,
}

/// All handlers the provider serves
pub struct Registry {
    resources: BTreeMap<&'static str, Entry<dyn Resource>>,
    data_sources: BTreeMap<&'static str, Entry<dyn DataSource>>,
}

impl Registry {
    /// Registry with every FreeIPA handler
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_resource(Box::new(DnsRecordResource));
        registry.register_resource(Box::new(DnsZoneResource));
        registry.register_resource(Box::new(UserResource));
        registry.register_resource(Box::new(GroupResource));
        registry.register_resource(Box::new(MembershipResource));
        registry.register_data_source(Box::new(UserDataSource));
        registry
    }

    pub fn empty() -> Self {
        Self {
            resources: BTreeMap::new(),
            data_sources: BTreeMap::new(),
        }
    }

    pub fn register_resource(&mut self, handler: Box<dyn Resource>) {
        let schema = Arc::new(handler.schema());
        self.resources
            .insert(handler.type_name(), Entry { schema, handler });
    }

    pub fn register_data_source(&mut self, handler: Box<dyn DataSource>) {
        let schema = Arc::new(handler.schema());
        self.data_sources
            .insert(handler.type_name(), Entry { schema, handler });
    }

    pub fn resource(&self, name: &str) -> Option<&Entry<dyn Resource>> {
        self.resources.get(name)
    }

    pub fn data_source(&self, name: &str) -> Option<&Entry<dyn DataSource>> {
        self.data_sources.get(name)
    }

    /// Get all resource type names
    pub fn resource_names(&self) -> Vec<&'static str> {
        self.resources.keys().copied().collect()
    }

    pub fn data_source_names(&self) -> Vec<&'static str> {
        self.data_sources.keys().copied().collect()
    }

    pub fn resource_schemas(&self) -> BTreeMap<&'static str, Schema> {
        self.resources
            .iter()
            .map(|(name, entry)| (*name, (*entry.schema).clone()))
            .collect()
    }

    pub fn data_source_schemas(&self) -> BTreeMap<&'static str, Schema> {
        self.data_sources
            .iter()
            .map(|(name, entry)| (*name, (*entry.schema).clone()))
            .collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lists_all_resources() {
        let registry = Registry::new();
        assert_eq!(
            registry.resource_names(),
            vec![
                "freeipa_dns_record",
                "freeipa_dns_zone",
                "freeipa_group",
                "freeipa_user",
                "freeipa_user_group_membership",
            ]
        );
        assert_eq!(registry.data_source_names(), vec!["freeipa_user"]);
    }

    #[test]
    fn test_user_data_source_requires_name_only() {
        let registry = Registry::new();
        let entry = registry.data_source("freeipa_user").unwrap();
        assert_eq!(entry.schema.required().collect::<Vec<_>>(), vec!["name"]);
        assert!(entry.schema.attribute("mobile_numbers").is_some());
        assert!(entry.schema.attribute("userpassword").is_none());
    }

    #[test]
    fn test_unknown_type_is_absent() {
        let registry = Registry::new();
        assert!(registry.resource("freeipa_host").is_none());
        assert!(registry.data_source("freeipa_group").is_none());
    }
}
