//! `freeipa_dns_zone` resource

use super::{fields_to_options, modified_or_unchanged, required_str, vanished_or_error, Resource};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::ipa::types::DnsZone;
use crate::schema::{Attribute, Schema};
use crate::state::ResourceData;
use async_trait::async_trait;
use serde_json::Value;

pub const TYPE_NAME: &str = "freeipa_dns_zone";

const REQUEST_FIELDS: &[(&str, &str)] = &[
    ("authoritative_nameserver", "idnssoamname"),
    ("admin_email_address", "idnssoarname"),
    ("soa_refresh", "idnssoarefresh"),
    ("soa_retry", "idnssoaretry"),
    ("soa_expire", "idnssoaexpire"),
    ("soa_minimum", "idnssoaminimum"),
    ("ttl", "dnsttl"),
    ("default_ttl", "dnsdefaultttl"),
    ("dynamic_updates", "idnsallowdynupdate"),
    ("allow_ptr_sync", "idnsallowsyncptr"),
];

pub fn zone_to_state(zone: &DnsZone, data: &mut ResourceData) -> Result<(), ProviderError> {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();

    data.set("zone_name", zone.idnsname.as_str())?;
    data.set("authoritative_nameserver", text(&zone.idnssoamname))?;
    data.set("admin_email_address", text(&zone.idnssoarname))?;
    data.set("soa_serial_number", zone.idnssoaserial.unwrap_or(0))?;
    data.set("soa_refresh", zone.idnssoarefresh.unwrap_or(0))?;
    data.set("soa_retry", zone.idnssoaretry.unwrap_or(0))?;
    data.set("soa_expire", zone.idnssoaexpire.unwrap_or(0))?;
    data.set("soa_minimum", zone.idnssoaminimum.unwrap_or(0))?;
    data.set("ttl", zone.dnsttl.unwrap_or(0))?;
    data.set("default_ttl", zone.dnsdefaultttl.unwrap_or(0))?;
    data.set("dynamic_updates", zone.idnsallowdynupdate.unwrap_or(false))?;
    data.set("allow_ptr_sync", zone.idnsallowsyncptr.unwrap_or(false))?;
    Ok(())
}

pub struct DnsZoneResource;

#[async_trait]
impl Resource for DnsZoneResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_attribute("zone_name", Attribute::required_string().force_new())
            .with_attribute("authoritative_nameserver", Attribute::optional_string().computed())
            .with_attribute("admin_email_address", Attribute::optional_string().computed())
            .with_attribute("soa_serial_number", Attribute::optional_int().computed())
            .with_attribute("soa_refresh", Attribute::optional_int().computed())
            .with_attribute("soa_retry", Attribute::optional_int().computed())
            .with_attribute("soa_expire", Attribute::optional_int().computed())
            .with_attribute("soa_minimum", Attribute::optional_int().computed())
            .with_attribute("ttl", Attribute::optional_int())
            .with_attribute("default_ttl", Attribute::optional_int())
            .with_attribute("dynamic_updates", Attribute::optional_bool().default_value(false))
            .with_attribute("allow_ptr_sync", Attribute::optional_bool().default_value(false))
            .with_attribute(
                "skip_overlap_check",
                Attribute::optional_bool()
                    .default_value(false)
                    .description("Create the zone even if it overlaps an existing one"),
            )
    }

    async fn create(
        &self,
        config: &ProviderConfig,
        planned: ResourceData,
    ) -> Result<ResourceData, ProviderError> {
        let zone_name = required_str(&planned, "zone_name")?.to_string();
        tracing::debug!("Create freeipa dns zone {}", zone_name);

        let client = config.client().await?;
        let mut options = fields_to_options(&planned, REQUEST_FIELDS, None);
        if planned.get_bool("skip_overlap_check").unwrap_or(false) {
            options.insert("skip_overlap_check".to_string(), Value::Bool(true));
        }

        let zone = client
            .dnszone_add(&zone_name, options)
            .await
            .map_err(|e| ProviderError::remote("creating freeipa dns zone", e))?;

        let mut created = planned;
        created.set_id(zone.idnsname.as_str());
        tracing::info!("Created freeipa dns zone {}", zone.idnsname);

        self.read(config, created).await
    }

    async fn read(
        &self,
        config: &ProviderConfig,
        current: ResourceData,
    ) -> Result<ResourceData, ProviderError> {
        let zone_name = match current.id() {
            Some(id) => id.to_string(),
            None => required_str(&current, "zone_name")?.to_string(),
        };
        tracing::debug!("Read freeipa dns zone {}", zone_name);

        let client = config.client().await?;
        let zone = match client.dnszone_show(&zone_name).await {
            Ok(zone) => zone,
            Err(e) => return vanished_or_error("reading freeipa dns zone", e, current),
        };

        // skip_overlap_check only matters at creation
        let mut data = current.clone();
        zone_to_state(&zone, &mut data)?;
        data.set_id(zone.idnsname.as_str());
        Ok(data)
    }

    async fn update(
        &self,
        config: &ProviderConfig,
        prior: &ResourceData,
        planned: ResourceData,
    ) -> Result<ResourceData, ProviderError> {
        let zone_name = prior
            .id()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::InvalidState("dns zone has no identity".into()))?;
        tracing::debug!("Update freeipa dns zone {}", zone_name);

        let changed: Vec<&str> = planned
            .changed_keys(prior)
            .into_iter()
            .filter(|key| REQUEST_FIELDS.iter().any(|(k, _)| k == key))
            .collect();

        let mut updated = planned;
        updated.set_id(zone_name.as_str());

        let options = fields_to_options(&updated, REQUEST_FIELDS, Some(changed.as_slice()));
        if options.is_empty() {
            tracing::debug!("Nothing to modify on freeipa dns zone {}", zone_name);
            return self.read(config, updated).await;
        }

        let client = config.client().await?;
        modified_or_unchanged(client.dnszone_mod(&zone_name, options).await)
            .map_err(|e| ProviderError::remote("updating freeipa dns zone", e))?;

        self.read(config, updated).await
    }

    async fn delete(
        &self,
        config: &ProviderConfig,
        current: ResourceData,
    ) -> Result<(), ProviderError> {
        let zone_name = match current.id() {
            Some(id) => id.to_string(),
            None => required_str(&current, "zone_name")?.to_string(),
        };
        tracing::debug!("Delete freeipa dns zone {}", zone_name);

        let client = config.client().await?;
        client
            .dnszone_del(&zone_name)
            .await
            .map_err(|e| ProviderError::remote("deleting freeipa dns zone", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_zone_to_state() {
        let zone: DnsZone = serde_json::from_value(json!({
            "idnsname": [{"__dns_name__": "example.test."}],
            "idnssoamname": [{"__dns_name__": "ipa.example.test."}],
            "idnssoarname": [{"__dns_name__": "hostmaster"}],
            "idnssoaserial": ["1700000001"],
            "idnssoarefresh": ["3600"],
            "idnssoaretry": ["900"],
            "idnssoaexpire": ["1209600"],
            "idnssoaminimum": ["3600"],
            "idnsallowdynupdate": ["FALSE"]
        }))
        .unwrap();

        let mut data = ResourceData::new(Arc::new(DnsZoneResource.schema()));
        zone_to_state(&zone, &mut data).unwrap();

        assert_eq!(data.get_str("zone_name"), Some("example.test."));
        assert_eq!(data.get_str("authoritative_nameserver"), Some("ipa.example.test."));
        assert_eq!(data.get_int("soa_serial_number"), Some(1_700_000_001));
        assert_eq!(data.get_int("soa_expire"), Some(1_209_600));
        assert_eq!(data.get_int("ttl"), Some(0));
        assert_eq!(data.get_bool("dynamic_updates"), Some(false));
    }

    #[test]
    fn test_create_options_skip_unset() {
        let data = ResourceData::from_json(
            Arc::new(DnsZoneResource.schema()),
            json!({"zone_name": "example.test.", "ttl": 600, "dynamic_updates": true}),
        )
        .unwrap();
        let options = fields_to_options(&data, REQUEST_FIELDS, None);
        assert_eq!(
            Value::Object(options),
            json!({"dnsttl": 600, "idnsallowdynupdate": true, "idnsallowsyncptr": false})
        );
    }
}
