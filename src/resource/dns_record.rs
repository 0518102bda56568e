//! `freeipa_dns_record` resource
//!
//! One instance manages the values of a single record type under one name,
//! e.g. all `A` records of `www` in `example.test.`.

use super::{modified_or_unchanged, required_str, vanished_or_error, Resource};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::ipa::types::DnsRecord;
use crate::ipa::Options;
use crate::schema::{Attribute, Schema};
use crate::state::ResourceData;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub const TYPE_NAME: &str = "freeipa_dns_record";

const RECORD_TYPE_DOC: &str = concat!(
    "Record type: A, AAAA, CNAME, DNAME, DS, KX, LOC, MX, NAPTR, NS, PTR, ",
    "SRV, SSHFP, TLSA, TXT or URI"
);

/// Record types the resource can manage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Dname,
    Ds,
    Kx,
    Loc,
    Mx,
    Naptr,
    Ns,
    Ptr,
    Srv,
    Sshfp,
    Tlsa,
    Txt,
    Uri,
}

impl RecordType {
    pub const ALL: &'static [RecordType] = &[
        RecordType::A,
        RecordType::Aaaa,
        RecordType::Cname,
        RecordType::Dname,
        RecordType::Ds,
        RecordType::Kx,
        RecordType::Loc,
        RecordType::Mx,
        RecordType::Naptr,
        RecordType::Ns,
        RecordType::Ptr,
        RecordType::Srv,
        RecordType::Sshfp,
        RecordType::Tlsa,
        RecordType::Txt,
        RecordType::Uri,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Dname => "DNAME",
            RecordType::Ds => "DS",
            RecordType::Kx => "KX",
            RecordType::Loc => "LOC",
            RecordType::Mx => "MX",
            RecordType::Naptr => "NAPTR",
            RecordType::Ns => "NS",
            RecordType::Ptr => "PTR",
            RecordType::Srv => "SRV",
            RecordType::Sshfp => "SSHFP",
            RecordType::Tlsa => "TLSA",
            RecordType::Txt => "TXT",
            RecordType::Uri => "URI",
        }
    }

    /// FreeIPA attribute holding this type's values, e.g. `arecord`
    pub fn attribute(&self) -> String {
        format!("{}record", self.as_str().to_ascii_lowercase())
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::ALL
            .iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| {
                ProviderError::InvalidState(format!("unsupported DNS record type {:?}", s))
            })
    }
}

/// Identity of a record set: `name/zone/type`
pub fn record_id(name: &str, zone: &str, record_type: RecordType) -> String {
    format!("{}/{}/{}", name, zone, record_type)
}

/// Split an identity back into name, zone and type
pub fn parse_record_id(id: &str) -> Result<(String, String, RecordType), ProviderError> {
    let parts: Vec<&str> = id.splitn(3, '/').collect();
    match parts.as_slice() {
        [name, zone, kind] if !name.is_empty() && !zone.is_empty() => {
            Ok((name.to_string(), zone.to_string(), kind.parse()?))
        }
        _ => Err(ProviderError::InvalidState(format!(
            "invalid dns record id {:?}, expected name/zone/type",
            id
        ))),
    }
}

/// Coordinates of the record set addressed by `data`
fn coordinates(data: &ResourceData) -> Result<(String, String, RecordType), ProviderError> {
    match data.id() {
        Some(id) => parse_record_id(id),
        None => Ok((
            required_str(data, "name")?.to_string(),
            required_str(data, "zone_name")?.to_string(),
            required_str(data, "type")?.parse()?,
        )),
    }
}

fn record_options(data: &ResourceData, record_type: RecordType, with_ttl: bool) -> Options {
    let mut options = Options::new();
    let records = data.get_list("records").unwrap_or_default();
    options.insert(record_type.attribute(), Value::from(records));
    if with_ttl {
        if let Some(ttl) = data.get_int("ttl") {
            options.insert("dnsttl".to_string(), Value::from(ttl));
        }
    }
    options
}

pub fn record_to_state(
    record: &DnsRecord,
    zone: &str,
    record_type: RecordType,
    data: &mut ResourceData,
) -> Result<(), ProviderError> {
    data.set("name", record.idnsname.as_str())?;
    data.set("zone_name", zone)?;
    data.set("type", record_type.as_str())?;
    data.set(
        "records",
        record.records(&record_type.attribute()).unwrap_or_default(),
    )?;
    data.set("ttl", record.dnsttl.unwrap_or(0))?;
    Ok(())
}

pub struct DnsRecordResource;

#[async_trait]
impl Resource for DnsRecordResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_attribute("zone_name", Attribute::required_string().force_new())
            .with_attribute("name", Attribute::required_string().force_new())
            .with_attribute(
                "type",
                Attribute::required_string()
                    .force_new()
                    .description(RECORD_TYPE_DOC),
            )
            .with_attribute("records", Attribute::required_list())
            .with_attribute("ttl", Attribute::optional_int())
    }

    async fn create(
        &self,
        config: &ProviderConfig,
        planned: ResourceData,
    ) -> Result<ResourceData, ProviderError> {
        let name = required_str(&planned, "name")?.to_string();
        let zone = required_str(&planned, "zone_name")?.to_string();
        let record_type: RecordType = required_str(&planned, "type")?.parse()?;
        tracing::debug!("Create freeipa dns record {} {} in {}", record_type, name, zone);

        let client = config.client().await?;
        client
            .dnsrecord_add(&zone, &name, record_options(&planned, record_type, true))
            .await
            .map_err(|e| ProviderError::remote("creating freeipa dns record", e))?;

        let mut created = planned;
        created.set_id(record_id(&name, &zone, record_type));
        self.read(config, created).await
    }

    async fn read(
        &self,
        config: &ProviderConfig,
        current: ResourceData,
    ) -> Result<ResourceData, ProviderError> {
        let (name, zone, record_type) = coordinates(&current)?;
        tracing::debug!("Read freeipa dns record {} {} in {}", record_type, name, zone);

        let client = config.client().await?;
        let record = match client.dnsrecord_show(&zone, &name).await {
            Ok(record) => record,
            Err(e) => return vanished_or_error("reading freeipa dns record", e, current),
        };

        // The name still exists but carries no values of this type
        if record.records(&record_type.attribute()).is_none() {
            tracing::warn!("No {} records left for {} in {}", record_type, name, zone);
            let mut gone = current;
            gone.clear_id();
            return Ok(gone);
        }

        let mut data = ResourceData::new(current.schema().clone());
        record_to_state(&record, &zone, record_type, &mut data)?;
        data.set_id(record_id(&name, &zone, record_type));
        Ok(data)
    }

    async fn update(
        &self,
        config: &ProviderConfig,
        prior: &ResourceData,
        planned: ResourceData,
    ) -> Result<ResourceData, ProviderError> {
        let (name, zone, record_type) = coordinates(prior)?;
        tracing::debug!("Update freeipa dns record {} {} in {}", record_type, name, zone);

        let mut updated = planned;
        updated.set_id(record_id(&name, &zone, record_type));

        let records_changed = updated.has_change(prior, "records");
        let ttl_changed = updated.has_change(prior, "ttl");
        if !records_changed && !ttl_changed {
            return self.read(config, updated).await;
        }

        let mut options = Options::new();
        if records_changed {
            options = record_options(&updated, record_type, false);
        }
        if ttl_changed {
            let ttl = updated
                .get_int("ttl")
                .map(Value::from)
                .unwrap_or(Value::String(String::new()));
            options.insert("dnsttl".to_string(), ttl);
        }

        let client = config.client().await?;
        modified_or_unchanged(client.dnsrecord_mod(&zone, &name, options).await)
            .map_err(|e| ProviderError::remote("updating freeipa dns record", e))?;

        self.read(config, updated).await
    }

    async fn delete(
        &self,
        config: &ProviderConfig,
        current: ResourceData,
    ) -> Result<(), ProviderError> {
        let (name, zone, record_type) = coordinates(&current)?;
        tracing::debug!("Delete freeipa dns record {} {} in {}", record_type, name, zone);

        if current.get_list("records").unwrap_or_default().is_empty() {
            return Err(ProviderError::InvalidState(format!(
                "no {} record values to delete for {} in {}",
                record_type, name, zone
            )));
        }

        let client = config.client().await?;
        client
            .dnsrecord_del(&zone, &name, record_options(&current, record_type, false))
            .await
            .map_err(|e| ProviderError::remote("deleting freeipa dns record", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_record_type_parsing() {
        assert_eq!("aaaa".parse::<RecordType>().unwrap(), RecordType::Aaaa);
        assert_eq!(RecordType::Sshfp.attribute(), "sshfprecord");
        assert!("SPF".parse::<RecordType>().is_err());
    }

    #[test]
    fn test_record_id_round_trip() {
        let id = record_id("www", "example.test.", RecordType::A);
        assert_eq!(id, "www/example.test./A");
        let (name, zone, kind) = parse_record_id(&id).unwrap();
        assert_eq!((name.as_str(), zone.as_str(), kind), ("www", "example.test.", RecordType::A));
    }

    #[test]
    fn test_malformed_record_id() {
        assert!(parse_record_id("www").is_err());
        assert!(parse_record_id("/example.test./A").is_err());
    }

    #[test]
    fn test_record_options_use_type_attribute() {
        let data = ResourceData::from_json(
            Arc::new(DnsRecordResource.schema()),
            json!({
                "zone_name": "example.test.",
                "name": "mail",
                "type": "MX",
                "records": ["10 mx1.example.test.", "20 mx2.example.test."],
                "ttl": 3600
            }),
        )
        .unwrap();

        let options = record_options(&data, RecordType::Mx, true);
        assert_eq!(
            Value::Object(options),
            json!({
                "mxrecord": ["10 mx1.example.test.", "20 mx2.example.test."],
                "dnsttl": 3600
            })
        );
    }
}
