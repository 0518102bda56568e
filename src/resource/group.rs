//! `freeipa_group` resource

use super::{fields_to_options, modified_or_unchanged, required_str, vanished_or_error, Resource};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::ipa::types::Group;
use crate::schema::{Attribute, Schema};
use crate::state::ResourceData;
use async_trait::async_trait;
use serde_json::Value;

pub const TYPE_NAME: &str = "freeipa_group";

const REQUEST_FIELDS: &[(&str, &str)] = &[
    ("description", "description"),
    ("gid_number", "gidnumber"),
];

pub fn group_to_state(group: &Group, data: &mut ResourceData) -> Result<(), ProviderError> {
    data.set("name", group.cn.as_str())?;
    data.set("description", group.description.clone().unwrap_or_default())?;
    data.set("gid_number", group.gidnumber.unwrap_or(0))?;
    data.set("nonposix", !group.is_posix() && !group.is_external())?;
    data.set("external", group.is_external())?;
    Ok(())
}

pub struct GroupResource;

#[async_trait]
impl Resource for GroupResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_attribute("name", Attribute::required_string().force_new())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("gid_number", Attribute::optional_int().computed())
            .with_attribute(
                "nonposix",
                Attribute::optional_bool()
                    .force_new()
                    .default_value(false)
                    .description("Create as a non-POSIX group"),
            )
            .with_attribute(
                "external",
                Attribute::optional_bool()
                    .force_new()
                    .default_value(false)
                    .description("Allow adding external non-IPA members from trusted domains"),
            )
    }

    async fn create(
        &self,
        config: &ProviderConfig,
        planned: ResourceData,
    ) -> Result<ResourceData, ProviderError> {
        tracing::debug!("Create freeipa group");

        let client = config.client().await?;
        let name = required_str(&planned, "name")?.to_string();

        let mut options = fields_to_options(&planned, REQUEST_FIELDS, None);
        if planned.get_bool("nonposix").unwrap_or(false) {
            options.insert("nonposix".to_string(), Value::Bool(true));
        }
        if planned.get_bool("external").unwrap_or(false) {
            options.insert("external".to_string(), Value::Bool(true));
        }

        let group = client
            .group_add(&name, options)
            .await
            .map_err(|e| ProviderError::remote("creating freeipa group", e))?;

        let mut created = planned;
        created.set_id(group.cn.as_str());
        tracing::info!("Created freeipa group {}", group.cn);

        self.read(config, created).await
    }

    async fn read(
        &self,
        config: &ProviderConfig,
        current: ResourceData,
    ) -> Result<ResourceData, ProviderError> {
        let cn = match current.id() {
            Some(id) => id.to_string(),
            None => required_str(&current, "name")?.to_string(),
        };
        tracing::debug!("Read freeipa group {}", cn);

        let client = config.client().await?;
        let group = match client.group_show(&cn).await {
            Ok(group) => group,
            Err(e) => return vanished_or_error("reading freeipa group", e, current),
        };

        let mut data = ResourceData::new(current.schema().clone());
        group_to_state(&group, &mut data)?;
        data.set_id(group.cn.as_str());
        Ok(data)
    }

    async fn update(
        &self,
        config: &ProviderConfig,
        prior: &ResourceData,
        planned: ResourceData,
    ) -> Result<ResourceData, ProviderError> {
        let cn = prior
            .id()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::InvalidState("group has no identity".into()))?;
        tracing::debug!("Update freeipa group {}", cn);

        let changed: Vec<&str> = planned
            .changed_keys(prior)
            .into_iter()
            .filter(|key| REQUEST_FIELDS.iter().any(|(k, _)| k == key))
            .collect();

        let mut updated = planned;
        updated.set_id(cn.as_str());

        let options = fields_to_options(&updated, REQUEST_FIELDS, Some(changed.as_slice()));
        if options.is_empty() {
            tracing::debug!("Nothing to modify on freeipa group {}", cn);
            return self.read(config, updated).await;
        }

        let client = config.client().await?;
        modified_or_unchanged(client.group_mod(&cn, options).await)
            .map_err(|e| ProviderError::remote("updating freeipa group", e))?;

        self.read(config, updated).await
    }

    async fn delete(
        &self,
        config: &ProviderConfig,
        current: ResourceData,
    ) -> Result<(), ProviderError> {
        let cn = match current.id() {
            Some(id) => id.to_string(),
            None => required_str(&current, "name")?.to_string(),
        };
        tracing::debug!("Delete freeipa group {}", cn);

        let client = config.client().await?;
        client
            .group_del(&cn)
            .await
            .map_err(|e| ProviderError::remote("deleting freeipa group", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn state_for(group: serde_json::Value) -> ResourceData {
        let group: Group = serde_json::from_value(group).unwrap();
        let mut data = ResourceData::new(Arc::new(GroupResource.schema()));
        group_to_state(&group, &mut data).unwrap();
        data
    }

    #[test]
    fn test_posix_group() {
        let data = state_for(json!({
            "cn": ["developers"],
            "gidnumber": ["1500"],
            "objectclass": ["top", "groupofnames", "posixgroup"]
        }));
        assert_eq!(data.get_str("name"), Some("developers"));
        assert_eq!(data.get_int("gid_number"), Some(1500));
        assert_eq!(data.get_bool("nonposix"), Some(false));
        assert_eq!(data.get_bool("external"), Some(false));
    }

    #[test]
    fn test_nonposix_group() {
        let data = state_for(json!({
            "cn": ["wiki-editors"],
            "description": ["Wiki"],
            "objectclass": ["top", "groupofnames", "ipausergroup"]
        }));
        assert_eq!(data.get_bool("nonposix"), Some(true));
        assert_eq!(data.get_int("gid_number"), Some(0));
        assert_eq!(data.get_str("description"), Some("Wiki"));
    }

    #[test]
    fn test_external_group_is_not_nonposix() {
        let data = state_for(json!({
            "cn": ["ad-admins"],
            "objectclass": ["top", "groupofnames", "ipaexternalgroup"]
        }));
        assert_eq!(data.get_bool("external"), Some(true));
        assert_eq!(data.get_bool("nonposix"), Some(false));
    }
}
