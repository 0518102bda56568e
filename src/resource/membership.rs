//! `freeipa_user_group_membership` resource

use super::{required_str, vanished_or_error, Resource};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::state::ResourceData;
use async_trait::async_trait;

pub const TYPE_NAME: &str = "freeipa_user_group_membership";

/// Identity of a membership: `group/user`
pub fn membership_id(group: &str, user: &str) -> String {
    format!("{}/{}", group, user)
}

fn coordinates(data: &ResourceData) -> Result<(String, String), ProviderError> {
    if let Some(id) = data.id() {
        return match id.split_once('/') {
            Some((group, user)) if !group.is_empty() && !user.is_empty() => {
                Ok((group.to_string(), user.to_string()))
            }
            _ => Err(ProviderError::InvalidState(format!(
                "invalid membership id {:?}, expected group/user",
                id
            ))),
        };
    }
    Ok((
        required_str(data, "group")?.to_string(),
        required_str(data, "user")?.to_string(),
    ))
}

pub struct MembershipResource;

#[async_trait]
impl Resource for MembershipResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_attribute("group", Attribute::required_string().force_new())
            .with_attribute("user", Attribute::required_string().force_new())
    }

    async fn create(
        &self,
        config: &ProviderConfig,
        planned: ResourceData,
    ) -> Result<ResourceData, ProviderError> {
        let group = required_str(&planned, "group")?.to_string();
        let user = required_str(&planned, "user")?.to_string();
        tracing::debug!("Add user {} to freeipa group {}", user, group);

        let client = config.client().await?;
        client
            .group_add_member(&group, std::slice::from_ref(&user))
            .await
            .map_err(|e| ProviderError::remote("adding user to freeipa group", e))?;

        let mut created = planned;
        created.set_id(membership_id(&group, &user));
        self.read(config, created).await
    }

    async fn read(
        &self,
        config: &ProviderConfig,
        current: ResourceData,
    ) -> Result<ResourceData, ProviderError> {
        let (group, user) = coordinates(&current)?;
        tracing::debug!("Read membership of {} in freeipa group {}", user, group);

        let client = config.client().await?;
        let remote = match client.group_show(&group).await {
            Ok(remote) => remote,
            Err(e) => return vanished_or_error("reading freeipa group membership", e, current),
        };

        let is_member = remote
            .member_user
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|member| member.eq_ignore_ascii_case(&user));

        if !is_member {
            tracing::warn!("User {} is no longer a member of {}", user, group);
            let mut gone = current;
            gone.clear_id();
            return Ok(gone);
        }

        let mut data = ResourceData::new(current.schema().clone());
        data.set("group", remote.cn.as_str())?;
        data.set("user", user.as_str())?;
        data.set_id(membership_id(&remote.cn, &user));
        Ok(data)
    }

    /// Both attributes force replacement, so there is never anything to send
    async fn update(
        &self,
        config: &ProviderConfig,
        prior: &ResourceData,
        planned: ResourceData,
    ) -> Result<ResourceData, ProviderError> {
        let mut updated = planned;
        if let Some(id) = prior.id() {
            updated.set_id(id);
        }
        self.read(config, updated).await
    }

    async fn delete(
        &self,
        config: &ProviderConfig,
        current: ResourceData,
    ) -> Result<(), ProviderError> {
        let (group, user) = coordinates(&current)?;
        tracing::debug!("Remove user {} from freeipa group {}", user, group);

        let client = config.client().await?;
        client
            .group_remove_member(&group, std::slice::from_ref(&user))
            .await
            .map_err(|e| ProviderError::remote("removing user from freeipa group", e))
    }
}
