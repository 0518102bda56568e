//! `freeipa_user` resource and data source

use super::{
    fields_to_options, modified_or_unchanged, required_str, vanished_or_error, DataSource, Resource,
};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::ipa::types::{ipa_datetime, User};
use crate::ipa::Options;
use crate::schema::{Attribute, Schema};
use crate::state::ResourceData;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

pub const TYPE_NAME: &str = "freeipa_user";

const EXPIRATION_DOC: &str = "Expiration in RFC3339 format, e.g. `YYYY-MM-DDTHH:MM:SSZ`";

/// Plain state key to FreeIPA attribute pairs sent on add/mod
const REQUEST_FIELDS: &[(&str, &str)] = &[
    ("first_name", "givenname"),
    ("last_name", "sn"),
    ("full_name", "cn"),
    ("display_name", "displayname"),
    ("initials", "initials"),
    ("home_directory", "homedirectory"),
    ("gecos", "gecos"),
    ("login_shell", "loginshell"),
    ("krb_principal_name", "krbprincipalname"),
    ("email_address", "mail"),
    ("telephone_numbers", "telephonenumber"),
    ("mobile_numbers", "mobile"),
    ("uid_number", "uidnumber"),
    ("gid_number", "gidnumber"),
    ("street_address", "street"),
    ("city", "l"),
    ("province", "st"),
    ("postal_code", "postalcode"),
    ("organisation_unit", "ou"),
    ("job_title", "title"),
    ("manager", "manager"),
    ("employee_number", "employeenumber"),
    ("employee_type", "employeetype"),
    ("preferred_language", "preferredlanguage"),
    ("account_disabled", "nsaccountlock"),
    ("ssh_public_key", "ipasshpubkey"),
    ("car_license", "carlicense"),
    ("userpassword", "userpassword"),
];

/// Timestamp fields, converted from RFC3339 to FreeIPA's format
const EXPIRATION_FIELDS: &[(&str, &str)] = &[
    ("krb_principal_expiration", "krbprincipalexpiration"),
    ("krb_password_expiration", "krbpasswordexpiration"),
];

/// Attributes shared by the resource and the data source
fn user_schema() -> Schema {
    Schema::new()
        .with_attribute("first_name", Attribute::optional_string())
        .with_attribute("last_name", Attribute::optional_string())
        .with_attribute("name", Attribute::required_string())
        .with_attribute("full_name", Attribute::optional_string())
        .with_attribute("display_name", Attribute::optional_string())
        .with_attribute("initials", Attribute::optional_string())
        .with_attribute("home_directory", Attribute::optional_string())
        .with_attribute("gecos", Attribute::optional_string())
        .with_attribute("login_shell", Attribute::optional_string())
        .with_attribute("krb_principal_name", Attribute::optional_list())
        .with_attribute(
            "krb_principal_expiration",
            Attribute::optional_string().description(EXPIRATION_DOC),
        )
        .with_attribute(
            "krb_password_expiration",
            Attribute::optional_string().description(EXPIRATION_DOC),
        )
        .with_attribute("email_address", Attribute::optional_list())
        .with_attribute("telephone_numbers", Attribute::optional_list())
        .with_attribute("mobile_numbers", Attribute::optional_list())
        .with_attribute("uid_number", Attribute::optional_int())
        .with_attribute("gid_number", Attribute::optional_int())
        .with_attribute("street_address", Attribute::optional_string())
        .with_attribute("city", Attribute::optional_string())
        .with_attribute("province", Attribute::optional_string())
        .with_attribute("postal_code", Attribute::optional_string())
        .with_attribute("organisation_unit", Attribute::optional_string())
        .with_attribute("job_title", Attribute::optional_string())
        .with_attribute("manager", Attribute::optional_string())
        .with_attribute("employee_number", Attribute::optional_string())
        .with_attribute("employee_type", Attribute::optional_string())
        .with_attribute("preferred_language", Attribute::optional_string())
        .with_attribute("account_disabled", Attribute::optional_bool())
        .with_attribute("ssh_public_key", Attribute::optional_list())
        .with_attribute("car_license", Attribute::optional_list())
}

fn rfc3339(value: Option<&DateTime<Utc>>) -> String {
    value
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

/// Copy a FreeIPA user into state.
///
/// Absent multi-valued attributes become empty lists and absent scalars
/// their zero value. The first failing assignment aborts the mapping.
pub fn user_to_state(user: &User, data: &mut ResourceData) -> Result<(), ProviderError> {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    let list = |v: &Option<Vec<String>>| v.clone().unwrap_or_default();

    data.set("first_name", text(&user.givenname))?;
    data.set("last_name", text(&user.sn))?;
    data.set("name", user.uid.as_str())?;
    data.set("full_name", text(&user.cn))?;
    data.set("display_name", text(&user.displayname))?;
    data.set("initials", text(&user.initials))?;
    data.set("home_directory", text(&user.homedirectory))?;
    data.set("gecos", text(&user.gecos))?;
    data.set("login_shell", text(&user.loginshell))?;
    data.set("krb_principal_name", list(&user.krbprincipalname))?;
    data.set(
        "krb_principal_expiration",
        rfc3339(user.krbprincipalexpiration.as_ref()),
    )?;
    data.set(
        "krb_password_expiration",
        rfc3339(user.krbpasswordexpiration.as_ref()),
    )?;
    data.set("email_address", list(&user.mail))?;
    data.set("telephone_numbers", list(&user.telephonenumber))?;
    data.set("mobile_numbers", list(&user.mobile))?;
    data.set("uid_number", user.uidnumber.unwrap_or(0))?;
    data.set("gid_number", user.gidnumber.unwrap_or(0))?;
    data.set("street_address", text(&user.street))?;
    data.set("city", text(&user.l))?;
    data.set("province", text(&user.st))?;
    data.set("postal_code", text(&user.postalcode))?;
    data.set("organisation_unit", text(&user.ou))?;
    data.set("job_title", text(&user.title))?;
    data.set("manager", text(&user.manager))?;
    data.set("employee_number", text(&user.employeenumber))?;
    data.set("employee_type", text(&user.employeetype))?;
    data.set("preferred_language", text(&user.preferredlanguage))?;
    data.set("account_disabled", user.nsaccountlock.unwrap_or(false))?;
    data.set("ssh_public_key", list(&user.ipasshpubkey))?;
    data.set("car_license", list(&user.carlicense))?;
    Ok(())
}

/// Build add/mod options from state; `only` restricts to changed keys
fn user_options(data: &ResourceData, only: Option<&[&str]>) -> Result<Options, ProviderError> {
    let mut options = fields_to_options(data, REQUEST_FIELDS, only);

    for (key, attribute) in EXPIRATION_FIELDS {
        if only.is_some_and(|keys| !keys.contains(key)) {
            continue;
        }
        match data.get_str(key) {
            Some(raw) => {
                let ts = DateTime::parse_from_rfc3339(raw)
                    .map_err(|e| ProviderError::InvalidState(format!("{}: {}", key, e)))?
                    .with_timezone(&Utc);
                options.insert(attribute.to_string(), ipa_datetime(&ts));
            }
            None if only.is_some() => {
                options.insert(attribute.to_string(), Value::String(String::new()));
            }
            None => {}
        }
    }

    Ok(options)
}

/// `freeipa_user` data source: look up one user by login name
pub struct UserDataSource;

#[async_trait]
impl DataSource for UserDataSource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        user_schema()
    }

    async fn read(
        &self,
        config: &ProviderConfig,
        input: ResourceData,
    ) -> Result<ResourceData, ProviderError> {
        tracing::debug!("Read freeipa user");

        let client = config.client().await?;
        let name = required_str(&input, "name")?;

        let user = client
            .user_show(name)
            .await
            .map_err(|e| ProviderError::remote("show freeipa user", e))?;

        let mut data = ResourceData::new(input.schema().clone());
        user_to_state(&user, &mut data)?;
        data.set_id(user.uid.as_str());

        tracing::debug!("Read freeipa user {}", user.uid);
        Ok(data)
    }
}

/// `freeipa_user` resource
pub struct UserResource;

#[async_trait]
impl Resource for UserResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        let mut schema = user_schema()
            .with_attribute("userpassword", Attribute::optional_string().sensitive());
        if let Some(attr) = schema.attributes.get_mut("name") {
            attr.force_new = true;
        }
        // Filled in by the server when not configured
        for key in [
            "full_name",
            "display_name",
            "initials",
            "home_directory",
            "gecos",
            "login_shell",
            "krb_principal_name",
            "uid_number",
            "gid_number",
        ] {
            if let Some(attr) = schema.attributes.get_mut(key) {
                attr.computed = true;
            }
        }
        schema
    }

    async fn create(
        &self,
        config: &ProviderConfig,
        planned: ResourceData,
    ) -> Result<ResourceData, ProviderError> {
        tracing::debug!("Create freeipa user");

        let client = config.client().await?;
        let name = required_str(&planned, "name")?.to_string();
        let options = user_options(&planned, None)?;

        let user = client
            .user_add(&name, options)
            .await
            .map_err(|e| ProviderError::remote("creating freeipa user", e))?;

        let mut created = planned;
        created.set_id(user.uid.as_str());
        tracing::info!("Created freeipa user {}", user.uid);

        self.read(config, created).await
    }

    async fn read(
        &self,
        config: &ProviderConfig,
        current: ResourceData,
    ) -> Result<ResourceData, ProviderError> {
        tracing::debug!("Read freeipa user {:?}", current.id());

        let client = config.client().await?;
        let uid = match current.id() {
            Some(id) => id.to_string(),
            None => required_str(&current, "name")?.to_string(),
        };

        let user = match client.user_show(&uid).await {
            Ok(user) => user,
            Err(e) => return vanished_or_error("reading freeipa user", e, current),
        };

        // userpassword is write-only; keep whatever the caller holds
        let mut data = current.clone();
        user_to_state(&user, &mut data)?;
        data.set_id(user.uid.as_str());
        Ok(data)
    }

    async fn update(
        &self,
        config: &ProviderConfig,
        prior: &ResourceData,
        planned: ResourceData,
    ) -> Result<ResourceData, ProviderError> {
        let uid = prior
            .id()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::InvalidState("user has no identity".into()))?;
        tracing::debug!("Update freeipa user {}", uid);

        let changed = planned.changed_keys(prior);
        let mut updated = planned;
        updated.set_id(uid.as_str());

        let options = user_options(&updated, Some(changed.as_slice()))?;
        if options.is_empty() {
            tracing::debug!("Nothing to modify on freeipa user {}", uid);
            return self.read(config, updated).await;
        }

        let client = config.client().await?;
        modified_or_unchanged(client.user_mod(&uid, options).await)
            .map_err(|e| ProviderError::remote("updating freeipa user", e))?;

        self.read(config, updated).await
    }

    async fn delete(
        &self,
        config: &ProviderConfig,
        current: ResourceData,
    ) -> Result<(), ProviderError> {
        let uid = match current.id() {
            Some(id) => id.to_string(),
            None => required_str(&current, "name")?.to_string(),
        };
        tracing::debug!("Delete freeipa user {}", uid);

        let client = config.client().await?;
        client
            .user_del(&uid)
            .await
            .map_err(|e| ProviderError::remote("deleting freeipa user", e))
    }
}
