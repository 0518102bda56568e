//! FreeIPA Client
//!
//! Typed operations over the JSON-RPC transport, one per remote command
//! the provider issues.

use super::http::IpaHttpClient;
use super::types::{DnsRecord, DnsZone, Group, User};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use url::Url;

/// Attribute options sent with add/mod commands
pub type Options = Map<String, Value>;

/// Authenticated FreeIPA client
#[derive(Clone)]
pub struct IpaClient {
    pub http: IpaHttpClient,
}

impl IpaClient {
    /// Connect to `base_url` and log in
    pub async fn connect(
        base_url: Url,
        username: &str,
        password: &str,
        insecure: bool,
    ) -> Result<Self> {
        let http = IpaHttpClient::new(base_url, insecure)?;
        http.login(username, password)
            .await
            .context("Failed to authenticate against FreeIPA")?;
        Ok(Self { http })
    }

    /// Call `method` and decode `result.result` into `T`
    async fn entry<T: DeserializeOwned>(
        &self,
        method: &str,
        args: Vec<Value>,
        options: Options,
    ) -> Result<T> {
        let result = self.http.call(method, args, options).await?;
        let entry = result
            .get("result")
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("RPC {} answer has no result entry", method))?;
        serde_json::from_value(entry).with_context(|| format!("Failed to decode {} result", method))
    }

    async fn command(&self, method: &str, args: Vec<Value>, options: Options) -> Result<()> {
        self.http.call(method, args, options).await.map(|_| ())
    }

    fn show_options() -> Options {
        let mut options = Options::new();
        options.insert("all".to_string(), Value::Bool(true));
        options
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub async fn user_show(&self, uid: &str) -> Result<User> {
        self.entry("user_show", vec![uid.into()], Self::show_options()).await
    }

    pub async fn user_add(&self, uid: &str, options: Options) -> Result<User> {
        self.entry("user_add", vec![uid.into()], options).await
    }

    pub async fn user_mod(&self, uid: &str, options: Options) -> Result<User> {
        self.entry("user_mod", vec![uid.into()], options).await
    }

    pub async fn user_del(&self, uid: &str) -> Result<()> {
        self.command("user_del", vec![uid.into()], Options::new()).await
    }

    // =========================================================================
    // Groups
    // =========================================================================

    pub async fn group_show(&self, cn: &str) -> Result<Group> {
        self.entry("group_show", vec![cn.into()], Self::show_options()).await
    }

    pub async fn group_add(&self, cn: &str, options: Options) -> Result<Group> {
        self.entry("group_add", vec![cn.into()], options).await
    }

    pub async fn group_mod(&self, cn: &str, options: Options) -> Result<Group> {
        self.entry("group_mod", vec![cn.into()], options).await
    }

    pub async fn group_del(&self, cn: &str) -> Result<()> {
        self.command("group_del", vec![cn.into()], Options::new()).await
    }

    /// Add users to a group. Fails when nothing was added and the server
    /// reported per-member failures.
    pub async fn group_add_member(&self, cn: &str, users: &[String]) -> Result<()> {
        self.membership("group_add_member", cn, users).await
    }

    pub async fn group_remove_member(&self, cn: &str, users: &[String]) -> Result<()> {
        self.membership("group_remove_member", cn, users).await
    }

    async fn membership(&self, method: &str, cn: &str, users: &[String]) -> Result<()> {
        let mut options = Options::new();
        options.insert("user".to_string(), Value::from(users.to_vec()));
        let result = self.http.call(method, vec![cn.into()], options).await?;

        let completed = result.get("completed").and_then(Value::as_i64).unwrap_or(0);
        let failures = member_failures(&result);
        if completed == 0 && !failures.is_empty() {
            return Err(anyhow::anyhow!("{} {}: {}", method, cn, failures.join("; ")));
        }
        Ok(())
    }

    // =========================================================================
    // DNS zones
    // =========================================================================

    pub async fn dnszone_show(&self, zone: &str) -> Result<DnsZone> {
        self.entry("dnszone_show", vec![dns_name(zone)], Self::show_options()).await
    }

    pub async fn dnszone_add(&self, zone: &str, options: Options) -> Result<DnsZone> {
        self.entry("dnszone_add", vec![dns_name(zone)], options).await
    }

    pub async fn dnszone_mod(&self, zone: &str, options: Options) -> Result<DnsZone> {
        self.entry("dnszone_mod", vec![dns_name(zone)], options).await
    }

    pub async fn dnszone_del(&self, zone: &str) -> Result<()> {
        self.command("dnszone_del", vec![dns_name(zone)], Options::new()).await
    }

    // =========================================================================
    // DNS records
    // =========================================================================

    pub async fn dnsrecord_show(&self, zone: &str, name: &str) -> Result<DnsRecord> {
        self.entry(
            "dnsrecord_show",
            vec![dns_name(zone), dns_name(name)],
            Self::show_options(),
        )
        .await
    }

    pub async fn dnsrecord_add(
        &self,
        zone: &str,
        name: &str,
        options: Options,
    ) -> Result<DnsRecord> {
        self.entry("dnsrecord_add", vec![dns_name(zone), dns_name(name)], options)
            .await
    }

    pub async fn dnsrecord_mod(
        &self,
        zone: &str,
        name: &str,
        options: Options,
    ) -> Result<DnsRecord> {
        self.entry("dnsrecord_mod", vec![dns_name(zone), dns_name(name)], options)
            .await
    }

    /// Remove the record values listed in `options` from `name`
    pub async fn dnsrecord_del(&self, zone: &str, name: &str, options: Options) -> Result<()> {
        self.command("dnsrecord_del", vec![dns_name(zone), dns_name(name)], options)
            .await
    }
}

fn dns_name(name: &str) -> Value {
    serde_json::json!({ "__dns_name__": name })
}

/// Collect `failed.member.*` entries of a membership answer as text
fn member_failures(result: &Value) -> Vec<String> {
    let Some(kinds) = result
        .get("failed")
        .and_then(|f| f.get("member"))
        .and_then(Value::as_object)
    else {
        return Vec::new();
    };

    kinds
        .values()
        .filter_map(Value::as_array)
        .flatten()
        .map(|failure| match failure {
            Value::Array(pair) => pair
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(": "),
            other => other.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_member_failures_are_flattened() {
        let result = json!({
            "completed": 0,
            "failed": {
                "member": {
                    "group": [],
                    "user": [["jdoe", "This entry is already a member"]]
                }
            }
        });
        assert_eq!(
            member_failures(&result),
            vec!["jdoe: This entry is already a member".to_string()]
        );
    }

    #[test]
    fn test_member_failures_empty_when_absent() {
        assert!(member_failures(&json!({"completed": 1})).is_empty());
    }
}
