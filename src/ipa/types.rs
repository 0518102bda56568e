//! FreeIPA remote objects
//!
//! FreeIPA's JSON-RPC answers wrap almost everything in arrays: a user's
//! given name arrives as `["John"]`, numbers arrive as `["1001"]`, timestamps
//! as `[{"__datetime__": "20301231000000Z"}]` and DNS names as
//! `[{"__dns_name__": "example.test."}]`. The decoders below flatten those
//! into plain Rust values. Absent attributes decode as `None`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Format FreeIPA uses for `__datetime__` values
pub const IPA_DATETIME_FORMAT: &str = "%Y%m%d%H%M%SZ";

/// Unwrap the FreeIPA special-value objects into their string payload
fn scalar_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if b { "TRUE" } else { "FALSE" }.to_string()),
        Value::Object(map) => map
            .get("__datetime__")
            .or_else(|| map.get("__dns_name__"))
            .or_else(|| map.get("__base64__"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// Flatten any FreeIPA attribute value into a list of strings
pub fn string_list(value: Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.into_iter().filter_map(scalar_string).collect(),
        other => scalar_string(other).into_iter().collect(),
    }
}

fn first_string(value: Option<Value>) -> Option<String> {
    value.and_then(|v| string_list(v).into_iter().next())
}

/// Single-valued string attribute
pub fn single<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(first_string(Option::<Value>::deserialize(deserializer)?))
}

/// Single-valued string attribute that must be present
pub fn required<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    first_string(Option::<Value>::deserialize(deserializer)?)
        .ok_or_else(|| serde::de::Error::custom("attribute has no value"))
}

/// Multi-valued attribute; `None` when the server omitted it
pub fn multi<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .filter(|v| !v.is_null())
        .map(string_list))
}

/// Integer attribute, sent by the server as a string or a number
pub fn integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match first_string(Option::<Value>::deserialize(deserializer)?) {
        None => Ok(None),
        Some(s) => s
            .parse::<i64>()
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid integer {:?}: {}", s, e))),
    }
}

/// Boolean attribute, sent as `true` or as `["TRUE"]`
pub fn boolean<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(first_string(Option::<Value>::deserialize(deserializer)?)
        .map(|s| s.eq_ignore_ascii_case("true")))
}

/// Timestamp attribute in FreeIPA's `__datetime__` format
pub fn datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match first_string(Option::<Value>::deserialize(deserializer)?) {
        None => Ok(None),
        Some(s) => parse_ipa_datetime(&s).map(Some).map_err(serde::de::Error::custom),
    }
}

pub fn parse_ipa_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    NaiveDateTime::parse_from_str(s, IPA_DATETIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp {:?}: {}", s, e))
}

/// Encode a timestamp the way FreeIPA expects it in requests
pub fn ipa_datetime(value: &DateTime<Utc>) -> Value {
    serde_json::json!({ "__datetime__": value.format(IPA_DATETIME_FORMAT).to_string() })
}

/// A FreeIPA user entry (`user_show` with `all: true`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "required")]
    pub uid: String,
    #[serde(default, deserialize_with = "single")]
    pub givenname: Option<String>,
    #[serde(default, deserialize_with = "single")]
    pub sn: Option<String>,
    #[serde(default, deserialize_with = "single")]
    pub cn: Option<String>,
    #[serde(default, deserialize_with = "single")]
    pub displayname: Option<String>,
    #[serde(default, deserialize_with = "single")]
    pub initials: Option<String>,
    #[serde(default, deserialize_with = "single")]
    pub homedirectory: Option<String>,
    #[serde(default, deserialize_with = "single")]
    pub gecos: Option<String>,
    #[serde(default, deserialize_with = "single")]
    pub loginshell: Option<String>,
    #[serde(default, deserialize_with = "multi")]
    pub krbprincipalname: Option<Vec<String>>,
    #[serde(default, deserialize_with = "datetime")]
    pub krbprincipalexpiration: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "datetime")]
    pub krbpasswordexpiration: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "multi")]
    pub mail: Option<Vec<String>>,
    #[serde(default, deserialize_with = "multi")]
    pub telephonenumber: Option<Vec<String>>,
    #[serde(default, deserialize_with = "multi")]
    pub mobile: Option<Vec<String>>,
    #[serde(default, deserialize_with = "integer")]
    pub uidnumber: Option<i64>,
    #[serde(default, deserialize_with = "integer")]
    pub gidnumber: Option<i64>,
    #[serde(default, deserialize_with = "single")]
    pub street: Option<String>,
    #[serde(default, deserialize_with = "single")]
    pub l: Option<String>,
    #[serde(default, deserialize_with = "single")]
    pub st: Option<String>,
    #[serde(default, deserialize_with = "single")]
    pub postalcode: Option<String>,
    #[serde(default, deserialize_with = "single")]
    pub ou: Option<String>,
    #[serde(default, deserialize_with = "single")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "single")]
    pub manager: Option<String>,
    #[serde(default, deserialize_with = "single")]
    pub employeenumber: Option<String>,
    #[serde(default, deserialize_with = "single")]
    pub employeetype: Option<String>,
    #[serde(default, deserialize_with = "single")]
    pub preferredlanguage: Option<String>,
    #[serde(default, deserialize_with = "boolean")]
    pub nsaccountlock: Option<bool>,
    #[serde(default, deserialize_with = "multi")]
    pub ipasshpubkey: Option<Vec<String>>,
    #[serde(default, deserialize_with = "multi")]
    pub carlicense: Option<Vec<String>>,
}

/// A FreeIPA group entry
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Group {
    #[serde(deserialize_with = "required")]
    pub cn: String,
    #[serde(default, deserialize_with = "single")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "integer")]
    pub gidnumber: Option<i64>,
    #[serde(default, deserialize_with = "multi")]
    pub objectclass: Option<Vec<String>>,
    #[serde(default, deserialize_with = "multi")]
    pub member_user: Option<Vec<String>>,
    #[serde(default, deserialize_with = "multi")]
    pub member_group: Option<Vec<String>>,
}

impl Group {
    fn has_objectclass(&self, class: &str) -> bool {
        self.objectclass
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|c| c.eq_ignore_ascii_case(class))
    }

    pub fn is_posix(&self) -> bool {
        self.has_objectclass("posixgroup")
    }

    pub fn is_external(&self) -> bool {
        self.has_objectclass("ipaexternalgroup")
    }
}

/// A FreeIPA DNS zone entry
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DnsZone {
    #[serde(deserialize_with = "required")]
    pub idnsname: String,
    #[serde(default, deserialize_with = "single")]
    pub idnssoamname: Option<String>,
    #[serde(default, deserialize_with = "single")]
    pub idnssoarname: Option<String>,
    #[serde(default, deserialize_with = "integer")]
    pub idnssoaserial: Option<i64>,
    #[serde(default, deserialize_with = "integer")]
    pub idnssoarefresh: Option<i64>,
    #[serde(default, deserialize_with = "integer")]
    pub idnssoaretry: Option<i64>,
    #[serde(default, deserialize_with = "integer")]
    pub idnssoaexpire: Option<i64>,
    #[serde(default, deserialize_with = "integer")]
    pub idnssoaminimum: Option<i64>,
    #[serde(default, deserialize_with = "integer")]
    pub dnsttl: Option<i64>,
    #[serde(default, deserialize_with = "integer")]
    pub dnsdefaultttl: Option<i64>,
    #[serde(default, deserialize_with = "boolean")]
    pub idnsallowdynupdate: Option<bool>,
    #[serde(default, deserialize_with = "boolean")]
    pub idnsallowsyncptr: Option<bool>,
}

/// A FreeIPA DNS resource record set for one name
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DnsRecord {
    #[serde(deserialize_with = "required")]
    pub idnsname: String,
    #[serde(default, deserialize_with = "integer")]
    pub dnsttl: Option<i64>,
    /// Every other attribute, including the `<type>record` lists
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl DnsRecord {
    /// Values of one `<type>record` attribute; `None` when absent
    pub fn records(&self, attribute: &str) -> Option<Vec<String>> {
        self.attributes
            .get(attribute)
            .filter(|v| !v.is_null())
            .cloned()
            .map(string_list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_decodes_ipa_arrays() {
        let user: User = serde_json::from_value(json!({
            "uid": ["jdoe"],
            "givenname": ["John"],
            "sn": ["Doe"],
            "uidnumber": ["1234"],
            "gidnumber": ["1234"],
            "nsaccountlock": false,
            "telephonenumber": ["555-0100", "555-0101"],
            "krbprincipalexpiration": [{"__datetime__": "20301231000000Z"}],
            "dn": "uid=jdoe,cn=users,cn=accounts,dc=example,dc=test"
        }))
        .unwrap();

        assert_eq!(user.uid, "jdoe");
        assert_eq!(user.givenname.as_deref(), Some("John"));
        assert_eq!(user.uidnumber, Some(1234));
        assert_eq!(user.nsaccountlock, Some(false));
        assert_eq!(
            user.telephonenumber,
            Some(vec!["555-0100".to_string(), "555-0101".to_string()])
        );
        assert_eq!(user.mobile, None);
        assert_eq!(
            user.krbprincipalexpiration.unwrap().to_rfc3339(),
            "2030-12-31T00:00:00+00:00"
        );
    }

    #[test]
    fn test_user_without_uid_is_rejected() {
        let result: Result<User, _> = serde_json::from_value(json!({"givenname": ["John"]}));
        assert!(result.is_err());
    }

    #[test]
    fn test_boolean_accepts_ldap_strings() {
        let zone: DnsZone = serde_json::from_value(json!({
            "idnsname": [{"__dns_name__": "example.test."}],
            "idnsallowdynupdate": ["TRUE"],
            "idnsallowsyncptr": ["FALSE"]
        }))
        .unwrap();
        assert_eq!(zone.idnsname, "example.test.");
        assert_eq!(zone.idnsallowdynupdate, Some(true));
        assert_eq!(zone.idnsallowsyncptr, Some(false));
    }

    #[test]
    fn test_group_object_classes() {
        let group: Group = serde_json::from_value(json!({
            "cn": ["admins"],
            "objectclass": ["top", "groupofnames", "posixgroup", "ipausergroup"]
        }))
        .unwrap();
        assert!(group.is_posix());
        assert!(!group.is_external());
    }

    #[test]
    fn test_dns_record_lists_by_attribute() {
        let record: DnsRecord = serde_json::from_value(json!({
            "idnsname": [{"__dns_name__": "www"}],
            "arecord": ["192.0.2.10", "192.0.2.11"],
            "dnsttl": ["300"]
        }))
        .unwrap();
        assert_eq!(record.idnsname, "www");
        assert_eq!(record.dnsttl, Some(300));
        assert_eq!(
            record.records("arecord"),
            Some(vec!["192.0.2.10".to_string(), "192.0.2.11".to_string()])
        );
        assert_eq!(record.records("aaaarecord"), None);
    }

    #[test]
    fn test_ipa_datetime_encoding() {
        let ts = parse_ipa_datetime("20300101120000Z").unwrap();
        assert_eq!(ipa_datetime(&ts), json!({"__datetime__": "20300101120000Z"}));
    }
}
