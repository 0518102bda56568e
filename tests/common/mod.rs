//! Shared helpers: a wiremock stand-in for a FreeIPA server

#![allow(dead_code)]

use freeipa_provider::ProviderConfig;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const RPC_PATH: &str = "/ipa/session/json";
pub const LOGIN_PATH: &str = "/ipa/session/login_password";

/// Start a server that accepts any login
pub async fn ipa_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(
            ResponseTemplate::new(200).insert_header(
                "Set-Cookie",
                "ipa_session=MagBearerToken=test; Path=/ipa; HttpOnly",
            ),
        )
        .mount(&server)
        .await;
    server
}

pub fn config_for(server: &MockServer) -> ProviderConfig {
    ProviderConfig {
        host: server.uri(),
        username: "admin".to_string(),
        password: "Secret123".to_string(),
        insecure_skip_verify: false,
    }
}

/// Successful JSON-RPC answer wrapping one entry
pub fn rpc_result(entry: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "result": {"result": entry, "value": null, "summary": null},
        "error": null,
        "id": 0,
        "principal": "admin@EXAMPLE.TEST",
        "version": "4.9.8"
    }))
}

/// Raw JSON-RPC `result` object (membership answers)
pub fn rpc_raw_result(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "result": result,
        "error": null,
        "id": 0
    }))
}

pub fn rpc_error(code: i64, name: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "result": null,
        "error": {"code": code, "name": name, "message": message, "data": {}},
        "id": 0
    }))
}

/// Mock answering every call of `rpc_method`
pub fn rpc(rpc_method: &str) -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(path(RPC_PATH))
        .and(body_partial_json(json!({"method": rpc_method})))
}

/// Bodies of every JSON-RPC call received for `rpc_method`
pub async fn calls(server: &MockServer, rpc_method: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == RPC_PATH)
        .filter_map(|r| serde_json::from_slice::<Value>(&r.body).ok())
        .filter(|body| body["method"] == rpc_method)
        .collect()
}

pub fn jdoe_entry() -> Value {
    json!({
        "dn": "uid=jdoe,cn=users,cn=accounts,dc=example,dc=test",
        "uid": ["jdoe"],
        "givenname": ["John"],
        "sn": ["Doe"],
        "cn": ["John Doe"],
        "displayname": ["John Doe"],
        "initials": ["JD"],
        "homedirectory": ["/home/jdoe"],
        "gecos": ["John Doe"],
        "loginshell": ["/bin/bash"],
        "krbprincipalname": ["jdoe@EXAMPLE.TEST"],
        "mail": ["jdoe@example.test"],
        "uidnumber": ["1200001"],
        "gidnumber": ["1200001"],
        "nsaccountlock": false,
        "objectclass": ["top", "person", "posixaccount"]
    })
}
