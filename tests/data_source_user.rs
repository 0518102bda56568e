//! Integration tests for the `freeipa_user` data source
//!
//! A wiremock server plays the FreeIPA JSON-RPC endpoint.

mod common;

use common::*;
use freeipa_provider::{Provider, ProviderError};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_read_maps_user_and_sets_identity() {
    let server = ipa_server().await;
    rpc("user_show")
        .respond_with(rpc_result(json!({
            "uid": ["jdoe"],
            "givenname": ["John"],
            "sn": ["Doe"]
        })))
        .mount(&server)
        .await;

    let provider = Provider::new();
    let data = provider
        .read_data_source(&config_for(&server), "freeipa_user", json!({"name": "jdoe"}))
        .await
        .expect("read should succeed");

    assert_eq!(data.id(), Some("jdoe"));
    assert_eq!(data.get_str("first_name"), Some("John"));
    assert_eq!(data.get_str("last_name"), Some("Doe"));
    assert_eq!(data.get("mobile_numbers"), Some(&json!([])));
    assert_eq!(data.get("telephone_numbers"), Some(&json!([])));
}

#[tokio::test]
async fn test_read_requests_all_attributes_for_name() {
    let server = ipa_server().await;
    rpc("user_show")
        .respond_with(rpc_result(jdoe_entry()))
        .expect(1)
        .mount(&server)
        .await;

    Provider::new()
        .read_data_source(&config_for(&server), "freeipa_user", json!({"name": "jdoe"}))
        .await
        .unwrap();

    let bodies = calls(&server, "user_show").await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["params"][0], json!(["jdoe"]));
    assert_eq!(bodies[0]["params"][1]["all"], json!(true));
    assert!(bodies[0]["params"][1]["version"].is_string());
}

#[tokio::test]
async fn test_read_populates_every_declared_field() {
    let server = ipa_server().await;
    rpc("user_show")
        .respond_with(rpc_result(jdoe_entry()))
        .mount(&server)
        .await;

    let data = Provider::new()
        .read_data_source(&config_for(&server), "freeipa_user", json!({"name": "jdoe"}))
        .await
        .unwrap();

    assert_eq!(data.get_str("full_name"), Some("John Doe"));
    assert_eq!(data.get_str("login_shell"), Some("/bin/bash"));
    assert_eq!(data.get_int("uid_number"), Some(1_200_001));
    assert_eq!(data.get_bool("account_disabled"), Some(false));
    assert_eq!(data.get_list("email_address").unwrap(), vec!["jdoe@example.test"]);
    assert_eq!(
        data.get_list("krb_principal_name").unwrap(),
        vec!["jdoe@EXAMPLE.TEST"]
    );
    assert_eq!(data.get("ssh_public_key"), Some(&json!([])));
    assert_eq!(data.get("car_license"), Some(&json!([])));
    assert_eq!(data.get_str("krb_principal_expiration"), None);
}

#[tokio::test]
async fn test_identity_comes_from_remote_object() {
    let server = ipa_server().await;
    rpc("user_show")
        .respond_with(rpc_result(jdoe_entry()))
        .mount(&server)
        .await;

    let data = Provider::new()
        .read_data_source(&config_for(&server), "freeipa_user", json!({"name": "JDoe"}))
        .await
        .unwrap();

    assert_eq!(data.id(), Some("jdoe"));
    assert_eq!(data.get_str("name"), Some("jdoe"));
}

#[tokio::test]
async fn test_repeated_reads_are_identical() {
    let server = ipa_server().await;
    rpc("user_show")
        .respond_with(rpc_result(jdoe_entry()))
        .mount(&server)
        .await;

    let provider = Provider::new();
    let config = config_for(&server);
    let first = provider
        .read_data_source(&config, "freeipa_user", json!({"name": "jdoe"}))
        .await
        .unwrap();
    let second = provider
        .read_data_source(&config, "freeipa_user", json!({"name": "jdoe"}))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.to_json(), second.to_json());
}

#[tokio::test]
async fn test_not_found_reports_single_error() {
    let server = ipa_server().await;
    rpc("user_show")
        .respond_with(rpc_error(4001, "NotFound", "ghost: user not found"))
        .mount(&server)
        .await;

    let err = Provider::new()
        .read_data_source(&config_for(&server), "freeipa_user", json!({"name": "ghost"}))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Remote { .. }));
    assert_eq!(
        err.to_diagnostic().summary,
        "Error show freeipa user: ghost: user not found"
    );
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = ipa_server().await;
    rpc("user_show")
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let err = Provider::new()
        .read_data_source(&config_for(&server), "freeipa_user", json!({"name": "jdoe"}))
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("Error show freeipa user:"));
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_rejected_login_is_configuration_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    rpc("user_show")
        .respond_with(rpc_result(jdoe_entry()))
        .expect(0)
        .mount(&server)
        .await;

    let err = Provider::new()
        .read_data_source(&config_for(&server), "freeipa_user", json!({"name": "jdoe"}))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Configuration(_)));
    assert!(err
        .to_string()
        .starts_with("Error creating freeipa identity client:"));
}

#[tokio::test]
async fn test_login_sends_form_credentials() {
    let server = ipa_server().await;
    rpc("user_show")
        .respond_with(rpc_result(jdoe_entry()))
        .mount(&server)
        .await;

    Provider::new()
        .read_data_source(&config_for(&server), "freeipa_user", json!({"name": "jdoe"}))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let login = requests
        .iter()
        .find(|r| r.url.path() == LOGIN_PATH)
        .expect("login request");
    let body = String::from_utf8_lossy(&login.body);
    assert!(body.contains("user=admin"));
    assert!(body.contains("password=Secret123"));
    assert!(login.headers.get("referer").is_some());
}
