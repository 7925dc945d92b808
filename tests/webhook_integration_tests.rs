//! Integration tests for the privacy webhooks

use reqwest::StatusCode;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use serde_json::{Value, json};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[path = "test_utils/mod.rs"]
mod test_utils;

/// Installs store `store_id` through the callback and gives it an ERP
/// config plus one sync operation.
async fn provision_store(
    client: &reqwest::Client,
    server: &test_utils::TestServerHandle,
    store_id: &str,
) {
    let response = client
        .get(server.url("/api/callback?code=provision"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .post(server.url(&format!("/api/erp-config?store_id={store_id}")))
        .json(&json!({ "erp_url": "https://erp.example.com", "erp_token": "erp-secret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .post(server.url(&format!("/api/sync-products?store_id={store_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

async fn execute(db: &DatabaseConnection, sql: &str) {
    db.execute(Statement::from_string(
        db.get_database_backend(),
        sql.to_string(),
    ))
    .await
    .unwrap();
}

async fn token_endpoint_for(store_id: &str) -> MockServer {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "store-access-token",
            "token_type": "bearer",
            "scope": "read_products",
            "user_id": store_id,
        })))
        .mount(&upstream)
        .await;
    upstream
}

#[tokio::test]
async fn test_store_redact_deletes_all_store_data() {
    let upstream = token_endpoint_for("3001").await;
    let server = test_utils::spawn_test_app(&format!("{}/token", upstream.uri()))
        .await
        .unwrap();
    let client = reqwest::Client::new();

    provision_store(&client, &server, "3001").await;
    for table in ["installations", "erp_configs", "sync_operations"] {
        assert_eq!(
            test_utils::count_rows(&server.db, table, "3001").await.unwrap(),
            1,
            "{table} should hold the provisioned row"
        );
    }

    let response = client
        .post(server.url("/api/webhooks/store-redact"))
        .json(&json!({ "store_id": 3001 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["store_id"], "3001");
    assert!(body["deleted_at"].is_string());

    for table in ["installations", "erp_configs", "sync_operations"] {
        assert_eq!(
            test_utils::count_rows(&server.db, table, "3001").await.unwrap(),
            0,
            "{table} should be empty after redaction"
        );
    }

    // Redacting an unknown store still succeeds
    let response = client
        .post(server.url("/api/webhooks/store-redact"))
        .json(&json!({ "store_id": "no-such-store" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_store_redact_failure_keeps_store_data() {
    let upstream = token_endpoint_for("3004").await;
    let server = test_utils::spawn_test_app(&format!("{}/token", upstream.uri()))
        .await
        .unwrap();
    let client = reqwest::Client::new();

    provision_store(&client, &server, "3004").await;
    execute(
        &server.db,
        "CREATE TRIGGER block_sync_delete BEFORE DELETE ON sync_operations \
         BEGIN SELECT RAISE(ABORT, 'blocked'); END",
    )
    .await;

    let response = client
        .post(server.url("/api/webhooks/store-redact"))
        .json(&json!({ "store_id": 3004 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    for table in ["installations", "erp_configs", "sync_operations"] {
        assert_eq!(
            test_utils::count_rows(&server.db, table, "3004").await.unwrap(),
            1,
            "{table} should be untouched after a failed redaction"
        );
    }

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_customer_data_request_reports_store_data() {
    let upstream = token_endpoint_for("3002").await;
    let server = test_utils::spawn_test_app(&format!("{}/token", upstream.uri()))
        .await
        .unwrap();
    let client = reqwest::Client::new();

    provision_store(&client, &server, "3002").await;

    let response = client
        .post(server.url("/api/webhooks/customers-data-request"))
        .json(&json!({
            "store_id": 3002,
            "customer": { "id": 77, "email": "buyer@example.com" },
            "data_request": { "id": 12 },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["customer_id"], "77");
    let report = &body["data_report"];
    assert_eq!(report["customer_data_held"], false);
    assert_eq!(report["installation_present"], true);
    assert_eq!(report["erp_configured"], true);
    assert_eq!(report["sync_operation_count"], 1);
    assert_eq!(report["data_categories"].as_array().unwrap().len(), 3);

    let response = client
        .post(server.url("/api/webhooks/customers-data-request"))
        .json(&json!({
            "store_id": 3002,
            "customer": { "id": 77 },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["details"]["data_request"].is_string());

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_customer_data_request_does_not_decrypt_tokens() {
    let upstream = token_endpoint_for("3005").await;
    let server = test_utils::spawn_test_app(&format!("{}/token", upstream.uri()))
        .await
        .unwrap();
    let client = reqwest::Client::new();

    provision_store(&client, &server, "3005").await;
    execute(
        &server.db,
        "UPDATE installations SET access_token_ciphertext = x'00' WHERE store_id = '3005'",
    )
    .await;

    let response = client
        .post(server.url("/api/webhooks/customers-data-request"))
        .json(&json!({
            "store_id": "3005",
            "customer": { "id": 78 },
            "data_request": { "id": 13 },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data_report"]["installation_present"], true);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_customer_redact_acknowledges() {
    let server = test_utils::spawn_test_app("http://127.0.0.1:9/token")
        .await
        .unwrap();
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/api/webhooks/customers-redact"))
        .json(&json!({
            "store_id": "3003",
            "customer": { "id": "c-9", "email": "buyer@example.com" },
            "orders_to_redact": [1, 2],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["customer_id"], "c-9");
    assert_eq!(body["store_id"], "3003");

    let response = client
        .post(server.url("/api/webhooks/customers-redact"))
        .json(&json!({ "store_id": "3003" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_webhooks_reject_get_and_bad_bodies() {
    let server = test_utils::spawn_test_app("http://127.0.0.1:9/token")
        .await
        .unwrap();
    let client = reqwest::Client::new();

    let response = client
        .get(server.url("/api/webhooks/store-redact"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let response = client
        .post(server.url("/api/webhooks/store-redact"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_FAILED");

    let response = client
        .post(server.url("/api/webhooks/store-redact"))
        .body("store_id=1")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    server.shutdown().await.unwrap();
}
