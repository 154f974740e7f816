use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use zkbank_crypto::{PlaceholderGenerator, SequentialGenerator};
use zkbank_ledger::{InMemoryStore, LedgerConfig, TransactionLedger};
use zkbank_server::{Server, ServerConfig};

fn build_server(config: ServerConfig) -> Server {
    let ledger = Arc::new(TransactionLedger::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(SequentialGenerator::new("api")),
        LedgerConfig::default(),
    ));
    Server::with_ledger(config, "test-node".to_string(), ledger)
}

/// Hands out the same identifier on every call.
struct FixedIdGenerator;

impl PlaceholderGenerator for FixedIdGenerator {
    fn transaction_id(&self) -> String {
        "0xfixed".to_string()
    }

    fn signature(&self) -> String {
        "0xsig".to_string()
    }

    fn public_key(&self) -> String {
        "0xkey".to_string()
    }
}

fn test_server() -> TestServer {
    let server = build_server(ServerConfig::default());
    server.start();
    TestServer::new(server.router()).unwrap()
}

async fn create(server: &TestServer, body: Value) -> String {
    let response = server.post("/api/transactions/create").json(&body).await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: Value = response.json();
    body["transactionId"].as_str().unwrap().to_string()
}

async fn sign(server: &TestServer, id: &str, signer: &str) -> axum_test::TestResponse {
    server
        .post(&format!("/api/transactions/{}/sign", id))
        .json(&json!({ "signer": signer, "signature": "0xsig", "publicKey": "0xkey" }))
        .await
}

async fn notarize(server: &TestServer, id: &str) -> axum_test::TestResponse {
    server
        .post(&format!("/api/transactions/{}/notarize", id))
        .json(&json!({ "notary": "0xnotary", "signature": "0xsig", "publicKey": "0xkey" }))
        .await
}

#[tokio::test]
async fn test_health_check() {
    let server = test_server();
    let response = server.get("/api/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "OK");
    assert_eq!(body["network"], "testnet");
    assert!(body["timestamp"].is_string());
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_health_unavailable_before_start() {
    let server = build_server(ServerConfig::default());
    let test = TestServer::new(server.router()).unwrap();

    let response = test.get("/api/health").await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_mutations_refused_while_shutting_down() {
    let server = build_server(ServerConfig::default());
    server.start();
    let test = TestServer::new(server.router()).unwrap();
    server.stop();

    let response = test
        .post("/api/transactions/create")
        .json(&json!({ "initiator": "0xa", "counterparty": "0xb", "amount": 5 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);

    let response = test.get("/api/transactions").await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_full_workflow() {
    let server = test_server();
    let id = create(
        &server,
        json!({ "initiator": "0xa", "counterparty": "0xb", "amount": 1000 }),
    )
    .await;

    let response = server.get(&format!("/api/transactions/{}", id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["transaction"]["status"], "pending");
    assert_eq!(body["transaction"]["requiredSignatures"], 2);
    assert_eq!(body["transaction"]["notaryRequired"], true);
    assert_eq!(body["transaction"]["completed"], false);

    let body: Value = sign(&server, &id, "0xa").await.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["transaction"]["status"], "pending");

    let body: Value = sign(&server, &id, "0xb").await.json();
    assert_eq!(body["transaction"]["status"], "ready_for_notary");

    let response = notarize(&server, &id).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["transaction"]["status"], "ready_for_completion");
    assert_eq!(body["transaction"]["notarySignature"]["notary"], "0xnotary");

    let response = server
        .post(&format!("/api/transactions/{}/complete", id))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["transaction"]["status"], "completed");
    assert_eq!(body["transaction"]["completed"], true);
    assert!(body["transaction"]["completedAt"].is_string());

    let body: Value = server
        .get(&format!("/api/transactions/{}/status", id))
        .await
        .json();
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["signaturesCount"], 2);
    assert_eq!(body["hasNotarySignature"], true);
    assert_eq!(body["progress"], 100);
}

#[tokio::test]
async fn test_completed_transaction_rejects_everything() {
    let server = test_server();
    let id = create(
        &server,
        json!({
            "initiator": "0xa",
            "counterparty": "0xb",
            "amount": 10,
            "requiredSignatures": 1,
            "notaryRequired": false
        }),
    )
    .await;

    let body: Value = sign(&server, &id, "0xa").await.json();
    assert_eq!(body["transaction"]["status"], "ready_for_completion");

    let response = server
        .post(&format!("/api/transactions/{}/complete", id))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = sign(&server, &id, "0xc").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "ALREADY_COMPLETED");

    let response = server
        .post(&format!("/api/transactions/{}/complete", id))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_missing_fields() {
    let server = test_server();
    let response = server
        .post("/api/transactions/create")
        .json(&json!({ "initiator": "0xa", "amount": 10 }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["error"].as_str().unwrap().contains("counterparty"));
}

#[tokio::test]
async fn test_create_malformed_body() {
    let server = test_server();
    let response = server
        .post("/api/transactions/create")
        .text("{not json")
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_guard_failures_map_to_bad_request() {
    let server = test_server();
    let id = create(
        &server,
        json!({ "initiator": "0xa", "counterparty": "0xb", "amount": 10 }),
    )
    .await;

    let response = server
        .post(&format!("/api/transactions/{}/complete", id))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "INSUFFICIENT_SIGNATURES");

    let response = notarize(&server, &id).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "INSUFFICIENT_SIGNATURES");

    sign(&server, &id, "0xa").await;
    let response = sign(&server, &id, "0xa").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "DUPLICATE_SIGNER");

    sign(&server, &id, "0xb").await;
    let response = server
        .post(&format!("/api/transactions/{}/complete", id))
        .await;
    let body: Value = response.json();
    assert_eq!(body["code"], "MISSING_NOTARY");

    assert_eq!(notarize(&server, &id).await.status_code(), StatusCode::OK);
    let response = notarize(&server, &id).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "NOTARY_ALREADY_SET");
}

#[tokio::test]
async fn test_notary_not_required() {
    let server = test_server();
    let id = create(
        &server,
        json!({
            "initiator": "0xa",
            "counterparty": "0xb",
            "amount": 10,
            "requiredSignatures": 1,
            "notaryRequired": false
        }),
    )
    .await;
    sign(&server, &id, "0xa").await;

    let response = notarize(&server, &id).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "NOTARY_NOT_REQUIRED");
}

#[tokio::test]
async fn test_sign_missing_fields() {
    let server = test_server();
    let id = create(
        &server,
        json!({ "initiator": "0xa", "counterparty": "0xb", "amount": 10 }),
    )
    .await;

    let response = server
        .post(&format!("/api/transactions/{}/sign", id))
        .json(&json!({ "signer": "0xa" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_unknown_transaction() {
    let server = test_server();

    let response = server.get("/api/transactions/0xmissing").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");

    let response = sign(&server, "0xmissing", "0xa").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = server.get("/api/transactions/0xmissing/status").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_route() {
    let server = test_server();
    let response = server.get("/api/nope").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "Endpoint not found");
}

#[tokio::test]
async fn test_list_and_stats() {
    let server = test_server();

    let body: Value = server.get("/api/transactions").await.json();
    assert_eq!(body["count"], 0);
    assert_eq!(body["transactions"], json!([]));

    let first = create(
        &server,
        json!({ "initiator": "0xa", "counterparty": "0xb", "amount": 1 }),
    )
    .await;
    let second = create(
        &server,
        json!({ "initiator": "0xc", "counterparty": "0xd", "amount": 2 }),
    )
    .await;

    let body: Value = server.get("/api/transactions").await.json();
    assert_eq!(body["count"], 2);
    assert_eq!(body["transactions"][0]["id"], first.as_str());
    assert_eq!(body["transactions"][1]["id"], second.as_str());

    let body: Value = server.get("/api/stats").await.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["total"], 2);
    assert_eq!(body["pending"], 2);
    assert_eq!(body["completed"], 0);
    assert_eq!(body["notarized"], 0);
}

#[tokio::test]
async fn test_create_sample() {
    let server = test_server();
    let response = server.post("/api/demo/create-sample").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["transaction"]["amount"], 1_000_000_000u64);
    assert_eq!(body["transaction"]["requiredSignatures"], 2);
    assert_eq!(body["transaction"]["id"], body["transactionId"]);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let server = test_server();
    create(
        &server,
        json!({ "initiator": "0xa", "counterparty": "0xb", "amount": 1 }),
    )
    .await;

    let response = server.get("/metrics").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let text = response.text();
    assert!(text.contains("zkbank_transactions_created 1"));
    assert!(text.contains("zkbank_transactions_held 1"));
}

#[tokio::test]
async fn test_metrics_disabled() {
    let config = ServerConfig {
        metrics_enabled: false,
        ..ServerConfig::default()
    };
    let server = build_server(config);
    server.start();
    let test = TestServer::new(server.router()).unwrap();

    let response = test.get("/metrics").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_wrong_method_is_endpoint_not_found() {
    let server = test_server();

    let cases = [
        server.get("/api/transactions/create").await,
        server.delete("/api/transactions").await,
        server.post("/api/transactions/0x1/status").await,
        server.get("/api/transactions/0x1/sign").await,
        server.post("/metrics").await,
    ];

    for response in cases {
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["error"], "Endpoint not found");
    }
}

#[tokio::test]
async fn test_internal_error_is_generic_500() {
    let ledger = Arc::new(TransactionLedger::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(FixedIdGenerator),
        LedgerConfig::default(),
    ));
    let server = Server::with_ledger(ServerConfig::default(), "test-node".to_string(), ledger);
    server.start();
    let test = TestServer::new(server.router()).unwrap();

    let request = json!({ "initiator": "0xa", "counterparty": "0xb", "amount": 10 });
    let first = test.post("/api/transactions/create").json(&request).await;
    assert_eq!(first.status_code(), StatusCode::CREATED);

    let second = test.post("/api/transactions/create").json(&request).await;
    assert_eq!(second.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = second.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "INTERNAL_ERROR");
    assert_eq!(body["error"], "Internal server error");

    let body: Value = test.get("/api/transactions").await.json();
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn test_oversized_body_is_payload_too_large() {
    let config = ServerConfig {
        max_body_bytes: 64,
        ..ServerConfig::default()
    };
    let server = build_server(config);
    server.start();
    let test = TestServer::new(server.router()).unwrap();

    let response = test
        .post("/api/transactions/create")
        .json(&json!({
            "initiator": "0xa",
            "counterparty": "0xb",
            "amount": 10,
            "txData": "0x".repeat(128)
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");

    let response = test
        .post("/api/transactions/create")
        .json(&json!({ "initiator": "0xa", "counterparty": "0xb", "amount": 10 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
}
