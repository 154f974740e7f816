//! HTTP API: routes, request/response bodies and error mapping.

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, Request, State},
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tracing::{error, info, warn};

use zkbank_common::{
    CreateTransaction, LedgerStats, NotarizeRequest, SignRequest, StatusView, TransactionId,
    TransactionRecord, ZkBankError,
};
use zkbank_ledger::TransactionLedger;

use crate::config::ServerConfig;
use crate::metrics::SharedMetrics;
use crate::state::ServerState;

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<TransactionLedger>,
    pub metrics: SharedMetrics,
    pub state: Arc<RwLock<ServerState>>,
    pub network: String,
    pub node_id: String,
}

impl AppState {
    fn ensure_accepting(&self) -> Result<(), ApiError> {
        if self.state.read().accepts_requests() {
            Ok(())
        } else {
            Err(ApiError::Unavailable)
        }
    }
}

// ============================================================================
// Response bodies
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub network: String,
    pub version: String,
    #[serde(rename = "nodeId")]
    pub node_id: String,
    pub transactions: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResponse {
    pub success: bool,
    pub transaction_id: TransactionId,
    pub transaction: TransactionRecord,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub success: bool,
    pub transaction: TransactionRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub success: bool,
    pub transactions: Vec<TransactionRecord>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(flatten)]
    pub view: StatusView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub success: bool,
    #[serde(flatten)]
    pub stats: LedgerStats,
}

/// Failure body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

// ============================================================================
// Errors
// ============================================================================

/// API error type.
#[derive(Debug)]
pub enum ApiError {
    /// Ledger rejected the operation.
    Ledger(ZkBankError),
    /// Request body exceeds the configured limit.
    PayloadTooLarge(String),
    /// Server is not accepting mutations.
    Unavailable,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Ledger(ZkBankError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Ledger(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, code) = match &self {
            ApiError::Ledger(err) if status.is_server_error() => {
                error!(error = %err, code = err.error_code(), "Request failed");
                (INTERNAL_ERROR_MESSAGE.to_string(), err.error_code())
            }
            ApiError::Ledger(err) => (err.to_string(), err.error_code()),
            ApiError::PayloadTooLarge(message) => (message.clone(), "PAYLOAD_TOO_LARGE"),
            ApiError::Unavailable => (
                "Server is not accepting requests".to_string(),
                "SERVICE_UNAVAILABLE",
            ),
        };

        let body = ErrorResponse {
            success: false,
            error,
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ZkBankError> for ApiError {
    fn from(err: ZkBankError) -> Self {
        ApiError::Ledger(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge(rejection.body_text());
        }
        ApiError::Ledger(ZkBankError::Validation {
            message: rejection.body_text(),
            field: None,
        })
    }
}

// ============================================================================
// Router
// ============================================================================

/// Build the application router.
pub fn build_router(app: AppState, config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let api = Router::new()
        .route("/health", get(health_check))
        .route("/transactions", get(list_transactions))
        .route("/transactions/create", post(create_transaction))
        .route("/transactions/:id", get(get_transaction))
        .route("/transactions/:id/sign", post(sign_transaction))
        .route("/transactions/:id/notarize", post(notarize_transaction))
        .route("/transactions/:id/complete", post(complete_transaction))
        .route("/transactions/:id/status", get(transaction_status))
        .route("/stats", get(ledger_stats))
        .route("/demo/create-sample", post(create_sample))
        .method_not_allowed_fallback(not_found);

    let mut router = Router::new().nest("/api", api);
    if config.metrics_enabled {
        router = router.route("/metrics", get(prometheus_metrics));
    }

    router
        .method_not_allowed_fallback(not_found)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(app.clone(), logging_middleware))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .with_state(app)
}

async fn logging_middleware(State(app): State<AppState>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status();
    app.metrics.request_served(status.as_u16());

    if status.is_server_error() {
        warn!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            "Request failed"
        );
    } else {
        info!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            "Request handled"
        );
    }

    response
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(panic = %detail, "Handler panicked");

    let body = ErrorResponse {
        success: false,
        error: INTERNAL_ERROR_MESSAGE.to_string(),
        code: ZkBankError::Internal(String::new()).error_code().to_string(),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Endpoint not found" })),
    )
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_check(State(app): State<AppState>) -> impl IntoResponse {
    let state = *app.state.read();
    let body = HealthResponse {
        status: if state.is_operational() {
            "OK".to_string()
        } else {
            state.as_str().to_string()
        },
        timestamp: chrono::Utc::now().to_rfc3339(),
        network: app.network.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        node_id: app.node_id.clone(),
        transactions: app.ledger.count(),
    };

    let status = if state.is_operational() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

async fn create_transaction(
    State(app): State<AppState>,
    payload: Result<Json<CreateTransaction>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    app.ensure_accepting()?;
    let Json(request) = payload?;

    let record = app.ledger.create(request)?;
    app.metrics.transaction_created();

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            success: true,
            transaction_id: record.id.clone(),
            transaction: record,
            message: "Transaction created successfully".to_string(),
        }),
    ))
}

async fn sign_transaction(
    State(app): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<SignRequest>, JsonRejection>,
) -> Result<Json<TransactionResponse>, ApiError> {
    app.ensure_accepting()?;
    let Json(request) = payload?;

    let record = app.ledger.add_signature(&TransactionId::new(id), request)?;
    app.metrics.signature_added();

    Ok(Json(TransactionResponse {
        success: true,
        transaction: record,
        message: Some("Signature added successfully".to_string()),
    }))
}

async fn notarize_transaction(
    State(app): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<NotarizeRequest>, JsonRejection>,
) -> Result<Json<TransactionResponse>, ApiError> {
    app.ensure_accepting()?;
    let Json(request) = payload?;

    let record = app
        .ledger
        .add_notary_signature(&TransactionId::new(id), request)?;
    app.metrics.notary_signature_added();

    Ok(Json(TransactionResponse {
        success: true,
        transaction: record,
        message: Some("Notary signature added successfully".to_string()),
    }))
}

async fn complete_transaction(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TransactionResponse>, ApiError> {
    app.ensure_accepting()?;

    let record = app.ledger.complete(&TransactionId::new(id))?;
    app.metrics.transaction_completed();

    Ok(Json(TransactionResponse {
        success: true,
        transaction: record,
        message: Some("Transaction completed successfully".to_string()),
    }))
}

async fn get_transaction(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TransactionResponse>, ApiError> {
    let record = app.ledger.get(&TransactionId::new(id))?;
    Ok(Json(TransactionResponse {
        success: true,
        transaction: record,
        message: None,
    }))
}

async fn list_transactions(State(app): State<AppState>) -> Json<ListResponse> {
    let transactions = app.ledger.list();
    Json(ListResponse {
        success: true,
        count: transactions.len(),
        transactions,
    })
}

async fn transaction_status(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let view = app.ledger.status(&TransactionId::new(id))?;
    Ok(Json(StatusResponse {
        success: true,
        view,
    }))
}

async fn ledger_stats(State(app): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        success: true,
        stats: app.ledger.stats(),
    })
}

async fn create_sample(State(app): State<AppState>) -> Result<Json<CreatedResponse>, ApiError> {
    app.ensure_accepting()?;

    let record = app.ledger.create_sample()?;
    app.metrics.transaction_created();

    Ok(Json(CreatedResponse {
        success: true,
        transaction_id: record.id.clone(),
        transaction: record,
        message: "Sample transaction created for demo".to_string(),
    }))
}

async fn prometheus_metrics(State(app): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        app.metrics.to_prometheus(app.ledger.count()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_maps_to_internal_error() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = handle_panic(Box::new(42u8));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_status_mapping() {
        let id = TransactionId::new("0x1");
        assert_eq!(
            ApiError::from(ZkBankError::NotFound(id.clone())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(ZkBankError::MissingNotary(id)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ZkBankError::Internal("x".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::PayloadTooLarge("too big".to_string()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}
