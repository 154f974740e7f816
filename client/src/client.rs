//! Async HTTP client for the zkBank API.

use std::sync::Arc;

use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use zkbank_common::{
    CreateTransaction, LedgerStats, NotarizeRequest, Result, SignRequest, StatusView,
    TransactionId, TransactionRecord, ZkBankError,
};
use zkbank_crypto::{PlaceholderGenerator, RandomGenerator};

use crate::config::ClientConfig;

/// Health report returned by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub network: String,
    pub version: String,
    #[serde(rename = "nodeId", default)]
    pub node_id: Option<String>,
    #[serde(default)]
    pub transactions: usize,
}

impl HealthStatus {
    /// Check if the server reported itself healthy.
    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }
}

#[derive(Deserialize)]
struct TransactionEnvelope {
    transaction: TransactionRecord,
}

#[derive(Deserialize)]
struct ListEnvelope {
    transactions: Vec<TransactionRecord>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: String,
    #[serde(default)]
    code: Option<String>,
}

/// Client for the transaction workflow API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    generator: Arc<dyn PlaceholderGenerator>,
}

impl ApiClient {
    /// Create a client from configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate().map_err(ZkBankError::Configuration)?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ZkBankError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = Url::parse(config.api_url.trim_end_matches('/'))
            .map_err(|e| ZkBankError::Configuration(format!("Invalid API URL: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            generator: Arc::new(RandomGenerator::new()),
        })
    }

    /// Replace the generator used for placeholder signatures.
    pub fn with_generator(mut self, generator: Arc<dyn PlaceholderGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Fetch the health report. A server that is not running still answers
    /// with a report, so 503 is not treated as an error here.
    pub async fn health(&self) -> Result<HealthStatus> {
        let response = self
            .http
            .get(self.url(&["health"])?)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if status.is_success() || status == StatusCode::SERVICE_UNAVAILABLE {
            return response.json().await.map_err(network_error);
        }
        Err(decode_error(status, response, None).await)
    }

    /// Create a transaction.
    #[instrument(skip(self, request))]
    pub async fn create(&self, request: &CreateTransaction) -> Result<TransactionRecord> {
        let envelope: TransactionEnvelope = self
            .send(Method::POST, &["transactions", "create"], Some(request), None)
            .await?;
        debug!(transaction_id = %envelope.transaction.id, "Transaction created");
        Ok(envelope.transaction)
    }

    /// Ask the server for its demo transaction.
    pub async fn create_sample(&self) -> Result<TransactionRecord> {
        let envelope: TransactionEnvelope = self
            .send::<(), _>(Method::POST, &["demo", "create-sample"], None, None)
            .await?;
        Ok(envelope.transaction)
    }

    /// Submit a signer approval.
    #[instrument(skip(self, request), fields(transaction_id = %id))]
    pub async fn sign(&self, id: &TransactionId, request: &SignRequest) -> Result<TransactionRecord> {
        let path = ["transactions", id.as_str(), "sign"];
        let envelope: TransactionEnvelope =
            self.send(Method::POST, &path, Some(request), Some(id)).await?;
        Ok(envelope.transaction)
    }

    /// Submit a notary signature.
    #[instrument(skip(self, request), fields(transaction_id = %id))]
    pub async fn notarize(
        &self,
        id: &TransactionId,
        request: &NotarizeRequest,
    ) -> Result<TransactionRecord> {
        let path = ["transactions", id.as_str(), "notarize"];
        let envelope: TransactionEnvelope =
            self.send(Method::POST, &path, Some(request), Some(id)).await?;
        Ok(envelope.transaction)
    }

    /// Complete a transaction.
    #[instrument(skip(self), fields(transaction_id = %id))]
    pub async fn complete(&self, id: &TransactionId) -> Result<TransactionRecord> {
        let path = ["transactions", id.as_str(), "complete"];
        let envelope: TransactionEnvelope =
            self.send::<(), _>(Method::POST, &path, None, Some(id)).await?;
        Ok(envelope.transaction)
    }

    /// Sign with placeholder key material from the client's generator.
    pub async fn sign_with_placeholder(
        &self,
        id: &TransactionId,
        signer: impl Into<String>,
    ) -> Result<TransactionRecord> {
        let request = SignRequest {
            signer: signer.into(),
            signature: self.generator.signature(),
            public_key: self.generator.public_key(),
        };
        self.sign(id, &request).await
    }

    /// Notarize with placeholder key material from the client's generator.
    pub async fn notarize_with_placeholder(
        &self,
        id: &TransactionId,
        notary: impl Into<String>,
    ) -> Result<TransactionRecord> {
        let request = NotarizeRequest {
            notary: notary.into(),
            signature: self.generator.signature(),
            public_key: self.generator.public_key(),
        };
        self.notarize(id, &request).await
    }

    /// Fetch one transaction.
    pub async fn get(&self, id: &TransactionId) -> Result<TransactionRecord> {
        let path = ["transactions", id.as_str()];
        let envelope: TransactionEnvelope =
            self.send::<(), _>(Method::GET, &path, None, Some(id)).await?;
        Ok(envelope.transaction)
    }

    /// Fetch every transaction, in creation order.
    pub async fn list(&self) -> Result<Vec<TransactionRecord>> {
        let envelope: ListEnvelope = self
            .send::<(), _>(Method::GET, &["transactions"], None, None)
            .await?;
        Ok(envelope.transactions)
    }

    /// Fetch the status projection of one transaction.
    pub async fn status(&self, id: &TransactionId) -> Result<StatusView> {
        let path = ["transactions", id.as_str(), "status"];
        self.send::<(), _>(Method::GET, &path, None, Some(id)).await
    }

    /// Fetch ledger counters.
    pub async fn stats(&self) -> Result<LedgerStats> {
        self.send::<(), _>(Method::GET, &["stats"], None, None).await
    }

    // --- Private methods ---

    /// Append path segments to the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ZkBankError::Configuration(format!("API URL cannot take a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments.iter().copied());
        Ok(url)
    }

    async fn send<B, T>(
        &self,
        method: Method,
        path: &[&str],
        body: Option<&B>,
        id: Option<&TransactionId>,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        let mut request = self.http.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(network_error)?;
        let status = response.status();
        debug!(method = %method, path = %url.path(), status = status.as_u16(), "API response");

        if !status.is_success() {
            return Err(decode_error(status, response, id).await);
        }

        response.json().await.map_err(network_error)
    }
}

fn network_error(err: reqwest::Error) -> ZkBankError {
    ZkBankError::Network(err.to_string())
}

/// Turn a failure response into a typed error using its `code` field.
async fn decode_error(
    status: StatusCode,
    response: reqwest::Response,
    id: Option<&TransactionId>,
) -> ZkBankError {
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => return network_error(e),
    };

    match serde_json::from_str::<ErrorEnvelope>(&text) {
        Ok(ErrorEnvelope {
            error,
            code: Some(code),
        }) => ZkBankError::from_code(&code, error, id),
        Ok(ErrorEnvelope { error, code: None }) => {
            ZkBankError::Network(format!("HTTP {}: {}", status.as_u16(), error))
        }
        Err(_) => {
            warn!(status = status.as_u16(), "Unrecognised error body");
            ZkBankError::Network(format!("HTTP {}: {}", status.as_u16(), text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = ApiClient::new(ClientConfig::with_url("http://localhost:3001/api/")).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3001/api");
        assert_eq!(
            client.url(&["stats"]).unwrap().as_str(),
            "http://localhost:3001/api/stats"
        );
    }

    #[test]
    fn test_path_segments_are_encoded() {
        let client = ApiClient::new(ClientConfig::default()).unwrap();
        let url = client.url(&["transactions", "0xa/b?c#d", "sign"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3001/api/transactions/0xa%2Fb%3Fc%23d/sign"
        );
    }

    #[test]
    fn test_base_without_path() {
        let client = ApiClient::new(ClientConfig::with_url("http://localhost:3001")).unwrap();
        assert_eq!(
            client.url(&["health"]).unwrap().as_str(),
            "http://localhost:3001/health"
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = ApiClient::new(ClientConfig::with_url("localhost"));
        assert!(matches!(result, Err(ZkBankError::Configuration(_))));
    }
}
