//! HTTP client for the transaction endpoint
//!
//! Transport-level failures are reported through the `Network` transaction
//! error; outcomes decoded from the wire envelope pass through unchanged.

use crate::error::TransactionError;
use crate::types::{TransactionOutcome, TransactionRequest, TransactionResult};
use reqwest::Client;
use std::time::Duration;

/// Client for a running accounting service
#[derive(Debug, Clone)]
pub struct BankClient {
    base_url: String,
    http: Client,
}

impl BankClient {
    /// Create a client for the service at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Submit one transaction request and decode the outcome
    pub async fn submit(
        &self,
        request: &TransactionRequest,
    ) -> Result<TransactionResult, TransactionError> {
        let url = format!("{}/api/transaction", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|err| TransactionError::Network {
                code: 0,
                body: err.to_string(),
            })?;

        let code = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| TransactionError::Network {
                code,
                body: err.to_string(),
            })?;

        if !(200..300).contains(&code) {
            return Err(TransactionError::Network { code, body });
        }

        let outcome: TransactionOutcome =
            serde_json::from_str(&body).map_err(|err| TransactionError::Network {
                code,
                body: format!("undecodable response: {err}"),
            })?;
        outcome.into_result()
    }
}
