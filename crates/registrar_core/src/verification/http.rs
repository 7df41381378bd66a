//! Siteverify-compatible HTTP gateway (Turnstile response format).

use super::{GatewayError, VerificationGateway, VerificationOutcome};
use crate::config::{ConfigError, VerificationConfig};
use serde::Deserialize;
use std::time::Duration;

const EXPIRED_OR_REPLAYED_CODE: &str = "timeout-or-duplicate";

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Blocking HTTP verifier posting `secret` + `response` form fields.
pub struct HttpVerificationGateway {
    client: reqwest::blocking::Client,
    endpoint: String,
    secret: String,
}

impl HttpVerificationGateway {
    /// Builds a gateway whose every request is bounded by `timeout`.
    pub fn new(
        endpoint: impl Into<String>,
        secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            secret: secret.into(),
        })
    }

    /// Builds the gateway from `[verification]`, reading the secret from
    /// the configured environment variable.
    pub fn from_config(config: &VerificationConfig) -> Result<Self, ConfigError> {
        let secret = config.secret()?;
        Self::new(config.endpoint.trim(), secret, config.timeout())
            .map_err(|err| ConfigError::Invalid(format!("verification client: {err}")))
    }
}

impl VerificationGateway for HttpVerificationGateway {
    fn verify(&self, token: &str) -> Result<VerificationOutcome, GatewayError> {
        if token.trim().is_empty() {
            return Ok(VerificationOutcome::default());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("secret", self.secret.as_str()), ("response", token)])
            .send()
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Transport(format!("unexpected status {status}")));
        }
        let body = response.text().map_err(classify_transport_error)?;
        interpret_response(&body)
    }
}

/// Parses a siteverify JSON body.
pub fn interpret_response(body: &str) -> Result<VerificationOutcome, GatewayError> {
    let parsed: SiteVerifyResponse = serde_json::from_str(body)
        .map_err(|err| GatewayError::InvalidResponse(err.to_string()))?;
    let expired_or_replayed = parsed
        .error_codes
        .iter()
        .any(|code| code == EXPIRED_OR_REPLAYED_CODE);
    Ok(VerificationOutcome {
        success: parsed.success,
        expired_or_replayed: !parsed.success && expired_or_replayed,
        error_codes: parsed.error_codes,
    })
}

fn classify_transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(err.to_string())
    }
}
