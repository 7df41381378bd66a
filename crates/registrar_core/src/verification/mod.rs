//! Human-verification gateway contract.
//!
//! # Responsibility
//! - Define the seam between the registration path and the external
//!   challenge verifier.
//! - Classify gateway answers into caller-facing failures.
//!
//! # Invariants
//! - Verification completes (or fails) before any store mutation.
//! - A blank token never reaches the network.
//! - Tokens are never logged.

use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod http;

pub use http::HttpVerificationGateway;

/// Answer from the verifier for one token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub success: bool,
    /// Token was already redeemed or is past its validity window.
    pub expired_or_replayed: bool,
    pub error_codes: Vec<String>,
}

/// Gateway-level failure: the verifier could not give an answer.
#[derive(Debug)]
pub enum GatewayError {
    Timeout,
    Transport(String),
    InvalidResponse(String),
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "verification request timed out"),
            Self::Transport(message) => write!(f, "verification transport failure: {message}"),
            Self::InvalidResponse(message) => {
                write!(f, "invalid verification response: {message}")
            }
        }
    }
}

impl Error for GatewayError {}

/// External challenge verifier.
pub trait VerificationGateway {
    fn verify(&self, token: &str) -> Result<VerificationOutcome, GatewayError>;
}

impl<G: VerificationGateway + ?Sized> VerificationGateway for &G {
    fn verify(&self, token: &str) -> Result<VerificationOutcome, GatewayError> {
        (**self).verify(token)
    }
}

/// Why a registration did not pass human verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationFailure {
    MissingToken,
    Rejected,
    ExpiredOrReplayed,
    Timeout,
    Unavailable,
}

impl VerificationFailure {
    pub fn code(self) -> &'static str {
        match self {
            Self::MissingToken => "verification_missing",
            Self::Rejected => "verification_rejected",
            Self::ExpiredOrReplayed => "verification_expired",
            Self::Timeout => "verification_timeout",
            Self::Unavailable => "verification_unavailable",
        }
    }
}

impl Display for VerificationFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Self::MissingToken => "verification token is missing",
            Self::Rejected => "verification failed",
            Self::ExpiredOrReplayed => "verification token expired or was already used",
            Self::Timeout => "verification timed out",
            Self::Unavailable => "verification service unavailable",
        };
        f.write_str(message)
    }
}

impl Error for VerificationFailure {}

/// Verifies `token` and maps every non-success to a `VerificationFailure`.
pub fn require_verified<G: VerificationGateway + ?Sized>(
    gateway: &G,
    token: &str,
) -> Result<(), VerificationFailure> {
    let token = token.trim();
    if token.is_empty() {
        return Err(VerificationFailure::MissingToken);
    }

    let failure = match gateway.verify(token) {
        Ok(outcome) if outcome.success => return Ok(()),
        Ok(outcome) if outcome.expired_or_replayed => VerificationFailure::ExpiredOrReplayed,
        Ok(_) => VerificationFailure::Rejected,
        Err(GatewayError::Timeout) => VerificationFailure::Timeout,
        Err(err) => {
            warn!("event=verification module=verification status=error error={err}");
            VerificationFailure::Unavailable
        }
    };
    warn!(
        "event=verification module=verification status=rejected reason={}",
        failure.code()
    );
    Err(failure)
}
