//! Pluggable checks that a tool result satisfies an expected contract.
//!
//! Verifiers are synchronous and never panic on malformed input: a shape
//! problem is a failed [`VerifierReport`]. An `Err` is reserved for internal
//! faults and is downgraded to a failed outcome by [`run_verifier`].

mod builtin;
mod registry;

pub use builtin::{
    DatabaseVerifier, FilesystemVerifier, HttpVerifier, SearchVerifier, ShellVerifier,
};
pub use registry::{status_mirror, VerifierRegistry, STATUS_MIRROR};

use serde_json::Value;
use tracing::warn;

use crate::domain::models::{VerificationOutcome, VerificationStatus};

/// Result of a single verification pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerifierReport {
    /// Whether the result satisfied the contract.
    pub passed: bool,
    /// Why it did not; empty on pass.
    pub errors: Vec<String>,
    /// Verifier-specific details.
    pub details: Option<Value>,
}

impl VerifierReport {
    /// A passing report.
    pub fn pass() -> Self {
        Self {
            passed: true,
            ..Self::default()
        }
    }

    /// A failing report with one error.
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            passed: false,
            errors: vec![error.into()],
            details: None,
        }
    }

    /// Pass iff `errors` is empty.
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            passed: errors.is_empty(),
            errors,
            details: None,
        }
    }

    /// Attach details.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// A contract check over a tool's result payload.
pub trait Verifier: Send + Sync {
    /// Generic kind this verifier implements, e.g. `search`.
    fn name(&self) -> &str;

    /// Check `result`, optionally against caller `expected` values.
    fn verify(&self, result: &Value, expected: Option<&Value>) -> anyhow::Result<VerifierReport>;
}

/// Run a verifier, converting its report or internal error into an outcome.
pub fn run_verifier(
    verifier: &dyn Verifier,
    result: &Value,
    expected: Option<&Value>,
) -> VerificationOutcome {
    match verifier.verify(result, expected) {
        Ok(report) if report.passed => {
            VerificationOutcome::verified(verifier.name()).with_details(report.details)
        }
        Ok(report) => {
            let errors = if report.errors.is_empty() {
                vec![format!("{} verification failed", verifier.name())]
            } else {
                report.errors
            };
            VerificationOutcome::failed(verifier.name(), errors).with_details(report.details)
        }
        Err(e) => {
            warn!(verifier = verifier.name(), error = %e, "verifier raised an error");
            VerificationOutcome {
                status: VerificationStatus::Failed,
                verifier: verifier.name().to_string(),
                errors: vec![format!("verifier error: {e}")],
                details: None,
            }
        }
    }
}
