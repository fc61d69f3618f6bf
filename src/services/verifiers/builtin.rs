//! Built-in shape verifiers keyed by generic kind.
//!
//! Expected-value keys are camelCase to match tool payloads:
//! `minResults`, `exitCode`, `contains`, `statusCode`, `minRows`, `maxRows`, `exists`.

use serde_json::{json, Value};

use super::{Verifier, VerifierReport};

fn expected_u64(expected: Option<&Value>, key: &str) -> Option<u64> {
    expected.and_then(|e| e.get(key)).and_then(Value::as_u64)
}

fn expected_i64(expected: Option<&Value>, key: &str) -> Option<i64> {
    expected.and_then(|e| e.get(key)).and_then(Value::as_i64)
}

fn expected_str<'a>(expected: Option<&'a Value>, key: &str) -> Option<&'a str> {
    expected.and_then(|e| e.get(key)).and_then(Value::as_str)
}

fn expected_bool(expected: Option<&Value>, key: &str) -> Option<bool> {
    expected.and_then(|e| e.get(key)).and_then(Value::as_bool)
}

/// Search results: requires a `results` array, optional `minResults`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchVerifier;

impl Verifier for SearchVerifier {
    fn name(&self) -> &str {
        "search"
    }

    fn verify(&self, result: &Value, expected: Option<&Value>) -> anyhow::Result<VerifierReport> {
        let Some(results) = result.get("results").and_then(Value::as_array) else {
            return Ok(VerifierReport::fail("search result is missing a 'results' array"));
        };

        let count = results.len() as u64;
        let mut errors = Vec::new();
        if let Some(min) = expected_u64(expected, "minResults") {
            if count < min {
                errors.push(format!("expected at least {min} search results, got {count}"));
            }
        }

        Ok(VerifierReport::from_errors(errors).with_details(json!({ "count": count })))
    }
}

/// Shell commands: requires an integer `exitCode`. Expects 0 unless `exitCode`
/// is given; `contains` checks `stdout` (or `output`) for a substring.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellVerifier;

impl Verifier for ShellVerifier {
    fn name(&self) -> &str {
        "shell"
    }

    fn verify(&self, result: &Value, expected: Option<&Value>) -> anyhow::Result<VerifierReport> {
        let Some(exit_code) = result.get("exitCode").and_then(Value::as_i64) else {
            return Ok(VerifierReport::fail("shell result is missing an integer 'exitCode'"));
        };

        let mut errors = Vec::new();
        let want = expected_i64(expected, "exitCode").unwrap_or(0);
        if exit_code != want {
            errors.push(format!("expected exit code {want}, got {exit_code}"));
        }

        if let Some(needle) = expected_str(expected, "contains") {
            let output = result
                .get("stdout")
                .or_else(|| result.get("output"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            if !output.contains(needle) {
                errors.push(format!("expected output to contain '{needle}'"));
            }
        }

        Ok(VerifierReport::from_errors(errors).with_details(json!({ "exitCode": exit_code })))
    }
}

/// HTTP responses: requires `statusCode`; 2xx passes unless an exact
/// `statusCode` is expected.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpVerifier;

impl Verifier for HttpVerifier {
    fn name(&self) -> &str {
        "http"
    }

    fn verify(&self, result: &Value, expected: Option<&Value>) -> anyhow::Result<VerifierReport> {
        let Some(status) = result.get("statusCode").and_then(Value::as_u64) else {
            return Ok(VerifierReport::fail("http result is missing a numeric 'statusCode'"));
        };

        let errors = match expected_u64(expected, "statusCode") {
            Some(want) if want != status => {
                vec![format!("expected status {want}, got {status}")]
            }
            Some(_) => Vec::new(),
            None if (200..300).contains(&status) => Vec::new(),
            None => vec![format!("status {status} is not a 2xx success")],
        };

        Ok(VerifierReport::from_errors(errors).with_details(json!({ "statusCode": status })))
    }
}

/// Database queries: requires a `rows` array, optional `minRows`/`maxRows`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseVerifier;

impl Verifier for DatabaseVerifier {
    fn name(&self) -> &str {
        "database"
    }

    fn verify(&self, result: &Value, expected: Option<&Value>) -> anyhow::Result<VerifierReport> {
        let Some(rows) = result.get("rows").and_then(Value::as_array) else {
            return Ok(VerifierReport::fail("database result is missing a 'rows' array"));
        };

        let count = rows.len() as u64;
        let mut errors = Vec::new();
        if let Some(min) = expected_u64(expected, "minRows") {
            if count < min {
                errors.push(format!("expected at least {min} rows, got {count}"));
            }
        }
        if let Some(max) = expected_u64(expected, "maxRows") {
            if count > max {
                errors.push(format!("expected at most {max} rows, got {count}"));
            }
        }

        Ok(VerifierReport::from_errors(errors).with_details(json!({ "rowCount": count })))
    }
}

/// Filesystem operations: requires a boolean `success` or `exists`.
///
/// `success: false` fails. `exists` is only checked against an expected value.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilesystemVerifier;

impl Verifier for FilesystemVerifier {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn verify(&self, result: &Value, expected: Option<&Value>) -> anyhow::Result<VerifierReport> {
        let success = result.get("success").and_then(Value::as_bool);
        let exists = result.get("exists").and_then(Value::as_bool);

        if success.is_none() && exists.is_none() {
            return Ok(VerifierReport::fail(
                "filesystem result needs a boolean 'success' or 'exists'",
            ));
        }

        let mut errors = Vec::new();
        if success == Some(false) {
            errors.push("filesystem operation reported failure".to_string());
        }
        if let Some(want) = expected_bool(expected, "exists") {
            match exists {
                Some(got) if got == want => {}
                Some(got) => errors.push(format!("expected exists={want}, got {got}")),
                None => errors.push("expected an 'exists' field".to_string()),
            }
        }

        Ok(VerifierReport::from_errors(errors))
    }
}
