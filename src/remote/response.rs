//! Response body decoding for the remote endpoints.

use serde_json::Value;

use super::OperationOutput;
use crate::error::RemoteError;
use crate::types::{OperationKind, RetrievedCase};

/// Chat reply used when the endpoint answers without any text
pub(crate) const CHAT_FALLBACK_REPLY: &str = "I'm sorry, I didn't understand that.";

/// Decode a 2xx body for `kind`
pub(super) fn parse_success(
    kind: OperationKind,
    status: u16,
    body: &str,
) -> Result<OperationOutput, RemoteError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| RemoteError::MalformedResponse(format!("invalid JSON: {}", e)))?;

    // Some deployments answer 200 with {"errorMessage": ...} instead of a 4xx
    if let Some(message) = value.get("errorMessage").and_then(Value::as_str) {
        return Err(RemoteError::Status {
            status,
            message: message.to_string(),
        });
    }

    match kind {
        OperationKind::Search => {
            let Some(raw) = value.get("retrieved_cases") else {
                return generic_result(&value, "retrieved_cases");
            };
            let cases: Vec<RetrievedCase> = serde_json::from_value(raw.clone()).map_err(|e| {
                RemoteError::MalformedResponse(format!("invalid retrieved_cases: {}", e))
            })?;
            Ok(OperationOutput {
                text: render_cases(&cases),
                cases,
            })
        }
        OperationKind::Summarize => string_field(&value, "summary"),
        OperationKind::Predict => match value.get("bail_decision") {
            Some(Value::String(decision)) => Ok(OperationOutput::text(decision.clone())),
            Some(Value::Null) | None => generic_result(&value, "bail_decision"),
            Some(other) => Ok(OperationOutput::text(other.to_string())),
        },
        OperationKind::Chat => {
            let reply = value
                .get("response")
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(CHAT_FALLBACK_REPLY);
            Ok(OperationOutput::text(reply))
        }
    }
}

fn string_field(value: &Value, field: &str) -> Result<OperationOutput, RemoteError> {
    match value.get(field).and_then(Value::as_str) {
        Some(text) => Ok(OperationOutput::text(text)),
        None => generic_result(value, field),
    }
}

/// `resultText` is accepted by every operation as a generic success field
fn generic_result(value: &Value, expected: &str) -> Result<OperationOutput, RemoteError> {
    value
        .get("resultText")
        .and_then(Value::as_str)
        .map(OperationOutput::text)
        .ok_or_else(|| RemoteError::MalformedResponse(format!("missing field '{}'", expected)))
}

/// Plain-text rendering of search results, one numbered block per case
pub(crate) fn render_cases(cases: &[RetrievedCase]) -> String {
    if cases.is_empty() {
        return "No matching cases found.".to_string();
    }
    cases
        .iter()
        .enumerate()
        .map(|(i, case)| {
            format!(
                "{}. {} (similarity {:.3})\n   {}",
                i + 1,
                case.case_id,
                case.similarity_score,
                case.text_preview
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pull a human-readable message out of an error body
///
/// Understands `{"error": "..."}`, `{"error": {"message": "..."}}`,
/// `{"errorMessage": "..."}` and FastAPI's `{"detail": ...}`. Returns an empty
/// string when nothing usable is found.
pub(super) fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return String::new();
    };

    let candidates = [
        value.get("error").and_then(Value::as_str),
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str),
        value.get("errorMessage").and_then(Value::as_str),
        value.get("detail").and_then(Value::as_str),
    ];
    if let Some(message) = candidates.into_iter().flatten().next() {
        return message.to_string();
    }

    // FastAPI validation errors: {"detail": [{"msg": "..."}]}
    value
        .get("detail")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("; ")
        })
        .unwrap_or_default()
}
