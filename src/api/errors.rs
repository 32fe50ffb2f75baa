use serde_json::Value;

use crate::api::client::ApiError;
use crate::error::{ControllerError, FieldErrors};

/// Build an [`ApiError::Status`] from a non-2xx response body.
///
/// Backends answer with `{"error": "..."}`, `{"message": "..."}` and
/// optionally `{"errors": {"field": "message"}}`; anything else falls back to
/// the status reason.
pub fn status_error(status: u16, reason: &str, body: &str) -> ApiError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    let message = parsed
        .as_ref()
        .and_then(|v| v.get("error").or_else(|| v.get("message")))
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            if reason.is_empty() {
                format!("Request failed with status {status}")
            } else {
                reason.to_string()
            }
        });

    let fields = parsed
        .as_ref()
        .and_then(|v| v.get("errors"))
        .and_then(Value::as_object)
        .map(|errors| {
            errors
                .iter()
                .map(|(field, message)| {
                    let message = match message {
                        Value::String(s) => s.clone(),
                        Value::Array(items) => items
                            .iter()
                            .filter_map(Value::as_str)
                            .collect::<Vec<_>>()
                            .join(", "),
                        other => other.to_string(),
                    };
                    (field.clone(), message)
                })
                .collect::<FieldErrors>()
        })
        .unwrap_or_default();

    ApiError::Status {
        status,
        message,
        fields,
    }
}

/// Unwrap a `{"data": ...}` envelope when the backend uses one.
pub fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map)
            if map.contains_key("data") && !map.contains_key("id") && !map.contains_key("_id") =>
        {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Map transport failures into the controller's taxonomy.
impl From<ApiError> for ControllerError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network(msg) => ControllerError::Network(msg),
            ApiError::Status {
                status,
                message,
                fields,
            } => {
                if (status == 400 || status == 422) && !fields.is_empty() {
                    ControllerError::Validation(fields)
                } else {
                    ControllerError::Server { status, message }
                }
            }
            ApiError::Decode(msg) => ControllerError::Decode(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_field_is_used() {
        let err = status_error(409, "Conflict", r#"{"error": "Duplicate title"}"#);
        assert_eq!(
            err,
            ApiError::Status {
                status: 409,
                message: "Duplicate title".into(),
                fields: FieldErrors::new(),
            }
        );
    }

    #[test]
    fn test_message_field_and_reason_fallback() {
        let err = status_error(500, "Internal Server Error", r#"{"message": "boom"}"#);
        assert!(matches!(err, ApiError::Status { ref message, .. } if message == "boom"));

        let err = status_error(502, "Bad Gateway", "<html>nginx</html>");
        assert!(matches!(err, ApiError::Status { ref message, .. } if message == "Bad Gateway"));

        let err = status_error(599, "", "");
        assert!(
            matches!(err, ApiError::Status { ref message, .. } if message == "Request failed with status 599")
        );
    }

    #[test]
    fn test_field_errors_become_validation() {
        let err = status_error(
            422,
            "Unprocessable Entity",
            r#"{"error": "Invalid", "errors": {"title": "title is taken", "date": ["bad", "past"]}}"#,
        );
        let controller_err: ControllerError = err.into();
        let fields = controller_err.field_errors().unwrap();
        assert_eq!(fields.get("title"), Some("title is taken"));
        assert_eq!(fields.get("date"), Some("bad, past"));
    }

    #[test]
    fn test_status_without_fields_is_server_error() {
        let err: ControllerError = status_error(400, "Bad Request", r#"{"error": "nope"}"#).into();
        assert_eq!(
            err,
            ControllerError::Server {
                status: 400,
                message: "nope".into()
            }
        );
    }

    #[test]
    fn test_unwrap_envelope() {
        assert_eq!(unwrap_envelope(json!({"data": [1, 2]})), json!([1, 2]));
        assert_eq!(
            unwrap_envelope(json!({"id": "a", "data": "payload"})),
            json!({"id": "a", "data": "payload"})
        );
        assert_eq!(unwrap_envelope(json!([{"id": "a"}])), json!([{"id": "a"}]));
    }
}
