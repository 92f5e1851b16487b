//! Normalizes any handler failure into a [`ServerError`] response.
//!
//! Classification order:
//! 1. a `ServerError` is used as-is
//! 2. any other error maps its `status` (if any) to the first kind with that
//!    status, falling back to `internalServerError`; the error becomes `cause`
//! 3. a non-error value becomes `internalServerError` with the value as `info`

use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

use crate::error::fault::Fault;
use crate::error::server_error::ServerError;
use crate::error::taxonomy::ErrorKind;

pub struct ErrorTranslator;

impl ErrorTranslator {
    /// Map a fault onto the taxonomy. Never fails.
    pub fn classify(fault: Fault) -> ServerError {
        match fault {
            Fault::Error { error, status } => match error.downcast::<ServerError>() {
                Ok(server_error) => *server_error,
                Err(error) => status
                    .and_then(ErrorKind::for_status)
                    .unwrap_or(ErrorKind::InternalServerError)
                    .error()
                    .with_cause(error),
            },
            Fault::Value(value) => ErrorKind::InternalServerError.with_info(value),
        }
    }

    /// Classify `fault`, log one record for the request and build the
    /// error response.
    pub fn respond(path: &str, body: &Value, fault: Fault) -> Response {
        let error = Self::classify(fault);
        let status = error.status();

        tracing::info!(
            path = %path,
            body = %to_log_string(body),
            status,
            error = %to_log_string(&error),
            "Request failed"
        );

        error.into_response()
    }
}

/// JSON text for a log record; a value that cannot be serialized is logged
/// as a placeholder instead of failing the response.
pub(crate) fn to_log_string<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("<unserializable: {}>", e))
}
