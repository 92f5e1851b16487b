//! The normalized fault representation sent to callers.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::taxonomy::ErrorKind;

/// A taxonomy-coded error.
///
/// `code` starts with the name of an [`ErrorKind`]; the HTTP status is
/// derived from it by prefix resolution. `info` is caller-visible. `cause`
/// keeps the original fault; only its message is ever serialized.
#[derive(Debug, Clone)]
pub struct ServerError {
    code: String,
    info: Option<Value>,
    cause: Option<Arc<dyn StdError + Send + Sync>>,
}

impl ServerError {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            info: None,
            cause: None,
        }
    }

    pub fn with_info(mut self, info: impl Into<Value>) -> Self {
        self.info = Some(info.into());
        self
    }

    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        self.cause = Some(Arc::from(cause.into()));
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn info(&self) -> Option<&Value> {
        self.info.as_ref()
    }

    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Kind resolved from the code prefix.
    pub fn kind(&self) -> Option<ErrorKind> {
        ErrorKind::resolve(&self.code)
    }

    /// True when the code falls under `kind`.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == Some(kind)
    }

    pub fn status(&self) -> u16 {
        ErrorKind::status_of(&self.code)
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code, self.status())?;
        if let Some(cause) = &self.cause {
            write!(f, ": {}", cause)?;
        }
        Ok(())
    }
}

impl StdError for ServerError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

impl Serialize for ServerError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 2 + usize::from(self.info.is_some()) + usize::from(self.cause.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("code", &self.code)?;
        map.serialize_entry("status", &self.status())?;
        if let Some(info) = &self.info {
            map.serialize_entry("info", info)?;
        }
        if let Some(cause) = &self.cause {
            map.serialize_entry("cause", &CauseBody { message: cause.to_string() })?;
        }
        map.end()
    }
}

#[derive(Serialize)]
struct CauseBody {
    message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_constructors() {
        let err = ErrorKind::NotFound.with_info(json!({ "personId": "111" }));
        assert_eq!(err.code(), "notFound");
        assert_eq!(err.status(), 404);
        assert!(err.is(ErrorKind::NotFound));
        assert!(!err.is(ErrorKind::BadRequest));
    }

    #[test]
    fn test_serialized_body_hides_native_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "Some error");
        let err = ErrorKind::InternalServerError.error().with_cause(io);

        let body = serde_json::to_value(&err).unwrap();
        assert_eq!(
            body,
            json!({
                "code": "internalServerError",
                "status": 500,
                "cause": { "message": "Some error" }
            })
        );
    }

    #[test]
    fn test_custom_code_resolves_by_prefix() {
        let err = ServerError::new("conflict.duplicateName");
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.kind(), Some(ErrorKind::Conflict));

        let unknown = ServerError::new("oops");
        assert_eq!(unknown.status(), 500);
        assert_eq!(unknown.kind(), None);
    }

    #[test]
    fn test_source_chain() {
        let err = ErrorKind::BadGateway
            .error()
            .with_cause(std::io::Error::new(std::io::ErrorKind::Other, "upstream"));
        assert_eq!(err.source().map(|s| s.to_string()), Some("upstream".into()));
        assert_eq!(err.to_string(), "badGateway (502): upstream");
    }
}
