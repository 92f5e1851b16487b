//! Any failure surfacing from a handler.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// A failure raised by a handler, an interceptor or the pipeline itself.
///
/// Every `std::error::Error` converts into a `Fault`, so handlers can use `?`
/// on any error type, including [`ServerError`](crate::error::ServerError).
pub enum Fault {
    /// An error value, optionally carrying the HTTP status it asks for.
    Error {
        error: Box<dyn StdError + Send + Sync>,
        status: Option<u16>,
    },
    /// A raised value that is not an error.
    Value(Value),
}

impl Fault {
    /// Error carrying a numeric `status` attribute.
    pub fn with_status<E>(error: E, status: u16) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Fault::Error {
            error: error.into(),
            status: Some(status),
        }
    }

    /// A plain message error (a generic runtime fault).
    pub fn msg(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Fault::Error {
            error: message.into(),
            status: None,
        }
    }

    /// A non-error value.
    pub fn value(value: impl Into<Value>) -> Self {
        Fault::Value(value.into())
    }

    /// Fault for a handler that panicked.
    pub(crate) fn panicked(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked".to_string()
        };
        Fault::from(Panicked(message))
    }
}

impl<E> From<E> for Fault
where
    E: StdError + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Fault::Error {
            error: Box::new(error),
            status: None,
        }
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Error { error, status } => f
                .debug_struct("Error")
                .field("error", error)
                .field("status", status)
                .finish(),
            Fault::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Error { error, .. } => write!(f, "{}", error),
            Fault::Value(value) => write!(f, "{}", value),
        }
    }
}

/// A handler panic, surfaced as a generic runtime fault.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct Panicked(pub String);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_question_mark_conversion() {
        fn parse(raw: &str) -> Result<i64, Fault> {
            Ok(raw.parse::<i64>()?)
        }
        assert!(matches!(parse("x"), Err(Fault::Error { status: None, .. })));
        assert_eq!(parse("12").unwrap(), 12);
    }

    #[test]
    fn test_panic_payloads() {
        let fault = Fault::panicked(Box::new("boom"));
        assert_eq!(fault.to_string(), "boom");

        let fault = Fault::panicked(Box::new(String::from("bang")));
        assert_eq!(fault.to_string(), "bang");

        let fault = Fault::panicked(Box::new(42u8));
        assert_eq!(fault.to_string(), "handler panicked");
    }

    #[test]
    fn test_value_fault() {
        let fault = Fault::value(json!({ "reason": "nope" }));
        assert!(matches!(fault, Fault::Value(_)));
    }
}
