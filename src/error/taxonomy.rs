//! Canonical error taxonomy.
//!
//! One kind per standard 4xx/5xx status. The declaration order of
//! [`ErrorKind::ALL`] is significant: status resolution takes the first kind
//! whose name is a prefix of an error code.

use std::fmt;

use axum::http::StatusCode;
use serde_json::Value;

use crate::error::server_error::ServerError;

macro_rules! error_kinds {
    ($($variant:ident => ($name:literal, $status:literal)),+ $(,)?) => {
        /// A named error kind bound to an HTTP status.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ErrorKind {
            $($variant),+
        }

        impl ErrorKind {
            /// Every kind, in declared table order.
            pub const ALL: &'static [ErrorKind] = &[$(ErrorKind::$variant),+];

            /// Stable code prefix for this kind (e.g. `notFound`).
            pub const fn name(self) -> &'static str {
                match self {
                    $(ErrorKind::$variant => $name),+
                }
            }

            /// Numeric HTTP status for this kind.
            pub const fn status(self) -> u16 {
                match self {
                    $(ErrorKind::$variant => $status),+
                }
            }
        }
    };
}

error_kinds! {
    BadRequest => ("badRequest", 400),
    Unauthorized => ("unauthorized", 401),
    Forbidden => ("forbidden", 403),
    NotFound => ("notFound", 404),
    MethodNotAllowed => ("methodNotAllowed", 405),
    NotAcceptable => ("notAcceptable", 406),
    ProxyAuthenticationRequired => ("proxyAuthenticationRequired", 407),
    RequestTimeout => ("requestTimeout", 408),
    Conflict => ("conflict", 409),
    Gone => ("gone", 410),
    LengthRequired => ("lengthRequired", 411),
    PreconditionFailed => ("preconditionFailed", 412),
    PayloadTooLarge => ("payloadTooLarge", 413),
    UriTooLong => ("URITooLong", 414),
    UnsupportedMediaType => ("unsupportedMediaType", 415),
    RequestedRangeNotSatisfiable => ("requestedRangeNotSatisfiable", 416),
    ExpectationFailed => ("expectationFailed", 417),
    MisdirectedRequest => ("misdirectedRequest", 421),
    UnprocessableEntity => ("unprocessableEntity", 422),
    Locked => ("locked", 423),
    FailedDependency => ("failedDependency", 424),
    UpgradeRequired => ("upgradeRequired", 426),
    PreconditionRequired => ("preconditionRequired", 428),
    TooManyRequests => ("tooManyRequests", 429),
    RequestFieldsTooLarge => ("requestFieldsTooLarge", 431),
    UnavailableForLegalReasons => ("unavailableForLegalReasons", 451),
    InternalServerError => ("internalServerError", 500),
    NotImplemented => ("notImplemented", 501),
    BadGateway => ("badGateway", 502),
    ServiceUnavailable => ("serviceUnavailable", 503),
    GatewayTimeout => ("gatewayTimeout", 504),
    HttpVersionNotSupported => ("HTTPVersionNotSupported", 505),
    VariantAlsoNegotiates => ("variantAlsoNegotiates", 506),
    InsufficientStorage => ("insufficientStorage", 507),
    LoopDetected => ("loopDetected", 508),
    NotExtended => ("notExtended", 510),
    NetworkAuthenticationRequired => ("networkAuthenticationRequired", 511),
}

impl ErrorKind {
    /// First kind registered for `status`, if any.
    pub fn for_status(status: u16) -> Option<ErrorKind> {
        Self::ALL.iter().copied().find(|kind| kind.status() == status)
    }

    /// First kind, in table order, whose name prefixes `code`.
    pub fn resolve(code: &str) -> Option<ErrorKind> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| code.starts_with(kind.name()))
    }

    /// Resolve the response status for an error code, defaulting to 500.
    pub fn status_of(code: &str) -> u16 {
        Self::resolve(code)
            .map(ErrorKind::status)
            .unwrap_or(ErrorKind::InternalServerError.status())
    }

    pub fn status_code(self) -> StatusCode {
        StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// New error of this kind without info.
    pub fn error(self) -> ServerError {
        ServerError::new(self.name())
    }

    /// New error of this kind carrying caller-visible `info`.
    pub fn with_info(self, info: impl Into<Value>) -> ServerError {
        self.error().with_info(info)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
