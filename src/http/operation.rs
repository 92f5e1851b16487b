//! Operation kinds and their fixed transport bindings.

use std::fmt;

use axum::http::StatusCode;

use crate::routing::registry::Verb;

/// Abstract operation kinds exposed for registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Get,
    Create,
    Replace,
    Update,
    Remove,
    Invoke,
    Intercept,
    Static,
}

impl Operation {
    pub const ALL: [Operation; 9] = [
        Operation::List,
        Operation::Get,
        Operation::Create,
        Operation::Replace,
        Operation::Update,
        Operation::Remove,
        Operation::Invoke,
        Operation::Intercept,
        Operation::Static,
    ];

    pub fn verb(self) -> Verb {
        match self {
            Operation::List | Operation::Get => Verb::Get,
            Operation::Create | Operation::Invoke => Verb::Post,
            Operation::Replace => Verb::Put,
            Operation::Update => Verb::Patch,
            Operation::Remove => Verb::Delete,
            Operation::Intercept => Verb::Use,
            Operation::Static => Verb::Static,
        }
    }

    /// Status of the success envelope; `None` for kinds that write none.
    pub fn success_status(self) -> Option<StatusCode> {
        match self {
            Operation::List | Operation::Get | Operation::Invoke => Some(StatusCode::OK),
            Operation::Create | Operation::Replace | Operation::Update => Some(StatusCode::CREATED),
            Operation::Remove => Some(StatusCode::NO_CONTENT),
            Operation::Intercept | Operation::Static => None,
        }
    }

    /// Whether the parsed request body is handed to the handler.
    pub fn carries_body(self) -> bool {
        matches!(
            self,
            Operation::Create | Operation::Replace | Operation::Update | Operation::Invoke
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Replace => "replace",
            Operation::Update => "update",
            Operation::Remove => "remove",
            Operation::Invoke => "invoke",
            Operation::Intercept => "intercept",
            Operation::Static => "static",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
