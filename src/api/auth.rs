//! Per-operation authorization policy resolved from a schema's
//! [`AuthConfig`]. This module decides *whether* a caller is required, not
//! who the caller is; identity arrives from outer middleware.

use crate::schema::AuthConfig;
use serde::{Deserialize, Serialize};

/// The six generated operations, by their wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    List,
    Get,
    Update,
    Delete,
    Count,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Create,
        Operation::List,
        Operation::Get,
        Operation::Update,
        Operation::Delete,
        Operation::Count,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::List => "list",
            Operation::Get => "get",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Count => "count",
        }
    }

    pub fn is_read(self) -> bool {
        matches!(self, Operation::List | Operation::Get | Operation::Count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthRequirement {
    Public,
    Required,
}

/// Caller identity, inserted into request extensions by outer middleware.
/// The engine never authenticates; it only honors the resolved requirement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Resolve the requirement for one operation. Precedence, first match wins:
/// explicit public list, explicit protected list, read_public for reads,
/// write_protected for writes, then the schema-wide require_auth fallback.
pub fn resolve(auth: &AuthConfig, op: Operation) -> AuthRequirement {
    let name = op.name();
    if auth.public_routes.iter().any(|r| r == name) {
        return AuthRequirement::Public;
    }
    if auth.protected_routes.iter().any(|r| r == name) {
        return AuthRequirement::Required;
    }
    if op.is_read() && auth.read_public {
        return AuthRequirement::Public;
    }
    if !op.is_read() && auth.write_protected {
        return AuthRequirement::Required;
    }
    if auth.require_auth {
        AuthRequirement::Required
    } else {
        AuthRequirement::Public
    }
}
