//! Typed errors and HTTP mapping.
//!
//! Three layers: `SchemaError` is raised while constructing a
//! `SchemaDefinition` (a malformed definition never reaches the registry),
//! `MappingError` aborts a single `register` call atomically, and `AppError`
//! covers everything a request can hit at runtime.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Schema definition is malformed. Raised at construction time only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema name '{0}' is not a valid identifier")]
    InvalidName(String),
    #[error("schema name '{0}' cannot start with underscore")]
    ReservedName(String),
    #[error("schema must have at least one field")]
    NoFields,
    #[error("duplicate field name: {0}")]
    DuplicateField(String),
    #[error("field name '{0}' is reserved")]
    ReservedField(String),
    #[error("field '{0}': choices must be provided for choice fields")]
    MissingChoices(String),
    #[error("field '{0}': relationship kind and related schema must be set together")]
    IncompleteRelationship(String),
}

/// Storage mapper cannot resolve the schema. Registration is aborted and the
/// registry is left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("field '{field}': relationship references unregistered schema '{related}'")]
    UnknownRelatedSchema { field: String, related: String },
    #[error("field '{0}': many-to-many relationships are not supported")]
    UnsupportedRelationship(String),
    #[error("field '{field}': invalid validation rule: {reason}")]
    InvalidRule { field: String, reason: String },
    #[error("index name collision: {0}")]
    IndexNameCollision(String),
    #[error("constraint name collision: {0}")]
    ConstraintNameCollision(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error("{field}: {reason}")]
    Validation { field: String, reason: String },
    #[error("not found: {0}")]
    NotFound(String),
    /// Domain-rule violation outside plain field validation (client fault).
    #[error("{0}")]
    Crud(String),
    #[error("authentication required")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("database: {0}")]
    Db(sqlx::Error),
    #[error("internal: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Constraint violations are the client's fault: a duplicate value on a
/// unique column, a nulled required column, a dangling reference. They map
/// to [`AppError::Crud`] (400) rather than surfacing as a 500.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let message = match db.kind() {
                sqlx::error::ErrorKind::UniqueViolation => {
                    Some("value already exists for a unique field")
                }
                sqlx::error::ErrorKind::NotNullViolation => Some("a required field is missing"),
                sqlx::error::ErrorKind::ForeignKeyViolation => {
                    Some("referenced record does not exist")
                }
                sqlx::error::ErrorKind::CheckViolation => {
                    Some("value violates a storage constraint")
                }
                _ => None,
            };
            if let Some(message) = message {
                return AppError::Crud(message.into());
            }
        }
        AppError::Db(err)
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Schema(_) => (StatusCode::UNPROCESSABLE_ENTITY, "schema_error"),
            AppError::Mapping(_) => (StatusCode::UNPROCESSABLE_ENTITY, "mapping_error"),
            AppError::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Crud(_) => (StatusCode::BAD_REQUEST, "crud_error"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Db(e) => {
                if matches!(e, sqlx::Error::RowNotFound) {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        // Internal detail stays server-side; the client gets a generic message.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal error");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn validation_maps_to_422() {
        let resp = AppError::validation("email", "must be a valid email").into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn not_found_maps_to_404() {
        let resp = AppError::NotFound("tasks/9".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_maps_to_500() {
        let resp = AppError::Internal("pool exhausted".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[derive(Debug)]
    struct StubDbError {
        code: &'static str,
    }

    impl std::fmt::Display for StubDbError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "constraint violated ({})", self.code)
        }
    }

    impl std::error::Error for StubDbError {}

    impl sqlx::error::DatabaseError for StubDbError {
        fn message(&self) -> &str {
            "constraint violated"
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some(self.code.into())
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            match self.code {
                "23505" => sqlx::error::ErrorKind::UniqueViolation,
                "23502" => sqlx::error::ErrorKind::NotNullViolation,
                "23503" => sqlx::error::ErrorKind::ForeignKeyViolation,
                _ => sqlx::error::ErrorKind::Other,
            }
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    fn db_error(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(StubDbError { code }))
    }

    #[test]
    fn constraint_violations_become_client_errors() {
        for code in ["23505", "23502", "23503"] {
            let err = AppError::from(db_error(code));
            assert!(matches!(err, AppError::Crud(_)), "code {code}");
            assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        }
        // Anything else stays a database error (500).
        let err = AppError::from(db_error("57014"));
        assert!(matches!(err, AppError::Db(_)));
    }
}
