//! # Error Handling
//!
//! Two kinds of errors leave this crate:
//!
//! - [`ConfigError`]: a programming error in an entity's filter configuration.
//!   These are detected when an [`EntityFilters`](crate::filtering::EntityFilters)
//!   is built, at startup, and never at request time.
//! - [`ApiError`]: returned by the HTTP handlers. Data-store failures are logged
//!   with `tracing` and turned into a sanitized 500 response.
//!
//! Malformed user input is never an error: bad values, unknown ordering keys and
//! unknown preset slugs are recovered locally and only logged at debug level.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use std::fmt;

/// Entity configuration error, raised while building filter registries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The same field name was declared twice for one entity
    DuplicateField { entity: String, field: String },
    /// A field mixes a custom predicate with options only automatic filtering understands
    ConflictingRule { field: String, reason: &'static str },
    /// A field was given an explicitly empty selector list
    EmptySelectors { field: String },
    /// A preset sets a value for a field the entity does not declare
    UnknownPresetField { preset: String, field: String },
    /// Two presets share a slug
    DuplicatePreset { entity: String, slug: String },
    /// Two entities registered under the same name
    DuplicateEntity { entity: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateField { entity, field } => {
                write!(f, "field '{field}' is declared twice for entity '{entity}'")
            }
            Self::ConflictingRule { field, reason } => {
                write!(f, "field '{field}' has a conflicting filter rule: {reason}")
            }
            Self::EmptySelectors { field } => {
                write!(f, "field '{field}' declares an empty selector list")
            }
            Self::UnknownPresetField { preset, field } => {
                write!(f, "preset '{preset}' references undeclared field '{field}'")
            }
            Self::DuplicatePreset { entity, slug } => {
                write!(f, "preset '{slug}' is declared twice for entity '{entity}'")
            }
            Self::DuplicateEntity { entity } => {
                write!(f, "entity '{entity}' is registered twice")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// API error type with automatic logging and sanitized responses
#[derive(Debug)]
pub enum ApiError {
    /// 500 Internal Server Error - Database error (details logged, not exposed)
    Database {
        /// User-facing generic message
        message: String,
        /// Internal error (logged, not sent to user)
        internal: DbErr,
    },
}

impl ApiError {
    /// Create a 500 Internal Server Error from a database error
    ///
    /// The database error details are logged but NOT sent to the user.
    pub fn database(err: DbErr) -> Self {
        Self::Database {
            message: "A database error occurred".to_string(),
            internal: err,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::Database { message, .. } => message.clone(),
        }
    }

    /// Log internal error details (not sent to user)
    fn log_internal(&self) {
        match self {
            Self::Database { internal, .. } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
        }
    }
}

/// Error response sent to users (sanitized)
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {}

/// Every `DbErr` becomes a 500; listing never produces "not found".
impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        Self::database(err)
    }
}
