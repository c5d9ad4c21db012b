//! # Error Handling for CRUD APIs
//!
//! Errors leave the API as `application/problem+json` documents built from an
//! [`ErrorDescriptor`]:
//!
//! ```json
//! {
//!   "status": 400,
//!   "type": "validation_error",
//!   "title": "There was a validation error",
//!   "userText": "There was a validation error",
//!   "additionalInfo": [{"errors": ["name is required"]}]
//! }
//! ```
//!
//! The same descriptor is collected into the `errors` list of a
//! [`ResponseEnvelope`](crate::response::ResponseEnvelope) when a bulk
//! operation fails for some records but not others.
//!
//! Database and internal failures are logged through `tracing` and replaced
//! with a generic message before they reach the client.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// API error type with automatic logging and sanitized responses
#[derive(Debug)]
pub enum ApiError {
    /// 404 Not Found - Resource doesn't exist
    NotFound {
        /// Resource type (e.g., "Item", "Order")
        resource: String,
        /// Optional ID that wasn't found
        id: Option<String>,
    },

    /// 400 Bad Request - Invalid input from user
    BadRequest { message: String },

    /// 401 Unauthorized - Authentication required or failed
    Unauthorized { message: String },

    /// 403 Forbidden - Caller is not allowed to run this API method
    Forbidden { message: String },

    /// 409 Conflict - Resource conflict (e.g., duplicate key)
    Conflict { message: String },

    /// 400 Bad Request - Validation failed, details attached as additional info
    ValidationFailed {
        title: String,
        additional_info: Vec<serde_json::Value>,
    },

    /// 400 Bad Request - Argument has the wrong shape (e.g. bulk body is not a list)
    InvalidArgument { message: String, user_text: String },

    /// 400 Bad Request - Value outside what the endpoint accepts
    UnexpectedValue { message: String, user_text: String },

    /// 500 Internal Server Error - Database error (details logged, not exposed)
    Database { message: String, internal: DbErr },

    /// 500 Internal Server Error - Generic internal error
    Internal {
        message: String,
        internal: Option<String>,
    },

    /// Custom error with specific status code
    Custom {
        status: StatusCode,
        message: String,
        internal: Option<String>,
    },
}

impl ApiError {
    // ============================================================================
    // Constructors for common error types
    // ============================================================================

    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// The caller failed an authorization check for the requested API method.
    #[must_use]
    pub fn not_authorized() -> Self {
        Self::Forbidden {
            message: "You are not authorized for this action".to_string(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a validation error with no details yet.
    ///
    /// # Example
    /// ```rust,ignore
    /// let err = ApiError::validation()
    ///     .with_info(json!({"errors": ["name is required"]}))
    ///     .with_info(json!({"context": record}));
    /// ```
    #[must_use]
    pub fn validation() -> Self {
        Self::ValidationFailed {
            title: "There was a validation error".to_string(),
            additional_info: Vec::new(),
        }
    }

    /// Validation error listing the failing messages.
    #[must_use]
    pub fn validation_failed(errors: Vec<String>) -> Self {
        Self::validation().with_info(serde_json::json!({ "errors": errors }))
    }

    pub fn invalid_argument(message: impl Into<String>, user_text: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            user_text: user_text.into(),
        }
    }

    pub fn unexpected_value(message: impl Into<String>, user_text: impl Into<String>) -> Self {
        Self::UnexpectedValue {
            message: message.into(),
            user_text: user_text.into(),
        }
    }

    /// The request body could not be decoded as JSON.
    #[must_use]
    pub fn expected_valid_json() -> Self {
        Self::unexpected_value("expected valid JSON string", "JSON string invalid")
    }

    /// Create a 500 Internal Server Error from a database error
    ///
    /// The database error details are logged but NOT sent to the user.
    #[must_use]
    pub fn database(err: DbErr) -> Self {
        Self::Database {
            message: "A database error occurred".to_string(),
            internal: err,
        }
    }

    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    pub fn custom(status: StatusCode, message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Custom {
            status,
            message: message.into(),
            internal,
        }
    }

    /// Append an entry to the additional info of a validation error.
    ///
    /// Other variants carry no additional info and are returned unchanged.
    #[must_use]
    pub fn with_info(mut self, info: serde_json::Value) -> Self {
        if let Self::ValidationFailed {
            additional_info, ..
        } = &mut self
        {
            additional_info.push(info);
        }
        self
    }

    // ============================================================================
    // Accessors
    // ============================================================================

    /// HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. }
            | Self::ValidationFailed { .. }
            | Self::InvalidArgument { .. }
            | Self::UnexpectedValue { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Database { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Custom { status, .. } => *status,
        }
    }

    /// Stable machine-readable error type
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "object_not_found",
            Self::BadRequest { .. } => "bad_request",
            Self::Unauthorized { .. } => "authentication_required",
            Self::Forbidden { .. } => "not_authorized",
            Self::Conflict { .. } => "conflict",
            Self::ValidationFailed { .. } => "validation_error",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::UnexpectedValue { .. } => "unexpected_value",
            Self::Database { .. } | Self::Internal { .. } => "internal_server_error",
            Self::Custom { .. } => "about:blank",
        }
    }

    /// Get the user-facing error message (sanitized)
    fn user_message(&self) -> String {
        match self {
            Self::NotFound { resource, id } => match id {
                Some(id) => format!("{resource} with ID '{id}' not found"),
                None => format!("{resource} not found"),
            },
            Self::BadRequest { message }
            | Self::Unauthorized { message }
            | Self::Forbidden { message }
            | Self::Conflict { message }
            | Self::Database { message, .. }
            | Self::Internal { message, .. }
            | Self::Custom { message, .. } => message.clone(),
            Self::ValidationFailed { title, .. } => title.clone(),
            Self::InvalidArgument { user_text, .. } | Self::UnexpectedValue { user_text, .. } => {
                user_text.clone()
            }
        }
    }

    /// Title of the problem document; never contains internal details
    fn title(&self) -> String {
        match self {
            Self::InvalidArgument { message, .. } | Self::UnexpectedValue { message, .. } => {
                message.clone()
            }
            _ => self.user_message(),
        }
    }

    /// Convert into the serializable problem description.
    #[must_use]
    pub fn descriptor(&self) -> ErrorDescriptor {
        ErrorDescriptor {
            status: self.status_code().as_u16(),
            error_type: self.error_type().to_string(),
            title: self.title(),
            user_text: self.user_message(),
            additional_info: match self {
                Self::ValidationFailed {
                    additional_info, ..
                } => additional_info.clone(),
                _ => Vec::new(),
            },
        }
    }

    /// Log internal error details (not sent to user)
    fn log_internal(&self) {
        match self {
            Self::Database { internal, .. } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            Self::Custom {
                internal: Some(details),
                status,
                ..
            } => {
                tracing::error!(status = %status, details = %details, "Custom error occurred");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

/// Problem description sent to clients and collected in envelopes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDescriptor {
    pub status: u16,
    #[serde(rename = "type")]
    pub error_type: String,
    pub title: String,
    pub user_text: String,
    pub additional_info: Vec<serde_json::Value>,
}

impl From<&ApiError> for ErrorDescriptor {
    fn from(err: &ApiError) -> Self {
        err.descriptor()
    }
}

impl From<ApiError> for ErrorDescriptor {
    fn from(err: ApiError) -> Self {
        err.descriptor()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let mut response = (status, Json(self.descriptor())).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {}

/// Convert SeaORM `DbErr` to `ApiError`
///
/// - `DbErr::RecordNotFound` → 404 Not Found
/// - All other `DbErr` variants → 500 Internal Server Error (logged, sanitized)
impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        match &err {
            DbErr::RecordNotFound(msg) => {
                let resource = msg.split_whitespace().next().unwrap_or("Resource");
                Self::NotFound {
                    resource: resource.to_string(),
                    id: None,
                }
            }
            _ => Self::database(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_not_found_with_id() {
        let err = ApiError::not_found("Item", Some("123".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.user_message(), "Item with ID '123' not found");
    }

    #[test]
    fn test_not_authorized() {
        let err = ApiError::not_authorized();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.error_type(), "not_authorized");
    }

    #[test]
    fn test_validation_collects_additional_info() {
        let err = ApiError::validation()
            .with_info(json!({"errors": ["name is required"]}))
            .with_info(json!({"context": {"name": ""}}));
        let descriptor = err.descriptor();
        assert_eq!(descriptor.status, 400);
        assert_eq!(descriptor.error_type, "validation_error");
        assert_eq!(descriptor.title, "There was a validation error");
        assert_eq!(descriptor.additional_info.len(), 2);
    }

    #[test]
    fn test_with_info_ignored_on_other_variants() {
        let err = ApiError::bad_request("nope").with_info(json!({"x": 1}));
        assert!(err.descriptor().additional_info.is_empty());
    }

    #[test]
    fn test_unexpected_value_title_and_user_text() {
        let descriptor = ApiError::expected_valid_json().descriptor();
        assert_eq!(descriptor.title, "expected valid JSON string");
        assert_eq!(descriptor.user_text, "JSON string invalid");
        assert_eq!(descriptor.status, 400);
    }

    #[test]
    fn test_descriptor_serializes_camel_case() {
        let value = serde_json::to_value(ApiError::not_authorized().descriptor()).unwrap();
        assert_eq!(value["type"], "not_authorized");
        assert_eq!(value["status"], 403);
        assert!(value.get("userText").is_some());
        assert!(value.get("additionalInfo").is_some());
    }

    #[test]
    fn test_database_error_is_sanitized() {
        let err = ApiError::database(DbErr::Custom("secret table missing".to_string()));
        let descriptor = err.descriptor();
        assert_eq!(descriptor.status, 500);
        assert_eq!(descriptor.title, "A database error occurred");
        assert!(!descriptor.user_text.contains("secret"));
    }

    #[test]
    fn test_dberr_record_not_found_becomes_404() {
        let api_err: ApiError = DbErr::RecordNotFound("Item not found".to_string()).into();
        assert_eq!(api_err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(api_err.user_message(), "Item not found");
    }

    #[test]
    fn test_problem_json_content_type() {
        let response = ApiError::bad_request("bad").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/problem+json"
        );
    }

    #[test]
    fn test_display_trait() {
        let err = ApiError::bad_request("Test error");
        assert_eq!(format!("{err}"), "Test error");
    }
}
