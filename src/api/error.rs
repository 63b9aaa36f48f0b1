use algoref_api_types::{ErrorDetail, ErrorResponse};
use thiserror::Error;

use crate::cache::{ErrorInfo, FailureKind};

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("{message}")]
    Validation {
        message: String,
        fields: Vec<FieldError>,
    },
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// Map a non-success response to the error taxonomy.
    pub(crate) fn from_response(status: u16, body: &[u8]) -> Self {
        let parsed: Option<ErrorResponse> = serde_json::from_slice(body).ok();
        let (message, fields) = match parsed.map(|response| response.detail) {
            Some(ErrorDetail::Message(message)) => (message, Vec::new()),
            Some(ErrorDetail::Fields(items)) => {
                let fields: Vec<FieldError> = items
                    .iter()
                    .map(|item| FieldError::new(item.field(), item.msg.clone()))
                    .collect();
                let message = fields
                    .iter()
                    .map(|field| format!("{}: {}", field.field, field.message))
                    .collect::<Vec<_>>()
                    .join("; ");
                (message, fields)
            }
            None => (String::new(), Vec::new()),
        };

        match status {
            401 | 403 => Self::Auth(or_default(message, "Could not validate credentials")),
            404 => Self::NotFound(or_default(message, "Resource not found")),
            400 | 409 | 422 => Self::Validation {
                message: or_default(message, "Request was rejected"),
                fields,
            },
            _ => Self::Server { status, message },
        }
    }

    pub fn validation(fields: Vec<FieldError>) -> Self {
        let message = fields
            .iter()
            .map(|field| format!("{}: {}", field.field, field.message))
            .collect::<Vec<_>>()
            .join("; ");
        Self::Validation { message, fields }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network(err) => err.status().map(|status| status.as_u16()),
            Self::Validation { .. } => Some(422),
            Self::Auth(_) => Some(401),
            Self::NotFound(_) => Some(404),
            Self::Server { status, .. } => Some(*status),
            Self::Decode(_) | Self::InvalidUrl(_) => None,
        }
    }

    pub fn fields(&self) -> &[FieldError] {
        match self {
            Self::Validation { fields, .. } => fields,
            _ => &[],
        }
    }

    /// Human-readable message from the backend, when it sent one.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Validation { message, .. }
            | Self::Auth(message)
            | Self::NotFound(message)
            | Self::Server { message, .. }
                if !message.is_empty() =>
            {
                Some(message.as_str())
            }
            _ => None,
        }
    }

    /// Message to show a user, falling back to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.backend_message().unwrap_or(fallback).to_string()
    }
}

fn or_default(message: String, default: &str) -> String {
    if message.is_empty() {
        default.to_string()
    } else {
        message
    }
}

impl From<&ApiError> for ErrorInfo {
    fn from(error: &ApiError) -> Self {
        let kind = match error {
            ApiError::Network(_) => FailureKind::Network,
            ApiError::Validation { .. } => FailureKind::Validation,
            ApiError::Auth(_) => FailureKind::Auth,
            ApiError::NotFound(_) => FailureKind::NotFound,
            ApiError::Server { .. } => FailureKind::Server,
            ApiError::Decode(_) => FailureKind::Decode,
            ApiError::InvalidUrl(_) => FailureKind::Internal,
        };
        ErrorInfo::new(kind, error.status(), error.to_string())
    }
}

impl From<ApiError> for ErrorInfo {
    fn from(error: ApiError) -> Self {
        Self::from(&error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_detail_becomes_not_found_message() {
        let err = ApiError::from_response(404, br#"{"detail":"Algorithm not found"}"#);
        assert!(matches!(&err, ApiError::NotFound(m) if m == "Algorithm not found"));
        assert_eq!(err.user_message("fallback"), "Algorithm not found");
    }

    #[test]
    fn field_list_becomes_validation_error() {
        let body = br#"{"detail":[{"loc":["body","title"],"msg":"String should have at least 3 characters","type":"string_too_short"}]}"#;
        let err = ApiError::from_response(422, body);
        assert_eq!(err.fields().len(), 1);
        assert_eq!(err.fields()[0].field, "title");
        assert_eq!(
            err.user_message("Failed to save algorithm"),
            "title: String should have at least 3 characters"
        );
    }

    #[test]
    fn unauthorized_maps_to_auth() {
        let err = ApiError::from_response(401, br#"{"detail":"Could not validate credentials"}"#);
        assert!(err.is_auth());
        assert_eq!(ErrorInfo::from(&err).kind, FailureKind::Auth);
    }

    #[test]
    fn server_error_without_body_uses_fallback() {
        let err = ApiError::from_response(502, b"<html>bad gateway</html>");
        assert!(matches!(err, ApiError::Server { status: 502, .. }));
        assert_eq!(err.user_message("Failed to save algorithm"), "Failed to save algorithm");
    }
}
