//! Error types for the WMS layer source.

use thiserror::Error;

/// Result type alias using WmsError.
pub type WmsResult<T> = Result<T, WmsError>;

/// Primary error type for layer source operations.
#[derive(Debug, Error)]
pub enum WmsError {
    // === Network Errors ===
    #[error("Unable to access {url}: {reason}")]
    ServiceUnreachable { url: String, reason: String },

    #[error("No data found: {0}")]
    NoDataFound(String),

    // === Translation Errors ===
    #[error("Unsupported geometry kind: {0}")]
    UnsupportedGeometryKind(String),

    #[error("Unsupported expression node: {0}")]
    UnsupportedExpressionNode(String),

    #[error("Invalid query expression: {0}")]
    QueryParse(String),

    // === Request Errors ===
    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    // === Response Errors ===
    #[error("Malformed XML response: {0}")]
    XmlError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl WmsError {
    /// Build a `ServiceUnreachable` error for the given URL.
    pub fn unreachable(url: impl Into<String>, reason: impl ToString) -> Self {
        WmsError::ServiceUnreachable {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error should be shown to the user as a notification
    /// rather than propagated as a programming error.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            WmsError::ServiceUnreachable { .. }
                | WmsError::NoDataFound(_)
                | WmsError::XmlError(_)
                | WmsError::QueryParse(_)
        )
    }
}

impl From<serde_json::Error> for WmsError {
    fn from(err: serde_json::Error) -> Self {
        WmsError::InternalError(format!("JSON error: {}", err))
    }
}
