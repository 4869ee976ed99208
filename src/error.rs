use thiserror::Error;

/// Errors produced by the selector codec, the rule engine, the rule
/// repository and the messaging layer.
#[derive(Debug, Error)]
pub enum ZapError {
    /// A selector could not be parsed, even after escaping
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// A node handle does not refer to a live element
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Text editing was requested on an element without text
    #[error("Nothing to edit: {0}")]
    NothingToEdit(String),

    /// HTML could not be turned into a document
    #[error("Failed to parse DOM: {0}")]
    DomParseFailed(String),

    /// A page URL without a usable hostname
    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),

    /// The persistent store rejected a read or write
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A request was answered with an error response
    #[error("Message '{action}' failed: {reason}")]
    MessageFailed { action: String, reason: String },
}

impl ZapError {
    pub fn invalid_selector(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        ZapError::InvalidSelector {
            selector: selector.into(),
            reason: reason.into(),
        }
    }
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, ZapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_selector_display() {
        let err = ZapError::invalid_selector(".a:b", "unknown pseudo-class ':b'");
        assert_eq!(
            err.to_string(),
            "Invalid selector '.a:b': unknown pseudo-class ':b'"
        );
    }

    #[test]
    fn test_from_serde_error() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ZapError = parse_err.into();
        assert!(matches!(err, ZapError::Serialization(_)));
    }
}
