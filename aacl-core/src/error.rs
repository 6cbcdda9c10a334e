//! Error types for the AACL client.
//!
//! Every failure of a `send` attempt is surfaced through [`Error`], and only
//! after the grammar slot has been cleared. Errors carry enough context
//! (intent, field name, HTTP status) to act on without re-running the call.

use thiserror::Error;

/// Result type alias for AACL operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Canonical error codes.
///
/// Code ranges:
/// - 1000-1099: Grammar issuance errors
/// - 1100-1199: Binding errors
/// - 1200-1299: Execution errors
/// - 1300-1399: Client configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Grammar issuance errors (1000-1099)
    GrammarFetchFailed = 1000,
    GrammarInvalid = 1001,

    // Binding errors (1100-1199)
    MissingRequiredField = 1100,
    PayloadShapeMismatch = 1101,
    InvalidCallerData = 1102,

    // Execution errors (1200-1299)
    TransmissionFailed = 1200,

    // Client configuration errors (1300-1399)
    InvalidConfiguration = 1300,
}

impl ErrorCode {
    /// Get the numeric code value.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Get machine-readable name (kebab-case).
    pub fn name(self) -> &'static str {
        match self {
            Self::GrammarFetchFailed => "grammar-fetch-failed",
            Self::GrammarInvalid => "grammar-invalid",
            Self::MissingRequiredField => "missing-required-field",
            Self::PayloadShapeMismatch => "payload-shape-mismatch",
            Self::InvalidCallerData => "invalid-caller-data",
            Self::TransmissionFailed => "transmission-failed",
            Self::InvalidConfiguration => "invalid-configuration",
        }
    }

    /// Get human-readable description.
    pub fn description(self) -> &'static str {
        match self {
            Self::GrammarFetchFailed => "Grammar could not be obtained from the issuer",
            Self::GrammarInvalid => "Issued grammar violates the grammar shape rules",
            Self::MissingRequiredField => "Caller data lacks a field the grammar requires",
            Self::PayloadShapeMismatch => "Bound payload does not have the expected key count",
            Self::InvalidCallerData => "Caller data is not a JSON object",
            Self::TransmissionFailed => "Execution request failed or returned malformed JSON",
            Self::InvalidConfiguration => "Client configuration is invalid",
        }
    }
}

/// Errors that can occur in AACL operations.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Grammar Issuance Errors
    // =========================================================================
    /// The issuer returned a non-success status, an unreadable body, or a
    /// grammar for a different intent.
    #[error("failed to fetch grammar for intent '{intent}': {reason}")]
    GrammarFetch {
        intent: String,
        reason: String,
        /// HTTP status, when the issuer answered at all.
        status: Option<u16>,
    },

    /// The issued grammar breaks the shape rules (reserved or duplicate
    /// required keys, empty id or intent).
    #[error("invalid grammar: {0}")]
    InvalidGrammar(String),

    // =========================================================================
    // Binding Errors
    // =========================================================================
    /// Caller data lacked a key the grammar requires.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// The bound payload has the wrong number of keys.
    #[error("payload shape mismatch: expected {expected} keys, built {actual}")]
    PayloadShape { expected: usize, actual: usize },

    /// Caller data could not be turned into a JSON object.
    #[error("invalid caller data: {0}")]
    InvalidData(String),

    // =========================================================================
    // Execution Errors
    // =========================================================================
    /// The execution endpoint was unreachable or answered with malformed JSON.
    #[error("transmission failed: {0}")]
    Transmission(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidData(e.to_string())
    }
}

impl Error {
    /// Map this error to a canonical error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::GrammarFetch { .. } => ErrorCode::GrammarFetchFailed,
            Self::InvalidGrammar(_) => ErrorCode::GrammarInvalid,
            Self::MissingField(_) => ErrorCode::MissingRequiredField,
            Self::PayloadShape { .. } => ErrorCode::PayloadShapeMismatch,
            Self::InvalidData(_) => ErrorCode::InvalidCallerData,
            Self::Transmission(_) => ErrorCode::TransmissionFailed,
            Self::Configuration(_) => ErrorCode::InvalidConfiguration,
        }
    }

    /// Get the machine-readable error name (kebab-case).
    pub fn name(&self) -> &'static str {
        self.code().name()
    }

    /// Get human-readable description.
    pub fn description(&self) -> &'static str {
        self.code().description()
    }

    /// True for failures detected locally before anything reached the
    /// execution endpoint.
    pub fn is_binding_error(&self) -> bool {
        matches!(
            self,
            Self::MissingField(_) | Self::PayloadShape { .. } | Self::InvalidData(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::GrammarFetchFailed.code(), 1000);
        assert_eq!(ErrorCode::GrammarInvalid.code(), 1001);
        assert_eq!(ErrorCode::MissingRequiredField.code(), 1100);
        assert_eq!(ErrorCode::PayloadShapeMismatch.code(), 1101);
        assert_eq!(ErrorCode::TransmissionFailed.code(), 1200);
        assert_eq!(ErrorCode::InvalidConfiguration.code(), 1300);
    }

    #[test]
    fn test_error_to_code_mapping() {
        let err = Error::MissingField("to".into());
        assert_eq!(err.code(), ErrorCode::MissingRequiredField);
        assert_eq!(err.name(), "missing-required-field");
        assert_eq!(err.to_string(), "missing required field: to");

        let err = Error::PayloadShape {
            expected: 5,
            actual: 4,
        };
        assert_eq!(err.code(), ErrorCode::PayloadShapeMismatch);
        assert!(err.to_string().contains("expected 5"));

        let err = Error::GrammarFetch {
            intent: "transfer".into(),
            reason: "status 401".into(),
            status: Some(401),
        };
        assert_eq!(err.name(), "grammar-fetch-failed");
        assert!(err.to_string().contains("'transfer'"));
    }

    #[test]
    fn test_binding_errors_are_local() {
        assert!(Error::MissingField("a".into()).is_binding_error());
        assert!(Error::PayloadShape {
            expected: 4,
            actual: 3
        }
        .is_binding_error());
        assert!(!Error::Transmission("down".into()).is_binding_error());
        assert!(!Error::InvalidGrammar("x".into()).is_binding_error());
    }

    #[test]
    fn test_error_name_format() {
        let codes = [
            ErrorCode::GrammarFetchFailed,
            ErrorCode::GrammarInvalid,
            ErrorCode::MissingRequiredField,
            ErrorCode::PayloadShapeMismatch,
            ErrorCode::InvalidCallerData,
            ErrorCode::TransmissionFailed,
            ErrorCode::InvalidConfiguration,
        ];

        for code in codes {
            let name = code.name();
            assert!(
                name.chars().all(|c| c.is_lowercase() || c == '-'),
                "Error name '{}' is not kebab-case",
                name
            );
            assert!(!code.description().is_empty());
        }
    }

    #[test]
    fn test_serde_json_error_converts_to_invalid_data() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.code(), ErrorCode::InvalidCallerData);
    }
}
