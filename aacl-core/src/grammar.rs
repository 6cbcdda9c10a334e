//! The server-issued grammar.
//!
//! A grammar names one intent, carries two opaque values (`state`,
//! `entropy`) that are echoed back verbatim, and lists the caller fields the
//! execution payload must contain. It is valid for exactly one execution.

use crate::error::{Error, Result};
use crate::COMMON_FIELDS;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Opaque, single-use grammar identifier assigned by the issuer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrammarId(String);

impl GrammarId {
    /// Wrap an issuer-assigned identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GrammarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GrammarId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A grammar as returned by `POST /aacl/issue/{intent}`.
///
/// Fields the client does not understand are ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grammar {
    /// Unique identifier, presented to the execution endpoint once.
    pub grammar_id: GrammarId,
    /// The action this grammar authorizes.
    pub intent: String,
    /// Opaque server state, copied into the payload unchanged.
    pub state: String,
    /// Opaque server entropy, copied into the payload unchanged.
    pub entropy: String,
    /// Caller fields the payload must carry, in construction order.
    pub required_keys: Vec<String>,
    /// Issuer-side expiry. `None` means the client never expires it locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Grammar {
    /// Number of keys a payload bound from this grammar must have.
    pub fn expected_key_count(&self) -> usize {
        self.required_keys.len() + COMMON_FIELDS.len()
    }

    /// Whether this grammar may be used for `intent`.
    pub fn authorizes(&self, intent: &str) -> bool {
        self.intent == intent
    }

    /// Check if the grammar has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check expiry against an explicit clock reading.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now > expires_at,
            None => false,
        }
    }

    /// Check the shape rules every usable grammar must satisfy.
    ///
    /// The payload key-count guard relies on `required_keys` being disjoint
    /// from the common fields and free of duplicates, so a grammar breaking
    /// either rule is refused outright.
    pub fn validate(&self) -> Result<()> {
        if self.grammar_id.as_str().is_empty() {
            return Err(Error::InvalidGrammar("grammar_id is empty".into()));
        }
        if self.intent.is_empty() {
            return Err(Error::InvalidGrammar("intent is empty".into()));
        }

        let mut seen = HashSet::with_capacity(self.required_keys.len());
        for key in &self.required_keys {
            if COMMON_FIELDS.contains(&key.as_str()) {
                return Err(Error::InvalidGrammar(format!(
                    "required key '{}' collides with a common field",
                    key
                )));
            }
            if !seen.insert(key.as_str()) {
                return Err(Error::InvalidGrammar(format!(
                    "required key '{}' is listed twice",
                    key
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer_grammar() -> Grammar {
        Grammar {
            grammar_id: GrammarId::new("g1"),
            intent: "transfer".into(),
            state: "s".into(),
            entropy: "e".into(),
            required_keys: vec!["amount".into(), "to".into()],
            expires_at: None,
        }
    }

    #[test]
    fn test_deserialize_issuer_response() {
        let json = r#"{
            "grammar_id": "7d5c0a4e-2b0f-4a57-9a1e-3c1f0e2d9b11",
            "intent": "TRANSFER_MONEY",
            "state": "AUTHENTICATED|USER_123|BALANCE_5000.00",
            "entropy": "entropy-a1b2c3d4e5f6",
            "expires_at": "2026-01-15T10:05:00.123456Z",
            "required_keys": ["recipient_id", "amount", "memo"]
        }"#;
        let grammar: Grammar = serde_json::from_str(json).unwrap();
        assert_eq!(
            grammar.grammar_id.as_str(),
            "7d5c0a4e-2b0f-4a57-9a1e-3c1f0e2d9b11"
        );
        assert_eq!(grammar.required_keys, vec!["recipient_id", "amount", "memo"]);
        assert!(grammar.expires_at.is_some());
        assert!(grammar.validate().is_ok());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let json = r#"{"grammar_id":"g1","intent":"transfer","state":"s","entropy":"e",
                       "required_keys":[],"issuer":"vault-1"}"#;
        let grammar: Grammar = serde_json::from_str(json).unwrap();
        assert_eq!(grammar.expires_at, None);
        assert_eq!(grammar.expected_key_count(), 3);
    }

    #[test]
    fn test_missing_required_keys_is_malformed() {
        let json = r#"{"grammar_id":"g1","intent":"transfer","state":"s","entropy":"e"}"#;
        assert!(serde_json::from_str::<Grammar>(json).is_err());
    }

    #[test]
    fn test_expected_key_count() {
        assert_eq!(transfer_grammar().expected_key_count(), 5);
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let mut grammar = transfer_grammar();
        assert!(!grammar.is_expired_at(now));

        grammar.expires_at = Some(now + chrono::Duration::minutes(5));
        assert!(!grammar.is_expired_at(now));
        assert!(grammar.is_expired_at(now + chrono::Duration::minutes(6)));
    }

    #[test]
    fn test_reserved_required_key_is_invalid() {
        let mut grammar = transfer_grammar();
        grammar.required_keys = vec!["intent".into(), "amount".into()];
        let err = grammar.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidGrammar(msg) if msg.contains("'intent'")));
    }

    #[test]
    fn test_duplicate_required_key_is_invalid() {
        let mut grammar = transfer_grammar();
        grammar.required_keys = vec!["amount".into(), "amount".into()];
        assert!(matches!(grammar.validate(), Err(Error::InvalidGrammar(_))));
    }

    #[test]
    fn test_empty_identity_is_invalid() {
        let mut grammar = transfer_grammar();
        grammar.grammar_id = GrammarId::new("");
        assert!(grammar.validate().is_err());

        let mut grammar = transfer_grammar();
        grammar.intent.clear();
        assert!(grammar.validate().is_err());
    }

    #[test]
    fn test_authorizes_exact_intent_only() {
        let grammar = transfer_grammar();
        assert!(grammar.authorizes("transfer"));
        assert!(!grammar.authorizes("Transfer"));
        assert!(!grammar.authorizes("change_password"));
    }
}
