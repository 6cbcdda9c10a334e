//! Single-occupancy grammar slot.
//!
//! A store holds zero or one [`Grammar`]. It is an owned value, so every
//! session (and every test) gets its own slot.
//!
//! Lifecycle of one grammar: `absent -> fetched -> consumed`. The only way
//! back to `fetched` is through `absent`, by way of [`GrammarStore::ensure`].

use crate::error::{Error, Result};
use crate::grammar::{Grammar, GrammarId};
use crate::transport::GrammarTransport;
use tracing::debug;

#[derive(Debug, Default)]
pub struct GrammarStore {
    current: Option<Grammar>,
}

impl GrammarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure a usable grammar for `intent` is stored and return it.
    ///
    /// A stored grammar is reused only if it names the same intent and has
    /// not expired; otherwise it is discarded before a new one is fetched.
    /// On any fetch failure the store is left empty.
    pub async fn ensure<T>(&mut self, transport: &T, intent: &str) -> Result<&Grammar>
    where
        T: GrammarTransport + ?Sized,
    {
        let reusable = self
            .current
            .as_ref()
            .is_some_and(|g| g.authorizes(intent) && !g.is_expired());

        if !reusable {
            if let Some(stale) = self.current.take() {
                debug!(
                    grammar_id = %stale.grammar_id,
                    stale_intent = %stale.intent,
                    requested_intent = %intent,
                    expired = stale.is_expired(),
                    "Discarding stored grammar"
                );
            }

            let grammar = transport.fetch_grammar(intent).await?;
            if !grammar.authorizes(intent) {
                return Err(Error::GrammarFetch {
                    intent: intent.to_string(),
                    reason: format!("issuer returned a grammar for intent '{}'", grammar.intent),
                    status: None,
                });
            }
            grammar.validate()?;

            debug!(
                intent = %intent,
                grammar_id = %grammar.grammar_id,
                "Grammar stored"
            );
            self.current = Some(grammar);
        }

        // The branch above either returned or filled the slot.
        self.current.as_ref().ok_or_else(|| Error::GrammarFetch {
            intent: intent.to_string(),
            reason: "grammar slot empty after fetch".into(),
            status: None,
        })
    }

    /// Discard the stored grammar, if any. Returns the discarded id.
    pub fn clear(&mut self) -> Option<GrammarId> {
        let grammar = self.current.take()?;
        debug!(
            grammar_id = %grammar.grammar_id,
            intent = %grammar.intent,
            "Grammar destroyed"
        );
        Some(grammar.grammar_id)
    }

    /// The stored grammar. For diagnostics only; binding always goes through
    /// [`GrammarStore::ensure`].
    pub fn current(&self) -> Option<&Grammar> {
        self.current.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }
}
