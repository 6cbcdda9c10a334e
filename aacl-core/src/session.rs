//! Session orchestrator: the caller-facing entry point.
//!
//! [`Session::send`] runs one fetch-bind-execute cycle and destroys the
//! grammar on every exit path: success, binder failure, transmission
//! failure, and cancellation (the `send` future being dropped mid-flight).
//! A given `grammar_id` therefore reaches the execution endpoint at most
//! once per session.
//!
//! ```rust,ignore
//! let config = ClientConfig::new("https://vault.example.com")
//!     .with_session_cookie("session=...");
//! let mut session = Session::from_config(&config)?;
//!
//! let result = session
//!     .send("TRANSFER_MONEY", &json!({"recipient_id": "456", "amount": 50, "memo": "rent"}))
//!     .await?;
//! assert!(session.store().is_empty());
//! ```
//!
//! `send` takes `&mut self`, so one session serves one caller at a time.
//! Share a session across tasks behind a `tokio::sync::Mutex`, or give each
//! logical caller its own.

use crate::binder;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::store::GrammarStore;
use crate::transport::{ExecuteRequest, GrammarTransport, HttpTransport};
use serde::Serialize;
use serde_json::{Map, Value};
use std::ops::{Deref, DerefMut};
use tracing::{info, warn};

/// Clears the grammar slot when dropped.
///
/// Held for the whole of one `send`, so the slot is emptied however the call
/// ends, including when its future is dropped before completion.
struct ConsumeGuard<'a> {
    store: &'a mut GrammarStore,
}

impl<'a> ConsumeGuard<'a> {
    fn new(store: &'a mut GrammarStore) -> Self {
        Self { store }
    }
}

impl Deref for ConsumeGuard<'_> {
    type Target = GrammarStore;

    fn deref(&self) -> &GrammarStore {
        self.store
    }
}

impl DerefMut for ConsumeGuard<'_> {
    fn deref_mut(&mut self) -> &mut GrammarStore {
        self.store
    }
}

impl Drop for ConsumeGuard<'_> {
    fn drop(&mut self) {
        self.store.clear();
    }
}

/// A client session: one transport, one grammar slot.
#[derive(Debug)]
pub struct Session<T = HttpTransport> {
    transport: T,
    store: GrammarStore,
}

impl Session<HttpTransport> {
    /// Create a session talking HTTP to the configured server.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new(config)?))
    }
}

impl<T: GrammarTransport> Session<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            store: GrammarStore::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The grammar slot, read-only. Empty whenever no `send` is in flight.
    pub fn store(&self) -> &GrammarStore {
        &self.store
    }

    /// Authorize and execute `intent` with caller `data`.
    ///
    /// Fetches a grammar if none is stored for `intent`, binds `data`
    /// against it, submits `{grammar_id, payload}` and returns the server's
    /// JSON result verbatim. Whatever happens, the grammar is destroyed
    /// before this returns.
    pub async fn send(&mut self, intent: &str, data: &Map<String, Value>) -> Result<Value> {
        let mut slot = ConsumeGuard::new(&mut self.store);

        let grammar = slot.ensure(&self.transport, intent).await?;
        let grammar_id = grammar.grammar_id.clone();

        let payload = binder::bind(grammar, data).map_err(|e| {
            warn!(
                intent = %intent,
                grammar_id = %grammar_id,
                error = %e,
                "Caller data does not satisfy grammar"
            );
            e
        })?;

        let request = ExecuteRequest {
            grammar_id,
            payload,
        };
        let outcome = self.transport.execute(&request).await;
        drop(slot);

        match &outcome {
            Ok(_) => info!(
                intent = %intent,
                grammar_id = %request.grammar_id,
                "Intent executed"
            ),
            Err(e) => warn!(
                intent = %intent,
                grammar_id = %request.grammar_id,
                error = %e,
                "Execution request failed"
            ),
        }
        outcome
    }

    /// Like [`Session::send`], for any data that serializes to a JSON object.
    ///
    /// Data that is not an object is rejected before any grammar is fetched.
    pub async fn send_serializable<D>(&mut self, intent: &str, data: &D) -> Result<Value>
    where
        D: Serialize + ?Sized,
    {
        let map = binder::to_object(data)?;
        self.send(intent, &map).await
    }
}
