//! # AACL Client
//!
//! Client side of AACL, a single-use, session-bound request-authorization
//! protocol. Before performing an action (an *intent*), the client asks the
//! server for a short-lived *grammar* naming exactly which fields the request
//! must carry. The client binds its data to that grammar, submits it once,
//! and destroys the grammar whatever the outcome, so it cannot replay it.
//!
//! ## Key Concepts
//!
//! - **Grammar**: server-issued, one-time descriptor: id, intent, opaque
//!   `state`/`entropy`, and the ordered `required_keys`
//! - **Binding**: deterministic construction of the payload from a grammar
//!   and caller data; the grammar decides the keys, the caller the values
//! - **Single use**: the grammar slot is cleared on every exit from `send`
//!
//! ## Example
//!
//! ```rust,ignore
//! use aacl::{ClientConfig, Session};
//! use serde_json::json;
//!
//! let config = ClientConfig::new("https://vault.example.com")
//!     .with_session_cookie("session=...");
//! let mut session = Session::from_config(&config)?;
//!
//! let result = session
//!     .send_serializable("transfer", &json!({"amount": 50, "to": "bob"}))
//!     .await?;
//! ```

pub mod binder;
pub mod config;
pub mod error;
pub mod grammar;
pub mod session;
pub mod store;
pub mod transport;

// Re-exports for convenience
pub use binder::{bind, bind_serializable, Payload};
pub use config::ClientConfig;
pub use error::{Error, ErrorCode, Result};
pub use grammar::{Grammar, GrammarId};
pub use session::Session;
pub use store::GrammarStore;
pub use transport::{ExecuteRequest, GrammarTransport, HttpTransport};

/// Payload fields copied from the grammar itself, in construction order.
///
/// Every payload carries these three keys in addition to the grammar's
/// `required_keys`, which must never repeat them.
pub const COMMON_FIELDS: [&str; 3] = ["entropy", "intent", "state"];

/// Issuer endpoint path, relative to the server base URL. The intent is
/// appended as one more path segment.
pub const ISSUE_PATH: &str = "aacl/issue";

/// Execution endpoint path, relative to the server base URL.
pub const EXECUTE_PATH: &str = "aacl/execute";
