//! clawdash-client: async client for a messaging gateway.
//!
//! Connects over WebSocket, authenticates with a token, and keeps an
//! observable [`SessionStore`] of the conversation, channel status and
//! counters up to date.
//!
//! # Quick Start
//!
//! ```no_run
//! use clawdash_client::{GatewaySession, SessionConfig, SessionStore};
//!
//! # async fn example() -> clawdash_core::DashResult<()> {
//! let store = SessionStore::new();
//! let config = SessionConfig::new("ws://localhost:18789", "secret-token")
//!     .with_peer("+15550001111");
//! let session = GatewaySession::new(config, store.clone());
//!
//! session.connect().await?;
//! session.send("hello")?;
//!
//! let mut updates = store.subscribe();
//! while updates.changed().await.is_ok() {
//!     let snapshot = updates.borrow_and_update().clone();
//!     println!("{} messages", snapshot.messages.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod pending;
pub mod store;
pub mod transport;

// Re-export primary public types.
pub use client::GatewaySession;
pub use config::{mask_token, SessionConfig, DEFAULT_GATEWAY_URL};
pub use pending::{CallIds, PendingCalls};
pub use store::{
    AuthState, ConnectionState, Counters, DeliveryStatus, SessionStore, Snapshot, StoreEvent,
};
pub use transport::validate_url;

// Re-export clawdash-core error types for convenience.
pub use clawdash_core::{DashError, DashResult};
