//! Braintree webhook handling
//!
//! Verifies signed settlement notifications and reconciles them against
//! host orders.
//!
//! ```text
//! POST ?api=braintree  bt_signature, bt_payload
//!        │
//!        ▼
//! ┌──────────────────┐  400: missing or bad signature
//! │ WebhookReceiver  │  500: undecodable payload
//! └──────────────────┘
//!        │ WebhookNotification
//!        ▼
//! ┌──────────────────┐  transaction_settled            → paid + note
//! │ Reconciler       │  transaction_settlement_declined → failed + note
//! └──────────────────┘  check / other kinds             → acknowledged
//!        │
//!        ▼
//!   OrderStore (host)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use braintree_payments::MemoryOrderStore;
//! use braintree_webhooks::{Reconciler, WebhookReceiver, WebhookRequest, WebhookSignature};
//! use std::sync::Arc;
//!
//! # async fn run(query: &str, body: &[u8]) {
//! let receiver = WebhookReceiver::new(
//!     WebhookSignature::new("public_key", "private_key"),
//!     Reconciler::new(Arc::new(MemoryOrderStore::new())),
//! );
//!
//! let outcome = receiver.handle(&WebhookRequest::from_raw("POST", query, body)).await;
//! if let Some(status) = outcome.status_code() {
//!     println!("respond with {}", status);
//! }
//! # }
//! ```

mod config;
mod error;
mod notification;
mod receiver;
mod reconciler;
mod signature;
pub mod testing;

pub use config::{ReconcilerConfig, WebhookConfig, WebhookConfigBuilder};
pub use error::WebhookError;
pub use notification::{BankAccountExcerpt, NotificationTransaction, WebhookKind, WebhookNotification};
pub use receiver::{WebhookOutcome, WebhookReceiver, WebhookRequest};
pub use reconciler::{DefaultHooks, Reconciler, Reconciliation, SettlementHooks};
pub use signature::WebhookSignature;

/// Result type for webhook operations
pub type Result<T> = std::result::Result<T, WebhookError>;
