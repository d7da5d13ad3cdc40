//! Host storage
//!
//! The gateway reads and mutates orders and saved payment tokens through
//! these traits. Hosts implement them over their own persistence; the
//! in-memory stores are suitable for tests and single-process use.
//!
//! Order status updates must be at least last-write-wins: concurrent webhook
//! deliveries may both pass a status check before either writes.

mod memory;

pub use memory::{MemoryOrderStore, MemoryTokenStore};

use crate::error::PaymentResult;
use crate::order::{Order, OrderStatus};
use crate::token::PaymentToken;
use async_trait::async_trait;

/// Trait for host order storage
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Load an order by ID
    async fn get(&self, order_id: &str) -> PaymentResult<Option<Order>>;

    /// Find the order paid with a processor transaction ID
    async fn find_by_transaction_id(&self, transaction_id: &str) -> PaymentResult<Option<Order>>;

    /// Record the processor transaction ID on an order
    async fn set_transaction_id(&self, order_id: &str, transaction_id: &str) -> PaymentResult<()>;

    /// Replace or clear the transaction ID during a void or refund
    async fn replace_transaction_id(
        &self,
        order_id: &str,
        transaction_id: Option<&str>,
    ) -> PaymentResult<()>;

    /// Mark an order paid. Calling this for an already-paid order is a no-op.
    async fn payment_complete(&self, order_id: &str, transaction_id: &str) -> PaymentResult<()>;

    /// Transition an order, optionally attaching a note
    async fn update_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        note: Option<&str>,
    ) -> PaymentResult<()>;

    /// Append an audit note
    async fn add_note(&self, order_id: &str, note: &str) -> PaymentResult<()>;

    /// Get store type name for debugging
    fn store_type(&self) -> &'static str;
}

/// Trait for saved payment token storage, keyed by customer
#[async_trait]
pub trait PaymentTokenStore: Send + Sync {
    /// Save a token; saving a known token ID refreshes its details
    async fn save(&self, customer_id: &str, token: PaymentToken) -> PaymentResult<()>;

    async fn get(&self, customer_id: &str, token_id: &str) -> PaymentResult<Option<PaymentToken>>;

    /// All tokens of a customer, oldest first
    async fn list(&self, customer_id: &str) -> PaymentResult<Vec<PaymentToken>>;

    /// Replace an existing token
    async fn update(&self, customer_id: &str, token: PaymentToken) -> PaymentResult<()>;

    /// Delete a token, returning whether it existed
    async fn delete(&self, customer_id: &str, token_id: &str) -> PaymentResult<bool>;
}
