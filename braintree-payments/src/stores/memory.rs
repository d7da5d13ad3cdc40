//! In-memory stores
//!
//! Uses DashMap for thread-safe concurrent access.

use crate::error::{PaymentError, PaymentResult};
use crate::order::{Order, OrderStatus};
use crate::stores::{OrderStore, PaymentTokenStore};
use crate::token::PaymentToken;
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, trace};

/// In-memory order store
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: DashMap<String, Order>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an order
    pub fn insert(&self, order: Order) {
        self.orders.insert(order.id.clone(), order);
    }

    /// Get the number of stored orders
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    fn with_order<T>(
        &self,
        order_id: &str,
        f: impl FnOnce(&mut Order) -> PaymentResult<T>,
    ) -> PaymentResult<T> {
        let mut order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| PaymentError::OrderNotFound(order_id.to_string()))?;
        f(&mut order)
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn get(&self, order_id: &str) -> PaymentResult<Option<Order>> {
        Ok(self.orders.get(order_id).map(|order| order.clone()))
    }

    async fn find_by_transaction_id(&self, transaction_id: &str) -> PaymentResult<Option<Order>> {
        Ok(self
            .orders
            .iter()
            .find(|entry| entry.transaction_id() == Some(transaction_id))
            .map(|entry| entry.value().clone()))
    }

    async fn set_transaction_id(&self, order_id: &str, transaction_id: &str) -> PaymentResult<()> {
        self.with_order(order_id, |order| order.set_transaction_id(transaction_id))
    }

    async fn replace_transaction_id(
        &self,
        order_id: &str,
        transaction_id: Option<&str>,
    ) -> PaymentResult<()> {
        self.with_order(order_id, |order| {
            order.replace_transaction_id(transaction_id.map(str::to_string));
            Ok(())
        })
    }

    async fn payment_complete(&self, order_id: &str, transaction_id: &str) -> PaymentResult<()> {
        self.with_order(order_id, |order| {
            if order.status.is_paid() {
                trace!(order_id = %order.id, "Order already paid");
                return Ok(());
            }
            order.set_transaction_id(transaction_id)?;
            order.status = OrderStatus::Processing;
            debug!(order_id = %order.id, transaction_id, "Order marked paid");
            Ok(())
        })
    }

    async fn update_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        note: Option<&str>,
    ) -> PaymentResult<()> {
        self.with_order(order_id, |order| {
            debug!(order_id = %order.id, from = %order.status, to = %status, "Order status updated");
            order.status = status;
            if let Some(note) = note {
                order.add_note(note);
            }
            Ok(())
        })
    }

    async fn add_note(&self, order_id: &str, note: &str) -> PaymentResult<()> {
        self.with_order(order_id, |order| {
            order.add_note(note);
            Ok(())
        })
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}

/// In-memory payment token store
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: DashMap<String, Vec<PaymentToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentTokenStore for MemoryTokenStore {
    async fn save(&self, customer_id: &str, token: PaymentToken) -> PaymentResult<()> {
        let mut tokens = self.tokens.entry(customer_id.to_string()).or_default();
        if let Some(existing) = tokens.iter_mut().find(|t| t.id() == token.id()) {
            trace!(customer_id, token_id = token.id(), "Refreshing saved payment token");
            existing.retokenize(token.details().clone());
            return Ok(());
        }
        trace!(customer_id, token_id = token.id(), "Saving payment token");
        tokens.push(token);
        Ok(())
    }

    async fn get(&self, customer_id: &str, token_id: &str) -> PaymentResult<Option<PaymentToken>> {
        Ok(self
            .tokens
            .get(customer_id)
            .and_then(|tokens| tokens.iter().find(|t| t.id() == token_id).cloned()))
    }

    async fn list(&self, customer_id: &str) -> PaymentResult<Vec<PaymentToken>> {
        Ok(self
            .tokens
            .get(customer_id)
            .map(|tokens| tokens.clone())
            .unwrap_or_default())
    }

    async fn update(&self, customer_id: &str, token: PaymentToken) -> PaymentResult<()> {
        let mut tokens = self
            .tokens
            .get_mut(customer_id)
            .ok_or_else(|| PaymentError::Store(format!("no tokens for customer {}", customer_id)))?;
        let existing = tokens
            .iter_mut()
            .find(|t| t.id() == token.id())
            .ok_or_else(|| PaymentError::Store(format!("token {} not found", token.id())))?;
        *existing = token;
        Ok(())
    }

    async fn delete(&self, customer_id: &str, token_id: &str) -> PaymentResult<bool> {
        let Some(mut tokens) = self.tokens.get_mut(customer_id) else {
            return Ok(false);
        };
        let before = tokens.len();
        tokens.retain(|t| t.id() != token_id);
        Ok(tokens.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenDetails;
    use rust_decimal::Decimal;

    fn venmo(id: &str) -> PaymentToken {
        PaymentToken::new(
            id,
            TokenDetails::Venmo {
                username: Some("venmojoe".into()),
                venmo_user_id: None,
            },
        )
    }

    #[tokio::test]
    async fn test_payment_complete_is_idempotent() {
        let store = MemoryOrderStore::new();
        store.insert(Order::new("1", "USD", Decimal::new(1000, 2)));

        store.payment_complete("1", "txn_1").await.unwrap();
        store.payment_complete("1", "txn_1").await.unwrap();

        let order = store.get("1").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.transaction_id(), Some("txn_1"));
        assert_eq!(order.notes.len(), 0);
    }

    #[tokio::test]
    async fn test_find_by_transaction_id() {
        let store = MemoryOrderStore::new();
        store.insert(Order::new("1", "USD", Decimal::ONE));
        store.insert(Order::new("2", "USD", Decimal::ONE));
        store.set_transaction_id("2", "txn_2").await.unwrap();

        let found = store.find_by_transaction_id("txn_2").await.unwrap().unwrap();
        assert_eq!(found.id, "2");
        assert!(store.find_by_transaction_id("txn_9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transaction_id_conflict() {
        let store = MemoryOrderStore::new();
        store.insert(Order::new("1", "USD", Decimal::ONE));
        store.set_transaction_id("1", "txn_1").await.unwrap();

        let err = store.set_transaction_id("1", "txn_2").await.unwrap_err();
        assert!(matches!(err, PaymentError::TransactionIdConflict { .. }));

        store.replace_transaction_id("1", Some("txn_2")).await.unwrap();
        let order = store.get("1").await.unwrap().unwrap();
        assert_eq!(order.transaction_id(), Some("txn_2"));
    }

    #[tokio::test]
    async fn test_update_status_with_note() {
        let store = MemoryOrderStore::new();
        store.insert(Order::new("1", "USD", Decimal::ONE));
        store
            .update_status("1", OrderStatus::Failed, Some("declined"))
            .await
            .unwrap();

        let order = store.get("1").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Failed);
        assert_eq!(order.notes[0].content, "declined");

        assert!(matches!(
            store.add_note("missing", "x").await,
            Err(PaymentError::OrderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_token_store_crud() {
        let store = MemoryTokenStore::new();
        store.save("cust", venmo("tok_1")).await.unwrap();
        store.save("cust", venmo("tok_2")).await.unwrap();
        // saving a known token again refreshes it in place
        store.save("cust", venmo("tok_1")).await.unwrap();

        assert_eq!(store.list("cust").await.unwrap().len(), 2);
        assert!(store.get("cust", "tok_2").await.unwrap().is_some());
        assert!(store.list("other").await.unwrap().is_empty());

        let replacement = PaymentToken::added_by_customer("tok_1", venmo("tok_1").details().clone(), true);
        store.update("cust", replacement).await.unwrap();
        assert!(store.get("cust", "tok_1").await.unwrap().unwrap().is_default());

        // a side-effect token never clears the default flag
        store.save("cust", venmo("tok_1")).await.unwrap();
        assert!(store.get("cust", "tok_1").await.unwrap().unwrap().is_default());
        assert_eq!(store.list("cust").await.unwrap().len(), 2);

        assert!(store.delete("cust", "tok_1").await.unwrap());
        assert!(!store.delete("cust", "tok_1").await.unwrap());
        assert!(store.update("cust", venmo("tok_1")).await.is_err());
    }

    #[test]
    fn test_store_type_and_len() {
        let store = MemoryOrderStore::new();
        assert!(store.is_empty());
        assert_eq!(store.store_type(), "memory");

        store.insert(Order::new("1", "USD", Decimal::ONE));
        assert_eq!(store.len(), 1);

        let order = tokio_test::block_on(store.get("1")).unwrap();
        assert_eq!(order.map(|o| o.status), Some(OrderStatus::Pending));
    }
}
