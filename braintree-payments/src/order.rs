//! Order model owned by the host commerce system
//!
//! Only the subset of fields the gateway reads or writes is modelled here.

use crate::error::{PaymentError, PaymentResult};
use crate::money::{Currency, Money};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Order status as stored by the host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Pending,
    OnHold,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Refunded,
    /// Host-specific status
    Custom(String),
}

impl OrderStatus {
    /// Parse from the host's status slug
    pub fn parse(status: &str) -> Self {
        match status.trim().to_lowercase().as_str() {
            "pending" => Self::Pending,
            "on-hold" | "on_hold" => Self::OnHold,
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "cancelled" | "canceled" => Self::Cancelled,
            "refunded" => Self::Refunded,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Status slug
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::OnHold => "on-hold",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::Custom(status) => status,
        }
    }

    /// Whether payment has been received
    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Processing | Self::Completed)
    }
}

impl From<String> for OrderStatus {
    fn from(status: String) -> Self {
        Self::parse(&status)
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Postal address with optional contact fields (billing carries phone/email)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub address_1: String,
    #[serde(default)]
    pub address_2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postcode: String,
    /// ISO alpha-2 country code
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

impl Address {
    /// "First Last", trimmed
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// One order line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: u32,
    /// Line total before discounts and tax
    pub subtotal: Decimal,
    /// Line total after discounts, before tax
    pub total: Decimal,
    /// Tax charged on the line
    pub tax: Decimal,
    #[serde(default)]
    pub sku: Option<String>,
}

impl LineItem {
    /// Create a line whose subtotal equals its total
    pub fn new(name: impl Into<String>, quantity: u32, total: Decimal) -> Self {
        Self {
            name: name.into(),
            quantity,
            subtotal: total,
            total,
            tax: Decimal::ZERO,
            sku: None,
        }
    }

    pub fn with_subtotal(mut self, subtotal: Decimal) -> Self {
        self.subtotal = subtotal;
        self
    }

    pub fn with_tax(mut self, tax: Decimal) -> Self {
        self.tax = tax;
        self
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }
}

/// Audit note attached to an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderNote {
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl OrderNote {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Order as seen by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Customer-facing order number sent as `orderId`
    pub number: String,
    pub currency: Currency,
    /// Amount to charge
    pub total: Decimal,
    pub tax_total: Decimal,
    pub shipping_total: Decimal,
    pub shipping_tax: Decimal,
    pub discount_total: Decimal,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub billing: Address,
    #[serde(default)]
    pub shipping: Address,
    /// Host customer account, absent for guest checkout
    #[serde(default)]
    pub customer_user_id: Option<String>,
    #[serde(default)]
    pub tax_exempt: bool,
    /// Gateway identifier the order was placed with
    pub payment_method: String,
    pub status: OrderStatus,
    #[serde(default)]
    transaction_id: Option<String>,
    #[serde(default)]
    pub notes: Vec<OrderNote>,
}

impl Order {
    /// Create a pending order
    pub fn new(id: impl Into<String>, currency: impl Into<Currency>, total: Decimal) -> Self {
        let id = id.into();
        Self {
            number: id.clone(),
            id,
            currency: currency.into(),
            total,
            tax_total: Decimal::ZERO,
            shipping_total: Decimal::ZERO,
            shipping_tax: Decimal::ZERO,
            discount_total: Decimal::ZERO,
            line_items: Vec::new(),
            billing: Address::default(),
            shipping: Address::default(),
            customer_user_id: None,
            tax_exempt: false,
            payment_method: String::new(),
            status: OrderStatus::Pending,
            transaction_id: None,
            notes: Vec::new(),
        }
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = number.into();
        self
    }

    pub fn with_line_item(mut self, item: LineItem) -> Self {
        self.line_items.push(item);
        self
    }

    pub fn with_billing(mut self, billing: Address) -> Self {
        self.billing = billing;
        self
    }

    pub fn with_shipping(mut self, shipping: Address) -> Self {
        self.shipping = shipping;
        self
    }

    pub fn with_totals(
        mut self,
        tax_total: Decimal,
        shipping_total: Decimal,
        shipping_tax: Decimal,
        discount_total: Decimal,
    ) -> Self {
        self.tax_total = tax_total;
        self.shipping_total = shipping_total;
        self.shipping_tax = shipping_tax;
        self.discount_total = discount_total;
        self
    }

    pub fn with_customer_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.customer_user_id = Some(user_id.into());
        self
    }

    pub fn with_payment_method(mut self, gateway: impl Into<String>) -> Self {
        self.payment_method = gateway.into();
        self
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    /// Order total with currency
    pub fn total_money(&self) -> Money {
        Money::new(self.total, self.currency.clone())
    }

    /// Processor transaction ID, if a charge succeeded
    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    /// Record the processor transaction ID.
    ///
    /// Re-recording the same ID is a no-op; a different ID is rejected.
    pub fn set_transaction_id(&mut self, transaction_id: impl Into<String>) -> PaymentResult<()> {
        let transaction_id = transaction_id.into();
        match &self.transaction_id {
            Some(existing) if *existing != transaction_id => {
                Err(PaymentError::TransactionIdConflict {
                    order_id: self.id.clone(),
                    existing: existing.clone(),
                })
            }
            _ => {
                self.transaction_id = Some(transaction_id);
                Ok(())
            }
        }
    }

    /// Replace the transaction ID as part of a void or refund flow
    pub fn replace_transaction_id(&mut self, transaction_id: Option<String>) {
        self.transaction_id = transaction_id;
    }

    /// Append an audit note
    pub fn add_note(&mut self, content: impl Into<String>) {
        self.notes.push(OrderNote::new(content));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for slug in [
            "pending",
            "on-hold",
            "processing",
            "completed",
            "failed",
            "cancelled",
            "refunded",
        ] {
            assert_eq!(OrderStatus::parse(slug).as_str(), slug);
        }
        assert_eq!(
            OrderStatus::parse("awaiting-shipment"),
            OrderStatus::Custom("awaiting-shipment".into())
        );
    }

    #[test]
    fn test_transaction_id_is_not_overwritten() {
        let mut order = Order::new("42", "USD", Decimal::new(4500, 2));
        order.set_transaction_id("txn_1").unwrap();
        order.set_transaction_id("txn_1").unwrap();

        let err = order.set_transaction_id("txn_2").unwrap_err();
        assert!(matches!(err, PaymentError::TransactionIdConflict { .. }));
        assert_eq!(order.transaction_id(), Some("txn_1"));

        order.replace_transaction_id(Some("txn_2".into()));
        assert_eq!(order.transaction_id(), Some("txn_2"));
    }

    #[test]
    fn test_full_name() {
        let address = Address {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            ..Default::default()
        };
        assert_eq!(address.full_name(), "Ada Lovelace");
        assert_eq!(Address::default().full_name(), "");
    }

    #[test]
    fn test_total_money() {
        let order = Order::new("1", "eur", Decimal::new(1999, 2));
        assert_eq!(order.total_money().to_string(), "EUR 19.99");
        assert_eq!(order.number, "1");
    }
}
