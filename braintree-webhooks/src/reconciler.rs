//! Settlement reconciliation
//!
//! Applies settled and settlement-declined notifications to host orders.
//! Every transition re-reads the order and checks its status first, so
//! redelivered notifications are no-ops. Skips are outcomes, not errors:
//! the processor is acknowledged either way.

use crate::config::ReconcilerConfig;
use crate::notification::{NotificationTransaction, WebhookKind, WebhookNotification};
use crate::Result;
use async_trait::async_trait;
use braintree_payments::{Order, OrderStatus, OrderStore};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

const DECLINED_CLOSING: &str = "Please contact the customer to resolve the payment issue.";

/// Host extension points around settlement transitions.
///
/// The `should_*` checks run before any mutation and can veto it.
#[async_trait]
pub trait SettlementHooks: Send + Sync {
    /// Whether a settled transaction should mark the order paid
    async fn should_complete_settled(
        &self,
        _order: &Order,
        _transaction_id: &str,
        _notification: &WebhookNotification,
    ) -> bool {
        true
    }

    /// Whether a declined settlement should fail the order
    async fn should_fail_declined(
        &self,
        _order: &Order,
        _transaction_id: &str,
        _notification: &WebhookNotification,
    ) -> bool {
        true
    }

    /// Rewrite the note attached to a settled order
    fn settled_note(&self, note: String, _order: &Order, _notification: &WebhookNotification) -> String {
        note
    }

    /// Rewrite the note attached to a failed order
    fn declined_note(&self, note: String, _order: &Order, _notification: &WebhookNotification) -> String {
        note
    }

    /// Called after an order was marked paid
    async fn after_settled(&self, _order: &Order, _transaction_id: &str, _notification: &WebhookNotification) {}

    /// Called after an order was failed
    async fn after_declined(&self, _order: &Order, _transaction_id: &str, _notification: &WebhookNotification) {}
}

/// Hooks that never veto
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl SettlementHooks for DefaultHooks {}

/// What a notification did to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Kind without reconciliation logic
    NotApplicable(WebhookKind),
    /// Notification carried no transaction or transaction ID
    MissingTransaction,
    /// No order uses the transaction
    OrderNotFound { transaction_id: String },
    /// Settled order was already paid or closed
    AlreadyPaid { order_id: String, status: OrderStatus },
    /// Declined order was already in a final status
    AlreadyFinal { order_id: String, status: OrderStatus },
    /// Settled amount or currency differs from the order's
    AmountMismatch { order_id: String },
    /// A hook vetoed the transition
    Vetoed { order_id: String },
    /// Order marked paid
    Settled { order_id: String, transaction_id: String },
    /// Order failed
    Declined { order_id: String, transaction_id: String },
}

impl Reconciliation {
    /// Whether the order was mutated beyond an audit note
    pub fn changed_status(&self) -> bool {
        matches!(self, Self::Settled { .. } | Self::Declined { .. })
    }
}

/// Settlement reconciler
pub struct Reconciler {
    orders: Arc<dyn OrderStore>,
    config: ReconcilerConfig,
    hooks: Arc<dyn SettlementHooks>,
    // check-then-mutate sequences run one at a time
    transitions: Mutex<()>,
}

impl Reconciler {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self {
            orders,
            config: ReconcilerConfig::default(),
            hooks: Arc::new(DefaultHooks),
            transitions: Mutex::new(()),
        }
    }

    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn SettlementHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Apply a verified notification
    pub async fn process(&self, notification: &WebhookNotification) -> Result<Reconciliation> {
        debug!(kind = %notification.kind, "Webhook received");

        match &notification.kind {
            WebhookKind::Check => Ok(Reconciliation::NotApplicable(WebhookKind::Check)),
            WebhookKind::TransactionSettled => {
                let _guard = self.transitions.lock().await;
                self.settled(notification).await
            }
            WebhookKind::TransactionSettlementDeclined => {
                let _guard = self.transitions.lock().await;
                self.declined(notification).await
            }
            WebhookKind::Other(kind) => {
                error!(kind = %kind, "Unknown webhook type");
                Ok(Reconciliation::NotApplicable(notification.kind.clone()))
            }
        }
    }

    async fn settled(&self, notification: &WebhookNotification) -> Result<Reconciliation> {
        let Some((transaction, transaction_id)) = Self::transaction(notification) else {
            return Ok(Reconciliation::MissingTransaction);
        };

        let Some(order) = self.orders.find_by_transaction_id(transaction_id).await? else {
            warn!(transaction_id, "No order found for settled transaction");
            return Ok(Reconciliation::OrderNotFound {
                transaction_id: transaction_id.to_string(),
            });
        };

        if self.config.skips_settlement(&order.status) {
            warn!(order_id = %order.id, transaction_id, status = %order.status, "Order already paid, skipping settlement update");
            return Ok(Reconciliation::AlreadyPaid {
                order_id: order.id,
                status: order.status,
            });
        }

        let amount_matches = transaction
            .currency
            .as_deref()
            .is_some_and(|currency| currency.eq_ignore_ascii_case(order.currency.code()))
            && transaction.amount_value() == Some(order.total);

        if !amount_matches {
            error!(
                order_id = %order.id,
                transaction_id,
                currency = transaction.currency.as_deref().unwrap_or_default(),
                amount = transaction.amount.as_deref().unwrap_or_default(),
                order_currency = %order.currency,
                order_amount = %order.total,
                "Amount mismatch for settled transaction"
            );
            let mut note = format!("Amount mismatch for settled transaction - Order #{}", order.id);
            if let Some(amount) = amount_line(transaction) {
                note.push_str(&format!("\nSettled Amount: {}", amount));
            }
            self.orders.add_note(&order.id, &note).await?;
            return Ok(Reconciliation::AmountMismatch { order_id: order.id });
        }

        if !self
            .hooks
            .should_complete_settled(&order, transaction_id, notification)
            .await
        {
            info!(order_id = %order.id, transaction_id, "Settlement processing blocked by hook");
            return Ok(Reconciliation::Vetoed { order_id: order.id });
        }

        let mut note = format!("Transaction settled (Transaction ID: {})", transaction_id);
        if let Some(amount) = amount_line(transaction) {
            note.push_str(&format!("\nAmount: {}", amount));
        }
        let note = self.hooks.settled_note(note, &order, notification);

        self.orders.payment_complete(&order.id, transaction_id).await?;
        self.orders.add_note(&order.id, &note).await?;

        info!(
            order_id = %order.id,
            transaction_id,
            amount = transaction.amount.as_deref().unwrap_or_default(),
            currency = transaction.currency.as_deref().unwrap_or_default(),
            "Transaction settled"
        );

        self.hooks.after_settled(&order, transaction_id, notification).await;
        Ok(Reconciliation::Settled {
            order_id: order.id,
            transaction_id: transaction_id.to_string(),
        })
    }

    async fn declined(&self, notification: &WebhookNotification) -> Result<Reconciliation> {
        let Some((transaction, transaction_id)) = Self::transaction(notification) else {
            return Ok(Reconciliation::MissingTransaction);
        };

        let Some(order) = self.orders.find_by_transaction_id(transaction_id).await? else {
            warn!(transaction_id, "No order found for declined settlement");
            return Ok(Reconciliation::OrderNotFound {
                transaction_id: transaction_id.to_string(),
            });
        };

        if self.config.skips_decline(&order.status) {
            warn!(order_id = %order.id, transaction_id, status = %order.status, "Order already in final status, skipping decline update");
            return Ok(Reconciliation::AlreadyFinal {
                order_id: order.id,
                status: order.status,
            });
        }

        if !self
            .hooks
            .should_fail_declined(&order, transaction_id, notification)
            .await
        {
            info!(order_id = %order.id, transaction_id, "Settlement decline processing blocked by hook");
            return Ok(Reconciliation::Vetoed { order_id: order.id });
        }

        let note = self
            .hooks
            .declined_note(declined_note(transaction, transaction_id), &order, notification);
        self.orders
            .update_status(&order.id, OrderStatus::Failed, Some(&note))
            .await?;

        warn!(
            order_id = %order.id,
            transaction_id,
            status = transaction.status.as_deref().unwrap_or("unknown"),
            "Transaction settlement declined"
        );

        self.hooks.after_declined(&order, transaction_id, notification).await;
        Ok(Reconciliation::Declined {
            order_id: order.id,
            transaction_id: transaction_id.to_string(),
        })
    }

    fn transaction(notification: &WebhookNotification) -> Option<(&NotificationTransaction, &str)> {
        let Some(transaction) = notification.transaction.as_ref() else {
            error!(kind = %notification.kind, "Webhook missing transaction data");
            return None;
        };
        let Some(transaction_id) = transaction.id.as_deref() else {
            error!(kind = %notification.kind, "Webhook missing transaction ID");
            return None;
        };
        Some((transaction, transaction_id))
    }
}

/// `{currency} {amount}` when both are present
fn amount_line(transaction: &NotificationTransaction) -> Option<String> {
    match (&transaction.currency, &transaction.amount) {
        (Some(currency), Some(amount)) => Some(format!("{} {}", currency, amount)),
        _ => None,
    }
}

fn declined_note(transaction: &NotificationTransaction, transaction_id: &str) -> String {
    let mut lines = vec![format!(
        "Transaction settlement declined (Transaction ID: {})",
        transaction_id
    )];

    let reasons = [
        ("Status", &transaction.status),
        ("Processor response code", &transaction.processor_settlement_response_code),
        ("Processor response", &transaction.processor_settlement_response_text),
        ("Gateway rejection reason", &transaction.gateway_rejection_reason),
    ];
    lines.extend(
        reasons
            .iter()
            .filter_map(|(label, value)| value.as_ref().map(|v| format!("{}: {}", label, v))),
    );

    if let Some(account) = &transaction.bank_account {
        lines.push(format!(
            "Bank account: {} ending in {}",
            account.account_type.as_deref().unwrap_or("Account"),
            account.last_four.as_deref().unwrap_or("****")
        ));
    }

    lines.push(DECLINED_CLOSING.to_string());
    lines.join("\n")
}
