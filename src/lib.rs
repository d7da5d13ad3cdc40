// Braintree Gateway - payment gateway core for Braintree
//
// This library bundles the transaction, merchant account and payment token
// crates with the settlement webhook receiver, plus logging setup.

pub mod logging;

// Re-export member crates
pub use braintree_payments as payments;

#[cfg(feature = "webhooks")]
pub use braintree_webhooks as webhooks;

// Prelude for common imports
pub mod prelude {
    pub use braintree_payments::{
        BraintreeClient, BraintreeGateway, Credentials, Currency, Environment, GatewayKind,
        GatewaySettings, MemoryOrderStore, MemoryTokenStore, MerchantAccountCache, Order,
        OrderStatus, OrderStore, PaymentError, PaymentResult, PaymentToken, PaymentTokenStore,
        ProcessorApi, TransactionRequest, TransactionResponse,
    };

    #[cfg(feature = "webhooks")]
    pub use braintree_webhooks::{
        Reconciler, Reconciliation, SettlementHooks, WebhookError, WebhookKind,
        WebhookNotification, WebhookOutcome, WebhookReceiver, WebhookRequest, WebhookSignature,
    };
}
