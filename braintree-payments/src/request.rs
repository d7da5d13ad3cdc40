//! Transaction request building
//!
//! Builds processor requests from an [`Order`] and gateway settings. Building
//! never performs I/O and never mutates the order.

use crate::address::{self, CustomerDetails, ProcessorAddress, ProcessorLineItem};
use crate::config::{GatewayKind, GatewaySettings, TransactionType};
use crate::descriptor::DynamicDescriptor;
use crate::error::{PaymentError, PaymentResult};
use crate::money::format_amount;
use crate::order::Order;
use rust_decimal::Decimal;
use serde::Serialize;

/// Subscription context for renewals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionInfo {
    pub is_renewal: bool,
}

/// Checkout-time payment inputs
#[derive(Debug, Clone, Default)]
pub struct PaymentDetails {
    /// Saved payment method token
    pub token: Option<String>,
    /// One-time credential from the client SDK
    pub nonce: Option<String>,
    /// The nonce came from a 3-D Secure verification and replaces the token
    pub use_3ds_nonce: bool,
    /// Save the payment method on success
    pub tokenize: bool,
    pub is_3ds_required: bool,
    pub device_data: Option<String>,
    /// Billing address saved with the token
    pub billing_address_id: Option<String>,
    /// Processor customer ID
    pub customer_id: Option<String>,
    pub merchant_account_id: Option<String>,
    pub subscription: Option<SubscriptionInfo>,
}

impl PaymentDetails {
    /// Pay with a one-time nonce
    pub fn with_nonce(nonce: impl Into<String>) -> Self {
        Self {
            nonce: Some(nonce.into()),
            ..Self::default()
        }
    }

    /// Pay with a saved token
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn tokenize(mut self, tokenize: bool) -> Self {
        self.tokenize = tokenize;
        self
    }

    pub fn with_3ds_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self.use_3ds_nonce = true;
        self
    }

    pub fn require_3ds(mut self, required: bool) -> Self {
        self.is_3ds_required = required;
        self
    }

    pub fn with_device_data(mut self, device_data: impl Into<String>) -> Self {
        self.device_data = Some(device_data.into());
        self
    }

    pub fn with_billing_address_id(mut self, id: impl Into<String>) -> Self {
        self.billing_address_id = Some(id.into());
        self
    }

    pub fn with_customer_id(mut self, id: impl Into<String>) -> Self {
        self.customer_id = Some(id.into());
        self
    }

    pub fn with_merchant_account_id(mut self, id: impl Into<String>) -> Self {
        self.merchant_account_id = Some(id.into());
        self
    }

    pub fn with_subscription(mut self, is_renewal: bool) -> Self {
        self.subscription = Some(SubscriptionInfo { is_renewal });
        self
    }

    /// Saved token to charge, unless a 3DS nonce supersedes it
    fn usable_token(&self) -> Option<&str> {
        if self.use_3ds_nonce {
            return None;
        }
        non_empty(&self.token)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreeDSecureOptions {
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleOptions {
    pub submit_for_settlement: bool,
    pub store_in_vault_on_success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_billing_address_to_payment_method: Option<bool>,
    #[serde(rename = "threeDSecure", skip_serializing_if = "Option::is_none")]
    pub three_d_secure: Option<ThreeDSecureOptions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditCardOptions {
    pub cardholder_name: String,
}

/// Sale request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    pub amount: String,
    pub order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_account_id: Option<String>,
    pub shipping: ProcessorAddress,
    pub options: SaleOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_data: Option<String>,
    pub tax_exempt: bool,
    pub tax_amount: String,
    pub shipping_amount: String,
    pub shipping_tax_amount: String,
    pub discount_amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ships_from_postal_code: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<ProcessorLineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing: Option<ProcessorAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_nonce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_card: Option<CreditCardOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_source: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<DynamicDescriptor>,
}

impl SaleRequest {
    /// Build a sale for `order`.
    ///
    /// `capture` selects sale-and-capture over authorize-only.
    pub fn build(
        settings: &GatewaySettings,
        order: &Order,
        payment: &PaymentDetails,
        capture: bool,
    ) -> PaymentResult<Self> {
        let (payment_method_token, payment_method_nonce) = match payment.usable_token() {
            Some(token) => (Some(token.to_string()), None),
            None => {
                let nonce = non_empty(&payment.nonce).ok_or(PaymentError::MissingPaymentCredential)?;
                (None, Some(nonce.to_string()))
            }
        };

        // 3DS nonces reject extra card fields
        let credit_card = (payment_method_nonce.is_some()
            && settings.gateway == GatewayKind::CreditCard
            && !payment.use_3ds_nonce)
            .then(|| CreditCardOptions {
                cardholder_name: order.billing.full_name(),
            });

        let amount = settings.effective_test_amount().unwrap_or(order.total);

        let (customer_id, customer) = match non_empty(&payment.customer_id) {
            Some(id) => (Some(id.to_string()), None),
            None => (None, Some(CustomerDetails::from_billing(&order.billing))),
        };

        let (billing_address_id, billing) = match non_empty(&payment.billing_address_id) {
            Some(id) => (Some(id.to_string()), None),
            None => (None, Some(ProcessorAddress::billing(&order.billing))),
        };

        let descriptor = Some(DynamicDescriptor::from_settings(&settings.descriptor))
            .filter(|d| !d.is_empty());

        Ok(Self {
            amount: format_amount(amount),
            order_id: order.number.clone(),
            merchant_account_id: non_empty(&payment.merchant_account_id).map(str::to_string),
            shipping: ProcessorAddress::shipping(&order.shipping),
            options: SaleOptions {
                submit_for_settlement: capture,
                store_in_vault_on_success: payment.tokenize,
                add_billing_address_to_payment_method: payment.tokenize.then_some(true),
                three_d_secure: payment
                    .is_3ds_required
                    .then_some(ThreeDSecureOptions { required: true }),
            },
            channel: non_empty(&settings.channel).map(str::to_string),
            device_data: non_empty(&payment.device_data).map(str::to_string),
            tax_exempt: order.customer_user_id.is_some() && order.tax_exempt,
            tax_amount: format_amount(order.tax_total),
            shipping_amount: format_amount(order.shipping_total),
            shipping_tax_amount: format_amount(order.shipping_tax),
            discount_amount: format_amount(order.discount_total),
            ships_from_postal_code: non_empty(&settings.ships_from_postal_code).map(str::to_string),
            line_items: address::line_items(order),
            customer_id,
            customer,
            billing_address_id,
            billing,
            payment_method_token,
            payment_method_nonce,
            credit_card,
            transaction_source: payment.subscription.map(|s| {
                if s.is_renewal { "recurring" } else { "recurring_first" }
            }),
            descriptor,
        })
    }
}

/// Processor operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionRequest {
    Sale(Box<SaleRequest>),
    SubmitForSettlement {
        transaction_id: String,
        amount: Option<Decimal>,
    },
    Refund {
        transaction_id: String,
        amount: Option<Decimal>,
    },
    Void {
        transaction_id: String,
    },
    Find {
        transaction_id: String,
    },
}

impl TransactionRequest {
    /// Sale honoring the configured transaction type
    pub fn sale(settings: &GatewaySettings, order: &Order, payment: &PaymentDetails) -> PaymentResult<Self> {
        let capture = settings.transaction_type == TransactionType::Charge;
        Ok(Self::Sale(Box::new(SaleRequest::build(settings, order, payment, capture)?)))
    }

    /// Sale and capture
    pub fn charge(settings: &GatewaySettings, order: &Order, payment: &PaymentDetails) -> PaymentResult<Self> {
        Ok(Self::Sale(Box::new(SaleRequest::build(settings, order, payment, true)?)))
    }

    /// Authorize only
    pub fn authorization(
        settings: &GatewaySettings,
        order: &Order,
        payment: &PaymentDetails,
    ) -> PaymentResult<Self> {
        Ok(Self::Sale(Box::new(SaleRequest::build(settings, order, payment, false)?)))
    }

    pub fn capture(transaction_id: impl Into<String>, amount: Option<Decimal>) -> Self {
        Self::SubmitForSettlement {
            transaction_id: transaction_id.into(),
            amount,
        }
    }

    pub fn refund(transaction_id: impl Into<String>, amount: Option<Decimal>) -> Self {
        Self::Refund {
            transaction_id: transaction_id.into(),
            amount,
        }
    }

    pub fn void(transaction_id: impl Into<String>) -> Self {
        Self::Void {
            transaction_id: transaction_id.into(),
        }
    }

    pub fn find(transaction_id: impl Into<String>) -> Self {
        Self::Find {
            transaction_id: transaction_id.into(),
        }
    }

    /// Operation name for logging
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Sale(sale) if sale.options.submit_for_settlement => "charge",
            Self::Sale(_) => "authorize",
            Self::SubmitForSettlement { .. } => "capture",
            Self::Refund { .. } => "refund",
            Self::Void { .. } => "void",
            Self::Find { .. } => "find",
        }
    }
}

/// Amount body for capture and refund
#[derive(Debug, Clone, Serialize)]
pub(crate) struct AmountRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
}

impl AmountRequest {
    pub(crate) fn new(amount: Option<Decimal>) -> Self {
        Self {
            amount: amount.map(format_amount),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
