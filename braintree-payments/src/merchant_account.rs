//! Processor-side merchant accounts
//!
//! A read-only projection of the accounts configured at the processor.
//! Capability checks derive from the accepted payment method list, which the
//! processor reports as upper-case constants (`US_BANK_ACCOUNT`,
//! `APPLE_PAY_CARD`, ...). Comparisons are case-insensitive.

use crate::config::GatewayKind;
use serde::{Deserialize, Serialize};

const ACH_METHOD: &str = "us_bank_account";
const LOCAL_PAYMENTS_METHOD: &str = "local_payment";
const PAYPAL_METHOD: &str = "paypal_account";
const SEPA_METHOD: &str = "sepa_debit_account";
const VENMO_METHOD: &str = "venmo_account";
const APPLE_PAY_PREFIX: &str = "apple_pay_";
const GOOGLE_PAY_PREFIX: &str = "google_pay_";

/// Status reported for usable accounts
pub const STATUS_ACTIVE: &str = "active";

/// Merchant account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantAccount {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "currencyIsoCode")]
    pub currency: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub accepted_payment_methods: Vec<String>,
    /// Fastlane availability, `None` until checked or when the check failed
    #[serde(skip)]
    pub fastlane: Option<bool>,
}

impl MerchantAccount {
    pub fn new(id: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            currency: currency.into().to_ascii_uppercase(),
            status: STATUS_ACTIVE.to_string(),
            default: false,
            accepted_payment_methods: Vec::new(),
            fastlane: None,
        }
    }

    pub fn with_default(mut self, default: bool) -> Self {
        self.default = default;
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_payment_method(mut self, method: impl Into<String>) -> Self {
        self.accepted_payment_methods.push(method.into());
        self
    }

    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case(STATUS_ACTIVE)
    }

    pub fn is_default(&self) -> bool {
        self.default
    }

    /// Whether the account is in `currency`
    pub fn has_currency(&self, currency: &str) -> bool {
        self.currency.eq_ignore_ascii_case(currency.trim())
    }

    /// Whether transactions for `gateway` can run against this account
    pub fn supports_gateway(&self, gateway: GatewayKind) -> bool {
        match gateway {
            GatewayKind::CreditCard => true,
            GatewayKind::Ach => self.is_ach_enabled(),
            GatewayKind::LocalPayments => self.are_local_payments_enabled(),
            GatewayKind::PayPal => self.is_paypal_enabled(),
            GatewayKind::Sepa => self.is_sepa_enabled(),
            GatewayKind::Venmo => self.is_venmo_enabled(),
            GatewayKind::ApplePay => self.is_apple_pay_enabled(),
            GatewayKind::GooglePay => self.is_google_pay_enabled(),
        }
    }

    pub fn is_ach_enabled(&self) -> bool {
        self.accepts(ACH_METHOD)
    }

    pub fn are_local_payments_enabled(&self) -> bool {
        self.accepts(LOCAL_PAYMENTS_METHOD)
    }

    pub fn is_paypal_enabled(&self) -> bool {
        self.accepts(PAYPAL_METHOD)
    }

    pub fn is_sepa_enabled(&self) -> bool {
        self.accepts(SEPA_METHOD)
    }

    pub fn is_venmo_enabled(&self) -> bool {
        self.accepts(VENMO_METHOD)
    }

    pub fn is_apple_pay_enabled(&self) -> bool {
        self.accepts_prefix(APPLE_PAY_PREFIX)
    }

    pub fn is_google_pay_enabled(&self) -> bool {
        self.accepts_prefix(GOOGLE_PAY_PREFIX)
    }

    fn accepts(&self, method: &str) -> bool {
        self.accepted_payment_methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(method))
    }

    fn accepts_prefix(&self, prefix: &str) -> bool {
        self.accepted_payment_methods
            .iter()
            .any(|m| m.to_ascii_lowercase().starts_with(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities() {
        let account = MerchantAccount::new("store_usd", "usd")
            .with_payment_method("US_BANK_ACCOUNT")
            .with_payment_method("PAYPAL_ACCOUNT")
            .with_payment_method("APPLE_PAY_CARD");

        assert_eq!(account.currency, "USD");
        assert!(account.is_active());
        assert!(account.has_currency("usd"));
        assert!(account.is_ach_enabled());
        assert!(account.is_paypal_enabled());
        assert!(account.is_apple_pay_enabled());
        assert!(!account.is_google_pay_enabled());
        assert!(!account.is_venmo_enabled());
        assert!(account.supports_gateway(GatewayKind::CreditCard));
        assert!(!account.supports_gateway(GatewayKind::Sepa));
    }

    #[test]
    fn test_card_is_always_supported() {
        let account = MerchantAccount::new("bare", "EUR");
        assert!(account.supports_gateway(GatewayKind::CreditCard));
        assert!(!account.supports_gateway(GatewayKind::Ach));
    }

    #[test]
    fn test_deserialize_processor_shape() {
        let account: MerchantAccount = serde_json::from_value(serde_json::json!({
            "id": "store_eur",
            "currencyIsoCode": "EUR",
            "status": "active",
            "default": true,
            "acceptedPaymentMethods": ["CREDIT_CARD", "SEPA_DEBIT_ACCOUNT", "GOOGLE_PAY_CARD"]
        }))
        .unwrap();

        assert!(account.is_default());
        assert!(account.is_sepa_enabled());
        assert!(account.is_google_pay_enabled());
        assert_eq!(account.fastlane, None);

        let suspended = account.with_status("suspended");
        assert!(!suspended.is_active());
    }
}
