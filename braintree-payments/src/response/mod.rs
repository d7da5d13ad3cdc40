//! Transaction response parsing
//!
//! Processor replies differ in shape per payment instrument. A reply is
//! parsed once into [`TransactionDetails`] (fields every instrument shares)
//! and then wrapped in the [`TransactionResponse`] variant selected by the
//! `paymentInstrumentType` discriminator.
//!
//! ```text
//! JSON reply ──► TransactionDetails ──► paymentInstrumentType
//!                                          │
//!        ┌───────────────┬─────────────────┼───────────────┐
//!        ▼               ▼                 ▼               ▼
//!   CardResponse   PayPalResponse   VenmoResponse    AchResponse
//!  (card, wallets)
//! ```
//!
//! Only a missing token is fatal; every other absent field is `None`.

mod ach;
mod card;
mod paypal;
pub mod raw;
mod venmo;

pub use ach::AchResponse;
pub use card::{CardResponse, CardSource};
pub use paypal::PayPalResponse;
pub use venmo::VenmoResponse;

use crate::config::GatewayKind;
use crate::error::{PaymentError, PaymentResult};
use crate::money::parse_amount;
use crate::token::PaymentToken;
use raw::{RawPaymentMethod, RawResult, RawTransaction, present, present_owned};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// CVV response code meaning "matches"
pub const CSC_MATCH: &str = "M";

/// Instrument discriminator carried on every transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentType {
    CreditCard,
    ApplePayCard,
    #[serde(rename = "android_pay_card", alias = "google_pay_card")]
    GooglePayCard,
    #[serde(rename = "paypal_account")]
    PayPalAccount,
    VenmoAccount,
    UsBankAccount,
}

impl InstrumentType {
    /// Parse the processor's discriminator value
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "credit_card" => Some(Self::CreditCard),
            "apple_pay_card" => Some(Self::ApplePayCard),
            "android_pay_card" | "google_pay_card" => Some(Self::GooglePayCard),
            "paypal_account" | "paypal_here" => Some(Self::PayPalAccount),
            "venmo_account" => Some(Self::VenmoAccount),
            "us_bank_account" => Some(Self::UsBankAccount),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreditCard => "credit_card",
            Self::ApplePayCard => "apple_pay_card",
            Self::GooglePayCard => "android_pay_card",
            Self::PayPalAccount => "paypal_account",
            Self::VenmoAccount => "venmo_account",
            Self::UsBankAccount => "us_bank_account",
        }
    }

    /// Instrument a gateway produces, used when a reply omits the discriminator
    pub fn for_gateway(gateway: GatewayKind) -> Option<Self> {
        match gateway {
            GatewayKind::CreditCard => Some(Self::CreditCard),
            GatewayKind::ApplePay => Some(Self::ApplePayCard),
            GatewayKind::GooglePay => Some(Self::GooglePayCard),
            GatewayKind::PayPal => Some(Self::PayPalAccount),
            GatewayKind::Venmo => Some(Self::VenmoAccount),
            GatewayKind::Ach => Some(Self::UsBankAccount),
            GatewayKind::LocalPayments | GatewayKind::Sepa => None,
        }
    }
}

impl fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processor transaction status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    Authorizing,
    Authorized,
    AuthorizationExpired,
    SubmittedForSettlement,
    Settling,
    SettlementPending,
    SettlementConfirmed,
    Settled,
    SettlementDeclined,
    ProcessorDeclined,
    GatewayRejected,
    Failed,
    Voided,
    Unrecognized(String),
}

impl TransactionStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "authorizing" => Self::Authorizing,
            "authorized" => Self::Authorized,
            "authorization_expired" => Self::AuthorizationExpired,
            "submitted_for_settlement" => Self::SubmittedForSettlement,
            "settling" => Self::Settling,
            "settlement_pending" => Self::SettlementPending,
            "settlement_confirmed" => Self::SettlementConfirmed,
            "settled" => Self::Settled,
            "settlement_declined" => Self::SettlementDeclined,
            "processor_declined" => Self::ProcessorDeclined,
            "gateway_rejected" => Self::GatewayRejected,
            "failed" => Self::Failed,
            "voided" => Self::Voided,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// Whether the transaction was approved by the processor
    pub fn is_approved(&self) -> bool {
        matches!(
            self,
            Self::Authorized
                | Self::SubmittedForSettlement
                | Self::Settling
                | Self::SettlementPending
                | Self::SettlementConfirmed
                | Self::Settled
        )
    }

    /// Whether funds are still being moved (ACH and similar)
    pub fn is_held(&self) -> bool {
        matches!(self, Self::SettlementPending | Self::Settling)
    }
}

/// Risk assessment attached by the processor's fraud tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskData {
    pub id: Option<String>,
    pub decision: Option<String>,
}

/// 3-D Secure outcome; present only when the reply carried a 3DS block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreeDSecureInfo {
    pub status: Option<String>,
    pub liability_shifted: bool,
    pub liability_shift_possible: bool,
    pub enrolled: bool,
}

/// Outer shape of a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Result envelope with a `transaction` member
    Result,
    /// Bare transaction object, as returned by find
    Transaction,
}

/// Fields shared by every instrument
#[derive(Debug, Clone)]
pub struct TransactionDetails {
    shape: ResponseShape,
    success: Option<bool>,
    message: Option<String>,
    transaction: RawTransaction,
    payment_method: Option<RawPaymentMethod>,
}

impl TransactionDetails {
    /// Parse either a result envelope or a bare transaction
    pub fn from_value(value: serde_json::Value) -> PaymentResult<Self> {
        let is_envelope = value.get("transaction").is_some_and(|t| t.is_object())
            || value.get("success").is_some();

        if is_envelope {
            let result: RawResult = serde_json::from_value(value)?;
            let Some(transaction) = result.transaction else {
                return Err(PaymentError::Provider(
                    present_owned(&result.message)
                        .unwrap_or_else(|| "processor returned no transaction".to_string()),
                ));
            };
            Ok(Self {
                shape: ResponseShape::Result,
                success: result.success,
                message: result.message,
                transaction,
                payment_method: result.payment_method,
            })
        } else {
            Ok(Self {
                shape: ResponseShape::Transaction,
                success: None,
                message: None,
                transaction: serde_json::from_value(value)?,
                payment_method: None,
            })
        }
    }

    pub fn shape(&self) -> ResponseShape {
        self.shape
    }

    /// Raw transaction fields
    pub fn raw(&self) -> &RawTransaction {
        &self.transaction
    }

    pub(crate) fn payment_method(&self) -> Option<&RawPaymentMethod> {
        self.payment_method.as_ref()
    }

    pub fn transaction_id(&self) -> Option<&str> {
        present(&self.transaction.id)
    }

    pub fn status(&self) -> Option<TransactionStatus> {
        present(&self.transaction.status).map(TransactionStatus::parse)
    }

    /// Transaction type (`sale` or `credit`)
    pub fn transaction_type(&self) -> Option<&str> {
        present(&self.transaction.kind)
    }

    pub fn merchant_account_id(&self) -> Option<&str> {
        present(&self.transaction.merchant_account_id)
    }

    pub fn amount(&self) -> Option<Decimal> {
        present(&self.transaction.amount).and_then(parse_amount)
    }

    pub fn currency(&self) -> Option<&str> {
        present(&self.transaction.currency_iso_code)
    }

    pub fn message(&self) -> Option<&str> {
        present(&self.message)
    }

    pub fn payment_instrument_type(&self) -> Option<&str> {
        present(&self.transaction.payment_instrument_type)
    }

    /// Whether the processor approved the transaction
    pub fn is_approved(&self) -> bool {
        match self.success {
            Some(success) => success,
            None => self.status().is_some_and(|s| s.is_approved()),
        }
    }

    pub fn processor_response_code(&self) -> Option<&str> {
        present(&self.transaction.processor_response_code)
    }

    pub fn processor_response_text(&self) -> Option<&str> {
        present(&self.transaction.processor_response_text)
    }

    pub fn gateway_rejection_reason(&self) -> Option<&str> {
        present(&self.transaction.gateway_rejection_reason)
    }

    /// `error:<code>` when an AVS error is reported, otherwise
    /// `<postal code result>:<street address result>`
    pub fn avs_result(&self) -> String {
        if let Some(code) = present(&self.transaction.avs_error_response_code) {
            return format!("error:{code}");
        }
        format!(
            "{}:{}",
            present(&self.transaction.avs_postal_code_response_code).unwrap_or_default(),
            present(&self.transaction.avs_street_address_response_code).unwrap_or_default()
        )
    }

    /// CVV response code
    pub fn csc_result(&self) -> Option<&str> {
        present(&self.transaction.cvv_response_code)
    }

    /// Whether the CVV matched
    pub fn csc_match(&self) -> bool {
        self.csc_result() == Some(CSC_MATCH)
    }

    /// Processor customer ID, if a customer record was attached
    pub fn customer_id(&self) -> Option<&str> {
        self.transaction
            .customer_details
            .as_ref()
            .and_then(|c| present(&c.id))
    }

    pub fn has_risk_data(&self) -> bool {
        self.transaction.risk_data.is_some()
    }

    pub fn risk_data(&self) -> Option<RiskData> {
        self.transaction.risk_data.as_ref().map(|risk| RiskData {
            id: present_owned(&risk.id),
            decision: present_owned(&risk.decision),
        })
    }

    /// 3-D Secure outcome, `None` when the reply had no 3DS block at all
    pub fn three_d_secure(&self) -> Option<ThreeDSecureInfo> {
        self.transaction
            .three_d_secure_info
            .as_ref()
            .map(|info| ThreeDSecureInfo {
                status: present_owned(&info.status),
                liability_shifted: info.liability_shifted.unwrap_or(false),
                liability_shift_possible: info.liability_shift_possible.unwrap_or(false),
                enrolled: present(&info.enrolled).is_some_and(|e| e.eq_ignore_ascii_case("Y")),
            })
    }
}

/// Contract every instrument-specific response fulfils
pub trait InstrumentResponse {
    /// Shared fields
    fn details(&self) -> &TransactionDetails;

    /// Authorization code, `None` where the instrument has none
    fn authorization_code(&self) -> Option<&str>;

    /// Token identifier, `None` when no token was created
    fn payment_token_id(&self) -> Option<&str>;

    /// Token saved as a side effect of the transaction.
    ///
    /// Fails with [`PaymentError::MissingToken`] when the reply has no token.
    fn payment_token(&self) -> PaymentResult<PaymentToken>;
}

/// Parsed transaction reply
#[derive(Debug, Clone)]
pub enum TransactionResponse {
    Card(CardResponse),
    PayPal(PayPalResponse),
    Venmo(VenmoResponse),
    Ach(AchResponse),
}

impl TransactionResponse {
    /// Parse a reply, dispatching on its instrument discriminator
    pub fn parse(value: serde_json::Value) -> PaymentResult<Self> {
        Self::parse_with_fallback(value, None)
    }

    /// Parse a reply, using `fallback` when the discriminator is absent
    pub fn parse_with_fallback(
        value: serde_json::Value,
        fallback: Option<InstrumentType>,
    ) -> PaymentResult<Self> {
        let details = TransactionDetails::from_value(value)?;

        let instrument = match details.payment_instrument_type() {
            Some(tag) => InstrumentType::parse(tag)
                .ok_or_else(|| PaymentError::UnsupportedInstrument(tag.to_string()))?,
            None => fallback.ok_or_else(|| {
                PaymentError::UnsupportedInstrument("missing paymentInstrumentType".to_string())
            })?,
        };

        Ok(Self::from_details(details, instrument))
    }

    /// Wrap already-parsed details in the variant for `instrument`
    pub fn from_details(details: TransactionDetails, instrument: InstrumentType) -> Self {
        match instrument {
            InstrumentType::CreditCard => Self::Card(CardResponse::new(details, CardSource::Direct)),
            InstrumentType::ApplePayCard => {
                Self::Card(CardResponse::new(details, CardSource::ApplePay))
            }
            InstrumentType::GooglePayCard => {
                Self::Card(CardResponse::new(details, CardSource::GooglePay))
            }
            InstrumentType::PayPalAccount => Self::PayPal(PayPalResponse::new(details)),
            InstrumentType::VenmoAccount => Self::Venmo(VenmoResponse::new(details)),
            InstrumentType::UsBankAccount => Self::Ach(AchResponse::new(details)),
        }
    }

    fn inner(&self) -> &dyn InstrumentResponse {
        match self {
            Self::Card(r) => r,
            Self::PayPal(r) => r,
            Self::Venmo(r) => r,
            Self::Ach(r) => r,
        }
    }

    pub fn instrument_type(&self) -> InstrumentType {
        match self {
            Self::Card(r) => r.source().instrument_type(),
            Self::PayPal(_) => InstrumentType::PayPalAccount,
            Self::Venmo(_) => InstrumentType::VenmoAccount,
            Self::Ach(_) => InstrumentType::UsBankAccount,
        }
    }

    pub fn as_card(&self) -> Option<&CardResponse> {
        match self {
            Self::Card(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_paypal(&self) -> Option<&PayPalResponse> {
        match self {
            Self::PayPal(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_venmo(&self) -> Option<&VenmoResponse> {
        match self {
            Self::Venmo(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_ach(&self) -> Option<&AchResponse> {
        match self {
            Self::Ach(r) => Some(r),
            _ => None,
        }
    }
}

impl InstrumentResponse for TransactionResponse {
    fn details(&self) -> &TransactionDetails {
        self.inner().details()
    }

    fn authorization_code(&self) -> Option<&str> {
        self.inner().authorization_code()
    }

    fn payment_token_id(&self) -> Option<&str> {
        self.inner().payment_token_id()
    }

    fn payment_token(&self) -> PaymentResult<PaymentToken> {
        self.inner().payment_token()
    }
}

impl std::ops::Deref for TransactionResponse {
    type Target = TransactionDetails;

    fn deref(&self) -> &Self::Target {
        self.details()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_and_bare_shapes() {
        let envelope = json!({
            "success": true,
            "transaction": {"id": "txn_1", "status": "authorized", "paymentInstrumentType": "credit_card"}
        });
        let details = TransactionDetails::from_value(envelope).unwrap();
        assert_eq!(details.shape(), ResponseShape::Result);
        assert_eq!(details.transaction_id(), Some("txn_1"));
        assert!(details.is_approved());

        let bare = json!({"id": "txn_2", "status": "settled", "amount": "10.00"});
        let details = TransactionDetails::from_value(bare).unwrap();
        assert_eq!(details.shape(), ResponseShape::Transaction);
        assert_eq!(details.status(), Some(TransactionStatus::Settled));
        assert_eq!(details.amount(), Some(Decimal::new(1000, 2)));
        assert!(details.is_approved());
    }

    #[test]
    fn test_failed_envelope_without_transaction() {
        let value = json!({"success": false, "message": "Amount is required."});
        let err = TransactionDetails::from_value(value).unwrap_err();
        assert!(matches!(err, PaymentError::Provider(msg) if msg == "Amount is required."));
    }

    #[test]
    fn test_avs_result() {
        let details =
            TransactionDetails::from_value(json!({"id": "t", "avsErrorResponseCode": "S"})).unwrap();
        assert_eq!(details.avs_result(), "error:S");

        let details = TransactionDetails::from_value(json!({
            "id": "t",
            "avsPostalCodeResponseCode": "M",
            "avsStreetAddressResponseCode": "N"
        }))
        .unwrap();
        assert_eq!(details.avs_result(), "M:N");

        let details = TransactionDetails::from_value(json!({"id": "t"})).unwrap();
        assert_eq!(details.avs_result(), ":");
    }

    #[test]
    fn test_csc_match() {
        let matched = TransactionDetails::from_value(json!({"cvvResponseCode": "M"})).unwrap();
        assert!(matched.csc_match());
        let unmatched = TransactionDetails::from_value(json!({"cvvResponseCode": "N"})).unwrap();
        assert!(!unmatched.csc_match());
        let absent = TransactionDetails::from_value(json!({})).unwrap();
        assert!(!absent.csc_match());
        assert_eq!(absent.csc_result(), None);
    }

    #[test]
    fn test_three_d_secure_presence() {
        let absent = TransactionDetails::from_value(json!({"id": "t"})).unwrap();
        assert!(absent.three_d_secure().is_none());

        let present = TransactionDetails::from_value(json!({
            "id": "t",
            "threeDSecureInfo": {
                "status": "authenticate_successful",
                "liabilityShifted": true,
                "liabilityShiftPossible": true,
                "enrolled": "Y"
            }
        }))
        .unwrap();
        let info = present.three_d_secure().unwrap();
        assert_eq!(info.status.as_deref(), Some("authenticate_successful"));
        assert!(info.liability_shifted);
        assert!(info.liability_shift_possible);
        assert!(info.enrolled);
    }

    #[test]
    fn test_risk_data_and_customer() {
        let details = TransactionDetails::from_value(json!({
            "riskData": {"id": "risk_1", "decision": "Approve"},
            "customerDetails": {"id": "cust_9"}
        }))
        .unwrap();
        assert!(details.has_risk_data());
        assert_eq!(details.risk_data().unwrap().decision.as_deref(), Some("Approve"));
        assert_eq!(details.customer_id(), Some("cust_9"));

        let none = TransactionDetails::from_value(json!({"customerDetails": {"id": ""}})).unwrap();
        assert!(none.risk_data().is_none());
        assert_eq!(none.customer_id(), None);
    }

    #[test]
    fn test_dispatch_on_discriminator() {
        let value = json!({"id": "t", "paymentInstrumentType": "venmo_account"});
        let response = TransactionResponse::parse(value).unwrap();
        assert_eq!(response.instrument_type(), InstrumentType::VenmoAccount);
        assert!(response.as_venmo().is_some());

        let value = json!({"id": "t", "paymentInstrumentType": "apple_pay_card"});
        let response = TransactionResponse::parse(value).unwrap();
        assert_eq!(response.as_card().unwrap().source(), CardSource::ApplePay);
    }

    #[test]
    fn test_unknown_or_missing_discriminator() {
        let err = TransactionResponse::parse(json!({"paymentInstrumentType": "bitcoin"})).unwrap_err();
        assert!(matches!(err, PaymentError::UnsupportedInstrument(t) if t == "bitcoin"));

        assert!(TransactionResponse::parse(json!({"id": "t"})).is_err());

        let response = TransactionResponse::parse_with_fallback(
            json!({"id": "t"}),
            InstrumentType::for_gateway(GatewayKind::PayPal),
        )
        .unwrap();
        assert!(response.as_paypal().is_some());
    }

    #[test]
    fn test_numeric_amount_is_accepted() {
        let details = TransactionDetails::from_value(json!({"amount": 12.5})).unwrap();
        assert_eq!(details.amount(), Some(Decimal::new(125, 1)));
    }
}
