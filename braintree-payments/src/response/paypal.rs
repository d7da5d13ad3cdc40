//! PayPal responses

use super::raw::{RawPayPal, present, present_owned};
use super::{InstrumentResponse, TransactionDetails};
use crate::error::{PaymentError, PaymentResult};
use crate::money::parse_amount;
use crate::token::{PaymentToken, TokenDetails};
use rust_decimal::Decimal;

/// PayPal transaction reply
#[derive(Debug, Clone)]
pub struct PayPalResponse {
    details: TransactionDetails,
}

impl PayPalResponse {
    pub(crate) fn new(details: TransactionDetails) -> Self {
        Self { details }
    }

    fn paypal(&self) -> Option<&RawPayPal> {
        self.details.raw().paypal_details.as_ref()
    }

    fn field(&self, pick: impl Fn(&RawPayPal) -> &Option<String>) -> Option<&str> {
        self.paypal().and_then(|p| present(pick(p)))
    }

    pub fn payer_email(&self) -> Option<&str> {
        self.field(|p| &p.payer_email)
    }

    pub fn payer_id(&self) -> Option<&str> {
        self.field(|p| &p.payer_id)
    }

    pub fn payment_id(&self) -> Option<&str> {
        self.field(|p| &p.payment_id)
    }

    pub fn debug_id(&self) -> Option<&str> {
        self.field(|p| &p.debug_id)
    }

    pub fn capture_id(&self) -> Option<&str> {
        self.field(|p| &p.capture_id)
    }

    pub fn refund_id(&self) -> Option<&str> {
        self.field(|p| &p.refund_id)
    }

    pub fn description(&self) -> Option<&str> {
        self.field(|p| &p.description)
    }

    /// Fee PayPal charged the merchant
    pub fn transaction_fee(&self) -> Option<Decimal> {
        self.field(|p| &p.transaction_fee_amount).and_then(parse_amount)
    }
}

impl InstrumentResponse for PayPalResponse {
    fn details(&self) -> &TransactionDetails {
        &self.details
    }

    fn authorization_code(&self) -> Option<&str> {
        self.field(|p| &p.authorization_id)
    }

    fn payment_token_id(&self) -> Option<&str> {
        self.field(|p| &p.token)
    }

    fn payment_token(&self) -> PaymentResult<PaymentToken> {
        let id = self.payment_token_id().ok_or_else(|| {
            PaymentError::MissingToken("Required PayPal token is missing or empty!".to_string())
        })?;

        Ok(PaymentToken::new(
            id,
            TokenDetails::PayPal {
                payer_email: self.paypal().and_then(|p| present_owned(&p.payer_email)),
                payer_id: self.paypal().and_then(|p| present_owned(&p.payer_id)),
            },
        ))
    }
}
