//! Venmo responses

use super::raw::{RawVenmo, present, present_owned};
use super::{InstrumentResponse, TransactionDetails};
use crate::error::{PaymentError, PaymentResult};
use crate::token::{PaymentToken, TokenDetails};

/// Venmo transaction reply
#[derive(Debug, Clone)]
pub struct VenmoResponse {
    details: TransactionDetails,
}

impl VenmoResponse {
    pub(crate) fn new(details: TransactionDetails) -> Self {
        Self { details }
    }

    fn venmo(&self) -> Option<&RawVenmo> {
        self.details.raw().venmo_account.as_ref()
    }

    pub fn username(&self) -> Option<&str> {
        self.venmo().and_then(|v| present(&v.username))
    }

    pub fn venmo_user_id(&self) -> Option<&str> {
        self.venmo().and_then(|v| present(&v.venmo_user_id))
    }
}

impl InstrumentResponse for VenmoResponse {
    fn details(&self) -> &TransactionDetails {
        &self.details
    }

    fn authorization_code(&self) -> Option<&str> {
        self.venmo().and_then(|v| present(&v.authorization_id))
    }

    fn payment_token_id(&self) -> Option<&str> {
        self.venmo().and_then(|v| present(&v.token))
    }

    fn payment_token(&self) -> PaymentResult<PaymentToken> {
        let id = self.payment_token_id().ok_or_else(|| {
            PaymentError::MissingToken("Required Venmo token is missing or empty!".to_string())
        })?;

        Ok(PaymentToken::new(
            id,
            TokenDetails::Venmo {
                username: self.venmo().and_then(|v| present_owned(&v.username)),
                venmo_user_id: self.venmo().and_then(|v| present_owned(&v.venmo_user_id)),
            },
        ))
    }
}
