//! ACH (US bank account) responses
//!
//! The token sits in a different place depending on the call: sale replies
//! carry it under `usBankAccountDetails`, some find replies under
//! `usBankAccount`, and verification results on the envelope's
//! `paymentMethod`. Locations are tried in order and the first non-empty
//! value wins.

use super::raw::{RawUsBankAccount, present};
use super::{InstrumentResponse, TransactionDetails};
use crate::error::{PaymentError, PaymentResult};
use crate::token::{PaymentToken, TokenDetails};

type TokenLocator = fn(&TransactionDetails) -> Option<&str>;

/// Ordered token locations
const TOKEN_STRATEGIES: &[(&str, TokenLocator)] = &[
    ("usBankAccountDetails.token", details_token),
    ("usBankAccount.token", account_token),
    ("paymentMethod.token", payment_method_token),
];

fn details_token(details: &TransactionDetails) -> Option<&str> {
    details
        .raw()
        .us_bank_account_details
        .as_ref()
        .and_then(|a| present(&a.token))
}

fn account_token(details: &TransactionDetails) -> Option<&str> {
    details
        .raw()
        .us_bank_account
        .as_ref()
        .and_then(|a| present(&a.token))
}

fn payment_method_token(details: &TransactionDetails) -> Option<&str> {
    details.payment_method().and_then(|m| present(&m.token))
}

/// ACH transaction reply
#[derive(Debug, Clone)]
pub struct AchResponse {
    details: TransactionDetails,
}

impl AchResponse {
    pub(crate) fn new(details: TransactionDetails) -> Self {
        Self { details }
    }

    /// First non-empty value across both account blocks
    fn field(&self, pick: impl Fn(&RawUsBankAccount) -> &Option<String>) -> Option<&str> {
        let raw = self.details.raw();
        [raw.us_bank_account_details.as_ref(), raw.us_bank_account.as_ref()]
            .into_iter()
            .flatten()
            .find_map(|account| present(pick(account)))
    }

    /// Location the token was found at
    pub fn token_source(&self) -> Option<&'static str> {
        TOKEN_STRATEGIES
            .iter()
            .find(|(_, locate)| locate(&self.details).is_some())
            .map(|(name, _)| *name)
    }

    pub fn last_four(&self) -> Option<&str> {
        self.field(|a| &a.last4)
    }

    pub fn account_type(&self) -> Option<&str> {
        self.field(|a| &a.account_type)
    }

    pub fn account_holder_name(&self) -> Option<&str> {
        self.field(|a| &a.account_holder_name)
    }

    pub fn routing_number(&self) -> Option<&str> {
        self.field(|a| &a.routing_number)
    }

    pub fn bank_name(&self) -> Option<&str> {
        self.field(|a| &a.bank_name)
    }
}

impl InstrumentResponse for AchResponse {
    fn details(&self) -> &TransactionDetails {
        &self.details
    }

    /// Bank debits have no authorization code
    fn authorization_code(&self) -> Option<&str> {
        None
    }

    fn payment_token_id(&self) -> Option<&str> {
        TOKEN_STRATEGIES
            .iter()
            .find_map(|(_, locate)| locate(&self.details))
    }

    fn payment_token(&self) -> PaymentResult<PaymentToken> {
        let id = self.payment_token_id().ok_or_else(|| {
            PaymentError::MissingToken("Required ACH token is missing or empty!".to_string())
        })?;

        let owned = |value: Option<&str>| value.map(str::to_string);
        Ok(PaymentToken::new(
            id,
            TokenDetails::Ach {
                bank_name: owned(self.bank_name()),
                last_four: owned(self.last_four()),
                account_type: owned(self.account_type()),
                account_holder_name: owned(self.account_holder_name()),
                routing_number: owned(self.routing_number()),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> AchResponse {
        AchResponse::new(TransactionDetails::from_value(value).unwrap())
    }

    #[test]
    fn test_find_reply_token_from_details() {
        let response = parse(json!({
            "id": "txn_ach",
            "status": "settlement_pending",
            "paymentInstrumentType": "us_bank_account",
            "usBankAccountDetails": {
                "token": "tok_1",
                "last4": "6789",
                "accountType": "checking",
                "bankName": "First Bank"
            }
        }));

        assert_eq!(response.authorization_code(), None);
        assert_eq!(response.token_source(), Some("usBankAccountDetails.token"));
        let token = response.payment_token().unwrap();
        assert_eq!(token.id(), "tok_1");
        assert!(token.is_ach());
        assert_eq!(token.nickname(), "First Bank • • • 6789");
    }

    #[test]
    fn test_token_fallback_order() {
        let response = parse(json!({
            "id": "txn",
            "usBankAccountDetails": {"token": "", "last4": "1111"},
            "usBankAccount": {"token": "tok_alt", "bankName": "Alt Bank"}
        }));
        assert_eq!(response.payment_token_id(), Some("tok_alt"));
        assert_eq!(response.token_source(), Some("usBankAccount.token"));
        assert_eq!(response.last_four(), Some("1111"));
        assert_eq!(response.bank_name(), Some("Alt Bank"));

        let response = parse(json!({
            "success": true,
            "paymentMethod": {"token": "tok_env"},
            "transaction": {"id": "txn"}
        }));
        assert_eq!(response.payment_token_id(), Some("tok_env"));
        assert_eq!(response.token_source(), Some("paymentMethod.token"));
    }

    #[test]
    fn test_missing_ach_token() {
        let response = parse(json!({"id": "txn", "usBankAccountDetails": {"last4": "1"}}));
        assert_eq!(response.token_source(), None);
        let err = response.payment_token().unwrap_err();
        assert!(matches!(err, PaymentError::MissingToken(_)));
        assert_eq!(err.to_string(), "Required ACH token is missing or empty!");

        let token = parse(json!({"usBankAccountDetails": {"token": "t"}}))
            .payment_token()
            .unwrap();
        assert_eq!(token.nickname(), "ACH Direct Debit");
    }
}
