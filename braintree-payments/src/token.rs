//! Payment token model
//!
//! A token is the processor-issued reference to a saved payment method.
//! Tokens are immutable once built; the host token store owns persistence.

use crate::card::CardType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label used for ACH tokens
pub const ACH_LABEL: &str = "ACH Direct Debit";

/// Token type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    CreditCard,
    #[serde(rename = "paypal")]
    PayPal,
    Venmo,
    Ach,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CreditCard => "credit_card",
            Self::PayPal => "paypal",
            Self::Venmo => "venmo",
            Self::Ach => "ach",
        })
    }
}

/// Type-specific token attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TokenDetails {
    CreditCard {
        card_type: Option<CardType>,
        last_four: Option<String>,
        exp_month: Option<String>,
        exp_year: Option<String>,
        billing_address_id: Option<String>,
    },
    #[serde(rename = "paypal")]
    PayPal {
        payer_email: Option<String>,
        payer_id: Option<String>,
    },
    Venmo {
        username: Option<String>,
        venmo_user_id: Option<String>,
    },
    Ach {
        bank_name: Option<String>,
        last_four: Option<String>,
        account_type: Option<String>,
        account_holder_name: Option<String>,
        routing_number: Option<String>,
    },
}

impl TokenDetails {
    pub fn token_type(&self) -> TokenType {
        match self {
            Self::CreditCard { .. } => TokenType::CreditCard,
            Self::PayPal { .. } => TokenType::PayPal,
            Self::Venmo { .. } => TokenType::Venmo,
            Self::Ach { .. } => TokenType::Ach,
        }
    }
}

/// Saved payment method reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentToken {
    id: String,
    details: TokenDetails,
    default: bool,
    created_at: DateTime<Utc>,
}

impl PaymentToken {
    /// Token created as a side effect of a transaction; never the default
    pub fn new(id: impl Into<String>, details: TokenDetails) -> Self {
        Self {
            id: id.into(),
            details,
            default: false,
            created_at: Utc::now(),
        }
    }

    /// Token saved through an explicit "add payment method" flow
    pub fn added_by_customer(id: impl Into<String>, details: TokenDetails, default: bool) -> Self {
        Self {
            default,
            ..Self::new(id, details)
        }
    }

    /// Refresh the instrument details after the processor re-issued the token.
    ///
    /// The default flag and creation time are kept.
    pub fn retokenize(&mut self, details: TokenDetails) {
        self.details = details;
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn details(&self) -> &TokenDetails {
        &self.details
    }

    pub fn token_type(&self) -> TokenType {
        self.details.token_type()
    }

    pub fn is_default(&self) -> bool {
        self.default
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_credit_card(&self) -> bool {
        self.token_type() == TokenType::CreditCard
    }

    pub fn is_paypal(&self) -> bool {
        self.token_type() == TokenType::PayPal
    }

    pub fn is_venmo(&self) -> bool {
        self.token_type() == TokenType::Venmo
    }

    pub fn is_ach(&self) -> bool {
        self.token_type() == TokenType::Ach
    }

    /// Billing address saved with a card, reused on later sales
    pub fn billing_address_id(&self) -> Option<&str> {
        match &self.details {
            TokenDetails::CreditCard {
                billing_address_id, ..
            } => billing_address_id.as_deref(),
            _ => None,
        }
    }

    pub fn last_four(&self) -> Option<&str> {
        match &self.details {
            TokenDetails::CreditCard { last_four, .. } | TokenDetails::Ach { last_four, .. } => {
                last_four.as_deref()
            }
            _ => None,
        }
    }

    /// Long type description: payer email, username, bank label or card brand
    pub fn type_full(&self) -> String {
        match &self.details {
            TokenDetails::CreditCard { card_type, .. } => card_type
                .map(|t| t.name().to_string())
                .unwrap_or_else(|| "Card".to_string()),
            TokenDetails::PayPal { payer_email, .. } => {
                payer_email.clone().unwrap_or_else(|| "PayPal".to_string())
            }
            TokenDetails::Venmo { username, .. } => {
                username.clone().unwrap_or_else(|| "Venmo".to_string())
            }
            TokenDetails::Ach { .. } => ACH_LABEL.to_string(),
        }
    }

    /// Display name for saved-method lists
    pub fn nickname(&self) -> String {
        match &self.details {
            TokenDetails::Ach {
                bank_name,
                last_four,
                ..
            } => match (non_empty(bank_name), non_empty(last_four)) {
                (Some(bank), Some(last4)) => format!("{bank} • • • {last4}"),
                (None, Some(last4)) => format!("{ACH_LABEL} •••{last4}"),
                _ => ACH_LABEL.to_string(),
            },
            TokenDetails::CreditCard { last_four, .. } => match non_empty(last_four) {
                Some(last4) => format!("{} ending in {last4}", self.type_full()),
                None => self.type_full(),
            },
            TokenDetails::PayPal { .. } | TokenDetails::Venmo { .. } => self.type_full(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ach(bank: Option<&str>, last4: Option<&str>) -> PaymentToken {
        PaymentToken::new(
            "tok_ach",
            TokenDetails::Ach {
                bank_name: bank.map(String::from),
                last_four: last4.map(String::from),
                account_type: Some("checking".into()),
                account_holder_name: None,
                routing_number: None,
            },
        )
    }

    #[test]
    fn test_side_effect_tokens_are_not_default() {
        let token = ach(Some("First Bank"), Some("6789"));
        assert!(!token.is_default());
        assert!(token.is_ach());
        assert!(!token.is_paypal());

        let explicit = PaymentToken::added_by_customer("tok", token.details().clone(), true);
        assert!(explicit.is_default());
    }

    #[test]
    fn test_ach_nickname_fallbacks() {
        assert_eq!(
            ach(Some("First Bank"), Some("6789")).nickname(),
            "First Bank • • • 6789"
        );
        assert_eq!(ach(None, Some("6789")).nickname(), "ACH Direct Debit •••6789");
        assert_eq!(ach(Some(""), None).nickname(), "ACH Direct Debit");
        assert_eq!(ach(None, None).type_full(), "ACH Direct Debit");
    }

    #[test]
    fn test_paypal_and_venmo_display() {
        let paypal = PaymentToken::new(
            "tok_pp",
            TokenDetails::PayPal {
                payer_email: Some("buyer@example.com".into()),
                payer_id: Some("PAYER1".into()),
            },
        );
        assert!(paypal.is_paypal());
        assert_eq!(paypal.nickname(), "buyer@example.com");

        let venmo = PaymentToken::new(
            "tok_v",
            TokenDetails::Venmo {
                username: Some("venmojoe".into()),
                venmo_user_id: None,
            },
        );
        assert!(venmo.is_venmo());
        assert_eq!(venmo.type_full(), "venmojoe");
    }

    #[test]
    fn test_card_display() {
        let card = PaymentToken::new(
            "tok_card",
            TokenDetails::CreditCard {
                card_type: Some(CardType::Visa),
                last_four: Some("1111".into()),
                exp_month: Some("12".into()),
                exp_year: Some("2030".into()),
                billing_address_id: Some("addr_1".into()),
            },
        );
        assert!(card.is_credit_card());
        assert_eq!(card.nickname(), "Visa ending in 1111");
        assert_eq!(card.billing_address_id(), Some("addr_1"));
        assert_eq!(card.last_four(), Some("1111"));
    }

    #[test]
    fn test_serde_tagging() {
        let token = ach(Some("Bank"), Some("1234"));
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["details"]["type"], "ach");
        let back: PaymentToken = serde_json::from_value(json).unwrap();
        assert_eq!(back, token);
    }
}
