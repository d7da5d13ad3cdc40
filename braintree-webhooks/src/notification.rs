//! Webhook notification decoding
//!
//! The payload is base64-encoded XML:
//!
//! ```text
//! <notification>
//!   <timestamp type="datetime">2024-05-01T10:00:00Z</timestamp>
//!   <kind>transaction_settled</kind>
//!   <subject>
//!     <transaction>
//!       <id>..</id> <amount>..</amount> <currency-iso-code>..</currency-iso-code>
//!       <status>..</status> <us-bank-account>..</us-bank-account>
//!     </transaction>
//!   </subject>
//! </notification>
//! ```

use crate::Result;
use base64::{Engine, engine::general_purpose::STANDARD};
use braintree_payments::parse_amount;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Notification kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WebhookKind {
    /// Sent when the webhook URL is verified from the control panel
    Check,
    TransactionSettled,
    TransactionSettlementDeclined,
    /// Any kind without reconciliation logic
    Other(String),
}

impl WebhookKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            "check" => Self::Check,
            "transaction_settled" => Self::TransactionSettled,
            "transaction_settlement_declined" => Self::TransactionSettlementDeclined,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Check => "check",
            Self::TransactionSettled => "transaction_settled",
            Self::TransactionSettlementDeclined => "transaction_settlement_declined",
            Self::Other(kind) => kind,
        }
    }
}

impl fmt::Display for WebhookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bank account excerpt carried by ACH notifications
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankAccountExcerpt {
    pub account_type: Option<String>,
    pub last_four: Option<String>,
}

/// Transaction snapshot embedded in a notification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationTransaction {
    pub id: Option<String>,
    /// Amount as sent, for display
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub status: Option<String>,
    pub processor_settlement_response_code: Option<String>,
    pub processor_settlement_response_text: Option<String>,
    pub gateway_rejection_reason: Option<String>,
    pub bank_account: Option<BankAccountExcerpt>,
}

impl NotificationTransaction {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn with_amount(mut self, amount: impl Into<String>, currency: impl Into<String>) -> Self {
        self.amount = Some(amount.into());
        self.currency = Some(currency.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_settlement_response(
        mut self,
        code: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.processor_settlement_response_code = Some(code.into());
        self.processor_settlement_response_text = Some(text.into());
        self
    }

    pub fn with_gateway_rejection_reason(mut self, reason: impl Into<String>) -> Self {
        self.gateway_rejection_reason = Some(reason.into());
        self
    }

    pub fn with_bank_account(
        mut self,
        account_type: Option<&str>,
        last_four: Option<&str>,
    ) -> Self {
        self.bank_account = Some(BankAccountExcerpt {
            account_type: account_type.map(str::to_string),
            last_four: last_four.map(str::to_string),
        });
        self
    }

    /// Parsed amount, `None` when absent or malformed
    pub fn amount_value(&self) -> Option<Decimal> {
        self.amount.as_deref().and_then(parse_amount)
    }
}

/// Decoded webhook notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookNotification {
    pub kind: WebhookKind,
    pub timestamp: Option<DateTime<Utc>>,
    pub transaction: Option<NotificationTransaction>,
}

impl WebhookNotification {
    pub fn new(kind: WebhookKind) -> Self {
        Self {
            kind,
            timestamp: None,
            transaction: None,
        }
    }

    pub fn with_transaction(mut self, transaction: NotificationTransaction) -> Self {
        self.transaction = Some(transaction);
        self
    }

    /// Decode a verified payload
    pub fn from_payload(payload: &str) -> Result<Self> {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        let xml = String::from_utf8(STANDARD.decode(compact)?)?;
        Self::from_xml(&xml)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let raw: RawNotification = quick_xml::de::from_str(xml)?;

        let kind = present(raw.kind)
            .map(|kind| WebhookKind::parse(&kind))
            .unwrap_or_else(|| WebhookKind::Other(String::new()));
        let timestamp = present(raw.timestamp).and_then(|ts| {
            DateTime::parse_from_rfc3339(&ts)
                .ok()
                .map(|ts| ts.with_timezone(&Utc))
        });
        let transaction = raw
            .subject
            .and_then(|subject| subject.transaction)
            .map(NotificationTransaction::from);

        Ok(Self {
            kind,
            timestamp,
            transaction,
        })
    }

    /// XML document for this notification, as the processor would send it
    pub fn to_xml(&self) -> Result<String> {
        let raw = RawNotification {
            timestamp: Some(self.timestamp.unwrap_or_else(Utc::now).to_rfc3339()),
            kind: Some(self.kind.to_string()),
            subject: Some(RawSubject {
                check: (self.kind == WebhookKind::Check).then(|| "true".to_string()),
                transaction: self.transaction.clone().map(RawTransaction::from),
            }),
        };
        quick_xml::se::to_string_with_root("notification", &raw)
            .map_err(|e| crate::WebhookError::PayloadError(e.to_string()))
    }
}

// Wire format

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawNotification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subject: Option<RawSubject>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawSubject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    check: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transaction: Option<RawTransaction>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawTransaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    currency_iso_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    processor_settlement_response_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    processor_settlement_response_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gateway_rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    us_bank_account: Option<RawBankAccount>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawBankAccount {
    #[serde(default, rename = "last-4", skip_serializing_if = "Option::is_none")]
    last_4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    account_type: Option<String>,
}

/// Empty elements such as `<gateway-rejection-reason nil="true"/>` mean absent
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<RawTransaction> for NotificationTransaction {
    fn from(raw: RawTransaction) -> Self {
        Self {
            id: present(raw.id),
            amount: present(raw.amount),
            currency: present(raw.currency_iso_code),
            status: present(raw.status),
            processor_settlement_response_code: present(raw.processor_settlement_response_code),
            processor_settlement_response_text: present(raw.processor_settlement_response_text),
            gateway_rejection_reason: present(raw.gateway_rejection_reason),
            bank_account: raw.us_bank_account.map(|account| BankAccountExcerpt {
                account_type: present(account.account_type),
                last_four: present(account.last_4),
            }),
        }
    }
}

impl From<NotificationTransaction> for RawTransaction {
    fn from(transaction: NotificationTransaction) -> Self {
        Self {
            id: transaction.id,
            amount: transaction.amount,
            currency_iso_code: transaction.currency,
            status: transaction.status,
            processor_settlement_response_code: transaction.processor_settlement_response_code,
            processor_settlement_response_text: transaction.processor_settlement_response_text,
            gateway_rejection_reason: transaction.gateway_rejection_reason,
            us_bank_account: transaction.bank_account.map(|account| RawBankAccount {
                last_4: account.last_four,
                account_type: account.account_type,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WebhookError;

    const SETTLED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<notification>
  <timestamp type="datetime">2024-05-01T10:00:00Z</timestamp>
  <kind>transaction_settled</kind>
  <subject>
    <transaction>
      <id>txn_1</id>
      <amount>45.00</amount>
      <currency-iso-code>USD</currency-iso-code>
      <status>settled</status>
      <gateway-rejection-reason nil="true"/>
      <us-bank-account>
        <last-4>6789</last-4>
        <account-type>checking</account-type>
      </us-bank-account>
    </transaction>
  </subject>
</notification>"#;

    #[test]
    fn test_parse_settled() {
        let notification = WebhookNotification::from_xml(SETTLED).unwrap();

        assert_eq!(notification.kind, WebhookKind::TransactionSettled);
        assert_eq!(
            notification.timestamp.unwrap().to_rfc3339(),
            "2024-05-01T10:00:00+00:00"
        );

        let transaction = notification.transaction.unwrap();
        assert_eq!(transaction.id.as_deref(), Some("txn_1"));
        assert_eq!(transaction.amount_value(), Some(Decimal::new(4500, 2)));
        assert_eq!(transaction.currency.as_deref(), Some("USD"));
        assert_eq!(transaction.gateway_rejection_reason, None);

        let bank = transaction.bank_account.unwrap();
        assert_eq!(bank.last_four.as_deref(), Some("6789"));
        assert_eq!(bank.account_type.as_deref(), Some("checking"));
    }

    #[test]
    fn test_parse_check() {
        let xml = "<notification><kind>check</kind><subject><check type=\"boolean\">true</check></subject></notification>";
        let notification = WebhookNotification::from_xml(xml).unwrap();
        assert_eq!(notification.kind, WebhookKind::Check);
        assert!(notification.transaction.is_none());
    }

    #[test]
    fn test_unknown_kind() {
        let xml = "<notification><kind>subscription_went_past_due</kind><subject/></notification>";
        let notification = WebhookNotification::from_xml(xml).unwrap();
        assert_eq!(
            notification.kind,
            WebhookKind::Other("subscription_went_past_due".into())
        );
    }

    #[test]
    fn test_from_payload_ignores_line_breaks() {
        let encoded = STANDARD.encode(SETTLED);
        let (head, tail) = encoded.split_at(40);
        let payload = format!("{}\n{}\n", head, tail);

        let notification = WebhookNotification::from_payload(&payload).unwrap();
        assert_eq!(notification.kind, WebhookKind::TransactionSettled);
    }

    #[test]
    fn test_bad_payload() {
        assert!(matches!(
            WebhookNotification::from_payload("@@not base64@@"),
            Err(WebhookError::PayloadError(_))
        ));
        let not_xml = STANDARD.encode("<notification><kind>");
        assert!(matches!(
            WebhookNotification::from_payload(&not_xml),
            Err(WebhookError::PayloadError(_))
        ));
    }

    #[test]
    fn test_xml_round_trip() {
        let notification = WebhookNotification::new(WebhookKind::TransactionSettlementDeclined)
            .with_transaction(
                NotificationTransaction::new("txn_9")
                    .with_status("settlement_declined")
                    .with_bank_account(Some("savings"), None),
            );

        let parsed = WebhookNotification::from_xml(&notification.to_xml().unwrap()).unwrap();
        assert_eq!(parsed.kind, notification.kind);
        assert_eq!(parsed.transaction, notification.transaction);
    }
}
