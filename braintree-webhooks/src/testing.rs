//! Signed sample notifications
//!
//! Produces the `(bt_signature, bt_payload)` pair the processor would post,
//! for tests and for checking a host's webhook endpoint end to end.

use crate::notification::{NotificationTransaction, WebhookKind, WebhookNotification};
use crate::{Result, WebhookSignature};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;

/// Signed notification of `kind`, carrying `transaction` when given
pub fn sample_notification(
    signature: &WebhookSignature,
    kind: WebhookKind,
    transaction: Option<NotificationTransaction>,
) -> Result<(String, String)> {
    let mut notification = WebhookNotification::new(kind);
    notification.timestamp = Some(Utc::now());
    notification.transaction = transaction;

    let payload = format!("{}\n", STANDARD.encode(notification.to_xml()?));
    Ok((signature.sign(&payload), payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_verifies_and_decodes() {
        let signer = WebhookSignature::new("public_key", "private_key");
        let (bt_signature, bt_payload) = sample_notification(
            &signer,
            WebhookKind::TransactionSettled,
            Some(NotificationTransaction::new("txn_1").with_amount("10.00", "USD")),
        )
        .unwrap();

        assert!(bt_payload.ends_with('\n'));
        signer.verify(&bt_signature, &bt_payload).unwrap();

        let notification = WebhookNotification::from_payload(&bt_payload).unwrap();
        assert_eq!(notification.kind, WebhookKind::TransactionSettled);
        assert_eq!(
            notification.transaction.unwrap().amount.as_deref(),
            Some("10.00")
        );
    }
}
