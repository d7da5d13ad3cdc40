//! Error types for webhook operations

use braintree_payments::PaymentError;
use thiserror::Error;

/// Errors that can occur while handling a webhook
#[derive(Error, Debug)]
pub enum WebhookError {
    /// Signature or payload field missing from the request
    #[error("Signature missing from request")]
    SignatureMissing,

    /// Signature verification failed
    #[error("Signature verification failed: {0}")]
    SignatureInvalid(String),

    /// Payload could not be decoded
    #[error("Payload error: {0}")]
    PayloadError(String),

    /// Receiver is not configured to verify webhooks
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Host store failure while applying a notification
    #[error("Reconciliation failed: {0}")]
    Reconciliation(#[from] PaymentError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WebhookError {
    /// HTTP status to answer the processor with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::SignatureMissing | Self::SignatureInvalid(_) => 400,
            _ => 500,
        }
    }
}

impl From<base64::DecodeError> for WebhookError {
    fn from(err: base64::DecodeError) -> Self {
        WebhookError::PayloadError(err.to_string())
    }
}

impl From<quick_xml::DeError> for WebhookError {
    fn from(err: quick_xml::DeError) -> Self {
        WebhookError::PayloadError(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for WebhookError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        WebhookError::PayloadError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(WebhookError::SignatureMissing.status_code(), 400);
        assert_eq!(WebhookError::SignatureInvalid("bad".into()).status_code(), 400);
        assert_eq!(WebhookError::PayloadError("xml".into()).status_code(), 500);
        assert_eq!(
            WebhookError::from(PaymentError::Store("down".into())).status_code(),
            500
        );
    }
}
