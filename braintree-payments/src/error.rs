//! Error types for payment processing

use thiserror::Error;

/// Payment error types
#[derive(Error, Debug)]
pub enum PaymentError {
    /// A processor response did not carry the token needed to save the payment method
    #[error("{0}")]
    MissingToken(String),

    /// Neither a saved token nor a one-time nonce was supplied
    #[error("Payment credential missing: a payment token or nonce is required")]
    MissingPaymentCredential,

    /// The response named an instrument type this crate does not parse
    #[error("Unsupported payment instrument type: {0}")]
    UnsupportedInstrument(String),

    /// Invalid amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Order not found in the host store
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Attempt to replace a transaction ID outside a void/refund flow
    #[error("Order {order_id} already has transaction {existing}")]
    TransactionIdConflict { order_id: String, existing: String },

    /// Transaction not found at the processor
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Processor returned an error response
    #[error("Provider error: {0}")]
    Provider(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Host store failure
    #[error("Store error: {0}")]
    Store(String),
}

impl PaymentError {
    /// Whether the error must abort the checkout attempt
    pub fn is_fatal_to_transaction(&self) -> bool {
        matches!(
            self,
            Self::MissingToken(_) | Self::MissingPaymentCredential | Self::UnsupportedInstrument(_)
        )
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        if err.status().map(|s| s.as_u16()) == Some(401) {
            return PaymentError::Authentication(err.to_string());
        }
        PaymentError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for PaymentError {
    fn from(err: serde_json::Error) -> Self {
        PaymentError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for PaymentError {
    fn from(err: url::ParseError) -> Self {
        PaymentError::Config(err.to_string())
    }
}

/// Result type for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_token_message_is_verbatim() {
        let err = PaymentError::MissingToken("Required ACH token is missing or empty!".into());
        assert_eq!(err.to_string(), "Required ACH token is missing or empty!");
        assert!(err.is_fatal_to_transaction());
    }

    #[test]
    fn test_non_fatal_errors() {
        assert!(!PaymentError::Network("timeout".into()).is_fatal_to_transaction());
        assert!(!PaymentError::Provider("boom".into()).is_fatal_to_transaction());
    }

    #[test]
    fn test_from_serde_json() {
        let err: PaymentError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, PaymentError::Serialization(_)));
    }
}
