//! Configuration for the webhook receiver and reconciler

use braintree_payments::OrderStatus;

/// Where the receiver finds its inputs in an incoming request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    /// Query parameter that routes a request to this receiver
    pub discriminator_key: String,

    /// Required value of the discriminator parameter
    pub discriminator_value: String,

    /// Form field carrying the signature
    pub signature_field: String,

    /// Form field carrying the base64 payload
    pub payload_field: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            discriminator_key: "api".to_string(),
            discriminator_value: "braintree".to_string(),
            signature_field: "bt_signature".to_string(),
            payload_field: "bt_payload".to_string(),
        }
    }
}

impl WebhookConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for custom configuration
    pub fn builder() -> WebhookConfigBuilder {
        WebhookConfigBuilder::new()
    }
}

/// Builder for WebhookConfig
#[derive(Debug, Clone, Default)]
pub struct WebhookConfigBuilder {
    config: WebhookConfig,
}

impl WebhookConfigBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            config: WebhookConfig::default(),
        }
    }

    /// Set the routing query parameter
    pub fn discriminator(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.discriminator_key = key.into();
        self.config.discriminator_value = value.into();
        self
    }

    /// Set the signature form field name
    pub fn signature_field(mut self, field: impl Into<String>) -> Self {
        self.config.signature_field = field.into();
        self
    }

    /// Set the payload form field name
    pub fn payload_field(mut self, field: impl Into<String>) -> Self {
        self.config.payload_field = field.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> WebhookConfig {
        self.config
    }
}

/// Order statuses that stop a settlement notification from being applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Statuses meaning payment was already received
    pub paid_statuses: Vec<OrderStatus>,

    /// Closed statuses a settled notification must not reopen
    pub closed_statuses: Vec<OrderStatus>,

    /// Statuses a declined notification must not change
    pub final_statuses: Vec<OrderStatus>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            paid_statuses: vec![OrderStatus::Processing, OrderStatus::Completed],
            closed_statuses: vec![OrderStatus::Cancelled, OrderStatus::Refunded],
            final_statuses: vec![
                OrderStatus::Processing,
                OrderStatus::Completed,
                OrderStatus::Failed,
                OrderStatus::Cancelled,
                OrderStatus::Refunded,
            ],
        }
    }
}

impl ReconcilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat an additional status as paid
    pub fn with_paid_status(mut self, status: OrderStatus) -> Self {
        self.paid_statuses.push(status);
        self
    }

    /// Treat an additional status as final for declines
    pub fn with_final_status(mut self, status: OrderStatus) -> Self {
        self.final_statuses.push(status);
        self
    }

    /// Whether a settled notification should leave the order alone
    pub fn skips_settlement(&self, status: &OrderStatus) -> bool {
        self.paid_statuses.contains(status) || self.closed_statuses.contains(status)
    }

    /// Whether a declined notification should leave the order alone
    pub fn skips_decline(&self, status: &OrderStatus) -> bool {
        self.final_statuses.contains(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WebhookConfig::default();
        assert_eq!(config.discriminator_key, "api");
        assert_eq!(config.discriminator_value, "braintree");
        assert_eq!(config.signature_field, "bt_signature");
        assert_eq!(config.payload_field, "bt_payload");
    }

    #[test]
    fn test_builder() {
        let config = WebhookConfig::builder()
            .discriminator("wc-api", "wc_braintree")
            .payload_field("payload")
            .build();

        assert_eq!(config.discriminator_key, "wc-api");
        assert_eq!(config.discriminator_value, "wc_braintree");
        assert_eq!(config.payload_field, "payload");
        assert_eq!(config.signature_field, "bt_signature");
    }

    #[test]
    fn test_reconciler_guards() {
        let config = ReconcilerConfig::default();

        assert!(config.skips_settlement(&OrderStatus::Completed));
        assert!(config.skips_settlement(&OrderStatus::Refunded));
        assert!(!config.skips_settlement(&OrderStatus::OnHold));
        assert!(!config.skips_settlement(&OrderStatus::Failed));

        assert!(config.skips_decline(&OrderStatus::Failed));
        assert!(!config.skips_decline(&OrderStatus::Pending));
    }

    #[test]
    fn test_custom_statuses_do_not_block() {
        let shipped = OrderStatus::Custom("shipped".into());
        let config = ReconcilerConfig::default();
        assert!(!config.skips_settlement(&shipped));
        assert!(!config.skips_decline(&shipped));

        let config = config.with_paid_status(shipped.clone()).with_final_status(shipped.clone());
        assert!(config.skips_settlement(&shipped));
        assert!(config.skips_decline(&shipped));
    }
}
