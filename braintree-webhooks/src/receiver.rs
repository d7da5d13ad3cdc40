//! Webhook receiver for handling incoming notifications
//!
//! The HTTP status answered to the processor reflects only whether the
//! request could be verified and decoded. Every reconciliation outcome,
//! deliberate no-ops included, is acknowledged with 200; the processor
//! redelivers anything else hourly.

use crate::config::WebhookConfig;
use crate::notification::{WebhookKind, WebhookNotification};
use crate::reconciler::{Reconciler, Reconciliation};
use crate::{Result, WebhookError, WebhookSignature};
use std::collections::HashMap;
use tracing::{debug, error, info};

/// Incoming HTTP request, reduced to what the receiver reads
#[derive(Debug, Clone, Default)]
pub struct WebhookRequest {
    pub method: String,
    pub query: HashMap<String, String>,
    pub form: HashMap<String, String>,
}

impl WebhookRequest {
    /// Build from a raw query string and `application/x-www-form-urlencoded` body
    pub fn from_raw(method: impl Into<String>, query: &str, body: &[u8]) -> Self {
        Self {
            method: method.into(),
            query: url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
                .into_owned()
                .collect(),
            form: url::form_urlencoded::parse(body).into_owned().collect(),
        }
    }
}

/// Result of handling a request
#[derive(Debug)]
pub enum WebhookOutcome {
    /// Not addressed to this receiver
    Ignored,
    /// Verified and processed
    Acknowledged {
        kind: WebhookKind,
        reconciliation: Reconciliation,
    },
    /// Rejected without reconciliation
    Rejected { status: u16, error: WebhookError },
}

impl WebhookOutcome {
    /// HTTP status to answer with; `None` when the request is not ours
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Ignored => None,
            Self::Acknowledged { .. } => Some(200),
            Self::Rejected { status, .. } => Some(*status),
        }
    }
}

/// Receiver for incoming webhooks
pub struct WebhookReceiver {
    config: WebhookConfig,
    signature: WebhookSignature,
    reconciler: Reconciler,
}

impl WebhookReceiver {
    /// Create a receiver with the default request layout
    pub fn new(signature: WebhookSignature, reconciler: Reconciler) -> Self {
        Self {
            config: WebhookConfig::default(),
            signature,
            reconciler,
        }
    }

    pub fn with_config(mut self, config: WebhookConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    /// Whether the request is routed to this receiver
    pub fn accepts(&self, request: &WebhookRequest) -> bool {
        request.method.eq_ignore_ascii_case("POST")
            && request.query.get(&self.config.discriminator_key)
                == Some(&self.config.discriminator_value)
    }

    /// Verify a signature/payload pair and decode the notification
    pub fn parse(&self, signature: &str, payload: &str) -> Result<WebhookNotification> {
        self.signature.verify(signature, payload)?;
        WebhookNotification::from_payload(payload)
    }

    /// Handle an incoming request end to end
    pub async fn handle(&self, request: &WebhookRequest) -> WebhookOutcome {
        if !self.accepts(request) {
            debug!(method = %request.method, "Request not addressed to the webhook receiver");
            return WebhookOutcome::Ignored;
        }

        let (Some(signature), Some(payload)) = (
            request.form.get(&self.config.signature_field),
            request.form.get(&self.config.payload_field),
        ) else {
            return Self::reject(WebhookError::SignatureMissing);
        };

        let notification = match self.parse(signature, payload) {
            Ok(notification) => notification,
            Err(e) => return Self::reject(e),
        };

        match self.reconciler.process(&notification).await {
            Ok(reconciliation) => {
                info!(kind = %notification.kind, outcome = ?reconciliation, "Webhook processed");
                WebhookOutcome::Acknowledged {
                    kind: notification.kind,
                    reconciliation,
                }
            }
            Err(e) => Self::reject(e),
        }
    }

    fn reject(error: WebhookError) -> WebhookOutcome {
        let status = error.status_code();
        if status == 400 {
            error!(error = %error, "Error parsing webhook notification due to invalid signature");
        } else {
            error!(error = %error, "Error parsing webhook notification");
        }
        WebhookOutcome::Rejected { status, error }
    }
}
