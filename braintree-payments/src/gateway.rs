//! Gateway facade
//!
//! [`BraintreeGateway`] runs the checkout operations for one configured
//! gateway: it builds the request, picks the merchant account, calls the
//! processor and applies the outcome to the host's order and token stores.

use crate::config::GatewaySettings;
use crate::error::{PaymentError, PaymentResult};
use crate::money::{Currency, format_amount};
use crate::order::{Order, OrderStatus};
use crate::provider::ProcessorApi;
use crate::providers::BraintreeClient;
use crate::remote_config::{MerchantAccountCache, RemoteConfiguration};
use crate::request::{PaymentDetails, TransactionRequest};
use crate::response::{InstrumentResponse, InstrumentType, TransactionResponse};
use crate::stores::{OrderStore, PaymentTokenStore};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Payment gateway
pub struct BraintreeGateway {
    settings: GatewaySettings,
    api: Arc<dyn ProcessorApi>,
    orders: Arc<dyn OrderStore>,
    tokens: Arc<dyn PaymentTokenStore>,
    accounts: Arc<MerchantAccountCache>,
}

impl BraintreeGateway {
    /// Create a gateway over an explicit processor API
    pub fn new(
        settings: GatewaySettings,
        api: Arc<dyn ProcessorApi>,
        orders: Arc<dyn OrderStore>,
        tokens: Arc<dyn PaymentTokenStore>,
        accounts: Arc<MerchantAccountCache>,
    ) -> Self {
        Self {
            settings,
            api,
            orders,
            tokens,
            accounts,
        }
    }

    /// Create a gateway talking HTTP to the processor
    pub fn from_settings(
        settings: GatewaySettings,
        orders: Arc<dyn OrderStore>,
        tokens: Arc<dyn PaymentTokenStore>,
        accounts: Arc<MerchantAccountCache>,
    ) -> PaymentResult<Self> {
        let client = BraintreeClient::from_settings(&settings)?;
        Ok(Self::new(settings, Arc::new(client), orders, tokens, accounts))
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Get the processor API
    pub fn api(&self) -> &dyn ProcessorApi {
        self.api.as_ref()
    }

    /// Merchant accounts for this gateway's credentials
    pub async fn remote_configuration(&self, force_refresh: bool) -> Arc<RemoteConfiguration> {
        RemoteConfiguration::resolve(&self.settings, self.api.as_ref(), &self.accounts, force_refresh)
            .await
    }

    /// Operator warnings about the merchant account setup
    pub async fn diagnostics(&self) -> Vec<String> {
        self.remote_configuration(false)
            .await
            .diagnostics(&self.settings)
    }

    /// Client token for the checkout SDK, scoped to the order currency's account
    pub async fn client_token(&self, currency: &Currency) -> PaymentResult<String> {
        let merchant_account_id = self
            .remote_configuration(false)
            .await
            .select_merchant_account_id(&self.settings, currency);
        self.api
            .generate_client_token(merchant_account_id.as_deref())
            .await
    }

    /// Sale honoring the configured transaction type
    pub async fn process_payment(
        &self,
        order_id: &str,
        payment: PaymentDetails,
    ) -> PaymentResult<TransactionResponse> {
        let order = self.load(order_id).await?;
        let request = TransactionRequest::sale(&self.settings, &order, &self.scoped(&order, payment).await)?;
        self.sale(&order, request).await
    }

    /// Sale and capture
    pub async fn charge(
        &self,
        order_id: &str,
        payment: PaymentDetails,
    ) -> PaymentResult<TransactionResponse> {
        let order = self.load(order_id).await?;
        let request = TransactionRequest::charge(&self.settings, &order, &self.scoped(&order, payment).await)?;
        self.sale(&order, request).await
    }

    /// Authorize only; the order is put on hold until captured
    pub async fn authorize(
        &self,
        order_id: &str,
        payment: PaymentDetails,
    ) -> PaymentResult<TransactionResponse> {
        let order = self.load(order_id).await?;
        let request =
            TransactionRequest::authorization(&self.settings, &order, &self.scoped(&order, payment).await)?;
        self.sale(&order, request).await
    }

    /// Capture an authorized order, in full when `amount` is `None`
    pub async fn capture(
        &self,
        order_id: &str,
        amount: Option<Decimal>,
    ) -> PaymentResult<TransactionResponse> {
        let order = self.load(order_id).await?;
        let transaction_id = Self::require_transaction(&order, "capture")?;

        let response = self
            .execute(&TransactionRequest::capture(transaction_id, amount))
            .await?;
        Self::ensure_approved(&response)?;

        self.orders.payment_complete(&order.id, transaction_id).await?;
        self.orders
            .add_note(
                &order.id,
                &format!(
                    "Transaction captured (Transaction ID: {})\nAmount: {} {}",
                    transaction_id,
                    order.currency,
                    format_amount(response.amount().unwrap_or(order.total))
                ),
            )
            .await?;

        info!(order_id = %order.id, transaction_id, "Authorization captured");
        Ok(response)
    }

    /// Refund an order's transaction, in full when `amount` is `None`
    pub async fn refund(
        &self,
        order_id: &str,
        amount: Option<Decimal>,
    ) -> PaymentResult<TransactionResponse> {
        let order = self.load(order_id).await?;
        let transaction_id = Self::require_transaction(&order, "refund")?;
        if amount.is_some_and(|a| a <= Decimal::ZERO || a > order.total) {
            return Err(PaymentError::InvalidAmount(format!(
                "refund amount must be between 0 and {}",
                format_amount(order.total)
            )));
        }

        let response = self
            .execute(&TransactionRequest::refund(transaction_id, amount))
            .await?;
        Self::ensure_approved(&response)?;

        let refunded = response.amount().or(amount).unwrap_or(order.total);
        let note = format!(
            "Refunded {} {} (Refund transaction ID: {})",
            order.currency,
            format_amount(refunded),
            response.transaction_id().unwrap_or_default()
        );

        if refunded >= order.total {
            self.orders
                .update_status(&order.id, OrderStatus::Refunded, Some(&note))
                .await?;
        } else {
            self.orders.add_note(&order.id, &note).await?;
        }

        info!(order_id = %order.id, transaction_id, amount = %refunded, "Transaction refunded");
        Ok(response)
    }

    /// Void an unsettled transaction and cancel the order
    pub async fn void(&self, order_id: &str) -> PaymentResult<TransactionResponse> {
        let order = self.load(order_id).await?;
        let transaction_id = Self::require_transaction(&order, "void")?.to_string();

        let response = self.execute(&TransactionRequest::void(&transaction_id)).await?;
        Self::ensure_approved(&response)?;

        self.orders.replace_transaction_id(&order.id, None).await?;
        self.orders
            .update_status(
                &order.id,
                OrderStatus::Cancelled,
                Some(&format!("Transaction voided (Transaction ID: {})", transaction_id)),
            )
            .await?;

        info!(order_id = %order.id, transaction_id = %transaction_id, "Transaction voided");
        Ok(response)
    }

    /// Fetch a transaction from the processor
    pub async fn find(&self, transaction_id: &str) -> PaymentResult<TransactionResponse> {
        self.execute(&TransactionRequest::find(transaction_id)).await
    }

    async fn load(&self, order_id: &str) -> PaymentResult<Order> {
        self.orders
            .get(order_id)
            .await?
            .ok_or_else(|| PaymentError::OrderNotFound(order_id.to_string()))
    }

    /// Fill in the merchant account when the caller did not pick one
    async fn scoped(&self, order: &Order, mut payment: PaymentDetails) -> PaymentDetails {
        if payment.merchant_account_id.as_deref().is_none_or(|id| id.trim().is_empty()) {
            payment.merchant_account_id = self
                .remote_configuration(false)
                .await
                .select_merchant_account_id(&self.settings, &order.currency);
        }
        payment
    }

    async fn execute(&self, request: &TransactionRequest) -> PaymentResult<TransactionResponse> {
        debug!(operation = request.operation(), "Sending processor request");
        let reply = self.api.execute(request).await?;
        TransactionResponse::parse_with_fallback(reply, InstrumentType::for_gateway(self.settings.gateway))
    }

    async fn sale(
        &self,
        order: &Order,
        request: TransactionRequest,
    ) -> PaymentResult<TransactionResponse> {
        let (capture, tokenize) = match &request {
            TransactionRequest::Sale(sale) => (
                sale.options.submit_for_settlement,
                sale.options.store_in_vault_on_success,
            ),
            _ => (false, false),
        };

        let response = self.execute(&request).await?;
        if let Err(e) = Self::ensure_approved(&response) {
            warn!(order_id = %order.id, error = %e, "Sale declined");
            self.orders
                .update_status(&order.id, OrderStatus::Failed, Some(&e.to_string()))
                .await?;
            return Err(e);
        }

        let transaction_id = response
            .transaction_id()
            .ok_or_else(|| PaymentError::Provider("processor returned no transaction ID".to_string()))?;

        if capture && response.as_ach().is_some() {
            // bank debits are paid only once the settlement webhook arrives
            self.orders.set_transaction_id(&order.id, transaction_id).await?;
            self.orders
                .update_status(
                    &order.id,
                    OrderStatus::OnHold,
                    Some("ACH Direct Debit payment submitted. Awaiting bank settlement (3-5 business days)."),
                )
                .await?;
        } else if capture {
            self.orders.payment_complete(&order.id, transaction_id).await?;
        } else {
            self.orders.set_transaction_id(&order.id, transaction_id).await?;
            self.orders
                .update_status(
                    &order.id,
                    OrderStatus::OnHold,
                    Some(&format!(
                        "Transaction authorized (Transaction ID: {})",
                        transaction_id
                    )),
                )
                .await?;
        }

        info!(
            order_id = %order.id,
            transaction_id,
            instrument = %response.instrument_type(),
            captured = capture,
            "Sale approved"
        );

        // the order already records the payment; a token failure is reported
        // without rolling that back
        if tokenize {
            if let Some(customer) = order.customer_user_id.as_deref() {
                if let Err(e) = self.save_token(customer, &response).await {
                    error!(order_id = %order.id, transaction_id, error = %e, "Failed to save payment method");
                    self.orders
                        .add_note(&order.id, &format!("Payment method could not be saved: {}", e))
                        .await?;
                    return Err(e);
                }
            }
        }

        Ok(response)
    }

    async fn save_token(&self, customer: &str, response: &TransactionResponse) -> PaymentResult<()> {
        let token = response.payment_token()?;
        debug!(customer, token_id = token.id(), "Saving payment method");
        self.tokens.save(customer, token).await
    }

    fn require_transaction<'a>(order: &'a Order, operation: &str) -> PaymentResult<&'a str> {
        order.transaction_id().ok_or_else(|| {
            PaymentError::Validation(format!(
                "order {} has no transaction to {}",
                order.id, operation
            ))
        })
    }

    fn ensure_approved(response: &TransactionResponse) -> PaymentResult<()> {
        if response.is_approved() {
            return Ok(());
        }
        let reason = response
            .message()
            .or_else(|| response.processor_response_text())
            .or_else(|| response.gateway_rejection_reason())
            .unwrap_or("transaction was not approved");
        Err(PaymentError::Provider(reason.to_string()))
    }
}
