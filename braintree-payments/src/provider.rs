//! Processor API trait
//!
//! Transaction calls return the raw JSON reply; parsing lives in
//! [`crate::response`] so that every transport shares one parser.

use crate::error::PaymentResult;
use crate::merchant_account::MerchantAccount;
use crate::request::{SaleRequest, TransactionRequest};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;

/// Processor API
///
/// Implemented by the HTTP client; hosts and tests may substitute their own.
#[async_trait]
pub trait ProcessorApi: Send + Sync {
    /// Get provider name
    fn name(&self) -> &'static str {
        "braintree"
    }

    /// Merchant the credentials belong to
    fn merchant_id(&self) -> &str;

    /// Create a sale
    async fn sale(&self, request: &SaleRequest) -> PaymentResult<Value>;

    /// Capture an authorized transaction
    async fn submit_for_settlement(
        &self,
        transaction_id: &str,
        amount: Option<Decimal>,
    ) -> PaymentResult<Value>;

    /// Refund a settled transaction
    async fn refund(&self, transaction_id: &str, amount: Option<Decimal>) -> PaymentResult<Value>;

    /// Void an unsettled transaction
    async fn void(&self, transaction_id: &str) -> PaymentResult<Value>;

    /// Fetch a transaction; the reply is the bare transaction object
    async fn find(&self, transaction_id: &str) -> PaymentResult<Value>;

    /// All merchant accounts, across pages
    async fn merchant_accounts(&self) -> PaymentResult<Vec<MerchantAccount>>;

    /// Base64 client token, scoped to a merchant account when given
    async fn generate_client_token(&self, merchant_account_id: Option<&str>)
        -> PaymentResult<String>;

    /// GraphQL query authorized by a client token fingerprint
    async fn graphql(&self, authorization_fingerprint: &str, query: &str) -> PaymentResult<Value>;

    /// Dispatch a built request
    async fn execute(&self, request: &TransactionRequest) -> PaymentResult<Value> {
        match request {
            TransactionRequest::Sale(sale) => self.sale(sale).await,
            TransactionRequest::SubmitForSettlement {
                transaction_id,
                amount,
            } => self.submit_for_settlement(transaction_id, *amount).await,
            TransactionRequest::Refund {
                transaction_id,
                amount,
            } => self.refund(transaction_id, *amount).await,
            TransactionRequest::Void { transaction_id } => self.void(transaction_id).await,
            TransactionRequest::Find { transaction_id } => self.find(transaction_id).await,
        }
    }
}
