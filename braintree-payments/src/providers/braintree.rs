//! Braintree HTTP client

use crate::{
    config::{Credentials, Environment, GatewaySettings},
    error::{PaymentError, PaymentResult},
    merchant_account::MerchantAccount,
    provider::ProcessorApi,
    request::{AmountRequest, SaleRequest},
};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// REST API version header value
const API_VERSION: &str = "2024-01-01";
/// GraphQL API version header value
pub const GRAPHQL_API_VERSION: &str = "2019-01-01";

const USER_AGENT: &str = concat!("braintree-gateway/", env!("CARGO_PKG_VERSION"));

/// How requests are authenticated
pub enum ClientAuth {
    /// Public/private key pair
    ApiKeys {
        public_key: String,
        private_key: SecretString,
    },
    /// Access token from the delegated-auth flow
    AccessToken(SecretString),
}

impl ClientAuth {
    /// Pick credentials: a delegated access token first, then API keys.
    ///
    /// Returns `None` when neither set is fully populated.
    pub fn from_credentials(credentials: &Credentials) -> Option<Self> {
        if credentials.merchant_id.trim().is_empty() {
            return None;
        }
        if let Some(token) = credentials.usable_access_token() {
            return Some(Self::AccessToken(token.clone()));
        }
        credentials.has_api_keys().then(|| Self::ApiKeys {
            public_key: credentials.public_key.clone(),
            private_key: credentials.private_key.clone(),
        })
    }

    fn header(&self) -> String {
        match self {
            Self::ApiKeys {
                public_key,
                private_key,
            } => {
                let credentials =
                    STANDARD.encode(format!("{}:{}", public_key, private_key.expose_secret()));
                format!("Basic {}", credentials)
            }
            Self::AccessToken(token) => format!("Bearer {}", token.expose_secret()),
        }
    }
}

/// Braintree API client
pub struct BraintreeClient {
    merchant_id: String,
    auth: ClientAuth,
    api_host: String,
    graphql_url: String,
    client: Client,
}

impl BraintreeClient {
    /// Create a new client
    pub fn new(merchant_id: impl Into<String>, auth: ClientAuth, environment: Environment) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            auth,
            api_host: environment.api_host().to_string(),
            graphql_url: environment.graphql_url().to_string(),
            client: Client::new(),
        }
    }

    /// Client for a gateway's settings
    pub fn from_settings(settings: &GatewaySettings) -> PaymentResult<Self> {
        let auth = ClientAuth::from_credentials(&settings.credentials).ok_or_else(|| {
            PaymentError::Config("incomplete processor credentials".to_string())
        })?;
        Ok(Self::new(
            settings.credentials.merchant_id.clone(),
            auth,
            settings.environment,
        ))
    }

    /// Override the REST host, e.g. for a mock server
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_host = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the GraphQL endpoint
    pub fn with_graphql_url(mut self, url: impl Into<String>) -> Self {
        self.graphql_url = url.into();
        self
    }

    /// Get API base URL
    fn base_url(&self) -> String {
        format!("{}/merchants/{}", self.api_host, self.merchant_id)
    }

    /// Make an authenticated API request
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url(), path))
            .header("Authorization", self.auth.header())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header("Braintree-Version", API_VERSION)
            .header("User-Agent", USER_AGENT)
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> PaymentResult<Value> {
        let response = builder.send().await?;
        self.read(response, path).await
    }

    async fn read(&self, response: Response, path: &str) -> PaymentResult<Value> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(merchant_id = %self.merchant_id, path, status = status.as_u16(), "Processor request failed");
            return Err(match status {
                StatusCode::UNAUTHORIZED => PaymentError::Authentication(error_text),
                _ => PaymentError::Provider(error_text),
            });
        }

        debug!(merchant_id = %self.merchant_id, path, "Processor request succeeded");
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ProcessorApi for BraintreeClient {
    fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    async fn sale(&self, request: &SaleRequest) -> PaymentResult<Value> {
        let path = "/transactions";
        let builder = self
            .request(Method::POST, path)
            .json(&TransactionWrapper { transaction: request });
        self.send(builder, path).await
    }

    async fn submit_for_settlement(
        &self,
        transaction_id: &str,
        amount: Option<Decimal>,
    ) -> PaymentResult<Value> {
        let path = format!("/transactions/{}/submit_for_settlement", transaction_id);
        let builder = self.request(Method::PUT, &path).json(&TransactionWrapper {
            transaction: AmountRequest::new(amount),
        });
        self.send(builder, &path).await
    }

    async fn refund(&self, transaction_id: &str, amount: Option<Decimal>) -> PaymentResult<Value> {
        let path = format!("/transactions/{}/refund", transaction_id);
        let builder = self.request(Method::POST, &path).json(&TransactionWrapper {
            transaction: AmountRequest::new(amount),
        });
        self.send(builder, &path).await
    }

    async fn void(&self, transaction_id: &str) -> PaymentResult<Value> {
        let path = format!("/transactions/{}/void", transaction_id);
        let builder = self.request(Method::PUT, &path);
        self.send(builder, &path).await
    }

    async fn find(&self, transaction_id: &str) -> PaymentResult<Value> {
        let path = format!("/transactions/{}", transaction_id);
        let response = self.request(Method::GET, &path).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(PaymentError::TransactionNotFound(transaction_id.to_string()));
        }

        let mut body = self.read(response, &path).await?;
        if let Some(transaction) = body.get_mut("transaction") {
            return Ok(transaction.take());
        }
        Ok(body)
    }

    async fn merchant_accounts(&self) -> PaymentResult<Vec<MerchantAccount>> {
        let mut accounts = Vec::new();
        let mut page = 1u32;

        loop {
            let path = format!("/merchant_accounts?page={}", page);
            let body = self.send(self.request(Method::GET, &path), &path).await?;
            let listing: MerchantAccountPage = serde_json::from_value(
                body.get("merchantAccounts").cloned().unwrap_or(body),
            )?;

            let fetched = listing.merchant_account.len();
            accounts.extend(listing.merchant_account);

            let total = listing.total_items.unwrap_or(accounts.len());
            if fetched == 0 || accounts.len() >= total {
                break;
            }
            page += 1;
        }

        Ok(accounts)
    }

    async fn generate_client_token(
        &self,
        merchant_account_id: Option<&str>,
    ) -> PaymentResult<String> {
        let path = "/client_token";
        let builder = self.request(Method::POST, path).json(&ClientTokenWrapper {
            client_token: ClientTokenRequest {
                version: 2,
                merchant_account_id,
            },
        });
        let body = self.send(builder, path).await?;

        body.pointer("/clientToken/value")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| PaymentError::Provider("client token missing from response".to_string()))
    }

    async fn graphql(&self, authorization_fingerprint: &str, query: &str) -> PaymentResult<Value> {
        let response = self
            .client
            .post(&self.graphql_url)
            .header("Authorization", format!("Bearer {}", authorization_fingerprint))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .header("Braintree-Version", GRAPHQL_API_VERSION)
            .header("User-Agent", USER_AGENT)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PaymentError::Provider(format!("HTTP {}: {}", status, error_text)));
        }

        Ok(response.json().await?)
    }
}

// Braintree API types

#[derive(Debug, Serialize)]
struct TransactionWrapper<T> {
    transaction: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientTokenWrapper<'a> {
    client_token: ClientTokenRequest<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientTokenRequest<'a> {
    version: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    merchant_account_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MerchantAccountPage {
    #[serde(default)]
    total_items: Option<usize>,
    #[serde(default)]
    merchant_account: Vec<MerchantAccount>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionMode, GatewayKind};

    #[test]
    fn test_auth_prefers_delegated_token() {
        let mut credentials = Credentials::api_keys("m", "pk", "sk");
        credentials.access_token = Some(SecretString::from("access$token".to_string()));
        assert!(matches!(
            ClientAuth::from_credentials(&credentials),
            Some(ClientAuth::ApiKeys { .. })
        ));

        credentials.connection = ConnectionMode::Delegated;
        let auth = ClientAuth::from_credentials(&credentials).unwrap();
        assert_eq!(auth.header(), "Bearer access$token");
    }

    #[test]
    fn test_auth_requires_complete_credentials() {
        assert!(ClientAuth::from_credentials(&Credentials::api_keys("m", "pk", "")).is_none());
        assert!(ClientAuth::from_credentials(&Credentials::api_keys("", "pk", "sk")).is_none());

        let settings = GatewaySettings::new(GatewayKind::CreditCard, Credentials::api_keys("m", "", ""));
        assert!(matches!(
            BraintreeClient::from_settings(&settings),
            Err(PaymentError::Config(_))
        ));
    }

    #[test]
    fn test_basic_header() {
        let auth = ClientAuth::from_credentials(&Credentials::api_keys("m", "pk", "sk")).unwrap();
        assert_eq!(auth.header(), format!("Basic {}", STANDARD.encode("pk:sk")));
    }

    #[test]
    fn test_base_url() {
        let auth = ClientAuth::from_credentials(&Credentials::api_keys("m1", "pk", "sk")).unwrap();
        let client = BraintreeClient::new("m1", auth, Environment::Production);
        assert_eq!(client.base_url(), "https://api.braintreegateway.com/merchants/m1");

        let client = client.with_base_url("http://127.0.0.1:9000/");
        assert_eq!(client.base_url(), "http://127.0.0.1:9000/merchants/m1");
    }
}
