//! Gateway settings
//!
//! Settings can be read from TOML or JSON documents, or from prefixed
//! environment variables (after loading a `.env` file):
//!
//! ```text
//! BRAINTREE_GATEWAY=credit_card
//! BRAINTREE_ENVIRONMENT=sandbox
//! BRAINTREE_MERCHANT_ID=abc123
//! BRAINTREE_PUBLIC_KEY=pk
//! BRAINTREE_PRIVATE_KEY=sk
//! BRAINTREE_MERCHANT_ACCOUNT_ID_EUR=store_eur
//! BRAINTREE_DESCRIPTOR_NAME=ABC*STORE
//! ```

use crate::descriptor::DescriptorSettings;
use crate::money::Currency;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while loading or validating settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Trait for validating configuration
pub trait Validate {
    fn validate(&self) -> ConfigResult<()>;
}

/// Payment gateway a settings block belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    CreditCard,
    #[serde(rename = "paypal")]
    PayPal,
    Venmo,
    Ach,
    ApplePay,
    GooglePay,
    LocalPayments,
    Sepa,
}

impl GatewayKind {
    /// Identifier used on orders and in settings
    pub fn id(&self) -> &'static str {
        match self {
            Self::CreditCard => "braintree_credit_card",
            Self::PayPal => "braintree_paypal",
            Self::Venmo => "braintree_venmo",
            Self::Ach => "braintree_ach",
            Self::ApplePay => "braintree_apple_pay",
            Self::GooglePay => "braintree_google_pay",
            Self::LocalPayments => "braintree_local_payments",
            Self::Sepa => "braintree_sepa",
        }
    }

    /// Human-readable name
    pub fn title(&self) -> &'static str {
        match self {
            Self::CreditCard => "Credit Card",
            Self::PayPal => "PayPal",
            Self::Venmo => "Venmo",
            Self::Ach => "ACH Direct Debit",
            Self::ApplePay => "Apple Pay",
            Self::GooglePay => "Google Pay",
            Self::LocalPayments => "Local Payments",
            Self::Sepa => "SEPA Direct Debit",
        }
    }

    /// Whether payments through this gateway are card-like
    pub fn is_card(&self) -> bool {
        matches!(self, Self::CreditCard | Self::ApplePay | Self::GooglePay)
    }
}

impl FromStr for GatewayKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let normalized = normalized.trim_start_matches("braintree_");
        match normalized {
            "credit_card" | "card" => Ok(Self::CreditCard),
            "paypal" => Ok(Self::PayPal),
            "venmo" => Ok(Self::Venmo),
            "ach" => Ok(Self::Ach),
            "apple_pay" => Ok(Self::ApplePay),
            "google_pay" => Ok(Self::GooglePay),
            "local_payments" => Ok(Self::LocalPayments),
            "sepa" => Ok(Self::Sepa),
            other => Err(ConfigError::ParseError(format!(
                "unknown gateway \"{other}\""
            ))),
        }
    }
}

impl fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Processor environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    #[default]
    Sandbox,
}

impl Environment {
    pub fn is_sandbox(&self) -> bool {
        matches!(self, Self::Sandbox)
    }

    /// REST API host
    pub fn api_host(&self) -> &'static str {
        match self {
            Self::Production => "https://api.braintreegateway.com",
            Self::Sandbox => "https://api.sandbox.braintreegateway.com",
        }
    }

    /// GraphQL endpoint
    pub fn graphql_url(&self) -> &'static str {
        match self {
            Self::Production => "https://payments.braintree-api.com/graphql",
            Self::Sandbox => "https://payments.sandbox.braintree-api.com/graphql",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "live" => Ok(Self::Production),
            "sandbox" | "test" => Ok(Self::Sandbox),
            other => Err(ConfigError::ParseError(format!(
                "unknown environment \"{other}\""
            ))),
        }
    }
}

/// How the merchant connected their processor account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// API keys entered by hand
    #[default]
    Manual,
    /// Delegated-auth flow that issued an access token
    Delegated,
}

/// Processor credentials
#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub merchant_id: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default = "empty_secret")]
    pub private_key: SecretString,
    #[serde(default)]
    pub access_token: Option<SecretString>,
    #[serde(default)]
    pub connection: ConnectionMode,
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

impl Credentials {
    /// API key credentials
    pub fn api_keys(
        merchant_id: impl Into<String>,
        public_key: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            public_key: public_key.into(),
            private_key: SecretString::from(private_key.into()),
            access_token: None,
            connection: ConnectionMode::Manual,
        }
    }

    /// Access token issued by the delegated-auth flow
    pub fn access_token(merchant_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            public_key: String::new(),
            private_key: empty_secret(),
            access_token: Some(SecretString::from(token.into())),
            connection: ConnectionMode::Delegated,
        }
    }

    /// Access token when connected through the delegated-auth flow
    pub fn usable_access_token(&self) -> Option<&SecretString> {
        if self.connection != ConnectionMode::Delegated {
            return None;
        }
        self.access_token
            .as_ref()
            .filter(|token| !token.expose_secret().is_empty())
    }

    /// Whether merchant ID and both API keys are populated
    pub fn has_api_keys(&self) -> bool {
        !self.merchant_id.is_empty()
            && !self.public_key.is_empty()
            && !self.private_key.expose_secret().is_empty()
    }

    /// Whether any usable credential set is present
    pub fn is_complete(&self) -> bool {
        (!self.merchant_id.is_empty() && self.usable_access_token().is_some())
            || self.has_api_keys()
    }
}

/// Whether a sale settles immediately or is only authorized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    #[default]
    Charge,
    Authorization,
}

/// Settings for one gateway
#[derive(Debug, Deserialize)]
pub struct GatewaySettings {
    pub gateway: GatewayKind,
    #[serde(default)]
    pub environment: Environment,
    pub credentials: Credentials,
    /// Merchant account ID per currency code
    #[serde(default)]
    pub merchant_account_ids: HashMap<String, String>,
    #[serde(default)]
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub tokenization_enabled: bool,
    #[serde(default)]
    pub require_3ds: bool,
    /// Partner channel sent with every sale
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub ships_from_postal_code: Option<String>,
    #[serde(default)]
    pub descriptor: DescriptorSettings,
    /// Amount override honoured only in the sandbox
    #[serde(default)]
    pub test_amount: Option<Decimal>,
}

impl GatewaySettings {
    /// Settings with defaults for everything except gateway and credentials
    pub fn new(gateway: GatewayKind, credentials: Credentials) -> Self {
        Self {
            gateway,
            environment: Environment::default(),
            credentials,
            merchant_account_ids: HashMap::new(),
            transaction_type: TransactionType::default(),
            tokenization_enabled: false,
            require_3ds: false,
            channel: None,
            ships_from_postal_code: None,
            descriptor: DescriptorSettings::default(),
            test_amount: None,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_merchant_account_id(
        mut self,
        currency: impl AsRef<str>,
        merchant_account_id: impl Into<String>,
    ) -> Self {
        self.merchant_account_ids.insert(
            currency.as_ref().to_ascii_lowercase(),
            merchant_account_id.into(),
        );
        self
    }

    pub fn with_transaction_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = transaction_type;
        self
    }

    pub fn with_descriptor(mut self, descriptor: DescriptorSettings) -> Self {
        self.descriptor = descriptor;
        self
    }

    pub fn with_test_amount(mut self, amount: Decimal) -> Self {
        self.test_amount = Some(amount);
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Configured merchant account for a currency
    pub fn merchant_account_id(&self, currency: &Currency) -> Option<&str> {
        self.merchant_account_ids
            .iter()
            .find(|(code, _)| code.eq_ignore_ascii_case(currency.code()))
            .map(|(_, id)| id.as_str())
            .filter(|id| !id.is_empty())
    }

    /// Sandbox-only amount override
    pub fn effective_test_amount(&self) -> Option<Decimal> {
        self.test_amount.filter(|_| self.environment.is_sandbox())
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Parse a JSON document
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load from a `.toml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            other => Err(ConfigError::LoadError(format!(
                "unsupported settings file extension: {other:?}"
            ))),
        }
    }

    /// Load from prefixed environment variables, reading `.env` first if present
    pub fn from_env(prefix: &str) -> ConfigResult<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(ConfigError::LoadError(e.to_string()));
            }
        }
        Self::from_vars(prefix, std::env::vars())
    }

    /// Build from an iterator of `(KEY, value)` pairs using the given prefix
    pub fn from_vars<I, K, V>(prefix: &str, vars: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let prefix = format!("{}_", prefix.trim_end_matches('_').to_uppercase());
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter_map(|(key, value)| {
                key.as_ref()
                    .strip_prefix(&prefix)
                    .map(|key| (key.to_lowercase(), value.into()))
            })
            .collect();

        let required = |key: &str| {
            vars.get(key)
                .cloned()
                .ok_or_else(|| ConfigError::LoadError(format!("{prefix}{} is not set", key.to_uppercase())))
        };
        let optional = |key: &str| vars.get(key).filter(|v| !v.is_empty()).cloned();
        let flag = |key: &str| {
            vars.get(key)
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
                .unwrap_or(false)
        };

        let gateway = required("gateway")?.parse()?;
        let environment = optional("environment")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or_default();

        let access_token = optional("access_token").map(SecretString::from);
        let credentials = Credentials {
            merchant_id: required("merchant_id")?,
            public_key: optional("public_key").unwrap_or_default(),
            private_key: SecretString::from(optional("private_key").unwrap_or_default()),
            connection: if access_token.is_some() {
                ConnectionMode::Delegated
            } else {
                ConnectionMode::Manual
            },
            access_token,
        };

        let merchant_account_ids = vars
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix("merchant_account_id_")
                    .map(|currency| (currency.to_string(), value.clone()))
            })
            .collect();

        let transaction_type = match optional("transaction_type").as_deref() {
            Some("authorization") => TransactionType::Authorization,
            Some("charge") | None => TransactionType::Charge,
            Some(other) => {
                return Err(ConfigError::ParseError(format!(
                    "unknown transaction type \"{other}\""
                )));
            }
        };

        let test_amount = optional("test_amount")
            .map(|v| {
                Decimal::from_str(&v)
                    .map_err(|e| ConfigError::ParseError(format!("test_amount: {e}")))
            })
            .transpose()?;

        Ok(Self {
            gateway,
            environment,
            credentials,
            merchant_account_ids,
            transaction_type,
            tokenization_enabled: flag("tokenization_enabled"),
            require_3ds: flag("require_3ds"),
            channel: optional("channel"),
            ships_from_postal_code: optional("ships_from_postal_code"),
            descriptor: DescriptorSettings {
                name: optional("descriptor_name"),
                phone: optional("descriptor_phone"),
                url: optional("descriptor_url"),
            },
            test_amount,
        })
    }

    /// Non-fatal problems worth showing an operator
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = self.descriptor.warnings();
        if self.test_amount.is_some() && !self.environment.is_sandbox() {
            warnings.push("Test amount is ignored in the production environment".to_string());
        }
        warnings
    }
}

impl Validate for GatewaySettings {
    fn validate(&self) -> ConfigResult<()> {
        if self.credentials.merchant_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "merchant_id cannot be empty".to_string(),
            ));
        }
        if !self.credentials.is_complete() {
            return Err(ConfigError::ValidationError(
                "either an access token or public and private keys are required".to_string(),
            ));
        }
        if let Some(amount) = self.test_amount {
            if amount <= Decimal::ZERO {
                return Err(ConfigError::ValidationError(
                    "test_amount must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }
}
