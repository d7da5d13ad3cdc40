//! Merchant account resolution
//!
//! [`RemoteConfiguration`] is the processor-side account list for one
//! credential set. Fetched lists are kept in a [`MerchantAccountCache`] keyed
//! by merchant ID, so gateways sharing credentials share one entry. The cache
//! is an explicit value owned by the host and passed to whatever needs it.
//!
//! Every query degrades to an empty result when the list could not be
//! fetched; nothing here returns an error to the caller.

use crate::config::{GatewayKind, GatewaySettings};
use crate::merchant_account::MerchantAccount;
use crate::money::Currency;
use crate::provider::ProcessorApi;
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Operator-facing message when the account list could not be fetched
pub const FETCH_ERROR: &str = "Failed to fetch merchant accounts";

/// GraphQL query reporting Fastlane availability
pub const FASTLANE_QUERY: &str = "query { clientConfiguration { fastlane { enabled } } }";

/// Fetched configurations keyed by merchant ID
#[derive(Debug, Default)]
pub struct MerchantAccountCache {
    entries: DashMap<String, Arc<RemoteConfiguration>>,
    // serializes fetches so concurrent misses hit the processor once
    refresh: Mutex<()>,
}

impl MerchantAccountCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, merchant_id: &str) -> Option<Arc<RemoteConfiguration>> {
        self.entries.get(merchant_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Store a configuration under its merchant ID.
    ///
    /// Configurations without a merchant ID are returned but not cached.
    pub fn insert(&self, configuration: RemoteConfiguration) -> Arc<RemoteConfiguration> {
        let configuration = Arc::new(configuration);
        if let Some(merchant_id) = configuration.merchant_id() {
            self.entries
                .insert(merchant_id.to_string(), Arc::clone(&configuration));
        }
        configuration
    }

    /// Drop the entry for a merchant, returning whether one existed
    pub fn invalidate(&self, merchant_id: &str) -> bool {
        self.entries.remove(merchant_id).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Merchant accounts for one credential set
#[derive(Debug, Clone, Default)]
pub struct RemoteConfiguration {
    merchant_id: Option<String>,
    accounts: Vec<MerchantAccount>,
    fetch_error: Option<String>,
    fetched_at: Option<DateTime<Utc>>,
}

impl RemoteConfiguration {
    /// Configuration for credentials that could not be used
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_accounts(merchant_id: impl Into<String>, accounts: Vec<MerchantAccount>) -> Self {
        Self {
            merchant_id: Some(merchant_id.into()),
            accounts,
            fetch_error: None,
            fetched_at: Some(Utc::now()),
        }
    }

    /// Fetch the account list through `api`
    pub async fn fetch(api: &dyn ProcessorApi) -> Self {
        let merchant_id = api.merchant_id().to_string();

        match api.merchant_accounts().await {
            Ok(accounts) => {
                info!(merchant_id = %merchant_id, count = accounts.len(), "Fetched merchant accounts");
                Self::from_accounts(merchant_id, accounts)
            }
            Err(e) => {
                error!(merchant_id = %merchant_id, error = %e, "Failed to fetch merchant accounts");
                Self {
                    merchant_id: Some(merchant_id),
                    accounts: Vec::new(),
                    fetch_error: Some(FETCH_ERROR.to_string()),
                    fetched_at: Some(Utc::now()),
                }
            }
        }
    }

    /// Cached configuration for the settings' credentials, fetching on a miss
    /// or when `force_refresh` is set.
    ///
    /// A failed fetch is returned without replacing the cached entry.
    ///
    /// Incomplete credentials resolve to an empty configuration.
    pub async fn resolve(
        settings: &GatewaySettings,
        api: &dyn ProcessorApi,
        cache: &MerchantAccountCache,
        force_refresh: bool,
    ) -> Arc<Self> {
        if !settings.credentials.is_complete() {
            debug!(gateway = %settings.gateway, "Credentials incomplete, skipping merchant account fetch");
            return Arc::new(Self::empty());
        }

        let merchant_id = settings.credentials.merchant_id.as_str();
        if !force_refresh {
            if let Some(cached) = cache.get(merchant_id) {
                return cached;
            }
        }

        let _refresh = cache.refresh.lock().await;
        if !force_refresh {
            if let Some(cached) = cache.get(merchant_id) {
                return cached;
            }
        }

        let fetched = Self::fetch(api).await;
        if fetched.fetch_error.is_some() {
            // failures are not cached; the next resolve retries
            return Arc::new(fetched);
        }
        cache.insert(fetched)
    }

    pub fn merchant_id(&self) -> Option<&str> {
        self.merchant_id.as_deref()
    }

    pub fn merchant_accounts(&self) -> &[MerchantAccount] {
        &self.accounts
    }

    pub fn fetch_error(&self) -> Option<&str> {
        self.fetch_error.as_deref()
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    pub fn merchant_accounts_by_currency(&self, currency: &str) -> Vec<&MerchantAccount> {
        self.accounts
            .iter()
            .filter(|account| account.has_currency(currency))
            .collect()
    }

    pub fn merchant_accounts_by_payment_gateway(&self, gateway: GatewayKind) -> Vec<&MerchantAccount> {
        self.accounts
            .iter()
            .filter(|account| account.supports_gateway(gateway))
            .collect()
    }

    /// Accounts in `currency` that support `gateway`
    pub fn find_eligible_merchant_accounts(
        &self,
        currency: &str,
        gateway: GatewayKind,
    ) -> Vec<&MerchantAccount> {
        self.merchant_accounts_by_currency(currency)
            .into_iter()
            .filter(|account| account.supports_gateway(gateway))
            .collect()
    }

    /// Account by ID, or the default account when `id` is `None`
    pub fn merchant_account(&self, id: Option<&str>) -> Option<&MerchantAccount> {
        match id {
            Some(id) => self.accounts.iter().find(|account| account.id == id),
            None => self.accounts.iter().find(|account| account.is_default()),
        }
    }

    pub fn default_merchant_account(&self) -> Option<&MerchantAccount> {
        self.merchant_account(None)
    }

    /// Merchant account ID to send with a transaction.
    ///
    /// The account configured for the currency wins; otherwise an active
    /// eligible account is chosen, preferring the default one. `None` lets the
    /// processor use its default account.
    pub fn select_merchant_account_id(
        &self,
        settings: &GatewaySettings,
        currency: &Currency,
    ) -> Option<String> {
        if let Some(configured) = settings.merchant_account_id(currency) {
            return Some(configured.to_string());
        }

        let eligible: Vec<_> = self
            .find_eligible_merchant_accounts(currency.code(), settings.gateway)
            .into_iter()
            .filter(|account| account.is_active())
            .collect();

        eligible
            .iter()
            .find(|account| account.is_default())
            .or_else(|| eligible.first())
            .map(|account| account.id.clone())
    }

    /// Check Fastlane availability for `account`.
    ///
    /// The account listing does not expose this flag, so a client token is
    /// generated and its fingerprint used for a GraphQL query. Any failure
    /// leaves the flag unknown (`None`).
    pub async fn fetch_fastlane_enabled(
        &self,
        api: &dyn ProcessorApi,
        account: &mut MerchantAccount,
    ) -> Option<bool> {
        account.fastlane = None;

        // Incomplete credentials
        self.merchant_id.as_ref()?;

        let scope = (!account.is_default()).then_some(account.id.as_str());
        let client_token = match api.generate_client_token(scope).await {
            Ok(token) => token,
            Err(e) => {
                error!(merchant_account_id = %account.id, error = %e, "Error generating client token for Fastlane check");
                return None;
            }
        };

        let fingerprint = authorization_fingerprint(&client_token)?;

        let response = match api.graphql(&fingerprint, FASTLANE_QUERY).await {
            Ok(response) => response,
            Err(e) => {
                error!(merchant_account_id = %account.id, error = %e, "Error fetching Fastlane status");
                return None;
            }
        };

        let Some(enabled) = response
            .pointer("/data/clientConfiguration/fastlane/enabled")
            .and_then(Value::as_bool)
        else {
            error!(response_body = %response, "Unexpected Fastlane response body format; missing Fastlane data");
            return None;
        };

        account.fastlane = Some(enabled);
        Some(enabled)
    }

    /// Misconfiguration warnings for an operator
    pub fn diagnostics(&self, settings: &GatewaySettings) -> Vec<String> {
        if let Some(fetch_error) = &self.fetch_error {
            return vec![fetch_error.clone()];
        }
        if self.accounts.is_empty() {
            return vec!["No merchant accounts were fetched from the processor".to_string()];
        }

        let mut warnings = Vec::new();

        if self.merchant_accounts_by_payment_gateway(settings.gateway).is_empty() {
            warnings.push(format!(
                "No merchant account supports {}",
                settings.gateway.title()
            ));
        }

        let defaults: Vec<&str> = self
            .accounts
            .iter()
            .filter(|account| account.is_default())
            .map(|account| account.id.as_str())
            .collect();
        if defaults.len() > 1 {
            warnings.push(format!(
                "Several merchant accounts are flagged default ({}); \"{}\" is used",
                defaults.join(", "),
                defaults[0]
            ));
        }

        let mut configured: Vec<_> = settings.merchant_account_ids.iter().collect();
        configured.sort();

        for (currency, id) in configured {
            if id.trim().is_empty() {
                continue;
            }
            let currency = currency.to_ascii_uppercase();
            match self.merchant_account(Some(id)) {
                None => warnings.push(format!(
                    "Merchant account \"{id}\" configured for {currency} was not found"
                )),
                Some(account) if !account.has_currency(&currency) => warnings.push(format!(
                    "Merchant account \"{id}\" configured for {currency} processes {}",
                    account.currency
                )),
                Some(account) if !account.supports_gateway(settings.gateway) => {
                    warnings.push(format!(
                        "Merchant account \"{id}\" does not support {}",
                        settings.gateway.title()
                    ))
                }
                Some(_) => {}
            }
        }

        warnings
    }
}

/// Extract the authorization fingerprint from a base64 JSON client token
fn authorization_fingerprint(client_token: &str) -> Option<String> {
    let decoded = STANDARD.decode(client_token.trim()).ok()?;
    let token: Value = serde_json::from_slice(&decoded).ok()?;
    token
        .get("authorizationFingerprint")
        .and_then(Value::as_str)
        .filter(|fingerprint| !fingerprint.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::error::{PaymentError, PaymentResult};
    use crate::request::SaleRequest;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubApi {
        accounts: PaymentResult<Vec<MerchantAccount>>,
        graphql: Value,
        fetches: AtomicUsize,
    }

    impl StubApi {
        fn with_accounts(accounts: Vec<MerchantAccount>) -> Self {
            Self {
                accounts: Ok(accounts),
                graphql: serde_json::json!({"data": {"clientConfiguration": {"fastlane": {"enabled": true}}}}),
                fetches: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                accounts: Err(PaymentError::Network("connection refused".into())),
                ..Self::with_accounts(Vec::new())
            }
        }
    }

    #[async_trait]
    impl ProcessorApi for StubApi {
        fn merchant_id(&self) -> &str {
            "merchant"
        }

        async fn sale(&self, _request: &SaleRequest) -> PaymentResult<Value> {
            unreachable!()
        }

        async fn submit_for_settlement(&self, _id: &str, _amount: Option<Decimal>) -> PaymentResult<Value> {
            unreachable!()
        }

        async fn refund(&self, _id: &str, _amount: Option<Decimal>) -> PaymentResult<Value> {
            unreachable!()
        }

        async fn void(&self, _id: &str) -> PaymentResult<Value> {
            unreachable!()
        }

        async fn find(&self, _id: &str) -> PaymentResult<Value> {
            unreachable!()
        }

        async fn merchant_accounts(&self) -> PaymentResult<Vec<MerchantAccount>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            match &self.accounts {
                Ok(accounts) => Ok(accounts.clone()),
                Err(e) => Err(PaymentError::Network(e.to_string())),
            }
        }

        async fn generate_client_token(&self, _merchant_account_id: Option<&str>) -> PaymentResult<String> {
            Ok(STANDARD.encode(r#"{"authorizationFingerprint":"fp_123"}"#))
        }

        async fn graphql(&self, fingerprint: &str, _query: &str) -> PaymentResult<Value> {
            assert_eq!(fingerprint, "fp_123");
            Ok(self.graphql.clone())
        }
    }

    fn settings(gateway: GatewayKind) -> GatewaySettings {
        GatewaySettings::new(gateway, Credentials::api_keys("merchant", "pk", "sk"))
    }

    fn accounts() -> Vec<MerchantAccount> {
        vec![
            MerchantAccount::new("store_usd", "USD")
                .with_default(true)
                .with_payment_method("PAYPAL_ACCOUNT"),
            MerchantAccount::new("store_usd_ach", "USD").with_payment_method("US_BANK_ACCOUNT"),
            MerchantAccount::new("store_eur", "EUR").with_payment_method("PAYPAL_ACCOUNT"),
            MerchantAccount::new("store_eur_old", "EUR").with_status("suspended"),
        ]
    }

    #[test]
    fn test_filters_on_failed_fetch_are_empty() {
        let config = RemoteConfiguration::empty();
        assert!(config.merchant_accounts_by_currency("USD").is_empty());
        assert!(config.merchant_accounts_by_payment_gateway(GatewayKind::PayPal).is_empty());
        assert!(config.find_eligible_merchant_accounts("USD", GatewayKind::CreditCard).is_empty());
        assert!(config.default_merchant_account().is_none());
    }

    #[test]
    fn test_filters() {
        let config = RemoteConfiguration::from_accounts("merchant", accounts());
        assert_eq!(config.merchant_accounts_by_currency("usd").len(), 2);
        assert_eq!(config.merchant_accounts_by_payment_gateway(GatewayKind::PayPal).len(), 2);
        assert_eq!(config.find_eligible_merchant_accounts("EUR", GatewayKind::PayPal).len(), 1);
        assert_eq!(config.default_merchant_account().unwrap().id, "store_usd");
        assert_eq!(config.merchant_account(Some("store_eur")).unwrap().currency, "EUR");
        assert!(config.merchant_account(Some("missing")).is_none());
    }

    #[test]
    fn test_select_merchant_account_id() {
        let config = RemoteConfiguration::from_accounts("merchant", accounts());

        let configured = settings(GatewayKind::CreditCard).with_merchant_account_id("USD", "custom");
        assert_eq!(
            config.select_merchant_account_id(&configured, &Currency::usd()).as_deref(),
            Some("custom")
        );

        let card = settings(GatewayKind::CreditCard);
        assert_eq!(
            config.select_merchant_account_id(&card, &Currency::usd()).as_deref(),
            Some("store_usd")
        );
        assert_eq!(
            config.select_merchant_account_id(&settings(GatewayKind::Ach), &Currency::usd()).as_deref(),
            Some("store_usd_ach")
        );
        // suspended accounts are never picked
        assert_eq!(
            config.select_merchant_account_id(&card, &Currency::eur()).as_deref(),
            Some("store_eur")
        );
        assert_eq!(config.select_merchant_account_id(&card, &Currency::new("GBP")), None);
    }

    #[tokio::test]
    async fn test_resolve_uses_cache_until_forced() {
        let api = StubApi::with_accounts(accounts());
        let cache = MerchantAccountCache::new();
        let settings = settings(GatewayKind::PayPal);

        let first = RemoteConfiguration::resolve(&settings, &api, &cache, false).await;
        let second = RemoteConfiguration::resolve(&settings, &api, &cache, false).await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(api.fetches.load(Ordering::SeqCst), 1);

        RemoteConfiguration::resolve(&settings, &api, &cache, true).await;
        assert_eq!(api.fetches.load(Ordering::SeqCst), 2);

        assert!(cache.invalidate("merchant"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_misses_fetch_once() {
        let api = StubApi::with_accounts(accounts());
        let cache = MerchantAccountCache::new();
        let settings = settings(GatewayKind::PayPal);

        let (a, b) = tokio::join!(
            RemoteConfiguration::resolve(&settings, &api, &cache, false),
            RemoteConfiguration::resolve(&settings, &api, &cache, false),
        );
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(api.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolve_incomplete_credentials() {
        let api = StubApi::with_accounts(accounts());
        let cache = MerchantAccountCache::new();
        let settings = GatewaySettings::new(GatewayKind::CreditCard, Credentials::api_keys("merchant", "pk", ""));

        let config = RemoteConfiguration::resolve(&settings, &api, &cache, false).await;
        assert!(config.merchant_accounts().is_empty());
        assert_eq!(api.fetches.load(Ordering::SeqCst), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_failed_fetch() {
        let api = StubApi::failing();
        let config = RemoteConfiguration::fetch(&api).await;
        assert_eq!(config.fetch_error(), Some(FETCH_ERROR));
        assert!(config.merchant_accounts_by_currency("USD").is_empty());
        assert_eq!(config.diagnostics(&settings(GatewayKind::PayPal)), vec![FETCH_ERROR.to_string()]);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_retried() {
        let cache = MerchantAccountCache::new();
        let settings = settings(GatewayKind::PayPal);

        let failed = RemoteConfiguration::resolve(&settings, &StubApi::failing(), &cache, false).await;
        assert_eq!(failed.fetch_error(), Some(FETCH_ERROR));
        assert!(cache.is_empty());

        let healthy = StubApi::with_accounts(accounts());
        let config = RemoteConfiguration::resolve(&settings, &healthy, &cache, false).await;
        assert_eq!(healthy.fetches.load(Ordering::SeqCst), 1);
        assert!(config.fetch_error().is_none());
        assert_eq!(
            config.select_merchant_account_id(&settings, &Currency::usd()).as_deref(),
            Some("store_usd")
        );

        // an outage during a forced refresh keeps the last good list
        RemoteConfiguration::resolve(&settings, &StubApi::failing(), &cache, true).await;
        assert_eq!(cache.get("merchant").unwrap().merchant_accounts().len(), 4);
    }

    #[tokio::test]
    async fn test_fastlane_detection() {
        let api = StubApi::with_accounts(accounts());
        let config = RemoteConfiguration::fetch(&api).await;
        let mut account = config.default_merchant_account().unwrap().clone();

        assert_eq!(config.fetch_fastlane_enabled(&api, &mut account).await, Some(true));
        assert_eq!(account.fastlane, Some(true));

        let mut broken = StubApi::with_accounts(accounts());
        broken.graphql = serde_json::json!({"data": {}});
        assert_eq!(config.fetch_fastlane_enabled(&broken, &mut account).await, None);
        assert_eq!(account.fastlane, None);

        let unfetched = RemoteConfiguration::empty();
        assert_eq!(unfetched.fetch_fastlane_enabled(&api, &mut account).await, None);
    }

    #[test]
    fn test_fingerprint_extraction() {
        let token = STANDARD.encode(r#"{"version":2,"authorizationFingerprint":"abc"}"#);
        assert_eq!(authorization_fingerprint(&token).as_deref(), Some("abc"));
        assert_eq!(authorization_fingerprint("not base64!"), None);
        assert_eq!(authorization_fingerprint(&STANDARD.encode("[]")), None);
    }

    #[test]
    fn test_diagnostics() {
        let config = RemoteConfiguration::from_accounts("merchant", accounts());

        assert!(config.diagnostics(&settings(GatewayKind::PayPal)).is_empty());

        let venmo = settings(GatewayKind::Venmo);
        assert_eq!(config.diagnostics(&venmo), vec!["No merchant account supports Venmo".to_string()]);

        let misconfigured = settings(GatewayKind::CreditCard)
            .with_merchant_account_id("gbp", "store_gbp")
            .with_merchant_account_id("usd", "store_eur");
        let warnings = config.diagnostics(&misconfigured);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("store_gbp"));
        assert!(warnings[1].contains("processes EUR"));

        let mut doubled = accounts();
        doubled[2] = doubled[2].clone().with_default(true);
        let warnings = RemoteConfiguration::from_accounts("merchant", doubled)
            .diagnostics(&settings(GatewayKind::PayPal));
        assert_eq!(
            warnings,
            vec!["Several merchant accounts are flagged default (store_usd, store_eur); \"store_usd\" is used".to_string()]
        );

        assert_eq!(
            RemoteConfiguration::empty().diagnostics(&venmo),
            vec!["No merchant accounts were fetched from the processor".to_string()]
        );
    }
}
