//! Money and currency types

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ISO 4217 currency code, always stored uppercase
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Create from a currency code in any case
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    /// US dollar
    pub fn usd() -> Self {
        Self::new("USD")
    }

    /// Euro
    pub fn eur() -> Self {
        Self::new("EUR")
    }

    /// Get currency code string
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Lowercase code, used as the settings key for per-currency merchant accounts
    pub fn settings_key(&self) -> String {
        self.0.to_ascii_lowercase()
    }

    /// Is a zero-decimal currency
    pub fn is_zero_decimal(&self) -> bool {
        matches!(
            self.0.as_str(),
            "BIF" | "CLP" | "DJF" | "GNF" | "JPY" | "KMF" | "KRW" | "PYG" | "RWF" | "UGX" | "VND"
                | "VUV" | "XAF" | "XOF" | "XPF"
        )
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::usd()
    }
}

impl From<String> for Currency {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl From<&str> for Currency {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Money amount with currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in major units (e.g. 29.99)
    pub amount: Decimal,
    /// Currency
    pub currency: Currency,
}

impl Money {
    /// Create a new money amount
    pub fn new(amount: Decimal, currency: impl Into<Currency>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }

    /// Amount formatted for the processor API
    pub fn formatted_amount(&self) -> String {
        format_amount(self.amount)
    }

    /// Whether a processor-reported amount and currency describe this value
    pub fn matches(&self, amount: &str, currency: &str) -> bool {
        Currency::new(currency) == self.currency
            && parse_amount(amount).is_some_and(|reported| reported == self.amount)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.currency, self.formatted_amount())
    }
}

/// Format an amount with exactly two decimal places
pub fn format_amount(amount: Decimal) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

/// Parse a processor amount string, returning `None` for anything non-numeric
pub fn parse_amount(amount: &str) -> Option<Decimal> {
    Decimal::from_str(amount.trim()).ok()
}
