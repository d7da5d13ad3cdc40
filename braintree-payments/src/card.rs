//! Card brand detection

use serde::{Deserialize, Serialize};
use std::fmt;

/// Card brand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Visa,
    Mastercard,
    Amex,
    Discover,
    Diners,
    Jcb,
    Maestro,
    UnionPay,
}

impl CardType {
    /// Detect the brand from a card number or bank identification number.
    ///
    /// The processor's own brand label is not used so that naming stays
    /// consistent with cards saved through other gateways.
    pub fn from_bin(bin: &str) -> Option<Self> {
        let digits: String = bin.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return None;
        }

        let prefix = |len: usize| -> Option<u32> { digits.get(..len)?.parse().ok() };
        let in_range = |len: usize, low: u32, high: u32| prefix(len).is_some_and(|p| (low..=high).contains(&p));

        if in_range(2, 34, 34) || in_range(2, 37, 37) {
            Some(Self::Amex)
        } else if in_range(4, 3528, 3589) {
            Some(Self::Jcb)
        } else if in_range(3, 300, 305) || in_range(2, 36, 36) || in_range(2, 38, 39) {
            Some(Self::Diners)
        } else if in_range(4, 6011, 6011) || in_range(3, 644, 649) || in_range(2, 65, 65) {
            Some(Self::Discover)
        } else if in_range(2, 62, 62) {
            Some(Self::UnionPay)
        } else if in_range(2, 51, 55) || in_range(4, 2221, 2720) {
            Some(Self::Mastercard)
        } else if in_range(4, 5018, 5018)
            || in_range(4, 5020, 5020)
            || in_range(4, 5038, 5038)
            || in_range(4, 5893, 5893)
            || in_range(4, 6304, 6304)
            || in_range(4, 6759, 6763)
        {
            Some(Self::Maestro)
        } else if digits.starts_with('4') {
            Some(Self::Visa)
        } else {
            None
        }
    }

    /// Brand slug
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visa => "visa",
            Self::Mastercard => "mastercard",
            Self::Amex => "amex",
            Self::Discover => "discover",
            Self::Diners => "diners",
            Self::Jcb => "jcb",
            Self::Maestro => "maestro",
            Self::UnionPay => "unionpay",
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Visa => "Visa",
            Self::Mastercard => "MasterCard",
            Self::Amex => "American Express",
            Self::Discover => "Discover",
            Self::Diners => "Diners Club",
            Self::Jcb => "JCB",
            Self::Maestro => "Maestro",
            Self::UnionPay => "UnionPay",
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_bins() {
        assert_eq!(CardType::from_bin("411111"), Some(CardType::Visa));
        assert_eq!(CardType::from_bin("555555"), Some(CardType::Mastercard));
        assert_eq!(CardType::from_bin("222300"), Some(CardType::Mastercard));
        assert_eq!(CardType::from_bin("378282"), Some(CardType::Amex));
        assert_eq!(CardType::from_bin("601111"), Some(CardType::Discover));
        assert_eq!(CardType::from_bin("353011"), Some(CardType::Jcb));
        assert_eq!(CardType::from_bin("305693"), Some(CardType::Diners));
        assert_eq!(CardType::from_bin("630400"), Some(CardType::Maestro));
        assert_eq!(CardType::from_bin("621234"), Some(CardType::UnionPay));
    }

    #[test]
    fn test_unknown_bin() {
        assert_eq!(CardType::from_bin(""), None);
        assert_eq!(CardType::from_bin("999999"), None);
        assert_eq!(CardType::from_bin("abc"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(CardType::Amex.to_string(), "American Express");
        assert_eq!(CardType::Visa.as_str(), "visa");
    }
}
