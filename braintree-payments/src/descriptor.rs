//! Dynamic descriptors shown on the customer's statement

use crate::address::truncate;
use serde::{Deserialize, Serialize};

/// Maximum URL descriptor length
pub const URL_MAX: usize = 13;
/// Maximum phone descriptor length
pub const PHONE_MAX: usize = 14;

/// Descriptor values as configured by the merchant, unvalidated
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorSettings {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl DescriptorSettings {
    /// Problems with the configured values, for admin display
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Some(name) = non_empty(&self.name) {
            if !is_valid_name(name) {
                warnings.push(format!(
                    "Name descriptor \"{name}\" is invalid and will not be sent"
                ));
            }
        }
        if let Some(phone) = non_empty(&self.phone) {
            if !is_valid_phone(phone) {
                warnings.push(format!(
                    "Phone descriptor \"{phone}\" is invalid and will not be sent"
                ));
            }
        }
        warnings
    }
}

/// Descriptor block attached to a sale
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DynamicDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl DynamicDescriptor {
    /// Keep only the valid configured values.
    ///
    /// Invalid values are dropped rather than failing the checkout.
    pub fn from_settings(settings: &DescriptorSettings) -> Self {
        Self {
            name: non_empty(&settings.name)
                .filter(|name| is_valid_name(name))
                .map(str::to_string),
            phone: non_empty(&settings.phone)
                .filter(|phone| is_valid_phone(phone))
                .map(normalize_phone),
            url: non_empty(&settings.url).map(|url| truncate(url, URL_MAX)),
        }
    }

    /// Whether no field survived validation
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.url.is_none()
    }
}

/// Validate a name descriptor.
///
/// The value is `COMPANY*PRODUCT` with exactly one `*`; a company part of
/// 3, 7 or 12 characters allows a product part of at most 18, 14 or 9.
pub fn is_valid_name(value: &str) -> bool {
    let mut parts = value.split('*');
    let (Some(company), Some(product), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    let product_max = match company.chars().count() {
        3 => 18,
        7 => 14,
        12 => 9,
        _ => return false,
    };

    product.chars().count() <= product_max
}

/// Validate a phone descriptor: at most 14 characters, only digits and
/// `-().`, exactly 10 digits.
///
/// Plain spaces are accepted on top of that set so that the conventional
/// `(555) 555-1234` form validates; [`normalize_phone`] strips them before the
/// descriptor is sent. Any other whitespace is rejected.
pub fn is_valid_phone(value: &str) -> bool {
    if value.chars().count() > PHONE_MAX {
        return false;
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '-' | '(' | ')' | '.' | ' '))
    {
        return false;
    }
    value.chars().filter(char::is_ascii_digit).count() == 10
}

/// Phone descriptor as sent to the processor
pub fn normalize_phone(value: &str) -> String {
    value.chars().filter(|c| *c != ' ').collect()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
