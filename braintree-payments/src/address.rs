//! Address, customer and line-item normalization
//!
//! Turns host order fields into the shapes the processor expects.

use crate::country;
use crate::money::format_amount;
use crate::order::{Address, LineItem, Order};
use rust_decimal::Decimal;
use serde::Serialize;

/// Maximum line item name length accepted by the processor
pub const LINE_ITEM_NAME_MAX: usize = 35;
/// Maximum product code length accepted by the processor
pub const PRODUCT_CODE_MAX: usize = 12;
/// Maximum customer phone length accepted by the processor
pub const CUSTOMER_PHONE_MAX: usize = 14;

/// Billing or shipping address in processor form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorAddress {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub first_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub last_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub company: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub street_address: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub extended_address: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub locality: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub region: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub postal_code: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub country_code_alpha2: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code_alpha3: Option<&'static str>,
}

impl ProcessorAddress {
    /// Billing address, alpha-2 country only
    pub fn billing(address: &Address) -> Self {
        Self {
            first_name: address.first_name.clone(),
            last_name: address.last_name.clone(),
            company: address.company.clone(),
            street_address: address.address_1.clone(),
            extended_address: address.address_2.clone(),
            locality: address.city.clone(),
            region: address.state.clone(),
            postal_code: address.postcode.clone(),
            country_code_alpha2: address.country.clone(),
            country_code_alpha3: None,
        }
    }

    /// Shipping address, with the alpha-3 country code added for Level 3 data
    pub fn shipping(address: &Address) -> Self {
        Self {
            country_code_alpha3: country::alpha3(&address.country),
            ..Self::billing(address)
        }
    }
}

/// Inline customer details, sent when no processor customer ID is known
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub first_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub last_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub company: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub phone: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub email: String,
}

impl CustomerDetails {
    pub fn from_billing(billing: &Address) -> Self {
        Self {
            first_name: billing.first_name.clone(),
            last_name: billing.last_name.clone(),
            company: billing.company.clone(),
            phone: sanitize_phone(&billing.phone),
            email: billing.email.clone(),
        }
    }
}

/// Level 3 line item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorLineItem {
    pub name: String,
    pub kind: &'static str,
    pub quantity: String,
    pub unit_amount: String,
    pub unit_tax_amount: String,
    pub total_amount: String,
    pub tax_amount: String,
    pub discount_amount: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub product_code: String,
}

impl ProcessorLineItem {
    /// Convert one order line, or `None` when the processor would reject it.
    ///
    /// Lines with a pre-tax total of zero or less fail processor validation,
    /// and lines without a quantity have no unit amount.
    pub fn from_line(item: &LineItem) -> Option<Self> {
        if item.total <= Decimal::ZERO || item.quantity == 0 {
            return None;
        }

        let quantity = Decimal::from(item.quantity);
        Some(Self {
            name: truncate(&item.name, LINE_ITEM_NAME_MAX),
            kind: "debit",
            quantity: item.quantity.to_string(),
            unit_amount: format_amount(item.subtotal / quantity),
            unit_tax_amount: format_amount(item.tax / quantity),
            total_amount: format_amount(item.total),
            tax_amount: format_amount(item.tax),
            discount_amount: format_amount(item.subtotal - item.total),
            product_code: truncate(item.sku.as_deref().unwrap_or_default(), PRODUCT_CODE_MAX),
        })
    }
}

/// All Level 3 line items for an order
pub fn line_items(order: &Order) -> Vec<ProcessorLineItem> {
    order
        .line_items
        .iter()
        .filter_map(ProcessorLineItem::from_line)
        .collect()
}

/// Keep digits and `-().`, then truncate to the processor limit
pub fn sanitize_phone(phone: &str) -> String {
    let cleaned: String = phone
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '-' | '(' | ')' | '.'))
        .collect();
    truncate(&cleaned, CUSTOMER_PHONE_MAX)
}

/// Truncate to at most `max` characters
pub(crate) fn truncate(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}
