//! Wire shapes of processor replies
//!
//! Every field is optional: the processor omits or nulls fields depending on
//! the call type and instrument, and empty strings are treated as absent by
//! the accessors.

use serde::{Deserialize, Deserializer};

/// Result envelope returned by sale, capture, refund and void
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResult {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub transaction: Option<RawTransaction>,
    /// Present on verification-only results
    #[serde(default)]
    pub payment_method: Option<RawPaymentMethod>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPaymentMethod {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub amount: Option<String>,
    #[serde(default)]
    pub currency_iso_code: Option<String>,
    #[serde(default)]
    pub merchant_account_id: Option<String>,
    #[serde(default)]
    pub payment_instrument_type: Option<String>,
    #[serde(default)]
    pub processor_authorization_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub processor_response_code: Option<String>,
    #[serde(default)]
    pub processor_response_text: Option<String>,
    #[serde(default)]
    pub gateway_rejection_reason: Option<String>,
    #[serde(default)]
    pub avs_error_response_code: Option<String>,
    #[serde(default)]
    pub avs_postal_code_response_code: Option<String>,
    #[serde(default)]
    pub avs_street_address_response_code: Option<String>,
    #[serde(default)]
    pub cvv_response_code: Option<String>,
    #[serde(default)]
    pub customer_details: Option<RawCustomer>,
    #[serde(default)]
    pub billing_details: Option<RawAddress>,
    #[serde(default)]
    pub risk_data: Option<RawRiskData>,
    #[serde(default, rename = "threeDSecureInfo")]
    pub three_d_secure_info: Option<RawThreeDSecure>,
    #[serde(default)]
    pub credit_card_details: Option<RawCard>,
    #[serde(default)]
    pub apple_pay_card_details: Option<RawCard>,
    #[serde(default)]
    pub google_pay_card_details: Option<RawCard>,
    #[serde(default)]
    pub paypal_details: Option<RawPayPal>,
    #[serde(default)]
    pub venmo_account: Option<RawVenmo>,
    #[serde(default)]
    pub us_bank_account_details: Option<RawUsBankAccount>,
    /// Alternate name used by some call types
    #[serde(default)]
    pub us_bank_account: Option<RawUsBankAccount>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCustomer {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAddress {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRiskData {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub decision: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawThreeDSecure {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub liability_shifted: Option<bool>,
    #[serde(default)]
    pub liability_shift_possible: Option<bool>,
    #[serde(default)]
    pub enrolled: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCard {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub bin: Option<String>,
    #[serde(default)]
    pub last4: Option<String>,
    #[serde(default)]
    pub masked_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub expiration_month: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub expiration_year: Option<String>,
    #[serde(default)]
    pub card_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPayPal {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub authorization_id: Option<String>,
    #[serde(default)]
    pub payer_email: Option<String>,
    #[serde(default)]
    pub payer_id: Option<String>,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub debug_id: Option<String>,
    #[serde(default)]
    pub capture_id: Option<String>,
    #[serde(default)]
    pub refund_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub transaction_fee_amount: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVenmo {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub authorization_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub venmo_user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUsBankAccount {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub last4: Option<String>,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub account_holder_name: Option<String>,
    #[serde(default)]
    pub routing_number: Option<String>,
    #[serde(default)]
    pub bank_name: Option<String>,
}

/// Accept strings, numbers and booleans for fields the processor types loosely
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Non-empty string view of an optional field
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Owned non-empty copy of an optional field
pub(crate) fn present_owned(value: &Option<String>) -> Option<String> {
    present(value).map(str::to_string)
}
