//! Card and wallet responses

use super::raw::{RawCard, present, present_owned};
use super::{InstrumentResponse, InstrumentType, TransactionDetails};
use crate::card::CardType;
use crate::error::{PaymentError, PaymentResult};
use crate::token::{PaymentToken, TokenDetails};

/// Where the card data came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardSource {
    Direct,
    ApplePay,
    GooglePay,
}

impl CardSource {
    pub fn instrument_type(&self) -> InstrumentType {
        match self {
            Self::Direct => InstrumentType::CreditCard,
            Self::ApplePay => InstrumentType::ApplePayCard,
            Self::GooglePay => InstrumentType::GooglePayCard,
        }
    }

    pub fn is_wallet(&self) -> bool {
        !matches!(self, Self::Direct)
    }
}

/// Card transaction reply
#[derive(Debug, Clone)]
pub struct CardResponse {
    details: TransactionDetails,
    source: CardSource,
}

impl CardResponse {
    pub(crate) fn new(details: TransactionDetails, source: CardSource) -> Self {
        Self { details, source }
    }

    pub fn source(&self) -> CardSource {
        self.source
    }

    fn card(&self) -> Option<&RawCard> {
        let raw = self.details.raw();
        match self.source {
            CardSource::Direct => raw.credit_card_details.as_ref(),
            CardSource::ApplePay => raw.apple_pay_card_details.as_ref(),
            CardSource::GooglePay => raw.google_pay_card_details.as_ref(),
        }
    }

    fn field(&self, pick: impl Fn(&RawCard) -> &Option<String>) -> Option<&str> {
        self.card().and_then(|card| present(pick(card)))
    }

    /// Brand detected from the BIN
    pub fn card_type(&self) -> Option<CardType> {
        self.bin().and_then(CardType::from_bin)
    }

    pub fn bin(&self) -> Option<&str> {
        self.field(|c| &c.bin)
    }

    pub fn masked_number(&self) -> Option<&str> {
        self.field(|c| &c.masked_number)
    }

    pub fn last_four(&self) -> Option<&str> {
        self.field(|c| &c.last4)
    }

    pub fn exp_month(&self) -> Option<&str> {
        self.field(|c| &c.expiration_month)
    }

    pub fn exp_year(&self) -> Option<&str> {
        self.field(|c| &c.expiration_year)
    }

    /// Processor's own brand label
    pub fn processor_card_type(&self) -> Option<&str> {
        self.field(|c| &c.card_type)
    }

    /// Billing address record saved alongside the card
    pub fn billing_address_id(&self) -> Option<&str> {
        self.details
            .raw()
            .billing_details
            .as_ref()
            .and_then(|b| present(&b.id))
    }
}

impl InstrumentResponse for CardResponse {
    fn details(&self) -> &TransactionDetails {
        &self.details
    }

    fn authorization_code(&self) -> Option<&str> {
        present(&self.details.raw().processor_authorization_code)
    }

    fn payment_token_id(&self) -> Option<&str> {
        self.field(|c| &c.token)
    }

    fn payment_token(&self) -> PaymentResult<PaymentToken> {
        let id = self.payment_token_id().ok_or_else(|| {
            PaymentError::MissingToken("Required credit card token is missing or empty!".to_string())
        })?;

        let card = self.card();
        Ok(PaymentToken::new(
            id,
            TokenDetails::CreditCard {
                card_type: self.card_type(),
                last_four: card.and_then(|c| present_owned(&c.last4)),
                exp_month: card.and_then(|c| present_owned(&c.expiration_month)),
                exp_year: card.and_then(|c| present_owned(&c.expiration_year)),
                billing_address_id: self.billing_address_id().map(str::to_string),
            },
        ))
    }
}
