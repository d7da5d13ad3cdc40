//! Braintree payment gateway core
//!
//! Builds processor transaction requests from host orders, parses the
//! processor's polymorphic replies, resolves merchant accounts and applies
//! outcomes to host-owned order and token storage.
//!
//! ## Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       BraintreeGateway                          │
//! │  charge() | authorize() | capture() | refund() | void() | find()│
//! └─────────────────────────────────────────────────────────────────┘
//!          │                    │                      │
//!          ▼                    ▼                      ▼
//!  ┌───────────────┐   ┌─────────────────┐   ┌──────────────────┐
//!  │ SaleRequest   │   │ RemoteConfig    │   │ OrderStore       │
//!  │ (normalizer,  │   │ (merchant       │   │ PaymentTokenStore│
//!  │  descriptor)  │   │  account cache) │   │ (host-owned)     │
//!  └───────────────┘   └─────────────────┘   └──────────────────┘
//!          │                    │
//!          ▼                    ▼
//!  ┌─────────────────────────────────────┐
//!  │ ProcessorApi (BraintreeClient)      │
//!  └─────────────────────────────────────┘
//!          │
//!          ▼
//!  ┌─────────────────────────────────────┐
//!  │ TransactionResponse                 │
//!  │ Card | PayPal | Venmo | Ach         │
//!  └─────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use braintree_payments::*;
//! use std::sync::Arc;
//!
//! let settings = GatewaySettings::from_file("braintree.toml")?;
//! let gateway = BraintreeGateway::from_settings(
//!     settings,
//!     Arc::new(MemoryOrderStore::new()),
//!     Arc::new(MemoryTokenStore::new()),
//!     Arc::new(MerchantAccountCache::new()),
//! )?;
//!
//! let response = gateway
//!     .charge("1234", PaymentDetails::with_nonce(nonce).tokenize(true))
//!     .await?;
//! println!("authorized: {:?}", response.authorization_code());
//! ```

pub mod address;
pub mod card;
pub mod config;
pub mod country;
pub mod descriptor;
pub mod error;
pub mod gateway;
pub mod merchant_account;
pub mod money;
pub mod order;
pub mod provider;
pub mod remote_config;
pub mod request;
pub mod response;
pub mod stores;
pub mod token;

pub mod providers;

pub use card::CardType;
pub use config::*;
pub use descriptor::{DescriptorSettings, DynamicDescriptor};
pub use error::*;
pub use gateway::*;
pub use merchant_account::*;
pub use money::*;
pub use order::*;
pub use provider::*;
pub use providers::{BraintreeClient, ClientAuth};
pub use remote_config::*;
pub use request::*;
pub use response::*;
pub use stores::*;
pub use token::*;
