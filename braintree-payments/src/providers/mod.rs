//! Processor API implementations

pub mod braintree;

pub use braintree::{BraintreeClient, ClientAuth};
