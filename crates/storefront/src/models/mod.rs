//! Session-held models for the storefront.

pub mod session;

pub use session::{CurrentCustomer, keys as session_keys};
