//! Core types for Bazaar.
//!
//! Type-safe wrappers for ids, money, contact details, and statuses.

pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use email::{Email, EmailError, Phone, PhoneError};
pub use id::*;
pub use price::{CurrencyCode, discount_percent};
pub use status::*;
