//! Bazaar Core - shared types and calculations.
//!
//! Used by both web binaries:
//! - `storefront` - Public shop
//! - `admin` - Store administration panel
//!
//! # Architecture
//!
//! Everything here is pure: no I/O, no HTTP clients, no clocks. The backend
//! API owns every entity; this crate deserializes what it returns and does
//! the display math (prices, discounts, wheel angles, countdowns, diffs) and
//! the session-side state (cart, wishlist, compare list, toasts).
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, prices, contact details, and statuses
//! - [`catalog`] - Products, variants, filtering and sorting
//! - [`cart`] - Cart, wishlist, compare list, toasts
//! - [`checkout`] - Checkout form and orders
//! - [`customer`] - Customer accounts and auth forms
//! - [`coupon`] - Coupons and the admin coupon form
//! - [`review`] - Review form and rating summaries
//! - [`lucky_spin`] - Wheel configuration and geometry
//! - [`promotions`] - Flash sales and night market
//! - [`activity`] - Admin activity logs
//! - [`diff`] - Snapshot comparison for the activity log viewer
//! - [`pagination`] - Page links
//! - [`validation`] - Per-field form errors

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod activity;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod coupon;
pub mod customer;
pub mod diff;
pub mod lucky_spin;
pub mod pagination;
pub mod promotions;
pub mod review;
pub mod types;
pub mod validation;

pub use types::*;
pub use validation::ValidationErrors;
