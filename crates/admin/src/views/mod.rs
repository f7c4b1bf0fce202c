//! View models for admin templates.
//!
//! Handlers turn backend payloads into these so templates only print
//! preformatted strings.

mod layout;
mod order;
mod pager;

pub use layout::Layout;
pub use order::{OrderRow, StatusOption, status_options};
pub use pager::{PageLinkView, Pager};

use chrono::{DateTime, Utc};

/// Timestamp as shown in admin tables.
#[must_use]
pub fn datetime(at: DateTime<Utc>) -> String {
    at.format("%d/%m/%Y %H:%M").to_string()
}

/// Value for an `<input type="datetime-local">`.
#[must_use]
pub fn datetime_input(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M").to_string()
}
