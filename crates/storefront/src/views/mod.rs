//! View models shared by page templates.
//!
//! Handlers shape backend payloads into these before rendering, so templates
//! only print preformatted strings.

mod layout;
mod order;
mod product;

pub use layout::Layout;
pub use order::{OrderLineView, OrderView};
pub use product::{CartLineView, CartView, ProductCard, cards};
