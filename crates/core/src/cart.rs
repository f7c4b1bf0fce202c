//! Visitor-owned shopping state: cart, wishlist, compare list and toasts.
//!
//! All of it is convenience state serialized into the visitor's session.
//! Nothing here is authoritative: stock can change under a cart line, and the
//! backend rejects the order if it does.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ProductId, VariantId};

/// Errors from cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("this option is out of stock")]
    OutOfStock,
    #[error("item is not in the cart")]
    LineNotFound,
}

/// One line in the cart, keyed by variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub slug: String,
    pub name: String,
    pub variant_label: String,
    pub image: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
    /// Stock known when the line was last touched.
    pub max_stock: Option<u32>,
}

impl CartLine {
    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A coupon accepted by the backend for the current cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    pub code: String,
    pub discount: Decimal,
}

/// Result of adding to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    /// Quantity of the line after the add.
    pub quantity: u32,
    /// Whether the requested quantity was reduced to fit known stock.
    pub clamped: bool,
}

/// Flat shipping with a free-shipping threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingPolicy {
    pub fee: Decimal,
    /// Subtotal (after discount) at or above which shipping is free.
    pub free_threshold: Decimal,
}

impl ShippingPolicy {
    /// Shipping fee for a discounted subtotal; an empty cart ships for free.
    #[must_use]
    pub fn fee_for(&self, discounted_subtotal: Decimal) -> Decimal {
        if discounted_subtotal <= Decimal::ZERO || discounted_subtotal >= self.free_threshold {
            Decimal::ZERO
        } else {
            self.fee
        }
    }
}

/// Money summary of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

/// The visitor's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
    coupon: Option<AppliedCoupon>,
}

impl Cart {
    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of quantities across lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Sum of line totals before discount and shipping.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    #[must_use]
    pub const fn coupon(&self) -> Option<&AppliedCoupon> {
        self.coupon.as_ref()
    }

    /// Add a line, merging with an existing line for the same variant.
    ///
    /// A quantity of zero counts as one. When the line carries a known stock
    /// the merged quantity is clamped to it. Any applied coupon is dropped
    /// because its discount was computed for the old contents.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::OutOfStock`] when the known stock is zero.
    pub fn add(&mut self, line: CartLine) -> Result<AddOutcome, CartError> {
        if line.max_stock == Some(0) {
            return Err(CartError::OutOfStock);
        }
        let requested = line.quantity.max(1);
        self.coupon = None;

        let (quantity, clamped) = if let Some(existing) =
            self.lines.iter_mut().find(|l| l.variant_id == line.variant_id)
        {
            let wanted = existing.quantity.saturating_add(requested);
            existing.max_stock = line.max_stock.or(existing.max_stock);
            existing.unit_price = line.unit_price;
            let quantity = clamp_to_stock(wanted, existing.max_stock);
            existing.quantity = quantity;
            (quantity, quantity < wanted)
        } else {
            let quantity = clamp_to_stock(requested, line.max_stock);
            self.lines.push(CartLine { quantity, ..line });
            (quantity, quantity < requested)
        };

        Ok(AddOutcome { quantity, clamped })
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// Returns the quantity actually stored after clamping to known stock.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] when no line has this variant.
    pub fn set_quantity(&mut self, variant_id: VariantId, quantity: u32) -> Result<u32, CartError> {
        if quantity == 0 {
            self.remove(variant_id)?;
            return Ok(0);
        }
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.variant_id == variant_id)
            .ok_or(CartError::LineNotFound)?;
        line.quantity = clamp_to_stock(quantity, line.max_stock).max(1);
        self.coupon = None;
        Ok(line.quantity)
    }

    /// Remove the line for a variant.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] when no line has this variant.
    pub fn remove(&mut self, variant_id: VariantId) -> Result<CartLine, CartError> {
        let index = self
            .lines
            .iter()
            .position(|l| l.variant_id == variant_id)
            .ok_or(CartError::LineNotFound)?;
        self.coupon = None;
        Ok(self.lines.remove(index))
    }

    /// Empty the cart, e.g. after an order is placed.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.coupon = None;
    }

    /// Remember a coupon the backend accepted for the current contents.
    pub fn apply_coupon(&mut self, coupon: AppliedCoupon) {
        self.coupon = Some(coupon);
    }

    pub fn remove_coupon(&mut self) {
        self.coupon = None;
    }

    /// Money summary. The discount never exceeds the subtotal.
    #[must_use]
    pub fn totals(&self, shipping: &ShippingPolicy) -> CartTotals {
        let subtotal = self.subtotal();
        let discount = self
            .coupon
            .as_ref()
            .map_or(Decimal::ZERO, |c| c.discount.max(Decimal::ZERO).min(subtotal));
        let discounted = subtotal - discount;
        let shipping = shipping.fee_for(discounted);
        CartTotals {
            subtotal,
            discount,
            shipping,
            total: discounted + shipping,
        }
    }
}

fn clamp_to_stock(quantity: u32, max_stock: Option<u32>) -> u32 {
    max_stock.map_or(quantity, |max| quantity.min(max))
}

/// Saved product ids, in the order they were saved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wishlist(Vec<ProductId>);

impl Wishlist {
    /// Add the product if absent, remove it if present.
    ///
    /// Returns whether the product is saved afterwards.
    pub fn toggle(&mut self, id: ProductId) -> bool {
        if let Some(pos) = self.0.iter().position(|p| *p == id) {
            self.0.remove(pos);
            false
        } else {
            self.0.push(id);
            true
        }
    }

    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.0.contains(&id)
    }

    /// Returns whether the product was saved.
    pub fn remove(&mut self, id: ProductId) -> bool {
        let before = self.0.len();
        self.0.retain(|p| *p != id);
        self.0.len() != before
    }

    #[must_use]
    pub fn ids(&self) -> &[ProductId] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// Errors from compare list mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompareError {
    #[error("you can compare at most {max} products")]
    Full { max: usize },
}

/// Products picked for side-by-side comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompareList(Vec<ProductId>);

impl CompareList {
    pub const MAX_ITEMS: usize = 4;

    /// Add a product. Adding one already in the list is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::Full`] when the list already holds
    /// [`Self::MAX_ITEMS`] other products.
    pub fn add(&mut self, id: ProductId) -> Result<(), CompareError> {
        if self.0.contains(&id) {
            return Ok(());
        }
        if self.0.len() >= Self::MAX_ITEMS {
            return Err(CompareError::Full {
                max: Self::MAX_ITEMS,
            });
        }
        self.0.push(id);
        Ok(())
    }

    pub fn remove(&mut self, id: ProductId) {
        self.0.retain(|p| *p != id);
    }

    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.0.contains(&id)
    }

    #[must_use]
    pub fn ids(&self) -> &[ProductId] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// Severity of a toast message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastLevel {
    Success,
    Error,
    Info,
}

impl ToastLevel {
    /// CSS modifier class.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

/// A one-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Info,
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn line(variant: i64, price: &str, quantity: u32, max_stock: Option<u32>) -> CartLine {
        CartLine {
            variant_id: VariantId::new(variant),
            product_id: ProductId::new(variant * 10),
            slug: format!("p-{variant}"),
            name: format!("Product {variant}"),
            variant_label: "Default".to_string(),
            image: None,
            unit_price: dec(price),
            quantity,
            max_stock,
        }
    }

    const SHIPPING: ShippingPolicy = ShippingPolicy {
        fee: Decimal::from_parts(30_000, 0, 0, false, 0),
        free_threshold: Decimal::from_parts(500_000, 0, 0, false, 0),
    };

    #[test]
    fn test_add_merges_same_variant() {
        let mut cart = Cart::default();
        cart.add(line(1, "100", 2, None)).unwrap();
        let outcome = cart.add(line(1, "100", 3, None)).unwrap();
        assert_eq!(outcome, AddOutcome { quantity: 5, clamped: false });
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_add_zero_counts_as_one() {
        let mut cart = Cart::default();
        let outcome = cart.add(line(1, "100", 0, None)).unwrap();
        assert_eq!(outcome.quantity, 1);
    }

    #[test]
    fn test_add_clamps_to_known_stock() {
        let mut cart = Cart::default();
        cart.add(line(1, "100", 2, Some(3))).unwrap();
        let outcome = cart.add(line(1, "100", 5, Some(3))).unwrap();
        assert_eq!(outcome, AddOutcome { quantity: 3, clamped: true });

        let fresh = cart.add(line(2, "50", 9, Some(4))).unwrap();
        assert_eq!(fresh, AddOutcome { quantity: 4, clamped: true });
    }

    #[test]
    fn test_add_out_of_stock() {
        let mut cart = Cart::default();
        assert_eq!(cart.add(line(1, "100", 1, Some(0))), Err(CartError::OutOfStock));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_and_remove() {
        let mut cart = Cart::default();
        cart.add(line(1, "100", 1, Some(5))).unwrap();
        assert_eq!(cart.set_quantity(VariantId::new(1), 9), Ok(5));
        assert_eq!(cart.set_quantity(VariantId::new(1), 0), Ok(0));
        assert!(cart.is_empty());
        assert_eq!(
            cart.set_quantity(VariantId::new(1), 2),
            Err(CartError::LineNotFound)
        );
        assert!(matches!(cart.remove(VariantId::new(7)), Err(CartError::LineNotFound)));
    }

    #[test]
    fn test_totals_with_coupon_and_shipping() {
        let mut cart = Cart::default();
        cart.add(line(1, "150000", 2, None)).unwrap();
        cart.apply_coupon(AppliedCoupon {
            code: "SALE10".into(),
            discount: dec("30000"),
        });
        let totals = cart.totals(&SHIPPING);
        assert_eq!(totals.subtotal, dec("300000"));
        assert_eq!(totals.discount, dec("30000"));
        assert_eq!(totals.shipping, dec("30000"));
        assert_eq!(totals.total, dec("300000"));
    }

    #[test]
    fn test_totals_free_shipping_and_discount_cap() {
        let mut cart = Cart::default();
        cart.add(line(1, "600000", 1, None)).unwrap();
        assert_eq!(cart.totals(&SHIPPING).shipping, Decimal::ZERO);

        cart.apply_coupon(AppliedCoupon {
            code: "HUGE".into(),
            discount: dec("900000"),
        });
        let totals = cart.totals(&SHIPPING);
        assert_eq!(totals.discount, dec("600000"));
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn test_mutation_drops_coupon() {
        let mut cart = Cart::default();
        cart.add(line(1, "100", 1, None)).unwrap();
        cart.apply_coupon(AppliedCoupon {
            code: "X".into(),
            discount: dec("10"),
        });
        cart.add(line(2, "100", 1, None)).unwrap();
        assert!(cart.coupon().is_none());
    }

    #[test]
    fn test_cart_session_roundtrip_shape() {
        let mut cart = Cart::default();
        cart.add(line(1, "100", 1, None)).unwrap();
        let value = serde_json::to_value(&cart).unwrap();
        let back: Cart = serde_json::from_value(value).unwrap();
        assert_eq!(back, cart);
    }

    #[test]
    fn test_wishlist_toggle() {
        let mut wishlist = Wishlist::default();
        assert!(wishlist.toggle(ProductId::new(1)));
        assert!(wishlist.toggle(ProductId::new(2)));
        assert!(!wishlist.toggle(ProductId::new(1)));
        assert_eq!(wishlist.ids(), &[ProductId::new(2)]);
        assert!(!wishlist.remove(ProductId::new(9)));
        assert!(wishlist.remove(ProductId::new(2)));
        assert!(wishlist.is_empty());
    }

    #[test]
    fn test_compare_list_limit() {
        let mut compare = CompareList::default();
        for id in 1..=4 {
            compare.add(ProductId::new(id)).unwrap();
        }
        // Re-adding an existing product is fine even when full
        compare.add(ProductId::new(2)).unwrap();
        assert_eq!(
            compare.add(ProductId::new(5)),
            Err(CompareError::Full { max: 4 })
        );
        compare.remove(ProductId::new(1));
        compare.add(ProductId::new(5)).unwrap();
        assert_eq!(compare.len(), 4);
        assert!(compare.contains(ProductId::new(5)));
    }
}
