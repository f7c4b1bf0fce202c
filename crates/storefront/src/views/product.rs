//! Product and cart view models.

use bazaar_core::cart::{Cart, CartLine, CartTotals, CompareList, Wishlist};
use bazaar_core::catalog::Product;
use bazaar_core::{CurrencyCode, ProductId, VariantId};

/// A product tile in a grid.
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub image: Option<String>,
    pub category: Option<String>,
    pub price: String,
    pub compare_at: Option<String>,
    pub discount_percent: Option<u8>,
    pub rating: Option<f32>,
    pub review_count: u32,
    pub in_stock: bool,
    pub in_wishlist: bool,
    pub in_compare: bool,
}

impl ProductCard {
    #[must_use]
    pub fn new(
        product: &Product,
        currency: CurrencyCode,
        wishlist: &Wishlist,
        compare: &CompareList,
    ) -> Self {
        Self {
            id: product.id,
            slug: product.slug.clone(),
            name: product.name.clone(),
            image: product.primary_image().map(String::from),
            category: product.category.as_ref().map(|c| c.name.clone()),
            price: currency.format(product.effective_price()),
            compare_at: product.compare_at_price().map(|p| currency.format(p)),
            discount_percent: product.discount_percent(),
            rating: product.rating.filter(|_| product.review_count > 0),
            review_count: product.review_count,
            in_stock: product.in_stock(),
            in_wishlist: wishlist.contains(product.id),
            in_compare: compare.contains(product.id),
        }
    }
}

/// Cards for a slice of products.
#[must_use]
pub fn cards<'a>(
    products: impl IntoIterator<Item = &'a Product>,
    currency: CurrencyCode,
    wishlist: &Wishlist,
    compare: &CompareList,
) -> Vec<ProductCard> {
    products
        .into_iter()
        .map(|p| ProductCard::new(p, currency, wishlist, compare))
        .collect()
}

/// A cart line with formatted money.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub variant_id: VariantId,
    pub slug: String,
    pub name: String,
    pub variant_label: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub max_quantity: Option<u32>,
    pub unit_price: String,
    pub line_total: String,
}

impl CartLineView {
    fn new(line: &CartLine, currency: CurrencyCode) -> Self {
        Self {
            variant_id: line.variant_id,
            slug: line.slug.clone(),
            name: line.name.clone(),
            variant_label: line.variant_label.clone(),
            image: line.image.clone(),
            quantity: line.quantity,
            max_quantity: line.max_stock,
            unit_price: currency.format(line.unit_price),
            line_total: currency.format(line.line_total()),
        }
    }
}

/// The cart with formatted totals.
#[derive(Debug, Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: u32,
    pub coupon_code: Option<String>,
    pub subtotal: String,
    pub discount: Option<String>,
    pub shipping: String,
    pub free_shipping: bool,
    pub total: String,
    /// Amount left to spend for free shipping, if not reached.
    pub free_shipping_gap: Option<String>,
}

impl CartView {
    #[must_use]
    pub fn new(
        cart: &Cart,
        totals: &CartTotals,
        free_threshold: rust_decimal::Decimal,
        currency: CurrencyCode,
    ) -> Self {
        let discounted = totals.subtotal - totals.discount;
        let gap = free_threshold - discounted;
        Self {
            lines: cart
                .lines()
                .iter()
                .map(|l| CartLineView::new(l, currency))
                .collect(),
            item_count: cart.item_count(),
            coupon_code: cart.coupon().map(|c| c.code.clone()),
            subtotal: currency.format(totals.subtotal),
            discount: (!totals.discount.is_zero()).then(|| currency.format(totals.discount)),
            shipping: currency.format(totals.shipping),
            free_shipping: totals.shipping.is_zero(),
            total: currency.format(totals.total),
            free_shipping_gap: (!cart.is_empty() && gap > rust_decimal::Decimal::ZERO)
                .then(|| currency.format(gap)),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
