//! Catalog payloads and client-side catalog shaping.
//!
//! Products, variants and facets are owned by the backend. This module only
//! deserializes them and derives the display values the shop needs:
//! effective prices, unique colors and sizes, stock flags, and the filter and
//! sort applied to a product listing.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, ProductId, VariantId, discount_percent};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
}

/// A color facet value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub name: String,
    /// CSS color, e.g. `#1a1a1a`.
    #[serde(default)]
    pub hex: Option<String>,
}

/// A size facet value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub name: String,
}

/// A purchasable variant of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub stock: u32,
    /// Overrides the product price when set.
    #[serde(default)]
    pub price: Option<Decimal>,
}

impl Variant {
    /// Whether at least one unit is in stock.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.stock > 0
    }

    /// Display label combining color and size, e.g. `Black / M`.
    #[must_use]
    pub fn label(&self) -> String {
        match (&self.color, &self.size) {
            (Some(color), Some(size)) => format!("{} / {size}", color.name),
            (Some(color), None) => color.name.clone(),
            (None, Some(size)) => size.clone(),
            (None, None) => "Default".to_string(),
        }
    }
}

/// A product as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    /// Regular price.
    pub price: Decimal,
    /// Sale price, when the product is discounted.
    #[serde(default)]
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub sold_count: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// The price the customer pays: the sale price when it undercuts the
    /// regular price, otherwise the regular price.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        match self.sale_price {
            Some(sale) if sale < self.price => sale,
            _ => self.price,
        }
    }

    /// Regular price to strike through, when the product is on sale.
    #[must_use]
    pub fn compare_at_price(&self) -> Option<Decimal> {
        (self.effective_price() < self.price).then_some(self.price)
    }

    /// Percentage saved against the regular price.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u8> {
        discount_percent(self.effective_price(), self.compare_at_price())
    }

    /// Price of a given variant, falling back to the product's effective price.
    #[must_use]
    pub fn variant_price(&self, variant: &Variant) -> Decimal {
        variant.price.unwrap_or_else(|| self.effective_price())
    }

    /// Whether any variant is in stock. Products without variants are
    /// treated as available and left to the backend to reject.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.variants.is_empty() || self.variants.iter().any(Variant::is_available)
    }

    /// Total stock across variants.
    #[must_use]
    pub fn total_stock(&self) -> u32 {
        self.variants
            .iter()
            .map(|v| v.stock)
            .fold(0u32, u32::saturating_add)
    }

    /// First image, used for cards and cart lines.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Look up a variant by id.
    #[must_use]
    pub fn variant(&self, id: VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }

    /// Colors across all variants, in first-seen order, de-duplicated by
    /// case-insensitive name.
    #[must_use]
    pub fn unique_colors(&self) -> Vec<Color> {
        let mut seen: Vec<String> = Vec::new();
        let mut colors = Vec::new();
        for color in self.variants.iter().filter_map(|v| v.color.as_ref()) {
            let key = color.name.trim().to_lowercase();
            if !seen.contains(&key) {
                seen.push(key);
                colors.push(color.clone());
            }
        }
        colors
    }

    /// Sizes across all variants, in first-seen order, de-duplicated
    /// case-insensitively.
    #[must_use]
    pub fn unique_sizes(&self) -> Vec<String> {
        let mut sizes: Vec<String> = Vec::new();
        for size in self.variants.iter().filter_map(|v| v.size.as_deref()) {
            if !sizes.iter().any(|s| s.eq_ignore_ascii_case(size.trim())) {
                sizes.push(size.trim().to_string());
            }
        }
        sizes
    }

    fn has_color(&self, wanted: &[String]) -> bool {
        self.variants.iter().any(|v| {
            v.color
                .as_ref()
                .is_some_and(|c| wanted.iter().any(|w| w.eq_ignore_ascii_case(c.name.trim())))
        })
    }

    fn has_size(&self, wanted: &[String]) -> bool {
        self.variants.iter().any(|v| {
            v.size
                .as_deref()
                .is_some_and(|s| wanted.iter().any(|w| w.eq_ignore_ascii_case(s.trim())))
        })
    }
}

/// A page of results from a backend list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    #[serde(alias = "data")]
    pub items: Vec<T>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page", alias = "totalPages")]
    pub total_pages: u32,
    #[serde(default)]
    pub total: u64,
}

const fn default_page() -> u32 {
    1
}

impl<T> Paginated<T> {
    /// An empty first page, used when a backend call fails.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            total_pages: 1,
            total: 0,
        }
    }

    /// Slice one page out of a complete, already filtered list.
    ///
    /// `page` is clamped into `1..=total_pages`; an empty list is a single
    /// empty page.
    #[must_use]
    pub fn from_all(items: Vec<T>, page: u32, per_page: u32) -> Self {
        let per_page = per_page.max(1);
        let total = items.len() as u64;
        let total_pages =
            u32::try_from(total.div_ceil(u64::from(per_page)).max(1)).unwrap_or(u32::MAX);
        let page = page.clamp(1, total_pages);
        let skip = (page as usize - 1).saturating_mul(per_page as usize);
        Self {
            items: items.into_iter().skip(skip).take(per_page as usize).collect(),
            page,
            total_pages,
            total,
        }
    }
}

/// Sort order for a product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
    BestSelling,
}

impl ProductSort {
    pub const ALL: [Self; 5] = [
        Self::Newest,
        Self::PriceAsc,
        Self::PriceDesc,
        Self::Name,
        Self::BestSelling,
    ];

    /// Parse a query value; unknown values fall back to the default order.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|sort| sort.as_str() == s.trim())
            .unwrap_or_default()
    }

    /// Query value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::Name => "name",
            Self::BestSelling => "best_selling",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Newest => "Newest",
            Self::PriceAsc => "Price: low to high",
            Self::PriceDesc => "Price: high to low",
            Self::Name => "Name",
            Self::BestSelling => "Best selling",
        }
    }

    fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            // Newest first, undated products last
            Self::Newest => match (a.created_at, b.created_at) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            Self::PriceAsc => a.effective_price().cmp(&b.effective_price()),
            Self::PriceDesc => b.effective_price().cmp(&a.effective_price()),
            Self::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            Self::BestSelling => b.sold_count.cmp(&a.sold_count),
        }
    }
}

/// Shop listing filter.
///
/// Within a facet the selected values are OR-ed; across facets they are
/// AND-ed. Price bounds are inclusive and apply to the effective price.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub search: Option<String>,
    /// Category slug or numeric id.
    pub category: Option<String>,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock_only: bool,
    pub sort: ProductSort,
}

impl ProductFilter {
    /// Build a filter from raw query-string values.
    ///
    /// Lists are comma separated; blank entries and unparsable prices are
    /// ignored.
    #[must_use]
    pub fn from_query(
        search: Option<&str>,
        category: Option<&str>,
        colors: Option<&str>,
        sizes: Option<&str>,
        min_price: Option<&str>,
        max_price: Option<&str>,
        in_stock: Option<&str>,
        sort: Option<&str>,
    ) -> Self {
        Self {
            search: non_blank(search),
            category: non_blank(category),
            colors: split_list(colors),
            sizes: split_list(sizes),
            min_price: min_price.and_then(|p| p.trim().parse().ok()),
            max_price: max_price.and_then(|p| p.trim().parse().ok()),
            in_stock_only: matches!(in_stock.map(str::trim), Some("1" | "true" | "on")),
            sort: sort.map(ProductSort::parse_lenient).unwrap_or_default(),
        }
    }

    /// Whether any narrowing criterion is set (sort does not count).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.search.is_some()
            || self.category.is_some()
            || !self.colors.is_empty()
            || !self.sizes.is_empty()
            || self.min_price.is_some()
            || self.max_price.is_some()
            || self.in_stock_only
    }

    /// Whether the filter narrows on anything the backend listing cannot
    /// (colors, sizes, price range, stock).
    #[must_use]
    pub fn needs_full_listing(&self) -> bool {
        !self.colors.is_empty()
            || !self.sizes.is_empty()
            || self.min_price.is_some()
            || self.max_price.is_some()
            || self.in_stock_only
    }

    /// Whether a single product passes the filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !product.name.to_lowercase().contains(&needle)
                && !product.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }

        if let Some(category) = &self.category {
            let matches_category = product.category.as_ref().is_some_and(|c| {
                c.slug.eq_ignore_ascii_case(category) || c.id.to_string() == *category
            });
            if !matches_category {
                return false;
            }
        }

        if !self.colors.is_empty() && !product.has_color(&self.colors) {
            return false;
        }
        if !self.sizes.is_empty() && !product.has_size(&self.sizes) {
            return false;
        }

        let price = product.effective_price();
        if self.min_price.is_some_and(|min| price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| price > max) {
            return false;
        }

        !self.in_stock_only || product.in_stock()
    }

    /// Filter and sort a product list. Sorting is stable.
    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        let mut matched: Vec<&Product> = products.iter().filter(|p| self.matches(p)).collect();
        matched.sort_by(|a, b| self.sort.compare(a, b));
        matched
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn variant(id: i64, color: Option<&str>, size: Option<&str>, stock: u32) -> Variant {
        Variant {
            id: VariantId::new(id),
            sku: None,
            color: color.map(|name| Color {
                name: name.to_string(),
                hex: None,
            }),
            size: size.map(ToString::to_string),
            stock,
            price: None,
        }
    }

    fn product(id: i64, name: &str, price: &str, variants: Vec<Variant>) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            description: String::new(),
            price: dec(price),
            sale_price: None,
            category: None,
            images: vec![],
            variants,
            rating: None,
            review_count: 0,
            sold_count: 0,
            created_at: None,
        }
    }

    #[test]
    fn test_deserialize_minimal_backend_payload() {
        let json = serde_json::json!({
            "id": 3,
            "name": "Linen Shirt",
            "slug": "linen-shirt",
            "price": "350000",
            "sale_price": 299000,
            "variants": [{"id": 31, "color": {"name": "White"}, "size": "M", "stock": 2}],
            "unexpected": true
        });
        let product: Product = serde_json::from_value(json).unwrap();
        assert_eq!(product.effective_price(), dec("299000"));
        assert_eq!(product.discount_percent(), Some(15));
        assert_eq!(product.variants[0].label(), "White / M");
    }

    #[test]
    fn test_sale_price_above_regular_is_ignored() {
        let mut p = product(1, "Cap", "100", vec![]);
        p.sale_price = Some(dec("150"));
        assert_eq!(p.effective_price(), dec("100"));
        assert_eq!(p.compare_at_price(), None);
        assert_eq!(p.discount_percent(), None);
    }

    #[test]
    fn test_unique_colors_first_seen_order() {
        let p = product(
            1,
            "Tee",
            "10",
            vec![
                variant(1, Some("Black"), Some("S"), 1),
                variant(2, Some("white"), Some("S"), 1),
                variant(3, Some("black "), Some("M"), 0),
                variant(4, None, Some("m"), 1),
                variant(5, Some("White"), Some("L"), 1),
            ],
        );
        let colors: Vec<String> = p.unique_colors().into_iter().map(|c| c.name).collect();
        assert_eq!(colors, vec!["Black", "white"]);
        assert_eq!(p.unique_sizes(), vec!["S", "M", "L"]);
    }

    #[test]
    fn test_in_stock() {
        let sold_out = product(1, "A", "1", vec![variant(1, None, None, 0)]);
        assert!(!sold_out.in_stock());
        let no_variants = product(2, "B", "1", vec![]);
        assert!(no_variants.in_stock());
        let mixed = product(
            3,
            "C",
            "1",
            vec![variant(1, None, None, 0), variant(2, None, None, 4)],
        );
        assert!(mixed.in_stock());
        assert_eq!(mixed.total_stock(), 4);
    }

    #[test]
    fn test_filter_facets_or_within_and_across() {
        let products = vec![
            product(1, "Black S", "10", vec![variant(1, Some("Black"), Some("S"), 1)]),
            product(2, "White M", "20", vec![variant(2, Some("White"), Some("M"), 1)]),
            product(3, "Red S", "30", vec![variant(3, Some("Red"), Some("S"), 1)]),
        ];
        let filter = ProductFilter {
            colors: vec!["black".into(), "white".into()],
            sizes: vec!["S".into()],
            ..ProductFilter::default()
        };
        let ids: Vec<i64> = filter.apply(&products).iter().map(|p| p.id.as_i64()).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_filter_price_bounds_inclusive_on_effective_price() {
        let mut discounted = product(1, "A", "200", vec![]);
        discounted.sale_price = Some(dec("100"));
        let full = product(2, "B", "150", vec![]);
        let products = vec![discounted, full];

        let filter = ProductFilter {
            min_price: Some(dec("100")),
            max_price: Some(dec("120")),
            ..ProductFilter::default()
        };
        let ids: Vec<i64> = filter.apply(&products).iter().map(|p| p.id.as_i64()).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_filter_search_and_category() {
        let mut a = product(1, "Silk Scarf", "10", vec![]);
        a.category = Some(Category {
            id: CategoryId::new(9),
            name: "Accessories".into(),
            slug: "accessories".into(),
            parent_id: None,
        });
        let mut b = product(2, "Wool Coat", "10", vec![]);
        b.description = "Pairs with a silk scarf".into();
        let products = vec![a, b];

        let by_search = ProductFilter::from_query(
            Some("  SILK "),
            None,
            None,
            None,
            None,
            None,
            None,
            None,
        );
        assert_eq!(by_search.apply(&products).len(), 2);

        let by_slug = ProductFilter::from_query(
            None,
            Some("accessories"),
            None,
            None,
            None,
            None,
            None,
            None,
        );
        assert_eq!(by_slug.apply(&products).len(), 1);

        let by_id = ProductFilter::from_query(None, Some("9"), None, None, None, None, None, None);
        assert_eq!(by_id.apply(&products)[0].id, ProductId::new(1));
    }

    #[test]
    fn test_filter_in_stock_only() {
        let products = vec![
            product(1, "A", "1", vec![variant(1, None, None, 0)]),
            product(2, "B", "1", vec![variant(2, None, None, 1)]),
        ];
        let filter =
            ProductFilter::from_query(None, None, None, None, None, None, Some("on"), None);
        assert!(filter.is_active());
        let ids: Vec<i64> = filter.apply(&products).iter().map(|p| p.id.as_i64()).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_sorts() {
        let mut a = product(1, "banana", "30", vec![]);
        a.sold_count = 5;
        a.created_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let mut b = product(2, "Apple", "10", vec![]);
        b.sold_count = 9;
        let mut c = product(3, "cherry", "20", vec![]);
        c.created_at = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let products = vec![a, b, c];

        let order = |sort: ProductSort| -> Vec<i64> {
            ProductFilter {
                sort,
                ..ProductFilter::default()
            }
            .apply(&products)
            .iter()
            .map(|p| p.id.as_i64())
            .collect()
        };

        assert_eq!(order(ProductSort::Newest), vec![3, 1, 2]);
        assert_eq!(order(ProductSort::PriceAsc), vec![2, 3, 1]);
        assert_eq!(order(ProductSort::PriceDesc), vec![1, 3, 2]);
        assert_eq!(order(ProductSort::Name), vec![2, 1, 3]);
        assert_eq!(order(ProductSort::BestSelling), vec![2, 1, 3]);
    }

    #[test]
    fn test_from_query_lenient_parsing() {
        let filter = ProductFilter::from_query(
            Some("   "),
            None,
            Some("red, ,blue,"),
            None,
            Some("abc"),
            Some(" 500 "),
            Some("no"),
            Some("random"),
        );
        assert_eq!(filter.search, None);
        assert_eq!(filter.colors, vec!["red", "blue"]);
        assert_eq!(filter.min_price, None);
        assert_eq!(filter.max_price, Some(dec("500")));
        assert!(!filter.in_stock_only);
        assert_eq!(filter.sort, ProductSort::Newest);
    }

    #[test]
    fn test_paginated_accepts_data_alias() {
        let page: Paginated<Category> = serde_json::from_value(serde_json::json!({
            "data": [{"id": 1, "name": "Tops", "slug": "tops"}],
            "totalPages": 3,
            "total": 25
        }))
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page, 1);
    }

    #[test]
    fn test_paginated_from_all_slices_and_clamps() {
        let page = Paginated::from_all((1..=50).collect::<Vec<u32>>(), 3, 24);
        assert_eq!(page.items, vec![49, 50]);
        assert_eq!(page.total, 50);
        assert_eq!(page.total_pages, 3);

        let page = Paginated::from_all((1..=50).collect::<Vec<u32>>(), 9, 24);
        assert_eq!(page.page, 3);

        let page = Paginated::from_all(Vec::<u32>::new(), 4, 24);
        assert!(page.items.is_empty());
        assert_eq!((page.page, page.total_pages, page.total), (1, 1, 0));
    }

    #[test]
    fn test_needs_full_listing_ignores_backend_criteria() {
        let filter = ProductFilter::from_query(
            Some("shirt"),
            Some("tops"),
            None,
            None,
            None,
            None,
            None,
            Some("price_asc"),
        );
        assert!(!filter.needs_full_listing());

        let filter = ProductFilter {
            colors: vec!["Red".to_string()],
            ..filter
        };
        assert!(filter.needs_full_listing());
    }

    #[test]
    fn test_total_stock_saturates() {
        let p = product(
            1,
            "Bulk",
            "1",
            vec![
                variant(1, None, None, u32::MAX),
                variant(2, None, None, 5),
            ],
        );
        assert_eq!(p.total_stock(), u32::MAX);
    }
}
