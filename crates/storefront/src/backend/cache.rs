//! Cache types for catalog responses.

use std::time::Duration;

use bazaar_core::catalog::{Category, Color, Paginated, Product, Size};
use moka::future::Cache;

const CACHE_CAPACITY: u64 = 1000;
const CACHE_TTL: Duration = Duration::from_secs(300);

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(String),
    /// Listing keyed by its encoded query string. Searches are never cached.
    Products(String),
    Categories,
    Colors,
    Sizes,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Paginated<Product>),
    Categories(Vec<Category>),
    Colors(Vec<Color>),
    Sizes(Vec<Size>),
}

pub fn build() -> Cache<CacheKey, CacheValue> {
    Cache::builder()
        .max_capacity(CACHE_CAPACITY)
        .time_to_live(CACHE_TTL)
        .build()
}
