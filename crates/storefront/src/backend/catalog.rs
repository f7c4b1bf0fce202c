//! Catalog endpoints: products, facets, reviews, recommendations.

use bazaar_core::ProductId;
use bazaar_core::catalog::{Category, Color, Paginated, Product, ProductSort, Size};
use bazaar_core::review::{NewReview, Review};
use tracing::{debug, instrument};

use super::cache::{CacheKey, CacheValue};
use super::{ApiError, BackendClient, segment};

/// Page size used when walking a whole listing.
const FULL_LISTING_LIMIT: u32 = 100;
/// Stop walking a listing after this many backend pages.
const FULL_LISTING_MAX_PAGES: u32 = 20;

/// Server-side listing parameters for `GET /api/products`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub page: u32,
    pub limit: u32,
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: ProductSort,
    /// Restrict to these products (wishlist and compare pages).
    pub ids: Vec<ProductId>,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 24,
            category: None,
            search: None,
            sort: ProductSort::default(),
            ids: Vec::new(),
        }
    }
}

impl ProductQuery {
    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.max(1).to_string()),
            ("limit", self.limit.to_string()),
            ("sort", self.sort.as_str().to_string()),
        ];
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if !self.ids.is_empty() {
            let ids = self
                .ids
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("ids", ids));
        }
        pairs
    }

    fn cache_key(&self) -> Option<CacheKey> {
        if self.search.is_some() || !self.ids.is_empty() {
            return None;
        }
        let key = self
            .to_pairs()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        Some(CacheKey::Products(key))
    }
}

impl BackendClient {
    /// Get a page of products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn products(&self, query: &ProductQuery) -> Result<Paginated<Product>, ApiError> {
        let cache_key = query.cache_key();
        if let Some(key) = &cache_key
            && let Some(CacheValue::Products(page)) = self.inner.cache.get(key).await
        {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let page: Paginated<Product> = self.get("/api/products", &query.to_pairs(), None).await?;

        if let Some(key) = cache_key {
            self.inner
                .cache
                .insert(key, CacheValue::Products(page.clone()))
                .await;
        }
        Ok(page)
    }

    /// Get every product matching the backend-side part of `query`
    /// (category, search, sort), walking its pages in order.
    ///
    /// `page` and `limit` on `query` are ignored. The walk stops after
    /// `FULL_LISTING_MAX_PAGES` pages.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    #[instrument(skip(self))]
    pub async fn all_products(&self, query: &ProductQuery) -> Result<Vec<Product>, ApiError> {
        let mut page_query = ProductQuery {
            page: 1,
            limit: FULL_LISTING_LIMIT,
            ..query.clone()
        };
        let mut products = Vec::new();
        loop {
            let page = self.products(&page_query).await?;
            let last = page.total_pages.min(FULL_LISTING_MAX_PAGES);
            let empty = page.items.is_empty();
            products.extend(page.items);
            if empty || page_query.page >= last {
                if page.total_pages > FULL_LISTING_MAX_PAGES {
                    tracing::warn!(
                        total_pages = page.total_pages,
                        "Product listing truncated"
                    );
                }
                break;
            }
            page_query.page += 1;
        }
        Ok(products)
    }

    /// Get specific products, in the order of `ids`. Unknown ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = ProductQuery {
            limit: u32::try_from(ids.len()).unwrap_or(u32::MAX),
            ids: ids.to_vec(),
            ..ProductQuery::default()
        };
        let mut products = self.products(&query).await?.items;
        products.retain(|p| ids.contains(&p.id));
        products.sort_by_key(|p| ids.iter().position(|id| *id == p.id));
        Ok(products)
    }

    /// Get a product by its slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn product_by_slug(&self, slug: &str) -> Result<Product, ApiError> {
        let key = CacheKey::Product(slug.to_string());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Product = self
            .get(&format!("/api/products/{}", segment(slug)), &[], None)
            .await?;

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// Get all categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(c)) = self.inner.cache.get(&CacheKey::Categories).await {
            return Ok(c);
        }
        let categories: Vec<Category> = self.get("/api/categories", &[], None).await?;
        self.inner
            .cache
            .insert(CacheKey::Categories, CacheValue::Categories(categories.clone()))
            .await;
        Ok(categories)
    }

    /// Get all color facet values.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn colors(&self) -> Result<Vec<Color>, ApiError> {
        if let Some(CacheValue::Colors(c)) = self.inner.cache.get(&CacheKey::Colors).await {
            return Ok(c);
        }
        let colors: Vec<Color> = self.get("/api/colors", &[], None).await?;
        self.inner
            .cache
            .insert(CacheKey::Colors, CacheValue::Colors(colors.clone()))
            .await;
        Ok(colors)
    }

    /// Get all size facet values.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn sizes(&self) -> Result<Vec<Size>, ApiError> {
        if let Some(CacheValue::Sizes(s)) = self.inner.cache.get(&CacheKey::Sizes).await {
            return Ok(s);
        }
        let sizes: Vec<Size> = self.get("/api/sizes", &[], None).await?;
        self.inner
            .cache
            .insert(CacheKey::Sizes, CacheValue::Sizes(sizes.clone()))
            .await;
        Ok(sizes)
    }

    /// Get published reviews for a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn reviews(&self, product_id: ProductId) -> Result<Vec<Review>, ApiError> {
        self.get(&format!("/api/products/{product_id}/reviews"), &[], None)
            .await
    }

    /// Submit a review as the signed-in customer.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is rejected or the backend refuses the
    /// review (for example, the customer never bought the product).
    #[instrument(skip(self, token, review))]
    pub async fn submit_review(
        &self,
        token: &str,
        product_id: ProductId,
        review: &NewReview,
    ) -> Result<Review, ApiError> {
        self.post(
            &format!("/api/products/{product_id}/reviews"),
            review,
            Some(token),
        )
        .await
    }

    /// Products related to a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn related_products(&self, product_id: ProductId) -> Result<Vec<Product>, ApiError> {
        self.get(
            &format!("/api/recommendations/product/{product_id}"),
            &[],
            None,
        )
        .await
    }

    /// Personal recommendations for the signed-in customer.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is rejected or the API request fails.
    #[instrument(skip(self, token))]
    pub async fn recommended_for_me(&self, token: &str) -> Result<Vec<Product>, ApiError> {
        self.get("/api/recommendations/me", &[], Some(token)).await
    }
}
