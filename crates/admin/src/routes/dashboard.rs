//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use bazaar_core::CurrencyCode;
use tower_sessions::Session;
use tracing::instrument;

use super::page_data;
use crate::backend::DashboardStats;
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;
use crate::views::{Layout, OrderRow};

/// Orders shown under the totals.
const RECENT_ORDERS: usize = 8;

/// Dashboard metrics, formatted.
#[derive(Debug, Clone)]
pub struct DashboardMetrics {
    pub orders: String,
    pub revenue: String,
    pub customers: String,
    pub products: String,
    pub pending: String,
}

impl DashboardMetrics {
    fn new(stats: &DashboardStats, currency: CurrencyCode) -> Self {
        Self {
            orders: stats.total_orders.to_string(),
            revenue: currency.format(stats.total_revenue),
            customers: stats.total_customers.to_string(),
            products: stats.total_products.to_string(),
            pending: stats.pending_orders.to_string(),
        }
    }
}

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub metrics: DashboardMetrics,
    pub recent_orders: Vec<OrderRow>,
}

/// Display the dashboard.
#[instrument(skip(state, session, layout, admin))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    mut layout: Layout,
    RequireAdminAuth(admin): RequireAdminAuth,
) -> Response {
    let result = state.backend().dashboard(&admin.token).await;
    let stats = match page_data(result, DashboardStats::default(), &session, &mut layout).await {
        Ok(stats) => stats,
        Err(response) => return response,
    };

    let currency = state.config().currency;
    DashboardTemplate {
        layout,
        metrics: DashboardMetrics::new(&stats, currency),
        recent_orders: stats
            .recent_orders
            .iter()
            .take(RECENT_ORDERS)
            .map(|order| OrderRow::new(order, currency))
            .collect(),
    }
    .into_response()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_metrics_format_revenue() {
        let stats = DashboardStats {
            total_orders: 12,
            total_revenue: Decimal::new(3_450_000, 0),
            pending_orders: 2,
            ..DashboardStats::default()
        };
        let metrics = DashboardMetrics::new(&stats, CurrencyCode::VND);
        assert_eq!(metrics.orders, "12");
        assert_eq!(metrics.revenue, "3.450.000₫");
        assert_eq!(metrics.pending, "2");
    }
}
