//! Order rows for the admin order list and dashboard.

use bazaar_core::checkout::Order;
use bazaar_core::{CurrencyCode, OrderStatus};

use super::datetime;

/// An entry of the status picker.
#[derive(Debug, Clone)]
pub struct StatusOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// One order in a table.
#[derive(Debug, Clone)]
pub struct OrderRow {
    pub id: i64,
    pub number: String,
    pub customer: String,
    pub phone: String,
    pub items: u32,
    pub total: String,
    pub payment: &'static str,
    pub status: &'static str,
    pub status_class: &'static str,
    pub date: String,
    /// Delivered, cancelled and returned orders cannot be moved.
    pub is_final: bool,
    pub status_options: Vec<StatusOption>,
}

impl OrderRow {
    #[must_use]
    pub fn new(order: &Order, currency: CurrencyCode) -> Self {
        Self {
            id: order.id.as_i64(),
            number: order.display_number(),
            customer: order
                .customer_name
                .clone()
                .unwrap_or_else(|| "Guest".to_string()),
            phone: order.phone.clone().unwrap_or_default(),
            items: order.item_count(),
            total: currency.format(order.total),
            payment: order.payment_method.map_or("", |p| p.label()),
            status: order.status.label(),
            status_class: order.status.as_str(),
            date: order.created_at.map(datetime).unwrap_or_default(),
            is_final: order.status.is_final(),
            status_options: status_options(Some(order.status)),
        }
    }
}

/// Every settable status, marking `current`.
#[must_use]
pub fn status_options(current: Option<OrderStatus>) -> Vec<StatusOption> {
    OrderStatus::SETTABLE
        .into_iter()
        .map(|status| StatusOption {
            value: status.as_str(),
            label: status.label(),
            selected: current == Some(status),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_row() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": 31,
            "orderNumber": "BZ-0031",
            "status": "delivered",
            "total": 1250000,
            "paymentMethod": "bank_transfer",
            "items": [
                {"productName": "Vase", "quantity": 3, "unitPrice": 400000}
            ],
            "createdAt": "2025-05-02T14:30:00Z"
        }))
        .unwrap();
        let row = OrderRow::new(&order, CurrencyCode::VND);
        assert_eq!(row.number, "BZ-0031");
        assert_eq!(row.customer, "Guest");
        assert_eq!(row.items, 3);
        assert_eq!(row.total, "1.250.000₫");
        assert_eq!(row.date, "02/05/2025 14:30");
        assert!(row.is_final);
        assert_eq!(
            row.status_options.iter().filter(|o| o.selected).count(),
            1
        );
    }
}
