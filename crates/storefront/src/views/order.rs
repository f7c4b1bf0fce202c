//! Order view models.

use bazaar_core::CurrencyCode;
use bazaar_core::checkout::Order;

#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub name: String,
    pub variant: Option<String>,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

/// An order with display strings.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: i64,
    pub number: String,
    pub status: &'static str,
    pub status_class: &'static str,
    pub date: Option<String>,
    pub total: String,
    pub subtotal: Option<String>,
    pub shipping: Option<String>,
    pub discount: Option<String>,
    pub payment: Option<&'static str>,
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub lines: Vec<OrderLineView>,
    pub item_count: u32,
}

impl OrderView {
    #[must_use]
    pub fn new(order: &Order, currency: CurrencyCode) -> Self {
        Self {
            id: order.id.as_i64(),
            number: order.display_number(),
            status: order.status.label(),
            status_class: order.status.as_str(),
            date: order.created_at.map(|d| d.format("%d/%m/%Y %H:%M").to_string()),
            total: currency.format(order.total),
            subtotal: order.subtotal.map(|d| currency.format(d)),
            shipping: order.shipping_fee.map(|d| currency.format(d)),
            discount: order
                .discount
                .filter(|d| !d.is_zero())
                .map(|d| currency.format(d)),
            payment: order.payment_method.map(|p| p.label()),
            customer_name: order.customer_name.clone(),
            phone: order.phone.clone(),
            address: order.address.clone(),
            lines: order
                .items
                .iter()
                .map(|line| OrderLineView {
                    name: line.product_name.clone(),
                    variant: line.variant_label.clone(),
                    quantity: line.quantity,
                    unit_price: currency.format(line.unit_price),
                    line_total: currency.format(line.line_total()),
                })
                .collect(),
            item_count: order.items.iter().map(|l| l.quantity).sum(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_order_view() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": 12,
            "status": "pending",
            "total": 330000,
            "discount": 0,
            "paymentMethod": "cod",
            "items": [
                {"productName": "Lamp", "quantity": 2, "unitPrice": 150000}
            ]
        }))
        .unwrap();
        let view = OrderView::new(&order, CurrencyCode::VND);
        assert_eq!(view.number, "#12");
        assert_eq!(view.total, "330.000₫");
        assert_eq!(view.discount, None);
        assert_eq!(view.payment, Some("Cash on delivery"));
        assert_eq!(view.item_count, 2);
        assert_eq!(view.lines[0].line_total, "300.000₫");
    }
}
