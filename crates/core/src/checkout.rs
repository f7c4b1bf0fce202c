//! Checkout form and orders.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::types::{Email, OrderId, OrderStatus, PaymentMethod, Phone, ProductId, VariantId};
use crate::validation::ValidationErrors;

const MAX_NAME_CHARS: usize = 100;
const MAX_ADDRESS_CHARS: usize = 500;
const MAX_NOTE_CHARS: usize = 500;

/// Raw checkout form fields as posted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub payment_method: String,
}

/// Validated delivery and payment details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutDetails {
    pub full_name: String,
    pub phone: Phone,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub payment_method: PaymentMethod,
}

impl CheckoutForm {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<CheckoutDetails, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let full_name = self.full_name.trim();
        if full_name.is_empty() {
            errors.add("full_name", "Please enter your name.");
        } else if full_name.chars().count() > MAX_NAME_CHARS {
            errors.add("full_name", "Name is too long.");
        }

        let phone = Phone::parse(&self.phone)
            .map_err(|e| errors.add("phone", capitalize(&e.to_string())))
            .ok();

        let email = if self.email.trim().is_empty() {
            None
        } else {
            Email::parse(&self.email)
                .map_err(|e| errors.add("email", capitalize(&e.to_string())))
                .ok()
        };

        let address = self.address.trim();
        if address.is_empty() {
            errors.add("address", "Please enter a delivery address.");
        } else if address.chars().count() > MAX_ADDRESS_CHARS {
            errors.add("address", "Address is too long.");
        }

        let note = self.note.trim();
        if note.chars().count() > MAX_NOTE_CHARS {
            errors.add("note", "Note is too long.");
        }

        let payment_method = self
            .payment_method
            .parse::<PaymentMethod>()
            .map_err(|_| errors.add("payment_method", "Choose a payment method."))
            .ok();

        match (phone, payment_method) {
            (Some(phone), Some(payment_method)) if errors.is_empty() => Ok(CheckoutDetails {
                full_name: full_name.to_owned(),
                phone,
                email,
                address: address.to_owned(),
                note: (!note.is_empty()).then(|| note.to_owned()),
                payment_method,
            }),
            _ => Err(errors),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect::<String>() + "."
    })
}

/// One line of an order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: u32,
}

/// Body of `POST /api/orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    #[serde(flatten)]
    pub details: CheckoutDetails,
    pub items: Vec<OrderItemRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
}

impl OrderRequest {
    /// Build the request from the session cart. `None` when the cart is
    /// empty.
    #[must_use]
    pub fn from_cart(cart: &Cart, details: CheckoutDetails) -> Option<Self> {
        if cart.is_empty() {
            return None;
        }
        Some(Self {
            details,
            items: cart
                .lines()
                .iter()
                .map(|line| OrderItemRequest {
                    product_id: line.product_id,
                    variant_id: line.variant_id,
                    quantity: line.quantity,
                })
                .collect(),
            coupon_code: cart.coupon().map(|c| c.code.clone()),
        })
    }
}

/// A line of a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    #[serde(alias = "productName")]
    pub product_name: String,
    #[serde(default, alias = "variantLabel")]
    pub variant_label: Option<String>,
    pub quantity: u32,
    #[serde(alias = "unitPrice")]
    pub unit_price: Decimal,
}

impl OrderLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// An order as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default, alias = "orderNumber")]
    pub order_number: Option<String>,
    pub status: OrderStatus,
    pub total: Decimal,
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    #[serde(default, alias = "shippingFee")]
    pub shipping_fee: Option<Decimal>,
    #[serde(default)]
    pub discount: Option<Decimal>,
    #[serde(default, alias = "paymentMethod")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default, alias = "customerName")]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderLine>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Number shown to customers; falls back to the id.
    #[must_use]
    pub fn display_number(&self) -> String {
        self.order_number
            .clone()
            .unwrap_or_else(|| format!("#{}", self.id))
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|l| l.quantity).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::cart::{AppliedCoupon, CartLine};

    fn vnd(amount: i64) -> Decimal {
        Decimal::from(amount)
    }

    fn form() -> CheckoutForm {
        CheckoutForm {
            full_name: " Nguyen Van A ".into(),
            phone: "+84 912-345-678".into(),
            email: String::new(),
            address: "12 Le Loi, District 1, HCMC".into(),
            note: String::new(),
            payment_method: "cod".into(),
        }
    }

    fn line(variant: i64, quantity: u32) -> CartLine {
        CartLine {
            variant_id: VariantId::new(variant),
            product_id: ProductId::new(1),
            slug: "linen-shirt".into(),
            name: "Linen Shirt".into(),
            variant_label: "White / M".into(),
            image: None,
            unit_price: vnd(250_000),
            quantity,
            max_stock: None,
        }
    }

    #[test]
    fn test_valid_form() {
        let details = form().validate().unwrap();
        assert_eq!(details.full_name, "Nguyen Van A");
        assert_eq!(details.phone.as_str(), "+84912345678");
        assert_eq!(details.email, None);
        assert_eq!(details.note, None);
        assert_eq!(details.payment_method, PaymentMethod::Cod);
    }

    #[test]
    fn test_collects_field_errors() {
        let bad = CheckoutForm {
            full_name: "  ".into(),
            phone: "12ab".into(),
            email: "not-an-email".into(),
            address: String::new(),
            note: String::new(),
            payment_method: "crypto".into(),
        };
        let errors = bad.validate().unwrap_err();
        for field in ["full_name", "phone", "email", "address", "payment_method"] {
            assert!(errors.has(field), "missing error for {field}");
        }
    }

    #[test]
    fn test_phone_length() {
        let mut f = form();
        f.phone = "12345678".into();
        assert!(f.validate().unwrap_err().has("phone"));
        f.phone = "123456789".into();
        assert!(f.validate().is_ok());
    }

    #[test]
    fn test_email_optional_but_checked() {
        let mut f = form();
        f.email = "buyer@Shop.VN".into();
        assert_eq!(
            f.validate().unwrap().email.unwrap().as_str(),
            "buyer@shop.vn"
        );
    }

    #[test]
    fn test_order_request_from_cart() {
        let mut cart = Cart::default();
        cart.add(line(10, 2)).unwrap();
        cart.add(line(11, 1)).unwrap();
        cart.apply_coupon(AppliedCoupon {
            code: "SALE10".into(),
            discount: vnd(50_000),
        });

        let request = OrderRequest::from_cart(&cart, form().validate().unwrap()).unwrap();
        assert_eq!(request.items.len(), 2);
        assert_eq!(request.items[0].quantity, 2);
        assert_eq!(request.coupon_code.as_deref(), Some("SALE10"));

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["payment_method"], "cod");
        assert_eq!(body["phone"], "+84912345678");
        assert!(body.get("email").is_none());
    }

    #[test]
    fn test_empty_cart_has_no_request() {
        assert!(OrderRequest::from_cart(&Cart::default(), form().validate().unwrap()).is_none());
    }

    #[test]
    fn test_order_deserializes_camel_case() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": 42,
            "orderNumber": "BZ-0042",
            "status": "shipping",
            "total": "530000",
            "items": [{"productName": "Linen Shirt", "quantity": 2, "unitPrice": "250000"}]
        }))
        .unwrap();
        assert_eq!(order.display_number(), "BZ-0042");
        assert_eq!(order.status, OrderStatus::Shipping);
        assert_eq!(order.item_count(), 2);
        assert_eq!(order.items[0].line_total(), vnd(500_000));
    }
}
