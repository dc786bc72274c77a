//! Order Aggregate
//!
//! An [`OrderSnapshot`] is captured once at checkout and never mutated here.
//! Status changes after placement belong to the order store.

use chrono::{DateTime, Datelike, Month, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::aggregates::{Cart, CartItem, SelectedVariant};
use crate::domain::pricing::OrderTotals;
use crate::domain::value_objects::Money;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryType { Shipping, #[default] SelfPickup }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod { #[default] Online, Cod }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus { #[default] Pending, Paid }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Pending, Processing, Waiting, Shipping, Delivered, Cancelled }

impl DeliveryType {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Shipping => "shipping", Self::SelfPickup => "self-pickup" }
    }
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Online => "online", Self::Cod => "cod" }
    }
    pub fn label(&self) -> &'static str {
        match self { Self::Online => "Online Payment", Self::Cod => "Cash on Delivery" }
    }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Paid => "paid" }
    }
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending", Self::Processing => "processing", Self::Waiting => "waiting",
            Self::Shipping => "shipping", Self::Delivered => "delivered", Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub struct UnknownValue(pub String);
impl std::error::Error for UnknownValue {}
impl fmt::Display for UnknownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Unknown value: {}", self.0) }
}

impl FromStr for DeliveryType {
    type Err = UnknownValue;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s { "shipping" => Ok(Self::Shipping), "self-pickup" => Ok(Self::SelfPickup), _ => Err(UnknownValue(s.into())) }
    }
}

impl FromStr for PaymentMethod {
    type Err = UnknownValue;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s { "online" => Ok(Self::Online), "cod" => Ok(Self::Cod), _ => Err(UnknownValue(s.into())) }
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownValue;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s { "pending" => Ok(Self::Pending), "paid" => Ok(Self::Paid), _ => Err(UnknownValue(s.into())) }
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownValue;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Pending, Self::Processing, Self::Waiting, Self::Shipping, Self::Delivered, Self::Cancelled]
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownValue(s.into()))
    }
}

/// Fields an order store writes when a seller moves an order to `status`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusChange { pub order_status: OrderStatus, pub payment_status: Option<PaymentStatus> }

/// Delivering a cash-on-delivery order settles its payment.
pub fn status_change(method: PaymentMethod, status: OrderStatus) -> StatusChange {
    let payment_status = match (method, status) {
        (PaymentMethod::Cod, OrderStatus::Delivered) => Some(PaymentStatus::Paid),
        _ => None,
    };
    StatusChange { order_status: status, payment_status }
}

const MONTH_CODES: [char; 12] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L'];
const DAY_CODES: [char; 7] = ['A', 'B', 'C', 'D', 'E', 'F', 'G'];
const WEEKDAYS: [Weekday; 7] = [Weekday::Sun, Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri, Weekday::Sat];
const MONTHS: [Month; 12] = [
    Month::January, Month::February, Month::March, Month::April, Month::May, Month::June,
    Month::July, Month::August, Month::September, Month::October, Month::November, Month::December,
];

/// Compact bill number: month letter, weekday letter (Sunday = A), day of month, bill of the day.
/// `BA0801` is the first order on Sunday 8 February.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(pub(crate) String);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderNumberParts { pub month: Month, pub weekday: Weekday, pub day: u32, pub bill: u32 }

impl OrderNumber {
    pub fn generate(date: NaiveDate, existing_orders_today: u32) -> Self {
        let month = MONTH_CODES[date.month0() as usize];
        let weekday = DAY_CODES[date.weekday().num_days_from_sunday() as usize];
        Self(format!("{month}{weekday}{:02}{:02}", date.day(), existing_orders_today + 1))
    }

    pub fn parse(code: &str) -> Option<OrderNumberParts> {
        if code.len() < 6 || !code.is_ascii() { return None; }
        let mut chars = code.chars();
        let month = chars.next().and_then(|c| MONTH_CODES.iter().position(|m| *m == c))?;
        let weekday = chars.next().and_then(|c| DAY_CODES.iter().position(|d| *d == c))?;
        let day = code.get(2..4)?.parse().ok()?;
        let bill = code.get(4..)?.parse().ok()?;
        Some(OrderNumberParts { month: MONTHS[month], weekday: WEEKDAYS[weekday], day, bill })
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Compact bill numbers are shown as-is; anything else (a uuid) by its first 8 characters.
pub fn display_order_id(id: &str) -> String {
    let b = id.as_bytes();
    let compact = b.len() == 6
        && (b'A'..=b'L').contains(&b[0])
        && (b'A'..=b'G').contains(&b[1])
        && b[2..].iter().all(u8::is_ascii_digit);
    if compact { id.to_string() } else { id.chars().take(8).collect::<String>().to_uppercase() }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer { pub name: String, pub phone: String, pub address: Option<String> }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: String,
    pub name: String,
    pub price: Money,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_variant: Option<SelectedVariant>,
}

impl OrderLine {
    pub fn line_total(&self) -> Money { self.price.multiply(self.quantity) }

    fn display_name(&self) -> String {
        match &self.selected_variant {
            Some(v) => format!("{} ({})", self.name, v.weight),
            None => self.name.clone(),
        }
    }
}

impl From<&CartItem> for OrderLine {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id.clone(), name: item.name.clone(), price: item.unit_price(),
            quantity: item.quantity, selected_variant: item.selected_variant.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub(crate) id: Uuid,
    pub(crate) order_number: OrderNumber,
    pub(crate) customer_name: String,
    pub(crate) customer_phone: String,
    pub(crate) customer_address: Option<String>,
    pub(crate) delivery_type: DeliveryType,
    pub(crate) payment_method: PaymentMethod,
    pub(crate) payment_status: PaymentStatus,
    pub(crate) order_status: OrderStatus,
    pub(crate) items: Vec<OrderLine>,
    pub(crate) subtotal: Money,
    pub(crate) shipping_cost: Money,
    pub(crate) total: Money,
    pub(crate) created_at: DateTime<Utc>,
}

/// Everything checkout decided about an order besides the cart contents.
#[derive(Clone, Debug)]
pub struct OrderTerms {
    pub order_number: OrderNumber,
    pub customer: Customer,
    pub delivery: DeliveryType,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub totals: OrderTotals,
}

impl OrderSnapshot {
    pub fn capture(cart: &Cart, terms: OrderTerms, created_at: DateTime<Utc>) -> Self {
        let OrderTerms { order_number, customer, delivery, payment_method, payment_status, totals } = terms;
        let customer_address = match delivery {
            DeliveryType::Shipping => customer.address,
            DeliveryType::SelfPickup => None,
        };
        Self {
            id: Uuid::now_v7(), order_number, customer_name: customer.name, customer_phone: customer.phone,
            customer_address, delivery_type: delivery, payment_method, payment_status,
            order_status: OrderStatus::Pending, items: cart.items().iter().map(OrderLine::from).collect(),
            subtotal: totals.subtotal, shipping_cost: totals.shipping, total: totals.total, created_at,
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_number(&self) -> &OrderNumber { &self.order_number }
    pub fn customer_name(&self) -> &str { &self.customer_name }
    pub fn customer_phone(&self) -> &str { &self.customer_phone }
    pub fn customer_address(&self) -> Option<&str> { self.customer_address.as_deref() }
    pub fn delivery_type(&self) -> DeliveryType { self.delivery_type }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn payment_status(&self) -> PaymentStatus { self.payment_status }
    pub fn order_status(&self) -> OrderStatus { self.order_status }
    pub fn items(&self) -> &[OrderLine] { &self.items }
    pub fn subtotal(&self) -> Money { self.subtotal }
    pub fn shipping_cost(&self) -> Money { self.shipping_cost }
    pub fn total(&self) -> Money { self.total }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    /// Plain-text order message for the shop's messaging channel.
    pub fn summary(&self, store_name: &str) -> String {
        let items = self.items.iter()
            .map(|i| format!("• {}: {} × {} = {}", i.display_name(), i.price, i.quantity, i.line_total()))
            .collect::<Vec<_>>()
            .join("\n");
        let delivery = match (&self.delivery_type, &self.customer_address) {
            (DeliveryType::Shipping, Some(address)) => format!("Address: {address}"),
            (DeliveryType::Shipping, None) => "Address: -".to_string(),
            (DeliveryType::SelfPickup, _) => "Delivery: Self Pickup".to_string(),
        };
        let shipping = match self.delivery_type {
            DeliveryType::Shipping if self.shipping_cost.is_zero() => format!("Shipping: {} (FREE!)\n", self.shipping_cost),
            DeliveryType::Shipping => format!("Shipping: {}\n", self.shipping_cost),
            DeliveryType::SelfPickup => String::new(),
        };
        format!(
            "New Order {} from {store_name}\n\nCustomer Details:\nName: {}\nPhone: {}\n{delivery}\n\nOrder Details:\n{items}\n\nBill Summary:\nSubtotal: {}\n{shipping}Grand Total: {}\n\nPayment: {} ({})",
            self.order_number, self.customer_name, self.customer_phone, self.subtotal, self.total,
            self.payment_status.as_str().to_uppercase(), self.payment_method.label(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Product, Variant};

    fn terms(delivery: DeliveryType, totals: OrderTotals) -> OrderTerms {
        OrderTerms {
            order_number: OrderNumber::generate(NaiveDate::from_ymd_opt(2026, 2, 8).unwrap(), 0),
            customer: Customer { name: "Anitha".into(), phone: "9876543210".into(), address: Some("12 Temple St".into()) },
            delivery, payment_method: PaymentMethod::Online, payment_status: PaymentStatus::Paid, totals,
        }
    }

    fn cart() -> Cart {
        let mut cart = Cart::new();
        let p = Product::new("A", "Turmeric", Money::rupees(60)).with_variants(vec![Variant::new("100g", Money::rupees(120))]);
        cart.add_to_cart(&p, p.variant("100g"));
        cart.add_to_cart(&p, p.variant("100g"));
        cart
    }

    #[test]
    fn test_order_number_generate() {
        let sunday = NaiveDate::from_ymd_opt(2026, 2, 8).unwrap();
        assert_eq!(OrderNumber::generate(sunday, 0).as_str(), "BA0801");
        let saturday = NaiveDate::from_ymd_opt(2026, 12, 26).unwrap();
        assert_eq!(OrderNumber::generate(saturday, 11).as_str(), "LG2612");
    }

    #[test]
    fn test_order_number_parse() {
        let parts = OrderNumber::parse("BA0801").unwrap();
        assert_eq!(parts, OrderNumberParts { month: Month::February, weekday: Weekday::Sun, day: 8, bill: 1 });
        assert!(OrderNumber::parse("BA08").is_none());
        assert!(OrderNumber::parse("ZA0801").is_none());
        assert!(OrderNumber::parse("BH0801").is_none());
    }

    #[test]
    fn test_display_order_id() {
        assert_eq!(display_order_id("BA0801"), "BA0801");
        assert_eq!(display_order_id("0193f2ab-7c1d-7000-8000-000000000000"), "0193F2AB");
        assert_eq!(display_order_id("ma0801xyz"), "MA0801XY");
    }

    #[test]
    fn test_status_strings_round_trip() {
        assert_eq!("self-pickup".parse::<DeliveryType>(), Ok(DeliveryType::SelfPickup));
        assert_eq!("cod".parse::<PaymentMethod>(), Ok(PaymentMethod::Cod));
        assert_eq!(OrderStatus::Waiting.as_str().parse::<OrderStatus>(), Ok(OrderStatus::Waiting));
        assert!("refunded".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_status_change_settles_cod_on_delivery() {
        assert_eq!(status_change(PaymentMethod::Cod, OrderStatus::Delivered).payment_status, Some(PaymentStatus::Paid));
        assert_eq!(status_change(PaymentMethod::Online, OrderStatus::Delivered).payment_status, None);
        assert_eq!(status_change(PaymentMethod::Cod, OrderStatus::Shipping).payment_status, None);
    }

    #[test]
    fn test_capture_snapshot() {
        let cart = cart();
        let totals = OrderTotals { subtotal: Money::rupees(240), shipping: Money::ZERO, total: Money::rupees(240) };
        let order = OrderSnapshot::capture(&cart, terms(DeliveryType::SelfPickup, totals), Utc::now());
        assert_eq!(order.items().len(), 1);
        assert_eq!(order.items()[0].quantity, 2);
        assert_eq!(order.items()[0].price, Money::rupees(120));
        assert_eq!(order.customer_address(), None);
        assert_eq!(order.order_status(), OrderStatus::Pending);
        assert_eq!(order.total(), Money::rupees(240));
    }

    #[test]
    fn test_snapshot_wire_names() {
        let totals = OrderTotals { subtotal: Money::rupees(240), shipping: Money::ZERO, total: Money::rupees(240) };
        let order = OrderSnapshot::capture(&cart(), terms(DeliveryType::Shipping, totals), Utc::now());
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["delivery_type"], "shipping");
        assert_eq!(json["payment_method"], "online");
        assert_eq!(json["payment_status"], "paid");
        assert_eq!(json["customer_address"], "12 Temple St");
        assert_eq!(json["items"][0]["selectedVariant"]["weight"], "100g");
    }

    #[test]
    fn test_summary() {
        let totals = OrderTotals { subtotal: Money::rupees(240), shipping: Money::ZERO, total: Money::rupees(240) };
        let order = OrderSnapshot::capture(&cart(), terms(DeliveryType::Shipping, totals), Utc::now());
        let text = order.summary("Puthiyam Products");
        assert!(text.contains("• Turmeric (100g): ₹120 × 2 = ₹240"));
        assert!(text.contains("Address: 12 Temple St"));
        assert!(text.contains("Shipping: ₹0 (FREE!)"));
        assert!(text.contains("Grand Total: ₹240"));
        assert!(text.contains("Payment: PAID"));
    }
}
