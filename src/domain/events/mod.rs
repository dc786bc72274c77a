//! Domain events
use crate::domain::aggregates::PaymentStatus;
use crate::domain::value_objects::{CartKey, Money};

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Cart(CartEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq)]
pub enum CartEvent {
    /// Raised on every successful add, merged or not.
    ItemAdded { key: CartKey, name: String, variant: Option<String>, quantity: u32 },
}

impl CartEvent {
    /// Short confirmation shown to the shopper.
    pub fn notice(&self) -> String {
        match self {
            Self::ItemAdded { name, variant: Some(label), .. } => format!("{name} ({label}) has been added to your cart"),
            Self::ItemAdded { name, variant: None, .. } => format!("{name} has been added to your cart"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum OrderEvent {
    /// A snapshot was persisted and the cart cleared. `summary` is the shop message text.
    Placed { order_number: String, total: Money, payment: PaymentStatus, summary: String },
}
