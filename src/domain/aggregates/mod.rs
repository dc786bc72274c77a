//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::{DiscountKind, Product, Sale, Variant};
pub use order::{
    display_order_id, status_change, Customer, DeliveryType, OrderLine, OrderNumber, OrderNumberParts,
    OrderSnapshot, OrderStatus, OrderTerms, PaymentMethod, PaymentStatus, StatusChange, UnknownValue,
};
pub use cart::{Cart, CartItem, SelectedVariant};
