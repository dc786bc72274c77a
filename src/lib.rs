//! Storefront cart engine
//!
//! Cart, pricing and checkout for a small direct-to-consumer shop.
//!
//! ## Features
//! - Cart lines keyed by product and weight/size variant
//! - Sale pricing (flat or percentage, optionally time-limited)
//! - Flat-rate shipping with a free-shipping threshold
//! - Checkout into immutable order snapshots with compact bill numbers
//! - Sales reporting over placed orders

pub mod api;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod reporting;

pub use checkout::{Checkout, CheckoutError, CheckoutForm, CheckoutOutcome};
pub use domain::aggregates::{Cart, CartItem, OrderSnapshot, Product, Variant};
pub use domain::pricing::{final_price, is_sale_active, ShippingPolicy};
pub use domain::value_objects::{CartKey, Money};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_selection_scenario() {
        let rice = Product::new("A", "Rice", Money::rupees(60)).with_variants(vec![Variant::new("100g", Money::rupees(120))]);
        let mut cart = Cart::new();
        cart.add_to_cart(&rice, None);
        cart.add_to_cart(&rice, rice.variant("100g"));
        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.subtotal(), Money::rupees(180));
        assert_eq!(cart.shipping_cost(), Money::rupees(100));
    }
}
