//! Pricing rules: sale discounts and shipping.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::aggregates::{DeliveryType, DiscountKind, Product};
use crate::domain::value_objects::Money;

pub const FREE_SHIPPING_THRESHOLD: i64 = 200;
pub const FLAT_SHIPPING_FEE: i64 = 100;

/// Flat-rate shipping, waived once the subtotal reaches the threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPolicy {
    pub free_threshold: Money,
    pub flat_fee: Money,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self { free_threshold: Money::rupees(FREE_SHIPPING_THRESHOLD), flat_fee: Money::rupees(FLAT_SHIPPING_FEE) }
    }
}

impl ShippingPolicy {
    pub fn qualifies_for_free_shipping(&self, subtotal: Money) -> bool { subtotal >= self.free_threshold }

    pub fn shipping_cost(&self, subtotal: Money) -> Money {
        if self.qualifies_for_free_shipping(subtotal) { Money::ZERO } else { self.flat_fee }
    }

    /// How much more the customer must add before shipping is free.
    pub fn amount_to_free_shipping(&self, subtotal: Money) -> Money { (self.free_threshold - subtotal).floor_zero() }

    pub fn order_totals(&self, subtotal: Money, delivery: DeliveryType) -> OrderTotals {
        let shipping = match delivery {
            DeliveryType::Shipping => self.shipping_cost(subtotal),
            DeliveryType::SelfPickup => Money::ZERO,
        };
        OrderTotals { subtotal, shipping, total: subtotal + shipping }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub shipping: Money,
    pub total: Money,
}

pub fn is_sale_active(product: &Product, now: DateTime<Utc>) -> bool {
    match product.sale() {
        Some(sale) => sale.ends_at.map_or(true, |end| end > now),
        None => false,
    }
}

/// Price after any active sale. Never negative.
pub fn final_price(unit_price: Money, product: &Product, now: DateTime<Utc>) -> Money {
    let Some(sale) = product.sale().filter(|_| is_sale_active(product, now)) else { return unit_price };
    match sale.kind {
        DiscountKind::Percentage => {
            let off = unit_price.amount() * sale.discount / Decimal::ONE_HUNDRED;
            (unit_price - Money::new(off)).round_whole().floor_zero()
        }
        DiscountKind::Amount => (unit_price - Money::new(sale.discount)).floor_zero(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::domain::aggregates::Sale;

    fn product(sale: Sale) -> Product { Product::new("1", "Turmeric", Money::rupees(100)).with_sale(sale) }

    #[test]
    fn test_shipping_threshold_inclusive() {
        let policy = ShippingPolicy::default();
        assert_eq!(policy.shipping_cost(Money::rupees(199)), Money::rupees(100));
        assert_eq!(policy.shipping_cost(Money::rupees(200)), Money::ZERO);
        assert_eq!(policy.amount_to_free_shipping(Money::rupees(150)), Money::rupees(50));
        assert_eq!(policy.amount_to_free_shipping(Money::rupees(320)), Money::ZERO);
    }

    #[test]
    fn test_self_pickup_forces_zero_shipping() {
        let policy = ShippingPolicy::default();
        let shipped = policy.order_totals(Money::rupees(150), DeliveryType::Shipping);
        assert_eq!(shipped.total, Money::rupees(250));
        let pickup = policy.order_totals(Money::rupees(150), DeliveryType::SelfPickup);
        assert_eq!(pickup.shipping, Money::ZERO);
        assert_eq!(pickup.total, Money::rupees(150));
    }

    #[test]
    fn test_percentage_discount() {
        let now = Utc::now();
        assert_eq!(final_price(Money::rupees(100), &product(Sale::percentage(10)), now), Money::rupees(90));
        // 35 * 0.85 = 29.75
        assert_eq!(final_price(Money::rupees(35), &product(Sale::percentage(15)), now), Money::rupees(30));
    }

    #[test]
    fn test_amount_discount_floors_at_zero() {
        let now = Utc::now();
        assert_eq!(final_price(Money::rupees(100), &product(Sale::amount(150)), now), Money::ZERO);
        assert_eq!(final_price(Money::rupees(100), &product(Sale::amount(25)), now), Money::rupees(75));
    }

    #[test]
    fn test_sale_expiry() {
        let now = Utc::now();
        let expired = product(Sale::percentage(10).until(now - Duration::hours(1)));
        assert!(!is_sale_active(&expired, now));
        assert_eq!(final_price(Money::rupees(100), &expired, now), Money::rupees(100));

        let running = product(Sale::percentage(10).until(now + Duration::hours(1)));
        assert!(is_sale_active(&running, now));
    }

    #[test]
    fn test_no_sale() {
        let p = Product::new("2", "Rice", Money::rupees(280));
        assert!(!is_sale_active(&p, Utc::now()));
        assert_eq!(final_price(Money::rupees(280), &p, Utc::now()), Money::rupees(280));
    }
}
