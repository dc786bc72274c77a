//! Value Objects for the cart engine

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul, Sub};

/// Money value object. Single currency, whole or fractional rupees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self { Self(amount) }
    pub fn rupees(amount: i64) -> Self { Self(Decimal::from(amount)) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_zero(&self) -> bool { self.0.is_zero() }
    pub fn multiply(&self, qty: u32) -> Money { Money(self.0 * Decimal::from(qty)) }

    /// Clamps negative amounts to zero.
    pub fn floor_zero(self) -> Money { Money(self.0.max(Decimal::ZERO)) }

    /// Rounds to the nearest whole currency unit, halves away from zero.
    pub fn round_whole(self) -> Money {
        Money(self.0.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money { Money(self.0 + rhs.0) }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money { Money(self.0 - rhs.0) }
}

impl Mul<u32> for Money {
    type Output = Money;
    fn mul(self, qty: u32) -> Money { self.multiply(qty) }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::ZERO, Add::add) }
}

impl From<i64> for Money {
    fn from(amount: i64) -> Self { Self::rupees(amount) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "₹{}", self.0.normalize()) }
}

/// Identity of a cart line: `productId`, or `productId-variantLabel` when a variant is selected.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartKey(String);

impl CartKey {
    pub fn new(product_id: &str, variant_label: Option<&str>) -> Self {
        match variant_label {
            Some(label) => Self(format!("{product_id}-{label}")),
            None => Self(product_id.to_string()),
        }
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&str> for CartKey {
    fn from(raw: &str) -> Self { Self(raw.to_string()) }
}

impl From<String> for CartKey {
    fn from(raw: String) -> Self { Self(raw) }
}

impl fmt::Display for CartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Quantity value object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);

    pub fn new(value: u32) -> Self { Self(value) }

    /// Interprets a requested quantity; anything at or below zero means "no line".
    pub fn from_requested(value: i64) -> Option<Self> {
        if value <= 0 { return None; }
        Some(Self(u32::try_from(value).unwrap_or(u32::MAX)))
    }
    pub fn value(&self) -> u32 { self.0 }
    pub fn increment(&self) -> Self { Self(self.0.saturating_add(1)) }
}

impl Default for Quantity { fn default() -> Self { Self::ONE } }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_key() {
        assert_eq!(CartKey::new("42", None).as_str(), "42");
        assert_eq!(CartKey::new("42", Some("100g")).as_str(), "42-100g");
    }

    #[test]
    fn test_money_arithmetic() {
        let total: Money = [Money::rupees(60).multiply(2), Money::rupees(100)].into_iter().sum();
        assert_eq!(total, Money::rupees(220));
        assert_eq!((Money::rupees(100) - Money::rupees(150)).floor_zero(), Money::ZERO);
        assert_eq!(Money::new(Decimal::new(895, 1)).round_whole(), Money::rupees(90));
        assert_eq!(Money::new(Decimal::new(125, 1)).round_whole(), Money::rupees(13));
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::rupees(250).to_string(), "₹250");
        assert_eq!(Money::new(Decimal::new(1250, 2)).to_string(), "₹12.5");
    }

    #[test]
    fn test_quantity_floor() {
        assert_eq!(Quantity::from_requested(0), None);
        assert_eq!(Quantity::from_requested(-5), None);
        assert_eq!(Quantity::from_requested(3).map(|q| q.value()), Some(3));
    }
}
