//! Cart Aggregate

use serde::{Deserialize, Serialize};
use crate::domain::aggregates::{Product, Variant};
use crate::domain::events::{CartEvent, DomainEvent};
use crate::domain::pricing::ShippingPolicy;
use crate::domain::value_objects::{CartKey, Money, Quantity};

/// In-memory cart for one shopping session. Lines keep insertion order.
#[derive(Clone, Debug, Default)]
pub struct Cart {
    items: Vec<CartItem>,
    shipping: ShippingPolicy,
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedVariant { pub weight: String, pub price: Money }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub price: Money,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_variant: Option<SelectedVariant>,
}

impl CartItem {
    pub fn key(&self) -> CartKey { CartKey::new(&self.id, self.selected_variant.as_ref().map(|v| v.weight.as_str())) }
    pub fn unit_price(&self) -> Money { self.selected_variant.as_ref().map_or(self.price, |v| v.price) }
    pub fn line_total(&self) -> Money { self.unit_price().multiply(self.quantity) }
}

impl Cart {
    pub fn new() -> Self { Self::default() }
    pub fn with_policy(shipping: ShippingPolicy) -> Self { Self { shipping, ..Self::default() } }

    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn policy(&self) -> &ShippingPolicy { &self.shipping }
    pub fn get(&self, key: &CartKey) -> Option<&CartItem> { self.items.iter().find(|i| &i.key() == key) }

    pub fn add_to_cart(&mut self, product: &Product, variant: Option<&Variant>) {
        let (unit_price, key) = product.resolve(variant);
        let quantity = match self.items.iter_mut().find(|i| i.key() == key) {
            Some(existing) => {
                existing.quantity = Quantity::new(existing.quantity).increment().value();
                existing.quantity
            }
            None => {
                let selected_variant = variant
                    .filter(|v| !v.label.is_empty())
                    .map(|v| SelectedVariant { weight: v.label.clone(), price: v.price });
                self.items.push(CartItem {
                    id: product.id().to_string(), name: product.name().to_string(),
                    image: product.image().map(str::to_string), price: unit_price,
                    quantity: Quantity::ONE.value(), selected_variant,
                });
                Quantity::ONE.value()
            }
        };
        tracing::debug!(key = %key, quantity, "cart line added");
        let variant = self.get(&key).and_then(|i| i.selected_variant.as_ref()).map(|v| v.weight.clone());
        self.raise_event(DomainEvent::Cart(CartEvent::ItemAdded { key, name: product.name().to_string(), variant, quantity }));
    }

    /// Sets an absolute quantity; zero or below removes the line. Returns false when no line matched.
    pub fn update_quantity(&mut self, key: &CartKey, quantity: i64) -> bool {
        let Some(quantity) = Quantity::from_requested(quantity) else { return self.remove_from_cart(key) };
        match self.items.iter_mut().find(|i| &i.key() == key) {
            Some(item) => {
                item.quantity = quantity.value();
                tracing::debug!(key = %key, quantity = item.quantity, "cart quantity set");
                true
            }
            None => false,
        }
    }

    pub fn remove_from_cart(&mut self, key: &CartKey) -> bool {
        let before = self.items.len();
        self.items.retain(|i| &i.key() != key);
        self.items.len() != before
    }

    pub fn clear(&mut self) { self.items.clear(); }

    pub fn item_count(&self) -> u64 { self.items.iter().map(|i| u64::from(i.quantity)).sum() }

    /// Sum of line totals at the prices captured when each line was added.
    pub fn subtotal(&self) -> Money { self.items.iter().map(CartItem::line_total).sum() }

    /// Shipping as if the order will be shipped; self-pickup is zeroed at checkout.
    pub fn shipping_cost(&self) -> Money { self.shipping.shipping_cost(self.subtotal()) }

    pub fn total(&self) -> Money { self.subtotal() + self.shipping_cost() }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}
