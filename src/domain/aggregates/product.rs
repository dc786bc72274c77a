//! Product Aggregate
//!
//! A product always carries at least one variant. Products listed without
//! size options get a synthesized default variant priced at the base price,
//! so callers never branch on "has variants".

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{CartKey, Money};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "ProductRecord", into = "ProductRecord")]
pub struct Product {
    id: String,
    name: String,
    price: Money,
    category: String,
    description: String,
    image: Option<String>,
    variants: Vec<Variant>,
    in_stock: bool,
    sale: Option<Sale>,
    total_stock: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    /// Weight or size label, e.g. "100g".
    #[serde(alias = "weight")]
    pub label: String,
    pub price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<u32>,
    #[serde(default)]
    pub is_default: bool,
}

impl Variant {
    pub fn new(label: impl Into<String>, price: Money) -> Self {
        Self { label: label.into(), price, stock_quantity: None, is_default: false }
    }

    pub fn with_stock(mut self, qty: u32) -> Self { self.stock_quantity = Some(qty); self }

    fn synthesized(price: Money) -> Self {
        Self { label: String::new(), price, stock_quantity: None, is_default: true }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind { #[default] Amount, Percentage }

/// A product-wide discount, permanent unless `ends_at` is set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub discount: Decimal,
    #[serde(default)]
    pub kind: DiscountKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
}

impl Sale {
    pub fn amount(discount: i64) -> Self { Self { discount: Decimal::from(discount), kind: DiscountKind::Amount, ends_at: None } }
    pub fn percentage(discount: i64) -> Self { Self { discount: Decimal::from(discount), kind: DiscountKind::Percentage, ends_at: None } }
    pub fn until(mut self, ends_at: DateTime<Utc>) -> Self { self.ends_at = Some(ends_at); self }
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Money) -> Self {
        Self {
            id: id.into(), name: name.into(), price, category: String::new(), description: String::new(),
            image: None, variants: vec![Variant::synthesized(price)], in_stock: true, sale: None, total_stock: None,
        }
    }

    /// Replaces the variant list. An empty list falls back to the synthesized default.
    pub fn with_variants(mut self, variants: Vec<Variant>) -> Self {
        self.variants = if variants.is_empty() { vec![Variant::synthesized(self.price)] } else { variants };
        self
    }

    pub fn with_sale(mut self, sale: Sale) -> Self { self.sale = Some(sale); self }
    pub fn with_category(mut self, category: impl Into<String>) -> Self { self.category = category.into(); self }
    pub fn with_description(mut self, description: impl Into<String>) -> Self { self.description = description.into(); self }
    pub fn with_image(mut self, image: impl Into<String>) -> Self { self.image = Some(image.into()); self }
    pub fn out_of_stock(mut self) -> Self { self.in_stock = false; self }

    pub fn id(&self) -> &str { &self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn price(&self) -> Money { self.price }
    pub fn category(&self) -> &str { &self.category }
    pub fn description(&self) -> &str { &self.description }
    pub fn image(&self) -> Option<&str> { self.image.as_deref() }
    pub fn variants(&self) -> &[Variant] { &self.variants }
    pub fn sale(&self) -> Option<&Sale> { self.sale.as_ref() }
    pub fn is_on_sale(&self) -> bool { self.sale.is_some() }
    pub fn total_stock(&self) -> Option<u32> { self.total_stock }

    pub fn is_in_stock(&self) -> bool {
        self.in_stock && self.total_stock.map_or(true, |n| n > 0)
    }

    /// The variant shown preselected on the detail page.
    pub fn default_variant(&self) -> &Variant {
        self.variants.iter().find(|v| v.is_default).unwrap_or(&self.variants[0])
    }

    /// Strict lookup by label; the synthesized default is never returned.
    pub fn variant(&self, label: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| !v.label.is_empty() && v.label == label)
    }

    /// Unit price and cart identity for adding this product with an optional selection.
    ///
    /// The selected variant is not checked against `variants()`; a foreign variant
    /// is priced and keyed as given.
    pub fn resolve(&self, selected: Option<&Variant>) -> (Money, CartKey) {
        match selected.filter(|v| !v.label.is_empty()) {
            Some(variant) => {
                if self.variant(&variant.label).is_none() {
                    tracing::warn!(product_id = %self.id, variant = %variant.label, "variant not offered by product");
                }
                (variant.price, CartKey::new(&self.id, Some(&variant.label)))
            }
            None => (self.price, CartKey::new(&self.id, None)),
        }
    }
}

/// Wire shape of a product as stored by the catalog.
///
/// A sale arrives either as a nested `sale` object or as the catalog's flat
/// `isOnSale`/`discountAmount`/`discountType`/`saleEndTime` columns. The nested
/// form wins when both are present; output always uses the nested form.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductRecord {
    id: String,
    name: String,
    price: Money,
    #[serde(default)]
    category: String,
    #[serde(default)]
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    #[serde(default)]
    variants: Vec<Variant>,
    #[serde(default = "default_true")]
    in_stock: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sale: Option<Sale>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    total_stock: Option<u32>,
    #[serde(default, alias = "is_on_sale", skip_serializing)]
    is_on_sale: bool,
    #[serde(default, alias = "discount_amount", skip_serializing)]
    discount_amount: Option<Decimal>,
    #[serde(default, alias = "discount_type", skip_serializing)]
    discount_type: Option<DiscountKind>,
    #[serde(default, alias = "sale_end_time", skip_serializing)]
    sale_end_time: Option<DateTime<Utc>>,
}

impl ProductRecord {
    fn flat_sale(&self) -> Option<Sale> {
        self.is_on_sale.then(|| Sale {
            discount: self.discount_amount.unwrap_or_default(),
            kind: self.discount_type.unwrap_or_default(),
            ends_at: self.sale_end_time,
        })
    }
}

fn default_true() -> bool { true }

impl From<ProductRecord> for Product {
    fn from(r: ProductRecord) -> Self {
        let sale = r.sale.clone().or_else(|| r.flat_sale());
        let variants: Vec<Variant> = r.variants.into_iter().filter(|v| !v.label.is_empty()).collect();
        Product {
            id: r.id, name: r.name, price: r.price, category: r.category, description: r.description,
            image: r.image, variants: vec![], in_stock: r.in_stock, sale, total_stock: r.total_stock,
        }
        .with_variants(variants)
    }
}

impl From<Product> for ProductRecord {
    fn from(p: Product) -> Self {
        ProductRecord {
            variants: p.variants.into_iter().filter(|v| !v.label.is_empty()).collect(),
            id: p.id, name: p.name, price: p.price, category: p.category, description: p.description,
            image: p.image, in_stock: p.in_stock, sale: p.sale, total_stock: p.total_stock,
            is_on_sale: false, discount_amount: None, discount_type: None, sale_end_time: None,
        }
    }
}
