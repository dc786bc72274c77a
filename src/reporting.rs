//! Sales figures over placed orders, as shown on the seller dashboard.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use crate::domain::aggregates::{OrderSnapshot, OrderStatus, PaymentMethod, PaymentStatus};
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SalesReport {
    pub total_revenue: Money,
    pub paid_revenue: Money,
    pub total_orders: usize,
    pub delivered_orders: usize,
    pub pending_orders: usize,
    pub average_order_value: Money,
    pub revenue_by_method: HashMap<PaymentMethod, Money>,
    products: Vec<ProductSales>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductSales { pub product_id: String, pub name: String, pub quantity: u64, pub revenue: Money }

impl SalesReport {
    pub fn from_orders(orders: &[OrderSnapshot]) -> Self {
        let total_revenue: Money = orders.iter().map(OrderSnapshot::total).sum();
        let paid_revenue = orders.iter().filter(|o| o.payment_status() == PaymentStatus::Paid).map(OrderSnapshot::total).sum();
        let count_status = |s: OrderStatus| orders.iter().filter(|o| o.order_status() == s).count();
        let average_order_value = match orders.len() {
            0 => Money::ZERO,
            n => Money::new(total_revenue.amount() / Decimal::from(n)).round_whole(),
        };

        let mut revenue_by_method = HashMap::new();
        let mut by_product: HashMap<&str, ProductSales> = HashMap::new();
        for order in orders {
            let method_total = revenue_by_method.entry(order.payment_method()).or_insert(Money::ZERO);
            *method_total = *method_total + order.total();
            for line in order.items() {
                let entry = by_product.entry(line.id.as_str()).or_insert_with(|| ProductSales {
                    product_id: line.id.clone(), name: line.name.clone(), quantity: 0, revenue: Money::ZERO,
                });
                entry.quantity += u64::from(line.quantity);
                entry.revenue = entry.revenue + line.line_total();
            }
        }
        let mut products: Vec<ProductSales> = by_product.into_values().collect();
        products.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.product_id.cmp(&b.product_id)));

        Self {
            total_revenue, paid_revenue, total_orders: orders.len(),
            delivered_orders: count_status(OrderStatus::Delivered), pending_orders: count_status(OrderStatus::Pending),
            average_order_value, revenue_by_method, products,
        }
    }

    /// Best sellers by revenue.
    pub fn top_products(&self, n: usize) -> &[ProductSales] { &self.products[..n.min(self.products.len())] }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use crate::domain::aggregates::{Cart, Customer, DeliveryType, OrderNumber, OrderTerms, Product};

    fn order(lines: &[(&str, i64, i64)], method: PaymentMethod, status: PaymentStatus) -> OrderSnapshot {
        let mut cart = Cart::new();
        for (id, price, qty) in lines {
            let p = Product::new(*id, format!("Item {id}"), Money::rupees(*price));
            cart.add_to_cart(&p, None);
            cart.update_quantity(&p.resolve(None).1, *qty);
        }
        let totals = cart.policy().order_totals(cart.subtotal(), DeliveryType::SelfPickup);
        let terms = OrderTerms {
            order_number: OrderNumber::generate(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(), 0),
            customer: Customer { name: "Ravi".into(), phone: "9000000000".into(), address: None },
            delivery: DeliveryType::SelfPickup, payment_method: method, payment_status: status, totals,
        };
        OrderSnapshot::capture(&cart, terms, Utc::now())
    }

    #[test]
    fn test_empty_report() {
        let report = SalesReport::from_orders(&[]);
        assert_eq!(report.total_revenue, Money::ZERO);
        assert_eq!(report.average_order_value, Money::ZERO);
        assert!(report.top_products(5).is_empty());
    }

    #[test]
    fn test_revenue_figures() {
        let orders = [
            order(&[("1", 120, 2), ("2", 280, 1)], PaymentMethod::Online, PaymentStatus::Paid),
            order(&[("1", 120, 1)], PaymentMethod::Cod, PaymentStatus::Pending),
            order(&[("3", 150, 1)], PaymentMethod::Cod, PaymentStatus::Pending),
        ];
        let report = SalesReport::from_orders(&orders);
        assert_eq!(report.total_revenue, Money::rupees(790));
        assert_eq!(report.paid_revenue, Money::rupees(520));
        assert_eq!(report.total_orders, 3);
        assert_eq!(report.pending_orders, 3);
        assert_eq!(report.delivered_orders, 0);
        assert_eq!(report.average_order_value, Money::rupees(263));
        assert_eq!(report.revenue_by_method[&PaymentMethod::Cod], Money::rupees(270));

        let top = report.top_products(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].product_id, "1");
        assert_eq!(top[0].quantity, 3);
        assert_eq!(top[0].revenue, Money::rupees(360));
        assert_eq!(top[1].product_id, "2");
    }
}
