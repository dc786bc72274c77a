//! Order persistence.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use uuid::Uuid;
use crate::domain::aggregates::{OrderLine, OrderNumber, OrderSnapshot, UnknownValue};
use crate::domain::value_objects::Money;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Stored order is malformed: {0}")]
    Malformed(#[from] UnknownValue),

    #[error("Order number {0} is already taken")]
    DuplicateOrderNumber(String),
}

/// Where placed orders live. Status updates after placement happen outside this crate.
pub trait OrderStore: Send + Sync + 'static {
    /// Fails with [`StoreError::DuplicateOrderNumber`] when the bill number is already used.
    fn save(&self, order: &OrderSnapshot) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Orders already placed on `day` (UTC), used for bill numbering.
    fn count_for_day(&self, day: NaiveDate) -> impl Future<Output = Result<u32, StoreError>> + Send;

    /// All orders, newest first.
    fn list(&self) -> impl Future<Output = Result<Vec<OrderSnapshot>, StoreError>> + Send;
}

impl<T: OrderStore> OrderStore for Arc<T> {
    fn save(&self, order: &OrderSnapshot) -> impl Future<Output = Result<(), StoreError>> + Send { (**self).save(order) }
    fn count_for_day(&self, day: NaiveDate) -> impl Future<Output = Result<u32, StoreError>> + Send { (**self).count_for_day(day) }
    fn list(&self) -> impl Future<Output = Result<Vec<OrderSnapshot>, StoreError>> + Send { (**self).list() }
}

/// Process-local store for development and tests.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore { orders: Mutex<Vec<OrderSnapshot>> }

impl InMemoryOrderStore {
    pub fn new() -> Self { Self::default() }
    pub fn len(&self) -> usize { self.orders.lock().unwrap_or_else(PoisonError::into_inner).len() }
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl OrderStore for InMemoryOrderStore {
    async fn save(&self, order: &OrderSnapshot) -> Result<(), StoreError> {
        let mut orders = self.orders.lock().unwrap_or_else(PoisonError::into_inner);
        if orders.iter().any(|o| o.order_number() == order.order_number()) {
            return Err(StoreError::DuplicateOrderNumber(order.order_number().to_string()));
        }
        orders.push(order.clone());
        Ok(())
    }

    async fn count_for_day(&self, day: NaiveDate) -> Result<u32, StoreError> {
        let orders = self.orders.lock().unwrap_or_else(PoisonError::into_inner);
        let n = orders.iter().filter(|o| o.created_at().date_naive() == day).count();
        Ok(u32::try_from(n).unwrap_or(u32::MAX))
    }

    async fn list(&self) -> Result<Vec<OrderSnapshot>, StoreError> {
        let orders = self.orders.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(orders.iter().rev().cloned().collect())
    }
}

const ORDER_NUMBER_CONSTRAINT: &str = "orders_order_number_key";

#[derive(Clone, Debug)]
pub struct PgOrderStore { pool: PgPool }

impl PgOrderStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid, order_number: String, customer_name: String, customer_phone: String, customer_address: Option<String>,
    delivery_type: String, payment_method: String, payment_status: String, order_status: String,
    items: Json<Vec<OrderLine>>, subtotal: Decimal, shipping_cost: Decimal, total: Decimal, created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for OrderSnapshot {
    type Error = UnknownValue;
    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        Ok(OrderSnapshot {
            id: r.id, order_number: OrderNumber(r.order_number), customer_name: r.customer_name,
            customer_phone: r.customer_phone, customer_address: r.customer_address,
            delivery_type: r.delivery_type.parse()?, payment_method: r.payment_method.parse()?,
            payment_status: r.payment_status.parse()?, order_status: r.order_status.parse()?,
            items: r.items.0, subtotal: Money::new(r.subtotal), shipping_cost: Money::new(r.shipping_cost),
            total: Money::new(r.total), created_at: r.created_at,
        })
    }
}

impl OrderStore for PgOrderStore {
    async fn save(&self, o: &OrderSnapshot) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO orders (id, order_number, customer_name, customer_phone, customer_address, delivery_type, payment_method, payment_status, order_status, items, subtotal, shipping_cost, total, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)")
            .bind(o.id()).bind(o.order_number().as_str()).bind(o.customer_name()).bind(o.customer_phone()).bind(o.customer_address())
            .bind(o.delivery_type().as_str()).bind(o.payment_method().as_str()).bind(o.payment_status().as_str()).bind(o.order_status().as_str())
            .bind(Json(o.items())).bind(o.subtotal().amount()).bind(o.shipping_cost().amount()).bind(o.total().amount()).bind(o.created_at())
            .execute(&self.pool).await
            .map_err(|e| {
                let duplicate = e.as_database_error()
                    .is_some_and(|d| d.is_unique_violation() && d.constraint() == Some(ORDER_NUMBER_CONSTRAINT));
                if duplicate { StoreError::DuplicateOrderNumber(o.order_number().to_string()) } else { StoreError::Database(e) }
            })?;
        Ok(())
    }

    async fn count_for_day(&self, day: NaiveDate) -> Result<u32, StoreError> {
        let start = day.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE created_at >= $1 AND created_at < $2")
            .bind(start).bind(start + Duration::days(1)).fetch_one(&self.pool).await?;
        Ok(u32::try_from(count.0).unwrap_or(u32::MAX))
    }

    async fn list(&self) -> Result<Vec<OrderSnapshot>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>("SELECT id, order_number, customer_name, customer_phone, customer_address, delivery_type, payment_method, payment_status, order_status, items, subtotal, shipping_cost, total, created_at FROM orders ORDER BY created_at DESC")
            .fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(OrderSnapshot::try_from).collect::<Result<_, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Cart, Customer, DeliveryType, OrderTerms, PaymentMethod, PaymentStatus, Product};

    fn placed(created_at: DateTime<Utc>, earlier_today: u32) -> OrderSnapshot {
        let mut cart = Cart::new();
        cart.add_to_cart(&Product::new("1", "Turmeric", Money::rupees(120)), None);
        let terms = OrderTerms {
            order_number: OrderNumber::generate(created_at.date_naive(), earlier_today),
            customer: Customer { name: "Meena".into(), phone: "9123456780".into(), address: None },
            delivery: DeliveryType::SelfPickup, payment_method: PaymentMethod::Cod, payment_status: PaymentStatus::Pending,
            totals: cart.policy().order_totals(cart.subtotal(), DeliveryType::SelfPickup),
        };
        OrderSnapshot::capture(&cart, terms, created_at)
    }

    #[tokio::test]
    async fn test_in_memory_counts_per_day() {
        let store = InMemoryOrderStore::new();
        let today = Utc::now();
        store.save(&placed(today, 0)).await.unwrap();
        store.save(&placed(today, 1)).await.unwrap();
        store.save(&placed(today - Duration::days(1), 0)).await.unwrap();
        assert_eq!(store.count_for_day(today.date_naive()).await.unwrap(), 2);
        assert_eq!(store.list().await.unwrap().len(), 3);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_in_memory_rejects_reused_order_number() {
        let store = InMemoryOrderStore::new();
        let now = Utc::now();
        store.save(&placed(now, 0)).await.unwrap();
        let err = store.save(&placed(now, 0)).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateOrderNumber(n) if n.ends_with("01")));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_shared_store() {
        let store = Arc::new(InMemoryOrderStore::new());
        let handle = Arc::clone(&store);
        handle.save(&placed(Utc::now(), 0)).await.unwrap();
        assert_eq!(store.len(), 1);
    }
}
