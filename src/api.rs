//! HTTP surface over per-session carts and checkout.

use axum::{extract::{Path, State}, http::StatusCode, routing::{get, post, put}, Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use crate::checkout::{
    ChannelPayments, Checkout, CheckoutError, CheckoutForm, CheckoutOutcome, OrderNotifier, OrderStore, PaymentSignal,
};
use crate::domain::aggregates::{Cart, CartItem, OrderSnapshot, Product, Variant};
use crate::domain::events::DomainEvent;
use crate::domain::pricing::ShippingPolicy;
use crate::domain::value_objects::{CartKey, Money};
use crate::reporting::SalesReport;

/// Per-session carts, each behind its own lock. A session's entry exists only
/// while its cart has items or a request is using it.
#[derive(Debug, Default)]
pub struct CartSessions {
    policy: ShippingPolicy,
    carts: Mutex<HashMap<String, Arc<tokio::sync::Mutex<Cart>>>>,
}

impl CartSessions {
    pub fn new(policy: ShippingPolicy) -> Self { Self { policy, carts: Mutex::default() } }

    pub fn cart(&self, session: &str) -> Arc<tokio::sync::Mutex<Cart>> {
        let mut carts = self.carts.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(carts.entry(session.to_string()).or_insert_with(|| Arc::new(tokio::sync::Mutex::new(Cart::with_policy(self.policy)))))
    }

    /// Drops the session's cart once it is empty and no request holds it.
    pub fn release(&self, session: &str) {
        let mut carts = self.carts.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = carts.get(session).is_some_and(|cart| {
            Arc::strong_count(cart) == 1 && cart.try_lock().is_ok_and(|cart| cart.is_empty())
        });
        if idle { carts.remove(session); }
    }

    pub fn len(&self) -> usize { self.carts.lock().unwrap_or_else(PoisonError::into_inner).len() }
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

struct Inner<S, N> {
    carts: CartSessions,
    payments: Arc<ChannelPayments>,
    checkout: Checkout<S, N, Arc<ChannelPayments>>,
}

pub struct AppState<S, N> { inner: Arc<Inner<S, N>> }

impl<S, N> Clone for AppState<S, N> {
    fn clone(&self) -> Self { Self { inner: Arc::clone(&self.inner) } }
}

impl<S: OrderStore, N: OrderNotifier> AppState<S, N> {
    pub fn new(store: S, notifier: N, policy: ShippingPolicy, settings: crate::checkout::CheckoutSettings) -> Self {
        let payments = Arc::new(ChannelPayments::new());
        let checkout = Checkout::new(store, notifier, Arc::clone(&payments), settings);
        Self { inner: Arc::new(Inner { carts: CartSessions::new(policy), payments, checkout }) }
    }
}

pub fn router<S: OrderStore, N: OrderNotifier>(state: AppState<S, N>) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront-cart"})) }))
        .route("/api/v1/cart/:session", get(get_cart::<S, N>).delete(clear_cart::<S, N>))
        .route("/api/v1/cart/:session/items", post(add_to_cart::<S, N>))
        .route("/api/v1/cart/:session/items/:key", put(update_quantity::<S, N>).delete(remove_item::<S, N>))
        .route("/api/v1/checkout/:session", post(checkout::<S, N>))
        .route("/api/v1/payments/:session/confirm", post(confirm_payment::<S, N>))
        .route("/api/v1/payments/:session/cancel", post(cancel_payment::<S, N>))
        .route("/api/v1/reports/sales", get(sales_report::<S, N>))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

#[derive(Debug, Serialize)]
pub struct CartLine { pub key: CartKey, #[serde(flatten)] pub item: CartItem }

#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub item_count: u64,
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub total: Money,
    pub amount_to_free_shipping: Money,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed: Option<bool>,
}

impl CartView {
    fn of(cart: &mut Cart) -> Self {
        let notices = cart.take_events().into_iter().filter_map(|e| match e {
            DomainEvent::Cart(e) => Some(e.notice()),
            DomainEvent::Order(_) => None,
        }).collect();
        Self {
            items: cart.items().iter().map(|i| CartLine { key: i.key(), item: i.clone() }).collect(),
            item_count: cart.item_count(),
            subtotal: cart.subtotal(),
            shipping_cost: cart.shipping_cost(),
            total: cart.total(),
            amount_to_free_shipping: cart.policy().amount_to_free_shipping(cart.subtotal()),
            notices,
            changed: None,
        }
    }
}

#[derive(Debug, Deserialize)] pub struct AddToCartRequest { pub product: Product, #[serde(default)] pub variant: Option<Variant> }
#[derive(Debug, Deserialize)] pub struct UpdateQuantityRequest { pub quantity: i64 }

impl<S, N> AppState<S, N> {
    /// Runs `f` on the session's cart, then lets the session go if the cart ended up empty.
    async fn with_cart<T>(&self, session: &str, f: impl FnOnce(&mut Cart) -> T) -> T {
        let out = {
            let cart = self.inner.carts.cart(session);
            let mut cart = cart.lock().await;
            f(&mut cart)
        };
        self.inner.carts.release(session);
        out
    }
}

async fn get_cart<S: OrderStore, N: OrderNotifier>(State(s): State<AppState<S, N>>, Path(session): Path<String>) -> Json<CartView> {
    Json(s.with_cart(&session, CartView::of).await)
}

async fn add_to_cart<S: OrderStore, N: OrderNotifier>(State(s): State<AppState<S, N>>, Path(session): Path<String>, Json(r): Json<AddToCartRequest>) -> Json<CartView> {
    Json(s.with_cart(&session, |cart| {
        cart.add_to_cart(&r.product, r.variant.as_ref());
        CartView::of(cart)
    }).await)
}

async fn update_quantity<S: OrderStore, N: OrderNotifier>(State(s): State<AppState<S, N>>, Path((session, key)): Path<(String, String)>, Json(r): Json<UpdateQuantityRequest>) -> Json<CartView> {
    Json(s.with_cart(&session, |cart| {
        let changed = cart.update_quantity(&CartKey::from(key), r.quantity);
        CartView { changed: Some(changed), ..CartView::of(cart) }
    }).await)
}

async fn remove_item<S: OrderStore, N: OrderNotifier>(State(s): State<AppState<S, N>>, Path((session, key)): Path<(String, String)>) -> Json<CartView> {
    Json(s.with_cart(&session, |cart| {
        let changed = cart.remove_from_cart(&CartKey::from(key));
        CartView { changed: Some(changed), ..CartView::of(cart) }
    }).await)
}

async fn clear_cart<S: OrderStore, N: OrderNotifier>(State(s): State<AppState<S, N>>, Path(session): Path<String>) -> StatusCode {
    s.with_cart(&session, Cart::clear).await;
    StatusCode::NO_CONTENT
}

async fn checkout<S: OrderStore, N: OrderNotifier>(State(s): State<AppState<S, N>>, Path(session): Path<String>, Json(form): Json<CheckoutForm>) -> Result<(StatusCode, Json<OrderSnapshot>), (StatusCode, String)> {
    let cart = s.inner.carts.cart(&session);
    let outcome = s.inner.checkout.submit_shared(&session, &cart, form).await;
    drop(cart);
    s.inner.carts.release(&session);
    match outcome {
        Ok(CheckoutOutcome::Placed(order)) => Ok((StatusCode::CREATED, Json(order))),
        Ok(CheckoutOutcome::PaymentAborted(abort)) => Err((StatusCode::CONFLICT, abort.notice().to_string())),
        Err(e) => {
            let status = match &e {
                CheckoutError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CheckoutError::EmptyCart => StatusCode::BAD_REQUEST,
                CheckoutError::CartChanged => StatusCode::CONFLICT,
                CheckoutError::Persistence(_) => {
                    tracing::error!(session = %session, error = %e, "order not saved");
                    StatusCode::SERVICE_UNAVAILABLE
                }
            };
            Err((status, e.to_string()))
        }
    }
}

async fn confirm_payment<S: OrderStore, N: OrderNotifier>(State(s): State<AppState<S, N>>, Path(session): Path<String>) -> Result<StatusCode, (StatusCode, String)> {
    resolve_payment(&s, &session, PaymentSignal::Confirmed)
}

async fn cancel_payment<S: OrderStore, N: OrderNotifier>(State(s): State<AppState<S, N>>, Path(session): Path<String>) -> Result<StatusCode, (StatusCode, String)> {
    resolve_payment(&s, &session, PaymentSignal::Cancelled)
}

fn resolve_payment<S, N>(s: &AppState<S, N>, session: &str, signal: PaymentSignal) -> Result<StatusCode, (StatusCode, String)> {
    if s.inner.payments.resolve(session, signal) { Ok(StatusCode::NO_CONTENT) }
    else { Err((StatusCode::NOT_FOUND, "No payment pending".to_string())) }
}

async fn sales_report<S: OrderStore, N: OrderNotifier>(State(s): State<AppState<S, N>>) -> Result<Json<SalesReport>, (StatusCode, String)> {
    let orders = s.inner.checkout.store().list().await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(SalesReport::from_orders(&orders)))
}
