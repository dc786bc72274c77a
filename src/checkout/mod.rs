//! Checkout orchestration
//!
//! Turns a session's cart plus the customer form into a persisted
//! [`OrderSnapshot`]. The cart is cleared only once the store has accepted the
//! order; a failed save leaves it intact so the shopper can retry.

pub mod notify;
pub mod payment;
pub mod store;

use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};
use crate::domain::aggregates::{
    Cart, CartItem, Customer, DeliveryType, OrderNumber, OrderSnapshot, OrderTerms, PaymentMethod, PaymentStatus,
};
use crate::domain::events::OrderEvent;
use crate::domain::pricing::OrderTotals;
use crate::domain::value_objects::Money;

pub use notify::{NatsNotifier, NotifyError, OrderNotifier};
pub use payment::{ChannelPayments, PaymentGateway, PaymentSignal};
pub use store::{InMemoryOrderStore, OrderStore, PgOrderStore, StoreError};

/// Customer-entered checkout fields.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[validate(schema(function = "address_required_for_shipping"))]
pub struct CheckoutForm {
    #[validate(custom = "not_blank")]
    pub name: String,
    #[validate(custom = "ten_digit_phone")]
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub delivery_type: DeliveryType,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() { return Err(ValidationError::new("blank")); }
    Ok(())
}

fn ten_digit_phone(value: &str) -> Result<(), ValidationError> {
    if value.len() == 10 && value.bytes().all(|b| b.is_ascii_digit()) { Ok(()) } else { Err(ValidationError::new("phone")) }
}

fn address_required_for_shipping(form: &CheckoutForm) -> Result<(), ValidationError> {
    match form.delivery_type {
        DeliveryType::Shipping if form.address.as_deref().map_or(true, |a| a.trim().is_empty()) => {
            Err(ValidationError::new("address"))
        }
        _ => Ok(()),
    }
}

impl CheckoutForm {
    fn customer(&self) -> Customer {
        Customer {
            name: self.name.trim().to_string(),
            phone: self.phone.clone(),
            address: self.address.as_deref().map(str::trim).filter(|a| !a.is_empty()).map(str::to_string),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("Please enter your name")]
    MissingName,
    #[error("Please enter a valid 10-digit phone number")]
    InvalidPhone,
    #[error("Please enter your delivery address for shipping")]
    MissingAddress,
}

impl From<&ValidationErrors> for ValidationFailure {
    /// The first failing field in form order.
    fn from(errors: &ValidationErrors) -> Self {
        let fields = errors.field_errors();
        if fields.contains_key("name") { Self::MissingName }
        else if fields.contains_key("phone") { Self::InvalidPhone }
        else { Self::MissingAddress }
    }
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("{0}")]
    Validation(#[from] ValidationFailure),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Cart changed while payment was pending, please review your order")]
    CartChanged,

    #[error("Order could not be saved, please try again: {0}")]
    Persistence(#[from] StoreError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentAbort { Cancelled, TimedOut }

impl PaymentAbort {
    pub fn notice(&self) -> &'static str {
        match self {
            Self::Cancelled => "Payment was cancelled. Your cart is unchanged.",
            Self::TimedOut => "Payment time expired. Please try again.",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CheckoutOutcome {
    Placed(OrderSnapshot),
    /// The shopper goes back to the pre-payment form; nothing was saved.
    PaymentAborted(PaymentAbort),
}

#[derive(Clone, Debug)]
pub struct CheckoutSettings {
    pub store_name: String,
    pub payment_timeout: Duration,
}

impl Default for CheckoutSettings {
    fn default() -> Self { Self { store_name: "Storefront".to_string(), payment_timeout: Duration::from_secs(600) } }
}

/// Concurrent checkouts may read the same day count; a taken bill number is retried with the next one.
const NUMBERING_ATTEMPTS: u32 = 5;

/// A validated, priced checkout. Keeps the cart lines it was priced from.
#[derive(Clone, Debug)]
pub struct PreparedCheckout { form: CheckoutForm, totals: OrderTotals, lines: Vec<CartItem> }

impl PreparedCheckout {
    pub fn totals(&self) -> OrderTotals { self.totals }
}

#[derive(Debug)]
pub struct Checkout<S, N, P> { store: S, notifier: N, payments: P, settings: CheckoutSettings }

impl<S: OrderStore, N: OrderNotifier, P: PaymentGateway> Checkout<S, N, P> {
    pub fn new(store: S, notifier: N, payments: P, settings: CheckoutSettings) -> Self {
        Self { store, notifier, payments, settings }
    }

    pub fn store(&self) -> &S { &self.store }

    /// Places an order from `cart`. `reference` identifies the pending payment for online orders.
    pub async fn submit(&self, reference: &str, cart: &mut Cart, form: CheckoutForm) -> Result<CheckoutOutcome, CheckoutError> {
        let prepared = self.prepare(cart, form)?;
        match self.authorize(reference, &prepared).await {
            Ok(payment_status) => Ok(CheckoutOutcome::Placed(self.place(cart, prepared, payment_status).await?)),
            Err(abort) => Ok(CheckoutOutcome::PaymentAborted(abort)),
        }
    }

    /// Like [`submit`](Self::submit) for a cart shared between requests. The lock
    /// is released while an online payment is pending, so the cart stays readable;
    /// if it changes in the meantime the order is refused with
    /// [`CheckoutError::CartChanged`].
    pub async fn submit_shared(&self, reference: &str, cart: &tokio::sync::Mutex<Cart>, form: CheckoutForm) -> Result<CheckoutOutcome, CheckoutError> {
        if form.payment_method == PaymentMethod::Cod {
            return self.submit(reference, &mut *cart.lock().await, form).await;
        }
        let prepared = self.prepare(&*cart.lock().await, form)?;
        match self.authorize(reference, &prepared).await {
            Ok(payment_status) => {
                let mut cart = cart.lock().await;
                Ok(CheckoutOutcome::Placed(self.place(&mut cart, prepared, payment_status).await?))
            }
            Err(abort) => Ok(CheckoutOutcome::PaymentAborted(abort)),
        }
    }

    /// Validates the form and prices the cart.
    pub fn prepare(&self, cart: &Cart, form: CheckoutForm) -> Result<PreparedCheckout, CheckoutError> {
        form.validate().map_err(|e| ValidationFailure::from(&e))?;
        if cart.is_empty() { return Err(CheckoutError::EmptyCart); }
        let totals = cart.policy().order_totals(cart.subtotal(), form.delivery_type);
        Ok(PreparedCheckout { form, totals, lines: cart.items().to_vec() })
    }

    /// Cash orders pass straight through; online orders wait for the shopper.
    pub async fn authorize(&self, reference: &str, prepared: &PreparedCheckout) -> Result<PaymentStatus, PaymentAbort> {
        match prepared.form.payment_method {
            PaymentMethod::Cod => Ok(PaymentStatus::Pending),
            PaymentMethod::Online => {
                let collected = self.collect_payment(reference, prepared.totals.total).await;
                if let Err(abort) = collected { tracing::info!(reference, ?abort, "payment aborted"); }
                collected.map(|()| PaymentStatus::Paid)
            }
        }
    }

    /// Numbers, saves and announces the order, then clears `cart`.
    pub async fn place(&self, cart: &mut Cart, prepared: PreparedCheckout, payment_status: PaymentStatus) -> Result<OrderSnapshot, CheckoutError> {
        if cart.items() != prepared.lines.as_slice() { return Err(CheckoutError::CartChanged); }

        let now = Utc::now();
        let placed_today = self.store.count_for_day(now.date_naive()).await?;
        let mut attempt = 0;
        let order = loop {
            let terms = OrderTerms {
                order_number: OrderNumber::generate(now.date_naive(), placed_today + attempt),
                customer: prepared.form.customer(),
                delivery: prepared.form.delivery_type,
                payment_method: prepared.form.payment_method,
                payment_status,
                totals: prepared.totals,
            };
            let order = OrderSnapshot::capture(cart, terms, now);
            match self.store.save(&order).await {
                Ok(()) => break order,
                Err(StoreError::DuplicateOrderNumber(taken)) if attempt + 1 < NUMBERING_ATTEMPTS => {
                    tracing::warn!(order_number = %taken, "order number taken, renumbering");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };
        cart.clear();
        tracing::info!(order_number = %order.order_number(), total = %order.total(), payment = order.payment_status().as_str(), "order placed");

        let event = OrderEvent::Placed {
            order_number: order.order_number().to_string(),
            total: order.total(),
            payment: order.payment_status(),
            summary: order.summary(&self.settings.store_name),
        };
        if let Err(e) = self.notifier.notify(&event).await {
            tracing::warn!(order_number = %order.order_number(), error = %e, "order summary not delivered");
        }
        Ok(order)
    }

    async fn collect_payment(&self, reference: &str, amount: Money) -> Result<(), PaymentAbort> {
        match tokio::time::timeout(self.settings.payment_timeout, self.payments.await_confirmation(reference, amount)).await {
            Ok(PaymentSignal::Confirmed) => Ok(()),
            Ok(PaymentSignal::Cancelled) => Err(PaymentAbort::Cancelled),
            Err(_) => Err(PaymentAbort::TimedOut),
        }
    }
}
