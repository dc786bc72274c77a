//! Online payment confirmation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;
use crate::domain::value_objects::Money;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentSignal { Confirmed, Cancelled }

/// Waits for the shopper to confirm an online payment. Checkout bounds the wait with its own timeout.
pub trait PaymentGateway: Send + Sync + 'static {
    fn await_confirmation(&self, reference: &str, amount: Money) -> impl Future<Output = PaymentSignal> + Send;
}

impl<T: PaymentGateway> PaymentGateway for Arc<T> {
    fn await_confirmation(&self, reference: &str, amount: Money) -> impl Future<Output = PaymentSignal> + Send {
        (**self).await_confirmation(reference, amount)
    }
}

type Pending = Mutex<HashMap<String, (u64, oneshot::Sender<PaymentSignal>)>>;

/// Pending payments resolved from outside, e.g. by the confirm and cancel endpoints.
#[derive(Debug, Default)]
pub struct ChannelPayments { pending: Pending, next_wait: AtomicU64 }

impl ChannelPayments {
    pub fn new() -> Self { Self::default() }

    /// Delivers `signal` to the checkout waiting on `reference`. False when nothing is waiting.
    pub fn resolve(&self, reference: &str, signal: PaymentSignal) -> bool {
        let sender = self.pending.lock().unwrap_or_else(PoisonError::into_inner).remove(reference);
        sender.map_or(false, |(_, tx)| tx.send(signal).is_ok())
    }

    pub fn is_pending(&self, reference: &str) -> bool {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
            .get(reference).map_or(false, |(_, tx)| !tx.is_closed())
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Removes a wait's entry when the wait ends, including when its future is dropped on timeout.
struct WaitGuard<'a> { pending: &'a Pending, reference: &'a str, wait: u64 }

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        // A newer wait on the same reference owns the entry now.
        if pending.get(self.reference).is_some_and(|(wait, _)| *wait == self.wait) {
            pending.remove(self.reference);
        }
    }
}

impl PaymentGateway for ChannelPayments {
    async fn await_confirmation(&self, reference: &str, amount: Money) -> PaymentSignal {
        let (tx, rx) = oneshot::channel();
        let wait = self.next_wait.fetch_add(1, Ordering::Relaxed);
        // A second checkout for the same reference cancels the first.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).insert(reference.to_string(), (wait, tx));
        let _guard = WaitGuard { pending: &self.pending, reference, wait };
        tracing::info!(reference, amount = %amount, "awaiting payment confirmation");
        rx.await.unwrap_or(PaymentSignal::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn wait_pending(payments: &ChannelPayments, reference: &str) {
        while !payments.is_pending(reference) { tokio::task::yield_now().await; }
    }

    #[tokio::test]
    async fn test_confirm_reaches_waiter() {
        let payments = Arc::new(ChannelPayments::new());
        let waiter = tokio::spawn({
            let payments = Arc::clone(&payments);
            async move { payments.await_confirmation("s1", Money::rupees(250)).await }
        });
        wait_pending(&payments, "s1").await;
        assert!(payments.resolve("s1", PaymentSignal::Confirmed));
        assert_eq!(waiter.await.unwrap(), PaymentSignal::Confirmed);
        assert!(!payments.resolve("s1", PaymentSignal::Confirmed));
    }

    #[tokio::test]
    async fn test_replaced_wait_is_cancelled() {
        let payments = Arc::new(ChannelPayments::new());
        let first = tokio::spawn({
            let payments = Arc::clone(&payments);
            async move { payments.await_confirmation("s1", Money::rupees(100)).await }
        });
        wait_pending(&payments, "s1").await;
        let second = tokio::spawn({
            let payments = Arc::clone(&payments);
            async move { payments.await_confirmation("s1", Money::rupees(100)).await }
        });
        assert_eq!(first.await.unwrap(), PaymentSignal::Cancelled);
        wait_pending(&payments, "s1").await;
        assert!(payments.resolve("s1", PaymentSignal::Cancelled));
        assert_eq!(second.await.unwrap(), PaymentSignal::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_waits_are_forgotten() {
        let payments = ChannelPayments::new();
        for i in 0..20 {
            let reference = format!("s{i}");
            let wait = tokio::time::timeout(std::time::Duration::from_secs(1), payments.await_confirmation(&reference, Money::rupees(50)));
            assert!(wait.await.is_err());
        }
        assert_eq!(payments.pending_count(), 0);
    }

    #[test]
    fn test_resolve_without_waiter() {
        assert!(!ChannelPayments::new().resolve("nobody", PaymentSignal::Confirmed));
    }
}
