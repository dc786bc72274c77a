//! Order messages to the shop.

use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use crate::domain::events::OrderEvent;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("NATS publish failed: {0}")]
    Publish(#[from] async_nats::PublishError),
}

pub trait OrderNotifier: Send + Sync + 'static {
    fn notify(&self, event: &OrderEvent) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

impl<T: OrderNotifier> OrderNotifier for Arc<T> {
    fn notify(&self, event: &OrderEvent) -> impl Future<Output = Result<(), NotifyError>> + Send { (**self).notify(event) }
}

/// Publishes order summaries on a NATS subject. Without a client it only logs.
#[derive(Clone, Debug)]
pub struct NatsNotifier { client: Option<async_nats::Client>, subject: String }

impl NatsNotifier {
    pub fn new(client: async_nats::Client, subject: impl Into<String>) -> Self {
        Self { client: Some(client), subject: subject.into() }
    }

    pub fn disconnected(subject: impl Into<String>) -> Self { Self { client: None, subject: subject.into() } }
}

impl OrderNotifier for NatsNotifier {
    async fn notify(&self, event: &OrderEvent) -> Result<(), NotifyError> {
        let OrderEvent::Placed { order_number, summary, .. } = event;
        match &self.client {
            Some(client) => {
                client.publish(self.subject.clone(), summary.clone().into()).await?;
                tracing::debug!(subject = %self.subject, order_number = %order_number, "order summary published");
            }
            None => tracing::info!(order_number = %order_number, "no NATS connection; order summary not sent"),
        }
        Ok(())
    }
}
