//! Storefront cart service

use anyhow::Result;
use storefront_cart::api::{router, AppState};
use storefront_cart::checkout::{InMemoryOrderStore, NatsNotifier, OrderNotifier, OrderStore, PgOrderStore};
use storefront_cart::config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let notifier = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => NatsNotifier::new(client, config.nats_subject.clone()),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable; order summaries will only be logged");
                NatsNotifier::disconnected(config.nats_subject.clone())
            }
        },
        None => NatsNotifier::disconnected(config.nats_subject.clone()),
    };

    match &config.database_url {
        Some(url) => serve(&config, PgOrderStore::connect(url).await?, notifier).await,
        None => {
            tracing::warn!("DATABASE_URL not set; orders are kept in memory");
            serve(&config, InMemoryOrderStore::new(), notifier).await
        }
    }
}

async fn serve<S: OrderStore, N: OrderNotifier>(config: &Config, store: S, notifier: N) -> Result<()> {
    let state = AppState::new(store, notifier, config.shipping, config.checkout.clone());
    let app = router(state);
    tracing::info!("storefront-cart listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?, app).await?;
    Ok(())
}
