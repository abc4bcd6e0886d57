//! Mercato - Self-hosted storefront and order management service

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mercato::config::Config;
use mercato::events::EventBus;
use mercato::http::{self, AppState};
use mercato::store::postgres::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url).await {
            Ok(client) => Some(client),
            Err(err) => {
                tracing::warn!(error = %err, "NATS unavailable, events disabled");
                None
            }
        },
        None => None,
    };

    let state = AppState {
        store: PgStore::new(db.clone()),
        db,
        events: EventBus::new(nats),
        pricing: config.pricing.clone(),
    };

    let app = http::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("mercato listening on {addr}");
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
