//! ShopEase API server

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shopease::api::{self, AppState};
use shopease::auth::{self, TokenSigner};
use shopease::config::AppConfig;
use shopease::notify::Notifier;
use shopease::payment;
use shopease::store::Stores;
use shopease::workflow::OrderWorkflow;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = AppConfig::from_env()?;

    let stores = match &config.database.url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(config.database.max_connections).connect(url).await.context("connecting to postgres")?;
            sqlx::migrate!("./migrations").run(&db).await?;
            tracing::info!("connected to postgres");
            Stores::postgres(db)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Stores::in_memory()
        }
    };

    let http = reqwest::Client::builder().timeout(config.payment.timeout).build()?;
    let gateway = payment::from_config(&config.payment, http.clone())?;
    match &gateway {
        Some(g) => tracing::info!(provider = %g.provider(), "online payment enabled"),
        None => tracing::info!("no payment gateway configured, cash on delivery only"),
    }
    let notifier = Notifier::from_config(config.sms.as_ref(), config.email.as_ref(), http)?;

    let tokens = TokenSigner::new(&config.auth.secret, config.auth.token_ttl).map_err(|e| anyhow::anyhow!("AUTH_SECRET: {e}"))?;
    if let Some(seed) = &config.admin {
        auth::ensure_admin(stores.users.as_ref(), seed).await?;
    }

    let workflow = OrderWorkflow::new(stores.clone(), notifier, gateway, config.workflow.clone());
    let state = AppState { stores, workflow, tokens, development: config.server.development };
    let app = api::router(state).layer(cors(&config.server.frontend_origins)?);

    let addr = format!("0.0.0.0:{}", config.server.port);
    tracing::info!(development = config.server.development, line_mode = %config.workflow.line_mode, "🚀 ShopEase listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}

fn cors(origins: &[String]) -> Result<CorsLayer> {
    if origins.is_empty() { return Ok(CorsLayer::permissive()); }
    let origins = origins.iter().map(|o| HeaderValue::from_str(o).with_context(|| format!("FRONTEND_URL origin {o:?}"))).collect::<Result<Vec<_>>>()?;
    Ok(CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any))
}
