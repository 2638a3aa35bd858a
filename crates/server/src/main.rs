use std::{net::SocketAddr, sync::Arc};

use axum::{
    routing::{get, post},
    Router,
};
use nutrition::NutritionClient;
use order_form::OrderFormContext;
use storage::Storage;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;

use app_state::AppState;
use crate::config::load_settings;

const MAX_FORM_BODY_BYTES: usize = 64 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings()?;
    let storage = Storage::new(&settings.database_url).await.map_err(|error| {
        error!(
            database_url = %settings.database_url,
            %error,
            "failed to open database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    let nutrition = NutritionClient::new(&settings.nutrition_base_url)?;
    info!(base_url = %nutrition.base_url(), "nutrition lookups enabled");

    let state = AppState {
        form: OrderFormContext {
            storage,
            nutrition: Arc::new(nutrition),
            settings: settings.form_settings(),
        },
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(api::healthz))
        .route("/fruit_options", get(api::list_fruit_options))
        .route("/order_form", post(api::render_form))
        .route("/orders/verify", get(api::verify_orders))
        .layer(RequestBodyLimitLayer::new(MAX_FORM_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
