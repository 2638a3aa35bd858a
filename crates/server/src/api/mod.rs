use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use order_form::{capture_name, render};
use serde::Deserialize;
use shared::{
    domain::FruitOption,
    error::{ApiError, ErrorCode},
    protocol::{FormInput, FormView, OrderVerification},
};
use tracing::error;

use crate::app_state::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[derive(Debug, Deserialize)]
pub(crate) struct VerifyQuery {
    name_on_order: String,
}

pub(crate) async fn healthz(
    State(state): State<Arc<AppState>>,
) -> Result<&'static str, (StatusCode, Json<ApiError>)> {
    state.form.storage.health_check().await.map_err(|e| {
        error!(error = %e, "health check failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::storage(e.to_string())),
        )
    })?;
    Ok("ok")
}

pub(crate) async fn list_fruit_options(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<FruitOption>> {
    let options = state
        .form
        .storage
        .load_fruit_options()
        .await
        .map_err(|e| reject(ApiError::storage(format!("{e:#}"))))?;
    Ok(Json(options))
}

pub(crate) async fn render_form(
    State(state): State<Arc<AppState>>,
    Json(input): Json<FormInput>,
) -> ApiResult<FormView> {
    let view = render(&state.form, &input).await.map_err(reject)?;
    Ok(Json(view))
}

pub(crate) async fn verify_orders(
    State(state): State<Arc<AppState>>,
    Query(q): Query<VerifyQuery>,
) -> ApiResult<Vec<OrderVerification>> {
    let name_on_order = capture_name(&q.name_on_order, state.form.settings.name_rule);
    if name_on_order.is_empty() {
        return Err(reject(ApiError::validation("name_on_order cannot be empty")));
    }
    let rows = state
        .form
        .storage
        .verify_orders(&name_on_order)
        .await
        .map_err(|e| reject(ApiError::storage(format!("{e:#}"))))?;
    Ok(Json(rows))
}

pub(crate) fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Storage | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(err: ApiError) -> (StatusCode, Json<ApiError>) {
    if status_for(err.code).is_server_error() {
        error!(code = ?err.code, message = %err.message, "request failed");
    }
    (status_for(err.code), Json(err))
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
