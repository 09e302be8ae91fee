use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::errors::GatewayError;
use crate::gateway::GatewayResponse;
use crate::server::server::AppState;
use crate::utils::constants::TRY_AGAIN_LATER_MSG;

const DEFAULT_PAGE_SIZE: u32 = 10;
const DEFAULT_ORDER_PAGE_SIZE: u32 = 5;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/products", get(list_products))
        .route("/products/{pid}", get(product_by_id))
        .route("/orders", get(list_orders))
        .route("/orders/{order_number}", get(order_by_number))
        .route("/token/refresh", post(refresh_token))
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page_num: Option<u32>,
    page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OrdersQuery {
    email: String,
    page_num: Option<u32>,
    page_size: Option<u32>,
}

async fn health() -> &'static str {
    "ok"
}

async fn list_products(State(state): State<AppState>, Query(page): Query<PageQuery>) -> Response {
    let result = state
        .cj
        .list_products(page.page_num.unwrap_or(1), page.page_size.unwrap_or(DEFAULT_PAGE_SIZE))
        .await;
    relay(result)
}

async fn product_by_id(State(state): State<AppState>, Path(pid): Path<String>) -> Response {
    relay(state.cj.product_by_id(&pid).await)
}

async fn list_orders(State(state): State<AppState>, Query(query): Query<OrdersQuery>) -> Response {
    let result = state
        .cj
        .list_orders(
            &query.email,
            query.page_num.unwrap_or(1),
            query.page_size.unwrap_or(DEFAULT_ORDER_PAGE_SIZE),
        )
        .await;
    relay(result)
}

async fn order_by_number(State(state): State<AppState>, Path(order_number): Path<String>) -> Response {
    relay(state.cj.order_by_number(&order_number).await)
}

async fn refresh_token(State(state): State<AppState>) -> Response {
    match state.refresher.refresh().await {
        Ok(credential) => Json(json!({ "updated": credential.updated_at })).into_response(),
        Err(failure) => {
            warn!("manual refresh failed: {}", failure);
            try_again_later(StatusCode::BAD_GATEWAY)
        }
    }
}

/// Pass a successful CJ answer through; anything else becomes the generic message.
fn relay(result: Result<GatewayResponse, GatewayError>) -> Response {
    match result {
        Ok(response) if response.is_success() => match response.json() {
            Some(body) => Json(body).into_response(),
            None => Json(Value::String(response.body)).into_response(),
        },
        Ok(response) => {
            warn!("upstream answered {} with code {:?}", response.status, response.code());
            try_again_later(StatusCode::SERVICE_UNAVAILABLE)
        }
        Err(err) => {
            error!("{}", err);
            try_again_later(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

fn try_again_later(status: StatusCode) -> Response {
    (status, Json(json!({ "error": TRY_AGAIN_LATER_MSG }))).into_response()
}
