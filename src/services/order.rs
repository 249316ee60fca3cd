use axum::{
    Router,
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
};
use std::{collections::HashMap, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::debug;

use super::{
    params::{self, ParamError},
    render::render,
};
use crate::db::{Driver, Executor};

const CREATE_LIMIT_ORDER: &str = "SELECT * FROM create_limit_order($1::bigint, $2::numeric)";
const FETCH_ORDER_DETAILS: &str = "SELECT * FROM fetch_order_details($1::bigint)";

pub fn router<D: Driver>(executor: Arc<Executor<D>>) -> Router {
    Router::new()
        .route("/limitorder/", post(create_limit_order::<D>))
        .route("/orderdetails/{order_id}", get(fetch_order_details::<D>))
        .layer(TraceLayer::new_for_http())
        .with_state(executor)
}

/// `POST /limitorder/?account_id=&price_limit=`. The order waits in
/// `created` until a settlement run sees the price drop below its limit.
async fn create_limit_order<D: Driver>(
    State(executor): State<Arc<Executor<D>>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, ParamError> {
    let account_id = params::id("account_id", params::required(&query, "account_id")?)?;
    let price_limit = params::decimal("price_limit", params::required(&query, "price_limit")?)?;

    debug!("limit order for account {account_id} at {price_limit}");
    let envelope = executor
        .fetch_row(CREATE_LIMIT_ORDER, &[account_id.to_string(), price_limit])
        .await;
    Ok(render(&envelope))
}

async fn fetch_order_details<D: Driver>(
    State(executor): State<Arc<Executor<D>>>,
    Path(order_id): Path<String>,
) -> Result<Response, ParamError> {
    let order_id = params::id("order_id", &order_id)?;

    let envelope = executor
        .fetch_row(FETCH_ORDER_DETAILS, &[order_id.to_string()])
        .await;
    Ok(render(&envelope))
}
