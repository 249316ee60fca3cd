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

const CREATE_ACCOUNT: &str = "SELECT * FROM create_account($1, $2::numeric)";
const FETCH_ACCOUNT_DETAILS: &str = "SELECT * FROM fetch_account_details($1::bigint)";

pub fn router<D: Driver>(executor: Arc<Executor<D>>) -> Router {
    Router::new()
        .route("/account/", post(create_account::<D>))
        .route("/accountdetails/{account_id}", get(fetch_account_details::<D>))
        .layer(TraceLayer::new_for_http())
        .with_state(executor)
}

/// `POST /account/?name=&usd_balance=` opens an account with a USD balance.
async fn create_account<D: Driver>(
    State(executor): State<Arc<Executor<D>>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, ParamError> {
    let name = params::text(&query, "name")?;
    let usd_balance = params::decimal("usd_balance", params::required(&query, "usd_balance")?)?;

    debug!("create account '{name}' with {usd_balance} USD");
    let envelope = executor.fetch_row(CREATE_ACCOUNT, &[name, usd_balance]).await;
    Ok(render(&envelope))
}

async fn fetch_account_details<D: Driver>(
    State(executor): State<Arc<Executor<D>>>,
    Path(account_id): Path<String>,
) -> Result<Response, ParamError> {
    let account_id = params::id("account_id", &account_id)?;

    let envelope = executor
        .fetch_row(FETCH_ACCOUNT_DETAILS, &[account_id.to_string()])
        .await;
    Ok(render(&envelope))
}
