//! One-shot limit-order settlement: read the current BTC price, then execute
//! every open order whose limit lies above it.

use futures::future::join_all;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{Driver, Executor};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const OPEN_ORDERS_BELOW_LIMIT: &str =
    "SELECT * FROM client_order WHERE $1::numeric < limit_price AND status = 'created'";
const EXECUTE_LIMIT_ORDER: &str = "SELECT * FROM execute_limit_order($1::bigint, $2::numeric)";

// -----------------------------------------------------------------------------
// ----- Errors ----------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("price feed {url} unreachable: {source}")]
    PriceFeedUnreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("price feed {url} answered {status}")]
    PriceFeedStatus { url: String, status: StatusCode },

    #[error("price feed {url} returned an unusable quote: {reason}")]
    PriceFeedBody { url: String, reason: String },

    #[error("could not load open orders: {0}")]
    OpenOrders(String),
}

// -----------------------------------------------------------------------------
// ----- SettlementSummary -----------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SettlementSummary {
    pub price: f64,
    pub candidates: usize,
    pub executed: usize,
    pub failed: usize,
}

impl fmt::Display for SettlementSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "price {}: {} candidate(s), {} executed, {} failed",
            self.price, self.candidates, self.executed, self.failed
        )
    }
}

// -----------------------------------------------------------------------------
// ----- Run -------------------------------------------------------------------

pub async fn run<D: Driver>(
    executor: &Executor<D>,
    client: &reqwest::Client,
    price_url: &str,
) -> Result<SettlementSummary, SettlementError> {
    let price = fetch_price(client, price_url).await?;
    let price_text = price.to_string();
    info!("current price {price_text}");

    let open = executor
        .fetch_rows(OPEN_ORDERS_BELOW_LIMIT, std::slice::from_ref(&price_text))
        .await;
    if !open.is_ok() {
        return Err(SettlementError::OpenOrders(
            open.message().unwrap_or_default().to_string(),
        ));
    }

    let rows = match open.into_data() {
        Value::Array(rows) => rows,
        _ => Vec::new(),
    };
    let candidates = rows.len();

    let mut executions = Vec::with_capacity(candidates);
    for row in &rows {
        match row.get("id").and_then(Value::as_i64) {
            Some(order_id) => executions.push(execute_order(executor, order_id, &price_text)),
            None => warn!("skipping open order without a usable id: {row}"),
        }
    }

    let executed = join_all(executions)
        .await
        .into_iter()
        .filter(|ok| *ok)
        .count();
    let failed = candidates - executed;

    let summary = SettlementSummary {
        price,
        candidates,
        executed,
        failed,
    };
    info!("settlement done, {summary}");
    Ok(summary)
}

/// GET the feed and read `{"price": <number>}`. A 5xx aborts; other statuses
/// still get their body read.
pub async fn fetch_price(client: &reqwest::Client, url: &str) -> Result<f64, SettlementError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| SettlementError::PriceFeedUnreachable {
            url: url.to_string(),
            source: e,
        })?;

    let status = response.status();
    if status.is_server_error() {
        return Err(SettlementError::PriceFeedStatus {
            url: url.to_string(),
            status,
        });
    }

    let quote: PriceQuote = response
        .json()
        .await
        .map_err(|e| SettlementError::PriceFeedBody {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    if !quote.price.is_finite() {
        return Err(SettlementError::PriceFeedBody {
            url: url.to_string(),
            reason: format!("price {} is not a finite number", quote.price),
        });
    }
    Ok(quote.price)
}

// -----------------------------------------------------------------------------
// ----- Internal --------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PriceQuote {
    price: f64,
}

async fn execute_order<D: Driver>(executor: &Executor<D>, order_id: i64, price: &str) -> bool {
    let envelope = executor
        .fetch_rows(EXECUTE_LIMIT_ORDER, &[order_id.to_string(), price.to_string()])
        .await;

    match envelope.message() {
        None => {
            info!("executed order {order_id} at {price}");
            true
        }
        Some(message) => {
            warn!("order {order_id} not executed: {message}");
            false
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    async fn feed(template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/btc-price"))
            .respond_with(template)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn reads_the_quoted_price() {
        let server = feed(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "price": 41999.5,
            "currency": "USD"
        })))
        .await;

        let url = format!("{}/btc-price", server.uri());
        let price = fetch_price(&reqwest::Client::new(), &url).await.unwrap();
        assert_eq!(price, 41999.5);
    }

    #[tokio::test]
    async fn server_errors_abort() {
        let server = feed(ResponseTemplate::new(503)).await;

        let url = format!("{}/btc-price", server.uri());
        let err = fetch_price(&reqwest::Client::new(), &url).await.unwrap_err();
        assert!(matches!(
            err,
            SettlementError::PriceFeedStatus { status, .. } if status == StatusCode::SERVICE_UNAVAILABLE
        ));
    }

    #[tokio::test]
    async fn body_without_price_is_rejected() {
        let server = feed(ResponseTemplate::new(200).set_body_string("{\"cost\": 1}")).await;

        let url = format!("{}/btc-price", server.uri());
        let err = fetch_price(&reqwest::Client::new(), &url).await.unwrap_err();
        assert!(matches!(err, SettlementError::PriceFeedBody { .. }));
    }

    #[test]
    fn summary_display() {
        let summary = SettlementSummary {
            price: 100.0,
            candidates: 3,
            executed: 2,
            failed: 1,
        };
        assert_eq!(
            summary.to_string(),
            "price 100: 3 candidate(s), 2 executed, 1 failed"
        );
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
