use axum::{
    Router,
    extract::{Request, State},
    response::{IntoResponse, Response},
};
use std::{future::Future, io, sync::Arc};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::{dispatcher::GatewayDispatcher, request::InboundRequest};

// -----------------------------------------------------------------------------
// ----- GatewayState ----------------------------------------------------------

#[derive(Debug)]
pub struct GatewayState {
    pub dispatcher: GatewayDispatcher,
    pub max_body_bytes: usize,
}

// -----------------------------------------------------------------------------
// ----- Router ----------------------------------------------------------------

/// Every method on every path goes to the dispatcher; the gateway owns no
/// routes of its own.
pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .fallback(proxy)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(
    listener: TcpListener,
    state: Arc<GatewayState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(
            "gateway listening on {addr} ({} routes)",
            state.dispatcher.registry().routes().len()
        );
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

// -----------------------------------------------------------------------------
// ----- Internal: Handler -----------------------------------------------------

async fn proxy(State(state): State<Arc<GatewayState>>, request: Request) -> Response {
    match InboundRequest::from_axum(request, state.max_body_bytes).await {
        Ok(inbound) => state.dispatcher.handle(inbound).await.into_response(),
        Err(err) => err.into_response(),
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
