use axum::http::{HeaderMap, HeaderName};
use futures::FutureExt;
use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};

use super::{
    registry::{BackendRegistry, Target},
    request::{InboundRequest, ProxiedResponse, end_to_end_headers},
};
use crate::{
    config::GatewaySettings,
    errors::{GatewayError, panic_message},
};

// -----------------------------------------------------------------------------
// ----- GatewayDispatcher -----------------------------------------------------

/// Routes each inbound request to its backend and relays the answer
/// untouched. Holds nothing mutable: the registry and the client are shared
/// read-only between concurrent requests.
#[derive(Debug, Clone)]
pub struct GatewayDispatcher {
    registry: Arc<BackendRegistry>,
    client: reqwest::Client,
    identity_header: HeaderName,
    forward_timeout: Option<Duration>,
}

// -----------------------------------------------------------------------------
// ----- GatewayDispatcher: Static ---------------------------------------------

impl GatewayDispatcher {
    pub fn new(
        registry: Arc<BackendRegistry>,
        settings: &GatewaySettings,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self::with_client(
            registry,
            client,
            settings.identity_header.clone(),
            settings.forward_timeout,
        ))
    }

    pub fn with_client(
        registry: Arc<BackendRegistry>,
        client: reqwest::Client,
        identity_header: HeaderName,
        forward_timeout: Option<Duration>,
    ) -> Self {
        Self {
            registry,
            client,
            identity_header,
            forward_timeout,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- GatewayDispatcher: Public ---------------------------------------------

impl GatewayDispatcher {
    /// Never fails from the caller's view: gateway-side problems come back
    /// as a JSON failure response with the matching status.
    pub async fn handle(&self, request: InboundRequest) -> ProxiedResponse {
        let outcome = AssertUnwindSafe(self.forward(request)).catch_unwind().await;

        match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => ProxiedResponse::from(err),
            Err(panic) => {
                let reason = panic_message(&*panic);
                error!("dispatch panicked: {reason}");
                ProxiedResponse::from(GatewayError::Fault(reason))
            }
        }
    }

    pub async fn forward(&self, request: InboundRequest) -> Result<ProxiedResponse, GatewayError> {
        debug!("received {} {}", request.method, request.path_and_query);

        let Some(target) = self.registry.resolve(request.path()) else {
            let err = GatewayError::RouteNotFound {
                path: request.path().to_string(),
            };
            warn!("[{}] {err}", err.code());
            return Err(err);
        };
        debug!("routed {} to {target}", request.path());

        let method = request.method.clone();
        let path_and_query = request.path_and_query.clone();

        let response = self.send(target, request).await;
        match &response {
            Ok(r) => info!("{method} {path_and_query} -> {target} {}", r.status.as_u16()),
            Err(e) => warn!("[{}] {method} {path_and_query} -> {target}: {e}", e.code()),
        }
        response
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }
}

// -----------------------------------------------------------------------------
// ----- GatewayDispatcher: Private --------------------------------------------

impl GatewayDispatcher {
    async fn send(
        &self,
        target: &Target,
        request: InboundRequest,
    ) -> Result<ProxiedResponse, GatewayError> {
        let InboundRequest {
            method,
            path_and_query,
            headers,
            body,
            identity,
        } = request;

        let mut outbound = HeaderMap::with_capacity(headers.len() + 1);
        for (name, value) in headers {
            outbound.append(name, value);
        }
        if let Some(identity) = identity {
            outbound.insert(self.identity_header.clone(), identity.header_value().clone());
        }

        let mut builder = self
            .client
            .request(method, target.url_for(&path_and_query))
            .headers(outbound);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        if let Some(limit) = self.forward_timeout {
            builder = builder.timeout(limit);
        }

        debug!("dispatched to {target}");
        let response = builder.send().await.map_err(|e| self.transport_error(target, e))?;

        let status = response.status();
        let headers = end_to_end_headers(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(target, e))?;

        Ok(ProxiedResponse {
            status,
            headers,
            body,
        })
    }

    fn transport_error(&self, target: &Target, err: reqwest::Error) -> GatewayError {
        match self.forward_timeout {
            Some(after) if err.is_timeout() => GatewayError::GatewayTimeout {
                target: target.to_string(),
                after,
            },
            _ => GatewayError::BackendUnreachable {
                target: target.to_string(),
                reason: error_chain(&err),
            },
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

// reqwest's top-level text hides the cause ("error sending request"); the
// source chain carries "connection refused" and friends.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
