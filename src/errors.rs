use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::{any::Any, time::Duration};
use thiserror::Error;

use crate::db::ResultEnvelope;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

// -----------------------------------------------------------------------------
// ----- GatewayError ----------------------------------------------------------

/// Failures the gateway answers for itself, without a backend response.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no backend route for path '{path}'")]
    RouteNotFound { path: String },

    #[error("backend {target} unreachable: {reason}")]
    BackendUnreachable { target: String, reason: String },

    #[error("backend {target} did not respond within {after:?}")]
    GatewayTimeout { target: String, after: Duration },

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("gateway fault: {0}")]
    Fault(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::BackendUnreachable { .. } => StatusCode::BAD_GATEWAY,
            Self::GatewayTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Fault(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable name, tagged on the dispatcher's warnings.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RouteNotFound { .. } => "route_not_found",
            Self::BackendUnreachable { .. } => "backend_unreachable",
            Self::GatewayTimeout { .. } => "gateway_timeout",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::Fault(_) => "gateway_fault",
        }
    }

    pub fn body(&self) -> Vec<u8> {
        ResultEnvelope::failure(self.to_string()).to_json_pretty()
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        json_response(self.status_code(), self.body())
    }
}

/// Response with a JSON body and the JSON content type.
pub fn json_response(status: StatusCode, body: Vec<u8>) -> Response {
    let mut response = (status, body).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(JSON_CONTENT_TYPE),
    );
    response
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = panic.downcast_ref::<String>() {
        return s.clone();
    }
    "panic with non-string payload".to_string()
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
