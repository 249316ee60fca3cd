use axum::{
    body::Body,
    extract::Request,
    http::{
        HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header, header::InvalidHeaderValue,
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use http_body_util::LengthLimitError;

use crate::errors::{GatewayError, JSON_CONTENT_TYPE};

// -----------------------------------------------------------------------------
// ----- IdentityToken ---------------------------------------------------------

/// Already-authenticated principal of the caller. The gateway never decides
/// who the caller is; an upstream layer puts this into the request extensions
/// and the gateway only forwards it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityToken(HeaderValue);

impl IdentityToken {
    pub fn new(principal: &str) -> Result<Self, InvalidHeaderValue> {
        HeaderValue::from_str(principal).map(Self)
    }

    pub fn header_value(&self) -> &HeaderValue {
        &self.0
    }
}

// -----------------------------------------------------------------------------
// ----- InboundRequest --------------------------------------------------------

#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub path_and_query: String,
    pub headers: Vec<(HeaderName, HeaderValue)>,
    pub body: Option<Bytes>,
    pub identity: Option<IdentityToken>,
}

impl InboundRequest {
    /// Buffers the whole body, refusing anything above `max_body_bytes`.
    pub async fn from_axum(
        request: Request,
        max_body_bytes: usize,
    ) -> Result<Self, GatewayError> {
        let (parts, body) = request.into_parts();

        let declared = parts
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared.is_some_and(|len| len > max_body_bytes) {
            return Err(GatewayError::PayloadTooLarge {
                limit: max_body_bytes,
            });
        }

        let bytes = axum::body::to_bytes(body, max_body_bytes)
            .await
            .map_err(|e| {
                let inner = e.into_inner();
                if inner.downcast_ref::<LengthLimitError>().is_some() {
                    GatewayError::PayloadTooLarge {
                        limit: max_body_bytes,
                    }
                } else {
                    GatewayError::Fault(format!("failed to read request body: {inner}"))
                }
            })?;

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        Ok(Self {
            method: parts.method,
            path_and_query,
            headers: end_to_end_headers(&parts.headers),
            body: (!bytes.is_empty()).then_some(bytes),
            identity: parts.extensions.get::<IdentityToken>().cloned(),
        })
    }

    /// The path alone; routing never looks at the query string.
    pub fn path(&self) -> &str {
        match self.path_and_query.split_once('?') {
            Some((path, _)) => path,
            None => &self.path_and_query,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- ProxiedResponse -------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ProxiedResponse {
    pub status: StatusCode,
    pub headers: Vec<(HeaderName, HeaderValue)>,
    pub body: Bytes,
}

impl ProxiedResponse {
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers
            .iter()
            .find(|(n, _)| n.as_str().eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }
}

impl From<GatewayError> for ProxiedResponse {
    fn from(err: GatewayError) -> Self {
        Self {
            status: err.status_code(),
            headers: vec![(
                header::CONTENT_TYPE,
                HeaderValue::from_static(JSON_CONTENT_TYPE),
            )],
            body: Bytes::from(err.body()),
        }
    }
}

impl IntoResponse for ProxiedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        for (name, value) in self.headers {
            headers.append(name, value);
        }
        response
    }
}

// -----------------------------------------------------------------------------
// ----- Framing ---------------------------------------------------------------

/// Headers that describe one hop's message framing. Bodies are buffered and
/// re-sent, so hyper and reqwest set these again for the next hop.
fn is_hop_by_hop(name: &HeaderName) -> bool {
    *name == header::CONNECTION
        || *name == header::CONTENT_LENGTH
        || *name == header::TE
        || *name == header::TRAILER
        || *name == header::TRANSFER_ENCODING
        || *name == header::UPGRADE
        || name.as_str() == "keep-alive"
        || name.as_str() == "proxy-connection"
}

/// Ordered header pairs minus the hop-by-hop set and anything the
/// `Connection` header names.
pub(crate) fn end_to_end_headers(headers: &HeaderMap) -> Vec<(HeaderName, HeaderValue)> {
    let named_by_connection: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect();

    headers
        .iter()
        .filter(|(name, _)| {
            !is_hop_by_hop(name)
                && !named_by_connection.iter().any(|n| n == name.as_str())
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
