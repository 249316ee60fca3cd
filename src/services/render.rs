use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::params::ParamError;
use crate::{db::ResultEnvelope, errors::json_response};

/// `ok` answers 200 with the pretty envelope; anything else is the caller's
/// problem as far as HTTP goes and answers 400 with the same envelope.
pub fn render(envelope: &ResultEnvelope) -> Response {
    let status = if envelope.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    json_response(status, envelope.to_json_pretty())
}

impl IntoResponse for ParamError {
    fn into_response(self) -> Response {
        render(&ResultEnvelope::failure(self.to_string()))
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use serde_json::json;

    #[test]
    fn success_is_200_json() {
        let response = render(&ResultEnvelope::success(json!({"id": 1})));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json; charset=utf-8"
        );
    }

    #[test]
    fn failures_are_400() {
        assert_eq!(
            render(&ResultEnvelope::failure("insufficient funds")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ParamError::Missing { name: "name" }.into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
