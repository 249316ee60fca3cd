use serde::Serialize;
use serde_json::Value;

// -----------------------------------------------------------------------------
// ----- ResultEnvelope --------------------------------------------------------

/// Normalized outcome of one data-access call.
///
/// Fields are private so the two invariants hold by construction:
/// a failure never carries data, and a success never carries a message.
/// A fetch that found nothing is a success with `data == null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEnvelope {
    ok: bool,
    message: Option<String>,
    data: Value,
}

// -----------------------------------------------------------------------------
// ----- ResultEnvelope: Static ------------------------------------------------

impl ResultEnvelope {
    pub fn success(data: Value) -> Self {
        Self {
            ok: true,
            message: None,
            data,
        }
    }

    pub fn empty() -> Self {
        Self::success(Value::Null)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = "unknown failure".to_string();
        }

        Self {
            ok: false,
            message: Some(message),
            data: Value::Null,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- ResultEnvelope: Public ------------------------------------------------

impl ResultEnvelope {
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn into_data(self) -> Value {
        self.data
    }

    /// Pretty JSON `{"ok":..,"message":..,"data":..}`.
    pub fn to_json_pretty(&self) -> Vec<u8> {
        // Serializing a Value-backed struct cannot fail.
        serde_json::to_vec_pretty(self).unwrap_or_default()
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_has_no_message() {
        let env = ResultEnvelope::success(json!({"id": 1}));
        assert!(env.is_ok());
        assert_eq!(env.message(), None);
        assert_eq!(env.data(), &json!({"id": 1}));
    }

    #[test]
    fn failure_has_no_data_and_always_a_message() {
        let env = ResultEnvelope::failure("duplicate key");
        assert!(!env.is_ok());
        assert_eq!(env.message(), Some("duplicate key"));
        assert_eq!(env.data(), &Value::Null);

        let env = ResultEnvelope::failure("  ");
        assert_eq!(env.message(), Some("unknown failure"));
    }

    #[test]
    fn serializes_all_three_fields() {
        let env = ResultEnvelope::empty();
        let v: Value = serde_json::from_slice(&env.to_json_pretty()).unwrap();
        assert_eq!(v, json!({"ok": true, "message": null, "data": null}));

        let env = ResultEnvelope::failure("boom");
        let v: Value = serde_json::from_slice(&env.to_json_pretty()).unwrap();
        assert_eq!(v, json!({"ok": false, "message": "boom", "data": null}));
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
