use std::collections::HashMap;
use thiserror::Error;

// -----------------------------------------------------------------------------
// ----- ParamError ------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("missing parameter '{name}'")]
    Missing { name: &'static str },

    #[error("parameter '{name}' must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

// -----------------------------------------------------------------------------
// ----- Extraction ------------------------------------------------------------

pub fn required<'a>(
    query: &'a HashMap<String, String>,
    name: &'static str,
) -> Result<&'a str, ParamError> {
    query
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or(ParamError::Missing { name })
}

pub fn text(query: &HashMap<String, String>, name: &'static str) -> Result<String, ParamError> {
    required(query, name).map(str::to_string)
}

pub fn id(name: &'static str, raw: &str) -> Result<i64, ParamError> {
    raw.trim().parse::<i64>().map_err(|_| ParamError::Invalid {
        name,
        value: raw.to_string(),
        expected: "an integer id",
    })
}

/// Validates a decimal literal and hands it on as text, so the database
/// does the arithmetic on the exact value.
pub fn decimal(name: &'static str, raw: &str) -> Result<String, ParamError> {
    let trimmed = raw.trim();
    if is_decimal(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(ParamError::Invalid {
            name,
            value: raw.to_string(),
            expected: "a decimal number",
        })
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

// [+-] digits [. digits] [e [+-] digits], at least one mantissa digit.
fn is_decimal(s: &str) -> bool {
    let s = s.strip_prefix(['+', '-']).unwrap_or(s);

    let (mantissa, exponent) = match s.split_once(['e', 'E']) {
        Some((m, e)) => (m, Some(e)),
        None => (s, None),
    };

    let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if int.len() + frac.len() == 0 || !digits(int) || !digits(frac) {
        return false;
    }

    match exponent {
        None => true,
        Some(e) => {
            let e = e.strip_prefix(['+', '-']).unwrap_or(e);
            !e.is_empty() && digits(e)
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
