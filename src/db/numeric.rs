use bytes::Buf;
use serde_json::{Number, Value};
use std::{error::Error, fmt::Write};
use tokio_postgres::types::{FromSql, Type};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const SIGN_POSITIVE: u16 = 0x0000;
const SIGN_NEGATIVE: u16 = 0x4000;
const SIGN_NAN: u16 = 0xC000;
const SIGN_POS_INF: u16 = 0xD000;
const SIGN_NEG_INF: u16 = 0xF000;

const HEADER_LEN: usize = 8;

// -----------------------------------------------------------------------------
// ----- PgNumeric -------------------------------------------------------------

/// A Postgres `numeric` decoded from the binary wire format into its exact
/// decimal text (`"42.50"`, `"-0.001"`, `"NaN"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgNumeric(String);

impl PgNumeric {
    /// JSON number when it fits an `f64`; the exact text otherwise.
    pub fn into_json(self) -> Value {
        match self.0.parse::<f64>() {
            Ok(v) if v.is_finite() => Number::from_f64(v)
                .map(Value::Number)
                .unwrap_or(Value::String(self.0)),
            _ => Value::String(self.0),
        }
    }
}

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        decode(raw).map(PgNumeric)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Decoding ----------------------------------------------------

// Layout: ndigits i16, weight i16, sign u16, dscale u16, then ndigits base-10000
// digits (i16). Digit i is worth 10000^(weight - i).
fn decode(raw: &[u8]) -> Result<String, Box<dyn Error + Sync + Send>> {
    let mut buf = raw;
    if buf.remaining() < HEADER_LEN {
        return Err("numeric value too short".into());
    }

    let ndigits = buf.get_i16();
    let weight = buf.get_i16() as i32;
    let sign = buf.get_u16();
    let dscale = buf.get_u16() as usize;

    if ndigits < 0 {
        return Err("numeric value has negative digit count".into());
    }

    match sign {
        SIGN_NAN => return Ok("NaN".to_string()),
        SIGN_POS_INF => return Ok("Infinity".to_string()),
        SIGN_NEG_INF => return Ok("-Infinity".to_string()),
        SIGN_POSITIVE | SIGN_NEGATIVE => {}
        other => return Err(format!("invalid numeric sign 0x{other:04x}").into()),
    }

    let ndigits = ndigits as usize;
    if buf.remaining() != ndigits * 2 {
        return Err("numeric digit count does not match payload".into());
    }

    let mut digits = Vec::with_capacity(ndigits);
    for _ in 0..ndigits {
        let d = buf.get_i16();
        if !(0..10_000).contains(&d) {
            return Err(format!("invalid numeric digit {d}").into());
        }
        digits.push(d);
    }

    let digit_at = |i: i32| -> i16 {
        if i < 0 {
            return 0;
        }
        digits.get(i as usize).copied().unwrap_or(0)
    };

    let mut out = String::with_capacity(ndigits * 4 + dscale + 2);
    if sign == SIGN_NEGATIVE && digits.iter().any(|&d| d != 0) {
        out.push('-');
    }

    if weight < 0 {
        out.push('0');
    } else {
        for i in 0..=weight {
            if i == 0 {
                let _ = write!(out, "{}", digit_at(i));
            } else {
                let _ = write!(out, "{:04}", digit_at(i));
            }
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut i = weight + 1;
        while fraction.len() < dscale {
            let _ = write!(fraction, "{:04}", digit_at(i));
            i += 1;
        }
        fraction.truncate(dscale);

        out.push('.');
        out.push_str(&fraction);
    }

    Ok(out)
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};
    use serde_json::json;

    fn encode(weight: i16, sign: u16, dscale: u16, digits: &[i16]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_i16(digits.len() as i16);
        buf.put_i16(weight);
        buf.put_u16(sign);
        buf.put_u16(dscale);
        for d in digits {
            buf.put_i16(*d);
        }
        buf.to_vec()
    }

    fn text(raw: &[u8]) -> String {
        PgNumeric::from_sql(&Type::NUMERIC, raw).unwrap().0
    }

    #[test]
    fn decodes_fractional_values() {
        assert_eq!(text(&encode(0, SIGN_POSITIVE, 1, &[42, 5000])), "42.5");
        assert_eq!(text(&encode(0, SIGN_POSITIVE, 2, &[42, 5000])), "42.50");
        assert_eq!(text(&encode(-1, SIGN_POSITIVE, 2, &[500])), "0.05");
        assert_eq!(text(&encode(-2, SIGN_POSITIVE, 8, &[12])), "0.00000012");
        assert_eq!(text(&encode(0, SIGN_NEGATIVE, 3, &[1, 2500])), "-1.250");
    }

    #[test]
    fn decodes_integers_and_zero() {
        assert_eq!(text(&encode(1, SIGN_POSITIVE, 0, &[1234, 5678])), "12345678");
        assert_eq!(text(&encode(1, SIGN_POSITIVE, 0, &[1])), "10000");
        assert_eq!(text(&encode(0, SIGN_POSITIVE, 0, &[])), "0");
        assert_eq!(text(&encode(0, SIGN_POSITIVE, 2, &[])), "0.00");
        assert_eq!(text(&encode(0, SIGN_NEGATIVE, 0, &[])), "0");
    }

    #[test]
    fn special_values() {
        assert_eq!(text(&encode(0, SIGN_NAN, 0, &[])), "NaN");
        assert_eq!(text(&encode(0, SIGN_POS_INF, 0, &[])), "Infinity");
        assert_eq!(text(&encode(0, SIGN_NEG_INF, 0, &[])), "-Infinity");
    }

    #[test]
    fn json_conversion() {
        assert_eq!(PgNumeric("42.5".into()).into_json(), json!(42.5));
        assert_eq!(PgNumeric("-3".into()).into_json(), json!(-3.0));
        assert_eq!(PgNumeric("NaN".into()).into_json(), json!("NaN"));
        assert_eq!(PgNumeric("Infinity".into()).into_json(), json!("Infinity"));
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(PgNumeric::from_sql(&Type::NUMERIC, &[0, 1]).is_err());
        assert!(PgNumeric::from_sql(&Type::NUMERIC, &encode(0, 0x1234, 0, &[])).is_err());
        assert!(PgNumeric::from_sql(&Type::NUMERIC, &encode(0, SIGN_POSITIVE, 0, &[10_000])).is_err());

        let mut short = encode(0, SIGN_POSITIVE, 0, &[1, 2]);
        short.truncate(short.len() - 1);
        assert!(PgNumeric::from_sql(&Type::NUMERIC, &short).is_err());
    }

    #[test]
    fn accepts_only_numeric() {
        assert!(<PgNumeric as FromSql>::accepts(&Type::NUMERIC));
        assert!(!<PgNumeric as FromSql>::accepts(&Type::FLOAT8));
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
