use serde_json::{Map, Value};
use std::fmt;

/// One result row as an ordered field map (column order preserved).
pub type Record = Map<String, Value>;

// -----------------------------------------------------------------------------
// ----- Shape -----------------------------------------------------------------

/// What the caller expects back from a statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    /// No data; `data` is always null.
    None,
    /// First field of the first row, or null.
    Value,
    /// First row, or null.
    Row,
    /// All rows in order, possibly empty.
    Rows,
}

impl Shape {
    pub fn as_str(self) -> &'static str {
        match self {
            Shape::None => "none",
            Shape::Value => "single-value",
            Shape::Row => "single-record",
            Shape::Rows => "multi-record",
        }
    }

    pub fn apply(self, rows: Vec<Record>) -> Value {
        match self {
            Shape::None => Value::Null,
            Shape::Value => rows
                .into_iter()
                .next()
                .and_then(|row| row.into_iter().next())
                .map(|(_, value)| value)
                .unwrap_or(Value::Null),
            Shape::Row => rows
                .into_iter()
                .next()
                .map(Value::Object)
                .unwrap_or(Value::Null),
            Shape::Rows => Value::Array(rows.into_iter().map(Value::Object).collect()),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn value_takes_first_column_of_first_row() {
        let rows = vec![
            record(&[("price", json!(42.5)), ("ccy", json!("USD"))]),
            record(&[("price", json!(1.0)), ("ccy", json!("EUR"))]),
        ];
        assert_eq!(Shape::Value.apply(rows), json!(42.5));

        // column order wins over key order
        let rows = vec![record(&[("zeta", json!(1)), ("alpha", json!(2))])];
        assert_eq!(Shape::Value.apply(rows), json!(1));
    }

    #[test]
    fn empty_results_by_shape() {
        assert_eq!(Shape::None.apply(vec![]), Value::Null);
        assert_eq!(Shape::Value.apply(vec![]), Value::Null);
        assert_eq!(Shape::Row.apply(vec![]), Value::Null);
        assert_eq!(Shape::Rows.apply(vec![]), json!([]));
        assert_eq!(Shape::Value.apply(vec![Record::new()]), Value::Null);
    }

    #[test]
    fn row_and_rows_keep_order() {
        let rows = vec![
            record(&[("id", json!(1))]),
            record(&[("id", json!(2))]),
        ];
        assert_eq!(Shape::Row.apply(rows.clone()), json!({"id": 1}));
        assert_eq!(Shape::Rows.apply(rows.clone()), json!([{"id": 1}, {"id": 2}]));
        assert_eq!(Shape::None.apply(rows), Value::Null);
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
