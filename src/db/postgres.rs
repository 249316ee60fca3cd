use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Number, Value};
use std::error::Error;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_postgres::{
    Client, Column, NoTls, Row,
    types::{FromSql, Kind, ToSql, Type},
};
use tracing::{debug, warn};

use super::{
    driver::{Driver, ErrorText},
    numeric::PgNumeric,
    shape::Record,
};
use crate::config::DatabaseSettings;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const APPLICATION_NAME: &str = "coingate";

// -----------------------------------------------------------------------------
// ----- PgDriver --------------------------------------------------------------

/// Opens one unpooled tokio-postgres connection per `connect()`.
#[derive(Debug, Clone)]
pub struct PgDriver {
    config: tokio_postgres::Config,
}

#[derive(Debug)]
pub struct PgConnection {
    client: Client,
    task: JoinHandle<()>,
}

impl PgDriver {
    pub fn new(settings: &DatabaseSettings) -> Self {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&settings.host)
            .port(settings.port)
            .user(&settings.user)
            .password(settings.password_exposed())
            .dbname(&settings.dbname)
            .application_name(APPLICATION_NAME);

        if let Some(limit) = settings.connect_timeout {
            config.connect_timeout(limit);
        }

        Self { config }
    }

    pub fn from_config(config: tokio_postgres::Config) -> Self {
        Self { config }
    }
}

impl Driver for PgDriver {
    type Conn = PgConnection;
    type Error = PgError;

    async fn connect(&self) -> Result<PgConnection, PgError> {
        let (client, connection) = self.config.connect(NoTls).await?;

        let task = tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!("database connection error: {e}");
            }
        });

        Ok(PgConnection { client, task })
    }

    async fn query(&self, conn: &mut PgConnection, sql: &str) -> Result<Vec<Record>, PgError> {
        let rows = conn.client.query(sql, &[]).await?;
        decode_rows(&rows)
    }

    async fn query_with_params(
        &self,
        conn: &mut PgConnection,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<Record>, PgError> {
        // Params arrive stringified; SQL casts where another type is needed.
        let types = vec![Type::TEXT; params.len()];
        let statement = conn.client.prepare_typed(sql, &types).await?;

        let values: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        let rows = conn.client.query(&statement, &values).await?;
        decode_rows(&rows)
    }

    async fn close(&self, conn: PgConnection) {
        let PgConnection { client, task } = conn;

        // Dropping the client sends Terminate; the connection task then ends.
        drop(client);

        if let Err(e) = task.await {
            warn!("database connection task did not shut down cleanly: {e}");
        }
        debug!("database connection closed");
    }
}

// -----------------------------------------------------------------------------
// ----- Errors ----------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PgError {
    #[error(transparent)]
    Driver(#[from] tokio_postgres::Error),

    #[error("column '{column}' has unsupported type '{ty}'")]
    UnsupportedColumn { column: String, ty: String },
}

impl ErrorText for PgError {
    fn error_text(&self) -> String {
        match self {
            PgError::Driver(err) => match err.as_db_error() {
                Some(db) => db.message().to_string(),
                None => err.to_string(),
            },
            other => other.to_string(),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Row decoding ------------------------------------------------

fn decode_rows(rows: &[Row]) -> Result<Vec<Record>, PgError> {
    rows.iter().map(decode_row).collect()
}

fn decode_row(row: &Row) -> Result<Record, PgError> {
    let mut record = Record::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        record.insert(column.name().to_string(), decode_cell(row, idx, column)?);
    }
    Ok(record)
}

fn decode_cell(row: &Row, idx: usize, column: &Column) -> Result<Value, PgError> {
    let ty = column.type_();

    let value = if <bool as FromSql>::accepts(ty) {
        row.try_get::<_, Option<bool>>(idx)?.map(Value::Bool)
    } else if <i16 as FromSql>::accepts(ty) {
        row.try_get::<_, Option<i16>>(idx)?.map(Value::from)
    } else if <i32 as FromSql>::accepts(ty) {
        row.try_get::<_, Option<i32>>(idx)?.map(Value::from)
    } else if <i64 as FromSql>::accepts(ty) {
        row.try_get::<_, Option<i64>>(idx)?.map(Value::from)
    } else if <u32 as FromSql>::accepts(ty) {
        row.try_get::<_, Option<u32>>(idx)?.map(Value::from)
    } else if <f32 as FromSql>::accepts(ty) {
        row.try_get::<_, Option<f32>>(idx)?.map(|v| float(f64::from(v)))
    } else if <f64 as FromSql>::accepts(ty) {
        row.try_get::<_, Option<f64>>(idx)?.map(float)
    } else if <PgNumeric as FromSql>::accepts(ty) {
        row.try_get::<_, Option<PgNumeric>>(idx)?.map(PgNumeric::into_json)
    } else if <String as FromSql>::accepts(ty) {
        row.try_get::<_, Option<String>>(idx)?.map(Value::String)
    } else if <Value as FromSql>::accepts(ty) {
        row.try_get::<_, Option<Value>>(idx)?
    } else if <NaiveDate as FromSql>::accepts(ty) {
        row.try_get::<_, Option<NaiveDate>>(idx)?
            .map(|d| Value::String(d.to_string()))
    } else if <NaiveDateTime as FromSql>::accepts(ty) {
        row.try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(|ts| Value::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
    } else if <DateTime<Utc> as FromSql>::accepts(ty) {
        row.try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(|ts| Value::String(ts.to_rfc3339()))
    } else if <EnumLabel as FromSql>::accepts(ty) {
        row.try_get::<_, Option<EnumLabel>>(idx)?
            .map(|label| Value::String(label.0))
    } else {
        return Err(PgError::UnsupportedColumn {
            column: column.name().to_string(),
            ty: ty.name().to_string(),
        });
    };

    Ok(value.unwrap_or(Value::Null))
}

fn float(v: f64) -> Value {
    Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(v.to_string()))
}

/// Label of a user-defined enum value; the binary format is the label text.
struct EnumLabel(String);

impl<'a> FromSql<'a> for EnumLabel {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(EnumLabel(std::str::from_utf8(raw)?.to_string()))
    }

    fn accepts(ty: &Type) -> bool {
        matches!(ty.kind(), Kind::Enum(_))
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use std::time::Duration;

    #[test]
    fn builds_connection_config_from_settings() {
        let settings = DatabaseSettings {
            host: "db.internal".to_string(),
            port: 6432,
            user: "postgres".to_string(),
            password: SecretString::new("pw".to_string().into_boxed_str()),
            dbname: "crypto".to_string(),
            connect_timeout: Some(Duration::from_secs(3)),
        };

        let driver = PgDriver::new(&settings);

        assert_eq!(driver.config.get_user(), Some("postgres"));
        assert_eq!(driver.config.get_dbname(), Some("crypto"));
        assert_eq!(driver.config.get_ports(), &[6432]);
        assert_eq!(driver.config.get_password(), Some(&b"pw"[..]));
        assert_eq!(driver.config.get_connect_timeout(), Some(&Duration::from_secs(3)));
        assert_eq!(driver.config.get_application_name(), Some(APPLICATION_NAME));
    }

    #[test]
    fn unsupported_column_text_names_the_column() {
        let err = PgError::UnsupportedColumn {
            column: "geom".to_string(),
            ty: "point".to_string(),
        };
        assert_eq!(err.error_text(), "column 'geom' has unsupported type 'point'");
    }

    #[test]
    fn floats_that_json_cannot_hold_become_text() {
        assert_eq!(float(1.5), serde_json::json!(1.5));
        assert_eq!(float(f64::NAN), Value::String("NaN".to_string()));
    }

    #[tokio::test]
    async fn connect_failure_text_comes_from_the_driver() {
        let mut config = tokio_postgres::Config::new();
        config
            .host("127.0.0.1")
            .port(1)
            .user("nobody")
            .dbname("nothing")
            .connect_timeout(Duration::from_millis(500));

        let err = PgDriver::from_config(config).connect().await.unwrap_err();
        assert!(matches!(err, PgError::Driver(_)));
        assert!(!err.error_text().is_empty());
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
