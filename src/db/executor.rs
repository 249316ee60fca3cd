use futures::FutureExt;
use std::{panic::AssertUnwindSafe, time::Duration};
use tracing::{debug, error, warn};

use super::{
    driver::{Driver, ErrorText},
    envelope::ResultEnvelope,
    shape::{Record, Shape},
};
use crate::errors::panic_message;

// -----------------------------------------------------------------------------
// ----- Executor --------------------------------------------------------------

/// Runs one statement per call on a freshly acquired connection.
///
/// Every call goes acquire -> run -> release -> shape. The connection is
/// released before the envelope is built, on success, on statement failure and
/// when the statement panics. `execute` never returns an error and never lets a
/// panic escape: every outcome is a [`ResultEnvelope`].
#[derive(Debug)]
pub struct Executor<D> {
    driver: D,
    acquire_timeout: Option<Duration>,
}

// -----------------------------------------------------------------------------
// ----- Executor: Static ------------------------------------------------------

impl<D: Driver> Executor<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            acquire_timeout: None,
        }
    }

    /// Bound connection acquisition. `None` waits as long as the driver does.
    pub fn with_acquire_timeout(mut self, limit: Option<Duration>) -> Self {
        self.acquire_timeout = limit;
        self
    }
}

// -----------------------------------------------------------------------------
// ----- Executor: Public ------------------------------------------------------

impl<D: Driver> Executor<D> {
    pub async fn execute(&self, sql: &str, params: &[String], shape: Shape) -> ResultEnvelope {
        match AssertUnwindSafe(self.run(sql, params, shape))
            .catch_unwind()
            .await
        {
            Ok(envelope) => envelope,
            Err(panic) => {
                let reason = panic_message(&*panic);
                error!("executor fault outside the statement: {reason}");
                ResultEnvelope::failure(format!("internal fault: {reason}"))
            }
        }
    }

    pub async fn exec(&self, sql: &str, params: &[String]) -> ResultEnvelope {
        self.execute(sql, params, Shape::None).await
    }

    pub async fn fetch_value(&self, sql: &str, params: &[String]) -> ResultEnvelope {
        self.execute(sql, params, Shape::Value).await
    }

    pub async fn fetch_row(&self, sql: &str, params: &[String]) -> ResultEnvelope {
        self.execute(sql, params, Shape::Row).await
    }

    pub async fn fetch_rows(&self, sql: &str, params: &[String]) -> ResultEnvelope {
        self.execute(sql, params, Shape::Rows).await
    }
}

// -----------------------------------------------------------------------------
// ----- Executor: Private -----------------------------------------------------

impl<D: Driver> Executor<D> {
    async fn run(&self, sql: &str, params: &[String], shape: Shape) -> ResultEnvelope {
        let mut conn = match self.acquire().await {
            Ok(conn) => conn,
            Err(message) => {
                warn!("could not acquire database connection: {message}");
                return ResultEnvelope::failure(message);
            }
        };

        debug!(shape = %shape, params = params.len(), "executing statement");

        let outcome = AssertUnwindSafe(self.statement(&mut conn, sql, params))
            .catch_unwind()
            .await;

        self.driver.close(conn).await;

        match outcome {
            Ok(Ok(rows)) => ResultEnvelope::success(shape.apply(rows)),
            Ok(Err(err)) => {
                let message = err.error_text();
                warn!("statement failed: {message}");
                ResultEnvelope::failure(message)
            }
            Err(panic) => {
                let reason = panic_message(&*panic);
                error!("statement panicked: {reason}");
                ResultEnvelope::failure(format!("internal fault: {reason}"))
            }
        }
    }

    async fn acquire(&self) -> Result<D::Conn, String> {
        let Some(limit) = self.acquire_timeout else {
            return self.driver.connect().await.map_err(|e| e.error_text());
        };

        match tokio::time::timeout(limit, self.driver.connect()).await {
            Ok(res) => res.map_err(|e| e.error_text()),
            Err(_) => Err(format!(
                "timed out acquiring database connection after {}",
                humantime::format_duration(limit)
            )),
        }
    }

    async fn statement(
        &self,
        conn: &mut D::Conn,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<Record>, D::Error> {
        if params.is_empty() {
            self.driver.query(conn, sql).await
        } else {
            self.driver.query_with_params(conn, sql, params).await
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
