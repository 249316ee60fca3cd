use std::{fmt, future::Future};

use super::shape::Record;

// -----------------------------------------------------------------------------
// ----- ErrorText -------------------------------------------------------------

/// Turns a driver error into the one human-readable line callers get back.
///
/// Implementations prefer the structured, server-supplied message when the
/// driver exposes one and fall back to the driver's generic text otherwise.
pub trait ErrorText {
    fn error_text(&self) -> String;
}

// -----------------------------------------------------------------------------
// ----- Driver ----------------------------------------------------------------

/// The narrow surface the executor needs from a database client.
///
/// `close` takes the connection by value, so a connection can be released at
/// most once.
pub trait Driver: Send + Sync + 'static {
    type Conn: Send;
    type Error: ErrorText + fmt::Display + Send;

    fn connect(&self) -> impl Future<Output = Result<Self::Conn, Self::Error>> + Send;

    /// Parameter-free execution path.
    fn query(
        &self,
        conn: &mut Self::Conn,
        sql: &str,
    ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send;

    /// Positional parameters, already stringified.
    fn query_with_params(
        &self,
        conn: &mut Self::Conn,
        sql: &str,
        params: &[String],
    ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send;

    fn close(&self, conn: Self::Conn) -> impl Future<Output = ()> + Send;
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
