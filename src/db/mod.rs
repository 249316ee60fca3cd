//! Database execution layer: one connection per statement, one result shape.

pub mod driver;
pub mod envelope;
pub mod executor;
pub mod numeric;
pub mod postgres;
pub mod shape;

pub use driver::{Driver, ErrorText};
pub use envelope::ResultEnvelope;
pub use executor::Executor;
pub use postgres::{PgDriver, PgError};
pub use shape::{Record, Shape};
