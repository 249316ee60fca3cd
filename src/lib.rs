pub mod config;
pub mod db;
pub mod errors;
pub mod gateway;
pub mod services;
pub mod settlement;

pub use config::{CliConfig, Command, Config};
pub use db::{Executor, PgDriver, ResultEnvelope};
pub use errors::GatewayError;
pub use gateway::{BackendRegistry, GatewayDispatcher};
