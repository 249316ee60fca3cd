pub mod dispatcher;
pub mod registry;
pub mod request;
pub mod server;

pub use dispatcher::GatewayDispatcher;
pub use registry::{BackendRegistry, Route, Target};
pub use request::{IdentityToken, InboundRequest, ProxiedResponse};
pub use server::{GatewayState, router, serve};
