//! Account and order HTTP services. Each endpoint is one statement on the
//! shared executor, rendered with the same status rule.

pub mod account;
pub mod order;
pub mod params;
pub mod render;

use axum::Router;
use std::{future::Future, io};
use tokio::net::TcpListener;
use tracing::info;

pub use params::ParamError;
pub use render::render;

pub async fn serve(
    name: &'static str,
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("{name} service listening on {addr}");
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
