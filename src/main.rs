use std::{io, net::SocketAddr, process::ExitCode, sync::Arc};
use thiserror::Error;
use tokio::{net::TcpListener, signal, sync::watch, task::JoinSet};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use coingate::{
    CliConfig, Command, Config,
    config::{ConfigError, LogLevel, ServiceSelection},
    db::{Executor, PgDriver},
    gateway::{self, GatewayDispatcher, GatewayState},
    services,
    settlement::{self, SettlementError},
};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const APP_NAME: &str = "🪙 coingate";

// -----------------------------------------------------------------------------
// ----- Main ------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliConfig::from_args();
    init_tracing(cli.log_level);

    let outcome = match setup(&cli).await {
        Ok(config) => match cli.command {
            Command::Serve { service } => serve(config, service).await,
            Command::Settle => settle(config).await,
        },
        Err(e) => Err(e),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{APP_NAME} failed: {e}");
            ExitCode::FAILURE
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Setup -----------------------------------------------------------------

async fn setup(cli: &CliConfig) -> Result<Config, AppError> {
    cli.validate()?;
    let config = Config::from_file_async(&cli.config_file_location).await?;
    info!(
        "loaded {} with {} route(s)",
        cli.config_file_location.display(),
        config.registry.routes().len()
    );
    Ok(config)
}

fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::new(level.as_str());
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

// -----------------------------------------------------------------------------
// ----- Serve -----------------------------------------------------------------

async fn serve(config: Config, selection: ServiceSelection) -> Result<(), AppError> {
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut servers = JoinSet::new();

    let executor = Arc::new(
        Executor::new(PgDriver::new(&config.database))
            .with_acquire_timeout(config.database.connect_timeout),
    );

    if selection.includes(ServiceSelection::Account) {
        let listener = bind(config.services.account_listen_addr).await?;
        servers.spawn(services::serve(
            "account",
            listener,
            services::account::router(Arc::clone(&executor)),
            stopped(stop_rx.clone()),
        ));
    }

    if selection.includes(ServiceSelection::Order) {
        let listener = bind(config.services.order_listen_addr).await?;
        servers.spawn(services::serve(
            "order",
            listener,
            services::order::router(Arc::clone(&executor)),
            stopped(stop_rx.clone()),
        ));
    }

    if selection.includes(ServiceSelection::Gateway) {
        let listener = bind(config.gateway.listen_addr).await?;
        let state = Arc::new(GatewayState {
            dispatcher: GatewayDispatcher::new(Arc::new(config.registry), &config.gateway)?,
            max_body_bytes: config.gateway.max_body_bytes,
        });
        servers.spawn(gateway::serve(listener, state, stopped(stop_rx.clone())));
    }

    info!("{APP_NAME} running ({selection:?})");

    // A server that stops on its own is an error; stop the rest with it.
    let early = tokio::select! {
        _ = signal::ctrl_c() => {
            info!("{APP_NAME} shutting down");
            None
        }
        Some(result) = servers.join_next() => Some(result),
    };

    let _ = stop_tx.send(true);

    if let Some(result) = early {
        result??;
    }
    while let Some(result) = servers.join_next().await {
        result??;
    }

    Ok(())
}

async fn bind(addr: SocketAddr) -> Result<TcpListener, AppError> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Bind { addr, source: e })
}

async fn stopped(mut stop: watch::Receiver<bool>) {
    let _ = stop.wait_for(|stop| *stop).await;
}

// -----------------------------------------------------------------------------
// ----- Settle ----------------------------------------------------------------

async fn settle(config: Config) -> Result<(), AppError> {
    let executor = Executor::new(PgDriver::new(&config.database))
        .with_acquire_timeout(config.database.connect_timeout);
    let client = reqwest::Client::builder().build()?;

    let summary = settlement::run(&executor, &client, &config.settlement.price_url).await?;
    if summary.failed > 0 {
        error!("{} order(s) could not be executed", summary.failed);
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// ----- Errors ----------------------------------------------------------------

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("server error: {0}")]
    Server(#[from] io::Error),

    #[error("server task ended abnormally: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("http client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Settlement(#[from] SettlementError),
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
