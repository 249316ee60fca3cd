use axum::http::HeaderName;
use serde::Deserialize;
use std::{net::SocketAddr, path::Path, time::Duration};
use tokio::fs;

use super::{
    ConfigError,
    database::{DatabaseSection, DatabaseSettings},
    routes::{RouteFileEntry, build_registry},
    types::MatchMode,
};
use crate::gateway::registry::BackendRegistry;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const DEFAULT_GATEWAY_LISTEN: &str = "0.0.0.0:8081";
const DEFAULT_ACCOUNT_LISTEN: &str = "127.0.0.1:8082";
const DEFAULT_ORDER_LISTEN: &str = "127.0.0.1:8083";
const DEFAULT_IDENTITY_HEADER: &str = "user-principal";
const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;
const DEFAULT_PRICE_URL: &str = "http://127.0.0.1:5000/btc-price";

// -----------------------------------------------------------------------------
// ----- Config ----------------------------------------------------------------

/// Everything read from the config file. Built once at startup and shared
/// read-only afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub gateway: GatewaySettings,
    pub registry: BackendRegistry,
    pub database: DatabaseSettings,
    pub services: ServicesSettings,
    pub settlement: SettlementSettings,
}

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub listen_addr: SocketAddr,
    pub identity_header: HeaderName,
    pub forward_timeout: Option<Duration>,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct ServicesSettings {
    pub account_listen_addr: SocketAddr,
    pub order_listen_addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct SettlementSettings {
    pub price_url: String,
}

// -----------------------------------------------------------------------------
// ----- Config: Static --------------------------------------------------------

impl Config {
    pub async fn from_file_async(path: &Path) -> Result<Config, ConfigError> {
        let raw = fs::read_to_string(path).await.map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Config, ConfigError> {
        let doc: ConfigFile = toml::from_str(raw).map_err(|e| ConfigError::Toml { source: e })?;

        let registry = build_registry(doc.routes, doc.gateway.match_mode)?;

        Ok(Config {
            gateway: GatewaySettings::from_section(doc.gateway)?,
            registry,
            database: DatabaseSettings::from_section(doc.database)?,
            services: ServicesSettings::from_section(doc.services)?,
            settlement: SettlementSettings::from_section(doc.settlement)?,
        })
    }
}

// -----------------------------------------------------------------------------
// ----- Sections --------------------------------------------------------------

impl GatewaySettings {
    fn from_section(s: GatewaySection) -> Result<Self, ConfigError> {
        let identity_header = HeaderName::from_bytes(s.identity_header.as_bytes())
            .map_err(|_| ConfigError::InvalidField("gateway.identity_header".into()))?;

        let forward_timeout = s
            .forward_timeout
            .as_deref()
            .map(|raw| parse_duration("gateway.forward_timeout", raw))
            .transpose()?;

        if s.max_body_bytes == 0 {
            return Err(ConfigError::InvalidField("gateway.max_body_bytes".into()));
        }

        Ok(Self {
            listen_addr: parse_addr("gateway.listen", &s.listen)?,
            identity_header,
            forward_timeout,
            max_body_bytes: s.max_body_bytes,
        })
    }
}

impl ServicesSettings {
    fn from_section(s: ServicesSection) -> Result<Self, ConfigError> {
        Ok(Self {
            account_listen_addr: parse_addr("services.account_listen", &s.account_listen)?,
            order_listen_addr: parse_addr("services.order_listen", &s.order_listen)?,
        })
    }
}

impl SettlementSettings {
    fn from_section(s: SettlementSection) -> Result<Self, ConfigError> {
        let url = s.price_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidField("settlement.price_url".into()));
        }
        Ok(Self {
            price_url: url.to_string(),
        })
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: On-disk format ----------------------------------------------

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    gateway: GatewaySection,

    #[serde(default)]
    routes: Vec<RouteFileEntry>,

    database: DatabaseSection,

    #[serde(default)]
    services: ServicesSection,

    #[serde(default)]
    settlement: SettlementSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GatewaySection {
    listen: String,
    identity_header: String,
    forward_timeout: Option<String>,
    max_body_bytes: usize,
    match_mode: MatchMode,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: DEFAULT_GATEWAY_LISTEN.to_string(),
            identity_header: DEFAULT_IDENTITY_HEADER.to_string(),
            forward_timeout: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            match_mode: MatchMode::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ServicesSection {
    account_listen: String,
    order_listen: String,
}

impl Default for ServicesSection {
    fn default() -> Self {
        Self {
            account_listen: DEFAULT_ACCOUNT_LISTEN.to_string(),
            order_listen: DEFAULT_ORDER_LISTEN.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SettlementSection {
    price_url: String,
}

impl Default for SettlementSection {
    fn default() -> Self {
        Self {
            price_url: DEFAULT_PRICE_URL.to_string(),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

pub(super) fn parse_duration(field: &str, raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw.trim()).map_err(|e| ConfigError::InvalidDuration {
        field: field.to_string(),
        source: e,
    })
}

fn parse_addr(field: &str, raw: &str) -> Result<SocketAddr, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidAddress {
            field: field.to_string(),
            value: raw.to_string(),
        })
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
