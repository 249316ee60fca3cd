use serde::Deserialize;
use std::collections::HashSet;

use super::{ConfigError, types::MatchMode};
use crate::gateway::registry::{BackendRegistry, Route, Target};

// -----------------------------------------------------------------------------
// ----- On-disk format --------------------------------------------------------

/// One `[[routes]]` table: every fragment listed forwards to `host:port`.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteFileEntry {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(alias = "paths")]
    pub fragments: Vec<String>,

    pub host: String,

    pub port: u16,
}

// -----------------------------------------------------------------------------
// ----- Build -----------------------------------------------------------------

/// Flatten the `[[routes]]` tables into a registry, preserving file order.
pub fn build_registry(
    entries: Vec<RouteFileEntry>,
    mode: MatchMode,
) -> Result<BackendRegistry, ConfigError> {
    if entries.is_empty() {
        return Err(ConfigError::EmptyRoutes);
    }

    let mut seen = HashSet::new();
    let mut routes = Vec::new();

    for (idx, entry) in entries.into_iter().enumerate() {
        let backend = entry
            .name
            .clone()
            .unwrap_or_else(|| format!("{}:{}", entry.host, entry.port));

        validate(idx, &backend, &entry)?;

        let target = Target::new(entry.host.trim(), entry.port);

        for fragment in entry.fragments {
            if !seen.insert(fragment.clone()) {
                return Err(ConfigError::DuplicateFragment { fragment });
            }

            routes.push(Route {
                backend: backend.clone(),
                fragment,
                target: target.clone(),
            });
        }
    }

    Ok(BackendRegistry::new(mode, routes))
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

fn validate(idx: usize, backend: &str, entry: &RouteFileEntry) -> Result<(), ConfigError> {
    if entry.host.trim().is_empty() {
        return Err(ConfigError::InvalidField(format!("routes[{idx}].host")));
    }
    if entry.port == 0 {
        return Err(ConfigError::InvalidPort {
            route: backend.to_string(),
        });
    }
    if entry.fragments.is_empty() {
        return Err(ConfigError::InvalidField(format!("routes[{idx}].fragments")));
    }
    if let Some(pos) = entry.fragments.iter().position(|f| f.is_empty()) {
        return Err(ConfigError::InvalidField(format!(
            "routes[{idx}].fragments[{pos}]"
        )));
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
