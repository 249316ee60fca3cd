use std::{fmt, net::Ipv6Addr};

use crate::config::MatchMode;

// -----------------------------------------------------------------------------
// ----- Target ----------------------------------------------------------------

/// Network address of one logical backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Absolute URL for `path_and_query` on this backend.
    pub fn url_for(&self, path_and_query: &str) -> String {
        format!("http://{self}{path_and_query}")
    }
}

/// `host:port`, with IPv6 literals bracketed (`[::1]:8082`).
impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.parse::<Ipv6Addr>().is_ok() {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Route -----------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Route {
    pub backend: String,
    pub fragment: String,
    pub target: Target,
}

impl Route {
    fn accepts(&self, mode: MatchMode, path: &str) -> bool {
        match mode {
            MatchMode::Contains => path.contains(self.fragment.as_str()),
            MatchMode::Segment => segment_prefix(&self.fragment, path),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- BackendRegistry -------------------------------------------------------

/// Ordered, immutable path-fragment table. First match wins.
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    mode: MatchMode,
    routes: Vec<Route>,
}

impl BackendRegistry {
    pub fn new(mode: MatchMode, routes: Vec<Route>) -> Self {
        Self { mode, routes }
    }

    pub fn resolve(&self, path: &str) -> Option<&Target> {
        self.resolve_route(path).map(|route| &route.target)
    }

    pub fn resolve_route(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.accepts(self.mode, path))
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

/// `/account` accepts `/account`, `/account/` and `/account/123`, never
/// `/accountdetails/1` or `/notaccount`.
fn segment_prefix(fragment: &str, path: &str) -> bool {
    let fragment = fragment.trim_end_matches('/');
    if fragment.is_empty() {
        return path.starts_with('/');
    }

    match path.strip_prefix(fragment) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
