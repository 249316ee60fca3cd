use serde::Deserialize;

// -------------------------------------------------------------------------------------------------
// ---- LogLevel -----------------------------------------------------------------------------------

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

// -------------------------------------------------------------------------------------------------
// ---- MatchMode ----------------------------------------------------------------------------------

/// How a route fragment is tested against a request path.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// The fragment appears anywhere in the path.
    #[default]
    Contains,

    /// The fragment is a whole leading run of path segments.
    Segment,
}

// -------------------------------------------------------------------------------------------------
// ---- ServiceSelection ---------------------------------------------------------------------------

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ServiceSelection {
    #[default]
    All,
    Gateway,
    Account,
    Order,
}

impl ServiceSelection {
    pub fn includes(self, other: ServiceSelection) -> bool {
        self == ServiceSelection::All || self == other
    }
}

// -------------------------------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------
