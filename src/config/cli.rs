use clap::{Parser, Subcommand};
use std::{
    fs,
    path::{Path, PathBuf},
};

use super::{
    ConfigError,
    types::{LogLevel, ServiceSelection},
};

// -----------------------------------------------------------------------------
// ----- CliConfig -------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct CliConfig {
    pub config_file_location: PathBuf,
    pub log_level: LogLevel,
    pub command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Serve { service: ServiceSelection },
    Settle,
}

impl CliConfig {
    pub fn from_args() -> Self {
        Self::from_parsed(Args::parse())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        must_exist_file(&self.config_file_location)
    }
}

// -----------------------------------------------------------------------------
// ----- CliConfig: Private ----------------------------------------------------

impl CliConfig {
    fn from_parsed(args: Args) -> Self {
        let command = match args.command {
            SubCommand::Serve { service } => Command::Serve { service },
            SubCommand::Settle => Command::Settle,
        };

        Self {
            config_file_location: args.config_file,
            log_level: args.log_level,
            command,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Args ------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "coingate", version, about = "API gateway and account/order services")]
struct Args {
    // Not required via CLI or ENV (defaults to ./coingate.toml). Must exist.
    #[arg(long = "config", env = "COINGATE_CONFIG_FILE", default_value = "coingate.toml")]
    config_file: PathBuf,

    // Not required via CLI or ENV (defaults to info).
    #[arg(long = "log", env = "COINGATE_LOG", default_value = "info")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(Subcommand, Debug)]
enum SubCommand {
    /// Run the gateway and the backend services it fronts.
    Serve {
        #[arg(long = "service", value_enum, default_value = "all")]
        service: ServiceSelection,
    },

    /// Execute every open limit order priced above the current feed price, then exit.
    Settle,
}

// -----------------------------------------------------------------------------
// ----- Private Utils ---------------------------------------------------------

fn must_exist_file(path: &Path) -> Result<(), ConfigError> {
    let md = fs::metadata(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    if !md.is_file() {
        return Err(ConfigError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    Ok(())
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliConfig {
        CliConfig::from_parsed(Args::try_parse_from(args).unwrap())
    }

    #[test]
    fn serve_defaults_to_all_services() {
        let cli = parse(&["coingate", "serve"]);
        assert_eq!(
            cli.command,
            Command::Serve {
                service: ServiceSelection::All
            }
        );
        assert_eq!(cli.log_level, LogLevel::Info);
        assert_eq!(cli.config_file_location, PathBuf::from("coingate.toml"));
    }

    #[test]
    fn serve_single_service_and_settle() {
        let cli = parse(&["coingate", "--log", "debug", "serve", "--service", "gateway"]);
        assert_eq!(
            cli.command,
            Command::Serve {
                service: ServiceSelection::Gateway
            }
        );
        assert_eq!(cli.log_level, LogLevel::Debug);

        let cli = parse(&["coingate", "--config", "/etc/coingate.toml", "settle"]);
        assert_eq!(cli.command, Command::Settle);
        assert_eq!(cli.config_file_location, PathBuf::from("/etc/coingate.toml"));
    }

    #[test]
    fn validate_rejects_missing_and_directory_paths() {
        let mut cli = parse(&["coingate", "--config", "/definitely/not/here.toml", "settle"]);
        assert!(matches!(cli.validate(), Err(ConfigError::Io { .. })));

        let dir = tempfile::tempdir().unwrap();
        cli.config_file_location = dir.path().to_path_buf();
        assert!(matches!(cli.validate(), Err(ConfigError::NotAFile { .. })));
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
