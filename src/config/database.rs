use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::{ConfigError, config::parse_duration};

// -----------------------------------------------------------------------------
// ----- DatabaseSettings ------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    pub dbname: String,
    pub connect_timeout: Option<Duration>,
}

impl DatabaseSettings {
    pub fn password_exposed(&self) -> &str {
        self.password.expose_secret()
    }

    pub(super) fn from_section(section: DatabaseSection) -> Result<Self, ConfigError> {
        validate(&section)?;

        let connect_timeout = section
            .connect_timeout
            .as_deref()
            .map(|raw| parse_duration("database.connect_timeout", raw))
            .transpose()?;

        Ok(Self {
            host: section.host,
            port: section.port,
            user: section.user,
            password: SecretString::new(section.password.into_boxed_str()),
            dbname: section.dbname,
            connect_timeout,
        })
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: On-disk format ----------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub(super) struct DatabaseSection {
    #[serde(default = "default_host")]
    host: String,

    #[serde(default = "default_port")]
    port: u16,

    #[serde(alias = "username")]
    user: String,

    #[serde(default)]
    password: String,

    #[serde(alias = "database")]
    dbname: String,

    #[serde(default)]
    connect_timeout: Option<String>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

fn validate(s: &DatabaseSection) -> Result<(), ConfigError> {
    if s.host.trim().is_empty() {
        return Err(ConfigError::InvalidField("database.host".into()));
    }
    if s.port == 0 {
        return Err(ConfigError::InvalidField("database.port".into()));
    }
    if s.user.trim().is_empty() {
        return Err(ConfigError::InvalidField("database.user".into()));
    }
    if s.dbname.trim().is_empty() {
        return Err(ConfigError::InvalidField("database.dbname".into()));
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn section(raw: &str) -> DatabaseSection {
        toml::from_str(raw).unwrap()
    }

    #[test]
    fn defaults_and_aliases() {
        let s = section(
            r#"
            username = "postgres"
            database = "crypto"
            "#,
        );
        let db = DatabaseSettings::from_section(s).unwrap();
        assert_eq!(db.host, "localhost");
        assert_eq!(db.port, 5432);
        assert_eq!(db.user, "postgres");
        assert_eq!(db.dbname, "crypto");
        assert_eq!(db.password_exposed(), "");
        assert_eq!(db.connect_timeout, None);
    }

    #[test]
    fn password_is_redacted_in_debug_output() {
        let s = section(
            r#"
            user = "postgres"
            password = "Portree123"
            dbname = "crypto"
            connect_timeout = "2s 500ms"
            "#,
        );
        let db = DatabaseSettings::from_section(s).unwrap();
        assert_eq!(db.password_exposed(), "Portree123");
        assert_eq!(db.connect_timeout, Some(Duration::from_millis(2_500)));
        assert!(!format!("{db:?}").contains("Portree123"));
    }

    #[test]
    fn rejects_blank_fields_and_bad_timeouts() {
        let s = section(
            r#"
            user = " "
            dbname = "crypto"
            "#,
        );
        let err = DatabaseSettings::from_section(s).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField(f) if f == "database.user"));

        let s = section(
            r#"
            user = "postgres"
            dbname = "crypto"
            connect_timeout = "soon"
            "#,
        );
        let err = DatabaseSettings::from_section(s).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDuration { .. }));
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
