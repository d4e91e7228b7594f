// ABOUTME: Connection parameters and their loading from TOML files and PG* environment variables
// ABOUTME: Port is fixed at 5432; the password never appears in Debug or Display output

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Server port used for every connection
pub const POSTGRES_PORT: u16 = 5432;

const REDACTED: &str = "********";

/// How hard to try for an encrypted connection.
///
/// `Prefer` and `Require` encrypt without checking the server certificate,
/// as libpq does. `VerifyFull` also checks the certificate chain and host name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    Disable,
    #[default]
    Prefer,
    Require,
    #[serde(rename = "verify-full")]
    VerifyFull,
}

impl FromStr for SslMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            "verify-full" => Ok(SslMode::VerifyFull),
            other => bail!(
                "Invalid sslmode '{}'. Expected one of: disable, prefer, require, verify-full",
                other
            ),
        }
    }
}

/// Everything needed to open (and reopen) a connection
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParameters {
    host: String,
    user: String,
    password: String,
    dbname: String,
    ssl_mode: SslMode,
    application_name: Option<String>,
}

impl ConnectionParameters {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        dbname: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: password.into(),
            dbname: dbname.into(),
            ssl_mode: SslMode::default(),
            application_name: None,
        }
    }

    pub fn with_ssl_mode(mut self, ssl_mode: SslMode) -> Self {
        self.ssl_mode = ssl_mode;
        self
    }

    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        POSTGRES_PORT
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn dbname(&self) -> &str {
        &self.dbname
    }

    pub fn ssl_mode(&self) -> SslMode {
        self.ssl_mode
    }

    pub fn application_name(&self) -> Option<&str> {
        self.application_name.as_deref()
    }

    /// Reject parameters that cannot name a database
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            bail!("Database host cannot be empty");
        }
        if self.user.trim().is_empty() {
            bail!("Database user cannot be empty");
        }
        if self.dbname.trim().is_empty() {
            bail!("Database name cannot be empty");
        }
        Ok(())
    }

    /// Fill in psql's defaults for whatever is missing.
    ///
    /// `host` defaults to `localhost` and `dbname` to the user name; an absent
    /// password means none. `user` is required.
    pub fn from_parts(
        host: Option<String>,
        user: Option<String>,
        password: Option<String>,
        dbname: Option<String>,
    ) -> Result<Self> {
        let user = user.context("No database user given")?;
        let host = host.unwrap_or_else(|| "localhost".to_string());
        let dbname = dbname.unwrap_or_else(|| user.clone());

        let params = Self::new(host, user, password.unwrap_or_default(), dbname);
        params.validate()?;
        Ok(params)
    }

    /// Build parameters from `PGHOST`, `PGUSER`, `PGPASSWORD`, `PGDATABASE`
    /// and `PGSSLMODE`, with the defaults of [`from_parts`](Self::from_parts).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let user = lookup("PGUSER").context("PGUSER is not set")?;
        let mut params = Self::from_parts(
            lookup("PGHOST"),
            Some(user),
            lookup("PGPASSWORD"),
            lookup("PGDATABASE"),
        )?;
        if let Some(mode) = lookup("PGSSLMODE") {
            params.ssl_mode = mode.parse().context("Invalid PGSSLMODE")?;
        }
        Ok(params)
    }

    /// Load parameters from the `[database]` table of a TOML file.
    ///
    /// A missing `password` falls back to `PGPASSWORD`, so the file can be
    /// committed without secrets.
    ///
    /// ```toml
    /// [database]
    /// host = "10.0.0.12"
    /// user = "reporter"
    /// dbname = "sales"
    /// sslmode = "require"
    /// ```
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse_toml(&content, |key| std::env::var(key).ok())
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    fn parse_toml<F>(content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: ConfigFile = toml::from_str(content).context("Failed to parse TOML")?;
        let section = file.database;

        let password = section
            .password
            .or_else(|| lookup("PGPASSWORD"))
            .unwrap_or_default();

        let params = Self {
            host: section.host,
            user: section.user,
            password,
            dbname: section.dbname,
            ssl_mode: section.sslmode.unwrap_or_default(),
            application_name: section.application_name,
        };
        params.validate()?;
        Ok(params)
    }
}

impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("host", &self.host)
            .field("port", &POSTGRES_PORT)
            .field("user", &self.user)
            .field("password", &REDACTED)
            .field("dbname", &self.dbname)
            .field("ssl_mode", &self.ssl_mode)
            .field("application_name", &self.application_name)
            .finish()
    }
}

impl fmt::Display for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "host={} port={} user={} dbname={}",
            self.host, POSTGRES_PORT, self.user, self.dbname
        )
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    database: DatabaseSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatabaseSection {
    host: String,
    user: String,
    password: Option<String>,
    dbname: String,
    sslmode: Option<SslMode>,
    application_name: Option<String>,
}
