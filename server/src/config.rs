//! Server configuration module.
//!
//! This module provides configuration loading for the realm server from
//! environment variables. Configuration is read once at startup and is
//! read-only afterwards; there is no reload mechanism.
//!
//! # Environment Variables
//!
//! - `REALM_TENANT_PATH_MARKER`: Path segment preceding the tenant identifier (default: `/tenants`)
//! - `REALM_TENANT_DIRECTORY`: Directory holding one `<tenant>.json` record per tenant (default: `./tenants`)
//! - `REALM_LISTEN_PORT`: Port to listen on (default: `8080`)
//!
//! # Invariants
//!
//! - `tenant_path_marker` is non-empty and contains no `?`
//! - `tenant_directory` is always a valid path (may not exist yet)
//! - `listen_port` is always a valid port number

use std::path::PathBuf;

const MARKER_VAR: &str = "REALM_TENANT_PATH_MARKER";
const DIRECTORY_VAR: &str = "REALM_TENANT_DIRECTORY";
const PORT_VAR: &str = "REALM_LISTEN_PORT";

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Path segment that precedes the tenant identifier in request paths.
    pub tenant_path_marker: String,
    /// Directory where tenant records are stored.
    /// Each tenant's record is at `{tenant_directory}/{tenant}.json`.
    pub tenant_directory: PathBuf,
    /// Port to listen on for HTTP requests.
    pub listen_port: u16,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    /// Default port for the server.
    pub const DEFAULT_PORT: u16 = 8080;
    /// Default tenant path marker.
    pub const DEFAULT_TENANT_PATH_MARKER: &'static str = "/tenants";
    /// Default tenant record directory.
    pub const DEFAULT_TENANT_DIRECTORY: &'static str = "./tenants";

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `REALM_TENANT_PATH_MARKER` is set but empty or contains `?`
    /// - `REALM_LISTEN_PORT` is set but not a valid port number
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// `lookup` returns `None` for unset variables.
    ///
    /// # Errors
    ///
    /// Same as `from_env`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let tenant_path_marker = Self::load_tenant_path_marker(&lookup)?;
        let tenant_directory = Self::load_tenant_directory(&lookup);
        let listen_port = Self::load_listen_port(&lookup)?;

        Ok(Self {
            tenant_path_marker,
            tenant_directory,
            listen_port,
        })
    }

    /// Load the tenant path marker.
    ///
    /// Returns the default if not set.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is set but unusable.
    fn load_tenant_path_marker<F>(lookup: &F) -> Result<String, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(marker) = lookup(MARKER_VAR) else {
            return Ok(Self::DEFAULT_TENANT_PATH_MARKER.to_string());
        };

        let trimmed = marker.trim();
        if trimmed.is_empty() || trimmed == "/" {
            return Err(ConfigError::InvalidValue {
                name: MARKER_VAR.to_string(),
                message: "must name a path segment".to_string(),
            });
        }

        if trimmed.contains('?') {
            return Err(ConfigError::InvalidValue {
                name: MARKER_VAR.to_string(),
                message: format!("'{trimmed}' must not contain '?'"),
            });
        }

        Ok(trimmed.to_string())
    }

    /// Load the tenant record directory.
    ///
    /// Returns the default if not set.
    fn load_tenant_directory<F>(lookup: &F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(DIRECTORY_VAR).map_or_else(
            || PathBuf::from(Self::DEFAULT_TENANT_DIRECTORY),
            PathBuf::from,
        )
    }

    /// Load the listen port.
    ///
    /// Returns the default if not set.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is set but not a valid port number.
    fn load_listen_port<F>(lookup: &F) -> Result<u16, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(PORT_VAR) {
            Some(value) => match value.parse::<u16>() {
                Ok(port) if port > 0 => Ok(port),
                _ => Err(ConfigError::InvalidValue {
                    name: PORT_VAR.to_string(),
                    message: format!("'{value}' is not a valid port number (must be 1-65535)"),
                }),
            },
            None => Ok(Self::DEFAULT_PORT),
        }
    }
}
