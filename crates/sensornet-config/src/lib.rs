//! Layered configuration for the sensornet client.
//!
//! Values are merged from built-in defaults, a configuration file
//! (`--config-path`, `SENSORNET_CONFIG_PATH`, or a discovered
//! `sensornet.toml`), `SENSORNET_*` environment variables, and command-line
//! flags, in increasing order of precedence. [`Config::session_settings`]
//! validates the merged values and turns them into the core crate's session
//! and transport settings.

use std::fmt;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sensornet::{Credentials, SessionConfig, TransportSettings};

mod defaults;
mod logging;

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_RENDEZVOUS_HOST, DEFAULT_RENDEZVOUS_PORT, MIN_FRAME_CAPACITY,
    default_frame_capacity, default_log_filter, default_log_filter_string, default_log_format,
    default_rendezvous_host_string, default_rendezvous_port,
};
pub use logging::LogFormat;

/// Merged client configuration.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(
    prefix = "SENSORNET",
    discovery(
        app_name = "sensornet",
        env_var = "SENSORNET_CONFIG_PATH",
        config_file_name = "sensornet.toml",
        dotfile_name = ".sensornet.toml",
        config_cli_long = "config-path",
        config_cli_visible = true,
    )
)]
pub struct Config {
    /// Rendezvous endpoint host.
    #[serde(default = "default_rendezvous_host_string")]
    #[ortho_config(default = default_rendezvous_host_string())]
    pub rendezvous_host: String,
    /// Rendezvous endpoint port.
    #[serde(default = "default_rendezvous_port")]
    #[ortho_config(default = DEFAULT_RENDEZVOUS_PORT)]
    pub rendezvous_port: u16,
    /// Secret presented to the rendezvous endpoint.
    #[serde(default)]
    pub rendezvous_credential: Option<String>,
    /// Secret presented to the resource endpoint.
    #[serde(default)]
    pub resource_credential: Option<String>,
    /// Receive buffer capacity in bytes.
    #[serde(default = "default_frame_capacity")]
    #[ortho_config(default = sensornet::DEFAULT_FRAME_CAPACITY)]
    pub frame_capacity: usize,
    /// Optional TCP connect deadline in milliseconds.
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
    /// Optional per-read/per-write deadline in milliseconds.
    #[serde(default)]
    pub io_timeout_ms: Option<u64>,
    /// `tracing_subscriber::EnvFilter` expression.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log line format.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = LogFormat::Compact)]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rendezvous_host: default_rendezvous_host_string(),
            rendezvous_port: default_rendezvous_port(),
            rendezvous_credential: None,
            resource_credential: None,
            frame_capacity: default_frame_capacity(),
            connect_timeout_ms: None,
            io_timeout_ms: None,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |secret: &Option<String>| secret.as_ref().map(|_| "<redacted>");
        formatter
            .debug_struct("Config")
            .field("rendezvous_host", &self.rendezvous_host)
            .field("rendezvous_port", &self.rendezvous_port)
            .field("rendezvous_credential", &redact(&self.rendezvous_credential))
            .field("resource_credential", &redact(&self.resource_credential))
            .field("frame_capacity", &self.frame_capacity)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("io_timeout_ms", &self.io_timeout_ms)
            .field("log_filter", &self.log_filter)
            .field("log_format", &self.log_format)
            .finish()
    }
}

/// Which credential a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialRole {
    /// The rendezvous credential.
    Rendezvous,
    /// The resource credential.
    Resource,
}

impl fmt::Display for CredentialRole {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Rendezvous => "rendezvous_credential",
            Self::Resource => "resource_credential",
        })
    }
}

/// Reasons a merged configuration cannot drive a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `rendezvous_host` is empty.
    #[error("rendezvous_host must not be empty")]
    EmptyHost,
    /// `rendezvous_port` is zero.
    #[error("rendezvous_port must be between 1 and 65535")]
    ZeroPort,
    /// `frame_capacity` is too small to hold a protocol line.
    #[error("frame_capacity must be at least {minimum} bytes, got {actual}")]
    FrameCapacityTooSmall {
        /// Smallest accepted capacity.
        minimum: usize,
        /// Configured capacity.
        actual: usize,
    },
    /// A credential is not configured.
    #[error("{0} is required; set it in sensornet.toml, SENSORNET_{upper} or --{flag}", upper = .0.env_suffix(), flag = .0.flag())]
    MissingCredential(CredentialRole),
    /// A credential would break the line-oriented `AUTH` request.
    #[error("{0} must be non-empty and must not contain whitespace")]
    InvalidCredential(CredentialRole),
    /// A timeout was configured as zero.
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

impl CredentialRole {
    const fn env_suffix(self) -> &'static str {
        match self {
            Self::Rendezvous => "RENDEZVOUS_CREDENTIAL",
            Self::Resource => "RESOURCE_CREDENTIAL",
        }
    }

    const fn flag(self) -> &'static str {
        match self {
            Self::Rendezvous => "rendezvous-credential",
            Self::Resource => "resource-credential",
        }
    }
}

/// Validated settings ready to build a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Endpoint, credentials and buffer size for the session.
    pub session: SessionConfig,
    /// Deadlines for the TCP connector.
    pub transport: TransportSettings,
}

impl Config {
    /// Rendezvous host.
    pub fn rendezvous_host(&self) -> &str {
        &self.rendezvous_host
    }

    /// Rendezvous port.
    pub fn rendezvous_port(&self) -> u16 {
        self.rendezvous_port
    }

    /// Receive buffer capacity in bytes.
    pub fn frame_capacity(&self) -> usize {
        self.frame_capacity
    }

    /// Connect deadline, when configured.
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    /// Read/write deadline, when configured.
    pub fn io_timeout(&self) -> Option<Duration> {
        self.io_timeout_ms.map(Duration::from_millis)
    }

    /// Log filter expression.
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log line format.
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Checks that the merged values can drive a session.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rendezvous_host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.rendezvous_port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if self.frame_capacity < MIN_FRAME_CAPACITY {
            return Err(ConfigError::FrameCapacityTooSmall {
                minimum: MIN_FRAME_CAPACITY,
                actual: self.frame_capacity,
            });
        }
        check_credential(self.rendezvous_credential.as_deref(), CredentialRole::Rendezvous)?;
        check_credential(self.resource_credential.as_deref(), CredentialRole::Resource)?;
        if self.connect_timeout_ms == Some(0) {
            return Err(ConfigError::ZeroTimeout("connect_timeout_ms"));
        }
        if self.io_timeout_ms == Some(0) {
            return Err(ConfigError::ZeroTimeout("io_timeout_ms"));
        }
        Ok(())
    }

    /// Validates the configuration and builds the session settings.
    pub fn session_settings(&self) -> Result<SessionSettings, ConfigError> {
        self.validate()?;
        let rendezvous = check_credential(
            self.rendezvous_credential.as_deref(),
            CredentialRole::Rendezvous,
        )?;
        let resource =
            check_credential(self.resource_credential.as_deref(), CredentialRole::Resource)?;
        let session = SessionConfig::new(
            self.rendezvous_host.trim(),
            self.rendezvous_port,
            Credentials::new(rendezvous, resource),
        )
        .with_frame_capacity(self.frame_capacity);
        Ok(SessionSettings {
            session,
            transport: TransportSettings {
                connect_timeout: self.connect_timeout(),
                io_timeout: self.io_timeout(),
            },
        })
    }
}

fn check_credential(value: Option<&str>, role: CredentialRole) -> Result<&str, ConfigError> {
    let secret = value.ok_or(ConfigError::MissingCredential(role))?;
    if secret.is_empty() || secret.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidCredential(role));
    }
    Ok(secret)
}
