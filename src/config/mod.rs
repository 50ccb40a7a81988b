pub mod assets;

use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_port, validate_positive_number, Validate,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "feed-calc")]
#[command(about = "Feed formulation calculator served over HTTP")]
pub struct ServerConfig {
    /// TCP port to bind
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, default_value = "converted_file.csv")]
    pub csv_path: String,

    #[arg(long, default_value = "templates")]
    pub templates_dir: String,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, env = "FEED_CALC_LOG_JSON", help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: "0.0.0.0".to_string(),
            csv_path: "converted_file.csv".to_string(),
            templates_dir: "templates".to_string(),
            verbose: false,
            json_logs: false,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse()
            .map_err(|e| crate::utils::error::AppError::InvalidConfigValueError {
                field: "host".to_string(),
                value: raw.clone(),
                reason: format!("Invalid bind address: {}", e),
            })
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<()> {
        validate_port("port", self.port)?;
        validate_non_empty_string("host", &self.host)?;
        validate_path("csv_path", &self.csv_path)?;
        validate_path("templates_dir", &self.templates_dir)?;
        self.bind_addr()?;
        Ok(())
    }
}

/// Worker layout of the server. Fixed at build time; there are no flags for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    pub workers: usize,
    pub threads_per_worker: usize,
    pub request_timeout: Duration,
}

impl Topology {
    pub const WORKERS: usize = 4;
    pub const THREADS_PER_WORKER: usize = 2;
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

    pub fn total_slots(&self) -> usize {
        self.workers * self.threads_per_worker
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            workers: Self::WORKERS,
            threads_per_worker: Self::THREADS_PER_WORKER,
            request_timeout: Self::REQUEST_TIMEOUT,
        }
    }
}

impl Validate for Topology {
    fn validate(&self) -> Result<()> {
        validate_positive_number("workers", self.workers, 1)?;
        validate_positive_number("threads_per_worker", self.threads_per_worker, 1)?;
        if self.request_timeout.is_zero() {
            return Err(crate::utils::error::AppError::InvalidConfigValueError {
                field: "request_timeout".to_string(),
                value: "0s".to_string(),
                reason: "Timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, FromArgMatches};

    #[test]
    fn test_default_port_without_env() {
        // detach the PORT lookup so the result does not depend on the test environment
        let command = ServerConfig::command().mut_arg("port", |arg| arg.env(None::<&'static str>));
        let matches = command.try_get_matches_from(["feed-calc"]).unwrap();
        let config = ServerConfig::from_arg_matches(&matches).unwrap();

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.host, ServerConfig::default().host);
        assert_eq!(ServerConfig::default().port, 8080);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_port_flag_overrides_default() {
        let config = ServerConfig::try_parse_from(["feed-calc", "--port", "9090"]).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.bind_addr().unwrap().port(), 9090);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(ServerConfig::try_parse_from(["feed-calc", "--port", "70000"]).is_err());
        assert!(ServerConfig::try_parse_from(["feed-calc", "--port", "http"]).is_err());

        let config = ServerConfig {
            port: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_host_is_rejected() {
        let config = ServerConfig {
            host: "not a host".to_string(),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_topology() {
        let topology = Topology::default();
        assert_eq!(topology.workers, 4);
        assert_eq!(topology.threads_per_worker, 2);
        assert_eq!(topology.request_timeout, Duration::from_secs(120));
        assert_eq!(topology.total_slots(), 8);
        assert!(topology.validate().is_ok());
    }
}
