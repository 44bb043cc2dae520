//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable
//! overrides. The file path defaults to `config.yaml` but can be specified
//! via `-f` flag or `STUDIOCTL_CONFIG` environment variable.
//!
//! Sources are merged in order (later overrides earlier):
//!
//! 1. **YAML config file** - base configuration
//! 2. **Environment variables** - `STUDIOCTL_`-prefixed variables; nested
//!    fields use double underscores, e.g. `STUDIOCTL_CREDITS__EXCEPTION_SURCHARGE=2`
//!
//! ```bash
//! STUDIOCTL_PORT=8080
//! STUDIOCTL_TIMEZONE="America/Mexico_City"
//! STUDIOCTL_SWEEPER__INTERVAL="10m"
//! ```

use std::time::Duration;

use chrono_tz::Tz;
use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::workflow::WorkflowSettings;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "STUDIOCTL_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// All fields have sensible defaults, so an empty (or absent) config file
/// yields a runnable server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Operating region's civil time zone. Every availability-policy
    /// comparison converts instants into this zone first.
    pub timezone: Tz,
    /// Trusted proxy-header identity settings
    pub auth: AuthConfig,
    /// Credit-system tunables
    pub credits: CreditsConfig,
    /// Stale-lot sweeper settings
    pub sweeper: SweeperConfig,
    /// CORS settings
    pub cors: CorsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            timezone: chrono_tz::America::Mexico_City,
            auth: AuthConfig::default(),
            credits: CreditsConfig::default(),
            sweeper: SweeperConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

/// Identity arrives as trusted headers set by an upstream proxy; these name
/// the headers to read.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub id_header: String,
    pub role_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            id_header: "x-actor-id".to_string(),
            role_header: "x-actor-role".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreditsConfig {
    /// Expiry horizon for lots granted without an explicit one (purchases,
    /// refunds, transfers)
    pub default_expiry_days: i64,
    /// Extra credits charged on exception bookings
    pub exception_surcharge: i64,
    /// Self-service cancellations at least this far ahead of start refund in
    /// full; later ones refund nothing
    pub refund_cutoff_hours: i64,
}

impl Default for CreditsConfig {
    fn default() -> Self {
        Self {
            default_expiry_days: 30,
            exception_surcharge: 1,
            refund_cutoff_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweeperConfig {
    pub enabled: bool,
    /// How often expired lots are deactivated, e.g. "10m"
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Origins allowed to call the API from a browser; empty allows none
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3001".to_string()],
        }
    }
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        Self::figment(args).extract()
    }

    fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("STUDIOCTL_").split("__"))
    }

    /// Reject configurations that would misbehave at runtime rather than
    /// fail at startup.
    pub fn validate(&self) -> Result<(), Error> {
        if self.credits.default_expiry_days <= 0 {
            return Err(Error::BadRequest {
                message: "credits.default_expiry_days must be positive".to_string(),
            });
        }
        if self.credits.exception_surcharge < 0 {
            return Err(Error::BadRequest {
                message: "credits.exception_surcharge must not be negative".to_string(),
            });
        }
        if self.credits.refund_cutoff_hours <= 0 {
            return Err(Error::BadRequest {
                message: "credits.refund_cutoff_hours must be positive".to_string(),
            });
        }
        if self.sweeper.enabled && self.sweeper.interval.is_zero() {
            return Err(Error::BadRequest {
                message: "sweeper.interval must be non-zero when the sweeper is enabled".to_string(),
            });
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn workflow_settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            timezone: self.timezone,
            exception_surcharge: self.credits.exception_surcharge,
            refund_cutoff_hours: self.credits.refund_cutoff_hours,
            refund_expiry_days: self.credits.default_expiry_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args(path: &str) -> Args {
        Args {
            config: path.to_string(),
            validate: false,
        }
    }

    #[test]
    fn defaults_load_without_a_config_file() {
        Jail::expect_with(|_| {
            let config = Config::load(&args("missing.yaml"))?;
            assert_eq!(config.port, 3000);
            assert_eq!(config.timezone, chrono_tz::America::Mexico_City);
            assert_eq!(config.credits.refund_cutoff_hours, 24);
            assert!(config.validate().is_ok());
            Ok(())
        });
    }

    #[test]
    fn yaml_values_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
                port: 8080
                timezone: "UTC"
                credits:
                  exception_surcharge: 2
                "#,
            )?;
            let config = Config::load(&args("config.yaml"))?;
            assert_eq!(config.port, 8080);
            assert_eq!(config.timezone, chrono_tz::UTC);
            assert_eq!(config.credits.exception_surcharge, 2);
            // Untouched sections keep their defaults.
            assert_eq!(config.credits.default_expiry_days, 30);
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_yaml() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "port: 8080")?;
            jail.set_env("STUDIOCTL_PORT", "9090");
            jail.set_env("STUDIOCTL_SWEEPER__INTERVAL", "\"5m\"");
            let config = Config::load(&args("config.yaml"))?;
            assert_eq!(config.port, 9090);
            assert_eq!(config.sweeper.interval, Duration::from_secs(300));
            Ok(())
        });
    }

    #[test]
    fn validation_rejects_nonsense_credit_settings() {
        let mut config = Config::default();
        config.credits.default_expiry_days = 0;
        assert!(config.validate().is_err());
    }
}
