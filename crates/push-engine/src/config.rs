//! Configuration loading and validation for the push engine.
//!
//! Values are read from environment variables. Everything has a default, so an
//! empty environment yields a usable configuration for local testing.

use anyhow::{Context, Result};
use common::protocol::Urgency;
use serde::Deserialize;

/// Validated push engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Contact URI placed in the VAPID `sub` claim (`mailto:` or `https:` URL).
    #[serde(default = "default_vapid_subject")]
    pub vapid_subject: String,

    /// How long (seconds) the push service should retain an undelivered message.
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,

    /// Delivery urgency hint sent in the `Urgency` header.
    #[serde(default)]
    pub urgency: Urgency,

    /// Per-request timeout (seconds) for the HTTP transport.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// OTLP collector endpoint. Traces are only exported when set.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,
}

fn default_vapid_subject() -> String {
    "http://localhost:5500/docs".into()
}
fn default_ttl() -> u64 {
    2_419_200
}
fn default_request_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vapid_subject: default_vapid_subject(),
            ttl_secs: default_ttl(),
            urgency: Urgency::default(),
            request_timeout_secs: default_request_timeout(),
            log_level: default_log_level(),
            otel_exporter_otlp_endpoint: None,
        }
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    pub fn validate(&self) -> Result<()> {
        let subject = self.vapid_subject.trim();
        if subject.is_empty() {
            anyhow::bail!("VAPID_SUBJECT is required and must not be empty");
        }
        if !["mailto:", "http://", "https://"]
            .iter()
            .any(|scheme| subject.starts_with(scheme))
        {
            anyhow::bail!("VAPID_SUBJECT must be a mailto: or http(s):// URI");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be > 0");
        }
        if let Some(endpoint) = &self.otel_exporter_otlp_endpoint {
            if endpoint.trim().is_empty() {
                anyhow::bail!("OTEL_EXPORTER_OTLP_ENDPOINT must not be empty when set");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let cfg = Config::default();
        assert_eq!(cfg.vapid_subject, "http://localhost:5500/docs");
        assert_eq!(cfg.ttl_secs, 2_419_200);
        assert_eq!(cfg.urgency, Urgency::Normal);
        assert_eq!(cfg.request_timeout_secs, 30);
        assert_eq!(cfg.log_level, "info");
        assert!(cfg.otel_exporter_otlp_endpoint.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_accepts_mailto_subject() {
        let cfg = Config {
            vapid_subject: "mailto:ops@example.com".into(),
            ..Config::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_subject() {
        let cfg = Config {
            vapid_subject: "  ".into(),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_bare_subject() {
        let cfg = Config {
            vapid_subject: "ops@example.com".into(),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let cfg = Config {
            request_timeout_secs: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_otlp_endpoint() {
        let cfg = Config {
            otel_exporter_otlp_endpoint: Some(String::new()),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }
}
