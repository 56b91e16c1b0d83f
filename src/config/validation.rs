//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate listener addresses and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FrontConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::FrontConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: {value:?} is not a host:port address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("listener and control plane cannot share {0}")]
    SharedAddress(String),

    #[error("health_check.interval_secs must be greater than zero")]
    ZeroInterval,

    #[error("health_check.path must start with '/', got {0:?}")]
    InvalidProbePath(String),
}

/// Check a parsed configuration.
pub fn validate_config(config: &FrontConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let listener = check_address(
        "listener.bind_address",
        &config.listener.bind_address,
        &mut errors,
    );
    let control = check_address(
        "control.bind_address",
        &config.control.bind_address,
        &mut errors,
    );
    if let (Some(listener), Some(control)) = (listener, control) {
        // Port 0 asks the OS for a fresh port, so two of them never clash.
        if listener == control && listener.port() != 0 {
            errors.push(ValidationError::SharedAddress(listener.to_string()));
        }
    }

    if config.health_check.interval_secs == 0 {
        errors.push(ValidationError::ZeroInterval);
    }
    if !config.health_check.path.starts_with('/') {
        errors.push(ValidationError::InvalidProbePath(
            config.health_check.path.clone(),
        ));
    }

    if config.observability.metrics_enabled {
        check_address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(
    field: &'static str,
    value: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<SocketAddr> {
    match value.parse() {
        Ok(addr) => Some(addr),
        Err(_) => {
            errors.push(ValidationError::InvalidAddress {
                field,
                value: value.to_string(),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&FrontConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = FrontConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.health_check.interval_secs = 0;
        config.health_check.path = "ping".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidAddress {
                    field: "listener.bind_address",
                    value: "nowhere".into(),
                },
                ValidationError::ZeroInterval,
                ValidationError::InvalidProbePath("ping".into()),
            ]
        );
    }

    #[test]
    fn test_listeners_must_differ() {
        let mut config = FrontConfig::default();
        config.listener.bind_address = "127.0.0.1:7000".into();
        config.control.bind_address = "127.0.0.1:7000".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::SharedAddress("127.0.0.1:7000".into())]);
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = FrontConfig::default();
        config.observability.metrics_address = "bogus".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
