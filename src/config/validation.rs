//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, thresholds > 0, ratios in range)
//! - Keep the probe timeout below the interval and the quality ceiling within the timeout
//! - Check candidate tags are unique and targets parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ObservatoryConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::ObservatoryConfig;
use crate::selection::SwitchMargin;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ObservatoryConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let probe = &config.probe;
    if probe.interval_ms == 0 {
        errors.push(ValidationError::new("probe.interval_ms", "must be greater than 0"));
    }
    if probe.timeout_ms == 0 {
        errors.push(ValidationError::new("probe.timeout_ms", "must be greater than 0"));
    } else if probe.interval_ms > 0 && probe.timeout_ms >= probe.interval_ms {
        errors.push(ValidationError::new("probe.timeout_ms", "must be less than probe.interval_ms"));
    }
    if probe.concurrency == 0 {
        errors.push(ValidationError::new("probe.concurrency", "must be greater than 0"));
    }
    if !(0.0..1.0).contains(&probe.jitter_ratio) {
        errors.push(ValidationError::new("probe.jitter_ratio", "must be in [0, 1)"));
    }

    let classifier = &config.classifier;
    if classifier.failure_threshold == 0 {
        errors.push(ValidationError::new("classifier.failure_threshold", "must be greater than 0"));
    }
    if classifier.quality_ceiling_ms == 0 {
        errors.push(ValidationError::new("classifier.quality_ceiling_ms", "must be greater than 0"));
    } else if classifier.quality_ceiling_ms > probe.timeout_ms {
        errors.push(ValidationError::new(
            "classifier.quality_ceiling_ms",
            "must not exceed probe.timeout_ms",
        ));
    }

    if let SwitchMargin::Relative(ratio) = config.selector.switch_margin {
        if !(0.0..1.0).contains(&ratio) {
            errors.push(ValidationError::new("selector.switch_margin.relative", "must be in [0, 1)"));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<std::net::SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "must be a socket address"));
    }

    let mut seen = HashSet::new();
    for (i, candidate) in config.candidates.iter().enumerate() {
        let field = format!("candidates[{}]", i);
        if candidate.tag.trim().is_empty() {
            errors.push(ValidationError::new(format!("{}.tag", field), "must not be empty"));
        } else if !seen.insert(candidate.tag.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.tag", field),
                format!("duplicate tag '{}'", candidate.tag),
            ));
        }
        if let Err(e) = candidate.target.check() {
            errors.push(ValidationError::new(format!("{}.target", field), e.to_string()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CandidateConfig, ClassifierConfig, SelectorConfig, TargetConfig};

    fn base() -> ObservatoryConfig {
        ObservatoryConfig::new(
            ClassifierConfig { failure_threshold: 3, quality_ceiling_ms: 1000 },
            SelectorConfig { switch_margin: SwitchMargin::Relative(0.1) },
        )
    }

    fn tcp(tag: &str, address: &str) -> CandidateConfig {
        CandidateConfig {
            tag: tag.into(),
            target: TargetConfig::Tcp { address: address.into() },
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&base()).is_ok());
    }

    #[test]
    fn rejects_duplicate_and_malformed_candidates() {
        let mut config = base();
        config.candidates = vec![
            tcp("a", "10.0.0.1:443"),
            tcp("a", "10.0.0.2:443"),
            tcp("", "10.0.0.3:443"),
            tcp("b", "not-an-address"),
        ];

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["candidates[1].tag", "candidates[2].tag", "candidates[3].target"]);
    }

    #[test]
    fn ceiling_must_fit_in_timeout() {
        let mut config = base();
        config.classifier.quality_ceiling_ms = config.probe.timeout_ms + 1;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "classifier.quality_ceiling_ms");
    }

    #[test]
    fn timeout_must_be_shorter_than_interval() {
        let mut config = base();
        config.probe.timeout_ms = config.probe.interval_ms;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "probe.timeout_ms");
        assert_eq!(errors[0].message, "must be less than probe.interval_ms");

        config.probe.interval_ms = 1_000;
        config.probe.timeout_ms = 2_000;
        assert!(validate_config(&config).is_err());

        config.probe.timeout_ms = 999;
        config.classifier.quality_ceiling_ms = 500;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn relative_margin_range() {
        let mut config = base();
        config.selector.switch_margin = SwitchMargin::Relative(1.5);
        assert!(validate_config(&config).is_err());

        config.selector.switch_margin = SwitchMargin::AbsoluteMs(0);
        assert!(validate_config(&config).is_ok());
    }
}
