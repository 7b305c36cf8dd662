//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ObservatoryConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ObservatoryConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ObservatoryConfig, ConfigError> {
    let config: ObservatoryConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetConfig;
    use crate::selection::SwitchMargin;

    const FULL: &str = r#"
        [probe]
        interval_ms = 2000
        timeout_ms = 1500
        concurrency = 4

        [classifier]
        failure_threshold = 3
        quality_ceiling_ms = 800

        [selector]
        switch_margin = { relative = 0.1 }

        [[candidates]]
        tag = "proxy-a"
        target = { kind = "tcp", address = "10.0.0.1:443" }

        [[candidates]]
        tag = "proxy-b"
        target = { kind = "http" }

        [[candidates]]
        tag = "proxy-c"
        target = { kind = "proxy", proxy = "socks5h://10.0.0.2:1080" }
    "#;

    #[test]
    fn parses_full_config() {
        let config = parse_config(FULL).unwrap();
        assert_eq!(config.probe.interval_ms, 2000);
        assert_eq!(config.probe.jitter_ratio, 0.1);
        assert_eq!(config.classifier.failure_threshold, 3);
        assert_eq!(config.selector.switch_margin, SwitchMargin::Relative(0.1));
        assert_eq!(config.drain.grace_secs, 10);
        assert_eq!(config.candidates.len(), 3);
        assert_eq!(
            config.candidates[1].target,
            TargetConfig::Http { url: "https://www.gstatic.com/generate_204".into() }
        );
        assert_eq!(
            config.candidates[2].target,
            TargetConfig::Proxy {
                proxy: "socks5h://10.0.0.2:1080".into(),
                url: "https://www.gstatic.com/generate_204".into(),
            }
        );
    }

    #[test]
    fn required_sections_have_no_defaults() {
        let missing = r#"
            [selector]
            switch_margin = { absolute_ms = 20 }
        "#;
        assert!(matches!(parse_config(missing), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn semantic_errors_are_collected() {
        let bad = r#"
            [probe]
            concurrency = 0

            [classifier]
            failure_threshold = 0
            quality_ceiling_ms = 100

            [selector]
            switch_margin = { relative = 0.1 }
        "#;
        match parse_config(bad) {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = load_config(Path::new("/nonexistent/observatory.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
