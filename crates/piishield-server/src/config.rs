//! Server configuration
//!
//! Values come from a YAML or TOML file, then `PIISHIELD_*` environment
//! variables, then CLI flags. The result is validated once at startup into
//! the detection [`Configuration`] shared by every request.

use anyhow::Context;
use piishield_pii::{Configuration, DetectionError, PIIType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub detection: DetectionSettings,

    #[serde(default)]
    pub masking: MaskingSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound for one request, batches included
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_batch_size_limit")]
    pub batch_size_limit: usize,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSettings {
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Type labels or aliases that are never scanned
    #[serde(default)]
    pub disabled_types: Vec<String>,

    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,

    #[serde(default = "default_context_window")]
    pub context_window: usize,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct MaskingSettings {
    /// Type label to strategy name, e.g. `EMAIL: FULL`
    #[serde(default)]
    pub strategies: BTreeMap<String, String>,

    /// Type label to number of characters left visible by partial masking
    #[serde(default)]
    pub partial_visible: BTreeMap<String, usize>,

    #[serde(default = "default_hash_length")]
    pub hash_length: usize,

    #[serde(default, skip_serializing)]
    pub hash_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of the human-readable format
    #[serde(default)]
    pub json: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
            batch_size_limit: default_batch_size_limit(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            disabled_types: Vec::new(),
            max_text_length: default_max_text_length(),
            context_window: default_context_window(),
        }
    }
}

impl Default for MaskingSettings {
    fn default() -> Self {
        Self {
            strategies: BTreeMap::new(),
            partial_visible: BTreeMap::new(),
            hash_length: default_hash_length(),
            hash_secret: None,
        }
    }
}

impl fmt::Debug for MaskingSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaskingSettings")
            .field("strategies", &self.strategies)
            .field("partial_visible", &self.partial_visible)
            .field("hash_length", &self.hash_length)
            .field("hash_secret", &self.hash_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)
                .with_context(|| format!("Invalid TOML in {}", path.display()))?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Invalid YAML in {}", path.display()))?
        };

        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("PIISHIELD_HOST") {
            self.server.host = val;
        }

        if let Ok(val) = std::env::var("PIISHIELD_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => eprintln!("Warning: Invalid PIISHIELD_PORT '{}', ignoring", val),
            }
        }

        if let Ok(val) = std::env::var("PIISHIELD_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Ok(val) = std::env::var("PIISHIELD_CONFIDENCE_THRESHOLD") {
            match val.parse::<f32>() {
                Ok(threshold) => self.detection.confidence_threshold = threshold,
                Err(_) => eprintln!(
                    "Warning: Invalid PIISHIELD_CONFIDENCE_THRESHOLD '{}', ignoring",
                    val
                ),
            }
        }

        if let Ok(val) = std::env::var("PIISHIELD_MAX_TEXT_LENGTH") {
            match val.parse::<usize>() {
                Ok(max) => self.detection.max_text_length = max,
                Err(_) => eprintln!(
                    "Warning: Invalid PIISHIELD_MAX_TEXT_LENGTH '{}', ignoring",
                    val
                ),
            }
        }

        if let Ok(val) = std::env::var("PIISHIELD_HASH_SECRET")
            && !val.is_empty()
        {
            self.masking.hash_secret = Some(val);
        }
    }

    /// Build and validate the detection configuration
    pub fn to_detection_config(&self) -> Result<Configuration, DetectionError> {
        let mut config = Configuration::default()
            .with_threshold(self.detection.confidence_threshold)
            .with_max_text_length(self.detection.max_text_length)
            .with_context_window(self.detection.context_window)
            .with_hash_length(self.masking.hash_length);

        for name in &self.detection.disabled_types {
            config = config.with_disabled(name.parse::<PIIType>()?);
        }

        for (pii_type, strategy) in &self.masking.strategies {
            config = config.with_named_strategy(pii_type, strategy)?;
        }

        for (pii_type, visible) in &self.masking.partial_visible {
            config = config.with_partial_visible(pii_type.parse()?, *visible);
        }

        if let Some(secret) = &self.masking.hash_secret {
            config = config.with_hash_secret(secret.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_batch_size_limit() -> usize {
    100
}

fn default_max_body_bytes() -> usize {
    8 * 1024 * 1024
}

fn default_confidence_threshold() -> f32 {
    piishield_pii::config::DEFAULT_CONFIDENCE_THRESHOLD
}

fn default_max_text_length() -> usize {
    piishield_pii::config::DEFAULT_MAX_TEXT_LENGTH
}

fn default_context_window() -> usize {
    piishield_pii::config::DEFAULT_CONTEXT_WINDOW
}

fn default_hash_length() -> usize {
    piishield_pii::config::DEFAULT_HASH_LENGTH
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use piishield_pii::MaskingStrategy;
    use serial_test::serial;
    use std::io::Write;

    fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn clear_env() {
        for key in [
            "PIISHIELD_HOST",
            "PIISHIELD_PORT",
            "PIISHIELD_LOG_LEVEL",
            "PIISHIELD_CONFIDENCE_THRESHOLD",
            "PIISHIELD_MAX_TEXT_LENGTH",
            "PIISHIELD_HASH_SECRET",
        ] {
            unsafe {
                std::env::remove_var(key);
            }
        }
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.server.batch_size_limit, 100);
        assert_eq!(config.detection.confidence_threshold, 0.7);
        assert_eq!(config.logging.level, "info");

        let detection = config.to_detection_config().unwrap();
        assert_eq!(detection.max_text_length, 1_000_000);
    }

    #[test]
    fn test_from_yaml() {
        let file = write_config(
            ".yaml",
            r#"
server:
  port: 9100
  batch_size_limit: 10
detection:
  confidence_threshold: 0.85
  disabled_types: [person_name, "address"]
masking:
  strategies:
    EMAIL: full
    SSN: hash
  partial_visible:
    CREDIT_CARD: 6
logging:
  json: true
"#,
        );

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.logging.json);

        let detection = config.to_detection_config().unwrap();
        assert_eq!(detection.confidence_threshold, 0.85);
        assert!(!detection.is_enabled(PIIType::PersonName));
        assert!(!detection.is_enabled(PIIType::Address));
        assert_eq!(detection.strategy_override(PIIType::Email), Some(MaskingStrategy::Full));
        assert_eq!(detection.strategy_override(PIIType::SSN), Some(MaskingStrategy::Hash));
        assert_eq!(detection.partial_visible_for(PIIType::CreditCard), 6);
    }

    #[test]
    fn test_from_toml() {
        let file = write_config(
            ".toml",
            r#"
[server]
host = "0.0.0.0"
request_timeout_secs = 5

[masking]
hash_length = 16
hash_secret = "pepper"
"#,
        );

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.request_timeout_secs, 5);
        assert_eq!(config.masking.hash_length, 16);

        let detection = config.to_detection_config().unwrap();
        assert_eq!(detection.hash_secret.as_deref(), Some("pepper"));
    }

    #[test]
    fn test_missing_file() {
        let err = ServerConfig::from_file("/nonexistent/piishield.yaml").unwrap_err();
        assert!(err.to_string().contains("piishield.yaml"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = ServerConfig::default();
        config.masking.strategies.insert("EMAIL".to_string(), "scramble".to_string());
        assert!(matches!(
            config.to_detection_config(),
            Err(DetectionError::InvalidConfiguration(_))
        ));

        let mut config = ServerConfig::default();
        config.detection.disabled_types.push("FAX_NUMBER".to_string());
        assert!(config.to_detection_config().is_err());

        let mut config = ServerConfig::default();
        config.detection.confidence_threshold = 1.5;
        assert!(config.to_detection_config().is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let mut config = ServerConfig::default();
        config.masking.hash_secret = Some("pepper".to_string());
        let debug = format!("{:?}", config);
        assert!(!debug.contains("pepper"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    #[serial]
    fn test_merge_env() {
        clear_env();
        unsafe {
            std::env::set_var("PIISHIELD_PORT", "9200");
            std::env::set_var("PIISHIELD_CONFIDENCE_THRESHOLD", "0.9");
            std::env::set_var("PIISHIELD_MAX_TEXT_LENGTH", "2048");
            std::env::set_var("PIISHIELD_HASH_SECRET", "from-env");
        }

        let mut config = ServerConfig::default();
        config.merge_env();
        clear_env();

        assert_eq!(config.server.port, 9200);
        assert_eq!(config.detection.confidence_threshold, 0.9);
        assert_eq!(config.detection.max_text_length, 2048);
        assert_eq!(config.masking.hash_secret.as_deref(), Some("from-env"));
    }

    #[test]
    #[serial]
    fn test_merge_env_ignores_unparseable() {
        clear_env();
        unsafe {
            std::env::set_var("PIISHIELD_PORT", "not-a-port");
            std::env::set_var("PIISHIELD_LOG_LEVEL", "debug");
        }

        let mut config = ServerConfig::default();
        config.merge_env();
        clear_env();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.logging.level, "debug");
    }
}
