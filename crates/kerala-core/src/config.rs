//! Configuration management for the Kerala Travel admin

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment prefix for configuration overrides (`KERALA_ADMIN__API__BASE_URL`)
pub const ENV_PREFIX: &str = "KERALA_ADMIN";

/// Environment variable that overrides the backend base URL directly
pub const BACKEND_URL_ENV: &str = "KERALA_BACKEND_URL";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Image upload limits
    #[serde(default)]
    pub uploads: UploadConfig,

    /// Session persistence
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the backend; image references are resolved against it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Optional API key sent as `X-API-Key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Image upload limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Ceiling for gallery and about images, in bytes
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,

    /// Ceiling for banner images, in bytes
    #[serde(default = "default_banner_max_image_bytes")]
    pub banner_max_image_bytes: u64,

    /// Accepted file extensions
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

/// Session persistence configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session file location; defaults to the platform data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json or pretty)
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log to file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

// Default value functions
fn default_base_url() -> String {
    std::env::var(BACKEND_URL_ENV).unwrap_or_else(|_| "http://localhost:5000".to_string())
}

const fn default_request_timeout() -> u64 {
    30
}

const fn default_max_image_bytes() -> u64 {
    5 * 1024 * 1024
}

const fn default_banner_max_image_bytes() -> u64 {
    15 * 1024 * 1024
}

fn default_allowed_extensions() -> Vec<String> {
    vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            api_key: None,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: default_max_image_bytes(),
            banner_max_image_bytes: default_banner_max_image_bytes(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration: an optional `kerala-admin` file in the working
    /// directory, then `path` if given, then `KERALA_ADMIN__*` variables
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or malformed.
    pub fn load_from(path: Option<&Path>) -> crate::Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("kerala-admin").required(false));

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let mut loaded: Self = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Parse a TOML document into a configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML for this schema.
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()?;

        let mut loaded: Self = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Check values and normalise the base URL
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unusable base URL, zero limits or
    /// an unknown log format.
    pub fn validate(&mut self) -> crate::Result<()> {
        let trimmed = self.api.base_url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(crate::Error::Configuration {
                message: format!("api.base_url must be an http(s) URL, got '{}'", self.api.base_url),
            });
        }
        self.api.base_url = trimmed.to_string();

        if self.uploads.max_image_bytes == 0 || self.uploads.banner_max_image_bytes == 0 {
            return Err(crate::Error::Configuration {
                message: "upload size ceilings must be greater than zero".to_string(),
            });
        }

        if self.uploads.allowed_extensions.is_empty() {
            return Err(crate::Error::Configuration {
                message: "uploads.allowed_extensions must not be empty".to_string(),
            });
        }

        let format = self.logging.format.trim().to_ascii_lowercase();
        if !matches!(format.as_str(), "json" | "pretty") {
            return Err(crate::Error::Configuration {
                message: format!(
                    "logging.format must be 'json' or 'pretty', got '{}'",
                    self.logging.format
                ),
            });
        }
        self.logging.format = format;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert!(config.api.base_url.starts_with("http"));
        assert_eq!(config.api.request_timeout_secs, 30);
        assert!(config.api.api_key.is_none());

        assert_eq!(config.uploads.max_image_bytes, 5_242_880);
        assert_eq!(config.uploads.banner_max_image_bytes, 15_728_640);
        assert_eq!(config.uploads.allowed_extensions, vec!["jpg", "jpeg", "png"]);

        assert!(config.session.path.is_none());

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_partial_config_deserialization() {
        let json_str = r#"{
            "api": {"base_url": "https://api.keralatravel.example"},
            "uploads": {"max_image_bytes": 1024}
        }"#;

        let config: Config = serde_json::from_str(json_str).unwrap();

        assert_eq!(config.api.base_url, "https://api.keralatravel.example");
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.uploads.max_image_bytes, 1024);
        assert_eq!(config.uploads.banner_max_image_bytes, 15_728_640);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_toml_trims_trailing_slash() {
        let config = Config::from_toml(
            r#"
            [api]
            base_url = "http://127.0.0.1:5000/"
            api_key = "secret"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.api.api_key.as_deref(), Some("secret"));
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_validate_rejects_non_http_base_url() {
        let err = Config::from_toml(
            r#"
            [api]
            base_url = "ftp://files.example"
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, crate::Error::Configuration { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_ceiling() {
        let mut config = Config::default();
        config.uploads.max_image_bytes = 0;

        assert!(config.validate().is_err());
    }

    #[rstest]
    #[case("json", "json")]
    #[case(" Pretty ", "pretty")]
    fn test_validate_normalises_log_format(#[case] raw: &str, #[case] expected: &str) {
        let mut config = Config::default();
        config.logging.format = raw.to_string();

        config.validate().unwrap();
        assert_eq!(config.logging.format, expected);
    }

    #[rstest]
    #[case("")]
    #[case("compact")]
    #[case("yaml")]
    fn test_validate_rejects_unknown_log_format(#[case] raw: &str) {
        let mut config = Config::default();
        config.logging.format = raw.to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.format"));
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admin.toml");
        std::fs::write(
            &path,
            "[api]\nbase_url = \"https://backend.example/\"\nrequest_timeout_secs = 5\n",
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();

        assert_eq!(config.api.base_url, "https://backend.example");
        assert_eq!(config.api.request_timeout_secs, 5);
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        assert!(Config::load_from(Some(&path)).is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();

        let serialized = serde_json::to_string(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&serialized).unwrap();

        assert_eq!(deserialized.api.base_url, config.api.base_url);
        assert_eq!(
            deserialized.uploads.max_image_bytes,
            config.uploads.max_image_bytes
        );
        assert!(!serialized.contains("api_key"));
    }
}
