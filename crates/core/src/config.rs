//! TOML-based configuration system for pinsync.
//!
//! The basic-auth password is never stored in the file itself: the
//! `password_env` field names an environment variable, resolved at runtime
//! via [`AppConfig::resolve_env_vars`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote directory connection settings.
    pub directory: DirectoryConfig,

    /// Batch run settings.
    #[serde(default)]
    pub run: RunConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// Connection settings for the directory's `/vmrest` API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Directory hostname (e.g. `cuc1.example.com`).
    pub host: String,

    /// Basic-auth username for the admin API.
    pub username: String,

    /// Environment variable holding the basic-auth password.
    pub password_env: String,

    /// Path to a PEM CA bundle used to verify the server certificate.
    /// When unset, certificate verification is disabled entirely.
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,

    /// Per-call HTTP timeout in seconds (default 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How to handle an alias lookup that matches multiple accounts.
    #[serde(default)]
    pub on_ambiguous: AmbiguityPolicy,

    /// Resolved password (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub password: Option<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Policy for an alias lookup that returns more than one account.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AmbiguityPolicy {
    /// Take the first match.
    #[default]
    First,
    /// Treat a multi-match as a per-record failure.
    Error,
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// How a re-run treats aliases already present in the ledger.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ResumeMode {
    /// Re-process every input record; the ledger simply accumulates.
    #[default]
    Append,
    /// Skip records whose alias is already marked `success` in the ledger.
    SkipSuccesses,
}

/// Batch run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Input CSV file with `alias` and `new_pin` columns.
    #[serde(default = "default_input_file")]
    pub input_file: PathBuf,

    /// Output ledger CSV file. Created with a header row on first use,
    /// appended to forever after.
    #[serde(default = "default_ledger_file")]
    pub ledger_file: PathBuf,

    /// Fixed delay between records in milliseconds (default 1000).
    #[serde(default = "default_pacing_millis")]
    pub pacing_millis: u64,

    /// Resume behavior against a pre-existing ledger.
    #[serde(default)]
    pub resume: ResumeMode,
}

fn default_input_file() -> PathBuf {
    PathBuf::from("users.csv")
}
fn default_ledger_file() -> PathBuf {
    PathBuf::from("processed_users.csv")
}
fn default_pacing_millis() -> u64 {
    1000
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_file: default_input_file(),
            ledger_file: default_ledger_file(),
            pacing_millis: default_pacing_millis(),
            resume: ResumeMode::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// When true, the file sink logs at debug level, including full
    /// request/response bodies for every directory call.
    #[serde(default)]
    pub debug: bool,

    /// Directory for the rolling log file (default `logs`).
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_dir: default_log_dir(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve the `password_env` reference from the environment.
    ///
    /// A missing variable logs a warning but does not fail here;
    /// [`validate`](Self::validate) rejects a config whose password never
    /// resolved, so the run still stops before any record is processed.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        self.directory.password = resolve_optional_env(
            &self.directory.password_env,
            "directory.password_env",
        );
        Ok(())
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.directory.host.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "directory.host".into(),
                detail: "directory host must not be empty".into(),
            });
        }
        if self.directory.username.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "directory.username".into(),
                detail: "directory username must not be empty".into(),
            });
        }
        if self.directory.password.is_none() {
            return Err(ConfigError::EnvVarMissing {
                var: self.directory.password_env.clone(),
                field: "directory.password_env".into(),
            });
        }
        if self.directory.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "directory.timeout_secs".into(),
                detail: "timeout must be > 0".into(),
            });
        }
        if let Some(ref cert) = self.directory.ca_cert {
            if !cert.exists() {
                return Err(ConfigError::InvalidValue {
                    field: "directory.ca_cert".into(),
                    detail: format!("certificate file not found: {}", cert.display()),
                });
            }
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_toml() -> &'static str {
        r#"
[directory]
host = "cuc1.example.com"
username = "pinadmin"
password_env = "PINSYNC_PASSWORD"
timeout_secs = 15
on_ambiguous = "error"

[run]
input_file = "accounts.csv"
ledger_file = "outcomes.csv"
pacing_millis = 250
resume = "skip-successes"

[logging]
debug = true
log_dir = "/var/log/pinsync"
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config: AppConfig = toml::from_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.directory.host, "cuc1.example.com");
        assert_eq!(config.directory.timeout_secs, 15);
        assert_eq!(config.directory.on_ambiguous, AmbiguityPolicy::Error);
        assert_eq!(config.run.pacing_millis, 250);
        assert_eq!(config.run.resume, ResumeMode::SkipSuccesses);
        assert!(config.logging.debug);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pinsync.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_toml().as_bytes()).unwrap();

        let config = AppConfig::load_from_file(&path).expect("load_from_file failed");
        assert_eq!(config.run.input_file, PathBuf::from("accounts.csv"));
    }

    #[test]
    fn test_file_not_found() {
        let result = AppConfig::load_from_file("/nonexistent/pinsync.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_validate_rejects_empty_host() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.directory.host = String::new();
        config.directory.password = Some("secret".into());
        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "directory.host"
        ));
    }

    #[test]
    fn test_validate_requires_resolved_password() {
        let config: AppConfig = toml::from_str(sample_toml()).unwrap();
        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::EnvVarMissing { ref var, .. }) if var == "PINSYNC_PASSWORD"
        ));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.directory.password = Some("secret".into());
        config.directory.timeout_secs = 0;
        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "directory.timeout_secs"
        ));
    }

    #[test]
    fn test_resolve_env_vars() {
        std::env::set_var("TEST_PINSYNC_PW", "s3cret");

        let toml_str = r#"
[directory]
host = "cuc1.example.com"
username = "pinadmin"
password_env = "TEST_PINSYNC_PW"
"#;
        let mut config: AppConfig = toml::from_str(toml_str).unwrap();
        config.resolve_env_vars().unwrap();

        assert_eq!(config.directory.password.as_deref(), Some("s3cret"));

        // Clean up
        std::env::remove_var("TEST_PINSYNC_PW");
    }

    #[test]
    fn test_defaults() {
        let minimal = r#"
[directory]
host = "cuc1.example.com"
username = "pinadmin"
password_env = "PINSYNC_PASSWORD"
"#;
        let config: AppConfig = toml::from_str(minimal).unwrap();
        assert_eq!(config.directory.timeout_secs, 30);
        assert_eq!(config.directory.on_ambiguous, AmbiguityPolicy::First);
        assert_eq!(config.run.input_file, PathBuf::from("users.csv"));
        assert_eq!(config.run.ledger_file, PathBuf::from("processed_users.csv"));
        assert_eq!(config.run.pacing_millis, 1000);
        assert_eq!(config.run.resume, ResumeMode::Append);
        assert!(!config.logging.debug);
        assert_eq!(config.logging.log_dir, PathBuf::from("logs"));
    }
}
