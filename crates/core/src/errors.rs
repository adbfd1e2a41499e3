//! Error types for the pinsync core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.
//!
//! The split mirrors the run-control policy: [`DirectoryError`] is always
//! per-record (the runner converts it into a ledger entry and continues),
//! while [`LedgerError`], [`InputError`] and [`ConfigError`] terminate the
//! run.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Directory service errors
// ---------------------------------------------------------------------------

/// Errors from the remote directory REST API.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// HTTP-level transport error (connection, TLS, DNS, timeout).
    #[error("directory HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned an error status code (>= 400).
    #[error("directory API error (HTTP {status}): {body}")]
    Api {
        status: u16,
        body: String,
    },

    /// The PIN update returned a 2xx status other than the 204 the endpoint
    /// contract specifies.
    #[error("unexpected status {status} from PIN update (expected 204)")]
    UnexpectedStatus {
        status: u16,
    },

    /// An alias lookup matched more than one account and the ambiguity
    /// policy is set to reject multi-matches.
    #[error("alias '{alias}' matched {count} accounts")]
    AmbiguousAlias {
        alias: String,
        count: usize,
    },

    /// The configured host does not form a valid request URL.
    #[error("invalid directory host '{host}': {detail}")]
    InvalidHost {
        host: String,
        detail: String,
    },

    /// The configured CA certificate could not be loaded.
    #[error("failed to load CA certificate '{path}': {detail}")]
    TlsSetup {
        path: String,
        detail: String,
    },

    /// JSON deserialization failure on a lookup response.
    #[error("directory response parse error: {0}")]
    ParseError(String),
}

// ---------------------------------------------------------------------------
// Ledger errors
// ---------------------------------------------------------------------------

/// Errors from the append-only outcome ledger.
///
/// Any of these is fatal to a run: once an outcome cannot be recorded the
/// ledger can no longer be trusted as an audit trail.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// CSV serialization / write failure.
    #[error("ledger write error: {0}")]
    CsvError(#[from] csv::Error),

    /// Generic I/O wrapper (open, flush, sync).
    #[error("ledger I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Input errors
// ---------------------------------------------------------------------------

/// Errors reading the input record file.
#[derive(Debug, Error)]
pub enum InputError {
    /// Input file not found.
    #[error("input file not found: {0}")]
    FileNotFound(String),

    /// CSV parse failure.
    #[error("input parse error: {0}")]
    CsvError(#[from] csv::Error),

    /// Generic I/O wrapper.
    #[error("input I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A required environment variable is not set.
    #[error("required environment variable '{var}' is not set (referenced by config field '{field}')")]
    EnvVarMissing {
        var: String,
        field: String,
    },

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = DirectoryError::Api {
            status: 403,
            body: "permission denied".into(),
        };
        assert_eq!(
            err.to_string(),
            "directory API error (HTTP 403): permission denied"
        );

        let err = DirectoryError::UnexpectedStatus { status: 200 };
        assert!(err.to_string().contains("expected 204"));

        let err = DirectoryError::AmbiguousAlias {
            alias: "jsmith".into(),
            count: 3,
        };
        assert_eq!(err.to_string(), "alias 'jsmith' matched 3 accounts");

        let err = ConfigError::EnvVarMissing {
            var: "PINSYNC_PASSWORD".into(),
            field: "directory.password_env".into(),
        };
        assert!(err.to_string().contains("PINSYNC_PASSWORD"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let dir_err = DirectoryError::UnexpectedStatus { status: 201 };
        let core_err: CoreError = dir_err.into();
        assert!(matches!(core_err, CoreError::Directory(_)));

        let cfg_err = ConfigError::FileNotFound("/etc/pinsync.toml".into());
        let core_err: CoreError = cfg_err.into();
        assert!(matches!(core_err, CoreError::Config(_)));
    }
}
