//! Directory `/vmrest` REST API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Certificate, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::config::{AmbiguityPolicy, DirectoryConfig};
use crate::errors::DirectoryError;

// ---------------------------------------------------------------------------
// API trait
// ---------------------------------------------------------------------------

/// The two remote operations the batch runner drives.
///
/// Both are stateless and independently fallible; neither retries. The
/// runner decides what a failure means for the record.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// Resolve an alias to the account's internal identifier.
    ///
    /// `Ok(None)` means the directory has no matching account -- a normal
    /// outcome, not an error.
    async fn resolve_alias(&self, alias: &str) -> Result<Option<String>, DirectoryError>;

    /// Set the PIN credential on the account with the given identifier.
    ///
    /// Success is signalled exclusively by HTTP 204. Not idempotent-safe to
    /// blindly retry: no read-after-write verification is performed.
    async fn update_pin(&self, object_id: &str, new_pin: &str) -> Result<(), DirectoryError>;
}

// ---------------------------------------------------------------------------
// Response models
// ---------------------------------------------------------------------------

/// Body of a `GET /vmrest/users?query=...` response. A directory with no
/// match omits the `User` key entirely; a single match may arrive as a bare
/// object rather than a one-element array.
#[derive(Debug, Deserialize)]
struct UserSearchResponse {
    #[serde(rename = "User")]
    user: Option<UserMatches>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UserMatches {
    One(UserRecord),
    Many(Vec<UserRecord>),
}

#[derive(Debug, Deserialize)]
struct UserRecord {
    #[serde(rename = "ObjectId")]
    object_id: String,
}

/// Pick the identifier out of a lookup response under the configured
/// multi-match policy.
fn select_object_id(
    response: UserSearchResponse,
    alias: &str,
    policy: AmbiguityPolicy,
) -> Result<Option<String>, DirectoryError> {
    let matches = match response.user {
        None => return Ok(None),
        Some(UserMatches::One(user)) => vec![user],
        Some(UserMatches::Many(users)) => users,
    };

    if matches.len() > 1 {
        match policy {
            AmbiguityPolicy::Error => {
                return Err(DirectoryError::AmbiguousAlias {
                    alias: alias.to_string(),
                    count: matches.len(),
                })
            }
            AmbiguityPolicy::First => {
                warn!(
                    alias,
                    count = matches.len(),
                    "alias matched multiple accounts, taking the first"
                );
            }
        }
    }

    Ok(matches.into_iter().next().map(|u| u.object_id))
}

/// Build the lookup URL for an alias.
///
/// The query grammar reserves the parentheses, so the query is installed
/// via `set_query`, which escapes the alias content (spaces and friends)
/// without touching them.
fn lookup_url(users_url: &Url, alias: &str) -> Url {
    let mut url = users_url.clone();
    url.set_query(Some(&format!("query=(alias is {})", alias)));
    url
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Authenticated HTTPS client for the directory's admin REST API.
#[derive(Clone)]
pub struct DirectoryClient {
    http: reqwest::Client,
    users_url: Url,
    username: String,
    password: String,
    ambiguity: AmbiguityPolicy,
}

impl DirectoryClient {
    /// Build a client from connection settings. Authentication and TLS
    /// trust are fixed here and applied uniformly to every call.
    pub fn new(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        let users_url = Url::parse(&format!("https://{}/vmrest/users", config.host))
            .map_err(|e| DirectoryError::InvalidHost {
                host: config.host.clone(),
                detail: e.to_string(),
            })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("pinsync/0.1"));

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs));

        builder = match &config.ca_cert {
            Some(path) => {
                let pem = std::fs::read(path).map_err(|e| DirectoryError::TlsSetup {
                    path: path.display().to_string(),
                    detail: e.to_string(),
                })?;
                let cert = Certificate::from_pem(&pem).map_err(|e| DirectoryError::TlsSetup {
                    path: path.display().to_string(),
                    detail: e.to_string(),
                })?;
                builder.add_root_certificate(cert)
            }
            None => {
                warn!(
                    host = %config.host,
                    "no CA certificate configured, TLS verification is disabled"
                );
                builder.danger_accept_invalid_certs(true)
            }
        };

        let http = builder.build()?;
        info!(host = %config.host, "created DirectoryClient");

        Ok(Self {
            http,
            users_url,
            username: config.username.clone(),
            password: config.password.clone().unwrap_or_default(),
            ambiguity: config.on_ambiguous,
        })
    }
}

#[async_trait]
impl DirectoryApi for DirectoryClient {
    #[instrument(skip(self))]
    async fn resolve_alias(&self, alias: &str) -> Result<Option<String>, DirectoryError> {
        let url = lookup_url(&self.users_url, alias);
        debug!(url = %url, "looking up alias");

        let resp = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        debug!(status = status.as_u16(), body = %body, "lookup response");

        if !status.is_success() {
            return Err(DirectoryError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: UserSearchResponse = serde_json::from_str(&body)
            .map_err(|e| DirectoryError::ParseError(e.to_string()))?;
        select_object_id(parsed, alias, self.ambiguity)
    }

    #[instrument(skip(self, new_pin))]
    async fn update_pin(&self, object_id: &str, new_pin: &str) -> Result<(), DirectoryError> {
        let url = format!("{}/{}/credential/pin", self.users_url, object_id);
        let payload = serde_json::json!({ "Credentials": new_pin });
        debug!(url = %url, "updating PIN");

        let resp = self
            .http
            .put(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        debug!(status = status.as_u16(), body = %body, "update response");

        if status == StatusCode::NO_CONTENT {
            return Ok(());
        }
        if status.is_success() {
            // The endpoint contract specifies exactly one success code.
            return Err(DirectoryError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }
        Err(DirectoryError::Api {
            status: status.as_u16(),
            body,
        })
    }
}
