//! Provider configuration and bootstrap
//!
//! Settings come from the state document's `provider` block; any value left
//! out there is read from the environment.

use crate::error::ControllerError;
use crate::reconciler::AddressReconciler;
use phpipam_client::{ClientConfig, PhpIpamClient, PhpIpamClientTrait};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

pub const SERVER_URL_ENV: &str = "PHPIPAM_SERVER_URL";
pub const USERNAME_ENV: &str = "PHPIPAM_USERNAME";
pub const PASSWORD_ENV: &str = "PHPIPAM_PASSWORD";
pub const SSL_SKIP_VERIFY_ENV: &str = "PHPIPAM_SSL_SKIP_VERIFY";
pub const APP_ID_ENV: &str = "PHPIPAM_APP_ID";

/// Application ID used when none is configured
pub const DEFAULT_APP_ID: &str = "terraform";

/// Explicit provider settings
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub server_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl_skip_verify: Option<bool>,
    pub app_id: Option<String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("ssl_skip_verify", &self.ssl_skip_verify)
            .field("app_id", &self.app_id)
            .finish()
    }
}

impl ProviderConfig {
    /// Fill unset values from `lookup` and check the required ones.
    ///
    /// Empty strings count as unset.
    pub fn resolve(self, lookup: impl Fn(&str) -> Option<String>) -> Result<ClientConfig, ControllerError> {
        let setting = |explicit: Option<String>, var: &str| {
            explicit
                .filter(|value| !value.is_empty())
                .or_else(|| lookup(var).filter(|value| !value.is_empty()))
        };
        let required = |value: Option<String>, name: &str, var: &str| {
            value.ok_or_else(|| {
                ControllerError::InvalidConfig(format!("{} is required (or set {})", name, var))
            })
        };

        let server_url = required(setting(self.server_url, SERVER_URL_ENV), "server_url", SERVER_URL_ENV)?;
        let username = required(setting(self.username, USERNAME_ENV), "username", USERNAME_ENV)?;
        let password = required(setting(self.password, PASSWORD_ENV), "password", PASSWORD_ENV)?;
        let app_id = setting(self.app_id, APP_ID_ENV).unwrap_or_else(|| DEFAULT_APP_ID.to_string());

        let ssl_skip_verify = match self.ssl_skip_verify {
            Some(value) => value,
            None => match lookup(SSL_SKIP_VERIFY_ENV).filter(|value| !value.is_empty()) {
                Some(raw) => parse_bool(&raw).ok_or_else(|| {
                    ControllerError::InvalidConfig(format!(
                        "{} must be a boolean, got {:?}",
                        SSL_SKIP_VERIFY_ENV, raw
                    ))
                })?,
                None => false,
            },
        };

        Ok(ClientConfig {
            server_url,
            app_id,
            username,
            password,
            ssl_skip_verify,
        })
    }

    /// [`ProviderConfig::resolve`] against the process environment
    pub fn resolve_from_env(self) -> Result<ClientConfig, ControllerError> {
        self.resolve(|var| std::env::var(var).ok())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Build an authenticated client and the reconciler that owns it.
///
/// The app ID doubles as the owner recorded on allocated addresses.
pub async fn configure(config: ProviderConfig) -> Result<AddressReconciler, ControllerError> {
    let client_config = config.resolve_from_env()?;
    let server_url = client_config.server_url.clone();
    let owner = client_config.app_id.clone();
    debug!("Connecting to phpIPAM at {} as application {}", server_url, owner);

    let client = PhpIpamClient::new(client_config)?;
    client.authenticate().await?;
    info!("phpIPAM client configured for server {}", server_url);

    let client: Arc<dyn PhpIpamClientTrait> = Arc::new(client);
    Ok(AddressReconciler::new(client, owner))
}
