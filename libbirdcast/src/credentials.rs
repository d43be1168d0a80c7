//! Twitter credential loading
//!
//! Credentials are taken from the environment first and from the `[twitter]`
//! section of the configuration file second. All four OAuth 1.0a values must
//! be present for the platform to be considered configured.

use secrecy::{ExposeSecret, SecretString};

use crate::config::TwitterConfig;

pub const API_KEY_VAR: &str = "TWITTER_API_KEY";
pub const API_SECRET_VAR: &str = "TWITTER_API_SECRET";
pub const ACCESS_TOKEN_VAR: &str = "TWITTER_ACCESS_TOKEN";
pub const ACCESS_TOKEN_SECRET_VAR: &str = "TWITTER_ACCESS_TOKEN_SECRET";

/// Every environment variable the platform client needs
pub const REQUIRED_KEYS: [&str; 4] = [
    API_KEY_VAR,
    API_SECRET_VAR,
    ACCESS_TOKEN_VAR,
    ACCESS_TOKEN_SECRET_VAR,
];

/// OAuth 1.0a user-context credentials
pub struct Credentials {
    pub api_key: SecretString,
    pub api_secret: SecretString,
    pub access_token: SecretString,
    pub access_token_secret: SecretString,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

/// The credentials that could not be found
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Missing: {}", .0.join(", "))]
pub struct MissingCredentials(pub Vec<&'static str>);

impl Credentials {
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        access_token: impl Into<String>,
        access_token_secret: impl Into<String>,
    ) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            api_secret: SecretString::from(api_secret.into()),
            access_token: SecretString::from(access_token.into()),
            access_token_secret: SecretString::from(access_token_secret.into()),
        }
    }

    /// Resolve credentials from the environment, falling back to config values
    ///
    /// Empty values count as missing.
    pub fn resolve(config: &TwitterConfig) -> Result<Self, MissingCredentials> {
        Self::resolve_with(config, |name| std::env::var(name).ok())
    }

    fn resolve_with<F>(config: &TwitterConfig, lookup: F) -> Result<Self, MissingCredentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |var: &str, fallback: &Option<String>| {
            lookup(var)
                .or_else(|| fallback.clone())
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_key = pick(API_KEY_VAR, &config.api_key);
        let api_secret = pick(API_SECRET_VAR, &config.api_secret);
        let access_token = pick(ACCESS_TOKEN_VAR, &config.access_token);
        let access_token_secret = pick(ACCESS_TOKEN_SECRET_VAR, &config.access_token_secret);

        match (api_key, api_secret, access_token, access_token_secret) {
            (Some(key), Some(secret), Some(token), Some(token_secret)) => {
                Ok(Self::new(key, secret, token, token_secret))
            }
            (key, secret, token, token_secret) => {
                let missing = [
                    (API_KEY_VAR, key.is_none()),
                    (API_SECRET_VAR, secret.is_none()),
                    (ACCESS_TOKEN_VAR, token.is_none()),
                    (ACCESS_TOKEN_SECRET_VAR, token_secret.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(MissingCredentials(missing))
            }
        }
    }

    pub(crate) fn expose(&self) -> ExposedCredentials<'_> {
        ExposedCredentials {
            api_key: self.api_key.expose_secret(),
            api_secret: self.api_secret.expose_secret(),
            access_token: self.access_token.expose_secret(),
            access_token_secret: self.access_token_secret.expose_secret(),
        }
    }
}

/// Borrowed plaintext view used while signing a request
pub(crate) struct ExposedCredentials<'a> {
    pub api_key: &'a str,
    pub api_secret: &'a str,
    pub access_token: &'a str,
    pub access_token_secret: &'a str,
}
