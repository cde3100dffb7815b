use anyhow::{Context, Result};
use keyring::Entry;
use tracing::{debug, warn};

use crate::config::{Config, API_KEY_ENV};

const SERVICE_NAME: &str = "classic-cars";
const API_KEY_ACCOUNT: &str = "api-key";

pub struct CredentialStore;

impl CredentialStore {
    fn entry() -> Result<Entry> {
        Entry::new(SERVICE_NAME, API_KEY_ACCOUNT).context("Failed to create keyring entry")
    }

    /// Store the API key in the OS keychain
    pub fn store_api_key(api_key: &str) -> Result<()> {
        Self::entry()?
            .set_password(api_key)
            .context("Failed to store API key in keychain")?;
        Ok(())
    }

    /// Retrieve the API key, `None` when nothing is stored
    pub fn get_api_key() -> Result<Option<String>> {
        match Self::entry()?.get_password() {
            Ok(key) => Ok(Some(key)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve API key from keychain"),
        }
    }

    /// Remove the stored API key. Succeeds if none was stored.
    pub fn delete_api_key() -> Result<()> {
        match Self::entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete API key from keychain"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeySource {
    Environment,
    Keychain,
    ConfigFile,
}

/// Find the API key: environment, then keychain, then config file.
pub fn resolve_api_key(config: &Config) -> Option<(String, ApiKeySource)> {
    let keychain = || match CredentialStore::get_api_key() {
        Ok(key) => key,
        Err(e) => {
            warn!(error = %e, "Keychain unavailable");
            None
        }
    };
    let resolved = pick_api_key(std::env::var(API_KEY_ENV).ok(), keychain, config);
    if let Some((_, source)) = resolved {
        debug!(?source, "Using API key");
    }
    resolved
}

fn pick_api_key(
    env_key: Option<String>,
    keychain: impl FnOnce() -> Option<String>,
    config: &Config,
) -> Option<(String, ApiKeySource)> {
    let non_empty = |k: &String| !k.trim().is_empty();

    if let Some(key) = env_key.filter(non_empty) {
        return Some((key, ApiKeySource::Environment));
    }
    if let Some(key) = keychain().filter(non_empty) {
        return Some((key, ApiKeySource::Keychain));
    }
    config
        .api_key
        .clone()
        .filter(non_empty)
        .map(|key| (key, ApiKeySource::ConfigFile))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key(key: Option<&str>) -> Config {
        Config {
            api_key: key.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_env_wins() {
        let picked = pick_api_key(
            Some("env".to_string()),
            || panic!("keychain should not be consulted"),
            &config_with_key(Some("file")),
        );
        assert_eq!(picked, Some(("env".to_string(), ApiKeySource::Environment)));
    }

    #[test]
    fn test_keychain_before_config() {
        let picked = pick_api_key(None, || Some("kc".to_string()), &config_with_key(Some("file")));
        assert_eq!(picked, Some(("kc".to_string(), ApiKeySource::Keychain)));
    }

    #[test]
    fn test_blank_values_are_skipped() {
        let picked = pick_api_key(
            Some(" ".to_string()),
            || Some(String::new()),
            &config_with_key(Some("file")),
        );
        assert_eq!(picked, Some(("file".to_string(), ApiKeySource::ConfigFile)));

        assert_eq!(pick_api_key(None, || None, &config_with_key(None)), None);
    }
}
