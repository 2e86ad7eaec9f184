//! Client configuration loaded from `<config_dir>/cartlist/config.toml`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::Url;
use serde::Deserialize;

use crate::memory::DEFAULT_OWNER;
use crate::session::{Identity, Session};

/// Environment variable overriding `remote.endpoint`.
pub const ENV_ENDPOINT: &str = "CARTLIST_ENDPOINT";
/// Environment variable overriding `auth.token`.
pub const ENV_TOKEN: &str = "CARTLIST_TOKEN";
/// Environment variable overriding `auth.owner`.
pub const ENV_OWNER: &str = "CARTLIST_OWNER";
/// Collection endpoint of a local development server.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/items";
/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const APP_DIR: &str = "cartlist";
const CONFIG_FILE: &str = "config.toml";
const PREFERENCES_FILE: &str = "preferences.json";

/// Top-level client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// `[remote]` block.
    pub remote: RemoteConfig,
    /// `[auth]` block.
    pub auth: AuthConfig,
    /// `[preferences]` block.
    pub preferences: PreferencesConfig,
}

impl ClientConfig {
    /// Platform location of the configuration file.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from `explicit` or, when absent, from [`default_path`](Self::default_path).
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read, parsed or validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }

    /// Load from a file; a missing file yields defaults.
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read, parsed or validated.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Apply `CARTLIST_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        let mut fetch = |key: &'static str| env::var(key).ok();
        self.apply_env_with(&mut fetch);
    }

    /// Apply overrides read through `fetch`; blank values are ignored.
    pub fn apply_env_with(&mut self, fetch: &mut impl FnMut(&'static str) -> Option<String>) {
        let mut non_blank = |key: &'static str| fetch(key).filter(|value| !value.trim().is_empty());
        if let Some(endpoint) = non_blank(ENV_ENDPOINT) {
            self.remote.endpoint = endpoint;
        }
        if let Some(token) = non_blank(ENV_TOKEN) {
            self.auth.token = Some(token);
        }
        if let Some(owner) = non_blank(ENV_OWNER) {
            self.auth.owner = Some(owner);
        }
    }

    /// Check values that deserialization cannot.
    ///
    /// # Errors
    /// Returns an error for a malformed endpoint or a zero timeout.
    pub fn validate(&self) -> Result<()> {
        self.remote.endpoint_url()?;
        if self.remote.timeout_secs == 0 {
            bail!("remote.timeout_secs must be greater than zero");
        }
        Ok(())
    }

    /// Session matching the `[auth]` block.
    #[must_use]
    pub fn session(&self) -> Session {
        if self.auth.skip_auth {
            return Session::dev();
        }
        match &self.auth.token {
            Some(token) => {
                let owner = self.auth.owner.as_deref().unwrap_or(DEFAULT_OWNER);
                Session::signed_in(Identity::new(owner, token.clone()))
            }
            None => Session::anonymous(),
        }
    }

    /// File the preferences are stored in.
    #[must_use]
    pub fn preferences_path(&self) -> Option<PathBuf> {
        self.preferences
            .path
            .clone()
            .or_else(|| dirs::config_dir().map(|dir| dir.join(APP_DIR).join(PREFERENCES_FILE)))
    }
}

/// Remote collection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    /// Collection endpoint URL.
    pub endpoint: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl RemoteConfig {
    /// Parsed endpoint; only absolute `http` and `https` URLs are accepted.
    ///
    /// # Errors
    /// Returns an error when the endpoint does not parse or uses another scheme.
    pub fn endpoint_url(&self) -> Result<Url> {
        let url = Url::parse(&self.endpoint).with_context(|| format!("invalid remote.endpoint '{}'", self.endpoint))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("remote.endpoint must use http or https, got '{}'", url.scheme());
        }
        Ok(url)
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Credential settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Owner label for the signed-in user.
    pub owner: Option<String>,
    /// Bearer token issued by the identity provider.
    pub token: Option<String>,
    /// Use the development bypass credentials.
    pub skip_auth: bool,
}

/// Preference storage settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreferencesConfig {
    /// Preference file; defaults to `<config_dir>/cartlist/preferences.json`.
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use crate::session::{DEV_OWNER, DEV_TOKEN};
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap_or_else(|err| panic!("must create temp dir: {err}"));
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, contents).unwrap_or_else(|err| panic!("must write config: {err}"));
        (dir, path)
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap_or_else(|err| panic!("must create temp dir: {err}"));
        let config = ClientConfig::from_path(dir.path().join("absent.toml")).expect("defaults");
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.remote.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.remote.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn parses_all_sections() {
        let (_dir, path) = write_config(
            r#"
[remote]
endpoint = "https://lists.example.com/api/items"
timeout_secs = 5

[auth]
owner = "alice"
token = "secret"

[preferences]
path = "/tmp/cartlist-prefs.json"
"#,
        );
        let config = ClientConfig::from_path(&path).expect("must parse");
        assert_eq!(config.remote.timeout_secs, 5);
        assert_eq!(
            config.remote.endpoint_url().expect("url").host_str(),
            Some("lists.example.com")
        );
        assert_eq!(config.auth.owner.as_deref(), Some("alice"));
        assert_eq!(
            config.preferences_path(),
            Some(PathBuf::from("/tmp/cartlist-prefs.json"))
        );
    }

    #[test]
    fn invalid_file_reports_its_path() {
        let (_dir, path) = write_config("[remote\nendpoint = ");
        let err = ClientConfig::from_path(&path).expect_err("must fail");
        assert!(format!("{err:#}").contains(&path.display().to_string()));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let (_dir, path) = write_config("[remote]\nendpont = \"http://x\"\n");
        assert!(ClientConfig::from_path(&path).is_err());
    }

    #[test]
    fn validation_rejects_bad_endpoints_and_zero_timeout() {
        let mut config = ClientConfig::default();
        config.remote.endpoint = "ftp://example.com/items".into();
        assert!(config.validate().is_err());

        config.remote.endpoint = "/api/items".into();
        assert!(config.validate().is_err());

        config.remote.endpoint = DEFAULT_ENDPOINT.into();
        config.remote.timeout_secs = 0;
        assert!(config.validate().is_err());

        config.remote.timeout_secs = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_non_blank_values() {
        let vars = HashMap::from([
            (ENV_ENDPOINT, "https://override.example.com/api/items".to_owned()),
            (ENV_TOKEN, "   ".to_owned()),
            (ENV_OWNER, "bob".to_owned()),
        ]);
        let mut fetch = |key: &'static str| vars.get(key).cloned();

        let mut config = ClientConfig::default();
        config.auth.token = Some("from-file".into());
        config.apply_env_with(&mut fetch);

        assert_eq!(config.remote.endpoint, "https://override.example.com/api/items");
        assert_eq!(config.auth.token.as_deref(), Some("from-file"));
        assert_eq!(config.auth.owner.as_deref(), Some("bob"));
    }

    #[test]
    fn session_follows_auth_block() {
        let mut config = ClientConfig::default();
        assert!(!config.session().is_signed_in());

        config.auth.token = Some("t1".into());
        let session = config.session();
        assert_eq!(session.bearer().as_deref(), Some("t1"));
        assert_eq!(session.owner().as_deref(), Some(DEFAULT_OWNER));

        config.auth.skip_auth = true;
        let dev = config.session();
        assert_eq!(dev.owner().as_deref(), Some(DEV_OWNER));
        assert_eq!(dev.bearer().as_deref(), Some(DEV_TOKEN));
    }
}
