use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::Result;
use color_eyre::eyre::{Context, bail, eyre};
use serde::{Deserialize, Serialize};

use crate::auth::AuthError;
use crate::http::RequestPolicy;
use crate::paginator::PAGE_SIZE;
use crate::spotify_rs::auth::SpotifyCredentials;
use crate::tidal_rs::auth::TidalCredentials;

pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub tidal: TidalConfig,
    #[serde(default)]
    pub migration: MigrationConfig,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TidalConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    pub page_size: u32,
    pub concurrency: usize,
    pub requests_per_second: u32,
    pub max_retries: usize,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            concurrency: 1,
            requests_per_second: 5,
            max_retries: 3,
        }
    }
}

fn fill_from_env(
    field: &mut Option<String>,
    name: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) {
    if field.as_deref().is_some_and(|value| !value.is_empty()) {
        return;
    }
    if let Some(value) = lookup(name).filter(|value| !value.is_empty()) {
        *field = Some(value);
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Default config file location, `<config dir>/library-migrator/config.toml`
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("library-migrator").join("config.toml"))
    }

    /// Load the given file, or the default one. A missing default file yields the defaults,
    /// credentials then have to come from the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    log::debug!("No config file found, using defaults");
                    Config::default()
                }
            },
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Fill credentials the file leaves empty from environment variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fill_from_env(&mut self.spotify.client_id, "SPOTIFY_CLIENT_ID", &lookup);
        fill_from_env(&mut self.spotify.client_secret, "SPOTIFY_CLIENT_SECRET", &lookup);
        fill_from_env(&mut self.spotify.redirect_uri, "SPOTIFY_REDIRECT_URI", &lookup);
        fill_from_env(&mut self.tidal.client_id, "TIDAL_CLIENT_ID", &lookup);
        fill_from_env(&mut self.tidal.client_secret, "TIDAL_CLIENT_SECRET", &lookup);
    }

    pub fn validate(&self) -> Result<()> {
        if self.migration.page_size == 0 {
            bail!("migration.page_size must be greater than 0");
        }
        if self.migration.concurrency == 0 {
            bail!("migration.concurrency must be greater than 0");
        }
        if self.migration.requests_per_second == 0 {
            bail!("migration.requests_per_second must be greater than 0");
        }
        Ok(())
    }

    /// Write a template config to the default location, if it doesn't exist
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path().ok_or_else(|| eyre!("No default config path found"))?;
        Self::create_default_at(&path)?;
        Ok(path)
    }

    pub fn create_default_at(path: &Path) -> Result<()> {
        if path.exists() {
            log::info!("Config file already exists at {}", path.display());
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let template = Config {
            spotify: SpotifyConfig {
                client_id: Some(String::new()),
                client_secret: Some(String::new()),
                redirect_uri: Some(DEFAULT_REDIRECT_URI.to_string()),
            },
            tidal: TidalConfig {
                client_id: Some(String::new()),
                client_secret: Some(String::new()),
            },
            migration: MigrationConfig::default(),
        };
        let contents =
            toml::to_string_pretty(&template).wrap_err("Failed to serialize default config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn spotify_credentials(&self) -> Result<SpotifyCredentials, AuthError> {
        let client_id = self
            .spotify
            .client_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or(AuthError::MissingCredentials("spotify.client_id"))?;
        Ok(SpotifyCredentials {
            client_id,
            client_secret: self.spotify.client_secret.clone().filter(|s| !s.is_empty()),
            redirect_uri: self
                .spotify
                .redirect_uri
                .clone()
                .filter(|uri| !uri.is_empty())
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
        })
    }

    pub fn tidal_credentials(&self) -> Result<TidalCredentials, AuthError> {
        let client_id = self
            .tidal
            .client_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or(AuthError::MissingCredentials("tidal.client_id"))?;
        let client_secret = self
            .tidal
            .client_secret
            .clone()
            .filter(|secret| !secret.is_empty())
            .ok_or(AuthError::MissingCredentials("tidal.client_secret"))?;
        Ok(TidalCredentials {
            client_id,
            client_secret,
        })
    }

    pub fn request_policy(&self) -> RequestPolicy {
        RequestPolicy {
            requests_per_second: NonZeroU32::new(self.migration.requests_per_second)
                .unwrap_or(NonZeroU32::MIN),
            max_retries: self.migration.max_retries,
            min_backoff: Duration::from_millis(500),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"
            [spotify]
            client_id = "spotify-id"
            redirect_uri = "http://localhost:3000/callback"

            [tidal]
            client_id = "tidal-id"
            client_secret = "tidal-secret"

            [migration]
            concurrency = 4
            "#,
        );

        let config = Config::load(Some(file.path())).unwrap();

        let spotify = config.spotify_credentials().unwrap();
        assert_eq!(spotify.client_id, "spotify-id");
        assert_eq!(spotify.redirect_uri, "http://localhost:3000/callback");
        assert_eq!(config.tidal_credentials().unwrap().client_secret, "tidal-secret");
        assert_eq!(config.migration.concurrency, 4);
        assert_eq!(config.migration.page_size, 50);
        assert_eq!(config.migration.max_retries, 3);
    }

    #[test]
    fn test_zero_values_rejected() {
        for section in [
            "page_size = 0",
            "concurrency = 0",
            "requests_per_second = 0",
        ] {
            let file = write_config(&format!("[migration]\n{}\n", section));
            assert!(Config::from_file(file.path()).is_err(), "{} accepted", section);
        }
    }

    #[test]
    fn test_env_fills_missing_credentials_only() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SPOTIFY_CLIENT_ID", "env-spotify"),
            ("TIDAL_CLIENT_ID", "env-tidal"),
            ("TIDAL_CLIENT_SECRET", "env-secret"),
        ]);
        let mut config = Config {
            tidal: TidalConfig {
                client_id: Some("file-tidal".into()),
                client_secret: Some(String::new()),
            },
            ..Config::default()
        };

        config.apply_env(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.spotify.client_id.as_deref(), Some("env-spotify"));
        assert_eq!(config.tidal.client_id.as_deref(), Some("file-tidal"));
        assert_eq!(config.tidal.client_secret.as_deref(), Some("env-secret"));
    }

    #[test]
    fn test_missing_credentials() {
        let config = Config::default();

        assert!(matches!(
            config.spotify_credentials(),
            Err(AuthError::MissingCredentials("spotify.client_id"))
        ));
        assert!(matches!(
            config.tidal_credentials(),
            Err(AuthError::MissingCredentials("tidal.client_id"))
        ));
    }

    #[test]
    fn test_create_default_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library-migrator").join("config.toml");

        Config::create_default_at(&path).unwrap();
        let config = Config::from_file(&path).unwrap();

        assert_eq!(
            config.spotify.redirect_uri.as_deref(),
            Some(DEFAULT_REDIRECT_URI)
        );
        assert_eq!(config.migration.requests_per_second, 5);
        assert!(config.spotify_credentials().is_err());
    }

    #[test]
    fn test_create_default_keeps_existing_file() {
        let file = write_config("[migration]\nconcurrency = 2\n");

        Config::create_default_at(file.path()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.migration.concurrency, 2);
    }
}
