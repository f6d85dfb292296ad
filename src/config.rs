use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::lookup::Membership;
use crate::model::Predicate;
use crate::service::Credentials;
use crate::vocab;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub partchain: PartchainConfig,
    pub fedora: FedoraConfig,
    #[serde(default)]
    pub ordering: OrderingConfig,
}

/// General settings
#[derive(Debug, Clone, Deserialize)]
pub struct PartchainConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for PartchainConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Repository connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct FedoraConfig {
    /// Repository root; the resource index lives at `<url>/risearch`.
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default = "default_password_env")]
    pub password_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Which membership shape a parent uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    ChildDeclaresParent,
    ParentDeclaresChildren,
}

/// Default predicates for ordering
#[derive(Debug, Clone, Deserialize)]
pub struct OrderingConfig {
    #[serde(default = "default_membership_predicate")]
    pub membership_predicate: String,
    #[serde(default = "default_follows_predicate")]
    pub follows_predicate: String,
    #[serde(default)]
    pub direction: Direction,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            membership_predicate: default_membership_predicate(),
            follows_predicate: default_follows_predicate(),
            direction: Direction::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_password_env() -> String {
    "FEDORA_PASSWORD".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_membership_predicate() -> String {
    vocab::IS_PART_OF.to_string()
}

fn default_follows_predicate() -> String {
    vocab::FOLLOWS.to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in PARTCHAIN_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("PARTCHAIN_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        Self::from_toml(&config_str)
    }

    /// Parse and validate configuration text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).context("Failed to parse config.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        let url = self.fedora_url()?;
        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!("fedora.url must use http or https, got {}", url.scheme());
        }

        if self.fedora.timeout_secs == 0 {
            anyhow::bail!("fedora.timeout_secs must be greater than 0");
        }

        self.membership()?;
        self.follows()?;

        if self.fedora.username.is_some() {
            std::env::var(&self.fedora.password_env).with_context(|| {
                format!(
                    "Environment variable {} not set. Set it in your .env file or as an environment variable with the repository password.",
                    self.fedora.password_env
                )
            })?;
        }

        Ok(())
    }

    /// Parsed repository root
    pub fn fedora_url(&self) -> Result<Url> {
        Url::parse(&self.fedora.url)
            .with_context(|| format!("fedora.url is not a valid URL: {}", self.fedora.url))
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.fedora.timeout_secs)
    }

    /// Credentials, if a username is configured
    pub fn credentials(&self) -> Result<Option<Credentials>> {
        match self.fedora.username {
            Some(ref username) => {
                let password = std::env::var(&self.fedora.password_env)
                    .with_context(|| {
                        format!("Environment variable {} not set", self.fedora.password_env)
                    })?;
                Ok(Some(Credentials {
                    username: username.clone(),
                    password,
                }))
            }
            None => Ok(None),
        }
    }

    /// Membership shape built from `[ordering]`
    pub fn membership(&self) -> Result<Membership> {
        let predicate = Predicate::new(self.ordering.membership_predicate.as_str())
            .context("ordering.membership_predicate")?;
        Ok(match self.ordering.direction {
            Direction::ChildDeclaresParent => Membership::ChildDeclaresParent(predicate),
            Direction::ParentDeclaresChildren => Membership::ParentDeclaresChildren(predicate),
        })
    }

    /// Follows predicate from `[ordering]`
    pub fn follows(&self) -> Result<Predicate> {
        Predicate::new(self.ordering.follows_predicate.as_str())
            .context("ordering.follows_predicate")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    const MINIMAL: &str = r#"
[fedora]
url = "http://localhost:8080/fedora"
"#;

    const FULL: &str = r#"
[partchain]
log_level = "debug"

[fedora]
url = "https://repo.example.edu/fedora"
username = "fedoraAdmin"
password_env = "PARTCHAIN_TEST_PASSWORD"
timeout_secs = 10

[ordering]
membership_predicate = "info:fedora/fedora-system:def/relations-external#hasPart"
follows_predicate = "http://fedora.lib.virginia.edu/relationships#isFollowingPageOf"
direction = "parent_declares_children"
"#;

    fn with_env(key: &str, value: Option<&str>, f: impl FnOnce()) {
        let original = std::env::var(key).ok();
        match value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
        f();
        std::env::remove_var(key);
        if let Some(v) = original {
            std::env::set_var(key, v);
        }
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = Config::from_toml(MINIMAL).unwrap();
        assert_eq!(config.partchain.log_level, "info");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.ordering.direction, Direction::ChildDeclaresParent);
        assert_eq!(config.follows().unwrap().as_str(), vocab::FOLLOWS);
        assert!(matches!(config.membership().unwrap(), Membership::ChildDeclaresParent(_)));
        assert!(config.credentials().unwrap().is_none());
    }

    #[test]
    fn test_full_config() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        with_env("PARTCHAIN_TEST_PASSWORD", Some("secret"), || {
            let config = Config::from_toml(FULL).unwrap();
            assert_eq!(config.partchain.log_level, "debug");
            assert_eq!(config.timeout(), Duration::from_secs(10));
            assert!(matches!(config.membership().unwrap(), Membership::ParentDeclaresChildren(_)));
            let creds = config.credentials().unwrap().unwrap();
            assert_eq!(creds.username, "fedoraAdmin");
            assert_eq!(creds.password, "secret");
        });
    }

    #[test]
    fn test_missing_password_env() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        with_env("PARTCHAIN_TEST_PASSWORD", None, || {
            let err = Config::from_toml(FULL).unwrap_err();
            assert!(err.to_string().contains("PARTCHAIN_TEST_PASSWORD"));
        });
    }

    #[test]
    fn test_rejects_bad_url_and_timeout() {
        assert!(Config::from_toml("[fedora]\nurl = \"not a url\"\n").is_err());
        assert!(Config::from_toml("[fedora]\nurl = \"ftp://host/fedora\"\n").is_err());
        assert!(Config::from_toml("[fedora]\nurl = \"http://h/f\"\ntimeout_secs = 0\n").is_err());
    }

    #[test]
    fn test_rejects_unsafe_predicate() {
        let text = format!(
            "{}\n[ordering]\nfollows_predicate = \"http://x/y> $a <http://z\"\n",
            MINIMAL
        );
        assert!(Config::from_toml(&text).is_err());
    }

    #[test]
    fn test_config_load_from_env_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("partchain.toml");
        fs::write(&config_path, MINIMAL).unwrap();
        with_env("PARTCHAIN_CONFIG", config_path.to_str(), || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
        });
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        with_env("PARTCHAIN_CONFIG", Some("nonexistent.toml"), || {
            assert!(Config::load().is_err());
        });
    }
}
