//! TOML configuration.
//!
//! Everything has a default, so an empty or missing file is valid:
//!
//! ```toml
//! [logging]
//! level = "debug"
//! file = "feedmux.log"
//!
//! [http]
//! request_timeout_secs = 20
//!
//! [endpoints]
//! product_hunt_token = "..."
//!
//! [[sources]]
//! kind = "dribbble-search:material design"
//! active = false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::source::{
    HttpSettings, RegistryError, Source, SourceKind, SourceRegistry, DESIGNER_NEWS_BASE_URL,
    DRIBBBLE_BASE_URL, DRIBBBLE_PAGE_SIZE, PRODUCT_HUNT_BASE_URL,
};

pub const DEFAULT_CONFIG_FILE: &str = "feedmux.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    pub endpoints: Endpoints,
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `feedmux=debug`.  `RUST_LOG` wins.
    pub level: String,
    /// Log file; the terminal belongs to the UI.
    pub file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: PathBuf::from("feedmux.log"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        let defaults = HttpSettings::default();
        Self {
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            request_timeout_secs: defaults.request_timeout.as_secs(),
            user_agent: None,
        }
    }
}

impl HttpConfig {
    pub fn settings(&self) -> HttpSettings {
        let defaults = HttpSettings::default();
        HttpSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
        }
    }
}

/// Base URLs and credentials of the backends.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Endpoints {
    pub designer_news: String,
    pub product_hunt: String,
    pub product_hunt_token: Option<String>,
    pub dribbble: String,
    pub dribbble_page_size: u32,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            designer_news: DESIGNER_NEWS_BASE_URL.into(),
            product_hunt: PRODUCT_HUNT_BASE_URL.into(),
            product_hunt_token: None,
            dribbble: DRIBBBLE_BASE_URL.into(),
            dribbble_page_size: DRIBBBLE_PAGE_SIZE,
        }
    }
}

/// One `[[sources]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SourceConfig {
    /// Defaults to the kind discriminator.
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub kind: SourceKind,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl SourceConfig {
    pub fn to_source(&self) -> Source {
        let mut source = Source::from_kind(self.kind.clone(), self.active);
        if let Some(key) = &self.key {
            source.key = key.clone();
        }
        if let Some(name) = &self.name {
            source.name = name.clone();
        }
        source
    }
}

impl Config {
    /// Load `path`.  A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Configured sources, or Designer News and Product Hunt when none are.
    pub fn sources(&self) -> Vec<Source> {
        if self.sources.is_empty() {
            return vec![
                Source::from_kind(SourceKind::DesignerNewsPopular, true),
                Source::from_kind(SourceKind::ProductHunt, true),
            ];
        }
        self.sources.iter().map(SourceConfig::to_source).collect()
    }

    /// Build the registry from [`Config::sources`] plus `extra`.
    pub fn registry(
        &self,
        extra: impl IntoIterator<Item = Source>,
    ) -> Result<SourceRegistry, RegistryError> {
        SourceRegistry::with_sources(self.sources().into_iter().chain(extra))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_is_all_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        let keys: Vec<_> = config.sources().into_iter().map(|s| s.key).collect();
        assert_eq!(keys, vec!["designer-news-popular", "product-hunt"]);
    }

    #[test]
    fn parses_sources_and_sections() {
        let config = Config::parse(
            r#"
            [logging]
            level = "debug"

            [http]
            request_timeout_secs = 5

            [endpoints]
            product_hunt_token = "t0ken"
            dribbble_page_size = 24

            [[sources]]
            kind = "designer-news-popular"

            [[sources]]
            kind = "dribbble-search:material design"
            name = "Material"
            active = false

            [[sources]]
            key = "blog"
            kind = "rss:https://example.com/feed"
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, PathBuf::from("feedmux.log"));
        assert_eq!(
            config.http.settings().request_timeout,
            Duration::from_secs(5)
        );
        assert_eq!(config.endpoints.product_hunt_token.as_deref(), Some("t0ken"));
        assert_eq!(config.endpoints.dribbble_page_size, 24);

        let sources = config.sources();
        assert_eq!(sources.len(), 3);
        assert!(sources[0].active);
        assert_eq!(sources[1].key, "dribbble-search:material design");
        assert_eq!(sources[1].name, "Material");
        assert!(!sources[1].active);
        assert_eq!(sources[2].key, "blog");
        assert_eq!(
            sources[2].kind,
            SourceKind::Rss {
                url: "https://example.com/feed".into()
            }
        );
    }

    #[test]
    fn unknown_kind_is_kept_as_unsupported() {
        let config = Config::parse("[[sources]]\nkind = \"behance\"\n").unwrap();
        assert_eq!(
            config.sources()[0].kind,
            SourceKind::Unsupported("behance".into())
        );
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_reads_file_and_reports_parse_errors() {
        let mut good = tempfile::NamedTempFile::new().unwrap();
        writeln!(good, "[logging]\nlevel = \"warn\"").unwrap();
        assert_eq!(Config::load(good.path()).unwrap().logging.level, "warn");

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad, "[[sources]]\nactive = true").unwrap();
        assert!(matches!(
            Config::load(bad.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn registry_rejects_empty_source_key() {
        let config = Config::parse(
            "[[sources]]\nkey = \"\"\nkind = \"dribbble-search:icons\"\n",
        )
        .unwrap();
        assert_eq!(config.sources()[0].key, "");
        assert_eq!(
            config.registry([]).err(),
            Some(RegistryError::EmptyKey)
        );
    }

    #[test]
    fn registry_rejects_duplicate_extra_source() {
        let config = Config::default();
        let err = config
            .registry([Source::from_kind(SourceKind::ProductHunt, true)])
            .err()
            .unwrap();
        assert_eq!(err, RegistryError::DuplicateKey("product-hunt".into()));
    }
}
