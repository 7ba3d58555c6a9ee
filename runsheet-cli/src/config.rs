//! `runsheet.toml` settings.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use runsheet_provider_osm::{DEFAULT_GEOCODER_URL, DEFAULT_MIN_INTERVAL, DEFAULT_ROUTER_URL, OsmConfig};

/// Config file looked up in the working directory when `--config` is absent.
pub(crate) const DEFAULT_CONFIG: &str = "runsheet.toml";

/// Binary settings loaded from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    /// `tracing` filter directive, overridden by `RUST_LOG` and `--log`.
    pub(crate) log_filter: String,

    /// Geocoding and routing endpoints.
    pub(crate) provider: ProviderConfig,

    /// Named message formats mapped to template files.
    pub(crate) formats: BTreeMap<String, PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: "runsheet=info,runsheet_core=info,runsheet_provider_osm=info".to_owned(),
            provider: ProviderConfig::default(),
            formats: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ProviderConfig {
    pub(crate) geocoder_url: String,
    pub(crate) router_url: String,
    pub(crate) user_agent: String,
    pub(crate) min_interval_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        let osm = OsmConfig::default();
        Self {
            geocoder_url: DEFAULT_GEOCODER_URL.to_owned(),
            router_url: DEFAULT_ROUTER_URL.to_owned(),
            user_agent: osm.user_agent,
            min_interval_ms: u64::try_from(DEFAULT_MIN_INTERVAL.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl ProviderConfig {
    pub(crate) fn osm(&self) -> OsmConfig {
        OsmConfig {
            geocoder_url: self.geocoder_url.clone(),
            router_url: self.router_url.clone(),
            user_agent: self.user_agent.clone(),
            min_interval: Duration::from_millis(self.min_interval_ms),
        }
    }
}

impl Config {
    /// Load settings from `path`; relative template paths resolve against its directory.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;

        if let Some(base) = path.parent() {
            for template in config.formats.values_mut() {
                if template.is_relative() {
                    *template = base.join(&*template);
                }
            }
        }
        Ok(config)
    }

    /// Load `explicit` if given, else `runsheet.toml` when present, else defaults.
    pub(crate) fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG);
                if fallback.is_file() {
                    Self::load(fallback)
                } else {
                    tracing::debug!("no {DEFAULT_CONFIG} found, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Template file registered under `name`.
    pub(crate) fn format(&self, name: &str) -> Result<&Path> {
        self.formats.get(name).map(PathBuf::as_path).with_context(|| {
            let known: Vec<&str> = self.formats.keys().map(String::as_str).collect();
            format!("unknown message format '{name}' (configured: {})", known.join(", "))
        })
    }
}
