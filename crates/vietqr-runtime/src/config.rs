// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::UtcOffset;
use time::macros::format_description;
use vietqr_api::{DEFAULT_BASE_URL, DEFAULT_GEOCODER_URL, DEFAULT_LANGUAGE, Position};

const CONFIG_VERSION: i64 = 1;
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_LOG_LEVEL: &str = "info";
pub const CONFIG_PATH_ENV: &str = "VIETQR_CONFIG_PATH";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub clock: Clock,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            api: Api::default(),
            location: Location::default(),
            clock: Clock::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub client_id: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_owned()),
            client_id: None,
            api_key: None,
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    pub enabled: Option<bool>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geocoder_url: Option<String>,
    pub language: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            enabled: Some(true),
            latitude: None,
            longitude: None,
            geocoder_url: Some(DEFAULT_GEOCODER_URL.to_owned()),
            language: Some(DEFAULT_LANGUAGE.to_owned()),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Clock {
    pub utc_offset: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;

        let app_dir = config_root.join(vietqr_store::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and keep values under [storage], [api], [location], [clock], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.storage.db_path {
            vietqr_store::validate_db_path(db_path)?;
        }

        if self.api_base_url().is_empty() {
            bail!("api.base_url in {} must not be empty", path.display());
        }

        for (key, raw) in [
            ("api.timeout", self.api.timeout.as_deref()),
            ("location.timeout", self.location.timeout.as_deref()),
        ] {
            if let Some(raw) = raw {
                let parsed = parse_duration(raw)?;
                if parsed <= Duration::ZERO {
                    bail!("{key} in {} must be positive, got {raw}", path.display());
                }
            }
        }

        match (self.location.latitude, self.location.longitude) {
            (Some(latitude), Some(longitude)) => {
                if !(-90.0..=90.0).contains(&latitude) {
                    bail!(
                        "location.latitude in {} must be within -90..=90, got {latitude}",
                        path.display()
                    );
                }
                if !(-180.0..=180.0).contains(&longitude) {
                    bail!(
                        "location.longitude in {} must be within -180..=180, got {longitude}",
                        path.display()
                    );
                }
            }
            (None, None) => {}
            _ => bail!(
                "location.latitude and location.longitude in {} must be set together",
                path.display()
            ),
        }

        if let Some(raw) = &self.clock.utc_offset {
            parse_utc_offset(raw)?;
        }

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => vietqr_store::default_db_path(),
        }
    }

    pub fn api_base_url(&self) -> &str {
        self.api
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim()
            .trim_end_matches('/')
    }

    pub fn api_client_id(&self) -> Option<&str> {
        self.api.client_id.as_deref()
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api.api_key.as_deref()
    }

    pub fn api_timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn location_enabled(&self) -> bool {
        self.location.enabled.unwrap_or(true)
    }

    pub fn position(&self) -> Option<Position> {
        Some(Position {
            latitude: self.location.latitude?,
            longitude: self.location.longitude?,
        })
    }

    pub fn geocoder_url(&self) -> &str {
        self.location
            .geocoder_url
            .as_deref()
            .unwrap_or(DEFAULT_GEOCODER_URL)
    }

    pub fn location_language(&self) -> &str {
        self.location
            .language
            .as_deref()
            .unwrap_or(DEFAULT_LANGUAGE)
    }

    pub fn location_timeout(&self) -> Result<Duration> {
        parse_duration(self.location.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    /// The configured offset, else the system's local offset, else UTC.
    pub fn utc_offset(&self) -> Result<UtcOffset> {
        if let Some(raw) = &self.clock.utc_offset {
            return parse_utc_offset(raw);
        }
        Ok(UtcOffset::current_local_offset().unwrap_or_else(|error| {
            tracing::debug!(%error, "local offset unavailable; using UTC");
            UtcOffset::UTC
        }))
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# vietqr config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/vietqr/vietqr.db)\n# db_path = \"/absolute/path/to/vietqr.db\"\n\n[api]\nbase_url = \"{}\"\n# client_id = \"\"\n# api_key = \"\"\ntimeout = \"{}\"\n\n[location]\nenabled = true\n# Device position in decimal degrees. Without it the lookup reports the position as unavailable.\n# latitude = 21.0285\n# longitude = 105.8542\ngeocoder_url = \"{}\"\nlanguage = \"{}\"\ntimeout = \"{}\"\n\n[clock]\n# Optional. Default is the system local offset.\n# utc_offset = \"+07:00\"\n\n[log]\nlevel = \"{}\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT,
            DEFAULT_GEOCODER_URL,
            DEFAULT_LANGUAGE,
            DEFAULT_TIMEOUT,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 10s)")
}

fn parse_utc_offset(raw: &str) -> Result<UtcOffset> {
    UtcOffset::parse(
        raw.trim(),
        format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .with_context(|| format!("invalid clock.utc_offset {raw:?}; use +HH:MM (for example +07:00)"))
}
