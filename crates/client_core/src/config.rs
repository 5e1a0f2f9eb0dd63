use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "modamatch.toml";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./data/modamatch.db";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub database_url: String,
    pub storage_quota_bytes: u64,
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.into(),
            model: DEFAULT_MODEL.into(),
            database_url: DEFAULT_DATABASE_URL.into(),
            storage_quota_bytes: storage::DEFAULT_QUOTA_BYTES,
            request_timeout_secs: None,
        }
    }
}

impl Settings {
    /// The configured credential, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Defaults, then the TOML file, then the process environment.
///
/// An explicitly named file must exist; the default `modamatch.toml` is optional.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let (path, required) = match config_path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    let mut settings = match fs::read_to_string(&path) {
        Ok(raw) => toml::from_str::<Settings>(&raw)
            .with_context(|| format!("invalid settings file '{}'", path.display()))?,
        Err(err) if !required && err.kind() == std::io::ErrorKind::NotFound => Settings::default(),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read settings file '{}'", path.display()))
        }
    };

    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    settings.database_url = normalize_database_url(&settings.database_url);
    Ok(settings)
}

pub(crate) fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let first = |names: &[&str]| names.iter().find_map(|name| lookup(*name));

    if let Some(v) = first(&["MODAMATCH__API_KEY", "GEMINI_API_KEY", "API_KEY"]) {
        settings.api_key = Some(v);
    }
    if let Some(v) = first(&["MODAMATCH__API_BASE"]) {
        settings.api_base = v;
    }
    if let Some(v) = first(&["MODAMATCH__MODEL"]) {
        settings.model = v;
    }
    if let Some(v) = first(&["MODAMATCH__DATABASE_URL", "DATABASE_URL"]) {
        settings.database_url = v;
    }
    if let Some(v) = first(&["MODAMATCH__STORAGE_QUOTA_BYTES"]) {
        match v.parse::<u64>() {
            Ok(parsed) => settings.storage_quota_bytes = parsed,
            Err(_) => tracing::warn!(value = %v, "ignoring unparsable MODAMATCH__STORAGE_QUOTA_BYTES"),
        }
    }
    if let Some(v) = first(&["MODAMATCH__REQUEST_TIMEOUT_SECS"]) {
        match v.parse::<u64>() {
            Ok(parsed) => settings.request_timeout_secs = Some(parsed),
            Err(_) => tracing::warn!(value = %v, "ignoring unparsable MODAMATCH__REQUEST_TIMEOUT_SECS"),
        }
    }
}

/// Turns plain file paths into `sqlite://` URLs; URLs pass through.
pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return DEFAULT_DATABASE_URL.to_string();
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
