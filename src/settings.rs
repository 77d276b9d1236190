//! Persisted provider settings: which provider is selected, and the API key
//! and model name stored for each provider.
//!
//! Settings are loaded once at startup from a JSON file, overlaid with
//! environment variables, and then passed explicitly to the summarizer as a
//! [`ProviderConfig`]. Saving is create-or-update; there is no delete.
//!
//! ```json
//! {
//!   "provider": "gemini",
//!   "gemini": { "api_key": "AIza…", "model": "gemini-2.0-flash" },
//!   "openai": { "api_key": "sk-…", "model": null, "base_url": null }
//! }
//! ```

use crate::error::SummarizeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Default model for [`Provider::Gemini`] when none is stored.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Default model for [`Provider::OpenAi`] when none is stored.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-nano";

/// A summarization provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google Gemini `generateContent` (single combined-content call).
    #[default]
    Gemini,
    /// OpenAI-compatible chat completions (system + user messages).
    OpenAi,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Gemini, Provider::OpenAi];

    /// Stable lowercase name, used in settings files and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::OpenAi => "openai",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Gemini => DEFAULT_GEMINI_MODEL,
            Provider::OpenAi => DEFAULT_OPENAI_MODEL,
        }
    }

    /// Environment variable consulted for this provider's key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = SummarizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Provider::Gemini),
            "openai" => Ok(Provider::OpenAi),
            other => Err(SummarizeError::InvalidConfig(format!(
                "unknown provider '{other}' (expected gemini or openai)"
            ))),
        }
    }
}

/// Stored values for one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Endpoint override, e.g. an OpenAI-compatible host.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// All persisted settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub gemini: ProviderSettings,
    #[serde(default)]
    pub openai: ProviderSettings,
}

impl Settings {
    /// `<config_dir>/pdfsum/settings.json`, or `./pdfsum-settings.json` when
    /// the platform has no config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("pdfsum").join("settings.json"))
            .unwrap_or_else(|| PathBuf::from("pdfsum-settings.json"))
    }

    /// Load settings from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, SummarizeError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(SummarizeError::SettingsRead {
                    path: path.display().to_string(),
                    detail: e.to_string(),
                })
            }
        };

        serde_json::from_str(&raw).map_err(|e| SummarizeError::SettingsRead {
            path: path.display().to_string(),
            detail: e.to_string(),
        })
    }

    /// Write settings to `path` (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<(), SummarizeError> {
        let write_err = |source| SummarizeError::SettingsWrite {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SummarizeError::Internal(format!("settings serialisation: {e}")))?;

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json).map_err(write_err)?;
        std::fs::rename(&tmp_path, path).map_err(write_err)?;

        info!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Overlay values from the process environment.
    ///
    /// `GEMINI_API_KEY` / `OPENAI_API_KEY` set the keys, `PDFSUM_PROVIDER`
    /// selects the provider and `PDFSUM_MODEL` sets the selected provider's
    /// model. Empty variables are ignored.
    pub fn apply_env(&mut self) -> Result<(), SummarizeError> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), SummarizeError> {
        let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        for provider in Provider::ALL {
            if let Some(key) = non_empty(provider.api_key_env()) {
                self.set_api_key(provider, key);
            }
        }
        if let Some(name) = non_empty("PDFSUM_PROVIDER") {
            self.select(name.parse()?);
        }
        if let Some(model) = non_empty("PDFSUM_MODEL") {
            self.set_model(self.provider, model);
        }
        Ok(())
    }

    pub fn selected(&self) -> Provider {
        self.provider
    }

    pub fn select(&mut self, provider: Provider) {
        self.provider = provider;
    }

    fn entry(&self, provider: Provider) -> &ProviderSettings {
        match provider {
            Provider::Gemini => &self.gemini,
            Provider::OpenAi => &self.openai,
        }
    }

    fn entry_mut(&mut self, provider: Provider) -> &mut ProviderSettings {
        match provider {
            Provider::Gemini => &mut self.gemini,
            Provider::OpenAi => &mut self.openai,
        }
    }

    pub fn api_key(&self, provider: Provider) -> &str {
        &self.entry(provider).api_key
    }

    pub fn set_api_key(&mut self, provider: Provider, key: impl Into<String>) {
        self.entry_mut(provider).api_key = key.into().trim().to_string();
    }

    /// Stored model, or the provider default when unset or blank.
    pub fn model(&self, provider: Provider) -> &str {
        self.entry(provider)
            .model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| provider.default_model())
    }

    pub fn set_model(&mut self, provider: Provider, model: impl Into<String>) {
        self.entry_mut(provider).model = Some(model.into());
    }

    pub fn set_base_url(&mut self, provider: Provider, url: impl Into<String>) {
        self.entry_mut(provider).base_url = Some(url.into());
    }

    /// Snapshot of the selected provider, read at request time.
    pub fn provider_config(&self) -> ProviderConfig {
        self.config_for(self.provider)
    }

    pub fn config_for(&self, provider: Provider) -> ProviderConfig {
        let entry = self.entry(provider);
        ProviderConfig {
            provider,
            api_key: entry.api_key.clone(),
            model: self.model(provider).to_string(),
            base_url: entry.base_url.clone(),
        }
    }
}

/// Everything the summarization client needs for one call.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
}

impl ProviderConfig {
    pub fn new(provider: Provider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: provider.default_model().to_string(),
            base_url: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &if self.has_api_key() { "<redacted>" } else { "<empty>" })
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn model_defaults_per_provider() {
        let s = Settings::default();
        assert_eq!(s.model(Provider::Gemini), DEFAULT_GEMINI_MODEL);
        assert_eq!(s.model(Provider::OpenAi), DEFAULT_OPENAI_MODEL);
    }

    #[test]
    fn blank_model_falls_back_to_default() {
        let mut s = Settings::default();
        s.set_model(Provider::OpenAi, "  ");
        assert_eq!(s.model(Provider::OpenAi), DEFAULT_OPENAI_MODEL);
    }

    #[test]
    fn keys_are_per_provider() {
        let mut s = Settings::default();
        s.set_api_key(Provider::OpenAi, " sk-test \n");
        assert_eq!(s.api_key(Provider::OpenAi), "sk-test");
        assert_eq!(s.api_key(Provider::Gemini), "");
    }

    #[test]
    fn provider_config_follows_selection() {
        let mut s = Settings::default();
        s.set_api_key(Provider::OpenAi, "sk-test");
        s.set_model(Provider::OpenAi, "gpt-4.1-mini");
        s.select(Provider::OpenAi);
        let cfg = s.provider_config();
        assert_eq!(cfg.provider, Provider::OpenAi);
        assert_eq!(cfg.model, "gpt-4.1-mini");
        assert!(cfg.has_api_key());
    }

    #[test]
    fn debug_redacts_key() {
        let cfg = ProviderConfig::new(Provider::Gemini, "AIzaSecret");
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("AIzaSecret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn parse_provider_names() {
        assert_eq!("Gemini".parse::<Provider>().unwrap(), Provider::Gemini);
        assert_eq!("openai".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert!("mistral".parse::<Provider>().is_err());
    }

    #[test]
    fn env_overlay() {
        let vars: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-env"),
            ("GEMINI_API_KEY", ""),
            ("PDFSUM_PROVIDER", "openai"),
            ("PDFSUM_MODEL", "gpt-4o"),
        ]
        .into_iter()
        .collect();

        let mut s = Settings::default();
        s.set_api_key(Provider::Gemini, "AIzaFile");
        s.apply_vars(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(s.selected(), Provider::OpenAi);
        assert_eq!(s.api_key(Provider::OpenAi), "sk-env");
        // Empty variable does not clobber the stored key
        assert_eq!(s.api_key(Provider::Gemini), "AIzaFile");
        assert_eq!(s.model(Provider::OpenAi), "gpt-4o");
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut s = Settings::default();
        s.select(Provider::OpenAi);
        s.set_api_key(Provider::OpenAi, "sk-saved");
        s.set_base_url(Provider::OpenAi, "http://localhost:8080");
        s.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, s);

        // Update in place
        let mut again = loaded;
        again.set_model(Provider::Gemini, "gemini-2.5-pro");
        again.save(&path).unwrap();
        assert_eq!(
            Settings::load(&path).unwrap().model(Provider::Gemini),
            "gemini-2.5-pro"
        );
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Settings::load(&path),
            Err(SummarizeError::SettingsRead { .. })
        ));
    }
}
