//! Dashboard settings, persisted as one JSON file.
//!
//! The file is created on the first save. Until then the store is seeded
//! from [`GatewayConfig`] (environment / `wpfleet.toml`).

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::config::{GatewayConfig, mask_secret};
use crate::errors::GatewayError;

const MASK_PREFIX: &str = "********";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentSettings {
    pub min_word_count: u32,
    pub max_word_count: u32,
    pub include_images: bool,
    pub include_tags: bool,
    pub include_categories: bool,
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            min_word_count: 800,
            max_word_count: 1500,
            include_images: true,
            include_tags: true,
            include_categories: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulingSettings {
    pub publish_immediately: bool,
    /// `daily`, `weekly` or `custom`.
    pub publish_interval: String,
    /// Hours between posts when `publish_interval` is `custom`.
    pub custom_interval: u32,
    pub max_articles_per_day: u32,
}

impl Default for SchedulingSettings {
    fn default() -> Self {
        Self {
            publish_immediately: false,
            publish_interval: "daily".to_string(),
            custom_interval: 6,
            max_articles_per_day: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub openai_api_key: String,
    pub wp_server_api_url: String,
    pub wp_server_api_key: String,
    pub base_domain: String,
    pub default_wp_username: String,
    pub default_wp_password: String,
    pub default_wp_email: String,
    pub content_settings: ContentSettings,
    pub scheduling_settings: SchedulingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            wp_server_api_url: String::new(),
            wp_server_api_key: String::new(),
            base_domain: String::new(),
            default_wp_username: "admin".to_string(),
            default_wp_password: String::new(),
            default_wp_email: String::new(),
            content_settings: ContentSettings::default(),
            scheduling_settings: SchedulingSettings::default(),
        }
    }
}

/// Body of `POST /api/settings/save`. Blank or absent fields keep the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsUpdate {
    pub openai_api_key: Option<String>,
    pub wp_server_api_url: Option<String>,
    pub wp_server_api_key: Option<String>,
    pub base_domain: Option<String>,
    pub default_wp_username: Option<String>,
    pub default_wp_password: Option<String>,
    pub default_wp_email: Option<String>,
    pub content_settings: Option<ContentSettings>,
    pub scheduling_settings: Option<SchedulingSettings>,
}

/// Admin credentials handed to the provisioner for new sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminDefaults {
    pub username: String,
    pub password: String,
    pub email: String,
}

fn merge_plain(slot: &mut String, value: Option<String>) {
    if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
        *slot = v.trim().to_string();
    }
}

/// Like [`merge_plain`], but a masked value echoed back from the dashboard
/// leaves the secret alone.
fn merge_secret(slot: &mut String, value: Option<String>) {
    if let Some(v) = value.filter(|v| !v.trim().is_empty() && !v.starts_with(MASK_PREFIX)) {
        *slot = v.trim().to_string();
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

impl Settings {
    fn seeded(config: &GatewayConfig) -> Self {
        let mut settings = Settings::default();
        merge_secret(&mut settings.openai_api_key, config.llm_api_key.clone());
        merge_plain(&mut settings.wp_server_api_url, config.provisioner_url.clone());
        merge_secret(&mut settings.wp_server_api_key, config.provisioner_key.clone());
        merge_plain(&mut settings.base_domain, config.base_domain.clone());
        merge_plain(&mut settings.default_wp_username, config.default_wp_username.clone());
        merge_secret(&mut settings.default_wp_password, config.default_wp_password.clone());
        merge_plain(&mut settings.default_wp_email, config.default_wp_email.clone());
        settings
    }

    pub fn apply(&mut self, update: SettingsUpdate) {
        merge_secret(&mut self.openai_api_key, update.openai_api_key);
        merge_plain(&mut self.wp_server_api_url, update.wp_server_api_url);
        merge_secret(&mut self.wp_server_api_key, update.wp_server_api_key);
        merge_plain(&mut self.base_domain, update.base_domain);
        merge_plain(&mut self.default_wp_username, update.default_wp_username);
        merge_secret(&mut self.default_wp_password, update.default_wp_password);
        merge_plain(&mut self.default_wp_email, update.default_wp_email);
        if let Some(content) = update.content_settings {
            self.content_settings = content;
        }
        if let Some(scheduling) = update.scheduling_settings {
            self.scheduling_settings = scheduling;
        }
    }

    /// Copy safe to send to the browser.
    pub fn masked(&self) -> Self {
        let mask = |s: &str| {
            if s.is_empty() {
                String::new()
            } else {
                mask_secret(s)
            }
        };
        Self {
            openai_api_key: mask(&self.openai_api_key),
            wp_server_api_key: mask(&self.wp_server_api_key),
            default_wp_password: mask(&self.default_wp_password),
            ..self.clone()
        }
    }

    /// Provisioner base URL (without trailing slash) and key.
    pub fn provisioner_target(&self) -> Result<(String, String), GatewayError> {
        match (
            non_blank(&self.wp_server_api_url),
            non_blank(&self.wp_server_api_key),
        ) {
            (Some(url), Some(key)) => Ok((url.trim_end_matches('/').to_string(), key.to_string())),
            _ => Err(GatewayError::MissingServerConfig),
        }
    }

    pub fn llm_key(&self) -> Result<String, GatewayError> {
        non_blank(&self.openai_api_key)
            .map(str::to_string)
            .ok_or(GatewayError::MissingLlmKey)
    }

    pub fn admin_defaults(&self) -> AdminDefaults {
        AdminDefaults {
            username: non_blank(&self.default_wp_username)
                .unwrap_or("admin")
                .to_string(),
            password: non_blank(&self.default_wp_password)
                .unwrap_or("password")
                .to_string(),
            email: non_blank(&self.default_wp_email)
                .unwrap_or("admin@example.com")
                .to_string(),
        }
    }
}

/// In-memory settings guarded by a lock, written through to disk on save.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    inner: RwLock<Settings>,
}

impl SettingsStore {
    /// Load the file at `path`, or seed from `config` when it does not exist.
    pub async fn open(path: impl Into<PathBuf>, config: &GatewayConfig) -> Result<Self, GatewayError> {
        let path = path.into();
        let settings = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| GatewayError::SettingsRead {
                path: path.clone(),
                message: e.to_string(),
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file yet, seeding from config");
                Settings::seeded(config)
            }
            Err(e) => {
                return Err(GatewayError::SettingsRead {
                    path,
                    message: e.to_string(),
                });
            }
        };
        Ok(Self {
            path,
            inner: RwLock::new(settings),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn current(&self) -> Settings {
        self.inner.read().await.clone()
    }

    /// Merge `update`, persist, and only then make it visible.
    pub async fn save(&self, update: SettingsUpdate) -> Result<Settings, GatewayError> {
        let mut guard = self.inner.write().await;
        let mut next = guard.clone();
        next.apply(update);
        persist(&self.path, &next).await?;
        *guard = next.clone();
        tracing::info!(path = %self.path.display(), "settings saved");
        Ok(next)
    }
}

async fn persist(path: &Path, settings: &Settings) -> Result<(), GatewayError> {
    let write_err = |source| GatewayError::SettingsWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    let json = serde_json::to_vec_pretty(settings)
        .map_err(|e| write_err(std::io::Error::new(ErrorKind::InvalidData, e)))?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await.map_err(write_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(write_err)
}
