//! Core settings management
//!
//! Stores non-secret configuration in a plain JSON file next to the durable
//! storage. Missing fields fall back to their defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{CoreError, Result};
use crate::storage::{storage_key, CORE_STORAGE_PREFIX, STORAGE_VERSION};

/// Default telemetry endpoint
pub const DEFAULT_TELEMETRY_ENDPOINT: &str = "https://pulse.walletconnect.org/batch";

/// Schema tag sent with every telemetry batch
pub const TELEMETRY_SCHEMA_TAG: &str = "events_sdk";

/// Telemetry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelemetrySettings {
    /// Whether events are recorded and submitted at all
    pub enabled: bool,
    /// Project id; submission is skipped without one
    pub project_id: Option<String>,
    pub endpoint: String,
    pub schema_tag: String,
    pub sdk_version: String,
    pub bundle_id: String,
    pub domain: String,
    /// Age after which events are dropped, resolved or not
    pub cleanup_window_secs: u64,
    pub heartbeat_interval_secs: u64,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            project_id: None,
            endpoint: DEFAULT_TELEMETRY_ENDPOINT.to_string(),
            schema_tag: TELEMETRY_SCHEMA_TAG.to_string(),
            sdk_version: format!("rust-{}", env!("CARGO_PKG_VERSION")),
            bundle_id: String::new(),
            domain: String::new(),
            cleanup_window_secs: 86_400,
            heartbeat_interval_secs: 5,
        }
    }
}

impl TelemetrySettings {
    pub fn cleanup_window(&self) -> Duration {
        Duration::from_secs(self.cleanup_window_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }

    /// Batch submission URL, if a project id is configured and the endpoint
    /// parses
    pub fn submit_url(&self) -> Option<String> {
        let project_id = self.project_id.as_deref().filter(|id| !id.is_empty())?;
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("projectId", project_id),
                ("st", self.schema_tag.as_str()),
                ("sv", self.sdk_version.as_str()),
            ],
        )
        .ok()
        .map(String::from)
    }
}

/// Core settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoreSettings {
    /// Settings file version
    pub version: u32,
    pub storage_prefix: String,
    pub storage_version: String,
    /// Scope inserted into every storage key, to isolate several clients
    /// sharing one storage backend
    pub custom_scope_id: String,
    pub telemetry: TelemetrySettings,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            version: 1,
            storage_prefix: CORE_STORAGE_PREFIX.to_string(),
            storage_version: STORAGE_VERSION.to_string(),
            custom_scope_id: String::new(),
            telemetry: TelemetrySettings::default(),
        }
    }
}

impl CoreSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage key for the collection named `name`
    pub fn storage_key(&self, name: &str) -> String {
        storage_key(
            &self.storage_prefix,
            &self.storage_version,
            &self.custom_scope_id,
            name,
        )
    }
}

/// Settings manager
pub struct SettingsManager {
    settings_file: PathBuf,
    settings: CoreSettings,
}

impl SettingsManager {
    /// Load settings from `storage_dir`, falling back to defaults
    pub fn new(storage_dir: &Path) -> Self {
        let settings_file = storage_dir.join("settings.json");
        let settings = match Self::load_from_file(&settings_file) {
            Ok(settings) => settings,
            Err(e) => {
                debug!("Ignoring unreadable settings file {:?}: {}", settings_file, e);
                CoreSettings::new()
            }
        };

        Self {
            settings_file,
            settings,
        }
    }

    fn load_from_file(path: &Path) -> Result<CoreSettings> {
        if !path.exists() {
            debug!("No settings file found, using defaults");
            return Ok(CoreSettings::new());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: CoreSettings = serde_json::from_str(&contents)?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub async fn save(&self) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.settings)?;

        if let Some(parent) = self.settings_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write atomically using temp file
        let temp_path = self.settings_file.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents).await?;
        tokio::fs::rename(&temp_path, &self.settings_file).await?;

        debug!("Saved settings to {:?}", self.settings_file);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.settings_file
    }

    pub fn get(&self) -> &CoreSettings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut CoreSettings {
        &mut self.settings
    }

    /// Update settings and save
    pub async fn update(&mut self, settings: CoreSettings) -> Result<()> {
        self.settings = settings;
        self.save().await
    }

    pub fn get_telemetry(&self) -> &TelemetrySettings {
        &self.settings.telemetry
    }

    /// Update telemetry settings and save
    pub async fn update_telemetry(&mut self, telemetry: TelemetrySettings) -> Result<()> {
        self.settings.telemetry = telemetry;
        self.save().await
    }

    /// Reset settings to defaults and delete the settings file
    pub async fn reset(&mut self) -> Result<()> {
        self.settings = CoreSettings::default();

        if self.settings_file.exists() {
            tokio::fs::remove_file(&self.settings_file)
                .await
                .map_err(|e| CoreError::StorageError(e.to_string()))?;
        }

        Ok(())
    }
}
