use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::markers::alert::DEFAULT_GATHER_ALERT_SECONDS;
use crate::markers::filter::RECENTLY_SPAWNED_GRACE_SECONDS;
use crate::named::status::SOON_THRESHOLD_SECONDS;
use crate::remote::file::write_json_atomically;
use crate::timers::duration::{MARKER_FALLBACK_MINUTES, PROGRESS_FALLBACK_MINUTES};

const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 120;
const DEFAULT_ENTITY_REFRESH_INTERVAL_SECS: u64 = 60;
const DEFAULT_REDRAW_INTERVAL_SECS: u64 = 1;
const DEFAULT_SERVER_NAME: &str = "default";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineSettings {
    pub reconcile_interval_secs: u64,
    pub entity_refresh_interval_secs: u64,
    pub redraw_interval_secs: u64,
    pub gather_alert_seconds: i64,
    pub marker_fallback_minutes: u32,
    pub progress_fallback_minutes: u32,
    pub soon_threshold_seconds: i64,
    pub recently_spawned_grace_seconds: i64,
    pub server_name: String,
    pub marker_store_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_entity_catalog_path: Option<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            reconcile_interval_secs: DEFAULT_RECONCILE_INTERVAL_SECS,
            entity_refresh_interval_secs: DEFAULT_ENTITY_REFRESH_INTERVAL_SECS,
            redraw_interval_secs: DEFAULT_REDRAW_INTERVAL_SECS,
            gather_alert_seconds: DEFAULT_GATHER_ALERT_SECONDS,
            marker_fallback_minutes: MARKER_FALLBACK_MINUTES,
            progress_fallback_minutes: PROGRESS_FALLBACK_MINUTES,
            soon_threshold_seconds: SOON_THRESHOLD_SECONDS,
            recently_spawned_grace_seconds: RECENTLY_SPAWNED_GRACE_SECONDS,
            server_name: DEFAULT_SERVER_NAME.to_string(),
            marker_store_path: PathBuf::from("markers.json"),
            named_entity_catalog_path: None,
        }
    }
}

impl EngineSettings {
    /// Replaces values that would stall or invert the engine with defaults.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();

        if self.reconcile_interval_secs == 0 {
            self.reconcile_interval_secs = defaults.reconcile_interval_secs;
        }
        if self.entity_refresh_interval_secs == 0 {
            self.entity_refresh_interval_secs = defaults.entity_refresh_interval_secs;
        }
        if self.redraw_interval_secs == 0 {
            self.redraw_interval_secs = defaults.redraw_interval_secs;
        }
        if self.gather_alert_seconds < 0 {
            self.gather_alert_seconds = defaults.gather_alert_seconds;
        }
        if self.marker_fallback_minutes == 0 {
            self.marker_fallback_minutes = defaults.marker_fallback_minutes;
        }
        if self.progress_fallback_minutes == 0 {
            self.progress_fallback_minutes = defaults.progress_fallback_minutes;
        }
        if self.soon_threshold_seconds < 0 {
            self.soon_threshold_seconds = defaults.soon_threshold_seconds;
        }
        if self.recently_spawned_grace_seconds < 0 {
            self.recently_spawned_grace_seconds = defaults.recently_spawned_grace_seconds;
        }

        let trimmed_server_name = self.server_name.trim();
        self.server_name = if trimmed_server_name.is_empty() {
            defaults.server_name
        } else {
            trimmed_server_name.to_string()
        };

        self
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    pub fn entity_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.entity_refresh_interval_secs)
    }

    pub fn redraw_interval(&self) -> Duration {
        Duration::from_secs(self.redraw_interval_secs)
    }
}

/// Reads settings from `path`. A missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<EngineSettings, String> {
    let raw_json = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            tracing::info!(
                settings_path = %path.display(),
                "Settings file not found, using defaults"
            );
            return Ok(EngineSettings::default());
        }
        Err(error) => {
            return Err(format!(
                "Failed to read settings '{}': {error}",
                path.display()
            ));
        }
    };

    let settings = serde_json::from_str::<EngineSettings>(&raw_json)
        .map_err(|error| format!("Failed to parse settings '{}': {error}", path.display()))?;

    Ok(settings.normalized())
}

pub fn save_settings(path: &Path, settings: &EngineSettings) -> Result<(), String> {
    let serialized = serde_json::to_string_pretty(settings)
        .map_err(|error| format!("Failed to serialize settings: {error}"))?;

    write_json_atomically(path, &serialized)
}
