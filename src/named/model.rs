use serde::{Deserialize, Serialize};

use crate::markers::coordinates::WorldPosition;
use crate::markers::model::MapPosition;
use crate::timers::duration::ParsedDuration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Catalog record for a named mob. Read-only from the engine's side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedEntity {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    /// Free text such as `"15-20 minutes"` or `"900 seconds"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respawn_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_position: Option<MapPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_position: Option<WorldPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codex_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drops: Vec<DropEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl EntityFilter {
    pub fn matches(&self, entity: &NamedEntity) -> bool {
        if let Some(level) = self.level {
            if entity.level != Some(level) {
                return false;
            }
        }

        let Some(search) = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        else {
            return true;
        };

        entity.name.to_lowercase().contains(&search.to_lowercase())
    }
}

/// Kill record for one entity on one server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespawnTimer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_id: Option<u64>,
    pub entity_id: u64,
    pub server: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_killed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respawn_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl RespawnTimer {
    pub fn from_kill(
        entity_id: u64,
        server: &str,
        killed_at: i64,
        respawn_duration: &ParsedDuration,
    ) -> Self {
        Self {
            timer_id: None,
            entity_id,
            server: server.to_string(),
            last_killed_at: Some(killed_at),
            respawn_at: Some(killed_at.saturating_add(respawn_duration.min_seconds())),
            player_name: None,
            notes: None,
        }
    }

    pub fn apply_annotation(&mut self, annotation: &TimerAnnotation) {
        if let Some(notes) = annotation.notes.as_ref() {
            self.notes = Some(notes.clone());
        }
        if let Some(player_name) = annotation.player_name.as_ref() {
            self.player_name = Some(player_name.clone());
        }
    }
}

/// Active timer joined with the catalog fields the timer list displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTimer {
    pub timer_id: u64,
    pub entity_id: u64,
    pub entity_name: String,
    pub server: String,
    pub last_killed_at: i64,
    pub respawn_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respawn_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ActiveTimer {
    pub fn to_respawn_timer(&self) -> RespawnTimer {
        RespawnTimer {
            timer_id: Some(self.timer_id),
            entity_id: self.entity_id,
            server: self.server.clone(),
            last_killed_at: Some(self.last_killed_at),
            respawn_at: Some(self.respawn_at),
            player_name: self.player_name.clone(),
            notes: self.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTimerRequest {
    pub entity_id: u64,
    pub server: String,
    /// Defaults to the authority's current time when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub killed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTimerReceipt {
    pub timer_id: u64,
    pub respawn_at: i64,
    pub minutes_until_respawn: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerAnnotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
}
