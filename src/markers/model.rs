use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapPosition {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerOrigin {
    /// Placed by a player and persisted through the marker collaborator.
    #[default]
    UserCreated,
    /// Projected from the named-entity catalog. Read-only for the marker feed.
    NamedEntity,
}

/// Store key. User-created ids and named-entity ids live in separate spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "origin", content = "id", rename_all = "camelCase")]
pub enum MarkerKey {
    User(u64),
    NamedEntity(u64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub position: MapPosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub resource_type: String,
    pub rarity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_game_coord: Option<String>,
    pub start_time: i64,
    pub target_time: i64,
    #[serde(default)]
    pub origin: MarkerOrigin,
}

impl Marker {
    pub fn key(&self) -> Option<MarkerKey> {
        let id = self.id?;
        Some(match self.origin {
            MarkerOrigin::UserCreated => MarkerKey::User(id),
            MarkerOrigin::NamedEntity => MarkerKey::NamedEntity(id),
        })
    }

    pub fn is_user_created(&self) -> bool {
        self.origin == MarkerOrigin::UserCreated
    }

    /// Compares every field the remote authority may change, ignoring identity.
    pub fn same_content(&self, other: &Marker) -> bool {
        self.position == other.position
            && self.label == other.label
            && self.resource_type == other.resource_type
            && self.rarity == other.rarity
            && self.in_game_coord == other.in_game_coord
            && self.start_time == other.start_time
            && self.target_time == other.target_time
    }

    pub fn overwrite_content_from(&mut self, other: &Marker) {
        self.position = other.position;
        self.label = other.label.clone();
        self.resource_type = other.resource_type.clone();
        self.rarity = other.rarity.clone();
        self.in_game_coord = other.in_game_coord.clone();
        self.start_time = other.start_time;
        self.target_time = other.target_time;
    }

    pub fn apply_patch(&mut self, patch: &MarkerPatch) {
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(label) = patch.label.as_ref() {
            self.label = label.clone();
        }
        if let Some(resource_type) = patch.resource_type.as_ref() {
            self.resource_type = resource_type.clone();
        }
        if let Some(rarity) = patch.rarity.as_ref() {
            self.rarity = rarity.clone();
        }
        if let Some(in_game_coord) = patch.in_game_coord.as_ref() {
            self.in_game_coord = in_game_coord.clone();
        }
        if let Some(start_time) = patch.start_time {
            self.start_time = start_time;
        }
        if let Some(target_time) = patch.target_time {
            self.target_time = target_time;
        }
    }
}

/// Partial marker update. `label: Some(None)` clears the label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<MapPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_game_coord: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_time: Option<i64>,
}

impl MarkerPatch {
    /// Restarts the marker timer at `now` for `timer_hours`, as the edit form does.
    pub fn restart_timer(now: i64, timer_hours: f64) -> Self {
        let timer_seconds = (timer_hours.max(0.0) * 3600.0).round() as i64;
        Self {
            start_time: Some(now),
            target_time: Some(now.saturating_add(timer_seconds)),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
