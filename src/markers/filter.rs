use serde::{Deserialize, Serialize};

use super::model::{Marker, MarkerOrigin};

/// Markers whose target passed less than this long ago still count as
/// "respawning soon" so freshly spawned nodes stay visible.
pub const RECENTLY_SPAWNED_GRACE_SECONDS: i64 = 3_600;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerFilter {
    #[serde(default)]
    pub resource_types: Vec<String>,
    #[serde(default)]
    pub rarities: Vec<String>,
    /// `0` disables the respawn window.
    #[serde(default)]
    pub respawn_within_minutes: u32,
    #[serde(default)]
    pub show_named_entities: bool,
}

impl MarkerFilter {
    pub fn matches(&self, marker: &Marker, now: i64, grace_seconds: i64) -> bool {
        if marker.origin == MarkerOrigin::NamedEntity {
            return self.show_named_entities;
        }

        let matches_resource =
            self.resource_types.is_empty() || self.resource_types.contains(&marker.resource_type);
        let matches_rarity = self.rarities.is_empty() || self.rarities.contains(&marker.rarity);

        matches_resource
            && matches_rarity
            && self.matches_respawn_window(marker, now, grace_seconds)
    }

    fn matches_respawn_window(&self, marker: &Marker, now: i64, grace_seconds: i64) -> bool {
        if self.respawn_within_minutes == 0 {
            return true;
        }

        let respawn_in = marker.target_time.saturating_sub(now);
        let window_seconds = i64::from(self.respawn_within_minutes) * 60;
        respawn_in > -grace_seconds && respawn_in < window_seconds
    }

    pub fn visible<'a>(
        &'a self,
        markers: impl Iterator<Item = &'a Marker> + 'a,
        now: i64,
        grace_seconds: i64,
    ) -> impl Iterator<Item = &'a Marker> + 'a {
        markers.filter(move |marker| self.matches(marker, now, grace_seconds))
    }
}
