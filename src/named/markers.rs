use crate::markers::coordinates::resolve_map_position;
use crate::markers::model::{Marker, MarkerOrigin};
use crate::timers::duration::parse_respawn_duration;

use super::model::{NamedEntity, RespawnTimer};

pub const NAMED_ENTITY_RESOURCE_TYPE: &str = "named_entity";
const DEFAULT_NAMED_RARITY: &str = "named";

/// Projects a catalog entry and its current timer onto the map layer.
///
/// Entities without any usable coordinate are skipped.
pub fn named_entity_marker(
    entity: &NamedEntity,
    timer: Option<&RespawnTimer>,
    fallback_minutes: u32,
) -> Option<Marker> {
    let resolved = resolve_map_position(entity.map_position, entity.world_position);
    let Some((position, _)) = resolved else {
        tracing::warn!(
            entity_id = entity.id,
            entity_name = %entity.name,
            "Skipping named entity without map or world coordinates"
        );
        return None;
    };

    let last_killed_at = timer.and_then(|timer| timer.last_killed_at);
    let (start_time, target_time) = match last_killed_at {
        Some(killed_at) => {
            let respawn_at = timer.and_then(|timer| timer.respawn_at).unwrap_or_else(|| {
                let duration =
                    parse_respawn_duration(entity.respawn_text.as_deref(), fallback_minutes);
                killed_at.saturating_add(duration.min_seconds())
            });
            (killed_at, respawn_at)
        }
        None => (0, 0),
    };

    Some(Marker {
        id: Some(entity.id),
        position,
        label: Some(entity.name.clone()),
        resource_type: NAMED_ENTITY_RESOURCE_TYPE.to_string(),
        rarity: entity
            .drop_category
            .clone()
            .unwrap_or_else(|| DEFAULT_NAMED_RARITY.to_string()),
        in_game_coord: entity
            .world_position
            .map(|world| format!("{:.0}, {:.0}", world.x, world.y)),
        start_time,
        target_time,
        origin: MarkerOrigin::NamedEntity,
    })
}
