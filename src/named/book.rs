use std::collections::BTreeMap;

use super::model::{RespawnTimer, TimerAnnotation};
use super::status::{status_with_soon_threshold, RespawnStatus};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct TimerSlot {
    entity_id: u64,
    server: String,
}

impl TimerSlot {
    fn new(entity_id: u64, server: &str) -> Self {
        Self {
            entity_id,
            server: server.to_string(),
        }
    }
}

/// Respawn timers with at most one live timer per (entity, server).
#[derive(Debug, Default)]
pub struct RespawnTimerBook {
    timers: BTreeMap<TimerSlot, RespawnTimer>,
}

impl RespawnTimerBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a kill, superseding whatever timer the slot held.
    pub fn record_kill(&mut self, timer: RespawnTimer) -> Option<RespawnTimer> {
        let slot = TimerSlot::new(timer.entity_id, &timer.server);
        let previous = self.timers.insert(slot, timer);

        if let Some(previous_timer) = previous.as_ref() {
            tracing::debug!(
                entity_id = previous_timer.entity_id,
                server = %previous_timer.server,
                previous_timer_id = ?previous_timer.timer_id,
                "Superseded respawn timer"
            );
        }

        previous
    }

    pub fn annotate(&mut self, entity_id: u64, server: &str, annotation: &TimerAnnotation) -> bool {
        let Some(timer) = self.timers.get_mut(&TimerSlot::new(entity_id, server)) else {
            return false;
        };

        timer.apply_annotation(annotation);
        true
    }

    pub fn clear(&mut self, entity_id: u64, server: &str) -> Option<RespawnTimer> {
        self.timers.remove(&TimerSlot::new(entity_id, server))
    }

    pub fn get(&self, entity_id: u64, server: &str) -> Option<&RespawnTimer> {
        self.timers.get(&TimerSlot::new(entity_id, server))
    }

    pub fn status_for(
        &self,
        entity_id: u64,
        server: &str,
        respawn_minutes: u32,
        now: i64,
        soon_threshold_seconds: i64,
    ) -> RespawnStatus {
        let last_killed_at = self
            .get(entity_id, server)
            .and_then(|timer| timer.last_killed_at);
        status_with_soon_threshold(last_killed_at, respawn_minutes, now, soon_threshold_seconds)
    }

    /// Replaces every timer of `server` with the remote view. Returns the
    /// entity ids whose timer appeared, changed or disappeared.
    pub fn sync_server(&mut self, server: &str, remote_timers: Vec<RespawnTimer>) -> Vec<u64> {
        let mut previous = BTreeMap::new();
        self.timers.retain(|slot, timer| {
            if slot.server != server {
                return true;
            }
            previous.insert(slot.entity_id, timer.clone());
            false
        });

        let mut changed_entity_ids = Vec::new();
        for timer in remote_timers {
            if timer.server != server {
                tracing::warn!(
                    entity_id = timer.entity_id,
                    expected_server = %server,
                    timer_server = %timer.server,
                    "Ignoring active timer reported for another server"
                );
                continue;
            }

            let entity_id = timer.entity_id;
            if previous.remove(&entity_id).as_ref() != Some(&timer) {
                changed_entity_ids.push(entity_id);
            }
            self.timers.insert(TimerSlot::new(entity_id, server), timer);
        }

        changed_entity_ids.extend(previous.into_keys());
        changed_entity_ids.sort_unstable();
        changed_entity_ids.dedup();
        changed_entity_ids
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
