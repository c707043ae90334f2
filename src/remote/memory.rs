use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::markers::model::{Marker, MarkerOrigin, MarkerPatch};
use crate::named::model::{
    ActiveTimer, EntityFilter, NamedEntity, StartTimerReceipt, StartTimerRequest, TimerAnnotation,
};
use crate::timers::clock::now_epoch_seconds;
use crate::timers::duration::{parse_respawn_duration, MARKER_FALLBACK_MINUTES};

use super::{MarkerApi, NamedEntityApi, RemoteError};

const FIRST_MARKER_ID: u64 = 10_001;

fn lock_state<'a, T>(state: &'a Mutex<T>, label: &str) -> Result<MutexGuard<'a, T>, RemoteError> {
    state
        .lock()
        .map_err(|error| RemoteError::Unavailable(format!("{label} lock poisoned: {error}")))
}

#[derive(Debug)]
struct MarkerTable {
    markers: BTreeMap<u64, Marker>,
    next_id: u64,
    available: bool,
}

/// In-process marker authority. Switch it offline to simulate an unreachable
/// backend.
#[derive(Debug)]
pub struct MemoryMarkerApi {
    table: Mutex<MarkerTable>,
}

impl Default for MemoryMarkerApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMarkerApi {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(MarkerTable {
                markers: BTreeMap::new(),
                next_id: FIRST_MARKER_ID,
                available: true,
            }),
        }
    }

    pub fn with_markers(markers: Vec<Marker>) -> Self {
        let api = Self::new();
        for marker in markers {
            api.put_marker(marker);
        }
        api
    }

    pub fn set_available(&self, available: bool) {
        if let Ok(mut table) = self.table.lock() {
            table.available = available;
        }
    }

    /// Writes a marker directly, as another client would. Markers without an
    /// id get the next free one.
    pub fn put_marker(&self, mut marker: Marker) -> Option<u64> {
        let mut table = self.table.lock().ok()?;
        let id = match marker.id {
            Some(id) => id,
            None => {
                let id = table.next_id;
                table.next_id += 1;
                id
            }
        };
        table.next_id = table.next_id.max(id + 1);
        marker.id = Some(id);
        marker.origin = MarkerOrigin::UserCreated;
        table.markers.insert(id, marker);
        Some(id)
    }

    pub fn remove_marker(&self, id: u64) -> Option<Marker> {
        self.table.lock().ok()?.markers.remove(&id)
    }

    pub fn snapshot(&self) -> Vec<Marker> {
        self.table
            .lock()
            .map(|table| table.markers.values().cloned().collect())
            .unwrap_or_default()
    }

    fn online_table(&self) -> Result<MutexGuard<'_, MarkerTable>, RemoteError> {
        let table = lock_state(&self.table, "marker table")?;
        if !table.available {
            return Err(RemoteError::Unavailable(
                "marker authority is offline".to_string(),
            ));
        }
        Ok(table)
    }
}

impl MarkerApi for MemoryMarkerApi {
    async fn list(&self) -> Result<Vec<Marker>, RemoteError> {
        let table = self.online_table()?;
        Ok(table.markers.values().cloned().collect())
    }

    async fn create(&self, mut marker: Marker) -> Result<Marker, RemoteError> {
        let mut table = self.online_table()?;
        if marker.id.is_some() {
            return Err(RemoteError::Rejected(
                "new markers must not carry an id".to_string(),
            ));
        }

        let id = table.next_id;
        table.next_id += 1;
        marker.id = Some(id);
        marker.origin = MarkerOrigin::UserCreated;
        table.markers.insert(id, marker.clone());
        Ok(marker)
    }

    async fn update(&self, id: u64, patch: MarkerPatch) -> Result<Marker, RemoteError> {
        let mut table = self.online_table()?;
        let Some(marker) = table.markers.get_mut(&id) else {
            return Err(RemoteError::NotFound { kind: "marker", id });
        };

        marker.apply_patch(&patch);
        Ok(marker.clone())
    }

    async fn delete(&self, id: u64) -> Result<(), RemoteError> {
        let mut table = self.online_table()?;
        table
            .markers
            .remove(&id)
            .map(|_| ())
            .ok_or(RemoteError::NotFound { kind: "marker", id })
    }
}

#[derive(Debug)]
struct NamedEntityTable {
    entities: BTreeMap<u64, NamedEntity>,
    timers: BTreeMap<u64, ActiveTimer>,
    next_timer_id: u64,
    available: bool,
}

/// In-process named-entity authority backed by a fixed catalog.
#[derive(Debug)]
pub struct MemoryNamedEntityApi {
    table: Mutex<NamedEntityTable>,
}

impl MemoryNamedEntityApi {
    pub fn new(catalog: Vec<NamedEntity>) -> Self {
        let entities = catalog
            .into_iter()
            .map(|entity| (entity.id, entity))
            .collect();

        Self {
            table: Mutex::new(NamedEntityTable {
                entities,
                timers: BTreeMap::new(),
                next_timer_id: 1,
                available: true,
            }),
        }
    }

    pub fn set_available(&self, available: bool) {
        if let Ok(mut table) = self.table.lock() {
            table.available = available;
        }
    }

    fn online_table(&self) -> Result<MutexGuard<'_, NamedEntityTable>, RemoteError> {
        let table = lock_state(&self.table, "named entity table")?;
        if !table.available {
            return Err(RemoteError::Unavailable(
                "named entity authority is offline".to_string(),
            ));
        }
        Ok(table)
    }
}

impl NamedEntityApi for MemoryNamedEntityApi {
    async fn list(&self, filter: EntityFilter) -> Result<Vec<NamedEntity>, RemoteError> {
        let table = self.online_table()?;
        Ok(table
            .entities
            .values()
            .filter(|entity| filter.matches(entity))
            .cloned()
            .collect())
    }

    async fn active_timers(&self, server: String) -> Result<Vec<ActiveTimer>, RemoteError> {
        let table = self.online_table()?;
        let mut timers = table
            .timers
            .values()
            .filter(|timer| timer.server == server)
            .cloned()
            .collect::<Vec<ActiveTimer>>();
        timers.sort_by_key(|timer| timer.respawn_at);
        Ok(timers)
    }

    async fn start_timer(
        &self,
        request: StartTimerRequest,
    ) -> Result<StartTimerReceipt, RemoteError> {
        let mut table = self.online_table()?;
        if request.server.trim().is_empty() {
            return Err(RemoteError::Rejected("server name is required".to_string()));
        }

        let Some(entity) = table.entities.get(&request.entity_id).cloned() else {
            return Err(RemoteError::NotFound {
                kind: "named entity",
                id: request.entity_id,
            });
        };

        table.timers.retain(|_, timer| {
            timer.entity_id != request.entity_id || timer.server != request.server
        });

        let respawn_duration =
            parse_respawn_duration(entity.respawn_text.as_deref(), MARKER_FALLBACK_MINUTES);
        let killed_at = request.killed_at.unwrap_or_else(now_epoch_seconds);
        let respawn_at = killed_at.saturating_add(respawn_duration.min_seconds());

        let timer_id = table.next_timer_id;
        table.next_timer_id += 1;
        table.timers.insert(
            timer_id,
            ActiveTimer {
                timer_id,
                entity_id: entity.id,
                entity_name: entity.name,
                server: request.server,
                last_killed_at: killed_at,
                respawn_at,
                respawn_text: entity.respawn_text,
                player_name: request.player_name,
                notes: request.notes,
            },
        );

        Ok(StartTimerReceipt {
            timer_id,
            respawn_at,
            minutes_until_respawn: i64::from(respawn_duration.min_minutes),
        })
    }

    async fn update_timer(
        &self,
        timer_id: u64,
        annotation: TimerAnnotation,
    ) -> Result<(), RemoteError> {
        let mut table = self.online_table()?;
        let Some(timer) = table.timers.get_mut(&timer_id) else {
            return Err(RemoteError::NotFound {
                kind: "respawn timer",
                id: timer_id,
            });
        };

        if let Some(notes) = annotation.notes {
            timer.notes = Some(notes);
        }
        if let Some(player_name) = annotation.player_name {
            timer.player_name = Some(player_name);
        }
        Ok(())
    }

    async fn delete_timer(&self, timer_id: u64) -> Result<(), RemoteError> {
        let mut table = self.online_table()?;
        table
            .timers
            .remove(&timer_id)
            .map(|_| ())
            .ok_or(RemoteError::NotFound {
                kind: "respawn timer",
                id: timer_id,
            })
    }
}
