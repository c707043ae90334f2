pub mod connectivity;
pub mod events;
pub mod ticks;

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::markers::alert::{AlertTracker, AlertTransition};
use crate::markers::filter::MarkerFilter;
use crate::markers::model::{Marker, MarkerKey, MarkerPatch};
use crate::markers::reconcile::{merge_remote_snapshot, MergeReport};
use crate::markers::store::MarkerStore;
use crate::named::book::RespawnTimerBook;
use crate::named::markers::named_entity_marker;
use crate::named::model::{
    EntityFilter, NamedEntity, RespawnTimer, StartTimerReceipt, StartTimerRequest, TimerAnnotation,
};
use crate::named::status::{progress_shadow, RespawnStatus};
use crate::remote::{MarkerApi, NamedEntityApi, RemoteError};
use crate::settings::EngineSettings;
use crate::timers::clock::{format_countdown, now_epoch_seconds, progress, remaining};
use crate::timers::duration::parse_respawn_duration;

use self::connectivity::{ConnectivityNotice, OFFLINE_NOTICE_MESSAGE};
use self::events::{emit_map_event, MapEvent, MapEventReceiver, MapEventSender};
use self::ticks::TickSubscription;

/// Mutable session state. Every tick and user action goes through one lock so
/// alert and connectivity edges are computed against a consistent view.
#[derive(Debug, Default)]
pub struct MapState {
    pub store: MarkerStore,
    pub alerts: AlertTracker,
    pub connectivity: ConnectivityNotice,
    pub respawn_book: RespawnTimerBook,
    pub named_catalog: Vec<NamedEntity>,
}

struct SessionCore<M, N> {
    state: Mutex<MapState>,
    marker_api: M,
    named_api: N,
    settings: EngineSettings,
    events: MapEventSender,
}

pub struct MapSession<M: MarkerApi, N: NamedEntityApi> {
    core: Arc<SessionCore<M, N>>,
    reconcile_tick: Option<TickSubscription>,
    entity_refresh_tick: Option<TickSubscription>,
    redraw_tick: Option<(MarkerKey, TickSubscription)>,
}

impl<M: MarkerApi, N: NamedEntityApi> MapSession<M, N> {
    pub fn new(marker_api: M, named_api: N, settings: EngineSettings) -> (Self, MapEventReceiver) {
        let (events, receiver) = mpsc::unbounded_channel();
        let core = SessionCore {
            state: Mutex::new(MapState::default()),
            marker_api,
            named_api,
            settings: settings.normalized(),
            events,
        };

        let session = Self {
            core: Arc::new(core),
            reconcile_tick: None,
            entity_refresh_tick: None,
            redraw_tick: None,
        };

        (session, receiver)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.core.settings
    }

    pub fn marker_api(&self) -> &M {
        &self.core.marker_api
    }

    pub fn named_api(&self) -> &N {
        &self.core.named_api
    }

    pub async fn reconcile_once(&self, now: i64) -> Result<MergeReport, RemoteError> {
        self.core.reconcile(now).await
    }

    pub fn start_reconciliation(&mut self) {
        let core = Arc::clone(&self.core);
        self.reconcile_tick = Some(TickSubscription::spawn(
            "reconcile",
            self.core.settings.reconcile_interval(),
            move || {
                let core = Arc::clone(&core);
                async move {
                    let _ = core.reconcile(now_epoch_seconds()).await;
                }
            },
        ));
    }

    pub async fn refresh_named_entities(&self, now: i64) -> Result<usize, RemoteError> {
        self.core.refresh_named_entities(now).await
    }

    pub fn start_entity_refresh(&mut self) {
        let core = Arc::clone(&self.core);
        self.entity_refresh_tick = Some(TickSubscription::spawn(
            "entity-refresh",
            self.core.settings.entity_refresh_interval(),
            move || {
                let core = Arc::clone(&core);
                async move {
                    let _ = core.refresh_named_entities(now_epoch_seconds()).await;
                }
            },
        ));
    }

    /// Starts the per-second countdown for `key`, replacing any marker that
    /// was observed before.
    pub fn observe_marker(&mut self, key: MarkerKey) {
        let core = Arc::clone(&self.core);
        let subscription = TickSubscription::spawn(
            "redraw",
            self.core.settings.redraw_interval(),
            move || {
                let core = Arc::clone(&core);
                async move {
                    core.emit_countdown(key, now_epoch_seconds()).await;
                }
            },
        );
        self.redraw_tick = Some((key, subscription));
    }

    pub fn stop_observing(&mut self) {
        self.redraw_tick = None;
    }

    pub fn observed_marker(&self) -> Option<MarkerKey> {
        self.redraw_tick.as_ref().map(|(key, _)| *key)
    }

    pub async fn create_marker(&self, marker: Marker, now: i64) -> Result<Marker, RemoteError> {
        self.core.create_marker(marker, now).await
    }

    pub async fn update_marker(
        &self,
        id: u64,
        patch: MarkerPatch,
        now: i64,
    ) -> Result<Marker, RemoteError> {
        self.core.update_marker(id, patch, now).await
    }

    pub async fn delete_marker(&self, id: u64, now: i64) -> Result<(), RemoteError> {
        self.core.delete_marker(id, now).await
    }

    pub async fn record_kill(
        &self,
        entity_id: u64,
        killed_at: i64,
        annotation: TimerAnnotation,
        now: i64,
    ) -> Result<StartTimerReceipt, RemoteError> {
        self.core
            .record_kill(entity_id, killed_at, annotation, now)
            .await
    }

    pub async fn annotate_kill(
        &self,
        entity_id: u64,
        annotation: TimerAnnotation,
        now: i64,
    ) -> Result<(), RemoteError> {
        self.core.annotate_kill(entity_id, annotation, now).await
    }

    pub async fn delete_kill(&self, entity_id: u64, now: i64) -> Result<(), RemoteError> {
        self.core.delete_kill(entity_id, now).await
    }

    pub async fn respawn_status(&self, entity_id: u64, now: i64) -> Option<RespawnStatus> {
        let state = self.core.state.lock().await;
        self.core.status_for(&state, entity_id, now)
    }

    pub async fn visible_markers(&self, filter: &MarkerFilter, now: i64) -> Vec<Marker> {
        let state = self.core.state.lock().await;
        filter
            .visible(
                state.store.all(),
                now,
                self.core.settings.recently_spawned_grace_seconds,
            )
            .cloned()
            .collect()
    }

    pub async fn marker(&self, key: MarkerKey) -> Option<Marker> {
        self.core.state.lock().await.store.find_by_id(key).cloned()
    }

    pub async fn is_offline(&self) -> bool {
        self.core.state.lock().await.connectivity.is_offline()
    }

    /// Cancels every running tick. Dropping the session does the same.
    pub fn shutdown(&mut self) {
        self.reconcile_tick = None;
        self.entity_refresh_tick = None;
        self.redraw_tick = None;
    }
}

impl<M: MarkerApi, N: NamedEntityApi> SessionCore<M, N> {
    fn emit(&self, event: MapEvent) {
        emit_map_event(&self.events, event);
    }

    async fn reconcile(&self, now: i64) -> Result<MergeReport, RemoteError> {
        // Held across the fetch so a marker created mid-fetch is not removed
        // by a snapshot that predates it.
        let mut state = self.state.lock().await;

        let remote_snapshot = match self.marker_api.list().await {
            Ok(markers) => markers,
            Err(error) => {
                tracing::warn!(error = %error, "Failed to fetch remote markers");
                if state.connectivity.mark_failure() {
                    self.emit(MapEvent::OfflineNotice {
                        message: OFFLINE_NOTICE_MESSAGE.to_string(),
                    });
                }
                return Err(error);
            }
        };

        if state.connectivity.mark_success() {
            tracing::info!("Marker server reachable again");
            self.emit(MapEvent::BackOnline);
        }

        let report = merge_remote_snapshot(&mut state.store, remote_snapshot);
        for marker in &report.added {
            self.emit(MapEvent::MarkerAdded {
                marker: marker.clone(),
            });
        }
        for marker in &report.updated {
            self.emit(MapEvent::MarkerUpdated {
                marker: marker.clone(),
            });
        }
        for marker in &report.removed {
            if let Some(key) = marker.key() {
                self.emit(MapEvent::MarkerRemoved { key });
            }
        }

        self.evaluate_alerts(&mut state, now);
        Ok(report)
    }

    async fn refresh_named_entities(&self, now: i64) -> Result<usize, RemoteError> {
        let mut state = self.state.lock().await;
        let server = self.settings.server_name.clone();

        let catalog = match self.named_api.list(EntityFilter::default()).await {
            Ok(entities) => entities,
            Err(error) => {
                tracing::warn!(error = %error, "Failed to fetch named entity catalog");
                return Err(error);
            }
        };
        let active_timers = match self.named_api.active_timers(server.clone()).await {
            Ok(timers) => timers,
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    server = %server,
                    "Failed to fetch active respawn timers"
                );
                return Err(error);
            }
        };

        let remote_timers = active_timers
            .iter()
            .map(|active_timer| active_timer.to_respawn_timer())
            .collect::<Vec<RespawnTimer>>();
        let changed_entity_ids = state.respawn_book.sync_server(&server, remote_timers);
        state.named_catalog = catalog;

        for entity_id in changed_entity_ids {
            self.emit_respawn_timer_changed(&state, entity_id, now);
        }

        let named_markers = state
            .named_catalog
            .iter()
            .filter_map(|entity| {
                named_entity_marker(
                    entity,
                    state.respawn_book.get(entity.id, &server),
                    self.settings.marker_fallback_minutes,
                )
            })
            .collect::<Vec<Marker>>();
        let marker_count = named_markers.len();

        let previous_markers = named_markers
            .iter()
            .map(|marker| {
                marker
                    .key()
                    .and_then(|key| state.store.find_by_id(key).cloned())
            })
            .collect::<Vec<Option<Marker>>>();
        let dropped = state.store.replace_named_entities(named_markers.clone());

        for (marker, previous_marker) in named_markers.into_iter().zip(previous_markers) {
            match previous_marker {
                None => self.emit(MapEvent::MarkerAdded { marker }),
                Some(previous_marker) if previous_marker != marker => {
                    self.emit(MapEvent::MarkerUpdated { marker })
                }
                Some(_) => {}
            }
        }
        for marker in dropped {
            if let Some(key) = marker.key() {
                self.emit(MapEvent::MarkerRemoved { key });
            }
        }

        self.evaluate_alerts(&mut state, now);
        tracing::debug!(
            named_markers = marker_count,
            server = %server,
            "Refreshed named entities"
        );
        Ok(marker_count)
    }

    async fn emit_countdown(&self, key: MarkerKey, now: i64) {
        let state = self.state.lock().await;
        let Some(marker) = state.store.find_by_id(key) else {
            return;
        };

        let fill = match key {
            MarkerKey::User(_) if marker.target_time < marker.start_time => {
                tracing::warn!(marker_key = ?key, "Marker target precedes its start");
                1.0
            }
            MarkerKey::User(_) => progress(marker.start_time, marker.target_time, now),
            MarkerKey::NamedEntity(entity_id) => {
                let last_killed_at = state
                    .respawn_book
                    .get(entity_id, &self.settings.server_name)
                    .and_then(|timer| timer.last_killed_at);
                let respawn_minutes = self.respawn_minutes(
                    &state,
                    entity_id,
                    self.settings.progress_fallback_minutes,
                );
                progress_shadow(last_killed_at, respawn_minutes, now).unwrap_or(0.0)
            }
        };

        self.emit(MapEvent::CountdownTick {
            key,
            text: format_countdown(remaining(marker.target_time, now)),
            progress: fill,
        });
    }

    async fn create_marker(&self, marker: Marker, now: i64) -> Result<Marker, RemoteError> {
        let mut state = self.state.lock().await;

        let created = self.marker_api.create(marker).await.map_err(|error| {
            tracing::warn!(error = %error, "Failed to create marker");
            error
        })?;

        let Some(id) = created.id else {
            return Err(RemoteError::Malformed(
                "created marker came back without an id".to_string(),
            ));
        };

        state.store.insert(created.clone());
        tracing::info!(
            marker_id = id,
            resource_type = %created.resource_type,
            "Created marker"
        );
        self.emit(MapEvent::MarkerAdded {
            marker: created.clone(),
        });
        self.evaluate_alerts(&mut state, now);
        Ok(created)
    }

    async fn update_marker(
        &self,
        id: u64,
        patch: MarkerPatch,
        now: i64,
    ) -> Result<Marker, RemoteError> {
        let mut state = self.state.lock().await;

        let updated = self.marker_api.update(id, patch).await.map_err(|error| {
            tracing::warn!(marker_id = id, error = %error, "Failed to update marker");
            error
        })?;

        let event = if state.store.contains(MarkerKey::User(id)) {
            MapEvent::MarkerUpdated {
                marker: updated.clone(),
            }
        } else {
            MapEvent::MarkerAdded {
                marker: updated.clone(),
            }
        };
        state.store.insert(updated.clone());
        self.emit(event);
        self.evaluate_alerts(&mut state, now);
        Ok(updated)
    }

    async fn delete_marker(&self, id: u64, now: i64) -> Result<(), RemoteError> {
        let mut state = self.state.lock().await;

        match self.marker_api.delete(id).await {
            Ok(()) => {}
            Err(RemoteError::NotFound { .. }) => {
                tracing::debug!(marker_id = id, "Marker already gone remotely");
            }
            Err(error) => {
                tracing::warn!(marker_id = id, error = %error, "Failed to delete marker");
                return Err(error);
            }
        }

        if state.store.remove_by_id(MarkerKey::User(id)).is_some() {
            self.emit(MapEvent::MarkerRemoved {
                key: MarkerKey::User(id),
            });
        }
        self.evaluate_alerts(&mut state, now);
        Ok(())
    }

    async fn record_kill(
        &self,
        entity_id: u64,
        killed_at: i64,
        annotation: TimerAnnotation,
        now: i64,
    ) -> Result<StartTimerReceipt, RemoteError> {
        let mut state = self.state.lock().await;
        let server = self.settings.server_name.clone();

        let request = StartTimerRequest {
            entity_id,
            server: server.clone(),
            killed_at: Some(killed_at),
            player_name: annotation.player_name.clone(),
            notes: annotation.notes.clone(),
        };
        let receipt = self.named_api.start_timer(request).await.map_err(|error| {
            tracing::warn!(entity_id, error = %error, "Failed to start respawn timer");
            error
        })?;

        let timer = RespawnTimer {
            timer_id: Some(receipt.timer_id),
            entity_id,
            server: server.clone(),
            last_killed_at: Some(killed_at),
            respawn_at: Some(receipt.respawn_at),
            player_name: annotation.player_name,
            notes: annotation.notes,
        };
        state.respawn_book.record_kill(timer);
        tracing::info!(
            entity_id,
            server = %server,
            timer_id = receipt.timer_id,
            respawn_at = receipt.respawn_at,
            "Recorded named entity kill"
        );

        self.emit_respawn_timer_changed(&state, entity_id, now);
        self.project_named_marker(&mut state, entity_id);
        self.evaluate_alerts(&mut state, now);
        Ok(receipt)
    }

    async fn annotate_kill(
        &self,
        entity_id: u64,
        annotation: TimerAnnotation,
        now: i64,
    ) -> Result<(), RemoteError> {
        let mut state = self.state.lock().await;
        let server = self.settings.server_name.clone();

        let timer_id = current_timer_id(&state, entity_id, &server)?;
        self.named_api
            .update_timer(timer_id, annotation.clone())
            .await
            .map_err(|error| {
                tracing::warn!(
                    entity_id,
                    timer_id,
                    error = %error,
                    "Failed to annotate respawn timer"
                );
                error
            })?;

        state.respawn_book.annotate(entity_id, &server, &annotation);
        self.emit_respawn_timer_changed(&state, entity_id, now);
        Ok(())
    }

    async fn delete_kill(&self, entity_id: u64, now: i64) -> Result<(), RemoteError> {
        let mut state = self.state.lock().await;
        let server = self.settings.server_name.clone();

        let timer_id = current_timer_id(&state, entity_id, &server)?;
        match self.named_api.delete_timer(timer_id).await {
            Ok(()) => {}
            Err(RemoteError::NotFound { .. }) => {
                tracing::debug!(entity_id, timer_id, "Respawn timer already gone remotely");
            }
            Err(error) => {
                tracing::warn!(
                    entity_id,
                    timer_id,
                    error = %error,
                    "Failed to delete respawn timer"
                );
                return Err(error);
            }
        }

        state.respawn_book.clear(entity_id, &server);
        self.emit_respawn_timer_changed(&state, entity_id, now);
        self.project_named_marker(&mut state, entity_id);
        self.evaluate_alerts(&mut state, now);
        Ok(())
    }

    fn respawn_minutes(&self, state: &MapState, entity_id: u64, fallback_minutes: u32) -> u32 {
        let entity = find_catalog_entity(state, entity_id);
        let respawn_text = entity.and_then(|entity| entity.respawn_text.as_deref());
        parse_respawn_duration(respawn_text, fallback_minutes).min_minutes
    }

    fn status_for(&self, state: &MapState, entity_id: u64, now: i64) -> Option<RespawnStatus> {
        find_catalog_entity(state, entity_id)?;

        let respawn_minutes =
            self.respawn_minutes(state, entity_id, self.settings.marker_fallback_minutes);
        Some(state.respawn_book.status_for(
            entity_id,
            &self.settings.server_name,
            respawn_minutes,
            now,
            self.settings.soon_threshold_seconds,
        ))
    }

    fn emit_respawn_timer_changed(&self, state: &MapState, entity_id: u64, now: i64) {
        let server = &self.settings.server_name;
        let timer = state.respawn_book.get(entity_id, server).cloned();
        let respawn_minutes =
            self.respawn_minutes(state, entity_id, self.settings.marker_fallback_minutes);
        let status = state.respawn_book.status_for(
            entity_id,
            server,
            respawn_minutes,
            now,
            self.settings.soon_threshold_seconds,
        );

        self.emit(MapEvent::RespawnTimerChanged {
            entity_id,
            server: server.clone(),
            timer,
            display_text: status.display_text(),
            status,
        });
    }

    /// Rebuilds the map marker of one named entity after its timer changed.
    fn project_named_marker(&self, state: &mut MapState, entity_id: u64) {
        let Some(entity) = find_catalog_entity(state, entity_id) else {
            tracing::debug!(entity_id, "Named entity not in the loaded catalog yet");
            return;
        };

        let server = &self.settings.server_name;
        let timer = state.respawn_book.get(entity_id, server);
        let fallback_minutes = self.settings.marker_fallback_minutes;
        let Some(marker) = named_entity_marker(entity, timer, fallback_minutes) else {
            return;
        };

        let key = MarkerKey::NamedEntity(entity_id);
        let event = match state.store.find_by_id(key) {
            Some(previous_marker) if *previous_marker == marker => return,
            Some(_) => MapEvent::MarkerUpdated {
                marker: marker.clone(),
            },
            None => MapEvent::MarkerAdded {
                marker: marker.clone(),
            },
        };

        state.store.insert(marker);
        self.emit(event);
    }

    fn evaluate_alerts(&self, state: &mut MapState, now: i64) {
        let MapState { store, alerts, .. } = state;
        for transition in alerts.evaluate(store, now, self.settings.gather_alert_seconds) {
            match transition {
                AlertTransition::Raised(key) => {
                    tracing::info!(marker_key = ?key, "Gather alert raised");
                    self.emit(MapEvent::GatherAlertRaised { key });
                }
                AlertTransition::Cleared(key) => {
                    self.emit(MapEvent::GatherAlertCleared { key });
                }
            }
        }
    }
}

fn find_catalog_entity(state: &MapState, entity_id: u64) -> Option<&NamedEntity> {
    state
        .named_catalog
        .iter()
        .find(|entity| entity.id == entity_id)
}

fn current_timer_id(state: &MapState, entity_id: u64, server: &str) -> Result<u64, RemoteError> {
    state
        .respawn_book
        .get(entity_id, server)
        .and_then(|timer| timer.timer_id)
        .ok_or(RemoteError::NotFound {
            kind: "respawn timer",
            id: entity_id,
        })
}

#[cfg(test)]
mod tests {
    use super::MapSession;
    use crate::markers::filter::MarkerFilter;
    use crate::markers::model::{MapPosition, Marker, MarkerKey, MarkerOrigin, MarkerPatch};
    use crate::named::model::{NamedEntity, TimerAnnotation};
    use crate::named::status::RespawnState;
    use crate::remote::{MemoryMarkerApi, MemoryNamedEntityApi, NamedEntityApi, RemoteError};
    use crate::session::events::{MapEvent, MapEventReceiver};
    use crate::settings::EngineSettings;
    use std::time::Duration;

    const NOW: i64 = 1_738_000_000;

    fn settings() -> EngineSettings {
        EngineSettings {
            server_name: "eu-1".to_string(),
            ..EngineSettings::default()
        }
    }

    fn marker(id: Option<u64>, target_time: i64) -> Marker {
        Marker {
            id,
            position: MapPosition {
                lat: -231.0,
                lng: 126.5,
            },
            label: None,
            resource_type: "giant_bluebell".to_string(),
            rarity: "epic".to_string(),
            in_game_coord: None,
            start_time: NOW - 3_600,
            target_time,
            origin: MarkerOrigin::UserCreated,
        }
    }

    fn wormwig() -> NamedEntity {
        NamedEntity {
            id: 7,
            name: "Wormwig".to_string(),
            slug: Some("wormwig".to_string()),
            level: Some(25),
            respawn_text: Some("20-25 minutes".to_string()),
            map_position: Some(MapPosition {
                lat: -235.619140625,
                lng: 137.396484375,
            }),
            world_position: None,
            codex_url: None,
            drops: Vec::new(),
            drop_category: None,
        }
    }

    fn session_with(
        marker_api: MemoryMarkerApi,
    ) -> (MapSession<MemoryMarkerApi, MemoryNamedEntityApi>, MapEventReceiver) {
        let named_api = MemoryNamedEntityApi::new(vec![wormwig()]);
        MapSession::new(marker_api, named_api, settings())
    }

    fn drain(events: &mut MapEventReceiver) -> Vec<MapEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = events.try_recv() {
            drained.push(event);
        }
        drained
    }

    fn count(events: &[MapEvent], name: &str) -> usize {
        events.iter().filter(|event| event.name() == name).count()
    }

    #[tokio::test]
    async fn offline_notice_is_edge_triggered() {
        let marker_api = MemoryMarkerApi::with_markers(vec![marker(Some(1), NOW + 7_200)]);
        let (session, mut events) = session_with(marker_api);
        session
            .reconcile_once(NOW)
            .await
            .expect("Expected initial reconcile to succeed");
        drain(&mut events);

        session.marker_api().set_available(false);
        for tick in 0..3 {
            let result = session.reconcile_once(NOW + tick).await;
            assert!(matches!(result, Err(RemoteError::Unavailable(_))));
        }
        let offline_events = drain(&mut events);

        assert_eq!(count(&offline_events, "offline-notice"), 1);
        assert_eq!(offline_events.len(), 1);
        assert!(session.is_offline().await);
        assert!(session.marker(MarkerKey::User(1)).await.is_some());

        session.marker_api().set_available(true);
        session
            .reconcile_once(NOW + 10)
            .await
            .expect("Expected reconcile to recover");
        session
            .reconcile_once(NOW + 20)
            .await
            .expect("Expected reconcile to succeed");

        assert_eq!(count(&drain(&mut events), "back-online"), 1);

        session.marker_api().set_available(false);
        let _ = session.reconcile_once(NOW + 30).await;
        assert_eq!(count(&drain(&mut events), "offline-notice"), 1);
    }

    #[tokio::test]
    async fn reconciliation_keeps_named_markers_and_pairs_events() {
        let (session, mut events) = session_with(MemoryMarkerApi::with_markers(vec![
            marker(Some(1), NOW + 7_200),
            marker(Some(2), NOW + 7_200),
        ]));
        session
            .refresh_named_entities(NOW)
            .await
            .expect("Expected named refresh to succeed");
        session
            .reconcile_once(NOW)
            .await
            .expect("Expected reconcile to succeed");
        drain(&mut events);

        let marker_api = session.marker_api();
        marker_api.remove_marker(2);
        marker_api.put_marker(marker(Some(3), NOW + 7_200));
        let report = session
            .reconcile_once(NOW + 120)
            .await
            .expect("Expected reconcile to succeed");
        let emitted = drain(&mut events);

        assert_eq!(report.change_count(), 2);
        assert!(emitted.contains(&MapEvent::MarkerRemoved {
            key: MarkerKey::User(2)
        }));
        assert_eq!(count(&emitted, "marker-added"), 1);
        assert!(session.marker(MarkerKey::NamedEntity(7)).await.is_some());
    }

    #[tokio::test]
    async fn gather_alert_fires_once_when_entering_the_window() {
        let marker_api = MemoryMarkerApi::with_markers(vec![marker(Some(1), NOW + 1_200)]);
        let (session, mut events) = session_with(marker_api);

        for now in [NOW, NOW + 400, NOW + 500, NOW + 1_300] {
            session
                .reconcile_once(now)
                .await
                .expect("Expected reconcile to succeed");
        }
        let emitted = drain(&mut events);

        assert_eq!(count(&emitted, "gather-alert-raised"), 1);
        assert_eq!(count(&emitted, "gather-alert-cleared"), 1);
    }

    #[tokio::test]
    async fn user_actions_update_store_before_emitting() {
        let (session, mut events) = session_with(MemoryMarkerApi::new());

        let created = session
            .create_marker(marker(None, NOW + 7_200), NOW)
            .await
            .expect("Expected create to succeed");
        let key = created
            .key()
            .expect("Expected created marker to have a key");
        assert_eq!(
            drain(&mut events),
            vec![MapEvent::MarkerAdded {
                marker: created.clone()
            }]
        );
        assert_eq!(session.marker(key).await, Some(created.clone()));

        let id = created.id.expect("Expected created marker to have an id");
        let updated = session
            .update_marker(id, MarkerPatch::restart_timer(NOW, 2.0), NOW)
            .await
            .expect("Expected update to succeed");
        assert_eq!(updated.target_time, NOW + 7_200);
        assert_eq!(count(&drain(&mut events), "marker-updated"), 1);

        session
            .delete_marker(id, NOW)
            .await
            .expect("Expected delete to succeed");
        assert_eq!(drain(&mut events), vec![MapEvent::MarkerRemoved { key }]);
        let filter = MarkerFilter::default();
        let visible = session.visible_markers(&filter, NOW).await;
        assert!(visible.is_empty());
    }

    #[tokio::test]
    async fn failed_create_leaves_the_store_untouched() {
        let (session, mut events) = session_with(MemoryMarkerApi::new());
        session.marker_api().set_available(false);

        let result = session.create_marker(marker(None, NOW + 60), NOW).await;

        assert!(result.is_err());
        assert!(drain(&mut events).is_empty());
        let filter = MarkerFilter::default();
        let visible = session.visible_markers(&filter, NOW).await;
        assert!(visible.is_empty());
    }

    #[tokio::test]
    async fn second_kill_supersedes_the_first_timer() {
        let (session, mut events) = session_with(MemoryMarkerApi::new());
        session
            .refresh_named_entities(NOW)
            .await
            .expect("Expected named refresh to succeed");
        drain(&mut events);

        let first = session
            .record_kill(7, NOW, TimerAnnotation::default(), NOW)
            .await
            .expect("Expected first kill to record");
        let second = session
            .record_kill(7, NOW + 600, TimerAnnotation::default(), NOW + 600)
            .await
            .expect("Expected second kill to record");
        let active = session
            .named_api()
            .active_timers("eu-1".to_string())
            .await
            .expect("Expected active timers to load");

        assert_ne!(first.timer_id, second.timer_id);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].timer_id, second.timer_id);

        let soon = session
            .respawn_status(7, NOW + 600 + 19 * 60)
            .await
            .expect("Expected status for a known entity");
        assert_eq!(soon.state, RespawnState::Soon);
        assert_eq!(soon.remaining_seconds, Some(60));

        let named_marker = session
            .marker(MarkerKey::NamedEntity(7))
            .await
            .expect("Expected named marker");
        assert_eq!(named_marker.target_time, NOW + 600 + 20 * 60);
        assert_eq!(count(&drain(&mut events), "respawn-timer-changed"), 2);
    }

    #[tokio::test]
    async fn backdated_kill_keeps_alerts_and_status_at_the_current_time() {
        let marker_api = MemoryMarkerApi::with_markers(vec![marker(Some(1), NOW + 600)]);
        let (session, mut events) = session_with(marker_api);
        session
            .refresh_named_entities(NOW)
            .await
            .expect("Expected named refresh to succeed");
        session
            .reconcile_once(NOW)
            .await
            .expect("Expected reconcile to succeed");

        session
            .record_kill(7, NOW - 18 * 60, TimerAnnotation::default(), NOW)
            .await
            .expect("Expected backdated kill to record");
        session
            .reconcile_once(NOW + 10)
            .await
            .expect("Expected reconcile to succeed");
        let emitted = drain(&mut events);

        assert_eq!(count(&emitted, "gather-alert-raised"), 1);
        assert_eq!(count(&emitted, "gather-alert-cleared"), 0);

        let changed_status = emitted.iter().find_map(|event| match event {
            MapEvent::RespawnTimerChanged {
                status,
                display_text,
                ..
            } => Some((*status, display_text.clone())),
            _ => None,
        });
        let (status, display_text) = changed_status.expect("Expected a respawn timer event");
        assert_eq!(status.state, RespawnState::Soon);
        assert_eq!(status.remaining_seconds, Some(120));
        assert_eq!(display_text, "2m");
    }

    #[tokio::test]
    async fn named_respawns_never_raise_gather_alerts() {
        let (session, mut events) = session_with(MemoryMarkerApi::new());
        session
            .refresh_named_entities(NOW)
            .await
            .expect("Expected named refresh to succeed");
        session
            .record_kill(7, NOW, TimerAnnotation::default(), NOW)
            .await
            .expect("Expected kill to record");
        drain(&mut events);

        session
            .reconcile_once(NOW + 600)
            .await
            .expect("Expected reconcile to succeed");
        let emitted = drain(&mut events);

        assert!(!emitted.contains(&MapEvent::GatherAlertRaised {
            key: MarkerKey::NamedEntity(7)
        }));
        assert_eq!(count(&emitted, "gather-alert-raised"), 0);
    }

    #[tokio::test]
    async fn deleting_a_kill_returns_to_never_recorded() {
        let (session, mut events) = session_with(MemoryMarkerApi::new());
        session
            .refresh_named_entities(NOW)
            .await
            .expect("Expected named refresh to succeed");
        session
            .record_kill(7, NOW, TimerAnnotation::default(), NOW)
            .await
            .expect("Expected kill to record");
        session
            .annotate_kill(
                7,
                TimerAnnotation {
                    notes: Some("tagged by guild".to_string()),
                    player_name: Some("Borin".to_string()),
                },
                NOW,
            )
            .await
            .expect("Expected annotation to succeed");
        drain(&mut events);

        session
            .delete_kill(7, NOW + 60)
            .await
            .expect("Expected delete to succeed");
        let status = session
            .respawn_status(7, NOW + 60)
            .await
            .expect("Expected status for a known entity");

        assert_eq!(status.remaining_seconds, None);
        assert_eq!(
            session.delete_kill(7, NOW + 60).await,
            Err(RemoteError::NotFound {
                kind: "respawn timer",
                id: 7
            })
        );
        let named_marker = session
            .marker(MarkerKey::NamedEntity(7))
            .await
            .expect("Expected named marker");
        assert_eq!(named_marker.target_time, 0);
        assert_eq!(count(&drain(&mut events), "marker-updated"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reconciliation_tick_stops_on_shutdown() {
        let (mut session, mut events) = session_with(MemoryMarkerApi::new());
        session.start_reconciliation();
        tokio::time::sleep(Duration::from_secs(1)).await;

        session.marker_api().put_marker(marker(None, i64::MAX / 2));
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(count(&drain(&mut events), "marker-added"), 1);

        session.shutdown();
        session.marker_api().put_marker(marker(None, i64::MAX / 2));
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn observing_a_marker_emits_countdown_until_stopped() {
        let (mut session, mut events) = session_with(MemoryMarkerApi::new());
        let created = session
            .create_marker(marker(None, i64::MAX / 2), NOW)
            .await
            .expect("Expected create to succeed");
        let key = created
            .key()
            .expect("Expected created marker to have a key");
        drain(&mut events);

        session.observe_marker(key);
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(session.observed_marker(), Some(key));
        assert_eq!(count(&drain(&mut events), "countdown-tick"), 3);

        session.stop_observing();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(drain(&mut events).is_empty());
    }
}
