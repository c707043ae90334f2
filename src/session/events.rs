use serde::Serialize;
use tokio::sync::mpsc;

use crate::markers::model::{Marker, MarkerKey};
use crate::named::model::RespawnTimer;
use crate::named::status::RespawnStatus;

/// Everything the render layer needs to mirror the session state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "kind",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum MapEvent {
    MarkerAdded {
        marker: Marker,
    },
    MarkerUpdated {
        marker: Marker,
    },
    MarkerRemoved {
        key: MarkerKey,
    },
    GatherAlertRaised {
        key: MarkerKey,
    },
    GatherAlertCleared {
        key: MarkerKey,
    },
    CountdownTick {
        key: MarkerKey,
        text: String,
        progress: f64,
    },
    OfflineNotice {
        message: String,
    },
    BackOnline,
    RespawnTimerChanged {
        entity_id: u64,
        server: String,
        timer: Option<RespawnTimer>,
        status: RespawnStatus,
        display_text: String,
    },
}

impl MapEvent {
    pub fn name(&self) -> &'static str {
        match self {
            MapEvent::MarkerAdded { .. } => "marker-added",
            MapEvent::MarkerUpdated { .. } => "marker-updated",
            MapEvent::MarkerRemoved { .. } => "marker-removed",
            MapEvent::GatherAlertRaised { .. } => "gather-alert-raised",
            MapEvent::GatherAlertCleared { .. } => "gather-alert-cleared",
            MapEvent::CountdownTick { .. } => "countdown-tick",
            MapEvent::OfflineNotice { .. } => "offline-notice",
            MapEvent::BackOnline => "back-online",
            MapEvent::RespawnTimerChanged { .. } => "respawn-timer-changed",
        }
    }
}

pub type MapEventSender = mpsc::UnboundedSender<MapEvent>;
pub type MapEventReceiver = mpsc::UnboundedReceiver<MapEvent>;

pub(super) fn emit_map_event(sender: &MapEventSender, event: MapEvent) {
    let event_name = event.name();
    if let Err(error) = sender.send(event) {
        tracing::debug!("Failed to emit {event_name} event: {error}");
    }
}
