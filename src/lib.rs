pub mod markers;
pub mod named;
pub mod remote;
pub mod session;
pub mod settings;
pub mod timers;

use remote::{load_named_entity_catalog, JsonFileMarkerApi, MemoryNamedEntityApi};
use session::events::MapEvent;
use session::MapSession;
use settings::EngineSettings;
use timers::clock::{format_clock, format_timestamp};

/// Runs a session over the configured marker file and named-entity catalog,
/// logging every map event until Ctrl-C.
pub async fn run(settings: EngineSettings) -> Result<(), String> {
    let settings = settings.normalized();

    let catalog = match settings.named_entity_catalog_path.as_deref() {
        Some(catalog_path) => load_named_entity_catalog(catalog_path)?,
        None => {
            tracing::info!("No named entity catalog configured");
            Vec::new()
        }
    };

    let marker_api = JsonFileMarkerApi::new(settings.marker_store_path.clone());
    let named_api = MemoryNamedEntityApi::new(catalog);

    tracing::info!(
        marker_store = %settings.marker_store_path.display(),
        server = %settings.server_name,
        reconcile_interval_secs = settings.reconcile_interval_secs,
        entity_refresh_interval_secs = settings.entity_refresh_interval_secs,
        "Starting map session"
    );

    let (mut session, mut events) = MapSession::new(marker_api, named_api, settings);
    session.start_entity_refresh();
    session.start_reconciliation();

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(error) = signal {
                    tracing::error!("Failed to listen for Ctrl-C: {error}");
                }
                break;
            }
            event = events.recv() => {
                let Some(event) = event else {
                    break;
                };
                log_map_event(&event);
            }
        }
    }

    session.shutdown();
    tracing::info!("Map session stopped");
    Ok(())
}

fn log_map_event(event: &MapEvent) {
    match event {
        MapEvent::OfflineNotice { message } => tracing::warn!("{message}"),
        MapEvent::GatherAlertRaised { key } => {
            tracing::info!(marker_key = ?key, "Resource ready to gather soon")
        }
        MapEvent::MarkerAdded { marker } => tracing::info!(
            marker_key = ?marker.key(),
            resource_type = %marker.resource_type,
            ready_at = %format_timestamp(marker.target_time),
            "Marker added"
        ),
        MapEvent::RespawnTimerChanged {
            entity_id,
            server,
            status,
            ..
        } => tracing::info!(
            entity_id,
            server = %server,
            state = status.state.label(),
            remaining = %status.remaining_seconds.map(format_clock).unwrap_or_default(),
            "Respawn timer changed"
        ),
        MapEvent::CountdownTick { .. } => {}
        _ => match serde_json::to_string(event) {
            Ok(payload) => tracing::info!(event = event.name(), %payload, "Map event"),
            Err(error) => tracing::error!("Failed to serialize {} event: {error}", event.name()),
        },
    }
}
