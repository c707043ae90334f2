pub mod file;
pub mod memory;

use std::future::Future;

use thiserror::Error;

use crate::markers::model::{Marker, MarkerPatch};
use crate::named::model::{
    ActiveTimer, EntityFilter, NamedEntity, StartTimerReceipt, StartTimerRequest, TimerAnnotation,
};

pub use file::{load_named_entity_catalog, JsonFileMarkerApi};
pub use memory::{MemoryMarkerApi, MemoryNamedEntityApi};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("remote authority unavailable: {0}")]
    Unavailable(String),
    #[error("remote authority rejected the request: {0}")]
    Rejected(String),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },
    #[error("malformed remote payload: {0}")]
    Malformed(String),
}

/// Authority for user-created markers.
pub trait MarkerApi: Send + Sync + 'static {
    fn list(&self) -> impl Future<Output = Result<Vec<Marker>, RemoteError>> + Send;

    /// Persists a new marker and returns it with its assigned id.
    fn create(&self, marker: Marker) -> impl Future<Output = Result<Marker, RemoteError>> + Send;

    fn update(
        &self,
        id: u64,
        patch: MarkerPatch,
    ) -> impl Future<Output = Result<Marker, RemoteError>> + Send;

    fn delete(&self, id: u64) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

/// Authority for the named-entity catalog and its kill timers.
pub trait NamedEntityApi: Send + Sync + 'static {
    fn list(
        &self,
        filter: EntityFilter,
    ) -> impl Future<Output = Result<Vec<NamedEntity>, RemoteError>> + Send;

    fn active_timers(
        &self,
        server: String,
    ) -> impl Future<Output = Result<Vec<ActiveTimer>, RemoteError>> + Send;

    /// Starts a timer, replacing any existing one for the same entity and
    /// server.
    fn start_timer(
        &self,
        request: StartTimerRequest,
    ) -> impl Future<Output = Result<StartTimerReceipt, RemoteError>> + Send;

    fn update_timer(
        &self,
        timer_id: u64,
        annotation: TimerAnnotation,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    fn delete_timer(&self, timer_id: u64) -> impl Future<Output = Result<(), RemoteError>> + Send;
}
