pub mod book;
pub mod markers;
pub mod model;
pub mod status;

pub use book::RespawnTimerBook;
pub use markers::{named_entity_marker, NAMED_ENTITY_RESOURCE_TYPE};
pub use model::{
    ActiveTimer, DropEntry, EntityFilter, NamedEntity, RespawnTimer, StartTimerReceipt,
    StartTimerRequest, TimerAnnotation,
};
pub use status::{progress_shadow, status, RespawnState, RespawnStatus, SOON_THRESHOLD_SECONDS};
