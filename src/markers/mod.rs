pub mod alert;
pub mod coordinates;
pub mod filter;
pub mod model;
pub mod reconcile;
pub mod store;

pub use alert::{should_alert, AlertTracker, AlertTransition, DEFAULT_GATHER_ALERT_SECONDS};
pub use filter::{MarkerFilter, RECENTLY_SPAWNED_GRACE_SECONDS};
pub use model::{MapPosition, Marker, MarkerKey, MarkerOrigin, MarkerPatch};
pub use reconcile::{merge_remote_snapshot, MergeReport};
pub use store::{InsertOutcome, MarkerStore, ReplaceOutcome};
