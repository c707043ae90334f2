use std::collections::HashMap;

use super::model::{Marker, MarkerKey};
use super::store::MarkerStore;

pub const DEFAULT_GATHER_ALERT_SECONDS: i64 = 900;

/// True while `now` sits in the `threshold_seconds` window before the
/// marker's target. The window closes at the target itself.
pub fn should_alert(marker: &Marker, now: i64, threshold_seconds: i64) -> bool {
    let window_start = marker.target_time.saturating_sub(threshold_seconds.max(0));
    now >= window_start && now < marker.target_time
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertTransition {
    Raised(MarkerKey),
    Cleared(MarkerKey),
}

/// Remembers the previous evaluation per marker so that callers only act on
/// edges. Only user-created markers are gathered, so named-entity markers
/// never alert.
#[derive(Debug, Default)]
pub struct AlertTracker {
    previous: HashMap<MarkerKey, bool>,
}

impl AlertTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(
        &mut self,
        store: &MarkerStore,
        now: i64,
        threshold_seconds: i64,
    ) -> Vec<AlertTransition> {
        let mut transitions = Vec::new();

        self.previous.retain(|key, was_alerting| {
            if store.contains(*key) {
                return true;
            }
            if *was_alerting {
                transitions.push(AlertTransition::Cleared(*key));
            }
            false
        });

        for marker in store.user_created() {
            let Some(key) = marker.key() else {
                continue;
            };

            let is_alerting = should_alert(marker, now, threshold_seconds);
            let was_alerting = self.previous.insert(key, is_alerting).unwrap_or(false);

            match (was_alerting, is_alerting) {
                (false, true) => transitions.push(AlertTransition::Raised(key)),
                (true, false) => transitions.push(AlertTransition::Cleared(key)),
                _ => {}
            }
        }

        transitions
    }

    pub fn is_alerting(&self, key: MarkerKey) -> bool {
        self.previous.get(&key).copied().unwrap_or(false)
    }
}
