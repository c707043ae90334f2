use std::collections::HashSet;

use serde::Serialize;

use super::model::{Marker, MarkerKey, MarkerOrigin};
use super::store::{InsertOutcome, MarkerStore};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub added: Vec<Marker>,
    pub updated: Vec<Marker>,
    pub removed: Vec<Marker>,
}

impl MergeReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.added.len() + self.updated.len() + self.removed.len()
    }
}

/// Merges a remote snapshot of user-created markers into `store`.
///
/// Runs update-or-add over the snapshot first, then removes local
/// user-created markers the snapshot no longer lists. Named-entity markers
/// are never touched here. Lookups are linear scans over the snapshot, which
/// is fine for the few hundred markers a map holds.
pub fn merge_remote_snapshot(store: &mut MarkerStore, remote_snapshot: Vec<Marker>) -> MergeReport {
    let mut report = MergeReport::default();
    let mut remote_ids: Vec<u64> = Vec::with_capacity(remote_snapshot.len());
    let mut seen_ids: HashSet<u64> = HashSet::with_capacity(remote_snapshot.len());

    for mut remote_marker in remote_snapshot {
        let Some(remote_id) = remote_marker.id else {
            tracing::warn!(
                resource_type = %remote_marker.resource_type,
                "Skipping remote marker without an id"
            );
            continue;
        };

        if !seen_ids.insert(remote_id) {
            tracing::debug!(marker_id = remote_id, "Skipping duplicate remote marker");
            continue;
        }

        remote_marker.origin = MarkerOrigin::UserCreated;
        remote_ids.push(remote_id);
        apply_remote_marker(store, remote_marker, &mut report);
    }

    let absent_keys = store
        .user_created()
        .filter_map(|local_marker| local_marker.id)
        .filter(|local_id| !remote_ids.iter().any(|remote_id| remote_id == local_id))
        .map(MarkerKey::User)
        .collect::<Vec<MarkerKey>>();

    for key in absent_keys {
        if let Some(removed_marker) = store.remove_by_id(key) {
            report.removed.push(removed_marker);
        }
    }

    if !report.is_empty() {
        tracing::debug!(
            added = report.added.len(),
            updated = report.updated.len(),
            removed = report.removed.len(),
            "Merged remote marker snapshot"
        );
    }

    report
}

fn apply_remote_marker(store: &mut MarkerStore, remote_marker: Marker, report: &mut MergeReport) {
    let Some(key) = remote_marker.key() else {
        return;
    };

    if let Some(local_marker) = store.find_by_id(key) {
        if local_marker.same_content(&remote_marker) {
            return;
        }

        let mut merged_marker = local_marker.clone();
        merged_marker.overwrite_content_from(&remote_marker);
        store.insert(merged_marker.clone());
        report.updated.push(merged_marker);
        return;
    }

    if store.insert(remote_marker.clone()) == InsertOutcome::Inserted {
        report.added.push(remote_marker);
    }
}

#[cfg(test)]
mod tests {
    use super::merge_remote_snapshot;
    use crate::markers::model::{MapPosition, Marker, MarkerKey, MarkerOrigin};
    use crate::markers::store::MarkerStore;

    fn marker(id: u64, origin: MarkerOrigin, target_time: i64) -> Marker {
        Marker {
            id: Some(id),
            position: MapPosition {
                lat: -230.0 - id as f64,
                lng: 131.0,
            },
            label: Some(format!("Marker {id}")),
            resource_type: "giant_bluebell".to_string(),
            rarity: "epic".to_string(),
            in_game_coord: None,
            start_time: 1_738_068_205,
            target_time,
            origin,
        }
    }

    fn ids(markers: &[Marker]) -> Vec<u64> {
        markers.iter().filter_map(|marker| marker.id).collect()
    }

    #[test]
    fn adds_updates_and_removes_while_named_markers_survive() {
        let mut store = MarkerStore::new();
        store.insert(marker(1, MarkerOrigin::UserCreated, 1_738_070_905));
        store.insert(marker(2, MarkerOrigin::UserCreated, 1_738_070_905));
        store.insert(marker(900, MarkerOrigin::NamedEntity, 0));

        let changed_a = marker(1, MarkerOrigin::UserCreated, 1_738_099_999);
        let new_c = marker(3, MarkerOrigin::UserCreated, 1_738_070_905);
        let report = merge_remote_snapshot(&mut store, vec![changed_a, new_c]);

        assert_eq!(ids(&report.added), vec![3]);
        assert_eq!(ids(&report.updated), vec![1]);
        assert_eq!(ids(&report.removed), vec![2]);
        assert!(store.contains(MarkerKey::NamedEntity(900)));
        assert_eq!(
            store
                .find_by_id(MarkerKey::User(1))
                .map(|stored| stored.target_time),
            Some(1_738_099_999)
        );
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn merging_the_same_snapshot_twice_is_idempotent() {
        let mut store = MarkerStore::new();
        store.insert(marker(1, MarkerOrigin::UserCreated, 500));
        store.insert(marker(4, MarkerOrigin::UserCreated, 500));
        let snapshot = vec![
            marker(1, MarkerOrigin::UserCreated, 900),
            marker(2, MarkerOrigin::UserCreated, 900),
        ];

        let first_report = merge_remote_snapshot(&mut store, snapshot.clone());
        let second_report = merge_remote_snapshot(&mut store, snapshot);

        assert_eq!(first_report.change_count(), 3);
        assert!(
            second_report.is_empty(),
            "second merge reported {second_report:?}"
        );
    }

    #[test]
    fn empty_snapshot_only_removes_user_markers() {
        let mut store = MarkerStore::new();
        store.insert(marker(1, MarkerOrigin::UserCreated, 500));
        store.insert(marker(1, MarkerOrigin::NamedEntity, 0));

        let report = merge_remote_snapshot(&mut store, Vec::new());

        assert_eq!(ids(&report.removed), vec![1]);
        assert!(store.contains(MarkerKey::NamedEntity(1)));
        assert!(!store.contains(MarkerKey::User(1)));
    }

    #[test]
    fn remote_entries_claiming_named_origin_stay_in_the_user_space() {
        let mut store = MarkerStore::new();
        let named_marker = marker(7, MarkerOrigin::NamedEntity, 0);
        store.insert(named_marker.clone());

        let mut impostor = marker(7, MarkerOrigin::NamedEntity, 12_345);
        impostor.label = Some("Overwritten".to_string());
        let report = merge_remote_snapshot(&mut store, vec![impostor]);

        assert_eq!(ids(&report.added), vec![7]);
        assert_eq!(
            store.find_by_id(MarkerKey::NamedEntity(7)),
            Some(&named_marker)
        );
        assert!(store.contains(MarkerKey::User(7)));
    }

    #[test]
    fn skips_entries_without_id_and_duplicate_ids() {
        let mut store = MarkerStore::new();
        let mut unsaved = marker(1, MarkerOrigin::UserCreated, 500);
        unsaved.id = None;
        let first = marker(2, MarkerOrigin::UserCreated, 500);
        let duplicate = marker(2, MarkerOrigin::UserCreated, 999);

        let report = merge_remote_snapshot(&mut store, vec![unsaved, first, duplicate]);

        assert_eq!(ids(&report.added), vec![2]);
        assert!(report.updated.is_empty());
        assert_eq!(
            store
                .find_by_id(MarkerKey::User(2))
                .map(|stored| stored.target_time),
            Some(500)
        );
    }
}
