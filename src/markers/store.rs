use std::collections::BTreeMap;

use super::model::{Marker, MarkerKey, MarkerOrigin, MarkerPatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A record with the same key existed and was overwritten.
    Replaced,
    /// Markers without an id cannot be stored.
    MissingId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    Replaced,
    Unchanged,
    NotFound,
}

/// In-memory set of markers, one record per [`MarkerKey`].
///
/// The store only holds state. Callers pair every mutation with the matching
/// render event, after the store has been updated.
#[derive(Debug, Default)]
pub struct MarkerStore {
    markers: BTreeMap<MarkerKey, Marker>,
}

impl MarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, marker: Marker) -> InsertOutcome {
        let Some(key) = marker.key() else {
            tracing::warn!(
                resource_type = %marker.resource_type,
                "Refusing to store marker without an id"
            );
            return InsertOutcome::MissingId;
        };

        match self.markers.insert(key, marker) {
            Some(_) => InsertOutcome::Replaced,
            None => InsertOutcome::Inserted,
        }
    }

    pub fn remove_by_id(&mut self, key: MarkerKey) -> Option<Marker> {
        self.markers.remove(&key)
    }

    pub fn find_by_id(&self, key: MarkerKey) -> Option<&Marker> {
        self.markers.get(&key)
    }

    pub fn contains(&self, key: MarkerKey) -> bool {
        self.markers.contains_key(&key)
    }

    pub fn all(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }

    pub fn user_created(&self) -> impl Iterator<Item = &Marker> {
        self.markers
            .values()
            .filter(|marker| marker.is_user_created())
    }

    pub fn named_entities(&self) -> impl Iterator<Item = &Marker> {
        self.markers
            .values()
            .filter(|marker| marker.origin == MarkerOrigin::NamedEntity)
    }

    pub fn replace(&mut self, key: MarkerKey, patch: &MarkerPatch) -> ReplaceOutcome {
        let Some(marker) = self.markers.get_mut(&key) else {
            tracing::debug!(marker_key = ?key, "Ignoring update for unknown marker");
            return ReplaceOutcome::NotFound;
        };

        let before = marker.clone();
        marker.apply_patch(patch);

        if *marker == before {
            ReplaceOutcome::Unchanged
        } else {
            ReplaceOutcome::Replaced
        }
    }

    /// Swaps the whole named-entity layer for `markers`, leaving user-created
    /// markers untouched. Returns the named markers that were dropped.
    pub fn replace_named_entities(&mut self, markers: Vec<Marker>) -> Vec<Marker> {
        let stale_keys = self
            .named_entities()
            .filter_map(Marker::key)
            .collect::<Vec<MarkerKey>>();

        let mut incoming_keys = Vec::with_capacity(markers.len());
        for mut marker in markers {
            marker.origin = MarkerOrigin::NamedEntity;
            let Some(key) = marker.key() else {
                continue;
            };
            incoming_keys.push(key);
            self.markers.insert(key, marker);
        }

        stale_keys
            .into_iter()
            .filter(|key| !incoming_keys.contains(key))
            .filter_map(|key| self.markers.remove(&key))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{InsertOutcome, MarkerStore, ReplaceOutcome};
    use crate::markers::model::{MapPosition, Marker, MarkerKey, MarkerOrigin, MarkerPatch};

    fn marker(id: Option<u64>, origin: MarkerOrigin) -> Marker {
        Marker {
            id,
            position: MapPosition {
                lat: -230.0,
                lng: 131.0,
            },
            label: None,
            resource_type: "moonbell".to_string(),
            rarity: "rare".to_string(),
            in_game_coord: None,
            start_time: 100,
            target_time: 200,
            origin,
        }
    }

    #[test]
    fn inserting_an_existing_id_replaces_instead_of_duplicating() {
        let mut store = MarkerStore::new();

        assert_eq!(
            store.insert(marker(Some(1), MarkerOrigin::UserCreated)),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.insert(marker(Some(1), MarkerOrigin::UserCreated)),
            InsertOutcome::Replaced
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn user_and_named_markers_with_equal_ids_coexist() {
        let mut store = MarkerStore::new();
        store.insert(marker(Some(5), MarkerOrigin::UserCreated));
        store.insert(marker(Some(5), MarkerOrigin::NamedEntity));

        assert_eq!(store.len(), 2);
        assert_eq!(store.user_created().count(), 1);
        assert_eq!(store.named_entities().count(), 1);
    }

    #[test]
    fn markers_without_id_are_rejected() {
        let mut store = MarkerStore::new();

        assert_eq!(
            store.insert(marker(None, MarkerOrigin::UserCreated)),
            InsertOutcome::MissingId
        );
        assert!(store.is_empty());
    }

    #[test]
    fn replace_reports_not_found_without_failing() {
        let mut store = MarkerStore::new();
        store.insert(marker(Some(1), MarkerOrigin::UserCreated));
        let patch = MarkerPatch {
            rarity: Some("epic".to_string()),
            ..MarkerPatch::default()
        };

        assert_eq!(
            store.replace(MarkerKey::User(99), &patch),
            ReplaceOutcome::NotFound
        );
        assert_eq!(
            store.replace(MarkerKey::User(1), &patch),
            ReplaceOutcome::Replaced
        );
        assert_eq!(
            store.replace(MarkerKey::User(1), &patch),
            ReplaceOutcome::Unchanged
        );
        assert_eq!(
            store
                .find_by_id(MarkerKey::User(1))
                .map(|stored| stored.rarity.as_str()),
            Some("epic")
        );
    }

    #[test]
    fn replacing_named_layer_keeps_user_markers() {
        let mut store = MarkerStore::new();
        store.insert(marker(Some(1), MarkerOrigin::UserCreated));
        store.insert(marker(Some(10), MarkerOrigin::NamedEntity));
        store.insert(marker(Some(11), MarkerOrigin::NamedEntity));

        let dropped =
            store.replace_named_entities(vec![marker(Some(11), MarkerOrigin::NamedEntity)]);

        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].id, Some(10));
        assert!(store.contains(MarkerKey::User(1)));
        assert!(store.contains(MarkerKey::NamedEntity(11)));
        assert!(!store.contains(MarkerKey::NamedEntity(10)));
    }
}
