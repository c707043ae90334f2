use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::markers::model::{Marker, MarkerOrigin, MarkerPatch};
use crate::named::model::NamedEntity;

use super::{MarkerApi, RemoteError};

/// Marker authority persisted as a JSON array on disk.
///
/// Disk access runs on the blocking pool so callers on the async runtime
/// never stall a worker thread.
#[derive(Debug, Clone)]
pub struct JsonFileMarkerApi {
    file: Arc<MarkerFile>,
}

#[derive(Debug)]
struct MarkerFile {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileMarkerApi {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Arc::new(MarkerFile {
                path: path.into(),
                write_lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file.path
    }

    async fn run_blocking<T, F>(&self, operation: F) -> Result<T, RemoteError>
    where
        T: Send + 'static,
        F: FnOnce(&MarkerFile) -> Result<T, RemoteError> + Send + 'static,
    {
        let file = Arc::clone(&self.file);
        tokio::task::spawn_blocking(move || operation(&file))
            .await
            .map_err(|error| RemoteError::Unavailable(format!("Marker task failed: {error}")))?
    }
}

impl MarkerFile {
    fn read_markers(&self) -> Result<Vec<Marker>, RemoteError> {
        let raw_json = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => {
                return Err(RemoteError::Unavailable(format!(
                    "Failed to read marker file '{}': {error}",
                    self.path.display()
                )));
            }
        };

        if raw_json.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str::<Vec<Marker>>(&raw_json).map_err(|error| {
            RemoteError::Malformed(format!(
                "Failed to parse marker file '{}': {error}",
                self.path.display()
            ))
        })
    }

    fn write_markers(&self, markers: &[Marker]) -> Result<(), RemoteError> {
        let serialized = serde_json::to_string_pretty(markers).map_err(|error| {
            RemoteError::Malformed(format!("Failed to serialize markers: {error}"))
        })?;

        write_json_atomically(&self.path, &serialized).map_err(RemoteError::Unavailable)
    }

    fn modify<T>(
        &self,
        change: impl FnOnce(&mut Vec<Marker>) -> Result<T, RemoteError>,
    ) -> Result<T, RemoteError> {
        let _guard = self.write_lock.lock().map_err(|error| {
            RemoteError::Unavailable(format!("marker file lock poisoned: {error}"))
        })?;

        let mut markers = self.read_markers()?;
        let outcome = change(&mut markers)?;
        self.write_markers(&markers)?;
        Ok(outcome)
    }
}

impl MarkerApi for JsonFileMarkerApi {
    async fn list(&self) -> Result<Vec<Marker>, RemoteError> {
        self.run_blocking(|file| file.read_markers()).await
    }

    async fn create(&self, marker: Marker) -> Result<Marker, RemoteError> {
        if marker.id.is_some() {
            return Err(RemoteError::Rejected(
                "new markers must not carry an id".to_string(),
            ));
        }

        self.run_blocking(move |file| {
            file.modify(|markers| {
                let next_id = markers
                    .iter()
                    .filter_map(|stored| stored.id)
                    .max()
                    .map_or(1, |highest| highest + 1);

                let mut created = marker;
                created.id = Some(next_id);
                created.origin = MarkerOrigin::UserCreated;
                markers.push(created.clone());
                Ok(created)
            })
        })
        .await
    }

    async fn update(&self, id: u64, patch: MarkerPatch) -> Result<Marker, RemoteError> {
        self.run_blocking(move |file| {
            file.modify(|markers| {
                let Some(stored) = markers.iter_mut().find(|stored| stored.id == Some(id)) else {
                    return Err(RemoteError::NotFound { kind: "marker", id });
                };

                stored.apply_patch(&patch);
                Ok(stored.clone())
            })
        })
        .await
    }

    async fn delete(&self, id: u64) -> Result<(), RemoteError> {
        self.run_blocking(move |file| {
            file.modify(|markers| {
                let count_before = markers.len();
                markers.retain(|stored| stored.id != Some(id));
                if markers.len() == count_before {
                    return Err(RemoteError::NotFound { kind: "marker", id });
                }
                Ok(())
            })
        })
        .await
    }
}

/// Loads the named-entity catalog, a JSON array of entities.
pub fn load_named_entity_catalog(path: &Path) -> Result<Vec<NamedEntity>, String> {
    let raw_json = std::fs::read_to_string(path).map_err(|error| {
        format!(
            "Failed to read named entity catalog '{}': {error}",
            path.display()
        )
    })?;

    serde_json::from_str::<Vec<NamedEntity>>(&raw_json).map_err(|error| {
        format!(
            "Failed to parse named entity catalog '{}': {error}",
            path.display()
        )
    })
}

pub(crate) fn write_json_atomically(target_path: &Path, serialized: &str) -> Result<(), String> {
    if let Some(parent_directory) = target_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent_directory).map_err(|error| {
            format!(
                "Failed to create directory '{}': {error}",
                parent_directory.display()
            )
        })?;
    }

    let temp_path = temporary_path(target_path);
    std::fs::write(&temp_path, serialized).map_err(|error| {
        format!(
            "Failed to write temporary file '{}': {error}",
            temp_path.display()
        )
    })?;

    if let Err(error) = std::fs::rename(&temp_path, target_path) {
        if let Err(cleanup_error) = std::fs::remove_file(&temp_path) {
            return Err(format!(
                "Failed to finalize '{}': {error}; temporary cleanup failed '{}': {cleanup_error}",
                target_path.display(),
                temp_path.display()
            ));
        }

        return Err(format!(
            "Failed to finalize '{}': {error}",
            target_path.display()
        ));
    }

    Ok(())
}

fn temporary_path(target_path: &Path) -> PathBuf {
    let Some(file_name) = target_path.file_name().and_then(|value| value.to_str()) else {
        return target_path.with_extension("json.tmp");
    };

    target_path.with_file_name(format!("{file_name}.tmp"))
}
