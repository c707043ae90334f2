use serde::{Deserialize, Serialize};

use super::model::MapPosition;

/// Raw in-game world coordinates, as found in the named-entity catalog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldPosition {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CoordinateSource {
    Precomputed,
    LinearFit,
}

/// Anchor pair tying a world coordinate to a map coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferencePoint {
    pub map: MapPosition,
    pub world: WorldPosition,
}

/// Axis-aligned linear fit through two reference points.
#[deprecated(
    note = "legacy fallback; catalog entries should carry precomputed map coordinates"
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    scale_x: f64,
    scale_y: f64,
    offset_lng: f64,
    offset_lat: f64,
}

#[allow(deprecated)]
impl LinearFit {
    pub fn from_reference_points(first: ReferencePoint, second: ReferencePoint) -> Option<Self> {
        let delta_world_x = second.world.x - first.world.x;
        let delta_world_y = second.world.y - first.world.y;
        if delta_world_x == 0.0 || delta_world_y == 0.0 {
            return None;
        }

        let scale_x = (second.map.lng - first.map.lng) / delta_world_x;
        let scale_y = (second.map.lat - first.map.lat) / delta_world_y;

        Some(Self {
            scale_x,
            scale_y,
            offset_lng: first.map.lng - first.world.x * scale_x,
            offset_lat: first.map.lat - first.world.y * scale_y,
        })
    }

    /// Fit calibrated on the Wormwig and Ysshokk spawn points.
    pub fn calibrated() -> Self {
        let wormwig = ReferencePoint {
            map: MapPosition {
                lat: -235.619140625,
                lng: 137.396484375,
            },
            world: WorldPosition {
                x: -706_687.077_708_62,
                y: 520_419.790_123_07,
            },
        };
        let ysshokk = ReferencePoint {
            map: MapPosition {
                lat: -239.0,
                lng: 144.375,
            },
            world: WorldPosition {
                x: -620_215.594_190_62,
                y: 562_506.793_332_1,
            },
        };

        Self::from_reference_points(wormwig, ysshokk).unwrap_or(Self {
            scale_x: 0.0,
            scale_y: 0.0,
            offset_lng: wormwig.map.lng,
            offset_lat: wormwig.map.lat,
        })
    }

    pub fn to_map(&self, world: WorldPosition) -> MapPosition {
        MapPosition {
            lat: world.y * self.scale_y + self.offset_lat,
            lng: world.x * self.scale_x + self.offset_lng,
        }
    }
}

/// Prefers precomputed map coordinates and falls back to the legacy fit.
pub fn resolve_map_position(
    map_position: Option<MapPosition>,
    world_position: Option<WorldPosition>,
) -> Option<(MapPosition, CoordinateSource)> {
    if let Some(position) = map_position {
        return Some((position, CoordinateSource::Precomputed));
    }

    let world = world_position?;
    #[allow(deprecated)]
    let position = LinearFit::calibrated().to_map(world);
    tracing::warn!(
        world_x = world.x,
        world_y = world.y,
        "Using legacy linear coordinate fit for catalog entry without map coordinates"
    );
    Some((position, CoordinateSource::LinearFit))
}

#[cfg(test)]
#[allow(deprecated)]
mod tests {
    use super::{resolve_map_position, CoordinateSource, LinearFit, WorldPosition};
    use crate::markers::model::MapPosition;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn calibrated_fit_maps_reference_points_onto_themselves() {
        let fit = LinearFit::calibrated();

        let wormwig = fit.to_map(WorldPosition {
            x: -706_687.077_708_62,
            y: 520_419.790_123_07,
        });
        let ysshokk = fit.to_map(WorldPosition {
            x: -620_215.594_190_62,
            y: 562_506.793_332_1,
        });

        assert_close(wormwig.lat, -235.619140625);
        assert_close(wormwig.lng, 137.396484375);
        assert_close(ysshokk.lat, -239.0);
        assert_close(ysshokk.lng, 144.375);
    }

    #[test]
    fn precomputed_coordinates_win_over_the_fit() {
        let precomputed = MapPosition {
            lat: -226.875,
            lng: 133.9375,
        };

        let resolved =
            resolve_map_position(Some(precomputed), Some(WorldPosition { x: 0.0, y: 0.0 }));

        assert_eq!(resolved, Some((precomputed, CoordinateSource::Precomputed)));
    }

    #[test]
    fn world_only_entries_use_the_fit_and_empty_entries_are_skipped() {
        let resolved = resolve_map_position(
            None,
            Some(WorldPosition {
                x: -620_215.594_190_62,
                y: 562_506.793_332_1,
            }),
        );

        assert_eq!(
            resolved.map(|(_, source)| source),
            Some(CoordinateSource::LinearFit)
        );
        assert_eq!(resolve_map_position(None, None), None);
    }
}
