//! Flattening the skyline onto a panorama image.

use crate::View;

/// Distance (meters) of the virtual projection plane.
pub const PROJECTION_DISTANCE_M: f64 = 2000.0;

/// Returns how far above (or below) the observer's eye level
/// `elevation` at `distance` appears on a plane
/// [`PROJECTION_DISTANCE_M`] away.
pub fn projected_height(observer_elevation: f64, distance: f64, elevation: f64) -> f64 {
    (elevation - observer_elevation) / distance * PROJECTION_DISTANCE_M
}

/// Vertical extent of a view's ridges.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Dimensions {
    pub min_elevation: f64,
    pub max_elevation: f64,
    pub min_projected_height: f64,
    pub max_projected_height: f64,
}

impl Dimensions {
    /// Returns `None` if `view` has no ridges.
    pub fn of(view: &View) -> Option<Self> {
        let observer_elevation = view.observer_elevation();
        view.ridges()
            .iter()
            .flatten()
            .fold(None, |dims: Option<Self>, point| {
                let elevation = point.elevation();
                let height = projected_height(observer_elevation, point.distance(), elevation);
                Some(match dims {
                    None => Self {
                        min_elevation: elevation,
                        max_elevation: elevation,
                        min_projected_height: height,
                        max_projected_height: height,
                    },
                    Some(dims) => Self {
                        min_elevation: dims.min_elevation.min(elevation),
                        max_elevation: dims.max_elevation.max(elevation),
                        min_projected_height: dims.min_projected_height.min(height),
                        max_projected_height: dims.max_projected_height.max(height),
                    },
                })
            })
    }

    pub fn elevation_span(&self) -> f64 {
        self.max_elevation - self.min_elevation
    }
}
