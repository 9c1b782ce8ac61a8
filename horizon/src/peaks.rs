//! Naming skyline summits.

use crate::{geodesy::distance, projection::projected_height, ElevatedPoint, View};
use geo::geometry::Coord;

/// Default match radius (meters).
pub const DEFAULT_PEAK_TOLERANCE_M: f64 = 200.0;

/// A known summit, e.g. an OSM `natural=peak` node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Peak {
    pub lat: f64,
    pub lon: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub elevation: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,
}

impl Peak {
    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.lon,
            y: self.lat,
        }
    }
}

/// Matches ridge points against a list of known peaks.
#[derive(Debug, Clone)]
pub struct PeakMatcher {
    peaks: Vec<Peak>,
    tolerance_m: f64,
}

impl PeakMatcher {
    pub fn new(peaks: Vec<Peak>, tolerance_m: f64) -> Self {
        Self { peaks, tolerance_m }
    }

    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    /// Returns the nearest named peak strictly within tolerance of
    /// `coord`.
    pub fn nearest(&self, coord: Coord<f64>) -> Option<&Peak> {
        let mut best: Option<(&Peak, f64)> = None;
        for peak in self.peaks.iter().filter(|peak| peak.name.is_some()) {
            let d = distance(peak.coord(), coord);
            if d < best.map_or(self.tolerance_m, |(_, best_d)| best_d) {
                best = Some((peak, d));
            }
        }
        best.map(|(peak, _)| peak)
    }

    /// Returns the named peaks matching any of `points`, each once,
    /// in the order first matched.
    pub fn match_points<'a, I>(&self, points: I) -> Vec<&Peak>
    where
        I: IntoIterator<Item = &'a ElevatedPoint>,
    {
        let mut matched: Vec<&Peak> = Vec::new();
        for point in points {
            if let Some(peak) = self.nearest(point.coord()) {
                if !matched.iter().any(|seen| std::ptr::eq(*seen, peak)) {
                    matched.push(peak);
                }
            }
        }
        matched
    }

    /// Matches the local maxima of `view` and places each peak on
    /// the view's bearing axis.
    pub fn locate<'p>(&'p self, view: &View) -> Vec<PlacedPeak<'p>> {
        self.match_points(view.local_maxima().map(|point| point.point()))
            .into_iter()
            .map(|peak| PlacedPeak::new(peak, view))
            .collect()
    }
}

/// A peak as seen from the observer.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedPeak<'a> {
    pub peak: &'a Peak,
    pub bearing: usize,
    /// Distance from the observer (meters).
    pub distance: f64,
    /// See [`projected_height`]. `None` if the peak's elevation is
    /// unknown.
    pub projected_height: Option<f64>,
}

impl<'a> PlacedPeak<'a> {
    pub fn new(peak: &'a Peak, view: &View) -> Self {
        let coord = peak.coord();
        let distance = distance(view.observer(), coord);
        Self {
            peak,
            bearing: view.bearing_of(coord),
            distance,
            projected_height: peak
                .elevation
                .map(|elevation| projected_height(view.observer_elevation(), distance, elevation)),
        }
    }
}
