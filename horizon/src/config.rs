use crate::HorizonError;

/// Number of bearing sectors around the full circle.
pub const DEFAULT_BEARING_RESOLUTION: usize = 3600;

/// Distance between ring samples (meters). Matches 3-arcsecond SRTM.
pub const DEFAULT_SAMPLE_STEP_M: f64 = 90.0;

pub const DEFAULT_VISUAL_RANGE_M: f64 = 30_000.0;

/// Number of passes the horizon must stay flat behind a candidate
/// before it counts as a ridge point.
pub const DEFAULT_RIDGE_PERSISTENCE: u32 = 1;

/// First ring swept. Terrain closer than `min_pass * sample_step` is
/// foreground and never part of the skyline.
pub const DEFAULT_MIN_PASS: u32 = 10;

/// No terrain on earth is higher than this (meters).
pub const DEFAULT_MAX_TERRAIN_ELEVATION_M: f64 = 8_900.0;

/// Tunables for a [`View`](crate::View) computation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    pub bearing_resolution: usize,
    pub sample_step: f64,
    pub visual_range: f64,
    pub ridge_persistence: u32,
    pub min_pass: u32,
    pub max_terrain_elevation: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bearing_resolution: DEFAULT_BEARING_RESOLUTION,
            sample_step: DEFAULT_SAMPLE_STEP_M,
            visual_range: DEFAULT_VISUAL_RANGE_M,
            ridge_persistence: DEFAULT_RIDGE_PERSISTENCE,
            min_pass: DEFAULT_MIN_PASS,
            max_terrain_elevation: DEFAULT_MAX_TERRAIN_ELEVATION_M,
        }
    }
}

impl Config {
    /// Returns the last (outermost) ring index swept.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn max_pass(&self) -> u32 {
        (self.visual_range / self.sample_step).floor() as u32
    }

    pub fn validate(&self) -> Result<(), HorizonError> {
        if self.bearing_resolution == 0 {
            return Err(HorizonError::Config {
                field: "bearing_resolution",
                reason: "must be positive",
            });
        }
        if !(self.sample_step.is_finite() && self.sample_step > 0.0) {
            return Err(HorizonError::Config {
                field: "sample_step",
                reason: "must be positive and finite",
            });
        }
        if !(self.visual_range.is_finite() && self.visual_range > 0.0) {
            return Err(HorizonError::Config {
                field: "visual_range",
                reason: "must be positive and finite",
            });
        }
        if !self.max_terrain_elevation.is_finite() {
            return Err(HorizonError::Config {
                field: "max_terrain_elevation",
                reason: "must be finite",
            });
        }
        if self.min_pass > self.max_pass() {
            return Err(HorizonError::Config {
                field: "min_pass",
                reason: "starts beyond the visual range",
            });
        }
        Ok(())
    }
}
