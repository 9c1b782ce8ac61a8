//! Directional sweep.
//!
//! Samples concentric square rings around the observer, outward,
//! and keeps a running visibility horizon per bearing sector.

use crate::{
    geodesy::{bearing, curvature_drop, distance, move_by, EARTH_RADIUS_M},
    progress::{Progress, Stage},
    Config, ElevationSource, HorizonError,
};
use geo::geometry::Coord;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};

/// Starting rise rate; steeper downhill than any real line of sight.
const INITIAL_RISE_RATE: f64 = -1000.0;

/// A terrain sample with its distance to the observer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElevatedPoint {
    coord: Coord<f64>,
    elevation: f64,
    distance: f64,
}

impl ElevatedPoint {
    pub fn new(coord: Coord<f64>, elevation: f64, distance: f64) -> Self {
        Self {
            coord,
            elevation,
            distance,
        }
    }

    pub fn coord(&self) -> Coord<f64> {
        self.coord
    }

    /// Ground elevation (meters).
    pub fn elevation(&self) -> f64 {
        self.elevation
    }

    /// Great-circle distance to the observer (meters).
    pub fn distance(&self) -> f64 {
        self.distance
    }
}

/// A horizon point and the pass it was seen on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub point: ElevatedPoint,
    pub pass: u32,
}

/// Whether a bin is waiting to learn if its latest horizon point is
/// a ridge.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Tracking {
    #[default]
    Idle,
    Tracking(Candidate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Active,
    /// Nothing further out can be visible in this sector.
    Pruned,
}

/// Visibility state for one bearing sector.
#[derive(Debug, Clone, PartialEq)]
pub struct BearingBin {
    baseline: f64,
    highest_elevation: f64,
    /// Slope (m/m) of the current line of sight over the horizon.
    rise_rate: f64,
    tracking: Tracking,
    confirmed: Vec<Candidate>,
    activity: Activity,
}

impl BearingBin {
    /// Returns an empty bin for an observer at `baseline` meters.
    ///
    /// Terrain no higher than the observer never becomes part of the
    /// skyline.
    pub fn new(baseline: f64) -> Self {
        Self {
            baseline,
            highest_elevation: baseline,
            rise_rate: INITIAL_RISE_RATE,
            tracking: Tracking::Idle,
            confirmed: Vec::new(),
            activity: Activity::Active,
        }
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    pub fn highest_elevation(&self) -> f64 {
        self.highest_elevation
    }

    pub fn rise_rate(&self) -> f64 {
        self.rise_rate
    }

    pub fn tracking(&self) -> Tracking {
        self.tracking
    }

    /// Ridge points found in this sector, nearest first.
    pub fn confirmed(&self) -> &[Candidate] {
        &self.confirmed
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn is_pruned(&self) -> bool {
        self.activity == Activity::Pruned
    }

    /// Lowest apparent elevation visible at `distance`.
    pub fn min_visible_elevation(&self, distance: f64) -> f64 {
        self.baseline + self.rise_rate * distance
    }

    /// Prunes this bin if even `max_terrain_elevation` would be
    /// hidden at `distance`. Returns `true` if the bin is pruned.
    pub fn prune_beyond(&mut self, distance: f64, max_terrain_elevation: f64) -> bool {
        if self.activity == Activity::Active
            && self.min_visible_elevation(distance) > max_terrain_elevation
        {
            self.activity = Activity::Pruned;
        }
        self.is_pruned()
    }

    /// Offers a sample seen on `pass`. Returns `true` if it raised
    /// this sector's horizon.
    pub fn observe(&mut self, point: ElevatedPoint, pass: u32, persistence: u32) -> bool {
        if self.is_pruned() || point.distance <= 0.0 || point.elevation <= self.highest_elevation
        {
            return false;
        }
        let apparent = point.elevation - curvature_drop(point.distance, EARTH_RADIUS_M);
        if apparent <= self.min_visible_elevation(point.distance) {
            return false;
        }
        self.highest_elevation = point.elevation;
        self.rise_rate = (apparent - self.baseline) / point.distance;
        if let Tracking::Tracking(pending) = self.tracking {
            // The horizon stalled for a while: a valley lies behind
            // the pending point, so it was a ridge.
            if pass.saturating_sub(pending.pass) > persistence {
                self.confirmed.push(pending);
            }
        }
        self.tracking = Tracking::Tracking(Candidate { point, pass });
        true
    }

    /// Confirms the pending candidate, if any. The end of the visual
    /// range counts as a valley.
    pub fn flush(&mut self) {
        if let Tracking::Tracking(pending) = std::mem::take(&mut self.tracking) {
            self.confirmed.push(pending);
        }
    }
}

/// Grid offsets `(north, east)`, in steps, on the square ring at
/// Chebyshev distance `pass` from the origin.
#[derive(Debug, Clone)]
pub struct Ring {
    radius: i64,
    index: u64,
    len: u64,
}

impl Ring {
    pub fn new(pass: u32) -> Self {
        let len = if pass == 0 { 1 } else { 8 * u64::from(pass) };
        Self {
            radius: i64::from(pass),
            index: 0,
            len,
        }
    }
}

impl Iterator for Ring {
    type Item = (i64, i64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.len {
            return None;
        }
        let r = self.radius;
        #[allow(clippy::cast_possible_wrap)]
        let k = self.index as i64;
        self.index += 1;
        if r == 0 {
            return Some((0, 0));
        }
        let side = 2 * r;
        let along = k % side;
        // Clockwise from the north-west corner.
        let offset = match k / side {
            0 => (r, -r + along),
            1 => (r - along, r),
            2 => (-r, r - along),
            _ => (-r + along, -r),
        };
        Some(offset)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        #[allow(clippy::cast_possible_truncation)]
        let remaining = (self.len - self.index) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Ring {}

/// Returns the bearing sector of `bearing_rad` for `resolution`
/// sectors.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn sector(bearing_rad: f64, resolution: usize) -> usize {
    let idx = (bearing_rad / std::f64::consts::TAU * resolution as f64).floor() as usize;
    idx.min(resolution - 1)
}

/// Bookkeeping from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Ring passes actually swept.
    pub passes: u32,
    /// Elevation queries issued.
    pub lookups: u64,
    /// Bins pruned before the sweep ended.
    pub pruned: usize,
    /// Stopped early because every bin was pruned.
    pub exhausted: bool,
    /// Stopped early on request.
    pub cancelled: bool,
}

/// Sweeps rings `config.min_pass..=config.max_pass()` around
/// `observer`, updating `bins`, then flushes every bin.
pub(crate) fn sweep<S>(
    observer: Coord<f64>,
    bins: &mut [BearingBin],
    source: &S,
    config: &Config,
    progress: &dyn Progress,
    cancel: Option<&AtomicBool>,
) -> Result<SweepSummary, HorizonError>
where
    S: ElevationSource + ?Sized,
{
    let max_pass = config.max_pass();
    let total = u64::from(max_pass.saturating_sub(config.min_pass)) + 1;
    let step = config.sample_step;
    let mut summary = SweepSummary::default();

    for pass in config.min_pass..=max_pass {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            debug!("sweep cancelled before pass {pass}");
            summary.cancelled = true;
            break;
        }
        if bins.iter().all(BearingBin::is_pruned) {
            debug!("all bins pruned before pass {pass}");
            summary.exhausted = true;
            break;
        }

        for (north, east) in Ring::new(pass) {
            #[allow(clippy::cast_precision_loss)]
            let coord = move_by(observer, north as f64 * step, east as f64 * step);
            let distance = distance(observer, coord);
            let bin = &mut bins[sector(bearing(observer, coord), bins.len())];
            if bin.prune_beyond(distance, config.max_terrain_elevation) {
                continue;
            }
            summary.lookups += 1;
            let elevation = source.elevation(coord)?.unwrap_or(f64::NEG_INFINITY);
            bin.observe(
                ElevatedPoint::new(coord, elevation, distance),
                pass,
                config.ridge_persistence,
            );
        }

        summary.passes += 1;
        progress.report(Stage::Sweep, u64::from(summary.passes), total);
    }

    for bin in bins.iter_mut() {
        bin.flush();
    }
    summary.pruned = bins.iter().filter(|bin| bin.is_pruned()).count();

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::{sector, sweep, BearingBin, Candidate, ElevatedPoint, Ring, Tracking};
    use crate::{
        geodesy::{curvature_drop, EARTH_RADIUS_M},
        Config,
    };
    use geo::geometry::Coord;
    use std::{
        cell::Cell,
        collections::HashSet,
        f64::consts::{FRAC_PI_2, TAU},
        sync::atomic::AtomicBool,
    };

    const ORIGIN: Coord = Coord { x: 0.0, y: 0.0 };

    fn point(elevation: f64, distance: f64) -> ElevatedPoint {
        ElevatedPoint::new(ORIGIN, elevation, distance)
    }

    #[test]
    fn test_ring_perimeter() {
        assert_eq!(Ring::new(0).collect::<Vec<_>>(), vec![(0, 0)]);
        for pass in 1..6 {
            let ring = Ring::new(pass);
            assert_eq!(ring.len(), 8 * pass as usize);
            let offsets: Vec<_> = ring.collect();
            let unique: HashSet<_> = offsets.iter().copied().collect();
            assert_eq!(unique.len(), offsets.len());
            let r = i64::from(pass);
            for (north, east) in offsets {
                assert_eq!(north.abs().max(east.abs()), r);
            }
        }
    }

    #[test]
    fn test_sector() {
        assert_eq!(sector(0.0, 360), 0);
        assert_eq!(sector(FRAC_PI_2, 4), 1);
        assert_eq!(sector(TAU - 1e-12, 360), 359);
        assert_eq!(sector(TAU, 360), 359);
    }

    #[test]
    fn test_observe_rejects_lower_or_hidden() {
        let mut bin = BearingBin::new(1000.0);
        assert!(bin.observe(point(1200.0, 2000.0), 20, 1));
        // Not higher than the current max.
        assert!(!bin.observe(point(1200.0, 3000.0), 30, 1));
        // Higher, but below the line of sight.
        assert!(!bin.observe(point(1250.0, 6000.0), 60, 1));
        // Missing samples never register.
        assert!(!bin.observe(point(f64::NEG_INFINITY, 6000.0), 60, 1));
        // The observer itself.
        assert!(!bin.observe(point(5000.0, 0.0), 0, 1));
    }

    #[test]
    fn test_observe_confirms_after_valley() {
        let mut bin = BearingBin::new(0.0);
        assert!(bin.observe(point(100.0, 1000.0), 10, 1));
        // Directly behind: replaces without confirming.
        assert!(bin.observe(point(120.0, 1090.0), 11, 1));
        assert!(bin.confirmed().is_empty());
        // Two passes later: the pending point was a ridge.
        assert!(bin.observe(point(1000.0, 1270.0), 13, 1));
        assert_eq!(bin.confirmed().len(), 1);
        assert_eq!(bin.confirmed()[0].pass, 11);
        assert!(matches!(
            bin.tracking(),
            Tracking::Tracking(Candidate { pass: 13, .. })
        ));

        bin.flush();
        assert_eq!(bin.tracking(), Tracking::Idle);
        assert_eq!(bin.confirmed().len(), 2);
        assert_eq!(bin.confirmed()[1].pass, 13);
    }

    #[test]
    fn test_observe_updates_rise_rate() {
        let mut bin = BearingBin::new(1000.0);
        assert!(bin.observe(point(2000.0, 5000.0), 55, 1));
        let expected = (2000.0 - curvature_drop(5000.0, EARTH_RADIUS_M) - 1000.0) / 5000.0;
        assert_eq!(bin.rise_rate(), expected);
        assert_eq!(bin.highest_elevation(), 2000.0);
    }

    #[test]
    fn test_prune_beyond() {
        let mut bin = BearingBin::new(1000.0);
        assert!(!bin.prune_beyond(10_000.0, 8900.0));
        assert!(bin.observe(point(2000.0, 1000.0), 11, 1));
        // Rise rate ~1.0: at 10 km the horizon sits at ~11 km.
        assert!(bin.prune_beyond(10_000.0, 8900.0));
        assert!(bin.is_pruned());
        assert!(!bin.observe(point(9000.0, 20_000.0), 200, 1));
    }

    #[test]
    fn test_pruned_bins_skip_lookups() {
        let config = Config {
            bearing_resolution: 8,
            sample_step: 100.0,
            visual_range: 5000.0,
            min_pass: 1,
            ..Config::default()
        };
        let observer = Coord { x: 10.0, y: 45.0 };
        let walled_lookups = Cell::new(0_u64);
        // Observer in a pit: the first ring is a wall taller than
        // anything behind it could ever be.
        let walled = |_: Coord<f64>| {
            walled_lookups.set(walled_lookups.get() + 1);
            Some(9000.0)
        };
        let mut bins = vec![BearingBin::new(0.0); config.bearing_resolution];
        let summary = sweep(observer, &mut bins, &walled, &config, &(), None).unwrap();
        assert!(summary.exhausted);
        assert_eq!(summary.pruned, config.bearing_resolution);
        assert!(summary.passes < config.max_pass());
        assert_eq!(summary.lookups, walled_lookups.get());
        let full_sweep: u64 = (1..=config.max_pass()).map(|p| 8 * u64::from(p)).sum();
        assert!(walled_lookups.get() < full_sweep / 10);
        // Every wall point is still pending when the sweep gives up,
        // and gets confirmed anyway.
        assert!(bins.iter().all(|bin| bin.confirmed().len() == 1));
    }

    #[test]
    fn test_cancel_before_first_pass() {
        let config = Config {
            bearing_resolution: 4,
            sample_step: 100.0,
            visual_range: 5000.0,
            min_pass: 1,
            ..Config::default()
        };
        let observer = Coord { x: 10.0, y: 45.0 };
        let cancel = AtomicBool::new(true);
        let rising = |_: Coord<f64>| Some(100.0);
        let mut bins = vec![BearingBin::new(0.0); config.bearing_resolution];
        let summary = sweep(observer, &mut bins, &rising, &config, &(), Some(&cancel)).unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.passes, 0);
        assert_eq!(summary.lookups, 0);
        assert!(bins.iter().all(|bin| bin.confirmed().is_empty()));
    }
}
