use crate::{
    geodesy::bearing,
    progress::Progress,
    ridge::{Linker, Ridge, RidgePoint},
    sweep::{sector, sweep, BearingBin, SweepSummary},
    Config, ElevationSource, HorizonError,
};
use geo::geometry::Coord;
use log::{debug, info};
use std::sync::{atomic::AtomicBool, Arc};

/// The visible skyline around one observer.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    observer: Coord<f64>,
    observer_elevation: f64,
    config: Config,
    bins: Vec<BearingBin>,
    ridges: Vec<Ridge>,
    summary: SweepSummary,
}

impl View {
    pub fn builder<'a>() -> ViewBuilder<'a> {
        ViewBuilder {
            observer: None,
            observer_elevation: None,
            config: Config::default(),
            progress: None,
            cancel: None,
        }
    }

    /// Computes the view from `observer` with default tuning.
    ///
    /// When `observer_elevation` is `None` it is looked up in
    /// `source` (and floored at 0).
    pub fn compute<S>(
        source: &S,
        observer: Coord<f64>,
        bearing_resolution: usize,
        visual_range: f64,
        observer_elevation: Option<f64>,
    ) -> Result<Self, HorizonError>
    where
        S: ElevationSource + ?Sized,
    {
        let mut builder = Self::builder()
            .observer(observer)
            .bearing_resolution(bearing_resolution)
            .visual_range(visual_range);
        if let Some(elevation) = observer_elevation {
            builder = builder.observer_elevation(elevation);
        }
        builder.build(source)
    }

    pub fn observer(&self) -> Coord<f64> {
        self.observer
    }

    /// Elevation (meters) the skyline was computed from.
    pub fn observer_elevation(&self) -> f64 {
        self.observer_elevation
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Per-sector visibility state, indexed by bearing sector.
    pub fn bins(&self) -> &[BearingBin] {
        &self.bins
    }

    pub fn ridges(&self) -> &[Ridge] {
        &self.ridges
    }

    /// How the sweep went (passes, lookups, early exits).
    pub fn summary(&self) -> &SweepSummary {
        &self.summary
    }

    /// Returns every ridge point flagged as a local maximum.
    pub fn local_maxima(&self) -> impl Iterator<Item = &RidgePoint> + '_ {
        self.ridges
            .iter()
            .flatten()
            .filter(|point| point.is_local_max())
    }

    /// Returns the bearing sector of `coord`, as used for ridge
    /// points.
    pub fn bearing_of(&self, coord: Coord<f64>) -> usize {
        sector(bearing(self.observer, coord), self.config.bearing_resolution)
    }
}

pub struct ViewBuilder<'a> {
    /// Observer location (required).
    observer: Option<Coord<f64>>,

    /// Observer elevation (meters, defaults to the ground elevation).
    observer_elevation: Option<f64>,

    config: Config,

    progress: Option<&'a dyn Progress>,

    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> ViewBuilder<'a> {
    /// Observer location (required).
    #[must_use]
    pub fn observer(mut self, coord: Coord<f64>) -> Self {
        self.observer = Some(coord);
        self
    }

    /// Observer elevation (meters, defaults to the ground elevation
    /// at the observer, floored at 0).
    #[must_use]
    pub fn observer_elevation(mut self, meters: f64) -> Self {
        self.observer_elevation = Some(meters);
        self
    }

    /// Number of bearing sectors around the circle.
    #[must_use]
    pub fn bearing_resolution(mut self, sectors: usize) -> Self {
        self.config.bearing_resolution = sectors;
        self
    }

    /// Distance between samples (meters); should match the
    /// elevation grid.
    #[must_use]
    pub fn sample_step(mut self, meters: f64) -> Self {
        self.config.sample_step = meters;
        self
    }

    /// How far to look (meters).
    #[must_use]
    pub fn visual_range(mut self, meters: f64) -> Self {
        self.config.visual_range = meters;
        self
    }

    #[must_use]
    pub fn ridge_persistence(mut self, passes: u32) -> Self {
        self.config.ridge_persistence = passes;
        self
    }

    #[must_use]
    pub fn min_pass(mut self, pass: u32) -> Self {
        self.config.min_pass = pass;
        self
    }

    #[must_use]
    pub fn max_terrain_elevation(mut self, meters: f64) -> Self {
        self.config.max_terrain_elevation = meters;
        self
    }

    /// Replaces all tuning at once.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn progress(mut self, progress: &'a dyn Progress) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Stop sweeping (keeping what was found so far) once `flag` is
    /// set. Checked between ring passes.
    #[must_use]
    pub fn cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn build<S>(&self, source: &S) -> Result<View, HorizonError>
    where
        S: ElevationSource + ?Sized,
    {
        let observer = self.observer.ok_or(HorizonError::Builder("observer"))?;
        let config = self.config;
        config.validate()?;

        let observer_elevation = match self.observer_elevation {
            Some(elevation) => elevation,
            None => source
                .elevation(observer)?
                .ok_or(HorizonError::ObserverElevation(observer))?
                .max(0.0),
        };

        let progress = self.progress.unwrap_or(&());

        let (bins, summary, sweep_runtime) = {
            let now = std::time::Instant::now();
            let mut bins = vec![BearingBin::new(observer_elevation); config.bearing_resolution];
            let summary = sweep(
                observer,
                &mut bins,
                source,
                &config,
                progress,
                self.cancel.as_deref(),
            )?;
            (bins, summary, now.elapsed())
        };

        let (ridges, link_runtime) = {
            let now = std::time::Instant::now();
            let ridges = Linker::new(observer, &bins, config.sample_step).link(progress);
            (ridges, now.elapsed())
        };

        debug!(
            "view; passes: {}, lookups: {}, pruned: {}, sweep_exec: {:?}, link_exec: {:?}",
            summary.passes, summary.lookups, summary.pruned, sweep_runtime, link_runtime
        );
        info!(
            "view from {observer:?} at {observer_elevation} m: {} ridges",
            ridges.len()
        );

        Ok(View {
            observer,
            observer_elevation,
            config,
            bins,
            ridges,
            summary,
        })
    }
}
