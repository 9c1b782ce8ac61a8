//! Ridge linking.
//!
//! A single topographic ridge crosses many bearing sectors, so the
//! linker chains ridge points by geographic proximity rather than by
//! sector.

use crate::{
    geodesy::{bearing, distance},
    progress::{Progress, Stage},
    sweep::{sector, BearingBin, ElevatedPoint},
};
use geo::geometry::Coord;
use log::debug;
use std::f64::consts::TAU;

/// How many sector widths apart two neighbouring ridge points may
/// be: two sectors, with slack for the diagonal of a grid cell.
const LINK_SECTOR_WIDTHS: f64 = 2.0 * 1.4;

/// A point on a ridge line.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RidgePoint {
    point: ElevatedPoint,
    bearing: usize,
    local_max: bool,
}

impl RidgePoint {
    pub fn point(&self) -> &ElevatedPoint {
        &self.point
    }

    /// Bearing sector of this point as seen from the observer.
    pub fn bearing(&self) -> usize {
        self.bearing
    }

    /// `true` if neither chain neighbour is higher.
    pub fn is_local_max(&self) -> bool {
        self.local_max
    }

    pub fn coord(&self) -> Coord<f64> {
        self.point.coord()
    }

    pub fn elevation(&self) -> f64 {
        self.point.elevation()
    }

    pub fn distance(&self) -> f64 {
        self.point.distance()
    }
}

/// Ridge points in the order they were chained.
pub type Ridge = Vec<RidgePoint>;

/// Chains the confirmed ridge points of `bins` into ridges.
pub(crate) struct Linker {
    observer: Coord<f64>,
    resolution: usize,
    sample_step: f64,
    /// Unclaimed ridge points, one pool per pass.
    pools: Vec<Vec<ElevatedPoint>>,
}

impl Linker {
    pub(crate) fn new(observer: Coord<f64>, bins: &[BearingBin], sample_step: f64) -> Self {
        let passes = || {
            bins.iter()
                .flat_map(BearingBin::confirmed)
                .map(|candidate| candidate.pass)
        };
        let first_pass = passes().min().unwrap_or(0);
        let last_pass = passes().max().unwrap_or(0);

        let mut pools = vec![Vec::new(); (last_pass - first_pass) as usize + 1];
        for candidate in bins.iter().flat_map(BearingBin::confirmed) {
            pools[(candidate.pass - first_pass) as usize].push(candidate.point);
        }

        Self {
            observer,
            resolution: bins.len(),
            sample_step,
            pools,
        }
    }

    /// Consumes every pooled point, returning ridges of two or more
    /// points.
    pub(crate) fn link(mut self, progress: &dyn Progress) -> Vec<Ridge> {
        let total = self.pools.iter().map(Vec::len).sum::<usize>() as u64;
        let mut consumed = 0_u64;
        let mut ridges = Vec::new();
        let mut singles = 0_usize;

        for start_pool in 0..self.pools.len() {
            while !self.pools[start_pool].is_empty() {
                let ridge = self.chain_from(start_pool);
                consumed += ridge.len() as u64;
                progress.report(Stage::Link, consumed, total);
                if ridge.len() > 1 {
                    ridges.push(ridge);
                } else {
                    singles += 1;
                }
            }
        }

        debug!(
            "linked {total} points into {} ridges, {singles} discarded",
            ridges.len()
        );
        ridges
    }

    /// Walks a chain starting from the first point of `pool`.
    fn chain_from(&mut self, pool: usize) -> Ridge {
        let start = self.pools[pool].remove(0);
        let mut tail = self.ridge_point(start);
        let mut tail_pool = pool;
        let mut ridge = Vec::new();

        while let Some((pool, idx)) = self.find_neighbor(&tail.point, tail_pool) {
            let claimed = self.pools[pool].remove(idx);
            let mut next = self.ridge_point(claimed);
            if next.elevation() <= tail.elevation() {
                next.local_max = false;
            } else {
                tail.local_max = false;
            }
            ridge.push(tail);
            tail = next;
            tail_pool = pool;
        }
        ridge.push(tail);
        ridge
    }

    fn ridge_point(&self, point: ElevatedPoint) -> RidgePoint {
        RidgePoint {
            point,
            bearing: sector(bearing(self.observer, point.coord()), self.resolution),
            local_max: true,
        }
    }

    /// Maximum link distance for a point `distance` meters from the
    /// observer.
    #[allow(clippy::cast_precision_loss)]
    fn tolerance(&self, distance: f64) -> f64 {
        distance * TAU * LINK_SECTOR_WIDTHS / self.resolution as f64
    }

    /// Returns `(pool, index)` of the nearest pooled point to `tail`
    /// in the same or an adjacent pass that also has `tail` as its
    /// nearest neighbour.
    fn find_neighbor(&self, tail: &ElevatedPoint, tail_pool: usize) -> Option<(usize, usize)> {
        let tolerance = self.tolerance(tail.distance());
        let mut nearby: Vec<(usize, usize, f64)> = self
            .window(tail_pool, 1)
            .flat_map(|pool| {
                self.pools[pool]
                    .iter()
                    .enumerate()
                    .map(move |(idx, point)| (pool, idx, distance(tail.coord(), point.coord())))
            })
            .filter(|&(_, _, d)| d < tolerance)
            .collect();
        nearby.sort_by(|a, b| a.2.total_cmp(&b.2));
        nearby
            .into_iter()
            .find(|&(pool, idx, d)| self.is_mutual(pool, idx, d))
            .map(|(pool, idx, _)| (pool, idx))
    }

    /// Returns `false` if some other pooled point is strictly closer
    /// to `pools[pool][idx]` than `link_distance`.
    fn is_mutual(&self, pool: usize, idx: usize, link_distance: f64) -> bool {
        let candidate = self.pools[pool][idx].coord();
        // Ring indices of two grid points differ by at most their
        // distance in grid steps, with some slack for the longitude
        // scale varying across the grid.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let reach = (link_distance / self.sample_step * 1.1).ceil() as usize + 1;
        self.window(pool, reach).all(|other_pool| {
            self.pools[other_pool]
                .iter()
                .enumerate()
                .filter(|&(other_idx, _)| other_pool != pool || other_idx != idx)
                .all(|(_, other)| distance(candidate, other.coord()) >= link_distance)
        })
    }

    /// Pool indices within `reach` passes of `pool`.
    fn window(&self, pool: usize, reach: usize) -> std::ops::RangeInclusive<usize> {
        pool.saturating_sub(reach)..=(pool + reach).min(self.pools.len() - 1)
    }
}
