//! # Horizon
//!
//! `horizon` computes the visible skyline around an observer on a
//! terrain elevation grid and links it into ridge lines.

mod config;
mod elevation;
mod error;
pub mod geodesy;
pub mod peaks;
mod progress;
pub mod projection;
mod ridge;
mod sweep;
mod tiles;
mod view;

pub use crate::{
    config::Config,
    elevation::ElevationSource,
    error::HorizonError,
    progress::{Progress, Stage},
    ridge::{Ridge, RidgePoint},
    sweep::{Activity, BearingBin, Candidate, ElevatedPoint, Ring, SweepSummary, Tracking},
    tiles::{Tile, TileMode, Tiles},
    view::{View, ViewBuilder},
};
pub use geo;
