use geo::geometry::Coord;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HorizonError {
    #[error("missing required parameter '{0}'")]
    Builder(&'static str),

    #[error("invalid {field}: {reason}")]
    Config {
        field: &'static str,
        reason: &'static str,
    },

    #[error("no elevation available at observer {0:?}")]
    ObserverElevation(Coord<f64>),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("no height files in {0}")]
    Path(PathBuf),

    #[error("invalid HGT name, {0}")]
    HgtName(PathBuf),

    #[error("invalid HGT file len, {0}")]
    HgtLen(u64),
}
