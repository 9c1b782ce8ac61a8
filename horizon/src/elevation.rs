use crate::HorizonError;
use geo::geometry::Coord;

/// Something that knows the ground elevation at a coordinate.
///
/// Sources must be fully initialized before a
/// [`View`](crate::View) is computed; lookups are synchronous and
/// happen in the sweep's hot loop.
pub trait ElevationSource {
    /// Returns the elevation (meters) at `coord`.
    ///
    /// `Ok(None)` means there is no sample at `coord` (a void or a
    /// missing tile). `Err` is reserved for faults the caller can't
    /// recover from, such as an unreadable tile.
    fn elevation(&self, coord: Coord<f64>) -> Result<Option<f64>, HorizonError>;
}

impl<F> ElevationSource for F
where
    F: Fn(Coord<f64>) -> Option<f64>,
{
    fn elevation(&self, coord: Coord<f64>) -> Result<Option<f64>, HorizonError> {
        Ok(self(coord))
    }
}
