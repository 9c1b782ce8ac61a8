/// Phase of a [`View`](crate::View) computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Ring passes completed.
    Sweep,
    /// Ridge points consumed by the linker.
    Link,
}

/// Receives coarse progress notifications.
///
/// Called synchronously from the computation, so implementations
/// must return quickly.
pub trait Progress {
    fn report(&self, stage: Stage, done: u64, total: u64);
}

impl Progress for () {
    fn report(&self, _stage: Stage, _done: u64, _total: u64) {}
}
