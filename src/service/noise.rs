/// Post-processing applied to a finished report before release.
///
/// Budget accounting happens regardless of the mechanism, so a mechanism
/// that adds no noise only weakens the released report's formal guarantee,
/// never the bookkeeping.
pub trait NoiseMechanism: Send {
    /// Perturbs the report's buckets in place.
    fn perturb(&mut self, bins: &mut [f64]);
}

/// Releases reports unchanged. Stands in for a calibrated mechanism in
/// tests and in embedders that add noise at aggregation time instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl NoiseMechanism for Passthrough {
    fn perturb(&mut self, _bins: &mut [f64]) {}
}
