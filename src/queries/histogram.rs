use log::warn;
use serde::Serialize;

/// A dense attribution report with a fixed number of buckets.
///
/// Reports are dense on purpose: a report full of zeros is
/// indistinguishable from one whose winning impression landed in any
/// particular bucket, so callers learn nothing from its shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    bins: Vec<f64>,
}

impl Histogram {
    /// Creates a report of `size` buckets, all zero.
    pub fn zeroed(size: u32) -> Self {
        Self {
            bins: vec![0.0; size as usize],
        }
    }

    /// Adds `value` to `bucket`, clamping out-of-range buckets to the
    /// last bin rather than dropping the contribution.
    pub fn accumulate(&mut self, bucket: u64, value: f64) {
        let Some(last) = self.bins.len().checked_sub(1) else {
            return;
        };
        if bucket > last as u64 {
            warn!("bucket {bucket} out of range, clamping to {last}");
        }
        let bucket = bucket.min(last as u64) as usize;
        self.bins[bucket] += value;
    }

    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    pub fn bins_mut(&mut self) -> &mut [f64] {
        &mut self.bins
    }

    pub fn is_all_zero(&self) -> bool {
        self.bins.iter().all(|value| *value == 0.0)
    }
}
