use crate::{
    budget::pure_dp_filter::PureDPBudget,
    clock::{EpochClock, DEFAULT_MAX_LOOKBACK_DAYS, WEEK_IN_MILLIS},
    queries::conversion::ConversionQuery,
};

/// Strategy deciding the epsilon a conversion query is charged. Injected
/// into the engine, so deployments can reprice queries without touching
/// attribution logic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CostPolicy {
    /// Flat charge per query.
    Constant(f64),

    /// Charge scaling with report resolution.
    PerBucket(f64),

    /// Charge scaling with the number of impression sites in scope.
    PerSourceHost(f64),
}

impl CostPolicy {
    /// Epsilon demanded from each filter in the query window.
    pub fn query_cost(&self, query: &ConversionQuery) -> PureDPBudget {
        match self {
            CostPolicy::Constant(epsilon) => PureDPBudget::new(*epsilon),
            CostPolicy::PerBucket(per_bucket) => {
                PureDPBudget::new(per_bucket * f64::from(query.histogram_size))
            }
            CostPolicy::PerSourceHost(per_host) => {
                PureDPBudget::new(per_host * query.source_hosts.len() as f64)
            }
        }
    }
}

impl Default for CostPolicy {
    fn default() -> Self {
        CostPolicy::Constant(1.0)
    }
}

/// Embedder-facing knobs for one attribution service instance. Budget
/// capacities live with the filter storage, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub epoch_length_ms: u64,
    pub max_lookback_days: u32,
    pub cost: CostPolicy,
    pub recording_enabled: bool,
}

impl ServiceConfig {
    pub fn clock(&self) -> EpochClock {
        EpochClock::new(self.epoch_length_ms, self.max_lookback_days)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            epoch_length_ms: WEEK_IN_MILLIS,
            max_lookback_days: DEFAULT_MAX_LOOKBACK_DAYS,
            cost: CostPolicy::default(),
            recording_enabled: true,
        }
    }
}
