use std::marker::PhantomData;

use crate::budget::{
    pure_dp_filter::PureDPBudget,
    traits::{Budget, FilterCapacities},
};

/// Key for one privacy filter: a filter family plus the epoch and, for all
/// families but the collusion filter, the host the family partitions by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterId<
    E = u64,    // Epoch ID
    U = String, // Host
> {
    /// Per-querier filter, the primary budget a conversion query draws on.
    PerQuerier(E, U /* querier host */),

    /// Collusion filter, tracking overall privacy loss across all queriers.
    Collusion(E),

    /// Quota filter regulating collusion-budget consumption per target site.
    PerTrigger(E, U /* trigger host */),

    /// Quota filter regulating collusion-budget consumption per impression
    /// site.
    PerSource(E, U /* source host */),
}

impl<E, U> FilterId<E, U> {
    /// The host this filter is partitioned by, if any.
    pub fn host(&self) -> Option<&U> {
        match self {
            FilterId::PerQuerier(_, host)
            | FilterId::PerTrigger(_, host)
            | FilterId::PerSource(_, host) => Some(host),
            FilterId::Collusion(_) => None,
        }
    }
}

/// Filter family selector, used to address budgets on the query surface
/// without spelling out the full key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    PerQuerier,
    Collusion,
    PerTrigger,
    PerSource,
}

impl FilterKind {
    pub fn filter_id(self, epoch: u64, host: &str) -> FilterId {
        match self {
            FilterKind::PerQuerier => {
                FilterId::PerQuerier(epoch, host.to_owned())
            }
            FilterKind::Collusion => FilterId::Collusion(epoch),
            FilterKind::PerTrigger => {
                FilterId::PerTrigger(epoch, host.to_owned())
            }
            FilterKind::PerSource => {
                FilterId::PerSource(epoch, host.to_owned())
            }
        }
    }
}

/// Struct containing the default capacity for each family of filter.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticCapacities<FID, B> {
    pub per_querier: B,
    pub collusion: B,
    pub per_trigger: B,
    pub per_source: B,

    _phantom: PhantomData<FID>,
}

impl<FID, B> StaticCapacities<FID, B> {
    pub fn new(per_querier: B, collusion: B, per_trigger: B, per_source: B) -> Self {
        Self {
            per_querier,
            collusion,
            per_trigger,
            per_source,
            _phantom: PhantomData,
        }
    }
}

/// Deployment defaults. The per-querier filter is the tight one; the
/// collusion filter and the two quota filters sit above it.
impl<FID> Default for StaticCapacities<FID, PureDPBudget> {
    fn default() -> Self {
        Self::new(
            PureDPBudget::Epsilon(1.0),
            PureDPBudget::Epsilon(8.0),
            PureDPBudget::Epsilon(2.0),
            PureDPBudget::Epsilon(4.0),
        )
    }
}

impl<B: Budget, E, U> FilterCapacities for StaticCapacities<FilterId<E, U>, B> {
    type FilterId = FilterId<E, U>;
    type Budget = B;
    type Error = anyhow::Error;

    fn capacity(
        &self,
        filter_id: &Self::FilterId,
    ) -> Result<Self::Budget, Self::Error> {
        match filter_id {
            FilterId::PerQuerier(..) => Ok(self.per_querier.clone()),
            FilterId::Collusion(..) => Ok(self.collusion.clone()),
            FilterId::PerTrigger(..) => Ok(self.per_trigger.clone()),
            FilterId::PerSource(..) => Ok(self.per_source.clone()),
        }
    }
}
