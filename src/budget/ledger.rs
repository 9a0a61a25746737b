use std::fmt::Debug;

use log::{debug, warn};
use thiserror::Error;

use crate::budget::traits::{FilterStatus, FilterStorage};

/// Errors surfaced by the budget ledger.
#[derive(Debug, Error)]
pub enum BudgetError<FID: Debug> {
    /// At least one filter could not absorb its demanded cost. The whole
    /// transaction was refused and no filter was modified.
    #[error("out of budget for filters {filters:?}")]
    Exhausted { filters: Vec<FID> },

    /// A storage backend failure.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Budget accounting over a filter storage.
///
/// The ledger's one non-trivial operation is the all-or-nothing
/// check-and-decrement: a transaction names every filter it wants to draw
/// from, across all epochs of a query window, and either every filter
/// absorbs its cost or none does. Partial decrements never happen.
pub struct BudgetLedger<FS: FilterStorage> {
    storage: FS,
}

impl<FS> BudgetLedger<FS>
where
    FS: FilterStorage<Error = anyhow::Error>,
    FS::FilterId: Clone + Debug,
{
    pub fn new(storage: FS) -> Self {
        Self { storage }
    }

    /// Atomically consumes `demands`, a list of (filter id, cost) pairs that
    /// must not repeat a filter id (the dry run checks each demand against
    /// the filter's current state, so repeated ids would not see each
    /// other). Two phase commit: a dry run over every demand first, then the
    /// actual consumption. If any filter refuses during the dry run, the
    /// call fails with the offending ids and nothing is modified.
    pub fn check_and_decrement(
        &mut self,
        demands: &[(FS::FilterId, FS::Budget)],
    ) -> Result<(), BudgetError<FS::FilterId>> {
        // Phase 1: dry run.
        let mut oob_filters = vec![];
        for (filter_id, cost) in demands {
            let status = self.storage.maybe_consume(filter_id, cost, true)?;
            if status == FilterStatus::OutOfBudget {
                oob_filters.push(filter_id.clone());
            }
        }
        if !oob_filters.is_empty() {
            warn!(
                "Rejecting budget transaction, out of budget for filters {oob_filters:?}"
            );
            return Err(BudgetError::Exhausted {
                filters: oob_filters,
            });
        }

        // Phase 2: consume. A refusal here is unreachable, as we hold
        // exclusive access to the storage between the two phases.
        for (filter_id, cost) in demands {
            let status = self.storage.maybe_consume(filter_id, cost, false)?;
            if status != FilterStatus::Continue {
                panic!(
                    "phase 2 failed unexpectedly with status {status:?} after phase 1 succeeded, filter {filter_id:?}"
                );
            }
        }
        debug!("Consumed budget for {} filters", demands.len());
        Ok(())
    }

    /// Remaining budget under `filter_id`; ids that never consumed report
    /// their configured capacity without materializing state.
    pub fn remaining(
        &mut self,
        filter_id: &FS::FilterId,
    ) -> Result<FS::Budget, BudgetError<FS::FilterId>> {
        let budget = self.storage.remaining_budget(filter_id)?;
        Ok(budget)
    }

    /// Drops all filters; later reads see fresh capacities. Idempotent.
    pub fn clear(&mut self) -> Result<(), BudgetError<FS::FilterId>> {
        self.storage.clear()?;
        Ok(())
    }

    /// Drops the filters whose id fails the predicate.
    pub fn retain<P>(
        &mut self,
        keep: P,
    ) -> Result<(), BudgetError<FS::FilterId>>
    where
        P: FnMut(&FS::FilterId) -> bool,
    {
        self.storage.retain(keep)?;
        Ok(())
    }
}
