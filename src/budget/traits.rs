use std::fmt::Debug;

/// Trait for privacy budgets
pub trait Budget: Clone + Debug {
    // For now just a marker trait requiring Clone and Debug
}

/// Trait for a privacy filter.
pub trait Filter<T: Budget> {
    type Error;

    /// Initializes a new filter with a given capacity.
    fn new(capacity: T) -> Result<Self, Self::Error>
    where
        Self: Sized;

    /// Checks if the filter has enough budget without consuming.
    fn can_consume(&self, budget: &T) -> Result<FilterStatus, Self::Error>;

    /// Tries to consume a given budget from the filter. On `OutOfBudget`
    /// the filter is left unchanged; overdraw is rejected, never clamped.
    /// In the formalism from https://arxiv.org/abs/1605.08294,
    /// Continue corresponds to CONTINUE, and OutOfBudget corresponds to HALT.
    fn try_consume(&mut self, budget: &T) -> Result<FilterStatus, Self::Error>;

    /// Gets the remaining budget for this filter.
    /// WARNING: this method is for local visualization only.
    /// Its output should not be shared outside the device.
    fn remaining_budget(&self) -> Result<T, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStatus {
    Continue,
    OutOfBudget,
}

/// Capacity lookup for filters that have not been materialized yet.
pub trait FilterCapacities {
    type FilterId;
    type Budget: Budget;
    type Error;

    fn capacity(
        &self,
        filter_id: &Self::FilterId,
    ) -> Result<Self::Budget, Self::Error>;
}

/// Trait for an interface or object that maintains a collection of filters,
/// one per filter ID, materialized lazily at the capacity configured for
/// that ID.
pub trait FilterStorage {
    type FilterId: Debug;
    type Budget: Budget;
    type Filter: Filter<Self::Budget, Error = Self::Error>;
    type Capacities: FilterCapacities<
        FilterId = Self::FilterId,
        Budget = Self::Budget,
        Error = Self::Error,
    >;
    type Error;

    /// Create a new filter storage with the given capacities for new filters.
    fn new(capacities: Self::Capacities) -> Result<Self, Self::Error>
    where
        Self: Sized;

    /// Get the capacities object that was passed to the constructor.
    fn capacities(&self) -> &Self::Capacities;

    /// Get the filter with the given ID from the storage.
    /// Returns None if the filter has not been set yet.
    /// Note: for the privacy proof to be valid, get_filter() must always
    /// return exactly what was set by set_filter().
    fn get_filter(
        &mut self,
        filter_id: &Self::FilterId,
    ) -> Result<Option<Self::Filter>, Self::Error>;

    /// Store the filter with the given ID in the storage.
    fn set_filter(
        &mut self,
        filter_id: &Self::FilterId,
        filter: Self::Filter,
    ) -> Result<(), Self::Error>;

    /// Drop all filters. Later reads see fresh capacities again.
    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Drop every filter whose ID fails the predicate.
    fn retain<P>(&mut self, keep: P) -> Result<(), Self::Error>
    where
        P: FnMut(&Self::FilterId) -> bool;

    /// Get the filter with the given ID from the storage, or a new one
    /// with the configured capacity if it does not exist. The new filter is
    /// not stored; only a successful consumption materializes it.
    fn get_filter_or_new(
        &mut self,
        filter_id: &Self::FilterId,
    ) -> Result<Self::Filter, Self::Error> {
        let filter = match self.get_filter(filter_id)? {
            Some(filter) => filter,
            None => {
                let capacity = self.capacities().capacity(filter_id)?;
                Self::Filter::new(capacity)?
            }
        };
        Ok(filter)
    }

    /// Check if budget can be consumed from the given filter,
    /// without modifying state.
    fn can_consume(
        &mut self,
        filter_id: &Self::FilterId,
        budget: &Self::Budget,
    ) -> Result<FilterStatus, Self::Error> {
        self.get_filter_or_new(filter_id)?.can_consume(budget)
    }

    /// Tries to consume a given budget from the filter with ID `filter_id`.
    /// If the filter does not yet exist, it is created with the configured
    /// capacity, consumed from, and stored. A refused consumption stores
    /// nothing, so failed transactions leave no trace.
    fn try_consume(
        &mut self,
        filter_id: &Self::FilterId,
        budget: &Self::Budget,
    ) -> Result<FilterStatus, Self::Error> {
        let mut filter = self.get_filter_or_new(filter_id)?;
        let status = filter.try_consume(budget)?;
        if status == FilterStatus::Continue {
            self.set_filter(filter_id, filter)?;
        }
        Ok(status)
    }

    /// Convenience function that routes to either can_consume or try_consume.
    fn maybe_consume(
        &mut self,
        filter_id: &Self::FilterId,
        budget: &Self::Budget,
        dry_run: bool,
    ) -> Result<FilterStatus, Self::Error> {
        if dry_run {
            self.can_consume(filter_id, budget)
        } else {
            self.try_consume(filter_id, budget)
        }
    }

    /// Gets the remaining budget for a filter. IDs that never consumed
    /// report their configured capacity, without materializing state.
    /// WARNING: this method is for testing and local visualization only.
    fn remaining_budget(
        &mut self,
        filter_id: &Self::FilterId,
    ) -> Result<Self::Budget, Self::Error> {
        let filter = self.get_filter(filter_id)?;
        let budget = match filter {
            Some(filter) => filter.remaining_budget()?,
            None => self.capacities().capacity(filter_id)?,
        };
        Ok(budget)
    }
}
