use std::{collections::HashMap, fmt::Debug, hash::Hash};

use crate::budget::traits::{Filter, FilterCapacities, FilterStorage};

/// Simple implementation of FilterStorage using a HashMap.
/// Works for any Filter that implements the Filter trait.
#[derive(Debug, Default)]
pub struct HashMapFilterStorage<F, C>
where
    C: FilterCapacities,
    F: Filter<C::Budget>,
{
    capacities: C,
    filters: HashMap<C::FilterId, F>,
}

impl<F, C> FilterStorage for HashMapFilterStorage<F, C>
where
    F: Filter<C::Budget, Error = anyhow::Error> + Clone,
    C: FilterCapacities<Error = anyhow::Error>,
    C::FilterId: Clone + Eq + Hash + Debug,
{
    type FilterId = C::FilterId;
    type Budget = C::Budget;
    type Filter = F;
    type Capacities = C;
    type Error = anyhow::Error;

    fn new(capacities: Self::Capacities) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        let this = Self {
            capacities,
            filters: HashMap::new(),
        };
        Ok(this)
    }

    fn capacities(&self) -> &Self::Capacities {
        &self.capacities
    }

    fn get_filter(
        &mut self,
        filter_id: &Self::FilterId,
    ) -> Result<Option<Self::Filter>, Self::Error> {
        let filter = self.filters.get(filter_id).cloned();
        Ok(filter)
    }

    fn set_filter(
        &mut self,
        filter_id: &Self::FilterId,
        filter: Self::Filter,
    ) -> Result<(), Self::Error> {
        self.filters.insert(filter_id.clone(), filter);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.filters.clear();
        Ok(())
    }

    fn retain<P>(&mut self, mut keep: P) -> Result<(), Self::Error>
    where
        P: FnMut(&Self::FilterId) -> bool,
    {
        self.filters.retain(|filter_id, _| keep(filter_id));
        Ok(())
    }
}
