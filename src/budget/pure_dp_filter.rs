use core::f64;

use log::{debug, warn};
use serde::Serialize;

use crate::budget::traits::{Budget, Filter, FilterStatus};

/// A simple floating-point budget for pure differential privacy, with
/// support for infinite budget.
///
/// Infinite budget can be used for noiseless testing queries and to
/// deactivate filters by setting their capacity to `PureDPBudget::Infinite`.
/// We use a simple f64 for epsilon and ignore floating point arithmetic
/// issues.
#[derive(Debug, Clone, PartialEq)]
pub enum PureDPBudget {
    /// Infinite budget, for filters with no set capacity, or requests that
    /// don't add any noise.
    Infinite,

    /// Finite pure DP epsilon.
    Epsilon(f64),
}

impl PureDPBudget {
    /// Create a new budget with the given epsilon.
    /// Set to infinite if epsilon is NaN or negative.
    pub fn new(epsilon: f64) -> Self {
        if epsilon >= 0.0 {
            PureDPBudget::Epsilon(epsilon)
        } else {
            PureDPBudget::Infinite
        }
    }
}

impl Serialize for PureDPBudget {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            PureDPBudget::Infinite => serializer.serialize_f64(f64::NAN),
            PureDPBudget::Epsilon(epsilon) => {
                serializer.serialize_f64(*epsilon)
            }
        }
    }
}

impl Budget for PureDPBudget {}

/// A filter for pure differential privacy.
#[derive(Debug, Clone)]
pub struct PureDPBudgetFilter {
    pub remaining: PureDPBudget,
}

impl Serialize for PureDPBudgetFilter {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.remaining.serialize(serializer)
    }
}

impl Filter<PureDPBudget> for PureDPBudgetFilter {
    type Error = anyhow::Error;

    fn new(capacity: PureDPBudget) -> Result<Self, Self::Error> {
        let this = Self {
            remaining: capacity,
        };
        Ok(this)
    }

    fn can_consume(
        &self,
        budget: &PureDPBudget,
    ) -> Result<FilterStatus, Self::Error> {
        let status = match (&self.remaining, budget) {
            // Infinite filters accept all requests, even infinite ones.
            (PureDPBudget::Infinite, _) => FilterStatus::Continue,
            (
                PureDPBudget::Epsilon(remaining),
                PureDPBudget::Epsilon(requested),
            ) => {
                let diff = (remaining - requested).abs();
                if diff < 1e-9 && diff > 0.0 {
                    warn!(
                        "can_consume: difference between remaining budget ({remaining}) and requested budget ({requested}) is very small, diff = {diff}",
                    );
                }
                if requested <= remaining {
                    FilterStatus::Continue
                } else {
                    FilterStatus::OutOfBudget
                }
            }
            // Infinite requests on finite filters are always rejected.
            _ => FilterStatus::OutOfBudget,
        };
        Ok(status)
    }

    fn try_consume(
        &mut self,
        budget: &PureDPBudget,
    ) -> Result<FilterStatus, Self::Error> {
        debug!(
            "Remaining budget in this filter is {:?}, requested budget is {:?}",
            self.remaining, budget
        );

        // We check `Infinite` manually instead of implementing `PartialOrd`
        // and `SubAssign` because we just need this in filters, not to
        // compare or subtract arbitrary budgets.
        let status = match self.remaining {
            // Infinite filters accept all requests, even infinite ones.
            PureDPBudget::Infinite => FilterStatus::Continue,
            PureDPBudget::Epsilon(remaining) => match budget {
                PureDPBudget::Epsilon(requested) => {
                    if *requested <= remaining {
                        self.remaining =
                            PureDPBudget::Epsilon(remaining - requested);
                        FilterStatus::Continue
                    } else {
                        FilterStatus::OutOfBudget
                    }
                }
                // Infinite requests on finite filters are always rejected.
                PureDPBudget::Infinite => FilterStatus::OutOfBudget,
            },
        };
        Ok(status)
    }

    fn remaining_budget(&self) -> Result<PureDPBudget, anyhow::Error> {
        Ok(self.remaining.clone())
    }
}
