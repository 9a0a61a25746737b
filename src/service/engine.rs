use std::{collections::BTreeSet, ops::RangeInclusive};

use log::{debug, info};
use thiserror::Error;

use crate::{
    budget::{
        ledger::{BudgetError, BudgetLedger},
        pure_dp_filter::PureDPBudget,
        quotas::{FilterId, FilterKind},
        traits::FilterStorage,
    },
    clock::EpochClock,
    events::{
        impression::{ImpressionEvent, ImpressionKind},
        traits::{EventStorage, LedgerError},
    },
    queries::{
        conversion::{ConversionEventSelector, ConversionQuery},
        histogram::Histogram,
        last_touch::last_touch_winner,
    },
    service::{
        config::{CostPolicy, ServiceConfig},
        noise::{NoiseMechanism, Passthrough},
    },
};

/// Errors surfaced by the report engine.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The query asked for a zero-bucket report. Rejected before any store
    /// access.
    #[error("histogram size must be positive")]
    InvalidHistogramSize,

    /// The query is malformed. Rejected before any store access.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// At least one filter in the query window is out of budget. The report
    /// was discarded and no filter was modified.
    #[error("out of budget for filters {filters:?}")]
    BudgetExhausted { filters: Vec<FilterId> },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Storage(anyhow::Error),
}

impl From<BudgetError<FilterId>> for ReportError {
    fn from(err: BudgetError<FilterId>) -> Self {
        match err {
            BudgetError::Exhausted { filters } => {
                ReportError::BudgetExhausted { filters }
            }
            BudgetError::Storage(err) => ReportError::Storage(err),
        }
    }
}

/// Attribution engine: records impressions and answers conversion queries
/// under the budget ledger's accounting.
///
/// The engine owns its stores exclusively and is purely synchronous;
/// serialization of concurrent callers is the authority's job. It holds no
/// recording gate either, so every call that reaches it executes.
pub struct ReportEngine<ES, FS>
where
    FS: FilterStorage,
{
    clock: EpochClock,
    cost: CostPolicy,
    events: ES,
    budgets: BudgetLedger<FS>,
    noise: Box<dyn NoiseMechanism>,
}

impl<ES, FS> ReportEngine<ES, FS>
where
    ES: EventStorage<Event = ImpressionEvent, Error = LedgerError>,
    FS: FilterStorage<
        FilterId = FilterId,
        Budget = PureDPBudget,
        Error = anyhow::Error,
    >,
{
    pub fn new(config: &ServiceConfig, events: ES, filters: FS) -> Self {
        Self {
            clock: config.clock(),
            cost: config.cost,
            events,
            budgets: BudgetLedger::new(filters),
            noise: Box::new(Passthrough),
        }
    }

    /// Replaces the noise applied to finished reports.
    pub fn with_noise(mut self, noise: Box<dyn NoiseMechanism>) -> Self {
        self.noise = noise;
        self
    }

    /// Records an impression shown now. The event's epoch is derived from
    /// the timestamp; re-recording a `(source_host, index)` pair is a no-op.
    pub fn save_impression(
        &mut self,
        kind: ImpressionKind,
        index: u64,
        ad_id: String,
        source_host: String,
        target_host: String,
        now_ms: u64,
    ) -> Result<(), ReportError> {
        let event = ImpressionEvent {
            index,
            timestamp: now_ms,
            epoch_number: self.clock.epoch_of(now_ms),
            kind,
            source_host,
            target_host,
            ad_id,
        };
        self.events.add_event(event)?;
        Ok(())
    }

    /// Computes a last-touch attribution report for `query`, charging the
    /// privacy filters of every epoch in the query window in one atomic
    /// transaction. A query that matches no impression still spends budget
    /// and yields the all-zero report.
    pub fn measure_conversion(
        &mut self,
        query: &ConversionQuery,
        now_ms: u64,
    ) -> Result<Histogram, ReportError> {
        debug!("Measuring conversion for {query:?}");

        // Validation precedes any store access, so a rejected query leaves
        // no trace in either ledger.
        if query.histogram_size == 0 {
            return Err(ReportError::InvalidHistogramSize);
        }
        if query.target_host.is_empty() {
            return Err(ReportError::InvalidQuery(
                "empty target host".into(),
            ));
        }
        if query.source_hosts.is_empty() {
            return Err(ReportError::InvalidQuery("no source hosts".into()));
        }
        if query.source_hosts.iter().any(String::is_empty) {
            return Err(ReportError::InvalidQuery(
                "empty source host".into(),
            ));
        }

        let epochs = self.clock.epoch_range(query.lookback_days, now_ms);

        // Snapshot the candidates, then attribute.
        let selector = ConversionEventSelector { query };
        let candidates =
            self.events.relevant_events(epochs.clone(), &selector)?;
        let winner = last_touch_winner(&candidates, now_ms);

        let mut report = Histogram::zeroed(query.histogram_size);
        if let Some(winner) = winner {
            report.accumulate(winner.index, 1.0);
        }

        // Every epoch in the window is charged, matched or not.
        let cost = self.cost.query_cost(query);
        let demands = self.demands(epochs, query, &cost);
        self.budgets.check_and_decrement(&demands)?;

        self.noise.perturb(report.bins_mut());
        Ok(report)
    }

    /// The filters a conversion query draws on: per epoch of the window,
    /// the querier's own filter, the collusion filter, and the two quota
    /// filters keyed by trigger and source site.
    fn demands(
        &self,
        epochs: RangeInclusive<u64>,
        query: &ConversionQuery,
        cost: &PureDPBudget,
    ) -> Vec<(FilterId, PureDPBudget)> {
        // The transaction contract forbids repeated filter ids, so source
        // hosts are deduplicated here.
        let sources: BTreeSet<&String> = query.source_hosts.iter().collect();
        let mut demands = vec![];
        for epoch in epochs {
            demands.push((
                FilterId::PerQuerier(epoch, query.target_host.clone()),
                cost.clone(),
            ));
            demands.push((FilterId::Collusion(epoch), cost.clone()));
            demands.push((
                FilterId::PerTrigger(epoch, query.target_host.clone()),
                cost.clone(),
            ));
            for source in &sources {
                demands.push((
                    FilterId::PerSource(epoch, (*source).clone()),
                    cost.clone(),
                ));
            }
        }
        demands
    }

    /// Remaining budget under one filter key. A key that never consumed
    /// reports its configured capacity, without creating an entry.
    pub fn remaining_budget(
        &mut self,
        kind: FilterKind,
        epoch: u64,
        host: &str,
    ) -> Result<PureDPBudget, ReportError> {
        let budget = self.budgets.remaining(&kind.filter_id(epoch, host))?;
        Ok(budget)
    }

    /// Drops every stored impression. Budgets are untouched.
    pub fn clear_events(&mut self) -> Result<(), ReportError> {
        info!("Clearing all impressions");
        self.events.clear()?;
        Ok(())
    }

    /// Drops every privacy filter. Impressions are untouched.
    pub fn clear_budgets(&mut self) -> Result<(), ReportError> {
        info!("Clearing all privacy filters");
        self.budgets.clear()?;
        Ok(())
    }

    /// Drops the filters bound to `host` across every family and epoch,
    /// leaving collusion filters and other hosts' filters intact.
    pub fn reset_querier(&mut self, host: &str) -> Result<(), ReportError> {
        info!("Clearing privacy filters bound to {host}");
        let host = host.to_owned();
        self.budgets.retain(|id| id.host() != Some(&host))?;
        Ok(())
    }

    /// Test-support injection of an impression at an absolute epoch. The
    /// timestamp is synthesized as the epoch's start so the two agree.
    pub fn add_mock_event(
        &mut self,
        epoch: u64,
        kind: ImpressionKind,
        index: u64,
        ad_id: String,
        source_host: String,
        target_host: String,
    ) -> Result<(), ReportError> {
        let event = ImpressionEvent {
            index,
            timestamp: self.clock.epoch_start(epoch),
            epoch_number: epoch,
            kind,
            source_host,
            target_host,
            ad_id,
        };
        debug!("Injecting mock impression {event:?}");
        self.events.add_event(event)?;
        Ok(())
    }
}
