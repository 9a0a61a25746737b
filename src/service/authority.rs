use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Mutex, MutexGuard,
    },
    thread,
};

use log::debug;
use thiserror::Error;

use crate::{
    budget::{
        pure_dp_filter::PureDPBudget,
        quotas::{FilterId, FilterKind},
        traits::FilterStorage,
    },
    clock::EpochClock,
    events::{
        impression::{ImpressionEvent, ImpressionKind},
        traits::{EventStorage, LedgerError},
    },
    queries::{conversion::ConversionQuery, histogram::Histogram},
    service::engine::{ReportEngine, ReportError},
};

/// Errors surfaced on the authority call surface.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Recording is disabled. Reads fail with this tag; writes no-op
    /// upstream and never reach the engine.
    #[error("attribution recording is disabled")]
    RecordingDisabled,

    /// The authority owning the stores is gone. The operation never
    /// happened.
    #[error("no authority available to serve the request")]
    NoAuthority,

    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Call surface for attribution, independent of where the stores live.
///
/// An embedder picks an implementation once at construction and hands out
/// the handle; callers never branch on process role. All methods take
/// `&self`, so implementations own their synchronization.
pub trait AttributionAuthority {
    /// Records an impression shown now. Silently dropped while recording
    /// is disabled.
    fn save_impression(
        &self,
        kind: ImpressionKind,
        index: u64,
        ad_id: &str,
        source_host: &str,
        target_host: &str,
    ) -> Result<(), ServiceError>;

    /// Computes an attribution report for a conversion happening now.
    fn measure_conversion(
        &self,
        query: &ConversionQuery,
    ) -> Result<Histogram, ServiceError>;

    /// Remaining budget under one filter key.
    fn remaining_budget(
        &self,
        kind: FilterKind,
        epoch: u64,
        host: &str,
    ) -> Result<PureDPBudget, ServiceError>;

    /// Drops every stored impression. Allowed while recording is disabled.
    fn clear_events(&self) -> Result<(), ServiceError>;

    /// Drops every privacy filter. Allowed while recording is disabled.
    fn clear_budgets(&self) -> Result<(), ServiceError>;

    /// Test-support injection of an impression at an absolute epoch,
    /// bypassing the recording gate.
    fn add_mock_event(
        &self,
        epoch: u64,
        kind: ImpressionKind,
        index: u64,
        ad_id: &str,
        source_host: &str,
        target_host: &str,
    ) -> Result<(), ServiceError>;
}

/// Authority for embedders that own the stores in-process. Wraps the
/// engine in a mutex and gates the data path behind an atomic recording
/// flag.
pub struct LocalAuthority<ES, FS>
where
    FS: FilterStorage,
{
    engine: Mutex<ReportEngine<ES, FS>>,
    recording_enabled: AtomicBool,
}

impl<ES, FS> LocalAuthority<ES, FS>
where
    ES: EventStorage<Event = ImpressionEvent, Error = LedgerError>,
    FS: FilterStorage<
        FilterId = FilterId,
        Budget = PureDPBudget,
        Error = anyhow::Error,
    >,
{
    pub fn new(engine: ReportEngine<ES, FS>, recording_enabled: bool) -> Self {
        Self {
            engine: Mutex::new(engine),
            recording_enabled: AtomicBool::new(recording_enabled),
        }
    }

    pub fn recording_enabled(&self) -> bool {
        self.recording_enabled.load(Ordering::Relaxed)
    }

    /// Flips the recording gate. Takes effect for the next call; calls
    /// already holding the engine finish unaffected.
    pub fn set_recording_enabled(&self, enabled: bool) {
        self.recording_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Scoped budget reset: drops every filter bound to `host`.
    pub fn reset_querier(&self, host: &str) -> Result<(), ServiceError> {
        self.engine()?.reset_querier(host)?;
        Ok(())
    }

    // A poisoned mutex means the thread owning a call panicked mid-flight;
    // the stores are not trustworthy anymore, so the authority is treated
    // as gone.
    fn engine(
        &self,
    ) -> Result<MutexGuard<'_, ReportEngine<ES, FS>>, ServiceError> {
        self.engine.lock().map_err(|_| ServiceError::NoAuthority)
    }
}

impl<ES, FS> AttributionAuthority for LocalAuthority<ES, FS>
where
    ES: EventStorage<Event = ImpressionEvent, Error = LedgerError>,
    FS: FilterStorage<
        FilterId = FilterId,
        Budget = PureDPBudget,
        Error = anyhow::Error,
    >,
{
    fn save_impression(
        &self,
        kind: ImpressionKind,
        index: u64,
        ad_id: &str,
        source_host: &str,
        target_host: &str,
    ) -> Result<(), ServiceError> {
        if !self.recording_enabled() {
            debug!("Recording disabled, dropping impression from {source_host}");
            return Ok(());
        }
        self.engine()?.save_impression(
            kind,
            index,
            ad_id.to_owned(),
            source_host.to_owned(),
            target_host.to_owned(),
            EpochClock::now_ms(),
        )?;
        Ok(())
    }

    fn measure_conversion(
        &self,
        query: &ConversionQuery,
    ) -> Result<Histogram, ServiceError> {
        if !self.recording_enabled() {
            return Err(ServiceError::RecordingDisabled);
        }
        let report =
            self.engine()?.measure_conversion(query, EpochClock::now_ms())?;
        Ok(report)
    }

    fn remaining_budget(
        &self,
        kind: FilterKind,
        epoch: u64,
        host: &str,
    ) -> Result<PureDPBudget, ServiceError> {
        if !self.recording_enabled() {
            return Err(ServiceError::RecordingDisabled);
        }
        let budget = self.engine()?.remaining_budget(kind, epoch, host)?;
        Ok(budget)
    }

    fn clear_events(&self) -> Result<(), ServiceError> {
        self.engine()?.clear_events()?;
        Ok(())
    }

    fn clear_budgets(&self) -> Result<(), ServiceError> {
        self.engine()?.clear_budgets()?;
        Ok(())
    }

    fn add_mock_event(
        &self,
        epoch: u64,
        kind: ImpressionKind,
        index: u64,
        ad_id: &str,
        source_host: &str,
        target_host: &str,
    ) -> Result<(), ServiceError> {
        self.engine()?.add_mock_event(
            epoch,
            kind,
            index,
            ad_id.to_owned(),
            source_host.to_owned(),
            target_host.to_owned(),
        )?;
        Ok(())
    }
}

/// One queued authority operation, carrying its own reply channel.
enum AuthorityRequest {
    SaveImpression {
        kind: ImpressionKind,
        index: u64,
        ad_id: String,
        source_host: String,
        target_host: String,
        reply: mpsc::Sender<Result<(), ServiceError>>,
    },
    MeasureConversion {
        query: ConversionQuery,
        reply: mpsc::Sender<Result<Histogram, ServiceError>>,
    },
    RemainingBudget {
        kind: FilterKind,
        epoch: u64,
        host: String,
        reply: mpsc::Sender<Result<PureDPBudget, ServiceError>>,
    },
    ClearEvents {
        reply: mpsc::Sender<Result<(), ServiceError>>,
    },
    ClearBudgets {
        reply: mpsc::Sender<Result<(), ServiceError>>,
    },
    AddMockEvent {
        epoch: u64,
        kind: ImpressionKind,
        index: u64,
        ad_id: String,
        source_host: String,
        target_host: String,
        reply: mpsc::Sender<Result<(), ServiceError>>,
    },
    SetRecordingEnabled {
        enabled: bool,
        reply: mpsc::Sender<Result<(), ServiceError>>,
    },
    Shutdown {
        reply: mpsc::Sender<Result<(), ServiceError>>,
    },
}

/// Authority handle for callers that do not own the stores. Each call is
/// forwarded over a channel to the actor spawned by [`spawn_authority`]
/// and blocks on the typed reply.
///
/// Cheap to clone; every clone talks to the same actor.
#[derive(Clone)]
pub struct RemoteAuthority {
    requests: mpsc::Sender<AuthorityRequest>,
}

impl RemoteAuthority {
    fn call<T>(
        &self,
        build: impl FnOnce(
            mpsc::Sender<Result<T, ServiceError>>,
        ) -> AuthorityRequest,
    ) -> Result<T, ServiceError> {
        let (reply, response) = mpsc::channel();
        self.requests
            .send(build(reply))
            .map_err(|_| ServiceError::NoAuthority)?;
        response.recv().map_err(|_| ServiceError::NoAuthority)?
    }

    /// Flips the actor's recording gate.
    pub fn set_recording_enabled(
        &self,
        enabled: bool,
    ) -> Result<(), ServiceError> {
        self.call(|reply| AuthorityRequest::SetRecordingEnabled {
            enabled,
            reply,
        })
    }

    /// Stops the actor once queued requests drain. Every call after this
    /// one fails with [`ServiceError::NoAuthority`].
    pub fn shutdown(&self) -> Result<(), ServiceError> {
        self.call(|reply| AuthorityRequest::Shutdown { reply })
    }
}

impl AttributionAuthority for RemoteAuthority {
    fn save_impression(
        &self,
        kind: ImpressionKind,
        index: u64,
        ad_id: &str,
        source_host: &str,
        target_host: &str,
    ) -> Result<(), ServiceError> {
        self.call(|reply| AuthorityRequest::SaveImpression {
            kind,
            index,
            ad_id: ad_id.to_owned(),
            source_host: source_host.to_owned(),
            target_host: target_host.to_owned(),
            reply,
        })
    }

    fn measure_conversion(
        &self,
        query: &ConversionQuery,
    ) -> Result<Histogram, ServiceError> {
        self.call(|reply| AuthorityRequest::MeasureConversion {
            query: query.clone(),
            reply,
        })
    }

    fn remaining_budget(
        &self,
        kind: FilterKind,
        epoch: u64,
        host: &str,
    ) -> Result<PureDPBudget, ServiceError> {
        self.call(|reply| AuthorityRequest::RemainingBudget {
            kind,
            epoch,
            host: host.to_owned(),
            reply,
        })
    }

    fn clear_events(&self) -> Result<(), ServiceError> {
        self.call(|reply| AuthorityRequest::ClearEvents { reply })
    }

    fn clear_budgets(&self) -> Result<(), ServiceError> {
        self.call(|reply| AuthorityRequest::ClearBudgets { reply })
    }

    fn add_mock_event(
        &self,
        epoch: u64,
        kind: ImpressionKind,
        index: u64,
        ad_id: &str,
        source_host: &str,
        target_host: &str,
    ) -> Result<(), ServiceError> {
        self.call(|reply| AuthorityRequest::AddMockEvent {
            epoch,
            kind,
            index,
            ad_id: ad_id.to_owned(),
            source_host: source_host.to_owned(),
            target_host: target_host.to_owned(),
            reply,
        })
    }
}

/// Spawns the actor thread owning the stores and returns a cloneable
/// remote handle to it.
///
/// The actor processes one request at a time, so overlapping operations on
/// the same budget keys are serialized and every report sees a consistent
/// snapshot. The loop ends when every handle is dropped or a shutdown
/// request arrives; replies to callers that already hung up are discarded.
pub fn spawn_authority<ES, FS>(
    engine: ReportEngine<ES, FS>,
    recording_enabled: bool,
) -> (RemoteAuthority, thread::JoinHandle<()>)
where
    ES: EventStorage<Event = ImpressionEvent, Error = LedgerError>
        + Send
        + 'static,
    FS: FilterStorage<
            FilterId = FilterId,
            Budget = PureDPBudget,
            Error = anyhow::Error,
        > + Send
        + 'static,
{
    let (requests, inbox) = mpsc::channel();
    let local = LocalAuthority::new(engine, recording_enabled);

    let handle = thread::spawn(move || {
        while let Ok(request) = inbox.recv() {
            match request {
                AuthorityRequest::SaveImpression {
                    kind,
                    index,
                    ad_id,
                    source_host,
                    target_host,
                    reply,
                } => {
                    let result = local.save_impression(
                        kind,
                        index,
                        &ad_id,
                        &source_host,
                        &target_host,
                    );
                    let _ = reply.send(result);
                }
                AuthorityRequest::MeasureConversion { query, reply } => {
                    let _ = reply.send(local.measure_conversion(&query));
                }
                AuthorityRequest::RemainingBudget {
                    kind,
                    epoch,
                    host,
                    reply,
                } => {
                    let _ =
                        reply.send(local.remaining_budget(kind, epoch, &host));
                }
                AuthorityRequest::ClearEvents { reply } => {
                    let _ = reply.send(local.clear_events());
                }
                AuthorityRequest::ClearBudgets { reply } => {
                    let _ = reply.send(local.clear_budgets());
                }
                AuthorityRequest::AddMockEvent {
                    epoch,
                    kind,
                    index,
                    ad_id,
                    source_host,
                    target_host,
                    reply,
                } => {
                    let result = local.add_mock_event(
                        epoch,
                        kind,
                        index,
                        &ad_id,
                        &source_host,
                        &target_host,
                    );
                    let _ = reply.send(result);
                }
                AuthorityRequest::SetRecordingEnabled { enabled, reply } => {
                    local.set_recording_enabled(enabled);
                    let _ = reply.send(Ok(()));
                }
                AuthorityRequest::Shutdown { reply } => {
                    let _ = reply.send(Ok(()));
                    break;
                }
            }
        }
        debug!("Authority actor stopped");
    });

    (RemoteAuthority { requests }, handle)
}
