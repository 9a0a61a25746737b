mod common;

use common::logging;
use palib::{
    budget::{
        quotas::{FilterKind, StaticCapacities},
        traits::FilterStorage,
    },
    clock::EpochClock,
    events::{
        btreemap_event_storage::BTreeMapEventStorage,
        impression::ImpressionKind,
    },
    queries::conversion::ConversionQuery,
    service::{
        aliases::{DefaultFilterStorage, DefaultReportEngine},
        authority::{
            spawn_authority, AttributionAuthority, LocalAuthority,
            ServiceError,
        },
        config::ServiceConfig,
        engine::ReportEngine,
    },
    util::tests::assert_bins,
};

fn new_engine() -> Result<DefaultReportEngine, anyhow::Error> {
    let filters = DefaultFilterStorage::new(StaticCapacities::default())?;
    Ok(ReportEngine::new(
        &ServiceConfig::default(),
        BTreeMapEventStorage::new(),
        filters,
    ))
}

fn current_epoch() -> u64 {
    ServiceConfig::default().clock().epoch_of(EpochClock::now_ms())
}

fn brand_query() -> ConversionQuery {
    ConversionQuery {
        target_host: "brand.example".to_string(),
        source_hosts: vec!["a.example".to_string()],
        ad_ids: vec!["summer-launch".to_string()],
        histogram_size: 4,
        // Wide enough to keep the injected epoch in the window even if the
        // wall clock crosses an epoch boundary mid-test.
        lookback_days: Some(7),
        kind_filter: None,
    }
}

/// The same sequence of operations answers identically through a local
/// authority and through the actor-backed remote one.
#[test]
fn main() -> Result<(), anyhow::Error> {
    logging::init_default_logging();

    let local = LocalAuthority::new(new_engine()?, true);
    let (remote, handle) = spawn_authority(new_engine()?, true);
    let epoch = current_epoch();

    let authorities: [&dyn AttributionAuthority; 2] = [&local, &remote];
    let mut reports = vec![];
    let mut budgets = vec![];
    for authority in authorities {
        authority.add_mock_event(
            epoch,
            ImpressionKind::View,
            2,
            "summer-launch",
            "a.example",
            "brand.example",
        )?;
        reports.push(authority.measure_conversion(&brand_query())?);
        budgets.push(authority.remaining_budget(
            FilterKind::PerQuerier,
            epoch,
            "brand.example",
        )?);
    }

    assert_eq!(reports[0], reports[1]);
    assert_bins(&reports[0], &[0.0, 0.0, 1.0, 0.0]);
    assert_eq!(budgets[0], budgets[1]);

    drop(remote);
    handle.join().ok();
    Ok(())
}

/// The remote gate behaves like the local one: silent writes, tagged
/// reads, administrative calls unaffected.
#[test]
fn remote_recording_gate() -> Result<(), anyhow::Error> {
    logging::init_default_logging();

    let (remote, handle) = spawn_authority(new_engine()?, false);

    remote.save_impression(
        ImpressionKind::View,
        0,
        "summer-launch",
        "a.example",
        "brand.example",
    )?;
    assert!(matches!(
        remote.measure_conversion(&brand_query()),
        Err(ServiceError::RecordingDisabled)
    ));
    remote.clear_budgets()?;

    remote.set_recording_enabled(true)?;
    let report = remote.measure_conversion(&brand_query())?;
    // The impression offered while disabled was never stored.
    assert!(report.is_all_zero());

    remote.shutdown()?;
    handle.join().ok();
    Ok(())
}

/// Dropping every handle stops the actor; a handle that outlives a
/// shutdown gets `NoAuthority` for everything.
#[test]
fn actor_lifecycle() -> Result<(), anyhow::Error> {
    logging::init_default_logging();

    // All handles dropped: the actor drains and exits on its own.
    let (remote, handle) = spawn_authority(new_engine()?, true);
    let clone = remote.clone();
    drop(remote);
    drop(clone);
    handle.join().ok();

    // Explicit shutdown: surviving handles turn into dead ends.
    let (remote, handle) = spawn_authority(new_engine()?, true);
    let survivor = remote.clone();
    remote.shutdown()?;
    handle.join().ok();

    assert!(matches!(
        survivor.measure_conversion(&brand_query()),
        Err(ServiceError::NoAuthority)
    ));
    assert!(matches!(
        survivor.clear_events(),
        Err(ServiceError::NoAuthority)
    ));
    assert!(matches!(
        survivor.save_impression(
            ImpressionKind::View,
            0,
            "summer-launch",
            "a.example",
            "brand.example",
        ),
        Err(ServiceError::NoAuthority)
    ));
    Ok(())
}
