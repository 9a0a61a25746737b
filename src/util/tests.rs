use crate::{
    budget::{pure_dp_filter::PureDPBudget, quotas::StaticCapacities},
    events::impression::{ImpressionEvent, ImpressionKind},
    queries::{conversion::ConversionQuery, histogram::Histogram},
};

// Sample mock values to reduce boilerplate in tests.

impl<FID> StaticCapacities<FID, PureDPBudget> {
    /// Sample capacity values for testing.
    pub fn mock() -> Self {
        Self::new(
            PureDPBudget::Epsilon(1.0),
            PureDPBudget::Epsilon(20.0),
            PureDPBudget::Epsilon(1.5),
            PureDPBudget::Epsilon(4.0),
        )
    }
}

impl ImpressionEvent {
    /// Sample impression for testing.
    pub fn mock() -> Self {
        Self {
            index: 1,
            timestamp: 100,
            epoch_number: 0,
            kind: ImpressionKind::View,
            source_host: "blog.example".to_string(),
            target_host: "shoes.example".to_string(),
            ad_id: "back-to-school-sale".to_string(),
        }
    }
}

impl ConversionQuery {
    /// Sample query matching [`ImpressionEvent::mock`].
    pub fn mock() -> Self {
        Self {
            target_host: "shoes.example".to_string(),
            source_hosts: vec![
                "blog.example".to_string(),
                "news.example".to_string(),
            ],
            ad_ids: vec!["back-to-school-sale".to_string()],
            histogram_size: 4,
            lookback_days: None,
            kind_filter: None,
        }
    }
}

/// Asserts a report's buckets, tolerating float rounding.
#[track_caller]
pub fn assert_bins(report: &Histogram, expected: &[f64]) {
    let bins = report.bins();
    assert_eq!(
        bins.len(),
        expected.len(),
        "bucket count mismatch: {bins:?}"
    );
    for (i, (got, want)) in bins.iter().zip(expected).enumerate() {
        assert!(
            (got - want).abs() < 1e-9,
            "bucket {i}: got {got}, want {want} (full report: {bins:?})"
        );
    }
}

/// Asserts a filter's remaining epsilon, tolerating the float rounding
/// that repeated consumption accumulates.
#[track_caller]
pub fn assert_remaining(budget: PureDPBudget, expected_epsilon: f64) {
    match budget {
        PureDPBudget::Epsilon(epsilon) => assert!(
            (epsilon - expected_epsilon).abs() < 1e-9,
            "remaining budget: got {epsilon}, want {expected_epsilon}"
        ),
        PureDPBudget::Infinite => {
            panic!("remaining budget: got Infinite, want {expected_epsilon}")
        }
    }
}
