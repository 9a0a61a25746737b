use serde::Serialize;

use crate::events::traits::LedgerError;

/// How the user interacted with the ad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ImpressionKind {
    View,
    Click,
}

/// A single recorded ad impression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpressionEvent {
    /// Caller-assigned identifier, unique per source host. Doubles as the
    /// histogram bucket this impression reports into and as the tie-breaker
    /// when several impressions share a timestamp.
    pub index: u64,

    /// Milliseconds since the Unix epoch, same scale as JS's Date.now().
    pub timestamp: u64,

    /// Epoch the timestamp falls into, fixed at record time.
    pub epoch_number: u64,

    pub kind: ImpressionKind,

    /// Site that showed the ad.
    pub source_host: String,

    /// Site the ad advertises, which is also the only site allowed to query
    /// reports attributing this impression.
    pub target_host: String,

    /// Identifier of the creative or campaign.
    pub ad_id: String,
}

impl ImpressionEvent {
    /// Rejects events that could never be attributed. Full host validation
    /// is the embedder's job; empty hosts are refused here so they cannot
    /// poison the store.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.source_host.is_empty() {
            return Err(LedgerError::InvalidEvent(
                "empty source host".into(),
            ));
        }
        if self.target_host.is_empty() {
            return Err(LedgerError::InvalidEvent(
                "empty target host".into(),
            ));
        }
        Ok(())
    }
}
