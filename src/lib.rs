//! Event-level attribution engine with per-epoch privacy budgets.
//!
//! Impressions are recorded into an event ledger, conversion queries compute
//! last-touch histogram reports over a bounded epoch window, and every query
//! charges privacy filters keyed by (filter family, epoch, host) in a single
//! all-or-nothing transaction. The engine sits behind an authority seam so
//! callers work the same whether they own the stores or forward to the
//! owning actor.

pub mod budget;
pub mod clock;
pub mod events;
pub mod queries;
pub mod service;
pub mod util;
