pub mod normalize;
mod paging;
pub mod identity_index;
pub mod scan_cache;
pub mod context;
pub mod tiers;
pub mod orchestrator;
pub mod tracking;
pub mod state_store;
pub mod progress;
pub mod feeds;
pub mod cycle;

#[cfg(test)]
mod testing;

pub use normalize::{normalize_title, titles_equivalent, years_compatible};
pub use identity_index::IdentityIndex;
pub use scan_cache::ScanCache;
pub use context::{CycleContext, MatchSettings};
pub use tiers::{MatchState, MatchTier};
pub use orchestrator::{MatchOrchestrator, Resolution};
pub use tracking::{entries_to_recheck, reconcile, Reconciliation};
pub use state_store::{JsonStateStore, StateStore};
pub use progress::CycleStats;
pub use feeds::fetch_watchlist;
pub use cycle::{CycleOutcome, CycleRunner};
