pub mod external_id;
pub mod library;
pub mod match_result;
pub mod media;
pub mod notification;
pub mod tracked;
pub mod watchlist;

pub use external_id::{ExternalId, Provider};
pub use library::{ItemPage, LibraryItem, Section};
pub use match_result::MatchResult;
pub use media::MediaType;
pub use notification::NotificationPayload;
pub use tracked::{TrackedEntry, TrackingStatus};
pub use watchlist::WatchlistEntry;
