pub mod traits;
pub mod error;
pub mod feed;
pub mod plex;
pub mod tautulli;
pub mod discord;

pub use traits::{FeedSource, ItemFilter, LibraryService, Notifier, SecondaryMetadataService};
pub use error::SourceError;
pub use feed::RssFeed;
pub use plex::PlexLibrary;
pub use tautulli::TautulliClient;
pub use discord::DiscordWebhook;
