pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{Config, ConfigError, DiscordConfig, FeedConfig, LoggingConfig, MatchingConfig, PlexConfig, SchedulerConfig, TautulliConfig, default_scheduler_config, MAX_BATCH_SIZE};
pub use credentials::{CredentialStore, Secret};
pub use paths::{PathManager, container_base_path};
