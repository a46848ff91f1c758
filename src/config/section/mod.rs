//! Configuration section definitions for `scriptswap.toml`.

mod backup;
mod cache;
mod compile;
mod notify;
mod watch;

pub use backup::BackupConfig;
pub use cache::CacheConfig;
pub use compile::CompileConfig;
pub use notify::NotifyConfig;
pub use watch::WatchConfig;
