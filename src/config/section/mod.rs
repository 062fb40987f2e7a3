//! Configuration section definitions.

mod clean;
mod serve;
mod transform;
mod watch;

pub use clean::CleanConfig;
pub use serve::ServeConfig;
pub use transform::{MarkupConfig, StyleTargets, StylesConfig};
pub use watch::WatchConfig;
