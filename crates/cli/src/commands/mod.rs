//! CLI commands for the depthwatch collector.

pub mod collect;
pub mod snapshot;
pub mod validate_config;

pub use collect::{run_collect, CollectArgs};
pub use snapshot::{run_snapshot, SnapshotArgs};
pub use validate_config::{run_validate_config, ValidateConfigArgs};
