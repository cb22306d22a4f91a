//! Scheduled order book collection.
//!
//! A [`Collector`] samples one (exchange, symbol) pair on aligned ticks,
//! exports its buffer hourly and resets it daily. [`CollectorManager`] runs
//! many collectors concurrently and waits for all of them.

pub mod buffer;
pub mod collector;
pub mod manager;
pub mod scheduler;
pub mod shutdown;
pub mod types;

pub use buffer::SampleBuffer;
pub use collector::Collector;
pub use manager::CollectorManager;
pub use scheduler::{Scheduler, SchedulerAction, SchedulerState};
pub use shutdown::Shutdown;
pub use types::{CollectorConfig, CollectorEvent, CollectorStats};
