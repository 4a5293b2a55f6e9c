//! Mailivo trigger event infrastructure.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`TriggerEvent`]: the envelope carrying one trigger firing.
//! - [`ScheduleTicker`]: background task emitting one `time_based` event per
//!   minute.

pub mod bus;
pub mod scheduler;

pub use bus::{EventBus, TriggerEvent};
pub use scheduler::ScheduleTicker;
