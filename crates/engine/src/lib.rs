//! Mailivo automation runtime.
//!
//! [`Dispatcher`] matches a [`TriggerEvent`](mailivo_events::TriggerEvent) to
//! active automations and runs each one through load, condition filtering
//! and campaign creation, recording one execution entry per run.
//! [`AutomationListener`] feeds it from the event bus.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod listener;
pub mod loader;
pub mod memory;
pub mod trace;

pub use config::{ConfigError, EngineConfig};
pub use dispatcher::{Collaborators, Dispatcher};
pub use error::{EngineError, ExecutionError};
pub use listener::AutomationListener;
