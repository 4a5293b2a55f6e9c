//! Mailivo automation domain: pure logic, no I/O.
//!
//! - [`trigger`]: the closed set of trigger types, their configs and event
//!   payload matching.
//! - [`conditions`] / [`filters`]: typed condition predicates and the
//!   sequential narrowing pipeline over a [`records::RecordSet`].
//! - [`payment_plan`]: financing plan selection strategies.
//! - [`validation`]: save/activate-time structural checks.
//! - [`services`]: collaborator traits implemented by the db, clients and
//!   in-memory adapters.

pub mod action;
pub mod automation;
pub mod campaign;
pub mod conditions;
pub mod error;
pub mod execution;
pub mod filters;
pub mod payment_plan;
pub mod records;
pub mod services;
pub mod trigger;
pub mod types;
pub mod validation;
