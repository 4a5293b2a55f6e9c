pub mod automation;
pub mod execution;
