pub mod automation_repo;
pub mod execution_repo;

pub use automation_repo::AutomationRepo;
pub use execution_repo::{CreateExecution, ExecutionRepo};
