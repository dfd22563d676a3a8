// Background jobs

pub mod expired_transaction;
pub mod scheduler;

pub use expired_transaction::{Collaborators, ExpiredTransactionReconciler, TickReport};
pub use scheduler::{start_scheduler, LastRun, TickRunner};
