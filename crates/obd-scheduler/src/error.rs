//! Scheduler error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("PID list owner is gone")]
    ListClosed,
}
