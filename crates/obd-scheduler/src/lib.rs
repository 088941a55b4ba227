//! OBD-II Scheduler for Continuous PID Polling
//!
//! Keeps the set of PIDs the application wants to watch behind a single
//! owner task and polls them in the background, yielding one map of
//! measurements per round trip.

mod error;
mod pid_list;
mod poller;

pub use error::SchedulerError;
pub use pid_list::PidList;
pub use poller::{spawn_poller, PidValues, PollStream, PollerConfig};
