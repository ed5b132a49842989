//! Actor-based monitoring
//!
//! Every duty of a monitored target runs as an independent async task:
//!
//! - **ProbeActor**: probes the target at its check interval and records observations
//! - **ReportActor**: one per report definition; snapshots the stat store, feeds the
//!   alerter and hands the result to a reporter
//! - **AlertActor**: owns the target's alert state machine and applies samples one at a time
//!
//! A [`coordinator::MonitorCoordinator`] wires the actors of one target together and
//! stops them through a shared cancellation token.
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: Each actor has an mpsc command channel for control messages
//! 2. **Request/Response**: oneshot channels for synchronous queries
//! 3. **Shared state**: the stat store is shared behind a read/write lock

pub mod alert;
pub mod coordinator;
pub mod messages;
pub mod probe;
pub mod report;
