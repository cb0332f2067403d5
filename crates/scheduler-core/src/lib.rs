//! Event-conjunction matching engine for the function scheduler.
//!
//! This crate owns the part of the system where correctness is subtle: the
//! per-function matrix of partial events ([`function::FunctionState`]), the
//! registry that holds all of them ([`registry::Registry`]), its on-disk
//! checkpoint ([`checkpoint::CheckpointStore`]), and the two worker loops
//! that drive them ([`scheduler::run_scheduler_loop`],
//! [`dispatcher::run_dispatcher_loop`]). The HTTP surface lives in
//! `scheduler-daemon` and talks to this crate only through
//! [`handle::SchedulerHandle`].

pub mod checkpoint;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod function;
pub mod handle;
pub mod invocation;
pub mod registry;
pub mod scheduler;

pub use checkpoint::CheckpointStore;
pub use config::SchedulerConfig;
pub use error::SchedulerError;
pub use event::{Event, EventStatus};
pub use function::{FunctionDef, RowStatus, StatusEntry};
pub use handle::SchedulerHandle;
pub use invocation::{ArgumentValue, Invocation, InvocationMethod};
pub use registry::Registry;
