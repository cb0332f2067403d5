use std::path::PathBuf;

/// Errors surfaced by the registry, checkpoint, and dispatch machinery.
///
/// HTTP-facing translation of these variants into status codes lives in
/// `scheduler-daemon`, mirroring how `cave-kernel::KernelError` stays
/// transport-agnostic and lets the daemon crate do the mapping.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("function name must not be empty")]
    EmptyName,

    #[error("function {0:?} subscribes to no events")]
    EmptySubs(String),

    #[error("function {0:?} has duplicate subscriptions")]
    DuplicateSubs(String),

    #[error("checkpoint at {path} is corrupt: {source}")]
    CheckpointCorrupt {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("failed to write checkpoint at {path}")]
    CheckpointWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
