use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::SchedulerError;
use crate::registry::Registry;

/// Current on-disk checkpoint format version. Bump this and add a migration
/// (or a hard rejection) if `Registry`'s shape ever changes incompatibly.
const CHECKPOINT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct CheckpointEnvelope {
    version: u32,
    registry: Registry,
}

#[derive(Serialize)]
struct CheckpointEnvelopeRef<'a> {
    version: u32,
    registry: &'a Registry,
}

/// Reads and writes the registry checkpoint file described in the
/// persistence section of the design: a single, versioned binary encoding
/// of the whole registry, rewritten after every successful mutation.
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the registry from disk. Returns an empty registry if no
    /// checkpoint file exists yet (first boot); a corrupt or
    /// version-mismatched file is a fatal startup error, per design — losing
    /// state silently is worse than refusing to start.
    pub fn load(&self) -> Result<Registry, SchedulerError> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "no checkpoint found, starting with an empty registry");
            return Ok(Registry::new());
        }
        let bytes = std::fs::read(&self.path).map_err(|source| SchedulerError::CheckpointWrite {
            path: self.path.clone(),
            source,
        })?;
        let envelope: CheckpointEnvelope =
            bincode::deserialize(&bytes).map_err(|source| SchedulerError::CheckpointCorrupt {
                path: self.path.clone(),
                source,
            })?;
        if envelope.version != CHECKPOINT_VERSION {
            return Err(SchedulerError::CheckpointCorrupt {
                path: self.path.clone(),
                source: Box::new(bincode::ErrorKind::Custom(format!(
                    "unsupported checkpoint version {} (expected {CHECKPOINT_VERSION})",
                    envelope.version
                ))),
            });
        }
        let mut registry = envelope.registry;
        registry.rebuild_index();
        info!(path = %self.path.display(), functions = registry.len(), "checkpoint restored");
        Ok(registry)
    }

    /// Writes `registry` to disk via a temp-file-and-rename so a crash
    /// mid-write cannot leave a half-written, corrupt checkpoint behind —
    /// resolving the design's open question on checkpoint atomicity in
    /// favor of crash safety.
    pub fn save(&self, registry: &Registry) -> Result<(), SchedulerError> {
        let envelope = CheckpointEnvelopeRef {
            version: CHECKPOINT_VERSION,
            registry,
        };
        let bytes = bincode::serialize(&envelope).map_err(|source| SchedulerError::CheckpointCorrupt {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| SchedulerError::CheckpointWrite {
                    path: self.path.clone(),
                    source,
                })?;
            }
        }

        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, &bytes).map_err(|source| SchedulerError::CheckpointWrite {
            path: tmp_path.clone(),
            source,
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|source| {
            error!(path = %self.path.display(), "checkpoint rename failed");
            SchedulerError::CheckpointWrite {
                path: self.path.clone(),
                source,
            }
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FunctionDef;
    use crate::invocation::InvocationMethod;

    fn sample_registry() -> Registry {
        let dir = tempfile::tempdir().unwrap();
        let scratch_checkpoint = CheckpointStore::new(dir.path().join("scratch.chk"));
        let mut r = Registry::new();
        r.register(FunctionDef {
            name: "f".into(),
            subs: vec!["A".into(), "B".into()],
            url: "http://example.invalid/f".into(),
            method: InvocationMethod::Post,
            mock: true,
        })
        .unwrap();
        r.dispatch_event(crate::event::Event::new("A", None), &scratch_checkpoint);
        r
    }

    #[test]
    fn round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("scheduler.chk"));
        let registry = sample_registry();
        store.save(&registry).unwrap();

        let restored = store.load().unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.snapshot()[0].rows.len(), 1);
        assert_eq!(restored.snapshot()[0].rows[0].ready, vec!["A".to_string()]);
    }

    #[test]
    fn missing_file_yields_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("missing.chk"));
        let registry = store.load().unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn corrupt_file_is_a_fatal_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scheduler.chk");
        std::fs::write(&path, b"not a checkpoint").unwrap();
        let store = CheckpointStore::new(path);
        assert!(store.load().is_err());
    }
}
