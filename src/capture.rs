//! Recorded thread stacks and coroutine snapshots of a paused program.

use crate::coroutine::TaskSnapshot;
use crate::debugger::{RecordedFrame, ThreadId};
use crate::error::{DebuggerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedThread {
    pub id: ThreadId,
    pub name: String,
    /// Innermost frame first.
    #[serde(default)]
    pub frames: Vec<RecordedFrame>,
    /// Snapshot of the coroutine suspended on this thread, if any.
    #[serde(default)]
    pub coroutine: Option<TaskSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureFile {
    pub threads: Vec<CapturedThread>,
}

impl CaptureFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let capture = Self::from_json(&contents)?;
        tracing::info!(
            "loaded capture {} with {} threads",
            path.display(),
            capture.threads.len()
        );
        Ok(capture)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let mut capture: CaptureFile = serde_json::from_str(contents)?;
        capture.validate()?;
        for thread in &mut capture.threads {
            for frame in &mut thread.frames {
                frame.thread_id = thread.id;
            }
        }
        Ok(capture)
    }

    fn validate(&self) -> Result<()> {
        let mut thread_ids = HashSet::new();
        let mut frame_ids = HashSet::new();
        for thread in &self.threads {
            if !thread_ids.insert(thread.id) {
                return Err(DebuggerError::Capture(format!(
                    "duplicate thread id {}",
                    thread.id
                )));
            }
            for frame in &thread.frames {
                if !frame_ids.insert(frame.id) {
                    return Err(DebuggerError::Capture(format!(
                        "duplicate frame id {}",
                        frame.id
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn thread(&self, id: ThreadId) -> Result<&CapturedThread> {
        self.threads
            .iter()
            .find(|t| t.id == id)
            .ok_or(DebuggerError::UnknownThread(id))
    }
}
