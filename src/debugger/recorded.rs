use super::{FrameId, FrameProxy, ThreadId};
use crate::coroutine::{Location, Variable};
use crate::error::{DebuggerError, Result};
use serde::{Deserialize, Serialize};

fn default_valid() -> bool {
    true
}

/// A thread frame read back from a capture file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedFrame {
    pub id: FrameId,
    #[serde(default)]
    pub thread_id: ThreadId,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default = "default_valid")]
    pub valid: bool,
}

impl RecordedFrame {
    pub fn new(id: FrameId, location: Option<Location>, variables: Vec<Variable>) -> Self {
        Self {
            id,
            thread_id: 0,
            location,
            variables,
            valid: true,
        }
    }

    pub fn on_thread(mut self, thread_id: ThreadId) -> Self {
        self.thread_id = thread_id;
        self
    }

    /// Same frame, after the target dropped it.
    pub fn invalidated(mut self) -> Self {
        self.valid = false;
        self
    }

    fn check_valid(&self) -> Result<()> {
        if self.valid {
            Ok(())
        } else {
            Err(DebuggerError::InvalidFrame(self.id))
        }
    }
}

impl FrameProxy for RecordedFrame {
    fn id(&self) -> FrameId {
        self.id
    }

    fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn location(&self) -> Result<Option<Location>> {
        self.check_valid()?;
        Ok(self.location.clone())
    }

    fn visible_variables(&self) -> Result<Vec<Variable>> {
        self.check_valid()?;
        Ok(self.variables.clone())
    }
}
