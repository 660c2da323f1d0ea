use crate::debugger::{FrameId, ThreadId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DebuggerError {
    #[error("frame {0} is no longer valid")]
    InvalidFrame(FrameId),

    #[error("target is not available: {0}")]
    Disconnected(String),

    #[error("unknown thread {0}")]
    UnknownThread(ThreadId),

    #[error("unknown frame reference {0}")]
    UnknownFrame(u64),

    #[error("capture error: {0}")]
    Capture(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("logging setup failed: {0}")]
    Logging(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = DebuggerError> = std::result::Result<T, E>;
