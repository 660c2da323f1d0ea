mod context;
mod recorded;
mod stack;

use crate::coroutine::{Location, Variable};
use crate::error::Result;

pub use context::DebugContext;
pub use recorded::RecordedFrame;
pub use stack::{PresentationHint, StackAssembler, StackEntry};

pub type FrameId = u64;
pub type ThreadId = u64;

/// A frame of the paused thread stack, borrowed for the duration of one request.
pub trait FrameProxy {
    fn id(&self) -> FrameId;

    fn thread_id(&self) -> ThreadId;

    /// False once the frame reference cannot be used for any further request.
    fn is_valid(&self) -> bool {
        true
    }

    /// `Ok(None)` when the frame has no location information.
    fn location(&self) -> Result<Option<Location>>;

    fn visible_variables(&self) -> Result<Vec<Variable>>;

    /// Location lookup that swallows target failures.
    fn safe_location(&self) -> Option<Location> {
        self.location().ok().flatten()
    }
}
