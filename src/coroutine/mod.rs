//! Stack reconstruction for suspended coroutines.

mod filter;
mod preflight;
mod snapshot;
mod stitcher;

pub use filter::{is_negative_line_invoke_suspend, is_resumption_frame, UnknownLinePolicy};
pub use preflight::{
    preflight, ChildDelegate, ChildOrigin, CollectedChildren, CompositeNode, FrameChild,
    PreflightFrame, VisibleLocals,
};
pub use snapshot::{Location, LogicalFrame, MethodRef, TaskSnapshot, Variable, INVOKE_SUSPEND};
pub use stitcher::{EffectiveFrame, FrameDescriptor, LocationOverrideFrame, Stitcher, TRACE_TARGET};
