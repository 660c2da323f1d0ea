use super::snapshot::MethodRef;
use crate::debugger::FrameProxy;
use serde::{Deserialize, Serialize};

/// How a missing line number is read by the resumption frame filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum UnknownLinePolicy {
    /// Unknown lines count as line 0, so such frames are never filtered.
    #[default]
    AsZero,
    /// Unknown lines count as negative, so an `invokeSuspend` frame without
    /// line information is treated as a resumption frame.
    AsNegative,
}

impl UnknownLinePolicy {
    fn default_line(self) -> i32 {
        match self {
            UnknownLinePolicy::AsZero => 0,
            UnknownLinePolicy::AsNegative => -1,
        }
    }
}

/// True for the synthetic `invokeSuspend` frame the runtime enters on resumption.
pub fn is_resumption_frame(method: &MethodRef, line: Option<i32>, policy: UnknownLinePolicy) -> bool {
    method.is_invoke_suspend() && line.unwrap_or(policy.default_line()) < 0
}

/// Frames whose location cannot be read never match.
pub fn is_negative_line_invoke_suspend<F: FrameProxy + ?Sized>(
    frame: &F,
    policy: UnknownLinePolicy,
) -> bool {
    match frame.safe_location() {
        Some(location) => is_resumption_frame(&location.method, location.line, policy),
        None => false,
    }
}
