//! Computes what the merged top-of-stack frame of a suspended coroutine presents.
//!
//! The thread stack only shows the `invokeSuspend` trampoline at this point. When a
//! snapshot of the coroutine is available, the trampoline is presented at the
//! location of the innermost restored frame instead.

use super::snapshot::{Location, TaskSnapshot, Variable};
use crate::debugger::{FrameId, FrameProxy, ThreadId};
use crate::error::{DebuggerError, Result};

/// Log target for coroutine stack dumps.
pub const TRACE_TARGET: &str = "coroutine_debugger::trace";

/// Presents `frame` at `location`; every other query goes to the wrapped frame.
#[derive(Debug)]
pub struct LocationOverrideFrame<'a, F> {
    location: Location,
    frame: &'a F,
}

impl<'a, F: FrameProxy> LocationOverrideFrame<'a, F> {
    pub fn new(location: Location, frame: &'a F) -> Self {
        Self { location, frame }
    }

    pub fn wrapped(&self) -> &'a F {
        self.frame
    }
}

impl<F: FrameProxy> FrameProxy for LocationOverrideFrame<'_, F> {
    fn id(&self) -> FrameId {
        self.frame.id()
    }

    fn thread_id(&self) -> ThreadId {
        self.frame.thread_id()
    }

    fn is_valid(&self) -> bool {
        self.frame.is_valid()
    }

    fn location(&self) -> Result<Option<Location>> {
        if !self.frame.is_valid() {
            return Err(DebuggerError::InvalidFrame(self.frame.id()));
        }
        Ok(Some(self.location.clone()))
    }

    fn visible_variables(&self) -> Result<Vec<Variable>> {
        self.frame.visible_variables()
    }
}

/// The frame reference a descriptor is bound to.
#[derive(Debug)]
pub enum EffectiveFrame<'a, F> {
    Real(&'a F),
    Overridden(LocationOverrideFrame<'a, F>),
}

impl<'a, F: FrameProxy> EffectiveFrame<'a, F> {
    /// The underlying thread frame, whether or not it is wrapped.
    pub fn real(&self) -> &'a F {
        match self {
            EffectiveFrame::Real(frame) => *frame,
            EffectiveFrame::Overridden(frame) => frame.wrapped(),
        }
    }
}

impl<F: FrameProxy> FrameProxy for EffectiveFrame<'_, F> {
    fn id(&self) -> FrameId {
        self.real().id()
    }

    fn thread_id(&self) -> ThreadId {
        self.real().thread_id()
    }

    fn is_valid(&self) -> bool {
        self.real().is_valid()
    }

    fn location(&self) -> Result<Option<Location>> {
        match self {
            EffectiveFrame::Real(frame) => frame.location(),
            EffectiveFrame::Overridden(frame) => frame.location(),
        }
    }

    fn visible_variables(&self) -> Result<Vec<Variable>> {
        self.real().visible_variables()
    }
}

/// A frame reference bound to the location resolved for it.
#[derive(Debug)]
pub struct FrameDescriptor<'a, F> {
    frame: EffectiveFrame<'a, F>,
    location: Option<Location>,
}

impl<'a, F: FrameProxy> FrameDescriptor<'a, F> {
    pub fn frame(&self) -> &EffectiveFrame<'a, F> {
        &self.frame
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn is_overridden(&self) -> bool {
        matches!(self.frame, EffectiveFrame::Overridden(_))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Stitcher {
    trace_enabled: bool,
}

impl Stitcher {
    pub fn new(trace_enabled: bool) -> Self {
        Self { trace_enabled }
    }

    pub fn trace_enabled(&self) -> bool {
        self.trace_enabled
    }

    /// Builds the descriptor for the merged top frame.
    ///
    /// With a non-empty snapshot whose innermost frame has a location, the real frame
    /// is wrapped so it reports that location. Otherwise the real frame is used as-is
    /// and its own location is read, which propagates target failures.
    pub fn top_descriptor<'a, F: FrameProxy>(
        &self,
        frame: &'a F,
        snapshot: &TaskSnapshot,
    ) -> Result<FrameDescriptor<'a, F>> {
        if !snapshot.is_empty() {
            self.dump_frames(frame, snapshot);
        }

        match snapshot.first().and_then(|restored| restored.location.as_ref()) {
            Some(restored) => Ok(FrameDescriptor {
                frame: EffectiveFrame::Overridden(LocationOverrideFrame::new(
                    restored.clone(),
                    frame,
                )),
                location: Some(restored.clone()),
            }),
            None => Ok(FrameDescriptor {
                location: frame.location()?,
                frame: EffectiveFrame::Real(frame),
            }),
        }
    }

    fn dump_frames<F: FrameProxy>(&self, frame: &F, snapshot: &TaskSnapshot) {
        if !self.trace_enabled {
            return;
        }
        let real = frame
            .safe_location()
            .map(|l| l.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        tracing::info!(target: TRACE_TARGET, frame = frame.id(), "real frame: {}", real);
        for (index, restored) in snapshot.frames.iter().enumerate() {
            let location = restored
                .location
                .as_ref()
                .map(|l| l.to_string())
                .unwrap_or_else(|| "<unknown>".to_string());
            tracing::info!(target: TRACE_TARGET, index, "restored: {}", location);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coroutine::{LogicalFrame, MethodRef, INVOKE_SUSPEND};
    use crate::debugger::RecordedFrame;

    fn trampoline() -> RecordedFrame {
        RecordedFrame::new(
            3,
            Some(Location::new(
                MethodRef::new("demo.FooKt$load$1", INVOKE_SUSPEND),
                Some("Foo.kt"),
                Some(-1),
            )),
            vec![Variable::new("$result", "null")],
        )
    }

    fn restored(line: i32) -> Location {
        Location::new(MethodRef::new("demo.FooKt", "load"), Some("Foo.kt"), Some(line))
    }

    #[test]
    fn test_override_reports_restored_location_only() {
        let frame = trampoline();
        let snapshot = TaskSnapshot::new(vec![LogicalFrame::new(restored(10), vec![])]);

        let descriptor = Stitcher::new(false).top_descriptor(&frame, &snapshot).unwrap();

        assert!(descriptor.is_overridden());
        assert_eq!(descriptor.location(), Some(&restored(10)));
        assert_eq!(descriptor.frame().location().unwrap(), Some(restored(10)));
        assert_eq!(descriptor.frame().id(), frame.id());
        assert_eq!(
            descriptor.frame().visible_variables().unwrap(),
            frame.visible_variables().unwrap()
        );
        // the wrapped frame keeps its own location
        assert_eq!(frame.location().unwrap().unwrap().line, Some(-1));
    }

    #[test]
    fn test_empty_snapshot_passes_real_frame_through() {
        let frame = trampoline();
        let descriptor = Stitcher::new(false)
            .top_descriptor(&frame, &TaskSnapshot::empty())
            .unwrap();

        assert!(!descriptor.is_overridden());
        assert_eq!(descriptor.location(), frame.location().unwrap().as_ref());
    }

    #[test]
    fn test_restored_frame_without_location_falls_back() {
        let frame = trampoline();
        let snapshot = TaskSnapshot::new(vec![LogicalFrame {
            location: None,
            spilled_variables: vec![Variable::new("x", "1")],
        }]);

        let descriptor = Stitcher::new(true).top_descriptor(&frame, &snapshot).unwrap();
        assert!(!descriptor.is_overridden());
        assert_eq!(descriptor.location(), frame.location().unwrap().as_ref());
    }

    #[test]
    fn test_override_of_invalid_frame_fails_like_the_frame() {
        let frame = trampoline().invalidated();
        let wrapped = LocationOverrideFrame::new(restored(10), &frame);

        assert!(!wrapped.is_valid());
        assert!(matches!(
            wrapped.location(),
            Err(crate::error::DebuggerError::InvalidFrame(3))
        ));
        assert!(matches!(
            frame.location(),
            Err(crate::error::DebuggerError::InvalidFrame(3))
        ));
        assert!(wrapped.visible_variables().is_err());
        assert_eq!(wrapped.safe_location(), None);
    }

    #[test]
    fn test_trace_flag_does_not_change_result() {
        let frame = trampoline();
        let snapshot = TaskSnapshot::new(vec![
            LogicalFrame::new(restored(10), vec![]),
            LogicalFrame::new(restored(20), vec![]),
        ]);

        let quiet_stitcher = Stitcher::new(false);
        let traced_stitcher = Stitcher::new(true);
        assert!(!quiet_stitcher.trace_enabled());
        assert!(traced_stitcher.trace_enabled());

        let quiet = quiet_stitcher.top_descriptor(&frame, &snapshot).unwrap();
        let traced = traced_stitcher.top_descriptor(&frame, &snapshot).unwrap();
        assert_eq!(quiet.location(), traced.location());
        assert_eq!(quiet.is_overridden(), traced.is_overridden());
    }

    #[test]
    fn test_invalid_frame_error_propagates_on_pass_through() {
        let frame = trampoline().invalidated();
        let result = Stitcher::new(false).top_descriptor(&frame, &TaskSnapshot::empty());
        assert!(matches!(
            result,
            Err(crate::error::DebuggerError::InvalidFrame(3))
        ));
    }
}
