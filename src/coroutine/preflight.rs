//! The merged top frame of a suspended coroutine.
//!
//! A preflight frame stands on the `invokeSuspend` trampoline of the thread stack but
//! presents the innermost restored coroutine frame: its location and its spilled
//! variables, followed by the trampoline's own locals.

use super::snapshot::{Location, LogicalFrame, TaskSnapshot, Variable};
use super::stitcher::{FrameDescriptor, Stitcher};
use crate::debugger::FrameProxy;
use crate::error::Result;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChildOrigin {
    /// Saved by the coroutine at its suspension point.
    Spilled,
    /// Visible on the real thread frame.
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameChild {
    pub origin: ChildOrigin,
    #[serde(flatten)]
    pub variable: Variable,
}

impl FrameChild {
    pub fn spilled(variable: Variable) -> Self {
        Self {
            origin: ChildOrigin::Spilled,
            variable,
        }
    }

    pub fn local(variable: Variable) -> Self {
        Self {
            origin: ChildOrigin::Local,
            variable,
        }
    }

    pub fn name(&self) -> &str {
        &self.variable.name
    }
}

/// Receiver of a frame's expanded children.
pub trait CompositeNode {
    /// `last` is true when no further batch follows.
    fn add_children(&mut self, children: Vec<FrameChild>, last: bool);
}

/// Computes the children a plain thread frame shows.
pub trait ChildDelegate {
    fn compute_children(&self, frame: &dyn FrameProxy) -> Result<Vec<Variable>>;
}

/// Default delegate: the frame's visible variables in their natural order.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisibleLocals;

impl ChildDelegate for VisibleLocals {
    fn compute_children(&self, frame: &dyn FrameProxy) -> Result<Vec<Variable>> {
        frame.visible_variables()
    }
}

/// Node that keeps every batch it receives.
#[derive(Debug, Default)]
pub struct CollectedChildren {
    pub batches: Vec<Vec<FrameChild>>,
    pub complete: bool,
}

impl CollectedChildren {
    pub fn into_children(self) -> Vec<FrameChild> {
        self.batches.into_iter().flatten().collect()
    }
}

impl CompositeNode for CollectedChildren {
    fn add_children(&mut self, children: Vec<FrameChild>, last: bool) {
        self.batches.push(children);
        self.complete = last;
    }
}

#[derive(Debug)]
pub struct PreflightFrame<'a, F> {
    snapshot: &'a TaskSnapshot,
    descriptor: FrameDescriptor<'a, F>,
    remaining: &'a [F],
}

/// Builds the merged top frame for `frame`, the trampoline of a suspended coroutine.
///
/// Returns `Ok(None)` when `frame` can no longer be used. Target failures while
/// resolving the real location are returned as errors.
pub fn preflight<'a, F: FrameProxy>(
    stitcher: &Stitcher,
    frame: &'a F,
    snapshot: &'a TaskSnapshot,
    remaining: &'a [F],
) -> Result<Option<PreflightFrame<'a, F>>> {
    if !frame.is_valid() {
        tracing::debug!(frame = frame.id(), "trampoline frame is not usable");
        return Ok(None);
    }
    let descriptor = stitcher.top_descriptor(frame, snapshot)?;
    Ok(Some(PreflightFrame {
        snapshot,
        descriptor,
        remaining,
    }))
}

impl<'a, F: FrameProxy> PreflightFrame<'a, F> {
    pub fn snapshot(&self) -> &'a TaskSnapshot {
        self.snapshot
    }

    pub fn descriptor(&self) -> &FrameDescriptor<'a, F> {
        &self.descriptor
    }

    pub fn presented_location(&self) -> Option<&Location> {
        self.descriptor.location()
    }

    /// Real frames beneath the trampoline.
    pub fn remaining_frames(&self) -> &'a [F] {
        self.remaining
    }

    /// Logical frames still to be shown under this one; the innermost is already
    /// summarized here.
    pub fn restored_frames(&self) -> &'a [LogicalFrame] {
        self.snapshot.restored_below_top()
    }

    pub fn is_in_library_content(&self) -> bool {
        false
    }

    pub fn is_synthetic(&self) -> bool {
        false
    }

    /// Spilled variables of the innermost restored frame, then the real locals.
    pub fn children_with(&self, delegate: &dyn ChildDelegate) -> Result<Vec<FrameChild>> {
        let mut children: Vec<FrameChild> = self
            .snapshot
            .first()
            .map(|restored| {
                restored
                    .spilled_variables
                    .iter()
                    .cloned()
                    .map(FrameChild::spilled)
                    .collect()
            })
            .unwrap_or_default();

        let locals = delegate.compute_children(self.descriptor.frame())?;
        children.extend(locals.into_iter().map(FrameChild::local));
        Ok(children)
    }

    pub fn children(&self) -> Result<Vec<FrameChild>> {
        self.children_with(&VisibleLocals)
    }

    /// Delivers all children to `node` in a single, final batch.
    pub fn compute_children(
        &self,
        node: &mut dyn CompositeNode,
        delegate: &dyn ChildDelegate,
    ) -> Result<()> {
        let children = self.children_with(delegate)?;
        node.add_children(children, true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coroutine::{MethodRef, INVOKE_SUSPEND};
    use crate::debugger::RecordedFrame;
    use crate::error::DebuggerError;

    fn trampoline(locals: &[&str]) -> RecordedFrame {
        RecordedFrame::new(
            7,
            Some(Location::new(
                MethodRef::new("demo.FooKt$run$1", INVOKE_SUSPEND),
                None,
                Some(-1),
            )),
            locals.iter().map(|n| Variable::new(*n, "0")).collect(),
        )
    }

    fn snapshot(vars: &[&str]) -> TaskSnapshot {
        TaskSnapshot::new(vec![LogicalFrame::new(
            Location::new(MethodRef::new("demo.FooKt", "run"), Some("Foo.kt"), Some(10)),
            vars.iter().map(|n| Variable::new(*n, "1")).collect(),
        )])
    }

    fn names(children: &[FrameChild]) -> Vec<&str> {
        children.iter().map(FrameChild::name).collect()
    }

    #[test]
    fn test_single_final_batch() {
        let frame = trampoline(&["y"]);
        let snapshot = snapshot(&["x"]);
        let preflight = preflight(&Stitcher::default(), &frame, &snapshot, &[])
            .unwrap()
            .unwrap();

        let mut node = CollectedChildren::default();
        preflight.compute_children(&mut node, &VisibleLocals).unwrap();

        assert_eq!(node.batches.len(), 1);
        assert!(node.complete);
        let children = node.into_children();
        assert_eq!(names(&children), vec!["x", "y"]);
        assert_eq!(children[0].origin, ChildOrigin::Spilled);
        assert_eq!(children[1].origin, ChildOrigin::Local);
    }

    #[test]
    fn test_keeps_snapshot_and_overridden_descriptor() {
        let frame = trampoline(&["y"]);
        let snapshot = snapshot(&["x"]);
        let preflight = preflight(&Stitcher::default(), &frame, &snapshot, &[])
            .unwrap()
            .unwrap();

        assert!(std::ptr::eq(preflight.snapshot(), &snapshot));
        assert!(preflight.descriptor().is_overridden());
        assert_eq!(preflight.descriptor().frame().id(), 7);
        assert_eq!(preflight.descriptor().location(), preflight.presented_location());
    }

    #[test]
    fn test_spilled_type_is_republished() {
        let frame = trampoline(&[]);
        let snapshot = TaskSnapshot::new(vec![LogicalFrame::new(
            Location::new(MethodRef::new("demo.FooKt", "run"), None, Some(3)),
            vec![Variable::new("count", "4").with_type("int")],
        )]);
        let preflight = preflight(&Stitcher::default(), &frame, &snapshot, &[])
            .unwrap()
            .unwrap();

        let children = preflight.children().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].variable.type_name.as_deref(), Some("int"));
        assert_eq!(children[0].variable, snapshot.frames[0].spilled_variables[0]);
    }

    #[test]
    fn test_invalid_trampoline_is_absent() {
        let frame = trampoline(&[]).invalidated();
        let snapshot = snapshot(&["x"]);
        let result = preflight(&Stitcher::default(), &frame, &snapshot, &[]).unwrap();
        assert!(result.is_none());
    }

    struct FailingLocals;

    impl ChildDelegate for FailingLocals {
        fn compute_children(&self, _frame: &dyn FrameProxy) -> Result<Vec<Variable>> {
            Err(DebuggerError::Disconnected("vm detached".to_string()))
        }
    }

    #[test]
    fn test_delegate_failure_is_not_swallowed() {
        let frame = trampoline(&["y"]);
        let snapshot = snapshot(&["x"]);
        let preflight = preflight(&Stitcher::default(), &frame, &snapshot, &[])
            .unwrap()
            .unwrap();

        let mut node = CollectedChildren::default();
        let result = preflight.compute_children(&mut node, &FailingLocals);
        assert!(matches!(result, Err(DebuggerError::Disconnected(_))));
        assert!(node.batches.is_empty());
    }
}
