use super::FrameProxy;
use crate::config::DebuggerConfig;
use crate::coroutine::{
    is_negative_line_invoke_suspend, preflight, ChildDelegate, FrameChild, Location,
    LogicalFrame, PreflightFrame, Stitcher, TaskSnapshot, UnknownLinePolicy,
};
use crate::error::Result;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationHint {
    Normal,
    Subtle,
}

/// One row of a displayed thread stack.
#[derive(Debug)]
pub enum StackEntry<'a, F> {
    Real(&'a F),
    Preflight(PreflightFrame<'a, F>),
    /// A logical coroutine frame with no counterpart on the thread stack.
    Restored { depth: usize, frame: &'a LogicalFrame },
}

impl<'a, F: FrameProxy> StackEntry<'a, F> {
    pub fn location(&self) -> Option<Location> {
        match self {
            StackEntry::Real(frame) => frame.safe_location(),
            StackEntry::Preflight(top) => top.presented_location().cloned(),
            StackEntry::Restored { frame, .. } => frame.location.clone(),
        }
    }

    pub fn name(&self) -> String {
        match self.location() {
            Some(location) => format!(
                "{}.{}",
                location.method.declaring_type, location.method.name
            ),
            None => "<unknown>".to_string(),
        }
    }

    pub fn presentation_hint(&self) -> PresentationHint {
        match self {
            StackEntry::Preflight(_) | StackEntry::Restored { .. } => PresentationHint::Normal,
            StackEntry::Real(frame) => match frame.safe_location() {
                Some(location) if location.display_line().is_some() => PresentationHint::Normal,
                _ => PresentationHint::Subtle,
            },
        }
    }

    pub fn children(&self, delegate: &dyn ChildDelegate) -> Result<Vec<FrameChild>> {
        match self {
            StackEntry::Real(frame) => Ok(delegate
                .compute_children(*frame)?
                .into_iter()
                .map(FrameChild::local)
                .collect()),
            StackEntry::Preflight(top) => top.children_with(delegate),
            StackEntry::Restored { frame, .. } => Ok(frame
                .spilled_variables
                .iter()
                .cloned()
                .map(FrameChild::spilled)
                .collect()),
        }
    }
}

/// Builds the displayed stack of one thread from its frames and coroutine snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct StackAssembler {
    stitcher: Stitcher,
    unknown_line_policy: UnknownLinePolicy,
    hide_resumption_frames: bool,
}

impl StackAssembler {
    pub fn new(config: &DebuggerConfig) -> Self {
        Self {
            stitcher: Stitcher::new(config.trace_enabled),
            unknown_line_policy: config.unknown_line_policy,
            hide_resumption_frames: config.hide_resumption_frames,
        }
    }

    pub fn assemble<'a, F: FrameProxy>(
        &self,
        frames: &'a [F],
        snapshot: Option<&'a TaskSnapshot>,
    ) -> Result<Vec<StackEntry<'a, F>>> {
        let Some(snapshot) = snapshot else {
            return Ok(frames.iter().map(StackEntry::Real).collect());
        };

        let trampoline = frames.iter().position(|frame| {
            frame
                .safe_location()
                .map_or(false, |location| location.method.is_invoke_suspend())
        });
        let Some(index) = trampoline else {
            tracing::debug!("no invokeSuspend frame on thread, showing real frames");
            return Ok(frames.iter().map(StackEntry::Real).collect());
        };

        let mut entries: Vec<StackEntry<'a, F>> =
            frames[..index].iter().map(StackEntry::Real).collect();
        let remaining = &frames[index + 1..];

        match preflight(&self.stitcher, &frames[index], snapshot, remaining)? {
            Some(top) => {
                entries.push(StackEntry::Preflight(top));
                entries.extend(
                    snapshot
                        .restored_below_top()
                        .iter()
                        .enumerate()
                        .map(|(i, frame)| StackEntry::Restored {
                            depth: i + 1,
                            frame,
                        }),
                );
            }
            None => entries.push(StackEntry::Real(&frames[index])),
        }

        entries.extend(
            remaining
                .iter()
                .filter(|frame| {
                    !(self.hide_resumption_frames
                        && is_negative_line_invoke_suspend(*frame, self.unknown_line_policy))
                })
                .map(StackEntry::Real),
        );
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coroutine::{MethodRef, Variable, VisibleLocals, INVOKE_SUSPEND};
    use crate::debugger::RecordedFrame;

    fn frame(id: u64, method: &str, line: i32) -> RecordedFrame {
        let (declaring_type, name) = method.rsplit_once('.').unwrap();
        RecordedFrame::new(
            id,
            Some(Location::new(
                MethodRef::new(declaring_type, name),
                None,
                Some(line),
            )),
            vec![Variable::new(format!("local{}", id), "0")],
        )
    }

    fn thread() -> Vec<RecordedFrame> {
        vec![
            frame(1, "demo.Worker.poll", 5),
            frame(2, &format!("demo.FooKt$a$1.{}", INVOKE_SUSPEND), -1),
            frame(3, "kotlin.BaseContinuationImpl.resumeWith", 33),
            frame(4, &format!("demo.FooKt$b$1.{}", INVOKE_SUSPEND), -1),
            frame(5, "demo.Dispatcher.run", 80),
        ]
    }

    fn snapshot() -> TaskSnapshot {
        let restored = |method: &str, line| {
            LogicalFrame::new(
                Location::new(MethodRef::new("demo.FooKt", method), None, Some(line)),
                vec![Variable::new(format!("{}Spilled", method), "1")],
            )
        };
        TaskSnapshot::new(vec![restored("a", 10), restored("b", 20)])
    }

    #[test]
    fn test_no_snapshot_keeps_thread_stack() {
        let frames = thread();
        let stack = StackAssembler::default().assemble(&frames, None).unwrap();
        assert_eq!(stack.len(), frames.len());
        assert!(stack.iter().all(|e| matches!(e, StackEntry::Real(_))));
    }

    #[test]
    fn test_merged_stack_layout() {
        let frames = thread();
        let snapshot = snapshot();
        let assembler = StackAssembler::new(&DebuggerConfig::default());
        let stack = assembler.assemble(&frames, Some(&snapshot)).unwrap();

        let names: Vec<String> = stack.iter().map(StackEntry::name).collect();
        assert_eq!(
            names,
            vec![
                "demo.Worker.poll",
                "demo.FooKt.a",
                "demo.FooKt.b",
                "kotlin.BaseContinuationImpl.resumeWith",
                "demo.Dispatcher.run",
            ]
        );
        assert!(matches!(stack[1], StackEntry::Preflight(_)));
        assert!(matches!(stack[2], StackEntry::Restored { depth: 1, .. }));
    }

    #[test]
    fn test_resumption_frames_kept_when_not_hidden() {
        let frames = thread();
        let snapshot = snapshot();
        let config = DebuggerConfig {
            hide_resumption_frames: false,
            ..DebuggerConfig::default()
        };
        let stack = StackAssembler::new(&config)
            .assemble(&frames, Some(&snapshot))
            .unwrap();
        assert_eq!(stack.len(), 6);
    }

    /// A frame the target reports as dropped while its location is still cached.
    struct StaleFrame(RecordedFrame, bool);

    impl FrameProxy for StaleFrame {
        fn id(&self) -> u64 {
            self.0.id
        }

        fn thread_id(&self) -> u64 {
            self.0.thread_id
        }

        fn is_valid(&self) -> bool {
            self.1
        }

        fn location(&self) -> Result<Option<Location>> {
            self.0.location()
        }

        fn visible_variables(&self) -> Result<Vec<Variable>> {
            self.0.visible_variables()
        }
    }

    #[test]
    fn test_unusable_trampoline_degrades_to_real_frame() {
        let frames: Vec<StaleFrame> = thread()
            .into_iter()
            .map(|f| {
                let usable = f.id != 2;
                StaleFrame(f, usable)
            })
            .collect();
        let snapshot = snapshot();
        let stack = StackAssembler::new(&DebuggerConfig::default())
            .assemble(&frames, Some(&snapshot))
            .unwrap();

        assert!(matches!(stack[1], StackEntry::Real(f) if f.id() == 2));
        assert!(!stack.iter().any(|e| matches!(e, StackEntry::Restored { .. })));
        assert_eq!(stack.len(), 4);
    }

    #[test]
    fn test_restored_entry_children_are_spilled_variables() {
        let frames = thread();
        let snapshot = snapshot();
        let stack = StackAssembler::new(&DebuggerConfig::default())
            .assemble(&frames, Some(&snapshot))
            .unwrap();

        let children = stack[2].children(&VisibleLocals).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name(), "bSpilled");

        let top = stack[1].children(&VisibleLocals).unwrap();
        let top_names: Vec<&str> = top.iter().map(FrameChild::name).collect();
        assert_eq!(top_names, vec!["aSpilled", "local2"]);
    }
}
