use super::{RecordedFrame, StackAssembler, StackEntry, ThreadId};
use crate::capture::{CaptureFile, CapturedThread};
use crate::config::DebuggerConfig;
use crate::coroutine::{ChildOrigin, FrameChild, VisibleLocals};
use crate::error::{DebuggerError, Result};
use std::io::Write;

/// Frame references handed to clients pack (thread, index) into one number.
const FRAMES_PER_THREAD: u64 = 1 << 20;

pub struct DebugContext {
    capture: CaptureFile,
    config: DebuggerConfig,
}

impl DebugContext {
    pub fn new(capture: CaptureFile, config: DebuggerConfig) -> Self {
        Self { capture, config }
    }

    pub fn config(&self) -> &DebuggerConfig {
        &self.config
    }

    pub fn threads(&self) -> &[CapturedThread] {
        &self.capture.threads
    }

    pub fn default_thread(&self) -> Option<ThreadId> {
        self.capture.threads.first().map(|t| t.id)
    }

    pub fn stack(&self, thread_id: ThreadId) -> Result<Vec<StackEntry<'_, RecordedFrame>>> {
        let thread = self.capture.thread(thread_id)?;
        StackAssembler::new(&self.config).assemble(&thread.frames, thread.coroutine.as_ref())
    }

    pub fn frame_children(&self, thread_id: ThreadId, index: usize) -> Result<Vec<FrameChild>> {
        let stack = self.stack(thread_id)?;
        let entry = stack.get(index).ok_or_else(|| {
            DebuggerError::Protocol(format!("thread {} has no frame #{}", thread_id, index))
        })?;
        entry.children(&VisibleLocals)
    }

    /// Fails when the pair does not fit the packed form.
    pub fn frame_reference(thread_id: ThreadId, index: usize) -> Result<u64> {
        let index = u64::try_from(index)
            .ok()
            .filter(|&i| i < FRAMES_PER_THREAD)
            .ok_or_else(|| {
                DebuggerError::Protocol(format!("frame #{} is too deep to reference", index))
            })?;
        thread_id
            .checked_mul(FRAMES_PER_THREAD)
            .and_then(|base| base.checked_add(index + 1))
            .ok_or_else(|| {
                DebuggerError::Protocol(format!("thread id {} is too large to reference", thread_id))
            })
    }

    pub fn resolve_reference(reference: u64) -> Result<(ThreadId, usize)> {
        let raw = reference
            .checked_sub(1)
            .ok_or(DebuggerError::UnknownFrame(reference))?;
        Ok((raw / FRAMES_PER_THREAD, (raw % FRAMES_PER_THREAD) as usize))
    }

    pub fn write_call_stack(&self, thread_id: ThreadId, out: &mut dyn Write) -> Result<()> {
        let thread = self.capture.thread(thread_id)?;
        let stack = self.stack(thread_id)?;

        if stack.is_empty() {
            writeln!(out, "=== Call Stack [{}]: <empty> ===", thread.name)?;
            return Ok(());
        }

        writeln!(
            out,
            "=== Call Stack [{}] ({} frames) ===",
            thread.name,
            stack.len()
        )?;
        for (i, entry) in stack.iter().enumerate() {
            let location = entry
                .location()
                .map(|l| l.to_string())
                .unwrap_or_else(|| "<unknown>".to_string());
            let marker = match entry {
                StackEntry::Preflight(_) => " [coroutine]",
                StackEntry::Restored { .. } => " [restored]",
                StackEntry::Real(_) => "",
            };
            writeln!(out, "  #{}: {}{}", i, location, marker)?;
        }
        Ok(())
    }

    pub fn write_variables(
        &self,
        thread_id: ThreadId,
        index: usize,
        out: &mut dyn Write,
    ) -> Result<()> {
        let children = self.frame_children(thread_id, index)?;
        if children.is_empty() {
            writeln!(out, "  <no variables>")?;
            return Ok(());
        }
        for child in children {
            let tag = match child.origin {
                ChildOrigin::Spilled => " (spilled)",
                ChildOrigin::Local => "",
            };
            writeln!(
                out,
                "  {}={}{}",
                child.variable.name, child.variable.value, tag
            )?;
        }
        Ok(())
    }
}
