use super::protocol::{read_message, write_message, DapMessage, DapMessageContent};
use crate::capture::CaptureFile;
use crate::config::DebuggerConfig;
use crate::coroutine::ChildOrigin;
use crate::debugger::{DebugContext, StackEntry};
use crate::error::{DebuggerError, Result};
use serde_json::{json, Value};
use std::io::{BufRead, Write};
use std::path::Path;

pub struct DapServer<R, W> {
    seq: u64,
    reader: R,
    writer: W,
    config: DebuggerConfig,
    context: Option<DebugContext>,
}

impl<R: BufRead, W: Write> DapServer<R, W> {
    pub fn new(reader: R, writer: W, config: DebuggerConfig) -> Self {
        Self {
            seq: 0,
            reader,
            writer,
            config,
            context: None,
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Serves requests until `disconnect` or end of input.
    pub fn run(&mut self) -> Result<()> {
        while let Some(msg) = read_message(&mut self.reader)? {
            tracing::debug!(seq = msg.seq, "received {:?}", msg.content);

            let DapMessageContent::Request { command, arguments } = msg.content else {
                tracing::debug!("ignoring non-request message");
                continue;
            };

            if command == "disconnect" {
                self.send_response(msg.seq, command, true, None, None)?;
                break;
            }
            self.dispatch(msg.seq, command, arguments)?;
        }
        tracing::info!("DAP session finished");
        Ok(())
    }

    fn dispatch(&mut self, seq: u64, command: String, arguments: Option<Value>) -> Result<()> {
        let outcome = match command.as_str() {
            "initialize" => return self.handle_initialize(seq, command),
            "launch" | "attach" => return self.handle_launch(seq, command, arguments),
            "configurationDone" => Ok(None),
            "threads" => self.handle_threads(),
            "stackTrace" => self.handle_stack_trace(arguments.as_ref()),
            "scopes" => self.handle_scopes(arguments.as_ref()),
            "variables" => self.handle_variables(arguments.as_ref()),
            _ => {
                tracing::warn!("unhandled DAP command: {}", command);
                Err(DebuggerError::Protocol(format!("unsupported command {}", command)))
            }
        };

        match outcome {
            Ok(body) => self.send_response(seq, command, true, body, None),
            Err(e) => {
                tracing::warn!("{} failed: {}", command, e);
                self.send_response(seq, command, false, None, Some(e.to_string()))
            }
        }
    }

    pub fn send_response(
        &mut self,
        request_seq: u64,
        command: String,
        success: bool,
        body: Option<Value>,
        message: Option<String>,
    ) -> Result<()> {
        let msg = DapMessage {
            seq: self.next_seq(),
            content: DapMessageContent::Response {
                request_seq,
                success,
                command,
                message,
                body,
            },
        };
        write_message(&mut self.writer, &msg)
    }

    pub fn send_event(&mut self, event: String, body: Option<Value>) -> Result<()> {
        let msg = DapMessage {
            seq: self.next_seq(),
            content: DapMessageContent::Event { event, body },
        };
        write_message(&mut self.writer, &msg)
    }

    fn handle_initialize(&mut self, seq: u64, command: String) -> Result<()> {
        let body = json!({
            "supportsConfigurationDoneRequest": true,
            "supportsStepBack": false,
            "supportsSetVariable": false,
            "supportsDelayedStackTraceLoading": true,
        });
        self.send_response(seq, command, true, Some(body), None)?;
        self.send_event("initialized".to_string(), None)
    }

    fn handle_launch(&mut self, seq: u64, command: String, args: Option<Value>) -> Result<()> {
        let path = args
            .as_ref()
            .and_then(|v| v.get("capture").or_else(|| v.get("program")))
            .and_then(Value::as_str)
            .map(str::to_string);

        let Some(path) = path else {
            let message = "launch needs a `capture` or `program` path".to_string();
            return self.send_response(seq, command, false, None, Some(message));
        };

        let mut config = self.config.clone();
        config.apply_launch_arguments(args.as_ref());

        match CaptureFile::load(Path::new(&path)) {
            Ok(capture) => {
                let thread_id = capture.threads.first().map(|t| t.id);
                self.context = Some(DebugContext::new(capture, config));
                self.send_response(seq, command, true, None, None)?;
                self.send_event(
                    "stopped".to_string(),
                    Some(json!({
                        "reason": "pause",
                        "threadId": thread_id,
                        "allThreadsStopped": true
                    })),
                )
            }
            Err(e) => {
                tracing::error!("failed to load capture {}: {}", path, e);
                self.send_response(seq, command, false, None, Some(e.to_string()))
            }
        }
    }

    fn context(&self) -> Result<&DebugContext> {
        self.context
            .as_ref()
            .ok_or_else(|| DebuggerError::Protocol("no capture loaded".to_string()))
    }

    fn handle_threads(&self) -> Result<Option<Value>> {
        let threads: Vec<Value> = self
            .context()?
            .threads()
            .iter()
            .map(|t| json!({ "id": t.id, "name": t.name }))
            .collect();
        Ok(Some(json!({ "threads": threads })))
    }

    fn handle_stack_trace(&self, args: Option<&Value>) -> Result<Option<Value>> {
        let ctx = self.context()?;
        let thread_id = args
            .and_then(|v| v.get("threadId"))
            .and_then(Value::as_u64)
            .ok_or_else(|| DebuggerError::Protocol("stackTrace needs threadId".to_string()))?;
        let start = args
            .and_then(|v| v.get("startFrame"))
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        let levels = args
            .and_then(|v| v.get("levels"))
            .and_then(Value::as_u64)
            .filter(|&l| l > 0)
            .map(|l| l as usize);

        let thread = ctx.threads().iter().find(|t| t.id == thread_id);
        let source_fallback = thread.map(|t| t.name.as_str()).unwrap_or("");
        let stack = ctx.stack(thread_id)?;
        let total = stack.len();

        let frames = stack
            .iter()
            .enumerate()
            .skip(start)
            .take(levels.unwrap_or(usize::MAX))
            .map(|(index, entry)| {
                let location = entry.location();
                let line = location.as_ref().and_then(|l| l.display_line()).unwrap_or(0);
                let column = u32::from(line > 0);
                let source = location
                    .as_ref()
                    .and_then(|l| l.source_name.clone())
                    .unwrap_or_else(|| source_fallback.to_string());
                let id = DebugContext::frame_reference(thread_id, index)?;
                let mut frame = json!({
                    "id": id,
                    "name": entry.name(),
                    "line": line,
                    "column": column,
                    "source": { "name": source },
                    "presentationHint": entry.presentation_hint(),
                });
                if let StackEntry::Restored { depth, .. } = entry {
                    frame["moduleId"] = json!(format!("coroutine+{}", depth));
                }
                Ok(frame)
            })
            .collect::<Result<Vec<Value>>>()?;

        tracing::debug!(thread_id, total, "stack trace with {} frames", frames.len());
        Ok(Some(json!({
            "stackFrames": frames,
            "totalFrames": total
        })))
    }

    fn handle_scopes(&self, args: Option<&Value>) -> Result<Option<Value>> {
        let frame_id = args
            .and_then(|v| v.get("frameId"))
            .and_then(Value::as_u64)
            .ok_or_else(|| DebuggerError::Protocol("scopes needs frameId".to_string()))?;
        let (thread_id, index) = DebugContext::resolve_reference(frame_id)?;
        let stack = self.context()?.stack(thread_id)?;
        if index >= stack.len() {
            return Err(DebuggerError::UnknownFrame(frame_id));
        }

        Ok(Some(json!({
            "scopes": [
                {
                    "name": "Variables",
                    "variablesReference": frame_id,
                    "expensive": false
                }
            ]
        })))
    }

    fn handle_variables(&self, args: Option<&Value>) -> Result<Option<Value>> {
        let reference = args
            .and_then(|v| v.get("variablesReference"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let (thread_id, index) = DebugContext::resolve_reference(reference)?;
        let children = self.context()?.frame_children(thread_id, index)?;

        let variables: Vec<Value> = children
            .iter()
            .map(|child| {
                let mut variable = json!({
                    "name": child.variable.name,
                    "value": child.variable.value,
                    "variablesReference": 0
                });
                if let Some(type_name) = &child.variable.type_name {
                    variable["type"] = json!(type_name);
                }
                if child.origin == ChildOrigin::Spilled {
                    variable["presentationHint"] = json!({ "attributes": ["readOnly"] });
                }
                variable
            })
            .collect();

        Ok(Some(json!({ "variables": variables })))
    }
}
