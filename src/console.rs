//! Line-oriented inspection of a loaded capture.

use crate::debugger::{DebugContext, ThreadId};
use crate::error::Result;
use std::io::{BufRead, Write};

const HELP: &str = "\
commands:
  threads                 list captured threads
  bt [thread]             show the stitched call stack
  vars <frame> [thread]   show the children of a stack entry
  help                    show this text
  quit                    leave the console";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Threads,
    Backtrace(Option<ThreadId>),
    Variables(usize, Option<ThreadId>),
    Help,
    Quit,
}

fn parse_command(line: &str) -> std::result::Result<Option<Command>, String> {
    let words = shlex::split(line).ok_or_else(|| "unbalanced quotes".to_string())?;
    let Some((head, rest)) = words.split_first() else {
        return Ok(None);
    };

    let number = |word: Option<&String>, what: &str| -> std::result::Result<Option<u64>, String> {
        word.map(|w| w.parse::<u64>().map_err(|_| format!("bad {}: {}", what, w)))
            .transpose()
    };

    let command = match head.to_lowercase().as_str() {
        "threads" => Command::Threads,
        "bt" | "backtrace" | "where" => Command::Backtrace(number(rest.first(), "thread")?),
        "vars" | "frame" => {
            let frame = number(rest.first(), "frame")?
                .ok_or_else(|| "vars needs a frame index".to_string())?;
            Command::Variables(frame as usize, number(rest.get(1), "thread")?)
        }
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command: {}", other)),
    };
    Ok(Some(command))
}

pub fn run_console<R: BufRead, W: Write>(ctx: &DebugContext, input: R, out: &mut W) -> Result<()> {
    let Some(default_thread) = ctx.default_thread() else {
        writeln!(out, "capture has no threads")?;
        return Ok(());
    };

    ctx.write_call_stack(default_thread, out)?;

    for line in input.lines() {
        let line = line?;
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                writeln!(out, "{}", message)?;
                continue;
            }
        };

        let outcome = match command {
            Command::Threads => {
                for thread in ctx.threads() {
                    let marker = if thread.coroutine.is_some() {
                        " (coroutine)"
                    } else {
                        ""
                    };
                    writeln!(out, "  {}: {}{}", thread.id, thread.name, marker)?;
                }
                Ok(())
            }
            Command::Backtrace(thread) => {
                ctx.write_call_stack(thread.unwrap_or(default_thread), out)
            }
            Command::Variables(frame, thread) => {
                ctx.write_variables(thread.unwrap_or(default_thread), frame, out)
            }
            Command::Help => {
                writeln!(out, "{}", HELP)?;
                Ok(())
            }
            Command::Quit => break,
        };

        if let Err(e) = outcome {
            tracing::warn!("console command failed: {}", e);
            writeln!(out, "error: {}", e)?;
        }
    }
    Ok(())
}
