use clap::Parser;
use coroutine_debugger::capture::CaptureFile;
use coroutine_debugger::config::{Args, DebuggerConfig};
use coroutine_debugger::debugger::DebugContext;
use coroutine_debugger::error::{DebuggerError, Result};
use coroutine_debugger::{console, dap, logging};
use std::io;

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_tracing(&args.log_level)?;

    let config = DebuggerConfig::from_args(&args);
    tracing::info!(?config, "debugger started");

    if args.dap {
        dap::run_dap_mode(config)?;
    } else {
        run_interactive_mode(&args, config)?;
    }

    tracing::info!("debugger exiting");
    Ok(())
}

fn run_interactive_mode(args: &Args, config: DebuggerConfig) -> Result<()> {
    let path = args
        .capture
        .as_ref()
        .ok_or_else(|| DebuggerError::Capture("--capture is required outside DAP mode".into()))?;
    let capture = CaptureFile::load(path)?;
    let ctx = DebugContext::new(capture, config);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    console::run_console(&ctx, stdin.lock(), &mut stdout)
}
