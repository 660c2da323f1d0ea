use crate::coroutine::UnknownLinePolicy;
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Environment switch that turns on coroutine stack dumps.
pub const TRACE_ENV: &str = "COROUTINE_DEBUGGER_TRACE";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Speak the Debug Adapter Protocol on stdin/stdout.
    #[arg(long, alias = "debug-adapter")]
    pub dap: bool,

    /// Capture file to inspect (required outside DAP mode).
    #[arg(long)]
    pub capture: Option<PathBuf>,

    /// Log real and restored frame locations while stitching coroutine stacks.
    #[arg(long)]
    pub trace_coroutines: bool,

    /// How a missing line number is read when hiding resumption frames.
    #[arg(long, value_enum, default_value_t = UnknownLinePolicy::AsZero)]
    pub unknown_line: UnknownLinePolicy,

    /// Show `invokeSuspend` frames with negative line numbers.
    #[arg(long)]
    pub show_resumption_frames: bool,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

fn default_hide_resumption_frames() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebuggerConfig {
    #[serde(default)]
    pub trace_enabled: bool,
    #[serde(default)]
    pub unknown_line_policy: UnknownLinePolicy,
    #[serde(default = "default_hide_resumption_frames")]
    pub hide_resumption_frames: bool,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            trace_enabled: false,
            unknown_line_policy: UnknownLinePolicy::AsZero,
            hide_resumption_frames: true,
        }
    }
}

impl DebuggerConfig {
    pub fn from_args(args: &Args) -> Self {
        let mut config = Self {
            trace_enabled: args.trace_coroutines,
            unknown_line_policy: args.unknown_line,
            hide_resumption_frames: !args.show_resumption_frames,
        };
        if let Ok(value) = std::env::var(TRACE_ENV) {
            config.trace_enabled |= env_flag(&value);
        }
        config
    }

    /// Applies the overrides a client passed in its `launch`/`attach` arguments.
    pub fn apply_launch_arguments(&mut self, args: Option<&Value>) {
        let Some(args) = args else {
            return;
        };
        if let Some(trace) = args.get("traceCoroutines").and_then(Value::as_bool) {
            self.trace_enabled = trace;
        }
        if let Some(hide) = args.get("hideResumptionFrames").and_then(Value::as_bool) {
            self.hide_resumption_frames = hide;
        }
        if let Some(policy) = args.get("unknownLinePolicy") {
            match serde_json::from_value::<UnknownLinePolicy>(policy.clone()) {
                Ok(policy) => self.unknown_line_policy = policy,
                Err(e) => tracing::warn!("ignoring unknownLinePolicy {}: {}", policy, e),
            }
        }
    }
}

fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
