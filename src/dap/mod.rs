mod protocol;
mod server;

use crate::config::DebuggerConfig;
use crate::error::Result;
use std::io;

pub use protocol::{read_message, write_message, DapMessage, DapMessageContent};
pub use server::DapServer;

pub fn run_dap_mode(config: DebuggerConfig) -> Result<()> {
    tracing::info!("DAP server starting");

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut server = DapServer::new(stdin.lock(), stdout.lock(), config);
    server.run()
}
