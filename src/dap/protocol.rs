use crate::error::{DebuggerError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{BufRead, Write};

/// Largest message body accepted from a client.
pub const MAX_CONTENT_LENGTH: usize = 16 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize)]
pub struct DapMessage {
    pub seq: u64,
    #[serde(flatten)]
    pub content: DapMessageContent,
}

/// Message body, selected by the `type` field.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DapMessageContent {
    Request {
        command: String,
        #[serde(default)]
        arguments: Option<Value>,
    },
    Response {
        request_seq: u64,
        success: bool,
        command: String,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        body: Option<Value>,
    },
    Event {
        event: String,
        #[serde(default)]
        body: Option<Value>,
    },
}

/// Reads one `Content-Length` framed message. `Ok(None)` at end of input.
pub fn read_message<R: BufRead>(reader: &mut R) -> Result<Option<DapMessage>> {
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }
        if let Some(value) = line.strip_prefix("Content-Length:") {
            let length = value
                .trim()
                .parse()
                .map_err(|_| DebuggerError::Protocol(format!("bad header: {}", line)))?;
            content_length = Some(length);
        }
    }

    let length = content_length
        .ok_or_else(|| DebuggerError::Protocol("missing Content-Length".to_string()))?;
    if length > MAX_CONTENT_LENGTH {
        return Err(DebuggerError::Protocol(format!(
            "Content-Length {} exceeds {}",
            length, MAX_CONTENT_LENGTH
        )));
    }
    let mut buffer = vec![0u8; length];
    reader.read_exact(&mut buffer)?;
    Ok(Some(serde_json::from_slice(&buffer)?))
}

pub fn write_message<W: Write>(writer: &mut W, msg: &DapMessage) -> Result<()> {
    let json = serde_json::to_string(msg)?;
    write!(writer, "Content-Length: {}\r\n\r\n{}", json.len(), json)?;
    writer.flush()?;
    Ok(())
}
