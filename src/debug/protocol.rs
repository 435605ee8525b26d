//! Debug Adapter Protocol framing and the handful of message shapes the proxy inspects.
//!
//! Messages are JSON bodies preceded by a `Content-Length` header block:
//!
//! ```text
//! Content-Length: 119\r\n
//! \r\n
//! {"seq":1,"type":"request","command":"setBreakpoints",...}
//! ```
//!
//! Everything the proxy does not understand is classified as [`DapMessage::Other`] and
//! forwarded byte-for-byte.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::constants::MAX_PROCESS_OUTPUT_BYTES;

const CONTENT_LENGTH: &str = "Content-Length:";

/// Read one framed message body. `Ok(None)` on a clean end of stream.
///
/// # Errors
///
/// Fails on I/O errors, a missing, malformed or oversized `Content-Length`, or a truncated
/// body. Bodies are capped at [`MAX_PROCESS_OUTPUT_BYTES`].
pub async fn read_message<R>(reader: &mut R) -> Result<Option<Vec<u8>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut saw_header = false;
    loop {
        let mut line = String::new();
        let read = reader.read_line(&mut line).await.context("Failed to read DAP header")?;
        if read == 0 {
            if saw_header {
                return Err(anyhow!("DAP stream closed inside a header block"));
            }
            return Ok(None);
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            if saw_header {
                break;
            }
            continue;
        }
        saw_header = true;
        if let Some(value) = line.strip_prefix(CONTENT_LENGTH) {
            content_length =
                Some(value.trim().parse().with_context(|| format!("Invalid Content-Length '{}'", value.trim()))?);
        }
    }

    let len = content_length.ok_or_else(|| anyhow!("Missing Content-Length header"))?;
    if len > MAX_PROCESS_OUTPUT_BYTES {
        return Err(anyhow!("DAP message of {len} bytes exceeds the {MAX_PROCESS_OUTPUT_BYTES} byte limit"));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await.context("DAP stream closed inside a message body")?;
    Ok(Some(body))
}

/// Write one framed message and flush.
///
/// # Errors
///
/// Returns I/O errors from the underlying writer.
pub async fn write_message<W>(writer: &mut W, body: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(format!("{CONTENT_LENGTH} {}\r\n\r\n", body.len()).as_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// A DAP `Source`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// Short display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Filesystem path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A breakpoint as requested by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceBreakpoint {
    /// Line, in the client's line base.
    pub line: i64,
    /// Column, in the client's column base.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Arguments of a `setBreakpoints` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetBreakpointsArguments {
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakpoints: Option<Vec<SourceBreakpoint>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The parts of `initialize` arguments that affect positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeArguments {
    #[serde(default = "default_true")]
    pub lines_start_at1: bool,
    #[serde(default = "default_true")]
    pub columns_start_at1: bool,
}

impl Default for InitializeArguments {
    fn default() -> Self {
        Self {
            lines_start_at1: true,
            columns_start_at1: true,
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Body of a `loadedSource` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoadedSourceBody {
    /// `new`, `changed` or `removed`.
    pub reason: String,
    pub source: Source,
}

/// Messages the proxy acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum DapMessage {
    /// `initialize` request.
    Initialize(InitializeArguments),
    /// `setBreakpoints` request.
    SetBreakpoints(SetBreakpointsArguments),
    /// `loadedSource` event.
    LoadedSource(LoadedSourceBody),
    /// Anything else, forwarded untouched.
    Other,
}

impl DapMessage {
    /// Classify a decoded message. Known shapes with unexpected contents fall back to
    /// [`DapMessage::Other`].
    pub fn classify(message: &Value) -> Self {
        let kind = message.get("type").and_then(Value::as_str);
        let name = match kind {
            Some("request") => message.get("command"),
            Some("event") => message.get("event"),
            _ => None,
        }
        .and_then(Value::as_str);

        let parsed = match (kind, name) {
            (Some("request"), Some("initialize")) => {
                let arguments = message.get("arguments").cloned().unwrap_or(Value::Null);
                if arguments.is_null() {
                    Some(Self::Initialize(InitializeArguments::default()))
                } else {
                    serde_json::from_value(arguments).ok().map(Self::Initialize)
                }
            }
            (Some("request"), Some("setBreakpoints")) => message
                .get("arguments")
                .cloned()
                .and_then(|arguments| serde_json::from_value(arguments).ok())
                .map(Self::SetBreakpoints),
            (Some("event"), Some("loadedSource")) => message
                .get("body")
                .cloned()
                .and_then(|body| serde_json::from_value(body).ok())
                .map(Self::LoadedSource),
            _ => None,
        };
        parsed.unwrap_or(Self::Other)
    }
}
