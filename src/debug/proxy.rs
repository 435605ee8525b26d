//! Stdio proxy between a DAP client and the buildx debug adapter.
//!
//! The client talks to us on stdin/stdout; we talk to `docker buildx dap build` on its
//! stdin/stdout. Messages in both directions are observed, and `setBreakpoints` requests
//! get their missing columns filled in before they reach the adapter. Logging goes to
//! stderr because stdout carries the protocol.

use anyhow::{Context, Result};
use serde_json::Value;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::process::Command;
use tokio::sync::Mutex;

use super::LaunchDescriptor;
use super::breakpoints::{BreakpointMapper, OpenDocuments};
use super::protocol::{DapMessage, read_message, write_message};
use crate::core::DalecError;

/// Apply the mapper to one client message. Returns the bytes to forward.
async fn rewrite_client_message<D: OpenDocuments>(body: Vec<u8>, mapper: &Mutex<BreakpointMapper>, documents: &D) -> Vec<u8> {
    let Ok(mut message) = serde_json::from_slice::<Value>(&body) else {
        return body;
    };
    let classified = DapMessage::classify(&message);
    let mut mapper = mapper.lock().await;
    mapper.observe(&classified);

    let DapMessage::SetBreakpoints(mut arguments) = classified else {
        return body;
    };
    if !mapper.remap(&mut arguments, documents).await {
        return body;
    }
    let Ok(arguments) = serde_json::to_value(&arguments) else {
        return body;
    };
    message["arguments"] = arguments;
    match serde_json::to_vec(&message) {
        Ok(rewritten) => {
            tracing::debug!(target: "dap", "Filled breakpoint columns: {}", message["arguments"]["breakpoints"]);
            rewritten
        }
        Err(_) => body,
    }
}

/// Forward client messages to the adapter until the client closes its stream.
///
/// # Errors
///
/// Returns framing or I/O errors on either side.
pub async fn pump_client<R, W, D>(
    mut client: R,
    mut adapter: W,
    mapper: &Mutex<BreakpointMapper>,
    documents: &D,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    D: OpenDocuments,
{
    while let Some(body) = read_message(&mut client).await? {
        let body = rewrite_client_message(body, mapper, documents).await;
        write_message(&mut adapter, &body).await.context("Failed to write to debug adapter")?;
    }
    tracing::debug!(target: "dap", "Client closed its stream");
    Ok(())
}

/// Forward adapter messages to the client, observing `loadedSource` events.
///
/// # Errors
///
/// Returns framing or I/O errors on either side.
pub async fn pump_adapter<R, W>(mut adapter: R, mut client: W, mapper: &Mutex<BreakpointMapper>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    while let Some(body) = read_message(&mut adapter).await? {
        if let Ok(message) = serde_json::from_slice::<Value>(&body) {
            let classified = DapMessage::classify(&message);
            if matches!(classified, DapMessage::LoadedSource(_)) {
                mapper.lock().await.observe(&classified);
            }
        }
        write_message(&mut client, &body).await.context("Failed to write to debug client")?;
    }
    tracing::debug!(target: "dap", "Debug adapter closed its stream");
    Ok(())
}

/// Run the adapter described by `descriptor`, proxying this process's stdin/stdout.
///
/// Returns when the adapter's output ends; the client closing stdin only closes the
/// adapter's stdin.
///
/// # Errors
///
/// [`DalecError::BuildxNotFound`] when the adapter binary is missing, otherwise spawn,
/// framing and I/O errors.
pub async fn run_adapter_proxy<D: OpenDocuments>(descriptor: &LaunchDescriptor, documents: &D) -> Result<ExitStatus> {
    tracing::info!(
        target: "dap",
        "Starting debug adapter: {} {} (in {})",
        descriptor.command,
        descriptor.args.join(" "),
        descriptor.cwd.display()
    );

    let mut child = Command::new(&descriptor.command)
        .args(&descriptor.args)
        .current_dir(&descriptor.cwd)
        .envs(&descriptor.env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| -> anyhow::Error {
            if e.kind() == std::io::ErrorKind::NotFound {
                DalecError::BuildxNotFound {
                    binary: descriptor.command.clone(),
                }
                .into()
            } else {
                anyhow::Error::new(e).context(format!("Failed to start {}", descriptor.command))
            }
        })?;

    let adapter_in = child.stdin.take().context("Debug adapter stdin unavailable")?;
    let adapter_out = child.stdout.take().context("Debug adapter stdout unavailable")?;

    let mapper = Mutex::new(BreakpointMapper::new());
    let client = pump_client(BufReader::new(tokio::io::stdin()), adapter_in, &mapper, documents);
    let adapter = pump_adapter(BufReader::new(adapter_out), tokio::io::stdout(), &mapper);
    tokio::pin!(client);
    tokio::pin!(adapter);

    tokio::select! {
        result = &mut adapter => result?,
        result = &mut client => {
            result?;
            adapter.await?;
        }
    }

    let status = child.wait().await.context("Failed to wait for debug adapter")?;
    tracing::info!(target: "dap", "Debug adapter exited with {status}");
    Ok(status)
}
