//! Output pumps for subprocess stdout/stderr

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use crate::control::{BusEvent, EventBus};
use crate::types::identifiers::SessionId;

use super::config::{MAX_CAPTURED_STDERR, STDERR_CHUNK_SIZE};

/// Publish stdout as `Line` records, one per newline-terminated line
///
/// The newline is kept so the session's line buffer sees the same framing
/// the program produced. Invalid UTF-8 is replaced, never fatal.
pub(super) async fn pump_stdout<R>(stdout: R, bus: &EventBus, session_id: &SessionId)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stdout);
    let mut line = Vec::new();

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break, // EOF
            Ok(_) => {
                let text = String::from_utf8_lossy(&line).into_owned();
                bus.publish(BusEvent::line(session_id.clone(), text));
            }
            Err(e) => {
                log::warn!("[{session_id}] stdout read failed: {e}");
                break;
            }
        }
    }
}

/// Publish stderr chunks as `Stderr` records and return what was captured
pub(super) async fn pump_stderr<R>(stderr: R, bus: &EventBus, session_id: &SessionId) -> String
where
    R: AsyncRead + Unpin,
{
    let mut stderr = stderr;
    let mut buffer = vec![0u8; STDERR_CHUNK_SIZE];
    let mut captured = String::new();

    loop {
        match stderr.read(&mut buffer).await {
            Ok(0) | Err(_) => break, // EOF
            Ok(n) => {
                let chunk = String::from_utf8_lossy(&buffer[..n]).into_owned();
                if captured.len() + chunk.len() <= MAX_CAPTURED_STDERR {
                    captured.push_str(&chunk);
                }
                bus.publish(BusEvent::stderr(session_id.clone(), chunk));
            }
        }
    }

    captured
}

/// Drain a long-lived process's output into the debug log
pub(super) async fn drain_to_log<R>(output: R, label: String)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(output).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => log::debug!("[{label}] {line}"),
            Ok(None) => break,
            Err(e) => {
                log::debug!("[{label}] output closed: {e}");
                break;
            }
        }
    }
}
