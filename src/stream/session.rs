//! Streaming session driver shared by every adapter
//!
//! One call to [`run_session`] is one send: it generates a session id,
//! subscribes to the bus, asks the control plane to run the agent, and feeds
//! matching bus records through the line buffer, the safe JSON parser and
//! the adapter's event mapping until the exchange ends.
//!
//! ```text
//! Idle ──► Spawned ──► Streaming ──┬──► Completed
//!                        ▲    │    └──► Failed
//!                        └────┘
//! ```
//!
//! Records that arrive after `Completed` or `Failed` are dropped. Once the
//! protocol's terminal marker is seen the session completes without waiting
//! for the program to exit; the exit status is only collected if it arrives
//! within [`EXIT_GRACE`], and it never turns a completed session into a
//! failed one.

use std::time::Duration;

use tokio::time::Instant;

use crate::adapters::AgentAdapter;
use crate::control::{AgentContext, BusEvent, BusEventKind, ExecuteOutcome};
use crate::error::{BridgeError, Result};
use crate::types::agent::ChatMessage;
use crate::types::events::StreamEvent;
use crate::types::identifiers::SessionId;
use crate::types::options::{SendOptions, StopHandle};

use super::json_line::parse_json_line;
use super::line_buffer::LineBuffer;

/// Upper bound on stderr text kept for error reporting (64KB)
const MAX_CAPTURED_STDERR: usize = 64 * 1024;

/// How long a completed session waits for the program's exit status
pub const EXIT_GRACE: Duration = Duration::from_secs(2);

/// Lifecycle of one streaming session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing started yet
    Idle,
    /// Execute requested, no output yet
    Spawned,
    /// Output is arriving
    Streaming,
    /// The protocol's terminal marker was seen, or the program exited cleanly
    Completed,
    /// The control plane or the agent reported a failure
    Failed,
}

impl SessionState {
    /// Whether the session no longer accepts records
    #[must_use]
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Everything a session saw, handed to the adapter's `finalize`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    /// Concatenated content of every forwarded `Text` event
    pub text: String,
    /// Every complete raw line, including malformed ones
    ///
    /// Only collected for adapters whose [`AgentAdapter::retains_lines`]
    /// returns `true`.
    pub lines: Vec<String>,
}

/// Result of one send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    /// Session id the exchange ran under
    pub session_id: SessionId,
    /// Final assistant text
    pub text: String,
    /// Whether the caller stopped the exchange; `text` is partial if so
    pub stopped: bool,
    /// Program exit code, when known
    pub exit_code: Option<i32>,
}

/// Drive one send end-to-end
///
/// `on_stream` receives every normalized event in the order the agent
/// produced it. A successful session always ends with exactly one
/// [`StreamEvent::Done`].
///
/// # Errors
/// - `BridgeError::Process` if the program exits with a failure status
///   before the terminal marker, or the host reports a transport error
///   (carries captured stderr)
/// - `BridgeError::Agent` if the agent emits an explicit error payload
/// - `BridgeError::Timeout` if `options.timeout` elapses
/// - any error returned by the control plane's `execute`
pub async fn run_session<A: AgentAdapter + ?Sized>(
    ctx: &AgentContext,
    adapter: &A,
    history: &[ChatMessage],
    options: SendOptions,
    on_stream: &mut (dyn FnMut(StreamEvent) + Send),
) -> Result<SendOutcome> {
    let session_id = SessionId::generate();
    let stop = options.stop.clone().unwrap_or_default();
    let request = adapter.build_request(&session_id, history, &options);
    let mut session = StreamSession::new(adapter, session_id.clone());

    if stop.is_stopped() {
        session.stopped = true;
        return Ok(session.stopped_outcome());
    }

    // Subscribe before executing so early output is not missed
    let mut subscription = ctx.bus().subscribe_session(&session_id);
    log::debug!(
        "[{session_id}] starting {} session",
        adapter.source_label()
    );

    session.state = SessionState::Spawned;
    let mut execute = ctx.control().execute(request);
    let deadline = options.timeout.map(|timeout| Instant::now() + timeout);

    let exit = loop {
        tokio::select! {
            biased;
            () = stop.stopped() => {
                session.stopped = true;
                break LoopExit::Early;
            }
            event = subscription.recv() => {
                let Some(event) = event else {
                    return Err(BridgeError::event_bus(format!(
                        "event bus closed during session {session_id}"
                    )));
                };
                session.handle_bus_event(event, &stop, on_stream);
                if session.stopped || session.state == SessionState::Failed {
                    break LoopExit::Early;
                }
                if session.state == SessionState::Completed {
                    break LoopExit::Completed;
                }
            }
            result = &mut execute => break LoopExit::Executed(result),
            () = sleep_until_deadline(deadline) => {
                log::warn!("[{session_id}] session timed out");
                return Err(BridgeError::timeout(format!(
                    "{} session {session_id} exceeded {}",
                    adapter.source_label(),
                    format_duration(options.timeout.unwrap_or_default())
                )));
            }
        }
    };

    match exit {
        LoopExit::Executed(result) => {
            // Records published before the program exited are still queued
            while let Some(event) = subscription.try_recv() {
                session.handle_bus_event(event, &stop, on_stream);
                if session.stopped {
                    break;
                }
            }
            drop(subscription);
            session.finish(Some(result), &stop, on_stream)
        }
        LoopExit::Completed => {
            drop(subscription);
            let result = match tokio::time::timeout(EXIT_GRACE, &mut execute).await {
                Ok(result) => Some(result),
                Err(_) => {
                    log::debug!(
                        "[{session_id}] agent still running {} after its terminal marker, detaching",
                        format_duration(EXIT_GRACE)
                    );
                    None
                }
            };
            session.finish(result, &stop, on_stream)
        }
        LoopExit::Early => {
            drop(subscription);
            session.conclude_early()
        }
    }
}

/// Why the select loop ended
enum LoopExit {
    /// `execute` resolved
    Executed(Result<ExecuteOutcome>),
    /// The terminal marker was seen while the program was still running
    Completed,
    /// Stopped by the caller or failed
    Early,
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn format_duration(duration: Duration) -> String {
    format!("{}ms", duration.as_millis())
}

struct StreamSession<'a, A: ?Sized> {
    adapter: &'a A,
    session_id: SessionId,
    state: SessionState,
    buffer: LineBuffer,
    transcript: Transcript,
    stderr: String,
    failure: Option<BridgeError>,
    done_emitted: bool,
    stopped: bool,
}

impl<'a, A: AgentAdapter + ?Sized> StreamSession<'a, A> {
    fn new(adapter: &'a A, session_id: SessionId) -> Self {
        Self {
            adapter,
            session_id,
            state: SessionState::Idle,
            buffer: LineBuffer::new(),
            transcript: Transcript::default(),
            stderr: String::new(),
            failure: None,
            done_emitted: false,
            stopped: false,
        }
    }

    fn handle_bus_event(
        &mut self,
        event: BusEvent,
        stop: &StopHandle,
        on_stream: &mut (dyn FnMut(StreamEvent) + Send),
    ) {
        if self.state.is_closed() {
            log::trace!(
                "[{}] dropping late {:?} record",
                self.session_id,
                event.kind
            );
            return;
        }

        match event.kind {
            BusEventKind::Line => {
                self.state = SessionState::Streaming;
                for line in self.buffer.push_chunk(&event.data) {
                    self.handle_line(line, stop, on_stream);
                }
            }
            BusEventKind::Stderr => self.capture_stderr(&event.data),
            BusEventKind::Error => {
                log::error!("[{}] transport error: {}", self.session_id, event.data);
                let stderr = self.captured_stderr();
                self.fail(BridgeError::process(event.data, None, stderr));
            }
            BusEventKind::Done => self.flush(stop, on_stream),
        }
    }

    fn handle_line(
        &mut self,
        line: String,
        stop: &StopHandle,
        on_stream: &mut (dyn FnMut(StreamEvent) + Send),
    ) {
        if self.state.is_closed() || self.stopped {
            return;
        }

        let parsed = parse_json_line(&line, self.adapter.source_label());
        if self.adapter.retains_lines() {
            self.transcript.lines.push(line);
        }

        if let Some(diagnostic) = parsed.error_event {
            self.emit(diagnostic, stop, on_stream);
            return;
        }
        let Some(value) = parsed.value else {
            return;
        };
        let Some(event) = self.adapter.map_event(&value) else {
            return;
        };

        let agent_failure = match &event {
            StreamEvent::Error { message } => Some(message.clone()),
            _ => None,
        };
        let completes = event.is_terminal();

        if !self.emit(event, stop, on_stream) {
            return;
        }
        if let Some(message) = agent_failure {
            self.fail(BridgeError::agent(message));
        } else if completes {
            self.state = SessionState::Completed;
        }
    }

    /// Forward an event unless a stop was requested
    fn emit(
        &mut self,
        event: StreamEvent,
        stop: &StopHandle,
        on_stream: &mut (dyn FnMut(StreamEvent) + Send),
    ) -> bool {
        if stop.is_stopped() {
            self.stopped = true;
            return false;
        }

        match &event {
            StreamEvent::Text { content } => self.transcript.text.push_str(content),
            StreamEvent::Done => self.done_emitted = true,
            _ => {}
        }
        on_stream(event);
        true
    }

    fn flush(&mut self, stop: &StopHandle, on_stream: &mut (dyn FnMut(StreamEvent) + Send)) {
        if let Some(line) = self.buffer.flush() {
            self.handle_line(line, stop, on_stream);
        }
    }

    fn capture_stderr(&mut self, chunk: &str) {
        log::debug!("[{}] stderr: {}", self.session_id, chunk.trim_end());
        if self.stderr.len() + chunk.len() <= MAX_CAPTURED_STDERR {
            self.stderr.push_str(chunk);
        }
    }

    fn captured_stderr(&self) -> Option<String> {
        let trimmed = self.stderr.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    fn fail(&mut self, error: BridgeError) {
        if self.state.is_closed() {
            return;
        }
        self.state = SessionState::Failed;
        self.failure = Some(error);
    }

    fn stopped_outcome(&self) -> SendOutcome {
        log::info!("[{}] stopped by caller", self.session_id);
        SendOutcome {
            session_id: self.session_id.clone(),
            text: self.transcript.text.clone(),
            stopped: true,
            exit_code: None,
        }
    }

    fn conclude_early(mut self) -> Result<SendOutcome> {
        if self.stopped {
            return Ok(self.stopped_outcome());
        }
        match self.failure.take() {
            Some(error) => Err(error),
            None => Ok(self.stopped_outcome()),
        }
    }

    fn finish(
        mut self,
        result: Option<Result<ExecuteOutcome>>,
        stop: &StopHandle,
        on_stream: &mut (dyn FnMut(StreamEvent) + Send),
    ) -> Result<SendOutcome> {
        if !self.state.is_closed() && !self.stopped {
            self.flush(stop, on_stream);
        }
        if self.stopped {
            return Ok(self.stopped_outcome());
        }
        if let Some(error) = self.failure.take() {
            return Err(error);
        }

        let completed = self.state == SessionState::Completed;
        let exit_code = match result {
            Some(Ok(outcome)) if !outcome.success && !completed => {
                self.state = SessionState::Failed;
                let stderr = outcome
                    .stderr
                    .filter(|text| !text.trim().is_empty())
                    .or_else(|| self.captured_stderr());
                return Err(BridgeError::process(
                    format!("{} exited with a failure status", self.adapter.source_label()),
                    outcome.exit_code,
                    stderr,
                ));
            }
            Some(Ok(outcome)) => {
                if !outcome.success {
                    log::warn!(
                        "[{}] exited with {:?} after completing",
                        self.session_id,
                        outcome.exit_code
                    );
                }
                outcome.exit_code
            }
            Some(Err(e)) if completed => {
                log::warn!("[{}] execute failed after completing: {e}", self.session_id);
                None
            }
            Some(Err(e)) => {
                log::error!("[{}] execute failed: {e}", self.session_id);
                return Err(e);
            }
            None => None,
        };

        if !self.done_emitted && !self.emit(StreamEvent::Done, stop, on_stream) {
            return Ok(self.stopped_outcome());
        }
        self.state = SessionState::Completed;
        log::debug!("[{}] session completed", self.session_id);

        Ok(SendOutcome {
            text: self.adapter.finalize(&self.transcript),
            session_id: self.session_id,
            stopped: false,
            exit_code,
        })
    }
}
