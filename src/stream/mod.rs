//! Streaming protocol plumbing
//!
//! - [`line_buffer`] - chunk-to-line accumulation
//! - [`json_line`] - JSON decoding that never fails the stream
//! - [`retry`] - exponential backoff for transient failures
//! - [`session`] - the per-send state machine every adapter runs on

pub mod json_line;
pub mod line_buffer;
pub mod retry;
pub mod session;

pub use json_line::{ParsedLine, parse_json_line};
pub use line_buffer::LineBuffer;
pub use retry::{RetryOptions, retry_delay, retry_with_exponential_backoff};
pub use session::{EXIT_GRACE, SendOutcome, SessionState, Transcript, run_session};
