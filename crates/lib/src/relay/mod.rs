//! Outbound relay: console lines forwarded to the Botpress webhook.
//!
//! A reader thread pulls lines from a `LineSource` and queues them; the relay loop takes each
//! line, reads the current conversation id, sends, and hands the outcome to the caller to print.

mod source;
mod worker;

pub use source::{spawn_line_reader, LineSource, StdinLineSource, VecLineSource};
pub use worker::{Relay, RelayOutcome, RelayStop, QUIT_COMMAND};
