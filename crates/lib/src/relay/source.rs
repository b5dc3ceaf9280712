//! Line sources for the relay and the blocking worker that drains them.

use std::collections::VecDeque;
use std::io::{self, BufRead};
use tokio::sync::mpsc;

/// Capacity of the queue between the reader worker and the relay loop.
const LINE_QUEUE: usize = 16;

/// Blocking source of text lines (console, file, test fixture). `Ok(None)` means end of input.
pub trait LineSource: Send + 'static {
    fn next_line(&mut self) -> io::Result<Option<String>>;
}

/// Read one line, replacing invalid UTF-8 instead of failing. Trailing newline is stripped.
fn read_lossy_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf)? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(&buf);
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Reads lines from stdin.
#[derive(Debug, Default)]
pub struct StdinLineSource;

impl LineSource for StdinLineSource {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        read_lossy_line(&mut io::stdin().lock())
    }
}

/// Fixed list of lines; used by tests and scripted runs.
#[derive(Debug, Default)]
pub struct VecLineSource {
    lines: VecDeque<String>,
}

impl VecLineSource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl LineSource for VecLineSource {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}

/// Run `source` on a dedicated thread and forward each line over a queue.
/// The worker stops at end of input, on a read error, or once the receiver is dropped.
/// Plain thread, not `spawn_blocking`: a reader parked on stdin must not hold up runtime shutdown.
pub fn spawn_line_reader<S: LineSource>(mut source: S) -> io::Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(LINE_QUEUE);
    std::thread::Builder::new()
        .name("line-reader".to_string())
        .spawn(move || loop {
            match source.next_line() {
                Ok(Some(line)) => {
                    if tx.blocking_send(line).is_err() {
                        log::debug!("line reader: relay closed, stopping");
                        return;
                    }
                }
                Ok(None) => {
                    log::debug!("line reader: end of input");
                    return;
                }
                Err(e) => {
                    log::warn!("line reader: read failed: {}", e);
                    return;
                }
            }
        })?;
    Ok(rx)
}
