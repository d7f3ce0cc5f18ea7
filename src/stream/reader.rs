//! Pulls a chat body to completion, one record at a time.

use std::fmt;

use futures::{Stream, StreamExt};
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use super::event::{StreamEvent, parse_line};
use super::lines::LineFramer;

/// How a chat stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// End of body reached.
    Completed,
    /// Stopped by the cancellation token, or the consumer went away.
    Cancelled,
    /// Transport error mid-stream.
    Failed(String),
    /// The response carried no readable body.
    ReaderUnavailable,
}

impl StreamOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, StreamOutcome::Failed(_) | StreamOutcome::ReaderUnavailable)
    }
}

impl fmt::Display for StreamOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamOutcome::Completed => write!(f, "completed"),
            StreamOutcome::Cancelled => write!(f, "cancelled"),
            StreamOutcome::Failed(msg) => write!(f, "stream failed: {msg}"),
            StreamOutcome::ReaderUnavailable => write!(f, "response has no readable body"),
        }
    }
}

#[derive(Debug, Default)]
struct PumpStats {
    bytes: usize,
    records: usize,
    malformed: usize,
}

/// Longest slice of a malformed line that ends up in the log.
const LOGGED_LINE_MAX: usize = 200;

fn preview(line: &str) -> &str {
    match line.char_indices().nth(LOGGED_LINE_MAX) {
        Some((end, _)) => &line[..end],
        None => line,
    }
}

/// Parses one line and hands it to the consumer. Returns false when the
/// consumer no longer wants events.
fn deliver<F>(line: &str, on_event: &mut F, stats: &mut PumpStats) -> bool
where
    F: FnMut(StreamEvent) -> bool,
{
    match parse_line(line) {
        Ok(event) => {
            stats.records += 1;
            on_event(event)
        }
        Err(e) => {
            stats.malformed += 1;
            warn!("Skipping malformed record ({e}): {}", preview(line));
            true
        }
    }
}

/// Reads `body` until it ends, fails, or `cancel` fires, calling `on_event`
/// once per record in arrival order.
///
/// Cancellation is checked before every read and between records, so no
/// event is delivered after the token fires. A final line without a trailing
/// newline is still parsed.
pub async fn pump<S, B, E, F>(mut body: S, cancel: &CancellationToken, mut on_event: F) -> StreamOutcome
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: fmt::Display,
    F: FnMut(StreamEvent) -> bool,
{
    let mut framer = LineFramer::new();
    let mut stats = PumpStats::default();

    let outcome = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break StreamOutcome::Cancelled,
            next = body.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                let chunk = chunk.as_ref();
                stats.bytes += chunk.len();
                debug!("Chat chunk received: {} bytes", chunk.len());

                let mut stopped = false;
                for line in framer.push(chunk) {
                    if cancel.is_cancelled() || !deliver(&line, &mut on_event, &mut stats) {
                        stopped = true;
                        break;
                    }
                }
                if stopped {
                    break StreamOutcome::Cancelled;
                }
            }
            Some(Err(e)) => break StreamOutcome::Failed(e.to_string()),
            None => {
                if let Some(line) = framer.finish()
                    && !cancel.is_cancelled()
                    && !deliver(&line, &mut on_event, &mut stats)
                {
                    break StreamOutcome::Cancelled;
                }
                break StreamOutcome::Completed;
            }
        }
    };

    match &outcome {
        StreamOutcome::Cancelled => info!(
            "Chat stream cancelled after {} records ({} bytes)",
            stats.records, stats.bytes
        ),
        StreamOutcome::Failed(msg) => warn!(
            "Chat stream failed after {} records ({} bytes): {msg}",
            stats.records, stats.bytes
        ),
        _ => info!(
            "Chat stream {outcome}: {} records, {} malformed, {} bytes",
            stats.records, stats.malformed, stats.bytes
        ),
    }
    outcome
}

/// Owner of the single open chat stream. Beginning a new stream cancels the
/// one before it.
#[derive(Debug, Default)]
pub struct StreamSlot {
    token: Option<CancellationToken>,
}

impl StreamSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels any open stream and issues the token for the next one.
    pub fn begin(&mut self) -> CancellationToken {
        self.cancel();
        let token = CancellationToken::new();
        self.token = Some(token.clone());
        token
    }

    /// Cancels the open stream. Returns false when nothing was open.
    pub fn cancel(&mut self) -> bool {
        match self.token.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}
