//! Transport-to-decoder bridging.
//!
//! The transport collaborator owns the HTTP request and delivers text; these
//! adapters feed it through the frame reader and send each decoded event
//! over a channel. Delivery must be single-threaded and ordered (one decoder
//! instance per session, one task driving it); a transport that fans chunks
//! across executors has to serialize before calling in here.

use anyhow::{Result, bail};
use futures::{Stream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::debug;

use aerolink_protocol::{AgentEvent, FrameReader, decode_frame};

enum Delivery {
    Continue,
    /// Terminal event sent, or the receiver is gone; stop reading.
    Stop,
}

struct EventSink {
    tx: mpsc::UnboundedSender<AgentEvent>,
}

impl EventSink {
    fn send(&self, event: AgentEvent) -> Delivery {
        let terminal = event.is_terminal();
        if self.tx.send(event).is_err() {
            debug!("event receiver dropped; cancelling decode");
            return Delivery::Stop;
        }
        if terminal {
            Delivery::Stop
        } else {
            Delivery::Continue
        }
    }
}

/// Decode an SSE byte source into events, sending each over `tx`.
///
/// Stops after the first terminal event (`Done`/`Error`); nothing more is
/// expected for the session after one. A source that ends without a terminal
/// event is an abrupt disconnect and surfaces as an error, after any pending
/// partial frame has been flushed. A dropped receiver cancels decoding
/// without error.
pub async fn stream_events<R>(reader: R, tx: mpsc::UnboundedSender<AgentEvent>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut frames = FrameReader::new();
    let sink = EventSink { tx };
    while let Some(line) = lines.next_line().await? {
        if let Some(frame) = frames.push_line(&line) {
            if let Delivery::Stop = sink.send(decode_frame(&frame)) {
                return Ok(());
            }
        }
    }
    drain(frames, &sink)
}

/// Like [`stream_events`], but for transports that already expose a line
/// stream (a websocket bridge, a platform channel) rather than a reader.
pub async fn stream_line_events<S>(mut lines: S, tx: mpsc::UnboundedSender<AgentEvent>) -> Result<()>
where
    S: Stream<Item = String> + Unpin,
{
    let mut frames = FrameReader::new();
    let sink = EventSink { tx };
    while let Some(line) = lines.next().await {
        if let Some(frame) = frames.push_line(&line) {
            if let Delivery::Stop = sink.send(decode_frame(&frame)) {
                return Ok(());
            }
        }
    }
    drain(frames, &sink)
}

/// End-of-input handling shared by both adapters: flush the pending frame,
/// then report exhaustion unless a terminal event closed the session.
fn drain(mut frames: FrameReader, sink: &EventSink) -> Result<()> {
    if let Some(frame) = frames.finish() {
        if let Delivery::Stop = sink.send(decode_frame(&frame)) {
            return Ok(());
        }
    }
    bail!("event stream ended before a terminal event (done/error)")
}

// ── Tests ────────────────────────────────────────────────────────────────────
