//! SSE frame grouping: raw text lines in, `(event, data)` frames out.
//!
//! The transport may deliver lines incrementally as network bytes arrive or
//! pre-split from a complete response body; either way the grouping rules
//! are the same, so this is a push-style state machine with an iterator
//! adapter on top.

use std::mem;

/// One logical protocol frame: an event name plus its joined data body.
///
/// A frame is only ever produced with both fields populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub event: String,
    pub data: String,
}

/// Groups raw SSE lines into [`Frame`]s.
///
/// Feed lines one at a time with [`push_line`](Self::push_line); a completed
/// frame comes back on the blank line that terminates it. Call
/// [`finish`](Self::finish) once at end of input so a stream that was cut
/// off before its trailing blank line still yields its last frame.
///
/// The only state held is the in-progress event name and data buffer, so a
/// reader is cheap to create per session and needs no teardown.
#[derive(Debug, Default)]
pub struct FrameReader {
    current_event: Option<String>,
    data_buffer: String,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one line of input, returning a frame when `line` completes one.
    pub fn push_line(&mut self, line: &str) -> Option<Frame> {
        // Tolerate CRLF transports.
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            return self.take_pending();
        }
        if let Some(rest) = line.strip_prefix("event:") {
            // A second event line within one frame overwrites the first.
            self.current_event = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            // SSE multi-line rule: successive data lines join with a newline.
            if !self.data_buffer.is_empty() {
                self.data_buffer.push('\n');
            }
            self.data_buffer.push_str(rest.trim());
        }
        // Anything else (comments, id:, retry:) carries nothing we decode.
        None
    }

    /// Flush the pending frame at end of input.
    pub fn finish(&mut self) -> Option<Frame> {
        self.take_pending()
    }

    fn take_pending(&mut self) -> Option<Frame> {
        let event = self.current_event.take();
        let data = mem::take(&mut self.data_buffer);
        match event {
            Some(event) if !data.is_empty() => Some(Frame { event, data }),
            _ => None,
        }
    }
}

/// Lazy frame sequence over any sequence of lines.
///
/// ```rust
/// use aerolink_protocol::frame::frames;
///
/// let body = "event: message\ndata: {\"content\":\"hi\"}\n\n";
/// let all: Vec<_> = frames(body.lines()).collect();
/// assert_eq!(all.len(), 1);
/// assert_eq!(all[0].event, "message");
/// ```
pub fn frames<I>(lines: I) -> Frames<I::IntoIter>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    Frames {
        lines: lines.into_iter(),
        reader: FrameReader::new(),
        done: false,
    }
}

/// Iterator returned by [`frames`].
#[derive(Debug)]
pub struct Frames<I> {
    lines: I,
    reader: FrameReader,
    done: bool,
}

impl<I> Iterator for Frames<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.done {
            return None;
        }
        for line in self.lines.by_ref() {
            if let Some(frame) = self.reader.push_line(line.as_ref()) {
                return Some(frame);
            }
        }
        self.done = true;
        self.reader.finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
