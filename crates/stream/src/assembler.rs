//! Accumulation of streamed message text into one running reply.

use aerolink_protocol::AgentEvent;

/// Builds the assistant's reply as `Message` chunks arrive.
///
/// A UI convenience, not part of protocol correctness: the decoder emits
/// chunks; this collects them. The buffer freezes (streaming flag drops)
/// when `Done`, `Error`, or `FinalAnswer` arrives, and keeps the completed
/// text until [`reset`](Self::reset).
#[derive(Debug, Clone, Default)]
pub struct MessageAssembler {
    buffer: String,
    streaming: bool,
}

impl MessageAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one decoded event. Events other than `Message` and the freezing
    /// set are ignored.
    pub fn apply(&mut self, event: &AgentEvent) {
        match event {
            AgentEvent::Message { content } => {
                self.buffer.push_str(content);
                self.streaming = true;
            }
            AgentEvent::Done { .. } | AgentEvent::Error { .. } | AgentEvent::FinalAnswer { .. } => {
                self.streaming = false;
            }
            _ => {}
        }
    }

    /// The text accumulated so far; the completed message once frozen.
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// True while chunks are still arriving for the current message.
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Clear for the next turn.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.streaming = false;
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
