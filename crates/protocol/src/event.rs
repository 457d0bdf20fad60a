//! Event classification and payload decoding.
//!
//! Dispatch is by event name against a fixed table; within each branch a
//! decoding failure (bad JSON, missing required field, wrong type) is caught
//! and converted to [`AgentEvent::Unknown`] rather than propagated. The
//! stream therefore never aborts on a single bad frame, and unrecognized
//! event names or extra payload fields pass through harmlessly.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::frame::{Frame, frames};
use crate::tool_result::{ToolResult, extract_tool_result};
use crate::visualization::{VisualizationPayload, normalize_visualization};

// ── Event types ──────────────────────────────────────────────────────────────

/// Token counts reported on the terminal `done` event.
///
/// Fields the backend omits count as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    pub total: u64,
}

/// One decoded protocol event.
///
/// Exactly one variant is materialized per input frame. Decoding never
/// fails: a frame that cannot be decoded becomes [`AgentEvent::Unknown`]
/// with the event name and raw data body preserved verbatim for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentEvent {
    /// Planner output ahead of a tool invocation.
    Plan {
        selected_tool: Option<String>,
        arguments: Option<Value>,
        reasoning: Option<String>,
    },
    /// Reasoning text streamed while the agent works.
    Thinking { content: String },
    /// A tool invocation has started on the backend.
    ToolCallStart {
        name: String,
        arguments: Map<String, Value>,
    },
    /// A tool invocation finished; its result object is pre-extracted.
    ToolCallEnd { name: String, result: ToolResult },
    /// Assistant message text chunk.
    Message { content: String },
    /// The reasoning phase is over.
    ThinkingDone,
    /// Map visualization instructions.
    Visualization(VisualizationPayload),
    /// The agent's final answer.
    FinalAnswer {
        /// Answer text, defensively unescaped once (see [`decode_event`]).
        answer: String,
        /// The complete `state` object as received, for consumers that need
        /// fields not modeled here.
        state: Value,
    },
    /// Terminal success event.
    Done {
        session_id: Option<String>,
        tokens: TokenUsage,
    },
    /// Terminal failure event reported by the server.
    Error { message: String },
    /// Any frame that failed to decode, body preserved verbatim.
    Unknown { event: String, raw: String },
}

impl AgentEvent {
    /// True for events after which the server sends nothing more.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

// ── Classifier ───────────────────────────────────────────────────────────────

/// Event names that all carry a plain message chunk.
const MESSAGE_EVENT_NAMES: &[&str] = &["message", "content", "answer", "response", "text_chunk"];

/// Keys consulted, in priority order, for the text of a message-style event.
const MESSAGE_TEXT_KEYS: &[&str] = &["content", "text", "response", "chunk"];

/// Decode one frame into exactly one event.
pub fn decode_frame(frame: &Frame) -> AgentEvent {
    decode_event(&frame.event, &frame.data)
}

/// Decode an `(event name, data body)` pair into exactly one event.
pub fn decode_event(event: &str, data: &str) -> AgentEvent {
    let decoded = match event {
        "plan" => decode_plan(data),
        "thinking" => decode_thinking(data),
        "tool_call_start" => decode_tool_call_start(data),
        "tool_call_end" => decode_tool_call_end(data),
        "thinking_done" => Some(AgentEvent::ThinkingDone),
        "ui_payload" => decode_ui_payload(data),
        "final_answer" => decode_final_answer(data),
        "done" => decode_done(data),
        "error" => decode_error(data),
        name if MESSAGE_EVENT_NAMES.contains(&name) => decode_message(data),
        // Forward compatibility: names we don't know pass through untouched.
        _ => None,
    };
    decoded.unwrap_or_else(|| {
        debug!(event, "frame did not decode; passing through as unknown");
        AgentEvent::Unknown {
            event: event.to_string(),
            raw: data.to_string(),
        }
    })
}

/// Decode a complete, pre-split response body in one call.
///
/// Convenience for the replay and test paths; live transports drive
/// [`FrameReader`](crate::frame::FrameReader) incrementally instead.
pub fn decode_transcript(body: &str) -> Vec<AgentEvent> {
    frames(body.lines()).map(|frame| decode_frame(&frame)).collect()
}

// ── Per-event decoders ───────────────────────────────────────────────────────
//
// Each returns None on failure; the classifier turns that into Unknown.

fn parse_object(data: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(data) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn get_string(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn decode_plan(data: &str) -> Option<AgentEvent> {
    let obj = parse_object(data)?;
    Some(AgentEvent::Plan {
        selected_tool: get_string(&obj, "selected_tool"),
        arguments: obj.get("arguments").cloned(),
        reasoning: get_string(&obj, "planning_reasoning"),
    })
}

fn decode_thinking(data: &str) -> Option<AgentEvent> {
    let obj = parse_object(data)?;
    let content = get_string(&obj, "content")?;
    Some(AgentEvent::Thinking { content })
}

fn decode_tool_call_start(data: &str) -> Option<AgentEvent> {
    let obj = parse_object(data)?;
    let name = get_string(&obj, "name")?;
    let arguments = match obj.get("arguments") {
        None => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        // Present but not an object is malformed.
        Some(_) => return None,
    };
    Some(AgentEvent::ToolCallStart { name, arguments })
}

fn decode_tool_call_end(data: &str) -> Option<AgentEvent> {
    let obj = parse_object(data)?;
    let name = get_string(&obj, "name")?;
    let result = match obj.get("result") {
        Some(Value::Object(map)) => extract_tool_result(map),
        _ => return None,
    };
    Some(AgentEvent::ToolCallEnd { name, result })
}

fn decode_message(data: &str) -> Option<AgentEvent> {
    match serde_json::from_str::<Value>(data) {
        Ok(Value::Object(obj)) => {
            let content = MESSAGE_TEXT_KEYS
                .iter()
                .find_map(|key| obj.get(*key).and_then(Value::as_str))?;
            Some(AgentEvent::Message {
                content: content.to_string(),
            })
        }
        // Valid JSON that isn't an object has no text to extract.
        Ok(_) => None,
        Err(_) => {
            // Plain-text bodies stream through as literal message text;
            // bodies that look like JSON but failed to parse stay unknown.
            if data.is_empty() || data.starts_with('{') || data.starts_with('[') {
                None
            } else {
                Some(AgentEvent::Message {
                    content: data.to_string(),
                })
            }
        }
    }
}

fn decode_ui_payload(data: &str) -> Option<AgentEvent> {
    let obj = parse_object(data)?;
    match normalize_visualization(&obj) {
        Ok(payload) => Some(AgentEvent::Visualization(payload)),
        Err(err) => {
            debug!(%err, "ui_payload failed to normalize");
            None
        }
    }
}

fn decode_final_answer(data: &str) -> Option<AgentEvent> {
    let obj = parse_object(data)?;
    let state = obj.get("state")?.clone();
    let answer = state.get("final_answer")?.as_str()?;
    Some(AgentEvent::FinalAnswer {
        answer: unescape_once(answer),
        state,
    })
}

fn decode_done(data: &str) -> Option<AgentEvent> {
    let obj = parse_object(data)?;
    let tokens = obj
        .get("tokens")
        .map(|value| serde_json::from_value(value.clone()).unwrap_or_default())
        .unwrap_or_default();
    Some(AgentEvent::Done {
        session_id: get_string(&obj, "session_id"),
        tokens,
    })
}

fn decode_error(data: &str) -> Option<AgentEvent> {
    let obj = parse_object(data)?;
    let message = ["message", "error"]
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str))
        .unwrap_or("Unknown error")
        .to_string();
    Some(AgentEvent::Error { message })
}

// ── Escaping ─────────────────────────────────────────────────────────────────

/// Unescape one level of literal escape sequences.
///
/// One backend call path delivers the final answer double-escaped (literal
/// `\n`, `\"` sequences inside the decoded string). The depth is not fixed,
/// so this detects rather than assumes: text without backslashes passes
/// through unchanged, and an unrecognized sequence keeps both characters.
fn unescape_once(text: &str) -> String {
    if !text.contains('\\') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

// ── Tests ────────────────────────────────────────────────────────────────────
