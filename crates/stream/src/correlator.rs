//! Pairing of tool call start and end events by tool name.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

use aerolink_protocol::{AgentEvent, ToolResult};

/// A tool invocation the backend has started but not finished.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartedToolCall {
    pub name: String,
    pub arguments: Map<String, Value>,
}

/// A start/end pair yielded when a tool finishes.
///
/// `start` is `None` when the end arrived with no matching start, e.g. a
/// client that attached mid-stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedToolCall {
    pub name: String,
    pub start: Option<StartedToolCall>,
    pub result: ToolResult,
}

/// Tracks in-flight tool calls for "currently running" UI state.
///
/// Calls are keyed by tool name because the wire protocol carries no
/// per-call identifier. When the same tool starts twice before the first end
/// arrives, the later start wins and the earlier one is lost.
#[derive(Debug, Clone, Default)]
pub struct ToolCallCorrelator {
    in_flight: HashMap<String, StartedToolCall>,
}

impl ToolCallCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one decoded event, yielding the completed pair when `event`
    /// ends a tool call. All other events pass through with no effect.
    pub fn apply(&mut self, event: &AgentEvent) -> Option<CompletedToolCall> {
        match event {
            AgentEvent::ToolCallStart { name, arguments } => {
                self.in_flight.insert(
                    name.clone(),
                    StartedToolCall {
                        name: name.clone(),
                        arguments: arguments.clone(),
                    },
                );
                None
            }
            AgentEvent::ToolCallEnd { name, result } => Some(CompletedToolCall {
                name: name.clone(),
                start: self.in_flight.remove(name),
                result: result.clone(),
            }),
            _ => None,
        }
    }

    /// Names of tools currently running, for spinner display.
    pub fn running(&self) -> impl Iterator<Item = &str> {
        self.in_flight.keys().map(String::as_str)
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.in_flight.contains_key(name)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
