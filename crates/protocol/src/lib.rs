//! Decoder for the aviation-agent streaming event protocol.
//!
//! The backend speaks a line-oriented SSE dialect: one `event:` line, one or
//! more `data:` lines, a blank terminator. This crate turns that text into a
//! sequence of typed [`AgentEvent`]s without ever aborting the stream: a
//! frame that fails to decode degrades to [`AgentEvent::Unknown`] and the
//! next frame decodes normally.
//!
//! The crate is deliberately free of I/O and async. The input boundary is a
//! sequence of text lines, the output boundary a sequence of events, so each
//! client platform only needs a thin adapter around its own transport (see
//! the `aerolink-stream` crate for the tokio one).

pub mod event;
pub mod frame;
pub mod tool_result;
pub mod visualization;

pub use event::{AgentEvent, TokenUsage, decode_event, decode_frame, decode_transcript};
pub use frame::{Frame, FrameReader, Frames, frames};
pub use tool_result::{AirportSummary, ToolResult, extract_tool_result};
pub use visualization::{
    GeoPoint, MarkerDetails, Route, RouteEndpoint, VisualizationPayload, VizError, VizView,
    normalize_visualization,
};
