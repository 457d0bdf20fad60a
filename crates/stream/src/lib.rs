//! Consumer-side layer over the aerolink protocol decoder.
//!
//! The decoder core (`aerolink-protocol`) is a pure line-in/event-out
//! transformation. This crate supplies what a client actually wires it to:
//! adapters from the platform's streaming primitives onto the decoder, and
//! the two small stateful helpers chat UIs build on top of the typed event
//! stream (message assembly and tool call correlation).

mod adapter;
mod assembler;
mod correlator;

pub use adapter::{stream_events, stream_line_events};
pub use assembler::MessageAssembler;
pub use correlator::{CompletedToolCall, StartedToolCall, ToolCallCorrelator};
