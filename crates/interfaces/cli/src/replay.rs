//! Transcript replay and inspection.
//!
//! Works on captured SSE transcripts (a file, or stdin when piped straight
//! from the transport). Decoding is the same code path the clients use, so
//! an odd frame reproduces here exactly as it did in the app.

use std::collections::BTreeMap;
use std::io::Read;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

use aerolink_protocol::{AgentEvent, decode_transcript};
use aerolink_stream::{CompletedToolCall, MessageAssembler, ToolCallCorrelator, stream_events};

use crate::config::{OutputFormat, ReplayConfig};

/// Read a complete transcript body from a path, `-` meaning stdin.
pub fn read_transcript(source: &str) -> Result<String> {
    if source == "-" {
        let mut body = String::new();
        std::io::stdin()
            .read_to_string(&mut body)
            .context("read transcript from stdin")?;
        Ok(body)
    } else {
        std::fs::read_to_string(source).with_context(|| format!("read transcript {source}"))
    }
}

// ── Replay ───────────────────────────────────────────────────────────────────

/// Decode a complete transcript and print every event.
pub fn run_replay(body: &str, config: &ReplayConfig) -> Result<()> {
    let events = decode_transcript(body);
    let mut summary = SummaryState::default();
    for event in &events {
        print_event(event, config.format)?;
        summary.apply(event);
    }
    if config.summary {
        print!("{}", summary.render());
    }
    Ok(())
}

/// Decode incrementally through the async adapter, printing each event as it
/// arrives. Useful when piping a live response through stdin.
pub async fn run_replay_live(source: &str, config: &ReplayConfig) -> Result<()> {
    if source == "-" {
        live_decode(BufReader::new(tokio::io::stdin()), config).await
    } else {
        let file = tokio::fs::File::open(source)
            .await
            .with_context(|| format!("open transcript {source}"))?;
        live_decode(BufReader::new(file), config).await
    }
}

async fn live_decode<R>(reader: R, config: &ReplayConfig) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let decoder = tokio::spawn(stream_events(reader, tx));

    let mut summary = SummaryState::default();
    while let Some(event) = rx.recv().await {
        print_event(&event, config.format)?;
        summary.apply(&event);
    }
    if config.summary {
        print!("{}", summary.render());
    }

    match decoder.await.context("decoder task panicked")? {
        Ok(()) => Ok(()),
        Err(err) => {
            warn!(%err, "stream ended abnormally");
            Err(err)
        }
    }
}

// ── Check ────────────────────────────────────────────────────────────────────

/// Decode a transcript and verify it closes with a terminal event.
pub fn run_check(body: &str, config: &ReplayConfig) -> Result<()> {
    let events = decode_transcript(body);
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut saw_terminal = false;
    for event in &events {
        *counts.entry(kind_name(event)).or_default() += 1;
        if event.is_terminal() {
            saw_terminal = true;
        }
    }

    for (kind, count) in &counts {
        println!("{kind}: {count}");
    }

    if !saw_terminal {
        bail!("transcript has no terminal event (done/error): abrupt disconnect");
    }
    let unknown = counts.get("unknown").copied().unwrap_or(0);
    if config.strict_unknown && unknown > 0 {
        bail!("transcript contains {unknown} unknown frame(s)");
    }
    println!("ok: {} events", events.len());
    Ok(())
}

// ── Rendering ────────────────────────────────────────────────────────────────

fn print_event(event: &AgentEvent, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(event)?),
        OutputFormat::Text => println!("{}", render_event(event)),
    }
    Ok(())
}

fn render_event(event: &AgentEvent) -> String {
    match event {
        AgentEvent::Plan { selected_tool, .. } => match selected_tool {
            Some(tool) => format!("plan: selected tool {tool}"),
            None => "plan".to_string(),
        },
        AgentEvent::Thinking { content } => format!("thinking: {content}"),
        AgentEvent::ToolCallStart { name, .. } => format!("tool start: {name}"),
        AgentEvent::ToolCallEnd { name, result } => {
            let airports = result.airports.as_ref().map(Vec::len).unwrap_or(0);
            format!("tool end: {name} ({airports} airports)")
        }
        AgentEvent::Message { content } => format!("message: {content}"),
        AgentEvent::ThinkingDone => "thinking done".to_string(),
        AgentEvent::Visualization(_) => "visualization payload".to_string(),
        AgentEvent::FinalAnswer { answer, .. } => format!("final answer: {answer}"),
        AgentEvent::Done { session_id, tokens } => format!(
            "done: session {} ({} tokens)",
            session_id.as_deref().unwrap_or("-"),
            tokens.total
        ),
        AgentEvent::Error { message } => format!("error: {message}"),
        AgentEvent::Unknown { event, .. } => format!("unknown event: {event}"),
    }
}

fn kind_name(event: &AgentEvent) -> &'static str {
    match event {
        AgentEvent::Plan { .. } => "plan",
        AgentEvent::Thinking { .. } => "thinking",
        AgentEvent::ToolCallStart { .. } => "tool_call_start",
        AgentEvent::ToolCallEnd { .. } => "tool_call_end",
        AgentEvent::Message { .. } => "message",
        AgentEvent::ThinkingDone => "thinking_done",
        AgentEvent::Visualization(_) => "visualization",
        AgentEvent::FinalAnswer { .. } => "final_answer",
        AgentEvent::Done { .. } => "done",
        AgentEvent::Error { .. } => "error",
        AgentEvent::Unknown { .. } => "unknown",
    }
}

/// Incremental summary over a replayed session, shared by both replay paths.
#[derive(Debug, Default)]
struct SummaryState {
    assembler: MessageAssembler,
    correlator: ToolCallCorrelator,
    completed: Vec<CompletedToolCall>,
    total: usize,
    unknown: usize,
}

impl SummaryState {
    fn apply(&mut self, event: &AgentEvent) {
        self.total += 1;
        if matches!(event, AgentEvent::Unknown { .. }) {
            self.unknown += 1;
        }
        self.assembler.apply(event);
        if let Some(call) = self.correlator.apply(event) {
            self.completed.push(call);
        }
    }

    fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "-- summary: {} events, {} unknown --\n",
            self.total, self.unknown
        ));
        for call in &self.completed {
            let pairing = if call.start.is_some() {
                "paired"
            } else {
                "unmatched end"
            };
            out.push_str(&format!("tool {}: {pairing}\n", call.name));
        }
        let running: Vec<&str> = self.correlator.running().collect();
        if !running.is_empty() {
            out.push_str(&format!("still running: {}\n", running.join(", ")));
        }
        if !self.assembler.text().is_empty() {
            out.push_str(&format!("assembled message: {}\n", self.assembler.text()));
        }
        out
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SESSION: &str = concat!(
        "event: plan\ndata: {\"selected_tool\":\"search_airports\"}\n\n",
        "event: tool_call_start\ndata: {\"name\":\"search_airports\"}\n\n",
        "event: tool_call_end\ndata: {\"name\":\"search_airports\",\"result\":{\"airports\":[{\"ident\":\"EGLL\"}]}}\n\n",
        "event: message\ndata: {\"content\":\"Here\"}\n\n",
        "event: message\ndata: {\"content\":\" are results\"}\n\n",
        "event: done\ndata: {\"session_id\":\"s1\"}\n\n",
    );

    #[test]
    fn summary_reflects_the_session() {
        let mut summary = SummaryState::default();
        for event in decode_transcript(SESSION) {
            summary.apply(&event);
        }
        let rendered = summary.render();
        assert!(rendered.contains("6 events, 0 unknown"));
        assert!(rendered.contains("tool search_airports: paired"));
        assert!(rendered.contains("assembled message: Here are results"));
        assert!(!rendered.contains("still running"));
    }

    #[test]
    fn summary_reports_unfinished_tools() {
        let mut summary = SummaryState::default();
        let body = "event: tool_call_start\ndata: {\"name\":\"get_notams\"}\n\n";
        for event in decode_transcript(body) {
            summary.apply(&event);
        }
        assert!(summary.render().contains("still running: get_notams"));
    }

    #[test]
    fn check_accepts_a_closed_session() {
        assert!(run_check(SESSION, &ReplayConfig::default()).is_ok());
    }

    #[test]
    fn check_rejects_a_session_without_terminal_event() {
        let body = "event: message\ndata: {\"content\":\"half\"}\n\n";
        let err = run_check(body, &ReplayConfig::default()).unwrap_err();
        assert!(err.to_string().contains("no terminal event"));
    }

    #[test]
    fn strict_check_rejects_unknown_frames() {
        let body = concat!(
            "event: mystery\ndata: {}\n\n",
            "event: done\ndata: {}\n\n",
        );
        let config = ReplayConfig {
            strict_unknown: true,
            ..ReplayConfig::default()
        };
        let err = run_check(body, &config).unwrap_err();
        assert!(err.to_string().contains("unknown frame"));
        // The same transcript passes without strict mode.
        assert!(run_check(body, &ReplayConfig::default()).is_ok());
    }

    #[test]
    fn read_transcript_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{SESSION}").unwrap();
        let body = read_transcript(file.path().to_str().unwrap()).unwrap();
        assert_eq!(body, SESSION);
    }

    #[tokio::test]
    async fn live_replay_decodes_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{SESSION}").unwrap();
        let config = ReplayConfig::default();
        run_replay_live(file.path().to_str().unwrap(), &config)
            .await
            .unwrap();
    }

    #[test]
    fn render_event_lines_are_stable() {
        let events = decode_transcript(SESSION);
        assert_eq!(render_event(&events[0]), "plan: selected tool search_airports");
        assert_eq!(render_event(&events[1]), "tool start: search_airports");
        assert_eq!(render_event(&events[2]), "tool end: search_airports (1 airports)");
        assert_eq!(render_event(&events[5]), "done: session s1 (0 tokens)");
    }
}
