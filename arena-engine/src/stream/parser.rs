//! Incremental parser for the debate event stream wire format
//!
//! The transport is Server-Sent Events: UTF-8 text frames of
//! `event:`/`data:` field lines terminated by a blank line, with `:`
//! comment lines used as heartbeats. Chunk boundaries fall anywhere, so
//! the parser buffers bytes and only interprets complete lines.

use arena_common::api::NewRoundFrame;
use arena_common::events::DebateEvent;
use chrono::Utc;
use tracing::{debug, warn};

/// One complete frame as delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Frame name from the `event:` field (`"message"` when absent)
    pub event: String,
    /// Data lines joined with `\n`
    pub data: String,
}

/// Incremental frame parser.
///
/// Feed arbitrary chunks with [`SseParser::push`]; complete frames come
/// back in arrival order. Comment lines and frames with neither an event
/// name nor data (keep-alives) produce nothing.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data_lines: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one transport chunk, returning every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<RawFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop(); // trailing \n
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line).into_owned();

            if line.is_empty() {
                if let Some(frame) = self.take_frame() {
                    frames.push(frame);
                }
            } else if let Some(rest) = line.strip_prefix(':') {
                // Comment line, typically a heartbeat
                debug!("stream comment: {}", rest.trim_start());
            } else {
                self.push_field(&line);
            }
        }
        frames
    }

    fn push_field(&mut self, line: &str) {
        let (name, value) = match line.split_once(':') {
            Some((name, value)) => (name, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match name {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data_lines.push(value.to_string()),
            // Reconnect bookkeeping we do not use: retries restart from scratch
            "id" | "retry" => {}
            other => debug!("ignoring unknown stream field: {}", other),
        }
    }

    fn take_frame(&mut self) -> Option<RawFrame> {
        if self.event.is_none() && self.data_lines.is_empty() {
            return None;
        }
        let frame = RawFrame {
            event: self.event.take().unwrap_or_else(|| "message".to_string()),
            data: self.data_lines.join("\n"),
        };
        self.data_lines.clear();
        Some(frame)
    }
}

/// Decode a raw frame into a typed debate event.
///
/// A malformed payload yields `None` — the frame is dropped and logged
/// rather than failing the whole stream. Unknown frame names are ignored
/// the same way, keeping the vocabulary open to additions.
pub fn decode_frame(frame: RawFrame, planned_rounds: u32) -> Option<DebateEvent> {
    match frame.event.as_str() {
        "status" => Some(DebateEvent::Status {
            text: frame.data.trim().to_string(),
            timestamp: Utc::now(),
        }),
        "new_round" => match serde_json::from_str::<NewRoundFrame>(&frame.data) {
            Ok(payload) => Some(DebateEvent::NewRound {
                round: payload.into_round(planned_rounds),
                timestamp: Utc::now(),
            }),
            Err(e) => {
                warn!("dropping malformed new_round frame: {}", e);
                None
            }
        },
        "end" => Some(DebateEvent::End {
            timestamp: Utc::now(),
        }),
        other => {
            debug!("ignoring unknown frame type: {}", other);
            None
        }
    }
}
