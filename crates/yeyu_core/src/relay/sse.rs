//! Incremental decoder for upstream `text/event-stream` completion bodies.
//!
//! # Invariants
//! - Lines split across chunk boundaries are reassembled before parsing.
//! - Only `data:` lines are interpreted; everything else is ignored.
//! - Unparseable data lines and empty deltas produce no event.

use serde_json::Value;

const DONE_SENTINEL: &str = "[DONE]";

/// One decoded upstream event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A non-empty `choices[0].delta.content` fragment.
    Delta(String),
    /// The `[DONE]` sentinel.
    Done,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one body chunk and returns every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.pending.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            if let Some(event) = decode_line(&line[..line.len() - 1]) {
                events.push(event);
            }
        }
        events
    }

    /// Decodes a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if self.pending.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.pending);
        decode_line(&line)
    }
}

fn decode_line(raw: &[u8]) -> Option<SseEvent> {
    let line = std::str::from_utf8(raw).ok()?.trim_end_matches('\r');
    let data = line.strip_prefix("data:")?.trim_start();
    if data == DONE_SENTINEL {
        return Some(SseEvent::Done);
    }

    let parsed: Value = serde_json::from_str(data).ok()?;
    let content = parsed
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)?;
    if content.is_empty() {
        return None;
    }
    Some(SseEvent::Delta(content.to_string()))
}
