//! Incremental frame decoder for the tag's ranging stream.
//!
//! The tag emits JSON messages of the form
//! `{"links":[{"A":"1782","R":"2.5"},...]}` back to back over TCP, with no
//! length prefix and no delimiter beyond the object's own closing braces.
//! Chunks arrive at arbitrary boundaries, so the decoder accumulates bytes
//! and extracts the most recent complete message per call.
//!
//! Only the last complete message in the buffer is ever parsed: readings are
//! a live state sample, not a log to replay, so older messages that piled up
//! between reads are stale and dropped. This freshness-over-completeness
//! policy is part of the contract.

use log::{debug, error};
use serde::Deserialize;

use crate::core::{Frame, RangingReading};

/// Start marker of a ranging message.
const FRAME_START: &[u8] = b"{\"links\"";
/// Terminator closing the link array and the enclosing object.
const FRAME_END: &[u8] = b"]}";

#[derive(Debug, Deserialize)]
struct LinksMessage {
    links: Vec<LinkRecord>,
}

#[derive(Debug, Deserialize)]
struct LinkRecord {
    #[serde(rename = "A")]
    anchor: String,
    #[serde(rename = "R")]
    range: RangeValue,
}

/// The firmware serializes ranges as JSON strings (`"R":"2.5"`); accept a
/// plain number as well.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RangeValue {
    Number(f64),
    Text(String),
}

impl RangeValue {
    fn as_f64(&self) -> Option<f64> {
        match self {
            RangeValue::Number(n) => Some(*n),
            RangeValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Stream-framing decoder. One instance per connection; it owns the byte
/// buffer exclusively for that connection's lifetime.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a received chunk and extract the latest complete frame.
    ///
    /// Candidate messages are anchored on each `]}` terminator, scanned
    /// from the end of the buffer backwards, and the latest one that parses
    /// wins. Corrupt trailing bytes that happen to contain a terminator
    /// therefore cannot shadow a valid message sitting before them.
    ///
    /// Returns an empty frame when no complete message is buffered yet
    /// (the buffer is left untouched) and when terminated bytes exist but
    /// none of them parse (the offending bytes are discarded, the
    /// connection continues).
    pub fn push(&mut self, chunk: &[u8]) -> Frame {
        self.buffer.extend_from_slice(chunk);

        let Some(last_end) = rfind(&self.buffer, FRAME_END).map(|p| p + FRAME_END.len()) else {
            return Frame::empty();
        };

        let mut upper = self.buffer.len();
        while let Some(pos) = rfind(&self.buffer[..upper], FRAME_END) {
            let end = pos + FRAME_END.len();
            if let Some(start) = rfind(&self.buffer[..end], FRAME_START) {
                match serde_json::from_slice::<LinksMessage>(&self.buffer[start..end]) {
                    Ok(message) => {
                        let frame = self.build_frame(message);
                        // Consume through the winning message; trailing
                        // bytes stay for the next call.
                        self.buffer.drain(..end);
                        return frame;
                    }
                    Err(e) => debug!("terminated fragment failed to parse: {}", e),
                }
            }
            upper = pos;
        }

        // Terminators present, nothing parsable anchored on any of them.
        error!("dropping undecodable ranging fragment(s)");
        self.buffer.drain(..last_end);
        Frame::empty()
    }

    /// Bytes retained for the next call.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop all buffered bytes. Called when a connection is (re)established.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    fn build_frame(&self, message: LinksMessage) -> Frame {
        let mut readings = Vec::with_capacity(message.links.len());
        for link in message.links {
            match link.range.as_f64() {
                Some(range_m) => readings.push(RangingReading {
                    anchor_id: link.anchor,
                    range_m,
                }),
                None => {
                    debug!("anchor {}: unparsable range field, skipped", link.anchor);
                }
            }
        }
        Frame { readings }
    }
}

/// Last occurrence of `needle` in `haystack`.
fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).rev().find(|&i| &haystack[i..i + needle.len()] == needle)
}
