//! Incremental Server-Sent-Events framing
//!
//! Bytes are buffered, not characters, so a multi-byte UTF-8 sequence split
//! across two reads is decoded only once the whole frame has arrived.

/// Where the parser stands between reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Nothing buffered
    Idle,
    /// Holding a partial frame, waiting for more bytes
    Buffering,
    /// At least one complete frame can be taken with [`SseParser::next_frame`]
    FrameReady,
}

/// One complete frame: the joined `data:` lines of a blank-line delimited block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub data: String,
}

impl SseFrame {
    /// Builds a frame from a raw block, or `None` if it carries no data lines
    fn from_block(block: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(block);
        let data: Vec<&str> = text
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|value| value.strip_prefix(' ').unwrap_or(value))
            .collect();

        if data.is_empty() {
            None
        } else {
            Some(Self {
                data: data.join("\n"),
            })
        }
    }
}

#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no frame delimiter
    scanned: usize,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ParserState {
        if self.buffer.is_empty() {
            ParserState::Idle
        } else if find_delimiter(&self.buffer, self.scanned).is_some() {
            ParserState::FrameReady
        } else {
            ParserState::Buffering
        }
    }

    /// Appends a chunk as read from the wire
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Takes the next complete frame, skipping blocks without data lines
    pub fn next_frame(&mut self) -> Option<SseFrame> {
        while let Some((start, len)) = find_delimiter(&self.buffer, self.scanned) {
            let block: Vec<u8> = self.buffer.drain(..start + len).take(start).collect();
            self.scanned = 0;
            if let Some(frame) = SseFrame::from_block(&block) {
                return Some(frame);
            }
        }
        // A delimiter may still begin in the last two bytes
        self.scanned = self.buffer.len().saturating_sub(2);
        None
    }

    /// Flushes whatever is left once the stream has ended
    pub fn finish(&mut self) -> Option<SseFrame> {
        let block = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        SseFrame::from_block(&block)
    }
}

/// Finds the first blank line: `\n\n`, or `\n\r\n` as found in `\r\n\r\n`
///
/// Searches from `from` onwards. Returns the block length and the delimiter
/// length.
fn find_delimiter(buffer: &[u8], from: usize) -> Option<(usize, usize)> {
    buffer.iter().enumerate().skip(from).find_map(|(i, &byte)| {
        if byte != b'\n' {
            return None;
        }
        match &buffer[i + 1..] {
            [b'\n', ..] => Some((i, 2)),
            [b'\r', b'\n', ..] => Some((i, 3)),
            _ => None,
        }
    })
}
