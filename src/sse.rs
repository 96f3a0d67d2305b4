//! Server-Sent Events framing for job progress streams.
//!
//! Only the subset of SSE used by the job endpoints is understood:
//! ```text
//! data: {"status": "in_progress", "progress_percent": 10}
//!
//! data: {"status": "completed", "progress_percent": 100}
//! ```
//! Lines are newline-delimited. A line is significant only if it starts with
//! the literal `data: ` prefix; `event:`, `id:`, `retry:`, comments and blank
//! keep-alive lines are dropped.

/// Incremental UTF-8 decoder that keeps an incomplete multi-byte sequence
/// across chunk boundaries instead of corrupting it.
///
/// Invalid sequences are replaced with U+FFFD, matching lossy decoding.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    carry: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `chunk` (prefixed by any carried bytes) as possible.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let bytes = if self.carry.is_empty() {
            chunk.to_vec()
        } else {
            let mut bytes = std::mem::take(&mut self.carry);
            bytes.extend_from_slice(chunk);
            bytes
        };

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            // Truncated sequence at the end: wait for more bytes.
                            self.carry = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush carried bytes at end of input.
    pub fn finish(&mut self) -> String {
        if self.carry.is_empty() {
            return String::new();
        }
        let carry = std::mem::take(&mut self.carry);
        String::from_utf8_lossy(&carry).into_owned()
    }
}

/// Accumulates raw chunks and splits them into complete lines.
///
/// A line is only returned once its terminating `\n` has been seen; the
/// trailing partial line is held until more bytes arrive.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    decoder: Utf8Decoder,
    pending: String,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a raw byte chunk and return every line it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decoder.decode(chunk);
        self.feed_str(&text)
    }

    /// Feed already-decoded text and return every line it completes.
    pub fn feed_str(&mut self, text: &str) -> Vec<String> {
        let appended_at = self.pending.len();
        self.pending.push_str(text);

        // Only the new text can hold a newline; the pending tail never does.
        let Some(offset) = text.rfind('\n') else {
            return Vec::new();
        };
        let last_newline = appended_at + offset;

        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);
        complete[..last_newline]
            .split('\n')
            .map(str::to_owned)
            .collect()
    }

    /// The not-yet-terminated tail.
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// End of input. The unterminated remainder is never turned into a line;
    /// it is returned only so the caller can report what was dropped.
    pub fn finish(&mut self) -> Option<String> {
        let tail = self.decoder.finish();
        self.pending.push_str(&tail);
        let remainder = std::mem::take(&mut self.pending);
        if remainder.is_empty() {
            None
        } else {
            Some(remainder)
        }
    }
}

/// Extract the payload of an SSE data line.
///
/// The prefix must be exactly `data: ` (case-sensitive, one space).
///
/// # Example
/// ```
/// use jobstream::sse::parse_sse_line;
///
/// assert_eq!(parse_sse_line("data: {\"key\": \"value\"}"), Some("{\"key\": \"value\"}"));
/// assert_eq!(parse_sse_line("event: progress"), None);
/// assert_eq!(parse_sse_line("data:{}"), None);
/// ```
pub fn parse_sse_line(line: &str) -> Option<&str> {
    line.strip_prefix("data: ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sse_line() {
        assert_eq!(parse_sse_line("data: hello"), Some("hello"));
        assert_eq!(
            parse_sse_line("data: {\"key\": \"value\"}"),
            Some("{\"key\": \"value\"}")
        );
        assert_eq!(parse_sse_line("data: "), Some(""));
        assert_eq!(parse_sse_line("Data: x"), None);
        assert_eq!(parse_sse_line("data:x"), None);
        assert_eq!(parse_sse_line(": keep-alive"), None);
        assert_eq!(parse_sse_line("id: 7"), None);
        assert_eq!(parse_sse_line(""), None);
    }

    #[test]
    fn test_feed_holds_partial_line() {
        let mut buffer = FrameBuffer::new();
        assert!(buffer.feed(b"data: {\"a\"").is_empty());
        assert_eq!(buffer.pending(), "data: {\"a\"");

        let lines = buffer.feed(b":1}\n\ndata: 2\npart");
        assert_eq!(lines, vec!["data: {\"a\":1}", "", "data: 2"]);
        assert_eq!(buffer.pending(), "part");
    }

    #[test]
    fn test_feed_many_lines_in_one_chunk() {
        let mut buffer = FrameBuffer::new();
        let chunk: String = (0..500).map(|i| format!("data: {i}\n")).collect();
        let lines = buffer.feed(chunk.as_bytes());
        assert_eq!(lines.len(), 500);
        assert_eq!(lines[499], "data: 499");
        assert_eq!(buffer.pending(), "");
    }

    #[test]
    fn test_long_line_in_small_chunks() {
        let mut buffer = FrameBuffer::new();
        buffer.feed(b"data: ");
        for _ in 0..200_000 {
            assert!(buffer.feed(b"xxxxxxxxxx").is_empty());
        }
        assert_eq!(buffer.pending().len(), 2_000_006);

        let lines = buffer.feed(b"\ndata: next");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 2_000_006);
        assert!(lines[0].starts_with("data: xxx"));
        assert_eq!(buffer.pending(), "data: next");
    }

    #[test]
    fn test_finish_discards_unterminated_line() {
        let mut buffer = FrameBuffer::new();
        assert_eq!(buffer.feed(b"data: 1\ndata: 2"), vec!["data: 1"]);
        assert_eq!(buffer.finish(), Some("data: 2".to_string()));
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        let text = "data: {\"message\":\"größe ✓\"}\n";
        let bytes = text.as_bytes();
        // Split inside the three-byte check mark.
        let split = text.find('✓').unwrap() + 1;

        let mut buffer = FrameBuffer::new();
        assert!(buffer.feed(&bytes[..split]).is_empty());
        let lines = buffer.feed(&bytes[split..]);
        assert_eq!(lines, vec![text.trim_end_matches('\n')]);
    }

    #[test]
    fn test_decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{FFFD}b");
        assert_eq!(decoder.decode(b"\xe2\x9c"), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }
}
