//! Newline framing for a chunked byte stream.
//!
//! Lines are cut at the byte level before decoding. `\n` never occurs
//! inside a multi-byte UTF-8 sequence, so a character split across two reads
//! is reassembled in the carry buffer and decoded whole.

/// Carry-over buffer between reads.
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one read and returns every line it completed, trimmed, with
    /// blank lines dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        complete
            .split(|&b| b == b'\n')
            .filter_map(decode_line)
            .collect()
    }

    /// End of stream: whatever is left is a final, unterminated line.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        decode_line(&rest)
    }
}

fn decode_line(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let line = text.trim();
    if line.is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "{\"type\":\"answer\",\"delta\":\"héllo wörld ✓\"}\n\n  \n{\"type\":\"answer\",\"delta\":\"日本語\"}\r\n{\"type\":\"done\"}";

    fn frame_all(chunks: &[&[u8]]) -> Vec<String> {
        let mut framer = LineFramer::new();
        let mut lines = Vec::new();
        for chunk in chunks {
            lines.extend(framer.push(chunk));
        }
        lines.extend(framer.finish());
        lines
    }

    #[test]
    fn test_single_chunk() {
        let lines = frame_all(&[BODY.as_bytes()]);
        assert_eq!(
            lines,
            vec![
                "{\"type\":\"answer\",\"delta\":\"héllo wörld ✓\"}",
                "{\"type\":\"answer\",\"delta\":\"日本語\"}",
                "{\"type\":\"done\"}",
            ]
        );
    }

    #[test]
    fn test_every_split_point_yields_same_lines() {
        let bytes = BODY.as_bytes();
        let expected = frame_all(&[bytes]);
        for split in 0..=bytes.len() {
            let (a, b) = bytes.split_at(split);
            assert_eq!(frame_all(&[a, b]), expected, "split at byte {split}");
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let bytes = BODY.as_bytes();
        let chunks: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(frame_all(&chunks), frame_all(&[bytes]));
    }

    #[test]
    fn test_incomplete_line_is_carried() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"{\"type\":").is_empty());
        assert_eq!(framer.push(b"\"done\"}\n"), vec!["{\"type\":\"done\"}"]);
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn test_finish_flushes_truncated_record() {
        let mut framer = LineFramer::new();
        framer.push(b"{\"type\":\"answer\",\"delta\":\"x\"}\n{\"type\":\"ans");
        assert_eq!(framer.finish().as_deref(), Some("{\"type\":\"ans"));
    }
}
