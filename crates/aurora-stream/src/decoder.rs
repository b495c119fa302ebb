//! Incremental UTF-8 decoding for chunked response bodies.
//!
//! Chunk boundaries are chosen by the transport, so a multi-byte character can
//! arrive split across two reads. The decoder holds the incomplete tail of one
//! chunk and completes it with the head of the next.

const REPLACEMENT: char = '\u{FFFD}';
const BOM: char = '\u{FEFF}';

/// Stateful UTF-8 decoder that carries partial sequences between chunks.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    /// Bytes of an incomplete trailing sequence (at most 3).
    pending: Vec<u8>,
    /// Set once any text has been produced; the BOM is only stripped before that.
    started: bool,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, returning all text that is complete so far.
    ///
    /// Invalid sequences are replaced with U+FFFD. An incomplete sequence at
    /// the end of `chunk` is withheld until the next call or [`finish`].
    ///
    /// [`finish`]: Utf8Decoder::finish
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(chunk);

        let mut out = String::with_capacity(input.len());
        let mut rest = input.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    // `valid_up_to` bounds a prefix already checked as UTF-8.
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());

                    match err.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT);
                            rest = &after[len..];
                        }
                        None => {
                            // Truncated sequence at the end of input.
                            self.pending.extend_from_slice(after);
                            break;
                        }
                    }
                }
            }
        }

        self.strip_leading_bom(out)
    }

    /// Flush the decoder at end of stream.
    ///
    /// A dangling partial sequence cannot be completed any more and is
    /// reported as a single U+FFFD rather than dropped.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        self.pending.clear();
        self.strip_leading_bom(REPLACEMENT.to_string())
    }

    /// Whether bytes are being held back waiting for the rest of a character.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn strip_leading_bom(&mut self, text: String) -> String {
        if self.started || text.is_empty() {
            return text;
        }
        self.started = true;
        match text.strip_prefix(BOM) {
            Some(stripped) => stripped.to_string(),
            None => text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ascii_passthrough() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"Hel"), "Hel");
        assert_eq!(decoder.decode(b"lo, "), "lo, ");
        assert_eq!(decoder.decode(b"world!"), "world!");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_two_byte_character_split_across_chunks() {
        // "é" is C3 A9
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"caf\xC3"), "caf");
        assert!(decoder.has_pending());
        assert_eq!(decoder.decode(b"\xA9!"), "é!");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_four_byte_character_split_byte_by_byte() {
        let bytes = "🦀".as_bytes();
        assert_eq!(bytes.len(), 4);

        let mut decoder = Utf8Decoder::new();
        let mut output = String::new();
        for (i, byte) in bytes.iter().enumerate() {
            let text = decoder.decode(std::slice::from_ref(byte));
            if i < 3 {
                assert_eq!(text, "", "no output before the character is complete");
            }
            output.push_str(&text);
        }
        assert_eq!(output, "🦀");
        assert!(!output.contains(REPLACEMENT));
    }

    #[test]
    fn test_invalid_byte_is_replaced_not_dropped() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"a\xFFb"), "a\u{FFFD}b");
    }

    #[test]
    fn test_broken_sequence_followed_by_ascii() {
        // C3 starts a two-byte sequence but '(' is not a continuation byte.
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"\xC3"), "");
        assert_eq!(decoder.decode(b"(ok"), "\u{FFFD}(ok");
    }

    #[test]
    fn test_finish_flushes_dangling_sequence() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"end\xE2\x82"), "end");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_leading_bom_is_stripped_once() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"\xEF\xBB"), "");
        assert_eq!(decoder.decode(b"\xBFhi"), "hi");
        assert_eq!(decoder.decode("\u{FEFF}".as_bytes()), "\u{FEFF}");
    }
}
