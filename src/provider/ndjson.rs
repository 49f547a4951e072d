//! Newline-delimited JSON chunk decoding.

use crate::error::ParleyError;
use crate::types::ChatChunk;

/// Incremental decoder for an NDJSON chunk stream.
///
/// Bytes are buffered until a full line is available, so a transport chunk
/// boundary may fall anywhere, including inside a multi-byte character.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known to hold no newline.
    scanned: usize,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning every chunk completed by them, in order.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<ChatChunk, ParleyError>> {
        self.buffer.extend_from_slice(bytes);
        let mut decoded = Vec::new();
        while let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
            let line_end = self.scanned + offset;
            let line: Vec<u8> = self.buffer.drain(..=line_end).collect();
            self.scanned = 0;
            if let Some(item) = decode_line(&line[..line.len() - 1]) {
                decoded.push(item);
            }
        }
        self.scanned = self.buffer.len();
        decoded
    }

    /// Decode whatever unterminated line remains once the stream has ended.
    pub fn finish(&mut self) -> Option<Result<ChatChunk, ParleyError>> {
        let rest = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        decode_line(&rest)
    }

    /// Bytes still waiting for a line terminator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Decode one line. Blank lines yield nothing; an error-flagged chunk is a
/// protocol failure even when `done` is false.
pub fn decode_line(line: &[u8]) -> Option<Result<ChatChunk, ParleyError>> {
    let text = String::from_utf8_lossy(line);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let chunk = match serde_json::from_str::<ChatChunk>(trimmed) {
        Ok(chunk) => chunk,
        Err(e) => return Some(Err(ParleyError::Protocol(format!("malformed chunk: {e}")))),
    };
    if let Some(error) = chunk.error() {
        return Some(Err(ParleyError::Protocol(error.to_string())));
    }
    Some(Ok(chunk))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(items: &[Result<ChatChunk, ParleyError>]) -> String {
        items
            .iter()
            .filter_map(|item| item.as_ref().ok())
            .filter_map(|chunk| chunk.content())
            .collect()
    }

    #[test]
    fn reassembles_object_split_across_pushes() {
        let mut decoder = NdjsonDecoder::new();
        let first = decoder.push(br#"{"message":{"role":"assistant","con"#);
        assert!(first.is_empty());
        let second = decoder.push(b"tent\":\"hi\"},\"done\":false}\n");
        assert_eq!(contents(&second), "hi");
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn splits_several_lines_in_one_push() {
        let mut decoder = NdjsonDecoder::new();
        let items = decoder.push(
            b"{\"message\":{\"content\":\"a\"},\"done\":false}\n\n{\"message\":{\"content\":\"b\"},\"done\":true}\n",
        );
        assert_eq!(items.len(), 2);
        assert_eq!(contents(&items), "ab");
    }

    #[test]
    fn trailing_unterminated_line_is_decoded_on_finish() {
        let mut decoder = NdjsonDecoder::new();
        assert!(decoder.push(br#"{"done":true}"#).is_empty());
        let last = decoder.finish().unwrap().unwrap();
        assert!(last.done);
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn multibyte_character_split_across_pushes_survives() {
        let line = "{\"message\":{\"content\":\"héllo\"},\"done\":false}\n";
        let bytes = line.as_bytes();
        let split = line.find('é').unwrap() + 1;
        let mut decoder = NdjsonDecoder::new();
        assert!(decoder.push(&bytes[..split]).is_empty());
        let items = decoder.push(&bytes[split..]);
        assert_eq!(contents(&items), "héllo");
    }

    #[test]
    fn every_pair_of_split_points_yields_the_same_text() {
        let body = "{\"message\":{\"content\":\"né\"},\"done\":false}\n\
                    {\"message\":{\"content\":\"ö!\"},\"done\":false}\n\
                    {\"done\":true}";
        let bytes = body.as_bytes();
        for first in 0..=bytes.len() {
            for second in first..=bytes.len() {
                let mut decoder = NdjsonDecoder::new();
                let mut items = decoder.push(&bytes[..first]);
                items.extend(decoder.push(&bytes[first..second]));
                items.extend(decoder.push(&bytes[second..]));
                items.extend(decoder.finish());

                assert_eq!(items.len(), 3, "split at {first}/{second}");
                assert!(items.iter().all(Result::is_ok), "split at {first}/{second}");
                assert_eq!(contents(&items), "néö!", "split at {first}/{second}");
            }
        }
    }

    #[test]
    fn long_line_in_small_pieces_is_decoded_once() {
        let text = "x".repeat(5_000);
        let line = format!("{{\"message\":{{\"content\":\"{text}\"}},\"done\":false}}\n");
        let mut decoder = NdjsonDecoder::new();
        let mut items = Vec::new();
        for piece in line.as_bytes().chunks(7) {
            items.extend(decoder.push(piece));
        }
        assert_eq!(items.len(), 1);
        assert_eq!(contents(&items), text);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn error_field_fails_even_when_not_done() {
        let item = decode_line(br#"{"error":"model crashed","done":false}"#).unwrap();
        match item {
            Err(ParleyError::Protocol(message)) => assert_eq!(message, "model crashed"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn malformed_line_is_protocol_error() {
        let item = decode_line(b"{not json").unwrap();
        assert!(matches!(item, Err(ParleyError::Protocol(_))));
    }
}
