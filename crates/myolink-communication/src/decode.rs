//! Sample line framing and decoding
//!
//! The sensor emits one base-10 integer per newline-terminated line.
//! [`LineBuffer`] reassembles complete lines out of arbitrary read
//! chunks; [`decode_line`] turns one line into a [`SignalEvent`].
//!
//! Decode failures are reported to the caller and the line is dropped;
//! they never affect the connection.

use myolink_core::{DecodeError, SignalEvent};

/// Buffers raw reads and emits a line whenever a newline is encountered.
///
/// Carriage returns and surrounding whitespace are left in place here;
/// [`decode_line`] trims them. The buffer preserves any trailing
/// partial line across pushes.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(64),
        }
    }

    /// Append a chunk and return every complete line it finished,
    /// without the newline terminator.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut lines = Vec::new();
        for &b in bytes {
            if b == b'\n' {
                lines.push(std::mem::take(&mut self.buffer));
            } else {
                self.buffer.push(b);
            }
        }
        lines
    }

    /// Discard any buffered partial line.
    ///
    /// Called on reconnect so a torn line from the previous link does
    /// not corrupt the first sample of the new one.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Decode one sample line into an activation event.
pub fn decode_line(line: &[u8]) -> Result<SignalEvent, DecodeError> {
    let text = std::str::from_utf8(line).map_err(|_| DecodeError::InvalidUtf8)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::Empty);
    }
    let sample: i64 = trimmed
        .parse()
        .map_err(|_| DecodeError::InvalidSample {
            text: trimmed.to_string(),
        })?;
    Ok(SignalEvent::from_sample(sample))
}

#[cfg(test)]
mod tests {
    use super::*;
    use myolink_core::ACTIVATION_THRESHOLD;
    use proptest::prelude::*;

    #[test]
    fn test_lines_simple() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(b"50\n150\n");
        assert_eq!(lines, vec![b"50".to_vec(), b"150".to_vec()]);
    }

    #[test]
    fn test_lines_split_across_pushes() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"1").is_empty());
        assert!(buffer.push(b"0").is_empty());
        let lines = buffer.push(b"1\n99\n4");
        assert_eq!(lines, vec![b"101".to_vec(), b"99".to_vec()]);
        let lines = buffer.push(b"2\n");
        assert_eq!(lines, vec![b"42".to_vec()]);
    }

    #[test]
    fn test_clear_discards_partial_line() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"12").is_empty());
        buffer.clear();
        let lines = buffer.push(b"3\n");
        assert_eq!(lines, vec![b"3".to_vec()]);
    }

    #[test]
    fn test_decode_crlf_line() {
        assert_eq!(decode_line(b"150\r"), Ok(SignalEvent::Active));
        assert_eq!(decode_line(b"  42  "), Ok(SignalEvent::Rest));
    }

    #[test]
    fn test_decode_rejects_malformed_lines() {
        assert_eq!(decode_line(b""), Err(DecodeError::Empty));
        assert_eq!(decode_line(b"   \r"), Err(DecodeError::Empty));
        assert_eq!(decode_line(&[0xff, 0xfe]), Err(DecodeError::InvalidUtf8));
        assert!(matches!(
            decode_line(b"12a"),
            Err(DecodeError::InvalidSample { .. })
        ));
        assert!(matches!(
            decode_line(b"1.5"),
            Err(DecodeError::InvalidSample { .. })
        ));
    }

    #[test]
    fn test_malformed_line_does_not_stick() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(b"abc\n150\n");
        assert_eq!(lines.len(), 2);
        assert!(decode_line(&lines[0]).is_err());
        assert_eq!(decode_line(&lines[1]), Ok(SignalEvent::Active));
    }

    proptest! {
        #[test]
        fn prop_decode_matches_threshold(v in any::<i64>()) {
            let line = format!("{}\r", v);
            let event = decode_line(line.as_bytes()).unwrap();
            let expected = if v > ACTIVATION_THRESHOLD {
                SignalEvent::Active
            } else {
                SignalEvent::Rest
            };
            prop_assert_eq!(event, expected);
        }

        #[test]
        fn prop_non_numeric_lines_error(s in "[a-zA-Z !@#]{1,16}") {
            prop_assert!(decode_line(s.as_bytes()).is_err());
        }
    }
}
