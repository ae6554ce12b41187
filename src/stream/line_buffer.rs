//! Chunk-to-line accumulation for line-oriented agent output

/// Accumulates raw output chunks into complete lines
///
/// Both `\n` and `\r\n` terminate a line. A trailing fragment without a
/// terminator is held until the next chunk or [`LineBuffer::flush`]. Empty
/// lines produced by consecutive separators are dropped.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: String,
    utf8_tail: Vec<u8>,
}

impl LineBuffer {
    /// Create an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a text chunk and drain every line it completes
    pub fn push_chunk(&mut self, chunk: &str) -> Vec<String> {
        self.pending.push_str(chunk);
        self.drain_lines()
    }

    /// Push raw bytes and drain every line they complete
    ///
    /// A multi-byte UTF-8 sequence split across chunks is held back until it
    /// is complete; invalid sequences decode to U+FFFD.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<String> {
        self.utf8_tail.extend_from_slice(bytes);
        let mut decoded = String::new();

        loop {
            match std::str::from_utf8(&self.utf8_tail) {
                Ok(text) => {
                    decoded.push_str(text);
                    self.utf8_tail.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    decoded.push_str(std::str::from_utf8(&self.utf8_tail[..valid]).unwrap_or_default());
                    match e.error_len() {
                        // Incomplete sequence at the end: wait for more bytes
                        None => {
                            self.utf8_tail.drain(..valid);
                            break;
                        }
                        Some(len) => {
                            decoded.push(char::REPLACEMENT_CHARACTER);
                            self.utf8_tail.drain(..valid + len);
                        }
                    }
                }
            }
        }

        self.push_chunk(&decoded)
    }

    /// Return the trailing unterminated fragment, if any
    ///
    /// Call this when the transport signals completion so a final line
    /// without a newline is not lost. The buffer is empty afterwards.
    pub fn flush(&mut self) -> Option<String> {
        if !self.utf8_tail.is_empty() {
            let tail = String::from_utf8_lossy(&self.utf8_tail).into_owned();
            self.pending.push_str(&tail);
            self.utf8_tail.clear();
        }

        let mut rest = std::mem::take(&mut self.pending);
        if rest.ends_with('\r') {
            rest.pop();
        }
        if rest.is_empty() { None } else { Some(rest) }
    }

    /// Whether nothing is buffered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.utf8_tail.is_empty()
    }

    fn drain_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut start = 0;

        while let Some(offset) = self.pending[start..].find('\n') {
            let end = start + offset;
            let raw = &self.pending[start..end];
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            if !line.is_empty() {
                lines.push(line.to_string());
            }
            start = end + 1;
        }

        self.pending.drain(..start);
        lines
    }
}
