/// Incremental line reassembly for chunked response bodies.
///
/// Bytes arrive at arbitrary boundaries; this reader decodes them as UTF-8
/// (carrying incomplete multi-byte sequences across feeds, substituting
/// U+FFFD for invalid ones), accumulates the decoded text, and yields
/// complete newline-terminated lines. The trailing unterminated segment is
/// always held back until more bytes confirm its completion, so a logical
/// line is never truncated at a chunk boundary.
use memchr::memchr_iter;

const COMPACT_THRESHOLD: usize = 8 * 1024;

/// Stateful byte-to-line reader for one streaming response.
pub struct LineReader {
    buffer: String,
    read_offset: usize,
    /// Bytes of an incomplete UTF-8 sequence left over from the previous feed.
    remainder: Vec<u8>,
}

impl LineReader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            read_offset: 0,
            remainder: Vec::new(),
        }
    }

    /// Feed raw bytes and return any complete lines.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut out = Vec::new();
        self.feed_into(chunk, &mut out);
        out
    }

    /// Feed raw bytes and append complete lines into a caller-provided buffer.
    ///
    /// Lines are CR-stripped and emitted in byte order. The final segment of
    /// the internal buffer (possibly empty, possibly an unterminated partial
    /// line) is retained, never emitted. Invalid UTF-8 sequences decode to
    /// U+FFFD and never block later bytes; only a genuinely incomplete
    /// trailing sequence waits for the next feed.
    pub fn feed_into(&mut self, chunk: &[u8], out: &mut Vec<String>) {
        if self.remainder.is_empty() {
            self.decode_into(chunk, out);
            return;
        }
        let mut pending = std::mem::take(&mut self.remainder);
        pending.extend_from_slice(chunk);
        self.decode_into(&pending, out);
    }

    fn decode_into(&mut self, mut bytes: &[u8], out: &mut Vec<String>) {
        loop {
            match std::str::from_utf8(bytes) {
                Ok(text) => {
                    self.feed_text(text, out);
                    return;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    if valid_up_to > 0 {
                        // Safety: valid_up_to is guaranteed to be a valid UTF-8 boundary.
                        let text = unsafe { std::str::from_utf8_unchecked(&bytes[..valid_up_to]) };
                        self.feed_text(text, out);
                    }
                    bytes = &bytes[valid_up_to..];
                    match e.error_len() {
                        // Invalid sequence: substitute and keep decoding.
                        Some(bad_len) => {
                            tracing::debug!(
                                invalid_bytes = bad_len,
                                "replacing invalid UTF-8 sequence"
                            );
                            self.feed_text("\u{FFFD}", out);
                            bytes = &bytes[bad_len..];
                        }
                        // Incomplete trailing sequence: wait for more bytes.
                        None => {
                            self.remainder.extend_from_slice(bytes);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// End-of-stream flush: discard any retained partial fragment.
    ///
    /// A feed that ends mid-line silently drops that last partial line; it is
    /// neither forwarded nor an error.
    pub fn finish(&mut self) {
        let pending = self.buffer.len() - self.read_offset;
        if pending > 0 || !self.remainder.is_empty() {
            tracing::debug!(
                pending_bytes = pending,
                undecoded_bytes = self.remainder.len(),
                "dropping unterminated trailing fragment at end of stream"
            );
        }
        self.buffer.clear();
        self.read_offset = 0;
        self.remainder.clear();
    }

    /// Number of buffered bytes not yet resolved into a complete line.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buffer.len() - self.read_offset
    }

    fn feed_text(&mut self, text: &str, out: &mut Vec<String>) {
        self.buffer.push_str(text);
        let mut processed_up_to = self.read_offset;
        let scan_start = processed_up_to;
        let bytes = self.buffer.as_bytes();
        for rel_pos in memchr_iter(b'\n', &bytes[scan_start..]) {
            let line_end = scan_start + rel_pos;
            let mut line = &self.buffer[processed_up_to..line_end];
            if let Some(stripped) = line.strip_suffix('\r') {
                line = stripped;
            }
            out.push(line.to_string());
            processed_up_to = line_end + 1;
        }

        self.read_offset = processed_up_to;
        if self.read_offset == self.buffer.len() {
            self.buffer.clear();
            self.read_offset = 0;
            return;
        }
        let should_compact = self.read_offset > 0
            && (self.read_offset >= self.buffer.len() / 2 || self.read_offset >= COMPACT_THRESHOLD);
        if should_compact {
            self.buffer.drain(..self.read_offset);
            self.read_offset = 0;
        }
    }
}

impl Default for LineReader {
    fn default() -> Self {
        Self::new()
    }
}
