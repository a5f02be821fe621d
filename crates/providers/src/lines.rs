//! Line splitting for streamed HTTP bodies.
//!
//! Both wire formats we read (Ollama's newline-delimited JSON and SSE) are
//! line oriented, but network chunks can end anywhere, including inside a
//! multi-byte UTF-8 sequence. Bytes are therefore buffered raw and only
//! decoded once a full line is available.

#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a network chunk and return every line it completed.
    ///
    /// Returned lines have the trailing `\n` / `\r\n` removed. Blank lines
    /// are kept because SSE uses them as event separators.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Whatever is left after the body ended without a final newline.
    pub(crate) fn finish(self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.pending).trim().to_string();
        (!rest.is_empty()).then_some(rest)
    }
}
