/// Incremental `text/event-stream` decoder.
///
/// Bytes go in as they arrive off the wire; the `data` payload of every
/// completed event comes out. Multiple `data:` lines of one event are joined
/// with `\n`. Other fields and `:` comments are skipped.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    data: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n' || *b == b'\r') {
            // A trailing `\r` may be the first half of `\r\n`.
            if self.pending[pos] == b'\r' && pos + 1 == self.pending.len() {
                break;
            }

            let line: Vec<u8> = self.pending.drain(..pos).collect();
            let terminator = if self.pending.starts_with(b"\r\n") { 2 } else { 1 };
            self.pending.drain(..terminator);

            if let Some(data) = self.process_line(&String::from_utf8_lossy(&line)) {
                events.push(data);
            }
        }
        events
    }

    /// Flushes whatever is buffered once the connection has closed.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending.is_empty() {
            let mut line = std::mem::take(&mut self.pending);
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if let Some(data) = self.process_line(&String::from_utf8_lossy(&line)) {
                return Some(data);
            }
        }
        self.data.take()
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.data.take();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.find(':') {
            Some(i) => (&line[..i], &line[i + 1..]),
            None => (line, ""),
        };
        let value = value.strip_prefix(' ').unwrap_or(value);

        if field == "data" {
            match &mut self.data {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            }
        }
        None
    }
}
