//! Minimal Server-Sent Events framing: split a byte stream on blank lines
//! and pull out the `event`/`data`/`id` fields MCP cares about.

/// One parsed SSE event. Multiple `data:` lines are joined with `\n`, per
/// the SSE spec.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseEvent {
    /// The `event:` field, or `None` for an unnamed (`message`) event.
    pub event: Option<String>,
    /// The joined `data:` field lines.
    pub data: String,
    /// The `id:` field, used for `Last-Event-ID` resumption.
    pub id: Option<String>,
}

/// Incrementally feeds SSE bytes and yields complete events as they close
/// on a blank line. Holds the unterminated remainder between calls.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    /// A fresh decoder with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of bytes and drain every complete event it closes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find("\n\n") {
            let raw = self.buffer[..pos].to_string();
            self.buffer.drain(..pos + 2);
            if let Some(event) = parse_event(&raw) {
                events.push(event);
            }
        }
        events
    }
}

fn parse_event(raw: &str) -> Option<SseEvent> {
    let mut event = SseEvent::default();
    let mut data_lines = Vec::new();

    for line in raw.lines() {
        if line.is_empty() {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        match field {
            "event" => event.event = Some(value.to_string()),
            "data" => data_lines.push(value.to_string()),
            "id" => event.id = Some(value.to_string()),
            _ => {}
        }
    }

    if data_lines.is_empty() && event.event.is_none() && event.id.is_none() {
        return None;
    }
    event.data = data_lines.join("\n");
    Some(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_single_named_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"event: endpoint\ndata: /mcp/session\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("endpoint"));
        assert_eq!(events[0].data, "/mcp/session");
    }

    #[test]
    fn joins_multiple_data_lines() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: line one\ndata: line two\n\n");
        assert_eq!(events[0].data, "line one\nline two");
    }

    #[test]
    fn holds_partial_events_across_feeds() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: par").is_empty());
        let events = decoder.feed(b"tial\n\n");
        assert_eq!(events[0].data, "partial");
    }

    #[test]
    fn records_the_event_id() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"id: 42\ndata: hi\n\n");
        assert_eq!(events[0].id.as_deref(), Some("42"));
    }
}
