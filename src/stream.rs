use serde::Serialize;
use tracing::debug;

use crate::parser::{self, blocks, ParsedState, SectionKind};

/// Something that changed between two consecutive classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    SectionStarted { section: SectionKind },
    SectionClosed { section: SectionKind },
    ActiveChanged { from: SectionKind, to: SectionKind },
}

/// Growing reply buffer. Holds only the text; every view of it is a fresh
/// classification, so chunks can be pushed at any granularity.
#[derive(Debug, Default, Clone)]
pub struct ReplyStream {
    buffer: String,
}

/// Per-kind presence and closed flag, in fixed order.
type Progress = [(bool, bool); 4];

impl ReplyStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ReplyStream {
            buffer: String::with_capacity(capacity),
        }
    }

    /// Append a chunk and report what changed.
    pub fn push(&mut self, chunk: &str) -> Vec<StreamEvent> {
        if chunk.is_empty() {
            return Vec::new();
        }

        let before = progress(&self.buffer);
        self.buffer.push_str(chunk);
        let after = progress(&self.buffer);
        let (active_before, active_after) = (active_of(&before), active_of(&after));

        let mut events = Vec::new();
        for kind in SectionKind::ALL {
            let (was_found, was_closed) = before[kind.index()];
            let (found, closed) = after[kind.index()];
            if found && !was_found {
                events.push(StreamEvent::SectionStarted { section: kind });
            }
            if closed && !was_closed {
                events.push(StreamEvent::SectionClosed { section: kind });
            }
        }
        if active_after != active_before {
            events.push(StreamEvent::ActiveChanged {
                from: active_before,
                to: active_after,
            });
        }

        for event in &events {
            debug!(?event, len = self.buffer.len(), "stream transition");
        }
        events
    }

    pub fn state(&self) -> ParsedState {
        parser::classify(&self.buffer)
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// True once the final section has its closing fence.
    pub fn is_complete(&self) -> bool {
        parser::extract_final_section(&self.buffer).is_some()
    }
}

fn progress(buffer: &str) -> Progress {
    let mut out = [(false, false); 4];
    for block in blocks::scan_blocks(buffer) {
        out[block.kind.index()] = (true, block.closed);
    }
    out
}

/// Same reverse-order rule as `classify`, read off the presence flags.
fn active_of(progress: &Progress) -> SectionKind {
    SectionKind::ALL
        .iter()
        .rev()
        .find(|k| progress[k.index()].0)
        .copied()
        .unwrap_or_else(SectionKind::first)
}

/// Split `text` into chunks of at most `size` chars (never splitting a char).
pub fn split_chunks(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{step_statuses, StepStatus};

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.md", name)).unwrap()
    }

    fn replay(text: &str, size: usize) -> (ReplyStream, Vec<StreamEvent>) {
        let mut stream = ReplyStream::new();
        let mut events = Vec::new();
        for chunk in split_chunks(text, size) {
            events.extend(stream.push(&chunk));
            assert_eq!(stream.state(), parser::classify(stream.buffer()));
        }
        (stream, events)
    }

    #[test]
    fn full_replay_events_in_order() {
        let (stream, events) = replay(&fixture("full_reply"), 7);
        assert!(stream.is_complete());

        let started: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::SectionStarted { section } => Some(*section),
                _ => None,
            })
            .collect();
        assert_eq!(started, SectionKind::ALL.to_vec());

        let closed = events
            .iter()
            .filter(|e| matches!(e, StreamEvent::SectionClosed { .. }))
            .count();
        assert_eq!(closed, 4);

        assert!(events.contains(&StreamEvent::ActiveChanged {
            from: SectionKind::Infra0Schema,
            to: SectionKind::Outro,
        }));
    }

    #[test]
    fn chunk_size_does_not_change_result() {
        let text = fixture("full_reply");
        let (a, _) = replay(&text, 1);
        let (b, _) = replay(&text, 64);
        assert_eq!(a.state(), b.state());
        assert_eq!(a.buffer(), text);
    }

    #[test]
    fn single_push_reports_start_and_close() {
        let mut s = ReplyStream::new();
        let events = s.push("```introduction\nhi\n```");
        assert_eq!(
            events,
            vec![
                StreamEvent::SectionStarted { section: SectionKind::Introduction },
                StreamEvent::SectionClosed { section: SectionKind::Introduction },
            ]
        );
    }

    #[test]
    fn empty_push_is_noop() {
        let mut s = ReplyStream::new();
        assert!(s.push("").is_empty());
        assert!(!s.is_complete());
    }

    #[test]
    fn step_statuses_never_regress() {
        let text = fixture("full_reply");
        let mut stream = ReplyStream::new();
        let mut prev = step_statuses(&stream.state());
        for chunk in split_chunks(&text, 5) {
            stream.push(&chunk);
            let next = step_statuses(&stream.state());
            for (p, n) in prev.iter().zip(next.iter()) {
                assert!(n.1 >= p.1, "{} went from {:?} to {:?}", n.0, p.1, n.1);
            }
            prev = next;
        }
        assert_eq!(prev[3].1, StepStatus::Active);
        assert!(prev[..3].iter().all(|(_, s)| *s == StepStatus::Completed));
    }

    #[test]
    fn partial_reply_not_complete() {
        let (stream, _) = replay(&fixture("partial_schema"), 11);
        assert!(!stream.is_complete());
        assert_eq!(stream.state().active_section, SectionKind::Infra0Schema);
    }

    #[test]
    fn progress_active_agrees_with_classify() {
        let text = fixture("full_reply");
        let mut end = 0;
        while end <= text.len() {
            if text.is_char_boundary(end) {
                let prefix = &text[..end];
                assert_eq!(
                    active_of(&progress(prefix)),
                    parser::classify(prefix).active_section,
                    "diverged at byte {}",
                    end
                );
            }
            end += 1;
        }
        assert_eq!(active_of(&progress("")), SectionKind::Introduction);
    }

    #[test]
    fn split_keeps_multibyte_chars() {
        let chunks = split_chunks("héllo\u{1F600}!", 2);
        assert_eq!(chunks, vec!["hé", "ll", "o\u{1F600}", "!"]);
        assert_eq!(split_chunks("abc", 0), vec!["a", "b", "c"]);
        assert!(split_chunks("", 4).is_empty());
    }

    #[test]
    fn event_json_shape() {
        let e = StreamEvent::ActiveChanged {
            from: SectionKind::Introduction,
            to: SectionKind::PulumiCode,
        };
        let v = serde_json::to_value(e).unwrap();
        assert_eq!(v["event"], "active_changed");
        assert_eq!(v["to"], "pulumi_code");
    }
}
