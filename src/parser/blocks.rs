use std::sync::LazyLock;

use regex::Regex;

use super::sections::SectionKind;

/// Opening marker, optional whitespace, lazy content, optional whitespace, closing fence.
static CLOSED_RE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    SectionKind::ALL
        .iter()
        .map(|k| Regex::new(&format!(r"(?s){}\s*(.*?)\s*```", regex::escape(&k.marker()))).unwrap())
        .collect()
});

/// Opening marker with no closing fence yet: content runs to end of buffer.
static OPEN_RE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    SectionKind::ALL
        .iter()
        .map(|k| Regex::new(&format!(r"(?s){}\s*(.*)$", regex::escape(&k.marker()))).unwrap())
        .collect()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: SectionKind,
    pub content: String,
    pub closed: bool,
}

/// Locate the fenced block for `kind`. A closed match always wins over an open one.
pub fn find_block(buffer: &str, kind: SectionKind) -> Option<Block> {
    if let Some(content) = capture(&CLOSED_RE[kind.index()], buffer) {
        return Some(Block {
            kind,
            content,
            closed: true,
        });
    }

    capture(&OPEN_RE[kind.index()], buffer).map(|content| Block {
        kind,
        content,
        closed: false,
    })
}

/// Only the closed form; `None` while the block is still streaming.
pub fn find_closed(buffer: &str, kind: SectionKind) -> Option<String> {
    capture(&CLOSED_RE[kind.index()], buffer)
}

/// Every kind that has a block in `buffer`, in fixed order.
pub fn scan_blocks(buffer: &str) -> Vec<Block> {
    SectionKind::ALL
        .iter()
        .filter_map(|k| find_block(buffer, *k))
        .collect()
}

fn capture(re: &Regex, buffer: &str) -> Option<String> {
    re.captures(buffer)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

// ── Tests ──
