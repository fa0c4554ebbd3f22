pub mod blocks;
pub mod sections;
pub mod steps;

use std::collections::BTreeMap;

pub use blocks::{find_block, Block};
pub use sections::{ParsedState, SectionKind};
pub use steps::{step_status, step_statuses, StepStatus};

/// Classify the full reply buffer: fenced blocks → sections → active section.
/// Pure; safe to call on every incoming chunk.
pub fn classify(buffer: &str) -> ParsedState {
    let sections: BTreeMap<SectionKind, String> = blocks::scan_blocks(buffer)
        .into_iter()
        .map(|b| (b.kind, b.content))
        .collect();
    ParsedState::from_sections(sections)
}

/// Closed outro content, or `None` until generation has finished it.
pub fn extract_final_section(buffer: &str) -> Option<String> {
    blocks::find_closed(buffer, SectionKind::last())
}

/// Content of whichever section is currently active, open or closed.
pub fn extract_active_section(buffer: &str) -> Option<String> {
    let mut state = classify(buffer);
    state.sections.remove(&state.active_section)
}

// ── Tests ──
