use serde::Serialize;

use super::sections::{ParsedState, SectionKind};

/// Progress of one workflow step as shown in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Active,
    Completed,
}

impl StepStatus {
    pub fn label(self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Active => "active",
            StepStatus::Completed => "completed",
        }
    }
}

/// A step is completed once its section exists and a later section has
/// started; active if it is the active section; pending otherwise.
pub fn step_status(state: &ParsedState, kind: SectionKind) -> StepStatus {
    let later_started = SectionKind::ALL
        .iter()
        .filter(|k| **k > kind)
        .any(|k| state.contains(*k) || *k == state.active_section);

    if state.contains(kind) && later_started {
        StepStatus::Completed
    } else if kind == state.active_section {
        StepStatus::Active
    } else {
        StepStatus::Pending
    }
}

pub fn step_statuses(state: &ParsedState) -> [(SectionKind, StepStatus); 4] {
    SectionKind::ALL.map(|k| (k, step_status(state, k)))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::classify;

    fn statuses(buf: &str) -> Vec<StepStatus> {
        step_statuses(&classify(buf)).iter().map(|(_, s)| *s).collect()
    }

    #[test]
    fn empty_buffer_introduction_active() {
        use StepStatus::*;
        assert_eq!(statuses(""), vec![Active, Pending, Pending, Pending]);
    }

    #[test]
    fn code_streaming() {
        use StepStatus::*;
        let buf = "```introduction\nHi\n```\n\n```pulumi_code\nconst a";
        assert_eq!(statuses(buf), vec![Completed, Active, Pending, Pending]);
    }

    #[test]
    fn all_sections_closed() {
        use StepStatus::*;
        let buf = "```introduction\na\n```\n```pulumi_code\nb\n```\n```infra0_schema\n{}\n```\n```outro\nc\n```";
        assert_eq!(statuses(buf), vec![Completed, Completed, Completed, Active]);
    }

    #[test]
    fn skipped_section_stays_pending() {
        use StepStatus::*;
        let buf = "```introduction\na\n```\n```infra0_schema\n{";
        assert_eq!(statuses(buf), vec![Completed, Pending, Active, Pending]);
    }

    #[test]
    fn labels() {
        assert_eq!(StepStatus::Completed.label(), "completed");
        assert_eq!(
            serde_json::to_string(&StepStatus::Pending).unwrap(),
            "\"pending\""
        );
    }
}
