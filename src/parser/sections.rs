use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// The four sections a reply is expected to contain, in emission order.
/// Ordering of the variants is significant: it drives the active-section scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SectionKind {
    #[serde(rename = "introduction")]
    Introduction,
    #[serde(rename = "pulumi_code")]
    PulumiCode,
    #[serde(rename = "infra0_schema")]
    Infra0Schema,
    #[serde(rename = "outro")]
    Outro,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [
        SectionKind::Introduction,
        SectionKind::PulumiCode,
        SectionKind::Infra0Schema,
        SectionKind::Outro,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            SectionKind::Introduction => "introduction",
            SectionKind::PulumiCode => "pulumi_code",
            SectionKind::Infra0Schema => "infra0_schema",
            SectionKind::Outro => "outro",
        }
    }

    /// Opening fence for this kind, e.g. "```outro".
    pub fn marker(self) -> String {
        format!("```{}", self.tag())
    }

    pub fn first() -> SectionKind {
        Self::ALL[0]
    }

    pub fn last() -> SectionKind {
        Self::ALL[Self::ALL.len() - 1]
    }

    /// Position in the fixed order (0-based).
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Classification of one buffer. Rebuilt from scratch on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedState {
    pub sections: BTreeMap<SectionKind, String>,
    pub active_section: SectionKind,
}

impl ParsedState {
    /// Build a state from the found sections, deriving the active one.
    pub fn from_sections(sections: BTreeMap<SectionKind, String>) -> Self {
        let active_section = active_section(&sections);
        ParsedState {
            sections,
            active_section,
        }
    }

    pub fn get(&self, kind: SectionKind) -> Option<&str> {
        self.sections.get(&kind).map(String::as_str)
    }

    pub fn contains(&self, kind: SectionKind) -> bool {
        self.sections.contains_key(&kind)
    }
}

/// Last kind in fixed order that was found, scanning outro → introduction.
/// Nothing found defaults to the first kind.
///
/// Out-of-order generator output is not detected here: a stray outro fence
/// makes outro active even if later text belongs to another section.
fn active_section(sections: &BTreeMap<SectionKind, String>) -> SectionKind {
    SectionKind::ALL
        .iter()
        .rev()
        .find(|kind| sections.contains_key(*kind))
        .copied()
        .unwrap_or_else(SectionKind::first)
}

// ── Tests ──
