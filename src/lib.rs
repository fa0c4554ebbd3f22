//! Incremental classifier for streamed infrastructure replies.
//!
//! A reply is a sequence of fenced sections (`introduction`, `pulumi_code`,
//! `infra0_schema`, `outro`). [`classify`] is a pure function of the whole
//! buffer, so it can be re-run on every chunk without carrying parser state.

pub mod parser;
pub mod settings;
pub mod stream;

pub use parser::{
    classify, extract_active_section, extract_final_section, step_statuses, ParsedState,
    SectionKind, StepStatus,
};
pub use stream::{ReplyStream, StreamEvent};
