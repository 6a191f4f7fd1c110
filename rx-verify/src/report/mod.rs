//! Safety Reports
//!
//! Assembly of the immutable [`SafetyReport`] and its plain-text rendering.

pub mod types;
pub mod assembler;
pub mod text;

pub use assembler::{ReportAssembler, ReportParts};
pub use text::TextRenderer;
pub use types::{RejectedMention, RiskLevel, SafetyReport, SeveritySummary};
