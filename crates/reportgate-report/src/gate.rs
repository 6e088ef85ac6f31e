//! Publish gate: decides whether a freshly rendered report is worth persisting.
//!
//! Two renders of the same data differ only in their generation-timestamp
//! line. That line is removed before comparing, so a rerun with no new data
//! never produces a commit.

use sha2::{Digest, Sha256};

use crate::render::GENERATED_PREFIX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishReason {
    /// No report has been persisted yet.
    NoPriorReport,
    ContentDiffers,
    Unchanged,
}

impl std::fmt::Display for PublishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishReason::NoPriorReport => write!(f, "no prior report"),
            PublishReason::ContentDiffers => write!(f, "content differs"),
            PublishReason::Unchanged => write!(f, "unchanged"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishDecision {
    pub changed: bool,
    pub reason: PublishReason,
    /// Hex SHA-256 of the new report's comparable content.
    pub digest: String,
}

/// Compares `new_report` with the last persisted report.
#[must_use]
pub fn decide(new_report: &str, previous_report: Option<&str>) -> PublishDecision {
    let new_content = comparable_content(new_report);
    let digest = format!("{:x}", Sha256::digest(new_content.as_bytes()));

    let Some(previous) = previous_report else {
        return PublishDecision {
            changed: true,
            reason: PublishReason::NoPriorReport,
            digest,
        };
    };

    if comparable_content(previous) == new_content {
        PublishDecision {
            changed: false,
            reason: PublishReason::Unchanged,
            digest,
        }
    } else {
        PublishDecision {
            changed: true,
            reason: PublishReason::ContentDiffers,
            digest,
        }
    }
}

/// Report text with CRLF folded to LF and the generation-timestamp line removed.
#[must_use]
pub fn comparable_content(report: &str) -> String {
    let normalized = report.replace("\r\n", "\n");
    let mut out = String::with_capacity(normalized.len());
    for line in normalized.split_inclusive('\n') {
        if line.trim_start().starts_with(GENERATED_PREFIX) {
            continue;
        }
        out.push_str(line);
    }
    out
}
