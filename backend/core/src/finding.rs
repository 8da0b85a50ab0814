//! EN 301 549 Clause 7 findings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Pass,
    Fail,
    NeedsReview,
    NotApplicable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
}

/// One evaluated rule of the Clause 7 table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingFinding {
    pub clause_id: String,
    pub clause_title: String,
    pub status: ComplianceStatus,
    pub description: String,
    pub evidence: String,
    pub severity: Severity,
}

/// Status tally over a findings list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingSummary {
    pub passed: usize,
    pub failed: usize,
    pub needs_review: usize,
    pub not_applicable: usize,
    pub critical_failures: usize,
}

impl FindingSummary {
    pub fn from_findings(findings: &[StreamingFinding]) -> Self {
        let mut summary = Self::default();
        for f in findings {
            match f.status {
                ComplianceStatus::Pass => summary.passed += 1,
                ComplianceStatus::Fail => {
                    summary.failed += 1;
                    if f.severity == Severity::Critical {
                        summary.critical_failures += 1;
                    }
                }
                ComplianceStatus::NeedsReview => summary.needs_review += 1,
                ComplianceStatus::NotApplicable => summary.not_applicable += 1,
            }
        }
        summary
    }

    pub fn has_critical_failures(&self) -> bool {
        self.critical_failures > 0
    }
}
