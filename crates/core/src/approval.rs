//! Pending-approval batch types and the approval wire contract.
//!
//! When the backend pauses in `awaiting_approval`, the console fetches a
//! batch of [`DuplicatePair`]s for human review. Each pair is resolved
//! individually; the batch as a whole is done when the local set empties.

use serde::{Deserialize, Serialize};

use crate::types::JobId;

/// Minimal contact record attached to a duplicate pair.
///
/// The backend is inconsistent about field casing (`Id` vs `id`), so
/// aliases accept both forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSummary {
    #[serde(alias = "Id")]
    pub id: String,
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Email", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, alias = "Account", skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountRef>,
}

/// Account reference nested inside a contact record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRef {
    #[serde(alias = "Name")]
    pub name: String,
}

/// Two contact records the backend believes may be the same entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicatePair {
    pub pair_id: String,
    #[serde(default)]
    pub account_name: Option<String>,
    /// Backend confidence label, e.g. `"high"`.
    pub confidence: String,
    /// LLM reasoning for why these two records match.
    pub reasoning: String,
    /// The name the backend proposes to keep.
    pub canonical_name: String,
    pub contact_1: ContactSummary,
    pub contact_2: ContactSummary,
}

/// Backend stage that produced the pending batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStage {
    DuplicateMarking,
    SalesforceUpdate,
}

/// Response of `GET /api/dedup/pending/{job_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PendingBatch {
    pub job_id: JobId,
    pub stage: ApprovalStage,
    pub total_updates: u32,
    #[serde(default)]
    pub duplicate_pairs: Vec<DuplicatePair>,
    #[serde(default)]
    pub message: String,
}

/// A user decision on a single duplicate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    Approve,
    Reject,
    Skip,
}

impl ApprovalAction {
    /// Map the action to the backend's `(approved, rejected_pairs)` shape.
    ///
    /// The observed contract: approve sends `approved=true`; reject sends
    /// `approved=false` with the pair id in `rejected_pairs`; skip sends
    /// `approved=false` with an empty list, which the backend cannot
    /// distinguish from "no decision yet".
    pub fn wire(self, pair_id: &str) -> (bool, Vec<String>) {
        match self {
            Self::Approve => (true, Vec::new()),
            Self::Reject => (false, vec![pair_id.to_string()]),
            Self::Skip => (false, Vec::new()),
        }
    }

    /// Past-tense verb for activity messages.
    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Approve => "approved",
            Self::Reject => "rejected",
            Self::Skip => "skipped",
        }
    }

    /// Single-character marker prefixed to activity messages.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Approve => "✓",
            Self::Reject => "✗",
            Self::Skip => "→",
        }
    }
}

/// Request body for `POST /api/dedup/approve`.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalRequest {
    pub job_id: JobId,
    pub approved: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected_pairs: Vec<String>,
}

impl ApprovalRequest {
    pub fn new(job_id: impl Into<JobId>, pair_id: &str, action: ApprovalAction) -> Self {
        let (approved, rejected_pairs) = action.wire(pair_id);
        Self {
            job_id: job_id.into(),
            approved,
            rejected_pairs,
        }
    }
}
