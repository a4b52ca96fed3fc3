//! Per-resource lifecycle transition tables.
//!
//! Status fields are tagged enums and every permitted transition is
//! enumerated here; anything absent from the table is rejected. Approved
//! and rejected are terminal for hours and suggestions. The blog publish
//! flag is the one bidirectional transition in the model.

use thiserror::Error;

use crate::models::{ReviewStatus, SuggestionStatus};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Cannot transition from '{from}' to '{to}'.")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("A rejection reason is required.")]
    MissingReason,
    #[error("Unknown review action '{0}'.")]
    UnknownAction(String),
}

/// The `{action, rejection_reason}` body of a review request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewAction {
    Approve,
    Reject { reason: String },
}

impl ReviewAction {
    /// Builds the action from the raw request fields, insisting on a
    /// non-empty reason for rejections.
    pub fn from_request(action: &str, rejection_reason: Option<&str>) -> Result<Self, WorkflowError> {
        match action {
            "approve" => Ok(ReviewAction::Approve),
            "reject" => {
                let reason = rejection_reason.map(str::trim).unwrap_or("");
                if reason.is_empty() {
                    Err(WorkflowError::MissingReason)
                } else {
                    Ok(ReviewAction::Reject {
                        reason: reason.to_string(),
                    })
                }
            }
            other => Err(WorkflowError::UnknownAction(other.to_string())),
        }
    }

    pub fn target_status(&self) -> ReviewStatus {
        match self {
            ReviewAction::Approve => ReviewStatus::Approved,
            ReviewAction::Reject { .. } => ReviewStatus::Rejected,
        }
    }
}

/// `pending -> approved | rejected`; both outcomes are terminal.
pub fn review_transition(
    current: ReviewStatus,
    action: &ReviewAction,
) -> Result<ReviewStatus, WorkflowError> {
    let next = action.target_status();
    match current {
        ReviewStatus::Pending => Ok(next),
        ReviewStatus::Approved | ReviewStatus::Rejected => Err(WorkflowError::InvalidTransition {
            from: current.as_str(),
            to: next.as_str(),
        }),
    }
}

/// One-shot suggestion review: `pending -> under-review | approved |
/// rejected`. No further transitions are modeled.
pub fn suggestion_transition(
    current: SuggestionStatus,
    next: SuggestionStatus,
) -> Result<SuggestionStatus, WorkflowError> {
    match (current, next) {
        (
            SuggestionStatus::Pending,
            SuggestionStatus::UnderReview | SuggestionStatus::Approved | SuggestionStatus::Rejected,
        ) => Ok(next),
        _ => Err(WorkflowError::InvalidTransition {
            from: current.as_str(),
            to: next.as_str(),
        }),
    }
}
