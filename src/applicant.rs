use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::AgentError;
use crate::hh::{HhError, JobBoard, NegotiationOutcome};
use crate::store::{ApplicationStatus, ApplicationStore, StoreError};

/// What happened to a single vacancy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Application submitted and recorded.
    Applied,
    /// Already on record; no request was sent.
    AlreadyApplied,
    /// The API answered with a non-success status.
    Rejected { status: u16 },
    /// The request never got an answer (network, timeout).
    Failed { reason: String },
    /// Still 401 after refreshing credentials.
    AuthenticationFailed,
}

impl ApplyOutcome {
    /// True only for a fresh, successful application.
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied)
    }
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyOutcome::Applied => write!(f, "applied"),
            ApplyOutcome::AlreadyApplied => write!(f, "already applied"),
            ApplyOutcome::Rejected { status } => write!(f, "rejected (HTTP {status})"),
            ApplyOutcome::Failed { reason } => write!(f, "failed: {reason}"),
            ApplyOutcome::AuthenticationFailed => write!(f, "authentication failed"),
        }
    }
}

/// Submits applications, at most once per vacancy.
pub struct Applicant<B> {
    board: Arc<B>,
    store: ApplicationStore,
}

impl<B: JobBoard> Applicant<B> {
    pub fn new(board: Arc<B>, store: ApplicationStore) -> Self {
        Self { board, store }
    }

    /// Applies to `vacancy_id` unless it is already on record.
    ///
    /// Exactly one row is written on success and none on any other path.
    /// Only storage failures are returned as errors; API problems become an
    /// [`ApplyOutcome`].
    pub async fn apply(&self, vacancy_id: &str) -> Result<ApplyOutcome, AgentError> {
        if self.store.is_applied(vacancy_id).await? {
            info!(vacancy_id, "already applied, skipping");
            return Ok(ApplyOutcome::AlreadyApplied);
        }

        let outcome = match self.board.create_negotiation(vacancy_id).await {
            Ok(outcome) => outcome,
            Err(HhError::AuthenticationFailed) => return Ok(ApplyOutcome::AuthenticationFailed),
            Err(e) => {
                error!(vacancy_id, error = %e, "application request failed");
                return Ok(ApplyOutcome::Failed {
                    reason: e.to_string(),
                });
            }
        };

        match outcome {
            NegotiationOutcome::Created => {
                // Company identity is not resolved here.
                match self
                    .store
                    .record_application(vacancy_id, "", ApplicationStatus::Applied)
                    .await
                {
                    Ok(()) => {
                        info!(vacancy_id, "application submitted");
                        Ok(ApplyOutcome::Applied)
                    }
                    Err(StoreError::Duplicate(_)) => {
                        warn!(vacancy_id, "application recorded concurrently by another run");
                        Ok(ApplyOutcome::AlreadyApplied)
                    }
                    Err(e) => Err(e.into()),
                }
            }
            NegotiationOutcome::Rejected { status, .. } => Ok(ApplyOutcome::Rejected { status }),
        }
    }
}
