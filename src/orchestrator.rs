use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::applicant::{Applicant, ApplyOutcome};
use crate::error::AgentError;
use crate::hh::{JobBoard, Vacancy};
use crate::store::ApplicationStore;

/// Counts for one search-and-apply run.
///
/// Vacancies that were already on record are reported in `skipped_count`
/// and are neither applied nor failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTally {
    pub run_id: Uuid,
    pub applied_count: u32,
    pub failed_count: u32,
    pub skipped_count: u32,
    /// The run stopped early because HH kept rejecting the credentials.
    pub auth_failed: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunTally {
    fn start() -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            applied_count: 0,
            failed_count: 0,
            skipped_count: 0,
            auth_failed: false,
            started_at: now,
            finished_at: now,
        }
    }

    fn record(&mut self, outcome: &ApplyOutcome) {
        match outcome {
            ApplyOutcome::Applied => self.applied_count += 1,
            ApplyOutcome::AlreadyApplied => self.skipped_count += 1,
            ApplyOutcome::AuthenticationFailed => {
                self.failed_count += 1;
                self.auth_failed = true;
            }
            ApplyOutcome::Rejected { .. } | ApplyOutcome::Failed { .. } => self.failed_count += 1,
        }
    }

    /// Two-line applied/failed summary shown to the user.
    pub fn summary(&self) -> String {
        let mut text = format!(
            "✅ Успешно отправлено: {}\n❌ Ошибок при отправке: {}",
            self.applied_count, self.failed_count
        );
        if self.auth_failed {
            text.push_str("\n⚠️ Авторизация HH не удалась, поиск остановлен");
        }
        text
    }
}

/// Observes a run as it progresses. Every method defaults to a no-op.
pub trait RunReporter: Send + Sync {
    fn fetched(&self, _count: usize) {}
    fn finished_item(&self, _vacancy: &Vacancy, _outcome: &ApplyOutcome) {}
}

/// Reporter that ignores every event.
pub struct SilentReporter;

impl RunReporter for SilentReporter {}

/// Drives fetch → apply → tally, one vacancy at a time.
pub struct ApplyOrchestrator<B> {
    board: Arc<B>,
    applicant: Applicant<B>,
    delay: Duration,
    gate: Mutex<()>,
}

impl<B: JobBoard> ApplyOrchestrator<B> {
    /// `delay` is the pause between consecutive applications.
    pub fn new(board: Arc<B>, store: ApplicationStore, delay: Duration) -> Self {
        Self {
            applicant: Applicant::new(board.clone(), store),
            board,
            delay,
            gate: Mutex::new(()),
        }
    }

    /// Runs the whole workflow once and returns the tally.
    ///
    /// Only one run may be active per orchestrator; an overlapping call
    /// fails immediately with [`AgentError::RunInProgress`].
    pub async fn run_search_and_apply(
        &self,
        reporter: &dyn RunReporter,
    ) -> Result<RunTally, AgentError> {
        let Ok(_running) = self.gate.try_lock() else {
            warn!("search requested while another run is active");
            return Err(AgentError::RunInProgress);
        };

        let mut tally = RunTally::start();
        let span = info_span!("run", run_id = %tally.run_id);
        self.run(&mut tally, reporter).instrument(span).await?;
        tally.finished_at = Utc::now();
        Ok(tally)
    }

    /// Applies to each fetched vacancy in listing order.
    ///
    /// The pause is only taken between items that sent a request: a vacancy
    /// already on record and the last item of the listing are not followed
    /// by a delay, so a run over duplicates finishes immediately.
    async fn run(&self, tally: &mut RunTally, reporter: &dyn RunReporter) -> Result<(), AgentError> {
        let vacancies = self.board.fetch_vacancies().await?;
        info!(count = vacancies.len(), "fetched vacancies");
        reporter.fetched(vacancies.len());

        let mut iter = vacancies.iter().peekable();
        while let Some(vacancy) = iter.next() {
            let outcome = self.applicant.apply(&vacancy.id).await?;
            tally.record(&outcome);
            reporter.finished_item(vacancy, &outcome);

            if tally.auth_failed {
                warn!(vacancy_id = %vacancy.id, "stopping run: HH credentials rejected");
                break;
            }
            // Duplicates never reach the API, so they don't need throttling.
            if outcome != ApplyOutcome::AlreadyApplied && iter.peek().is_some() {
                sleep(self.delay).await;
            }
        }

        info!(
            applied = tally.applied_count,
            failed = tally.failed_count,
            skipped = tally.skipped_count,
            "run finished"
        );
        Ok(())
    }
}
