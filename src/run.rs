use tracing::{error, info};

use crate::diff::{self, Diff};
use crate::error::RunError;
use crate::fetch::PageFetcher;
use crate::menu::{self, Projection};
use crate::notify::compose::compose;
use crate::notify::{Delivery, Notifier};
use crate::parser;
use crate::store::SnapshotStore;

/// What happened to the change notification in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Nothing changed, nothing sent.
    Skipped,
    Delivered,
    /// Transport not configured; payload logged only.
    Degraded,
    /// Delivery failed; the snapshot was still saved.
    Failed(String),
}

#[derive(Debug)]
pub struct RunReport {
    pub items: usize,
    pub diff: Diff,
    pub notified: NotifyOutcome,
}

/// One fetch → extract → project → load → diff → notify → save pass.
pub struct Pipeline<'a, F, N> {
    pub fetcher: &'a F,
    pub notifier: &'a N,
    pub store: &'a SnapshotStore,
    pub page_url: &'a str,
    pub projection: &'a Projection,
}

impl<F: PageFetcher, N: Notifier> Pipeline<'_, F, N> {
    /// Fetch, extraction and store failures abort the run before anything is
    /// saved. A notification failure does not: the current snapshot is saved
    /// whether or not anything changed or was delivered.
    pub async fn run_once(&self) -> Result<RunReport, RunError> {
        let html = self.fetcher.fetch(self.page_url).await?;
        let state = parser::extract_state(&html)?;
        let current = menu::project(&state, self.projection);
        info!(items = current.len(), category = %self.projection.category, "extracted menu");

        let previous = self.store.load()?;
        let changes = diff::diff(&previous, &current);

        let notified = if changes.is_empty() {
            info!("no menu changes detected");
            NotifyOutcome::Skipped
        } else {
            info!(
                added = changes.added.len(),
                removed = changes.removed.len(),
                "menu changes detected"
            );
            let notification = compose(&changes.added, &changes.removed);
            match self.notifier.notify(&notification).await {
                Ok(Delivery::Delivered) => NotifyOutcome::Delivered,
                Ok(Delivery::Degraded) => NotifyOutcome::Degraded,
                Err(e) => {
                    error!(error = %e, "failed to send notification, saving snapshot anyway");
                    NotifyOutcome::Failed(e.to_string())
                }
            }
        };

        self.store.save(&current)?;

        Ok(RunReport {
            items: current.len(),
            diff: changes,
            notified,
        })
    }
}
