//! Ingestion controller
//!
//! Owns the dual-mode report input and the session state machine, submits
//! the selected source to the backend, and hands fetched payloads to the
//! visualization store. The backend associates the most recent upload with
//! the subsequent fetch, so at most one upload/fetch sequence may be in
//! flight at a time; a second submit is refused, not queued. Every
//! continuation after an await re-checks the session generation so a
//! sequence superseded by a reset can never overwrite newer state.

use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::backend::BackendClient;
use crate::session::{IngestError, IngestSession, SessionState};
use crate::visualizations::{LoadError, VisualizationStore};

/// Drives ingestion sessions against the analytics backend.
///
/// Clones share the same session and store, so the presentation layer can
/// hold a handle while submissions run.
#[derive(Clone)]
pub struct IngestController {
    backend: BackendClient,
    store: VisualizationStore,
    session: Arc<RwLock<IngestSession>>,
}

impl IngestController {
    pub fn new(backend: BackendClient) -> Self {
        Self {
            backend,
            store: VisualizationStore::new(),
            session: Arc::new(RwLock::new(IngestSession::new())),
        }
    }

    /// Handle for reading decoded visualizations.
    pub fn store(&self) -> VisualizationStore {
        self.store.clone()
    }

    /// Current session lifecycle state.
    pub async fn state(&self) -> SessionState {
        self.session.read().await.state.clone()
    }

    /// Snapshot of the full session record.
    pub async fn session(&self) -> IngestSession {
        self.session.read().await.clone()
    }

    /// Select file mode, replacing any URL selection.
    pub async fn select_file(&self, file_name: &str, media_type: &str, bytes: Vec<u8>) {
        self.session
            .write()
            .await
            .select_file(file_name, media_type, bytes);
    }

    /// Select URL mode, replacing any file selection.
    pub async fn select_url(&self, url: &str) -> Result<(), IngestError> {
        self.session.write().await.select_url(url)
    }

    /// Clear the session and view model; any in-flight sequence is
    /// superseded and its completion discarded.
    pub async fn reset(&self) {
        self.session.write().await.reset();
        self.store.clear().await;
        tracing::debug!("session reset");
    }

    /// Run one upload-then-fetch sequence.
    ///
    /// Refused while another submission is in flight. The fetch is never
    /// issued unless the upload succeeded, and no step is retried.
    pub async fn submit(&self) -> Result<(), IngestError> {
        let (generation, submission_id, source) = {
            let mut session = self.session.write().await;
            if session.is_submitting() {
                tracing::debug!("submission refused: another sequence is in flight");
                return Err(IngestError::SubmissionInFlight);
            }
            let Some(source) = session.source.clone() else {
                let error = IngestError::NoSource;
                session.transition_to(SessionState::Failed(error.clone()));
                return Err(error);
            };
            let generation = session.begin_submission();
            (generation, session.submission_id, source)
        };

        tracing::info!(
            submission_id = %submission_id,
            mode = source.mode(),
            "submission started"
        );

        if let Err(error) = self.backend.upload_report(&source).await {
            return self
                .fail(generation, submission_id, IngestError::Upload(error.to_string()))
                .await;
        }

        // A reset may have superseded this sequence while the upload was in
        // flight; don't issue the dependent fetch for a stale sequence.
        if self.is_stale(generation).await {
            tracing::debug!(submission_id = %submission_id, "stale sequence, fetch skipped");
            return Ok(());
        }

        let raw = match self.backend.fetch_visualizations().await {
            Ok(raw) => raw,
            Err(error) => {
                return self
                    .fail(generation, submission_id, IngestError::Fetch(error.to_string()))
                    .await;
            }
        };

        // Finalize under the session lock so a reset can never interleave
        // between the staleness check and the store update.
        let mut session = self.session.write().await;
        if session.generation != generation {
            tracing::debug!(submission_id = %submission_id, "stale completion discarded");
            return Ok(());
        }

        match self.store.load(&raw).await {
            Ok(summary) => {
                session.source = None;
                session.transition_to(SessionState::Ready);
                tracing::info!(
                    submission_id = %submission_id,
                    rendered = summary.rendered.len(),
                    skipped = summary.skipped.len(),
                    "visualizations ready"
                );
                Ok(())
            }
            Err(LoadError::EmptyPayload) => {
                let error = IngestError::NoVisualizations;
                tracing::warn!(submission_id = %submission_id, "payload had no renderable artifacts");
                session.transition_to(SessionState::Failed(error.clone()));
                Err(error)
            }
        }
    }

    /// Fire-and-forget feedback; failures are logged and absorbed.
    pub async fn send_feedback(&self, feedback: &str) {
        if let Err(error) = self.backend.send_feedback(feedback).await {
            tracing::warn!(error = %error, "feedback submission failed");
        }
    }

    async fn is_stale(&self, generation: u64) -> bool {
        self.session.read().await.generation != generation
    }

    /// Land the sequence in Failed unless it has been superseded.
    async fn fail(
        &self,
        generation: u64,
        submission_id: Uuid,
        error: IngestError,
    ) -> Result<(), IngestError> {
        let mut session = self.session.write().await;
        if session.generation != generation {
            tracing::debug!(submission_id = %submission_id, "stale failure discarded");
            return Ok(());
        }
        tracing::warn!(submission_id = %submission_id, error = %error, "submission failed");
        session.transition_to(SessionState::Failed(error.clone()));
        Err(error)
    }
}
