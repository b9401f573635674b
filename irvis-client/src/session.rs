//! Ingestion session state machine
//!
//! A session progresses Idle → Submitting → Ready | Failed. Exactly one
//! report source (file or URL) is selected at a time; selecting one mode
//! replaces the other. The generation counter guards late completions from
//! superseded submission sequences.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Media type the backend expects for uploaded report documents.
const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Source material for one ingestion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportSource {
    /// Report document selected for upload.
    File {
        file_name: String,
        media_type: String,
        bytes: Vec<u8>,
    },
    /// Remote address of a report document.
    Url(String),
}

impl ReportSource {
    /// Input mode label used in logs.
    pub fn mode(&self) -> &'static str {
        match self {
            ReportSource::File { .. } => "file",
            ReportSource::Url(_) => "url",
        }
    }
}

/// Session failure reasons, surfaced verbatim to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// Submit was called with no report source selected
    #[error("no report source selected")]
    NoSource,

    /// A prior submission sequence is still in flight
    #[error("a submission is already in progress")]
    SubmissionInFlight,

    /// URL selection rejected before any network activity
    #[error("invalid report URL: {0}")]
    InvalidUrl(String),

    /// Upload call failed; the fetch step was skipped
    #[error("upload rejected: {0}")]
    Upload(String),

    /// Analytics fetch failed after a successful upload
    #[error("visualization fetch failed: {0}")]
    Fetch(String),

    /// Fetch succeeded but no artifact was renderable
    #[error("no visualizations available")]
    NoVisualizations,
}

/// Session lifecycle state. Exactly one tag is active at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Initial state; input form visible
    Idle,
    /// Upload/fetch sequence in flight
    Submitting,
    /// Visualizations decoded and available from the store
    Ready,
    /// Sequence aborted; reason shown to the user
    Failed(IngestError),
}

/// In-memory ingestion session, owned exclusively by the controller.
#[derive(Debug, Clone)]
pub struct IngestSession {
    /// Identifier of the current submission sequence
    pub submission_id: Uuid,

    /// Current lifecycle state
    pub state: SessionState,

    /// Selected report source, if any
    pub source: Option<ReportSource>,

    /// Monotonic counter; completions from older generations are discarded
    pub generation: u64,

    /// When the current sequence entered Submitting
    pub submitted_at: Option<DateTime<Utc>>,

    /// When the current sequence reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,
}

impl IngestSession {
    pub fn new() -> Self {
        Self {
            submission_id: Uuid::new_v4(),
            state: SessionState::Idle,
            source: None,
            generation: 0,
            submitted_at: None,
            completed_at: None,
        }
    }

    /// Select file mode, replacing any URL selection.
    ///
    /// The backend expects PDF source material; other declared media types
    /// are accepted here and left for the backend to judge.
    pub fn select_file(&mut self, file_name: &str, media_type: &str, bytes: Vec<u8>) {
        if media_type != PDF_MEDIA_TYPE {
            tracing::warn!(
                media_type = %media_type,
                "selected file is not declared as PDF"
            );
        }
        self.source = Some(ReportSource::File {
            file_name: file_name.to_string(),
            media_type: media_type.to_string(),
            bytes,
        });
    }

    /// Select URL mode, replacing any file selection.
    ///
    /// Rejects input that does not parse as an absolute URL with a host;
    /// the current selection is left untouched on rejection.
    pub fn select_url(&mut self, url: &str) -> Result<(), IngestError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| IngestError::InvalidUrl(format!("{}: {}", url, e)))?;
        if !parsed.has_host() {
            return Err(IngestError::InvalidUrl(format!("{}: missing host", url)));
        }
        self.source = Some(ReportSource::Url(url.to_string()));
        Ok(())
    }

    /// Claim the session for a new submission sequence.
    ///
    /// Returns the sequence's generation, checked again at every
    /// post-await continuation.
    pub fn begin_submission(&mut self) -> u64 {
        self.generation += 1;
        self.submission_id = Uuid::new_v4();
        self.transition_to(SessionState::Submitting);
        self.generation
    }

    /// Transition to a new state, stamping sequence timestamps.
    pub fn transition_to(&mut self, new_state: SessionState) {
        match new_state {
            SessionState::Submitting => {
                self.submitted_at = Some(Utc::now());
                self.completed_at = None;
            }
            SessionState::Ready | SessionState::Failed(_) => {
                self.completed_at = Some(Utc::now());
            }
            SessionState::Idle => {}
        }
        self.state = new_state;
    }

    /// Return to Idle, dropping the source and superseding any in-flight
    /// sequence.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.source = None;
        self.state = SessionState::Idle;
        self.submitted_at = None;
        self.completed_at = None;
    }

    pub fn is_submitting(&self) -> bool {
        self.state == SessionState::Submitting
    }

    /// Check if the current sequence has finished (Ready or Failed)
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, SessionState::Ready | SessionState::Failed(_))
    }
}

impl Default for IngestSession {
    fn default() -> Self {
        Self::new()
    }
}
