use std::path::PathBuf;

use log::{debug, info, warn};
use tokio::sync::mpsc::UnboundedSender;

use crate::config::SessionOptions;
use crate::errors::FlashcardError;
use crate::parsing::fetch_rows;
use crate::session::evaluator::Evaluation;
use crate::session::scheduler::{schedule, AdvanceDelay, AdvanceTimer};
use crate::session::selection::SelectionPolicy;
use crate::session::state::{Phase, Resolution, SessionState};
use crate::session::stroke::{PresentationTicket, StrokeProgress};
use crate::snapshot_io::SnapshotStore;
use crate::types::entry_data::{EntrySet, RawRow};

/// Everything that can happen to a session. Timers, the row loader and the
/// stroke widget all report through this type so that the session is only
/// ever touched from the task that owns the [`SessionDriver`].
#[derive(Debug)]
pub enum SessionEvent {
    EntriesLoaded(Result<Vec<RawRow>, FlashcardError>),
    PrimaryDraft(String),
    PhoneticDraft(String),
    Submit { primary: String, phonetic: String },
    StrokeSegmentCompleted(PresentationTicket),
    StrokeQuizCompleted(PresentationTicket),
    AdvanceDue { generation: u64 },
    ManualAdvance,
}

/// Ask the audio layer to read `text` aloud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub language: String,
}

/// What changed after handling one event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DriverUpdate {
    /// Index of a newly presented card.
    pub presented: Option<usize>,
    pub evaluation: Option<Evaluation>,
    pub advance: Option<AdvanceDelay>,
    pub speech: Option<SpeechRequest>,
    pub stroke: Option<StrokeProgress>,
    /// Set when the session has no entries to show.
    pub unavailable: Option<String>,
    /// The event was stale and had no effect.
    pub ignored: bool,
}

impl DriverUpdate {
    fn ignored() -> Self {
        Self { ignored: true, ..Self::default() }
    }
}

pub struct SessionDriver<S: SnapshotStore> {
    state: SessionState,
    store: S,
    options: SessionOptions,
    timer: AdvanceTimer,
    events: UnboundedSender<SessionEvent>,
}

impl<S: SnapshotStore> SessionDriver<S> {
    pub fn new(
        mut state: SessionState,
        store: S,
        options: SessionOptions,
        events: UnboundedSender<SessionEvent>,
    ) -> Self {
        state.set_policy(SelectionPolicy::from_options(options.priority_aware));
        Self { state, store, options, timer: AdvanceTimer::new(), events }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: SessionOptions) {
        self.state.set_policy(SelectionPolicy::from_options(options.priority_aware));
        self.options = options;
    }

    /// Resumes from the store when it holds a snapshot. A snapshot that cannot
    /// be read is logged and ignored; the caller then loads fresh rows.
    pub fn resume(&mut self) -> Phase {
        match self.store.load() {
            Ok(Some(snapshot)) => {
                let phase = self.state.restore(snapshot);
                self.persist();
                phase
            }
            Ok(None) => self.state.phase(),
            Err(e) => {
                warn!("Ignoring unreadable session snapshot: {}", e);
                self.state.phase()
            }
        }
    }

    /// Starts reading the rows file in the background. The result arrives as
    /// [`SessionEvent::EntriesLoaded`].
    pub fn request_reload(&self, path: PathBuf) {
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = fetch_rows(&path).await;
            let _ = tx.send(SessionEvent::EntriesLoaded(result));
        });
    }

    pub fn handle(&mut self, event: SessionEvent) -> Result<DriverUpdate, FlashcardError> {
        match event {
            SessionEvent::EntriesLoaded(Ok(rows)) => self.load_rows(rows),
            SessionEvent::EntriesLoaded(Err(e)) => Ok(self.load_failed(e)),
            SessionEvent::PrimaryDraft(text) => {
                self.state.set_primary_input(&text)?;
                Ok(DriverUpdate::default())
            }
            SessionEvent::PhoneticDraft(text) => {
                self.state.set_phonetic_input(&text)?;
                Ok(DriverUpdate::default())
            }
            SessionEvent::Submit { primary, phonetic } => {
                let evaluation = self.state.submit_answer(&primary, &phonetic)?;
                Ok(self.resolved(evaluation))
            }
            SessionEvent::StrokeSegmentCompleted(ticket) => {
                let progress = self.state.on_segment_complete(ticket)?;
                Ok(self.stroke_progress(progress))
            }
            SessionEvent::StrokeQuizCompleted(ticket) => {
                let progress = self.state.on_all_segments_complete(ticket)?;
                Ok(self.stroke_progress(progress))
            }
            SessionEvent::AdvanceDue { generation } => {
                if generation != self.state.generation() || self.state.phase() != Phase::Resolved {
                    debug!("Dropping stale auto-advance for generation {}", generation);
                    return Ok(DriverUpdate::ignored());
                }
                self.advance()
            }
            SessionEvent::ManualAdvance => {
                self.timer.cancel();
                self.advance()
            }
        }
    }

    fn load_rows(&mut self, rows: Vec<RawRow>) -> Result<DriverUpdate, FlashcardError> {
        self.timer.cancel();
        let result = self.state.load(EntrySet::from_rows(rows));
        self.persist();
        match result {
            Ok(index) => Ok(DriverUpdate { presented: Some(index), ..DriverUpdate::default() }),
            Err(e) if e.is_unavailable() => {
                Ok(DriverUpdate { unavailable: Some(e.to_string()), ..DriverUpdate::default() })
            }
            Err(e) => Err(e),
        }
    }

    fn load_failed(&mut self, error: FlashcardError) -> DriverUpdate {
        warn!("Loading entries failed: {}", error);
        if self.state.phase() == Phase::Loading {
            DriverUpdate { unavailable: Some(error.to_string()), ..DriverUpdate::default() }
        } else {
            // Keep quizzing on the entries we already have.
            DriverUpdate::default()
        }
    }

    fn advance(&mut self) -> Result<DriverUpdate, FlashcardError> {
        let index = self.state.advance()?;
        self.persist();
        Ok(DriverUpdate { presented: Some(index), ..DriverUpdate::default() })
    }

    fn stroke_progress(&mut self, progress: StrokeProgress) -> DriverUpdate {
        match progress {
            StrokeProgress::Complete => {
                let mut update = match self.state.answer().resolution {
                    Resolution::Answered(evaluation) => self.resolved(evaluation),
                    Resolution::Pending => DriverUpdate::default(),
                };
                update.stroke = Some(progress);
                update
            }
            StrokeProgress::Stale => DriverUpdate { stroke: Some(progress), ..DriverUpdate::ignored() },
            StrokeProgress::Partial { .. } => {
                DriverUpdate { stroke: Some(progress), ..DriverUpdate::default() }
            }
        }
    }

    fn resolved(&mut self, evaluation: Evaluation) -> DriverUpdate {
        let delay = schedule(evaluation.is_correct(), &self.options);
        if let AdvanceDelay::After(duration) = delay {
            let event = SessionEvent::AdvanceDue { generation: self.state.generation() };
            self.timer.arm(duration, event, self.events.clone());
        }

        let speech = match self.state.current_entry() {
            Some(entry) if self.options.speak_on_resolve => Some(SpeechRequest {
                text: entry.primary().to_string(),
                language: self.options.speech_language.clone(),
            }),
            _ => None,
        };

        self.persist();
        DriverUpdate {
            evaluation: Some(evaluation),
            advance: Some(delay),
            speech,
            ..DriverUpdate::default()
        }
    }

    /// A failed write is logged; the quiz keeps running on the in-memory state.
    fn persist(&mut self) {
        let snapshot = self.state.snapshot();
        if let Err(e) = self.store.save(&snapshot) {
            warn!("Failed to save session snapshot: {}", e);
        }
    }

    /// Cancels any pending auto-advance and writes a final snapshot.
    pub fn shutdown(&mut self) {
        self.timer.cancel();
        self.persist();
        info!("Session closed after {} answers this cycle", self.state.counters().total_answered);
    }
}
