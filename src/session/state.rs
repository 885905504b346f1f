use indexmap::IndexSet;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::errors::FlashcardError;
use crate::session::evaluator::{evaluate, Evaluation};
use crate::session::selection::SelectionPolicy;
use crate::session::stroke::{PresentationTicket, StrokeProgress, StrokeQuiz};
use crate::snapshot_io::SessionSnapshot;
use crate::types::entry_data::{Entry, EntryField, EntrySet, RawRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No entries yet, or the last load failed.
    Loading,
    AwaitingAnswer,
    /// The answer was checked and the feedback is visible.
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    #[default]
    Pending,
    Answered(Evaluation),
}

/// What the user has typed for the current card, and whether it was checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSubState {
    pub primary_input: String,
    pub phonetic_input: String,
    pub resolution: Resolution,
}

/// Running score of the current cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCounters {
    pub correct: u32,
    pub incorrect: u32,
    pub total_answered: u32,
}

/// How a single field should appear on the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldView<'a> {
    Absent,
    /// Present but masked until the answer is resolved.
    Hidden,
    Shown(&'a str),
}

#[derive(Debug, Clone, Copy)]
pub struct CardView<'a> {
    pub index: usize,
    pub entry: &'a Entry,
    pub resolution: Resolution,
}

impl<'a> CardView<'a> {
    pub fn field(&self, field: EntryField) -> FieldView<'a> {
        match self.entry.get(field) {
            None => FieldView::Absent,
            Some(_) if field.is_answer_field() && self.resolution == Resolution::Pending => {
                FieldView::Hidden
            }
            Some(value) => FieldView::Shown(value),
        }
    }

    pub fn is_revealed(&self) -> bool {
        self.resolution != Resolution::Pending
    }
}

/// The whole quiz session: entries, cycle progress, the card on screen and the
/// score. All mutation goes through the methods below; each one either
/// completes a transition or returns an error without touching state.
pub struct SessionState {
    entries: EntrySet,
    already_shown: IndexSet<usize>,
    current: Option<usize>,
    answer: AnswerSubState,
    counters: SessionCounters,
    stroke_quiz: Option<StrokeQuiz>,
    generation: u64,
    policy: SelectionPolicy,
    rng: StdRng,
}

impl SessionState {
    pub fn new(policy: SelectionPolicy, rng: StdRng) -> Self {
        Self {
            entries: EntrySet::default(),
            already_shown: IndexSet::new(),
            current: None,
            answer: AnswerSubState::default(),
            counters: SessionCounters::default(),
            stroke_quiz: None,
            generation: 0,
            policy,
            rng,
        }
    }

    pub fn with_seed(policy: SelectionPolicy, seed: u64) -> Self {
        Self::new(policy, StdRng::seed_from_u64(seed))
    }

    pub fn phase(&self) -> Phase {
        match (self.current, self.answer.resolution) {
            (None, _) => Phase::Loading,
            (Some(_), Resolution::Pending) => Phase::AwaitingAnswer,
            (Some(_), Resolution::Answered(_)) => Phase::Resolved,
        }
    }

    pub fn entries(&self) -> &EntrySet {
        &self.entries
    }

    pub fn already_shown(&self) -> &IndexSet<usize> {
        &self.already_shown
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_entry(&self) -> Option<&Entry> {
        self.current.and_then(|index| self.entries.get(index))
    }

    pub fn answer(&self) -> &AnswerSubState {
        &self.answer
    }

    pub fn counters(&self) -> SessionCounters {
        self.counters
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Takes effect from the next selection on.
    pub fn set_policy(&mut self, policy: SelectionPolicy) {
        self.policy = policy;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ticket(&self) -> Option<PresentationTicket> {
        self.current.map(|index| PresentationTicket { generation: self.generation, index })
    }

    pub fn stroke_quiz(&self) -> Option<&StrokeQuiz> {
        self.stroke_quiz.as_ref()
    }

    pub fn card_view(&self) -> Option<CardView<'_>> {
        let index = self.current?;
        let entry = self.entries.get(index)?;
        Some(CardView { index, entry, resolution: self.answer.resolution })
    }

    /// Replaces the entry set and starts a fresh session on it. An empty set
    /// leaves the session in `Loading`.
    pub fn load(&mut self, entries: EntrySet) -> Result<usize, FlashcardError> {
        self.reset();
        if entries.is_empty() {
            warn!("Entry set is empty; session stays in Loading");
            return Err(FlashcardError::EmptyEntrySet);
        }

        info!("Loaded {} entries ({:?} selection)", entries.len(), self.policy);
        self.entries = entries;
        self.select_next().ok_or(FlashcardError::EmptyEntrySet)
    }

    /// Drops everything and returns to `Loading`.
    pub fn reset(&mut self) {
        self.entries = EntrySet::default();
        self.already_shown.clear();
        self.current = None;
        self.answer = AnswerSubState::default();
        self.counters = SessionCounters::default();
        self.stroke_quiz = None;
        self.generation += 1;
    }

    /// Moves from a resolved card to the next one, starting a new cycle first
    /// when every entry has been shown.
    pub fn advance(&mut self) -> Result<usize, FlashcardError> {
        self.require(Phase::Resolved, "advance")?;
        self.select_next().ok_or(FlashcardError::EmptyEntrySet)
    }

    pub fn set_primary_input(&mut self, text: &str) -> Result<(), FlashcardError> {
        self.require(Phase::AwaitingAnswer, "set_primary_input")?;
        self.answer.primary_input = text.to_string();
        Ok(())
    }

    pub fn set_phonetic_input(&mut self, text: &str) -> Result<(), FlashcardError> {
        self.require(Phase::AwaitingAnswer, "set_phonetic_input")?;
        self.answer.phonetic_input = text.to_string();
        Ok(())
    }

    pub fn submit_answer(
        &mut self,
        primary_text: &str,
        phonetic_text: &str,
    ) -> Result<Evaluation, FlashcardError> {
        self.require(Phase::AwaitingAnswer, "submit_answer")?;
        let entry = self.current_entry().ok_or(FlashcardError::ContractViolation {
            operation: "submit_answer",
            phase: Phase::Loading,
        })?;

        let evaluation = evaluate(entry, primary_text, phonetic_text);
        debug!(
            "Card {:?} answered: primary {}, phonetic {}",
            self.current, evaluation.primary_correct, evaluation.phonetic_correct
        );

        self.answer.primary_input = primary_text.to_string();
        self.answer.phonetic_input = phonetic_text.to_string();
        self.answer.resolution = Resolution::Answered(evaluation);

        self.counters.total_answered += 1;
        if evaluation.is_correct() {
            self.counters.correct += 1;
        } else {
            self.counters.incorrect += 1;
        }
        Ok(evaluation)
    }

    /// The stroke widget has certified the primary field for the card named by
    /// `ticket`. Submits the expected primary value together with the typed
    /// phonetic draft. Returns `Ok(None)` for a stale ticket.
    pub fn on_external_quiz_completed(
        &mut self,
        ticket: PresentationTicket,
    ) -> Result<Option<Evaluation>, FlashcardError> {
        if self.ticket() != Some(ticket) || self.phase() != Phase::AwaitingAnswer {
            debug!("Ignoring stale quiz completion for {:?}", ticket);
            return Ok(None);
        }
        let primary = self.current_entry().map(|e| e.primary().to_string()).unwrap_or_default();
        let phonetic = self.answer.phonetic_input.clone();
        self.submit_answer(&primary, &phonetic).map(Some)
    }

    /// One character of the current card was drawn correctly.
    pub fn on_segment_complete(
        &mut self,
        ticket: PresentationTicket,
    ) -> Result<StrokeProgress, FlashcardError> {
        if self.phase() != Phase::AwaitingAnswer {
            debug!("Ignoring stroke segment for {:?} after resolution", ticket);
            return Ok(StrokeProgress::Stale);
        }
        let quiz = match self.stroke_quiz.as_mut() {
            Some(quiz) if quiz.accepts(ticket) => quiz,
            _ => {
                debug!("Ignoring stroke segment for stale {:?}", ticket);
                return Ok(StrokeProgress::Stale);
            }
        };

        if !quiz.record_segment() {
            return Ok(StrokeProgress::Partial {
                completed: quiz.completed_segments(),
                total: quiz.total_segments(),
            });
        }
        self.on_all_segments_complete(ticket)
    }

    pub fn on_all_segments_complete(
        &mut self,
        ticket: PresentationTicket,
    ) -> Result<StrokeProgress, FlashcardError> {
        match self.on_external_quiz_completed(ticket)? {
            Some(_) => Ok(StrokeProgress::Complete),
            None => Ok(StrokeProgress::Stale),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let last_evaluation = match self.answer.resolution {
            Resolution::Answered(evaluation) => Some(evaluation),
            Resolution::Pending => None,
        };
        SessionSnapshot {
            entries: self.entries.iter().cloned().map(RawRow::from).collect(),
            already_shown_indices: self.already_shown.iter().copied().collect(),
            current_index: self.current,
            answer_resolved_flag: last_evaluation.is_some(),
            correct_count: self.counters.correct,
            incorrect_count: self.counters.incorrect,
            total_count: self.counters.total_answered,
            last_evaluation,
        }
    }

    /// Rebuilds the session from a snapshot. Indices that do not fit the
    /// restored entries are dropped; a snapshot whose rows no longer validate
    /// restarts the session on whatever rows are still usable.
    pub fn restore(&mut self, snapshot: SessionSnapshot) -> Phase {
        let row_count = snapshot.entries.len();
        let entries = EntrySet::from_rows(snapshot.entries);
        if entries.is_empty() {
            self.reset();
            return self.phase();
        }
        if entries.len() != row_count {
            warn!(
                "Snapshot had {} rows but only {} are usable; discarding saved progress",
                row_count,
                entries.len()
            );
            // A non-empty set always yields a first card.
            let _ = self.load(entries);
            return self.phase();
        }

        self.reset();
        let n = entries.len();
        self.entries = entries;
        self.already_shown =
            snapshot.already_shown_indices.into_iter().filter(|&i| i < n).collect();
        self.counters = SessionCounters {
            correct: snapshot.correct_count,
            incorrect: snapshot.incorrect_count,
            total_answered: snapshot.total_count,
        };

        match snapshot.current_index.filter(|&i| i < n) {
            Some(index) => {
                self.already_shown.insert(index);
                self.present(index);
                if snapshot.answer_resolved_flag {
                    let evaluation = snapshot.last_evaluation.unwrap_or(Evaluation {
                        primary_correct: false,
                        phonetic_correct: false,
                    });
                    self.answer.resolution = Resolution::Answered(evaluation);
                }
            }
            None => {
                self.select_next();
            }
        }

        info!(
            "Session restored: {} entries, {} shown this cycle, phase {:?}",
            n,
            self.already_shown.len(),
            self.phase()
        );
        self.phase()
    }

    fn require(&self, expected: Phase, operation: &'static str) -> Result<(), FlashcardError> {
        let phase = self.phase();
        if phase == expected {
            Ok(())
        } else {
            error!("Contract violation: `{}` called while {:?}", operation, phase);
            Err(FlashcardError::ContractViolation { operation, phase })
        }
    }

    fn roll_cycle(&mut self) {
        info!(
            "Cycle complete ({} correct, {} incorrect of {}); starting a new one",
            self.counters.correct, self.counters.incorrect, self.counters.total_answered
        );
        self.already_shown.clear();
        self.counters = SessionCounters::default();
    }

    fn select_next(&mut self) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        if self.already_shown.len() >= self.entries.len() {
            self.roll_cycle();
        }

        let next = self.policy.select_next(
            &self.entries,
            &self.already_shown,
            self.current,
            &mut self.rng,
        )?;
        self.already_shown.insert(next);
        self.present(next);
        debug!(
            "Presenting entry {} ({}/{} this cycle)",
            next,
            self.already_shown.len(),
            self.entries.len()
        );
        Some(next)
    }

    fn present(&mut self, index: usize) {
        self.generation += 1;
        self.current = Some(index);
        self.answer = AnswerSubState::default();
        let ticket = PresentationTicket { generation: self.generation, index };
        let segments = self.entries.get(index).map_or(0, Entry::segment_count);
        self.stroke_quiz = Some(StrokeQuiz::new(ticket, segments));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_entries() -> EntrySet {
        EntrySet::from_rows(
            [("一", "yī"), ("二", "èr"), ("三", "sān")].into_iter().map(|(p, ph)| {
                let mut row = RawRow::new();
                row.insert("汉字".to_string(), p.to_string());
                row.insert("pinyin".to_string(), ph.to_string());
                row
            }),
        )
    }

    fn loaded(seed: u64) -> SessionState {
        let mut state = SessionState::with_seed(SelectionPolicy::Uniform, seed);
        state.load(three_entries()).unwrap();
        state
    }

    #[test]
    fn test_load_moves_to_awaiting_answer() {
        let state = loaded(1);
        assert_eq!(state.phase(), Phase::AwaitingAnswer);
        let current = state.current_index().unwrap();
        assert!(state.already_shown().contains(&current));
        assert_eq!(state.already_shown().len(), 1);
        assert_eq!(state.counters(), SessionCounters::default());
    }

    #[test]
    fn test_empty_load_stays_loading() {
        let mut state = loaded(1);
        let result = state.load(EntrySet::default());
        assert!(matches!(result, Err(FlashcardError::EmptyEntrySet)));
        assert_eq!(state.phase(), Phase::Loading);
        assert!(state.card_view().is_none());
    }

    #[test]
    fn test_contract_violations() {
        let mut state = SessionState::with_seed(SelectionPolicy::Uniform, 1);
        assert!(matches!(
            state.submit_answer("一", "yī"),
            Err(FlashcardError::ContractViolation { operation: "submit_answer", phase: Phase::Loading })
        ));
        assert!(matches!(state.advance(), Err(FlashcardError::ContractViolation { .. })));

        state.load(three_entries()).unwrap();
        assert!(matches!(
            state.advance(),
            Err(FlashcardError::ContractViolation { phase: Phase::AwaitingAnswer, .. })
        ));

        state.submit_answer("", "").unwrap();
        let before = state.counters();
        assert!(matches!(
            state.submit_answer("一", "yī"),
            Err(FlashcardError::ContractViolation { phase: Phase::Resolved, .. })
        ));
        assert!(state.set_phonetic_input("yī").is_err());
        assert_eq!(state.counters(), before);
    }

    #[test]
    fn test_card_view_masks_answer_fields_until_resolved() {
        let mut state = loaded(2);
        let view = state.card_view().unwrap();
        assert_eq!(view.field(EntryField::Primary), FieldView::Hidden);
        assert_eq!(view.field(EntryField::Phonetic), FieldView::Hidden);
        assert_eq!(view.field(EntryField::Gloss), FieldView::Absent);
        assert!(!view.is_revealed());

        let expected = state.current_entry().unwrap().primary().to_string();
        state.submit_answer(&expected, "").unwrap();
        let view = state.card_view().unwrap();
        assert_eq!(view.field(EntryField::Primary), FieldView::Shown(expected.as_str()));
        assert!(view.is_revealed());
    }

    #[test]
    fn test_stroke_completion_certifies_primary() {
        let mut state = loaded(3);
        let ticket = state.ticket().unwrap();
        let phonetic = state.current_entry().unwrap().phonetic().to_string();
        state.set_phonetic_input(&phonetic).unwrap();

        // Single-character entries complete on the first segment.
        assert_eq!(state.on_segment_complete(ticket).unwrap(), StrokeProgress::Complete);
        assert_eq!(state.phase(), Phase::Resolved);
        assert_eq!(state.counters().correct, 1);

        // Extra firings for the same card change nothing.
        assert_eq!(state.on_segment_complete(ticket).unwrap(), StrokeProgress::Stale);
        assert_eq!(state.on_external_quiz_completed(ticket).unwrap(), None);
        assert_eq!(state.counters().total_answered, 1);
    }

    #[test]
    fn test_stroke_completion_still_checks_phonetic() {
        let mut state = loaded(4);
        let ticket = state.ticket().unwrap();
        let evaluation = state.on_external_quiz_completed(ticket).unwrap().unwrap();
        assert!(evaluation.primary_correct);
        assert!(!evaluation.phonetic_correct);
        assert_eq!(state.counters().incorrect, 1);
    }

    #[test]
    fn test_stale_ticket_after_advance_is_ignored() {
        let mut state = loaded(5);
        let old_ticket = state.ticket().unwrap();
        state.submit_answer("", "").unwrap();
        state.advance().unwrap();

        assert_eq!(state.on_segment_complete(old_ticket).unwrap(), StrokeProgress::Stale);
        assert_eq!(state.on_external_quiz_completed(old_ticket).unwrap(), None);
        assert_eq!(state.phase(), Phase::AwaitingAnswer);
        assert_ne!(state.ticket(), Some(old_ticket));
    }

    #[test]
    fn test_multi_character_stroke_quiz_counts_segments() {
        let mut row = RawRow::new();
        row.insert("汉字".to_string(), "学习".to_string());
        row.insert("pinyin".to_string(), "xuéxí".to_string());
        let mut state = SessionState::with_seed(SelectionPolicy::Uniform, 1);
        state.load(EntrySet::from_rows(vec![row])).unwrap();
        state.set_phonetic_input("XUÉXÍ").unwrap();

        let ticket = state.ticket().unwrap();
        assert_eq!(
            state.on_segment_complete(ticket).unwrap(),
            StrokeProgress::Partial { completed: 1, total: 2 }
        );
        assert_eq!(state.phase(), Phase::AwaitingAnswer);
        assert_eq!(state.on_segment_complete(ticket).unwrap(), StrokeProgress::Complete);
        assert_eq!(state.counters().correct, 1);
    }

    #[test]
    fn test_snapshot_restore_resumes_same_card() {
        let mut state = loaded(6);
        state.submit_answer("", "").unwrap();
        let snapshot = state.snapshot();
        assert!(snapshot.answer_resolved_flag);
        assert_eq!(snapshot.total_count, 1);

        let mut restored = SessionState::with_seed(SelectionPolicy::Uniform, 99);
        assert_eq!(restored.restore(snapshot.clone()), Phase::Resolved);
        assert_eq!(restored.current_index(), state.current_index());
        assert_eq!(restored.counters(), state.counters());
        assert_eq!(restored.answer().resolution, state.answer().resolution);
        assert_eq!(restored.snapshot(), snapshot);
    }

    #[test]
    fn test_restore_repairs_out_of_range_indices() {
        let mut snapshot = loaded(7).snapshot();
        snapshot.already_shown_indices = vec![9, 1];
        snapshot.current_index = Some(42);
        snapshot.answer_resolved_flag = true;

        let mut state = SessionState::with_seed(SelectionPolicy::Uniform, 7);
        assert_eq!(state.restore(snapshot), Phase::AwaitingAnswer);
        let current = state.current_index().unwrap();
        assert_ne!(current, 1);
        let mut shown: Vec<usize> = state.already_shown().iter().copied().collect();
        shown.sort_unstable();
        let mut expected = vec![1, current];
        expected.sort_unstable();
        assert_eq!(shown, expected);
    }

    #[test]
    fn test_restore_empty_snapshot_is_loading() {
        let mut state = loaded(8);
        assert_eq!(state.restore(SessionSnapshot::default()), Phase::Loading);
        assert!(state.entries().is_empty());
    }
}
