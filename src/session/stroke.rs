/// Identifies one presentation of one card. Every selection bumps the
/// generation, so callbacks and timers created for an earlier card can be told
/// apart from ones for the card on screen, even when the same index comes up
/// again in the next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PresentationTicket {
    pub generation: u64,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeProgress {
    /// Some characters are drawn, more to go.
    Partial { completed: usize, total: usize },
    /// The last character was drawn and the answer has been submitted.
    Complete,
    /// The callback belongs to a card that is no longer current, or arrived
    /// after the card was already answered.
    Stale,
}

/// Per-card progress of the external stroke-recognition widget. The widget
/// fires once per character; the card is complete when every character has
/// reported. A new value is created for every presentation, which drops any
/// count left over from the previous card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrokeQuiz {
    ticket: PresentationTicket,
    total_segments: usize,
    completed_segments: usize,
}

impl StrokeQuiz {
    pub fn new(ticket: PresentationTicket, total_segments: usize) -> Self {
        Self { ticket, total_segments, completed_segments: 0 }
    }

    pub fn ticket(&self) -> PresentationTicket {
        self.ticket
    }

    pub fn accepts(&self, ticket: PresentationTicket) -> bool {
        self.ticket == ticket && !self.is_complete()
    }

    /// Counts one finished character. Returns true when that was the last one.
    pub(crate) fn record_segment(&mut self) -> bool {
        if self.completed_segments < self.total_segments {
            self.completed_segments += 1;
        }
        self.is_complete()
    }

    pub fn completed_segments(&self) -> usize {
        self.completed_segments
    }

    pub fn total_segments(&self) -> usize {
        self.total_segments
    }

    pub fn is_complete(&self) -> bool {
        self.completed_segments >= self.total_segments
    }
}
