use thiserror::Error;

use crate::session::state::Phase;

#[derive(Error, Debug)]
pub enum FlashcardError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No entries available: {0}")]
    LoadFailure(String),

    #[error("No entries available: the source contained no usable rows")]
    EmptyEntrySet,

    /// An operation was called from a phase that does not allow it. This means
    /// the caller and the engine disagree about the current card.
    #[error("`{operation}` is not valid while the session is {phase:?}")]
    ContractViolation { operation: &'static str, phase: Phase },
}

impl FlashcardError {
    /// Both load errors leave the session without a card.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, FlashcardError::LoadFailure(_) | FlashcardError::EmptyEntrySet)
    }
}

impl From<std::io::Error> for FlashcardError {
    fn from(error: std::io::Error) -> Self {
        FlashcardError::Io(Box::new(error))
    }
}
