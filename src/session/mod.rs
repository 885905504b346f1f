//*** START FILE: src/session/mod.rs ***//
pub mod driver;
pub mod evaluator;
pub mod scheduler;
pub mod selection;
pub mod state;
pub mod stroke;

// Re-export the pieces the binary and embedders reach for
pub use driver::{DriverUpdate, SessionDriver, SessionEvent, SpeechRequest};
pub use evaluator::{evaluate, Evaluation};
pub use scheduler::{schedule, AdvanceDelay, AdvanceTimer};
pub use selection::SelectionPolicy;
pub use state::{CardView, FieldView, Phase, Resolution, SessionCounters, SessionState};
pub use stroke::{PresentationTicket, StrokeProgress};
//*** END FILE: src/session/mod.rs ***//
