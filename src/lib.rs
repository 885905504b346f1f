//*** START FILE: src/lib.rs ***//

// Declare all modules that are part of this library
pub mod config;
pub mod errors;
pub mod types {
    pub mod entry_data;
}
pub mod parsing;
pub mod session;
pub mod snapshot_io;

pub use config::{Config, SessionOptions};
pub use errors::FlashcardError;
pub use types::entry_data::{Entry, EntryField, EntrySet, RawRow};

//*** END FILE: src/lib.rs ***//
