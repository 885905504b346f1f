//*** START FILE: src/parsing/mod.rs ***//
pub mod row_loader;

// Re-export the loaders for convenience
pub use row_loader::{fetch_rows, parse_rows_json};
//*** END FILE: src/parsing/mod.rs ***//
