//*** START FILE: src/parsing/row_loader.rs ***//
use crate::errors::FlashcardError;
use crate::types::entry_data::RawRow;
use log::{info, warn};
use serde_json::Value;
use std::path::Path;

// Rows come in as a JSON array of objects, one object per spreadsheet row.
// Cells may be strings, numbers or booleans and are all kept as text.
pub fn parse_rows_json(content: &str) -> Result<Vec<RawRow>, FlashcardError> {
    let value: Value = serde_json::from_str(content)?;
    let Value::Array(items) = value else {
        return Err(FlashcardError::LoadFailure(
            "expected a JSON array of row objects".to_string(),
        ));
    };

    let mut rows = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let Value::Object(object) = item else {
            warn!("Row {} is not an object; skipping", index + 1);
            continue;
        };
        let mut row = RawRow::new();
        for (header, cell) in object {
            let text = match cell {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                // A `false` flag cell means unset.
                Value::Bool(b) => if b { "true".to_string() } else { String::new() },
                Value::Null => String::new(),
                Value::Array(_) | Value::Object(_) => {
                    warn!("Row {} column '{}' is not a scalar; skipping cell", index + 1, header);
                    continue;
                }
            };
            row.insert(header, text);
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Reads the rows file without blocking the control thread. Any failure is
/// reported as a load failure, which leaves the session without a card.
pub async fn fetch_rows(path: &Path) -> Result<Vec<RawRow>, FlashcardError> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        FlashcardError::LoadFailure(format!("failed to read {}: {}", path.display(), e))
    })?;
    let rows = parse_rows_json(&content).map_err(|e| match e {
        FlashcardError::LoadFailure(msg) => {
            FlashcardError::LoadFailure(format!("{}: {}", path.display(), msg))
        }
        other => FlashcardError::LoadFailure(format!("{}: {}", path.display(), other)),
    })?;
    info!("Fetched {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

//*** END FILE: src/parsing/row_loader.rs ***//
