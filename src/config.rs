use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::errors::FlashcardError;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub entries_path: PathBuf,
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    #[serde(default)]
    pub session: SessionOptions,
}

/// Knobs the session engine reads at runtime.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SessionOptions {
    pub priority_aware: bool,
    pub fast_mode: bool,
    pub auto_advance_on_incorrect: bool,
    pub short_delay_ms: u64,
    pub long_delay_ms: u64,
    pub speech_language: String,
    pub speak_on_resolve: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            priority_aware: false,
            fast_mode: false,
            auto_advance_on_incorrect: false,
            short_delay_ms: 500,
            long_delay_ms: 2500,
            speech_language: "zh-CN".to_string(),
            speak_on_resolve: true,
        }
    }
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("flashcards.snapshot.json")
}

impl SessionOptions {
    pub fn validate(&self) -> Result<(), FlashcardError> {
        if self.short_delay_ms > self.long_delay_ms {
            return Err(FlashcardError::Config(format!(
                "short_delay_ms ({}) must not exceed long_delay_ms ({})",
                self.short_delay_ms, self.long_delay_ms
            )));
        }
        if self.speech_language.trim().is_empty() {
            return Err(FlashcardError::Config("speech_language must not be empty".to_string()));
        }
        Ok(())
    }
}

pub fn parse_config(contents: &str) -> Result<Config, FlashcardError> {
    let config = toml::from_str::<Config>(contents)?;
    config.session.validate()?;
    Ok(config)
}

pub fn load_config_from_file(file_path: &str) -> Result<Config, FlashcardError> {
    match fs::read_to_string(file_path) {
        Ok(contents) => parse_config(&contents).map_err(|e| match e {
            FlashcardError::Toml(e) => {
                FlashcardError::Config(format!("Failed to parse {}: {}", file_path, e))
            }
            other => other,
        }),
        Err(e) => Err(FlashcardError::Config(format!(
            "Failed to read {}: {}. Please ensure it exists.",
            file_path, e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_config(r#"entries_path = "words.json""#).unwrap();
        assert_eq!(config.entries_path, PathBuf::from("words.json"));
        assert_eq!(config.snapshot_path, PathBuf::from("flashcards.snapshot.json"));
        assert_eq!(config.session, SessionOptions::default());
    }

    #[test]
    fn test_session_table() {
        let config = parse_config(
            r#"
            entries_path = "words.json"
            snapshot_path = "state.json"

            [session]
            priority_aware = true
            fast_mode = true
            short_delay_ms = 300
            "#,
        )
        .unwrap();
        assert!(config.session.priority_aware);
        assert!(config.session.fast_mode);
        assert!(!config.session.auto_advance_on_incorrect);
        assert_eq!(config.session.short_delay_ms, 300);
        assert_eq!(config.session.long_delay_ms, 2500);
    }

    #[test]
    fn test_invalid_delays_are_rejected() {
        let result = parse_config(
            r#"
            entries_path = "words.json"
            [session]
            short_delay_ms = 3000
            long_delay_ms = 1000
            "#,
        );
        assert!(matches!(result, Err(FlashcardError::Config(_))));
        assert!(matches!(parse_config("entries_path = 3"), Err(FlashcardError::Toml(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = load_config_from_file("/nonexistent/flashcards.toml");
        assert!(matches!(result, Err(FlashcardError::Config(msg)) if msg.contains("Failed to read")));
    }
}
