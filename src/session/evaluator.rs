use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::types::entry_data::Entry;

/// Result of checking one submission. Both fields are reported so the card can
/// show which one was wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub primary_correct: bool,
    pub phonetic_correct: bool,
}

impl Evaluation {
    pub fn is_correct(&self) -> bool {
        self.primary_correct && self.phonetic_correct
    }
}

/// Compares a submission against the entry's expected values.
pub fn evaluate(entry: &Entry, primary_text: &str, phonetic_text: &str) -> Evaluation {
    Evaluation {
        primary_correct: answers_match(primary_text, entry.primary()),
        phonetic_correct: answers_match(phonetic_text, entry.phonetic()),
    }
}

/// NFC, trim and lowercase, so "XUÉXÍ " typed with combining accents still
/// matches "xuéxí".
pub fn normalize_answer(text: &str) -> String {
    text.nfc().collect::<String>().trim().to_lowercase()
}

fn answers_match(submitted: &str, expected: &str) -> bool {
    normalize_answer(submitted) == normalize_answer(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::entry_data::RawRow;

    fn entry(primary: &str, phonetic: &str) -> Entry {
        let mut row = RawRow::new();
        row.insert("answer-primary".to_string(), primary.to_string());
        row.insert("answer-phonetic".to_string(), phonetic.to_string());
        Entry::from_row(&row).unwrap()
    }

    #[test]
    fn test_case_and_whitespace_are_ignored() {
        let e = entry("学习", "xuéxí");
        let result = evaluate(&e, " 学习 ", "XUÉXÍ");
        assert!(result.primary_correct);
        assert!(result.phonetic_correct);
        assert!(result.is_correct());
    }

    #[test]
    fn test_fields_are_judged_independently() {
        let e = entry("学习", "xuéxí");
        assert_eq!(
            evaluate(&e, "学习", "xuexi"),
            Evaluation { primary_correct: true, phonetic_correct: false }
        );
        assert_eq!(
            evaluate(&e, "学", "xuéxí"),
            Evaluation { primary_correct: false, phonetic_correct: true }
        );
        assert!(!evaluate(&e, "", "").is_correct());
    }

    #[test]
    fn test_decomposed_tone_marks_match() {
        let e = entry("学习", "xuéxí");
        // e + U+0301, i + U+0301
        let decomposed = "xue\u{301}xi\u{301}";
        assert!(evaluate(&e, "学习", decomposed).phonetic_correct);
    }
}
