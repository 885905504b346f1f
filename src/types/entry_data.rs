use std::collections::BTreeMap;
use std::fmt;

use log::{debug, warn};
use thiserror::Error;

/// One row as handed over by the row source: column header -> cell value.
pub type RawRow = BTreeMap<String, String>;

/// Priority used when the `priority` cell is empty or not a number. It sorts
/// after every declared priority.
pub const DEFAULT_PRIORITY: i32 = i32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryField {
    Primary,
    Phonetic,
    Reading,
    Gloss,
    Example,
    Priority,
    Skip,
}

impl EntryField {
    pub const ALL: [EntryField; 7] = [
        EntryField::Primary,
        EntryField::Phonetic,
        EntryField::Reading,
        EntryField::Gloss,
        EntryField::Example,
        EntryField::Priority,
        EntryField::Skip,
    ];

    pub fn key(self) -> &'static str {
        match self {
            EntryField::Primary => "answer-primary",
            EntryField::Phonetic => "answer-phonetic",
            EntryField::Reading => "display-reading",
            EntryField::Gloss => "display-gloss",
            EntryField::Example => "display-example",
            EntryField::Priority => "priority",
            EntryField::Skip => "skip",
        }
    }

    /// Headers used by the shared vocabulary spreadsheet.
    fn sheet_header(self) -> Option<&'static str> {
        match self {
            EntryField::Primary => Some("汉字"),
            EntryField::Phonetic => Some("pinyin"),
            EntryField::Reading => Some("chữ hán"),
            EntryField::Gloss => Some("nghĩa"),
            EntryField::Example => Some("ví dụ"),
            EntryField::Priority | EntryField::Skip => None,
        }
    }

    pub fn from_header(header: &str) -> Option<EntryField> {
        let header = header.trim().to_lowercase();
        EntryField::ALL
            .into_iter()
            .find(|field| field.key() == header || field.sheet_header() == Some(header.as_str()))
    }

    /// Fields hidden on the card until the answer is resolved.
    pub fn is_answer_field(self) -> bool {
        matches!(self, EntryField::Primary | EntryField::Phonetic | EntryField::Example)
    }
}

impl fmt::Display for EntryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowRejection {
    #[error("row is marked as skipped")]
    Skipped,
    #[error("row has no `{}` value", EntryField::Primary)]
    MissingPrimary,
    #[error("row has no `{}` value", EntryField::Phonetic)]
    MissingPhonetic,
}

/// A validated vocabulary item. Only constructed through [`Entry::from_row`],
/// so every `Entry` has a non-empty primary and phonetic value and no skip flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    fields: BTreeMap<EntryField, String>,
}

impl Entry {
    pub fn from_row(row: &RawRow) -> Result<Entry, RowRejection> {
        let mut fields = BTreeMap::new();
        for (header, value) in row {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match EntryField::from_header(header) {
                Some(field) => {
                    fields.insert(field, value.to_string());
                }
                None => debug!("Ignoring unknown column '{}'", header),
            }
        }

        if fields.contains_key(&EntryField::Skip) {
            return Err(RowRejection::Skipped);
        }
        if !fields.contains_key(&EntryField::Primary) {
            return Err(RowRejection::MissingPrimary);
        }
        if !fields.contains_key(&EntryField::Phonetic) {
            return Err(RowRejection::MissingPhonetic);
        }
        Ok(Entry { fields })
    }

    pub fn get(&self, field: EntryField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn primary(&self) -> &str {
        self.get(EntryField::Primary).unwrap_or_default()
    }

    pub fn phonetic(&self) -> &str {
        self.get(EntryField::Phonetic).unwrap_or_default()
    }

    pub fn priority(&self) -> i32 {
        self.get(EntryField::Priority)
            .and_then(|p| p.parse::<i32>().ok())
            .unwrap_or(DEFAULT_PRIORITY)
    }

    pub fn is_usable(&self) -> bool {
        !self.primary().is_empty() && !self.phonetic().is_empty()
    }

    /// Number of characters the stroke quiz asks for, one segment per char.
    pub fn segment_count(&self) -> usize {
        self.primary().chars().count()
    }

    pub fn fields(&self) -> impl Iterator<Item = (EntryField, &str)> {
        self.fields.iter().map(|(field, value)| (*field, value.as_str()))
    }
}

impl From<Entry> for RawRow {
    fn from(entry: Entry) -> RawRow {
        entry
            .fields
            .into_iter()
            .map(|(field, value)| (field.key().to_string(), value))
            .collect()
    }
}

impl TryFrom<RawRow> for Entry {
    type Error = RowRejection;

    fn try_from(row: RawRow) -> Result<Self, Self::Error> {
        Entry::from_row(&row)
    }
}

/// Entries in load order, indexed `0..len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntrySet {
    entries: Vec<Entry>,
}

impl EntrySet {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    /// Keeps the usable rows and drops the rest. Rejections are logged, not
    /// returned, since a partly filled sheet is the normal case.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = RawRow>,
    {
        let mut entries = Vec::new();
        let mut skipped = 0;
        let mut incomplete = 0;

        for (row_number, row) in rows.into_iter().enumerate() {
            match Entry::from_row(&row) {
                Ok(entry) => entries.push(entry),
                Err(RowRejection::Skipped) => skipped += 1,
                Err(reason) => {
                    // Blank trailing rows are common in exported sheets.
                    if row.values().any(|v| !v.trim().is_empty()) {
                        warn!("Dropping row {}: {}", row_number + 1, reason);
                    }
                    incomplete += 1;
                }
            }
        }

        debug!(
            "Built entry set: {} usable, {} skipped, {} incomplete",
            entries.len(),
            skipped,
            incomplete
        );
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Entry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_sheet_headers_map_to_fields() {
        let entry = Entry::from_row(&row(&[
            ("汉字", "学习"),
            ("pinyin", "xuéxí"),
            ("chữ hán", "học tập"),
            ("nghĩa", "học"),
            ("ví dụ", "我喜欢学习。"),
            ("ghi chú", "ignored"),
        ]))
        .unwrap();

        assert_eq!(entry.primary(), "学习");
        assert_eq!(entry.phonetic(), "xuéxí");
        assert_eq!(entry.get(EntryField::Reading), Some("học tập"));
        assert_eq!(entry.get(EntryField::Gloss), Some("học"));
        assert_eq!(entry.get(EntryField::Example), Some("我喜欢学习。"));
        assert_eq!(entry.fields().count(), 5);
        assert_eq!(entry.segment_count(), 2);
    }

    #[test]
    fn test_rejections() {
        assert_eq!(
            Entry::from_row(&row(&[("answer-primary", "学"), ("answer-phonetic", " ")])),
            Err(RowRejection::MissingPhonetic)
        );
        assert_eq!(
            Entry::from_row(&row(&[("answer-phonetic", "xué")])),
            Err(RowRejection::MissingPrimary)
        );
        assert_eq!(
            Entry::from_row(&row(&[("汉字", "学"), ("pinyin", "xué"), ("skip", "x")])),
            Err(RowRejection::Skipped)
        );
        // An empty skip cell does not exclude the row.
        assert!(Entry::from_row(&row(&[("汉字", "学"), ("pinyin", "xué"), ("skip", "")])).is_ok());
    }

    #[test]
    fn test_priority_defaults() {
        let with = |p: &str| Entry::from_row(&row(&[("汉字", "学"), ("pinyin", "xué"), ("priority", p)])).unwrap();
        assert_eq!(with("2").priority(), 2);
        assert_eq!(with(" -1 ").priority(), -1);
        assert_eq!(with("high").priority(), DEFAULT_PRIORITY);
        assert_eq!(with("").priority(), DEFAULT_PRIORITY);
    }

    #[test]
    fn test_entry_set_keeps_order_of_usable_rows() {
        let set = EntrySet::from_rows(vec![
            row(&[("汉字", "一"), ("pinyin", "yī")]),
            row(&[("汉字", ""), ("pinyin", "")]),
            row(&[("汉字", "二"), ("pinyin", "èr"), ("skip", "1")]),
            row(&[("汉字", "三"), ("pinyin", "sān")]),
        ]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(0).map(Entry::primary), Some("一"));
        assert_eq!(set.get(1).map(Entry::primary), Some("三"));
        assert!(set.iter().all(Entry::is_usable));
    }

    #[test]
    fn test_entry_converts_back_to_canonical_row() {
        let entry = Entry::from_row(&row(&[("汉字", "学习"), ("pinyin", "xuéxí")])).unwrap();
        let raw = RawRow::from(entry.clone());
        assert_eq!(raw.get("answer-primary").map(String::as_str), Some("学习"));
        assert_eq!(raw.get("answer-phonetic").map(String::as_str), Some("xuéxí"));
        assert_eq!(Entry::try_from(raw), Ok(entry));
    }
}
