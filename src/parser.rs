use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

use crate::error::{CompareError, Result};
use crate::splitter::split_records;

pub const DEFAULT_KEY_PATTERN: &str = r"^\d{7,}";
pub const DEFAULT_NAME_PATTERN: &str = r"\bMR\b|\bMM\b|\bCH\b";
pub const DEFAULT_FLIGHT_PATTERN: &str = r"\b[A-Z]{2}[\s\x1c-\x1f]+\d{1,4}";
pub const DEFAULT_PHONE_MARKER: &str = "TELEPHONE";

/// Fields pulled out of one dossier block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedRecord {
    pub key: String,
    pub names: Vec<String>,
    pub flights: Vec<String>,
    pub phone: String,
}

/// Line-sniffing rules that turn a block of booking-list text into a
/// [`ParsedRecord`]. Nothing here knows about comparison; swapping the rules
/// only changes which lines land in which field.
#[derive(Debug, Clone)]
pub struct RecordRules {
    key: Regex,
    name: Regex,
    flight: Regex,
    phone_marker: String,
}

impl RecordRules {
    /// Builds a rule set from custom patterns.
    ///
    /// `key` is matched against each trimmed line and the matched text becomes
    /// the record key. `name` and `flight` are searched for anywhere in a line.
    /// `phone_marker` is a case-insensitive substring.
    pub fn new(key: &str, name: &str, flight: &str, phone_marker: &str) -> Result<Self> {
        let compile = |field: &'static str, pattern: &str| {
            Regex::new(pattern).map_err(|source| CompareError::Pattern { field, source })
        };
        Ok(Self {
            key: compile("key", key)?,
            name: compile("name", name)?,
            flight: compile("flight", flight)?,
            phone_marker: phone_marker.to_uppercase(),
        })
    }

    pub fn parse(&self, block: &str) -> ParsedRecord {
        let lines = split_lines(block);

        let key = lines
            .iter()
            .find_map(|line| self.key.find(trim(line)))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        let names = lines
            .iter()
            .filter(|line| self.name.is_match(line))
            .map(|line| trim(line).to_string())
            .collect();

        let flights = lines
            .iter()
            .filter(|line| self.flight.is_match(line))
            .map(|line| trim(line).to_string())
            .collect();

        let phone = lines
            .iter()
            .find(|line| line.to_uppercase().contains(&self.phone_marker))
            .map(|line| trim(line).to_string())
            .unwrap_or_default();

        ParsedRecord {
            key,
            names,
            flights,
            phone,
        }
    }
}

impl Default for RecordRules {
    fn default() -> Self {
        Self::new(
            DEFAULT_KEY_PATTERN,
            DEFAULT_NAME_PATTERN,
            DEFAULT_FLIGHT_PATTERN,
            DEFAULT_PHONE_MARKER,
        )
        .expect("default record rules are valid")
    }
}

/// All keyed records of one booking list, in the order their keys first
/// appeared.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsedSet {
    pub records: IndexMap<String, ParsedRecord>,
    /// Keys seen more than once; the later block replaced the earlier one.
    pub duplicates: Vec<String>,
    /// Blocks dropped because no key line was found.
    pub unkeyed: usize,
}

impl ParsedSet {
    pub fn from_text(text: &str, rules: &RecordRules) -> Self {
        let mut set = ParsedSet::default();
        for block in split_records(text) {
            let record = rules.parse(block.text);
            if record.key.is_empty() {
                tracing::debug!(offset = block.offset, "skipping block without a dossier number");
                set.unkeyed += 1;
                continue;
            }
            let key = record.key.clone();
            // IndexMap keeps the first position and swaps in the newer value.
            if set.records.insert(key.clone(), record).is_some() {
                tracing::warn!(dossier = %key, "duplicate dossier number, keeping the later block");
                set.duplicates.push(key);
            }
        }
        set
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Whitespace as the booking lists use it: Unicode whitespace plus the
/// `\x1c`-`\x1f` information separators.
fn is_space(c: char) -> bool {
    c.is_whitespace() || ('\x1c'..='\x1f').contains(&c)
}

fn trim(line: &str) -> &str {
    line.trim_matches(is_space)
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Splits on every Unicode line boundary, treating `\r\n` as one break. A
/// trailing break does not produce an empty last line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !is_line_break(c) {
            continue;
        }
        lines.push(&text[start..i]);
        start = i + c.len_utf8();
        if c == '\r' {
            if let Some(&(j, '\n')) = chars.peek() {
                chars.next();
                start = j + 1;
            }
        }
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: &str = "DOSSIER\n  1234567  GROUPE SOLEIL  12/03\nMR SMITH JOHN\nMM SMITH JANE\nCH SMITH TOM\n\
                         BA 123 LHR CMB 08:40\nUL 5 CMB MLE\nTelephone: +94 11 222 3333\nTELEPHONE 2: none\n";

    #[test]
    fn parses_all_fields_from_a_block() {
        let record = RecordRules::default().parse(BLOCK);
        assert_eq!(record.key, "1234567");
        assert_eq!(record.names, vec!["MR SMITH JOHN", "MM SMITH JANE", "CH SMITH TOM"]);
        assert_eq!(record.flights, vec!["BA 123 LHR CMB 08:40", "UL 5 CMB MLE"]);
        assert_eq!(record.phone, "Telephone: +94 11 222 3333");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let record = RecordRules::default().parse("DOSSIER\nnothing useful here\n");
        assert_eq!(record, ParsedRecord::default());
    }

    #[test]
    fn key_is_the_leading_digit_run() {
        let rules = RecordRules::default();
        assert_eq!(rules.parse("DOSSIER\n 123456789/B\n").key, "123456789");
        assert_eq!(rules.parse("DOSSIER\n123456 short\n").key, "");
        assert_eq!(rules.parse("DOSSIER\nREF 1234567\n").key, "");
        assert_eq!(rules.parse("DOSSIER\nx\n7654321\n1234567\n").key, "7654321");
    }

    #[test]
    fn name_tokens_must_be_whole_words() {
        let record = RecordRules::default().parse("DOSSIER\nMRS BROWN\nCHARLES\nMR. BROWN\nMMX\n");
        assert_eq!(record.names, vec!["MR. BROWN"]);
    }

    #[test]
    fn flight_needs_two_capitals_then_digits() {
        let record = RecordRules::default().parse("DOSSIER\nba 123\nB 123\nEK  6543\nQR\t1\nXY ABC\n");
        assert_eq!(record.flights, vec!["EK  6543", "QR\t1"]);
    }

    #[test]
    fn unit_separator_is_trimmed_like_whitespace() {
        let record = RecordRules::default().parse("DOSSIER\n\x1f1234567\x1f\nMR SMITH\x1f\nBA\x1f123\n");
        assert_eq!(record.key, "1234567");
        assert_eq!(record.names, vec!["MR SMITH"]);
        assert_eq!(record.flights, vec!["BA\x1f123"]);
    }

    #[test]
    fn custom_rules_swap_detection_only() {
        let rules = RecordRules::new(r"^REF-\d+", r"\bPAX\b", r"^FLT", "phone").unwrap();
        let record = rules.parse("DOSSIER\nREF-42 x\nPAX ONE\nFLT AB1\nMobile PHONE 5\n");
        assert_eq!(record.key, "REF-42");
        assert_eq!(record.names, vec!["PAX ONE"]);
        assert_eq!(record.flights, vec!["FLT AB1"]);
        assert_eq!(record.phone, "Mobile PHONE 5");
    }

    #[test]
    fn bad_custom_pattern_is_reported() {
        let err = RecordRules::new("(", DEFAULT_NAME_PATTERN, DEFAULT_FLIGHT_PATTERN, "x").unwrap_err();
        assert!(matches!(err, CompareError::Pattern { field: "key", .. }));
    }

    #[test]
    fn split_lines_handles_every_break() {
        assert_eq!(split_lines(""), Vec::<&str>::new());
        assert_eq!(split_lines("\n"), vec![""]);
        assert_eq!(split_lines("a\r\nb\rc\x0cd\u{2028}e\n"), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(split_lines("a\n\nb"), vec!["a", "", "b"]);
    }

    #[test]
    fn set_drops_unkeyed_blocks_and_keeps_later_duplicate() {
        let text = "DOSSIER\n1111111\nMR A\nDOSSIER\nno key\nMR Z\nDOSSIER\n2222222\nDOSSIER\n1111111\nMR B\n";
        let set = ParsedSet::from_text(text, &RecordRules::default());

        assert_eq!(set.len(), 2);
        assert_eq!(set.unkeyed, 1);
        assert_eq!(set.duplicates, vec!["1111111"]);
        assert_eq!(set.records.keys().collect::<Vec<_>>(), vec!["1111111", "2222222"]);
        assert_eq!(set.records["1111111"].names, vec!["MR B"]);
    }
}
