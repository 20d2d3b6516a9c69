use std::fmt;

use serde::Serialize;

use crate::diff::highlight_diff;
use crate::parser::{ParsedRecord, ParsedSet};

pub const ONLY_IN_OLD: &str = "Only in old file";
pub const ONLY_IN_NEW: &str = "Only in new file";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Added,
    Removed,
    Changed,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Added => "ADDED",
            Status::Removed => "REMOVED",
            Status::Changed => "CHANGED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldName {
    Dossier,
    Names,
    Flights,
    Tel,
}

impl FieldName {
    /// Fields compared between two versions of the same dossier.
    pub const COMPARED: [FieldName; 3] = [FieldName::Names, FieldName::Flights, FieldName::Tel];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldName::Dossier => "DOSSIER",
            FieldName::Names => "NAMES",
            FieldName::Flights => "FLIGHTS",
            FieldName::Tel => "TEL",
        }
    }

    /// The record's value for this field as one string; list fields are
    /// joined with newlines.
    pub fn render(self, record: &ParsedRecord) -> String {
        match self {
            FieldName::Dossier => record.key.clone(),
            FieldName::Names => record.names.join("\n"),
            FieldName::Flights => record.flights.join("\n"),
            FieldName::Tel => record.phone.clone(),
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the comparison report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEntry {
    pub dossier: String,
    pub field: FieldName,
    pub status: Status,
    pub old_value: String,
    pub new_value: String,
}

impl ChangeEntry {
    fn removed(dossier: &str) -> Self {
        Self {
            dossier: dossier.to_string(),
            field: FieldName::Dossier,
            status: Status::Removed,
            old_value: ONLY_IN_OLD.to_string(),
            new_value: String::new(),
        }
    }

    fn added(dossier: &str) -> Self {
        Self {
            dossier: dossier.to_string(),
            field: FieldName::Dossier,
            status: Status::Added,
            old_value: String::new(),
            new_value: ONLY_IN_NEW.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub old_dossiers: usize,
    pub new_dossiers: usize,
    pub added: usize,
    pub removed: usize,
    pub changed_fields: usize,
    /// Dossier numbers that appeared more than once in a file; only the last
    /// block for each was compared.
    pub old_duplicates: usize,
    pub new_duplicates: usize,
}

impl Summary {
    pub fn tally(old: &ParsedSet, new: &ParsedSet, entries: &[ChangeEntry]) -> Self {
        let mut summary = Summary {
            old_dossiers: old.len(),
            new_dossiers: new.len(),
            old_duplicates: old.duplicates.len(),
            new_duplicates: new.duplicates.len(),
            ..Summary::default()
        };
        for entry in entries {
            match entry.status {
                Status::Added => summary.added += 1,
                Status::Removed => summary.removed += 1,
                Status::Changed => summary.changed_fields += 1,
            }
        }
        summary
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} dossiers in old file, {} in new file: {} added, {} removed, {} changed fields",
            self.old_dossiers, self.new_dossiers, self.added, self.removed, self.changed_fields
        )?;
        let duplicates = self.old_duplicates + self.new_duplicates;
        if duplicates > 0 {
            write!(f, " ({duplicates} duplicate dossier numbers replaced)")?;
        }
        Ok(())
    }
}

/// Field-level differences between two booking lists.
///
/// Rows come in three passes: dossiers only in `old` and changed fields of
/// shared dossiers (both in `old` order), then dossiers only in `new` (in
/// `new` order).
pub fn compare(old: &ParsedSet, new: &ParsedSet) -> Vec<ChangeEntry> {
    let mut entries = Vec::new();

    for (key, old_record) in &old.records {
        let Some(new_record) = new.records.get(key) else {
            entries.push(ChangeEntry::removed(key));
            continue;
        };
        for field in FieldName::COMPARED {
            let old_value = field.render(old_record);
            let new_value = field.render(new_record);
            if old_value == new_value {
                continue;
            }
            let (old_value, new_value) = highlight_diff(&old_value, &new_value);
            entries.push(ChangeEntry {
                dossier: key.clone(),
                field,
                status: Status::Changed,
                old_value,
                new_value,
            });
        }
    }

    for key in new.records.keys() {
        if !old.records.contains_key(key) {
            entries.push(ChangeEntry::added(key));
        }
    }

    entries
}
