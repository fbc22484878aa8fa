//! Body measurements keyed by species name
//!
//! The table is a JSON list of `{name, length, weight}` entries with free-text
//! values such as "12.3 m" or "N/A". A species absent from the table simply has
//! no measurement.

use crate::error::{IngestError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementEntry {
    pub name: String,
    #[serde(default)]
    pub length: Option<String>,
    #[serde(default)]
    pub weight: Option<String>,
}

/// Parsed numeric measurement
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Measurement {
    pub length: Option<f64>,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct MeasurementTable {
    entries: HashMap<String, MeasurementEntry>,
}

impl MeasurementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from entries; the first entry for a name wins
    pub fn from_entries(entries: impl IntoIterator<Item = MeasurementEntry>) -> Self {
        let mut table = HashMap::new();
        for entry in entries {
            table.entry(entry.name.clone()).or_insert(entry);
        }
        Self { entries: table }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let entries: Vec<MeasurementEntry> = serde_json::from_str(content)?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            IngestError::config(format!("Cannot read measurements {}: {}", path.display(), e))
        })?;
        let table = Self::from_json_str(&content)?;
        info!(path = %path.display(), entries = table.len(), "Loaded measurement table");
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, name: &str) -> Option<Measurement> {
        self.entries.get(name).map(|entry| Measurement {
            length: entry.length.as_deref().and_then(leading_float),
            weight: entry.weight.as_deref().and_then(leading_float),
        })
    }
}

/// Leading decimal number of a string: "12.3 m" -> 12.3, "N/A" -> None
pub fn leading_float(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let candidate_len = text
        .char_indices()
        .take_while(|(i, c)| {
            c.is_ascii_digit() || *c == '.' || *c == 'e' || *c == 'E' || (*i == 0 && (*c == '-' || *c == '+'))
        })
        .count();

    // Longest prefix that parses, so "1.5e" or "3." still yield a value
    (1..=candidate_len)
        .rev()
        .find_map(|end| text[..end].parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_float() {
        assert_eq!(leading_float("12.3 m"), Some(12.3));
        assert_eq!(leading_float("  8 tonnes"), Some(8.0));
        assert_eq!(leading_float("3.5 - 4 m"), Some(3.5));
        assert_eq!(leading_float("-2e3kg"), Some(-2000.0));
        assert_eq!(leading_float("1.5e"), Some(1.5));
        assert_eq!(leading_float("N/A"), None);
        assert_eq!(leading_float(""), None);
        assert_eq!(leading_float("e5"), None);
    }

    #[test]
    fn test_lookup_by_exact_name() {
        let table = MeasurementTable::from_json_str(
            r#"[
                {"name": "Tyrannosaurus rex", "length": "12.3 m", "weight": "8.4 t"},
                {"name": "Tyrannosaurus rex", "length": "99 m", "weight": "1 t"},
                {"name": "Microraptor zhaoianus", "length": "0.8 m", "weight": "N/A"}
            ]"#,
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        let rex = table.lookup("Tyrannosaurus rex").unwrap();
        assert_eq!(rex.length, Some(12.3));
        assert_eq!(rex.weight, Some(8.4));

        let micro = table.lookup("Microraptor zhaoianus").unwrap();
        assert_eq!(micro.weight, None);
        assert!(table.lookup("tyrannosaurus rex").is_none());
    }
}
