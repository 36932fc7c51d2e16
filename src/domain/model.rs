use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::catalog::parse_amount;

/// A typed value of one catalog field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// Pass-through conversion for upstream values we do not interpret.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Empty,
            serde_json::Value::Bool(b) => FieldValue::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(FieldValue::Number)
                .unwrap_or_else(|| FieldValue::Text(n.to_string())),
            serde_json::Value::String(s) => FieldValue::Text(s.clone()),
            other => FieldValue::Text(other.to_string()),
        }
    }

    /// Empty, absent and whitespace-only values count as "not set".
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Bool(_) | FieldValue::Number(_) => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) if n.is_finite() => Some(*n),
            FieldValue::Text(s) => parse_amount(s),
            _ => None,
        }
    }

    /// Rendering used for CSV cells.
    pub fn to_cell(&self) -> String {
        match self {
            FieldValue::Empty => String::new(),
            FieldValue::Bool(true) => "True".to_string(),
            FieldValue::Bool(false) => "False".to_string(),
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_cell())
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Organisation number of a Norwegian entity (digits only).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrgNumber(String);

impl OrgNumber {
    /// Accepts `923609016` and `923 609 016`; anything else is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let digits: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrgNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One registry entity normalised onto the general field catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalRecord {
    values: BTreeMap<&'static str, FieldValue>,
}

impl CanonicalRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &'static str, value: FieldValue) {
        self.values.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    pub fn org_id(&self) -> &str {
        match self.values.get("orgnr") {
            Some(FieldValue::Text(s)) => s,
            _ => "",
        }
    }
}

/// Values taken from the most recent statement of one entity, plus ratios.
///
/// An empty snapshot is the "no data" outcome: callers treat it exactly like a
/// statement where every financial field is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialSnapshot {
    values: BTreeMap<&'static str, FieldValue>,
}

impl FinancialSnapshot {
    pub fn no_data() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &'static str, value: FieldValue) {
        self.values.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An output column: catalog key plus the header shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub key: &'static str,
    pub label: &'static str,
}

/// One output line, one cell per declared column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    pub cells: Vec<String>,
}

impl OutputRow {
    /// Projects a record (and its snapshot, if any) onto the column order.
    /// Unknown values become empty cells, so rows are never partial.
    pub fn project(
        columns: &[Column],
        record: &CanonicalRecord,
        snapshot: Option<&FinancialSnapshot>,
    ) -> Self {
        let cells = columns
            .iter()
            .map(|column| {
                record
                    .get(column.key)
                    .or_else(|| snapshot.and_then(|s| s.get(column.key)))
                    .map(FieldValue::to_cell)
                    .unwrap_or_default()
            })
            .collect();
        Self { cells }
    }

    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }
}

/// Mutable run state owned by the orchestrator while it collects rows.
#[derive(Debug, Default)]
pub struct RunState {
    pub rows: Vec<OutputRow>,
    pub total_seen: usize,
    pub pages_fetched: usize,
    pub enrichment_calls: usize,
    pub enrichment_avoided: usize,
    pub partial: bool,
}

impl RunState {
    pub fn retained(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub total_seen: usize,
    pub retained: usize,
    pub pages_fetched: usize,
    pub enrichment_calls: usize,
    pub enrichment_avoided: usize,
    pub partial: bool,
    pub interrupted: bool,
    pub output: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Process exit status once the rows are saved: an interrupted run is
    /// reported as a failure, partial results are not.
    pub fn exit_code(&self) -> i32 {
        if self.interrupted {
            1
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_rule() {
        assert!(FieldValue::Empty.is_blank());
        assert!(FieldValue::text("   ").is_blank());
        assert!(!FieldValue::text("post@firma.no").is_blank());
        assert!(!FieldValue::Bool(false).is_blank());
        assert!(!FieldValue::Number(0.0).is_blank());
    }

    #[test]
    fn test_cells() {
        assert_eq!(FieldValue::Number(12.0).to_cell(), "12");
        assert_eq!(FieldValue::Number(12.5).to_cell(), "12.5");
        assert_eq!(FieldValue::Bool(true).to_cell(), "True");
        assert_eq!(FieldValue::Empty.to_cell(), "");
    }

    #[test]
    fn test_org_number_parse() {
        assert_eq!(OrgNumber::parse("923 609 016").unwrap().as_str(), "923609016");
        assert!(OrgNumber::parse("").is_none());
        assert!(OrgNumber::parse("   ").is_none());
        assert!(OrgNumber::parse("92360901A").is_none());
    }

    fn summary(partial: bool, interrupted: bool) -> RunSummary {
        let now = Utc::now();
        RunSummary {
            total_seen: 3,
            retained: 1,
            pages_fetched: 1,
            enrichment_calls: 0,
            enrichment_avoided: 0,
            partial,
            interrupted,
            output: "out.csv".to_string(),
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn test_interrupted_run_exits_non_zero() {
        assert_eq!(summary(false, false).exit_code(), 0);
        assert_eq!(summary(true, false).exit_code(), 0);
        assert_eq!(summary(false, true).exit_code(), 1);
        assert_eq!(summary(true, true).exit_code(), 1);
    }

    #[test]
    fn test_project_fills_missing_cells() {
        let mut record = CanonicalRecord::new();
        record.insert("name", FieldValue::text("Reklame AS"));
        let mut snapshot = FinancialSnapshot::no_data();
        snapshot.insert("revenue", FieldValue::Number(200.0));

        let columns = [
            Column { key: "name", label: "Name" },
            Column { key: "email", label: "Email" },
            Column { key: "revenue", label: "Revenue" },
        ];
        let row = OutputRow::project(&columns, &record, Some(&snapshot));
        assert_eq!(row.cells, vec!["Reklame AS", "", "200"]);

        let row = OutputRow::project(&columns, &record, None);
        assert_eq!(row.cells.len(), 3);
        assert_eq!(row.cell(2), "");
    }
}
