//! Upstream response → result table
//!
//! Turns the `result` array of one response into rows tagged with their
//! cycle. Numeric fields are coerced permissively (anything unparsable
//! becomes `null`) and the grade label loses its constant prefix. An empty or
//! malformed response yields no table at all.

use serde::Serialize;
use serde_json::{Map, Number, Value};

use painel_common::selection::STAGE_PREFIX;
use painel_common::Cycle;

use super::query_builder::QueryKind;

/// Column added to every row with the cycle label
pub const CYCLE_COLUMN: &str = "Ciclo";
/// Grade label column cleaned of [`STAGE_PREFIX`]
pub const STAGE_COLUMN: &str = "VL_FILTRO_ETAPA";

pub const GENERAL_NUMERIC_FIELDS: [&str; 7] = [
    "TX_ACERTOS",
    "TX_PARTICIPACAO",
    "QT_PREVISTO",
    "QT_EFETIVO",
    "NU_N01",
    "NU_N02",
    "NU_N03",
];

pub const SKILLS_NUMERIC_FIELDS: [&str; 1] = ["TX_ACERTO"];

/// One result entry, field name → value
pub type ResultRow = Map<String, Value>;

/// Rows of one (cycle, kind) query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultTable {
    pub kind: QueryKind,
    pub cycle: Cycle,
    pub rows: Vec<ResultRow>,
}

pub fn numeric_fields(kind: QueryKind) -> &'static [&'static str] {
    match kind {
        QueryKind::General => &GENERAL_NUMERIC_FIELDS,
        QueryKind::Skills => &SKILLS_NUMERIC_FIELDS,
    }
}

/// Build the table for one response, or `None` when there is no data
pub fn normalize(response: &Value, cycle: Cycle, kind: QueryKind) -> Option<ResultTable> {
    let entries = response.get("result")?.as_array()?;

    let rows: Vec<ResultRow> = entries
        .iter()
        .filter_map(Value::as_object)
        .map(|entry| normalize_row(entry, cycle, kind))
        .collect();

    if rows.is_empty() {
        return None;
    }

    Some(ResultTable { kind, cycle, rows })
}

fn normalize_row(entry: &ResultRow, cycle: Cycle, kind: QueryKind) -> ResultRow {
    let mut row = entry.clone();

    for field in numeric_fields(kind) {
        if let Some(value) = row.get_mut(*field) {
            *value = coerce_number(value);
        }
    }

    if let Some(Value::String(label)) = row.get_mut(STAGE_COLUMN) {
        *label = strip_stage_prefix(label).to_string();
    }

    row.insert(CYCLE_COLUMN.to_string(), Value::String(cycle.label().to_string()));
    row
}

/// Float value of a JSON number or numeric string; `null` otherwise
pub fn coerce_number(value: &Value) -> Value {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

pub fn strip_stage_prefix(label: &str) -> &str {
    label.strip_prefix(STAGE_PREFIX).unwrap_or(label)
}

/// Numeric value of `field`, `None` when absent or missing
pub fn number(row: &ResultRow, field: &str) -> Option<f64> {
    row.get(field).and_then(Value::as_f64)
}

/// Text rendering of `field` for display (strings as-is, numbers formatted)
pub fn text(row: &ResultRow, field: &str) -> Option<String> {
    match row.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
