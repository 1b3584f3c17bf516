//! Product field schemas and validation of the rows submitted against them.

use chrono::NaiveDate;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

pub type OrderRow = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    Text,
    Url,
    Number,
    Date,
    Select,
    Readonly,
    Calc,
    DateCalc,
    #[serde(other)]
    Other,
}

impl FieldType {
    /// Readonly and computed fields are never typed in by the customer.
    pub fn is_derived(self) -> bool {
        matches!(self, FieldType::Readonly | FieldType::Calc | FieldType::DateCalc)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SchemaField {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub is_quantity: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub formula: Option<Value>,
}

impl SchemaField {
    pub fn display_label(&self) -> &str {
        self.label.as_deref().filter(|l| !l.is_empty()).unwrap_or(&self.name)
    }
}

/// The ordered list of fields a product asks for, stored as one JSON column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, FromJsonQueryResult, ToSchema)]
#[serde(transparent)]
pub struct FieldSchema(pub Vec<SchemaField>);

impl FieldSchema {
    pub fn fields(&self) -> &[SchemaField] {
        &self.0
    }

    pub fn quantity_field(&self) -> Option<&SchemaField> {
        self.0.iter().find(|f| f.is_quantity)
    }

    /// Field names must be present and unique.
    pub fn check(&self) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for field in &self.0 {
            let name = field.name.trim();
            if name.is_empty() {
                return Err("Schema field name must not be empty".into());
            }
            if !seen.insert(name) {
                return Err(format!("Duplicate schema field '{name}'"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RowError {
    /// 1-based row number; 0 when the error concerns the submission as a whole.
    pub row: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl RowError {
    pub fn whole(message: impl Into<String>) -> Self {
        Self {
            row: 0,
            field: None,
            message: message.into(),
        }
    }

    fn at(row: usize, field: &SchemaField, message: String) -> Self {
        Self {
            row,
            field: Some(field.name.clone()),
            message,
        }
    }
}

/// Text rendering of a cell, the way it would print in a grid.
fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

fn parses_as_integer(value: &Value) -> bool {
    match value {
        Value::Number(_) | Value::Bool(_) => true,
        Value::String(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

fn is_blank(row: &OrderRow) -> bool {
    row.values().all(|v| cell_text(Some(v)).is_empty())
}

/// Check submitted rows against a schema.
///
/// Returns the non-blank rows and every error found; callers reject the
/// submission when the error list is non-empty.
pub fn validate_order_data(rows: &[OrderRow], schema: &FieldSchema) -> (Vec<OrderRow>, Vec<RowError>) {
    if rows.is_empty() {
        return (Vec::new(), vec![RowError::whole("No data was submitted")]);
    }

    let editable: Vec<&SchemaField> = schema
        .fields()
        .iter()
        .filter(|f| !f.field_type.is_derived())
        .collect();

    let mut errors = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        let row_num = idx + 1;

        for field in editable.iter().filter(|f| f.required) {
            if cell_text(row.get(&field.name)).is_empty() {
                errors.push(RowError::at(
                    row_num,
                    field,
                    format!("{} is empty", field.display_label()),
                ));
            }
        }

        for field in &editable {
            let raw = row.get(&field.name);
            match field.field_type {
                FieldType::Url => {
                    let text = cell_text(raw);
                    if !text.is_empty() && !(text.starts_with("http://") || text.starts_with("https://")) {
                        errors.push(RowError::at(
                            row_num,
                            field,
                            format!("{} must start with http:// or https://", field.display_label()),
                        ));
                    }
                }
                FieldType::Number => {
                    let invalid = raw
                        .filter(|v| is_truthy(Some(v)))
                        .is_some_and(|v| !parses_as_integer(v));
                    if invalid {
                        errors.push(RowError::at(
                            row_num,
                            field,
                            format!("{} must be a number", field.display_label()),
                        ));
                    }
                }
                FieldType::Date => {
                    let text = cell_text(raw);
                    if !text.is_empty() && NaiveDate::parse_from_str(&text, "%Y-%m-%d").is_err() {
                        errors.push(RowError::at(
                            row_num,
                            field,
                            format!("{} must use the YYYY-MM-DD format", field.display_label()),
                        ));
                    }
                }
                _ => {}
            }
        }
    }

    let valid_rows = rows.iter().filter(|row| !is_blank(row)).cloned().collect();

    (valid_rows, errors)
}

/// Quantity carried by one row: the value truncated toward zero, blank counting as 0.
fn row_quantity(value: Option<&Value>) -> Option<i64> {
    if !is_truthy(value) {
        return Some(0);
    }
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64),
        _ => None,
    }
}

/// Largest total quantity a single order may carry.
pub const MAX_TOTAL_QUANTITY: i64 = 1_000_000_000;

/// Total quantity of an order over the rows as submitted. Blank rows are skipped but
/// still counted when numbering, so errors point at the row the customer typed.
/// Without a quantity field each non-blank row counts once.
pub fn total_quantity(rows: &[OrderRow], schema: &FieldSchema) -> Result<i64, RowError> {
    let numbered = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| !is_blank(row))
        .map(|(idx, row)| (idx + 1, row));

    let Some(field) = schema.quantity_field() else {
        return Ok(numbered.count() as i64);
    };

    let mut total: i64 = 0;
    for (row_num, row) in numbered {
        let qty = row_quantity(row.get(&field.name)).ok_or_else(|| {
            RowError::at(
                row_num,
                field,
                format!("Row {row_num}: {} must be a number", field.display_label()),
            )
        })?;
        if qty < 1 {
            return Err(RowError::at(
                row_num,
                field,
                format!("Row {row_num}: quantity must be at least 1"),
            ));
        }
        total = total
            .checked_add(qty)
            .filter(|t| *t <= MAX_TOTAL_QUANTITY)
            .ok_or_else(|| {
                RowError::at(
                    row_num,
                    field,
                    format!("Total quantity may not exceed {MAX_TOTAL_QUANTITY}"),
                )
            })?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> FieldSchema {
        serde_json::from_value(json!([
            {"name": "url", "label": "Blog URL", "type": "url", "required": true},
            {"name": "keyword", "type": "text", "required": true},
            {"name": "qty", "type": "number", "required": true, "is_quantity": true},
            {"name": "start", "type": "date"},
            {"name": "total", "type": "calc", "required": true},
        ]))
        .unwrap()
    }

    fn row(value: Value) -> OrderRow {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn unknown_field_types_are_tolerated() {
        let parsed: FieldSchema =
            serde_json::from_value(json!([{"name": "x", "type": "colour_picker"}])).unwrap();
        assert_eq!(parsed.fields()[0].field_type, FieldType::Other);
        assert_eq!(parsed.fields()[0].display_label(), "x");
    }

    #[test]
    fn empty_submission_is_one_error() {
        let (valid, errors) = validate_order_data(&[], &schema());
        assert!(valid.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].row, 0);
    }

    #[test]
    fn reports_each_problem_with_row_and_field() {
        let rows = vec![
            row(json!({"url": "ftp://x", "keyword": "a", "qty": "2", "start": "2026-02-30"})),
            row(json!({"url": "https://ok", "keyword": " ", "qty": "two"})),
        ];
        let (_, errors) = validate_order_data(&rows, &schema());
        let summary: Vec<(usize, Option<&str>)> =
            errors.iter().map(|e| (e.row, e.field.as_deref())).collect();
        assert_eq!(
            summary,
            vec![
                (1, Some("url")),
                (1, Some("start")),
                (2, Some("keyword")),
                (2, Some("qty")),
            ]
        );
        assert_eq!(errors[0].message, "Blog URL must start with http:// or https://");
    }

    #[test]
    fn derived_fields_are_not_required() {
        let rows = vec![row(json!({"url": "https://a", "keyword": "k", "qty": 3}))];
        let (valid, errors) = validate_order_data(&rows, &schema());
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(valid.len(), 1);
    }

    #[test]
    fn blank_rows_are_dropped() {
        let plain: FieldSchema = serde_json::from_value(json!([{"name": "note"}])).unwrap();
        let rows = vec![
            row(json!({"note": "hello"})),
            row(json!({"note": "  ", "other": null})),
        ];
        let (valid, errors) = validate_order_data(&rows, &plain);
        assert!(errors.is_empty());
        assert_eq!(valid.len(), 1);
    }

    #[test]
    fn quantity_sums_the_flagged_field() {
        let rows = vec![
            row(json!({"qty": "2"})),
            row(json!({"qty": 3.9})),
        ];
        assert_eq!(total_quantity(&rows, &schema()), Ok(5));
    }

    #[test]
    fn quantity_must_be_positive() {
        let rows = vec![row(json!({"qty": "0"}))];
        let err = total_quantity(&rows, &schema()).unwrap_err();
        assert_eq!(err.message, "Row 1: quantity must be at least 1");
    }

    #[test]
    fn quantity_errors_name_the_submitted_row() {
        let rows = vec![
            row(json!({"qty": "1"})),
            row(json!({"qty": ""})),
            row(json!({"qty": "0"})),
        ];
        let err = total_quantity(&rows, &schema()).unwrap_err();
        assert_eq!(err.row, 3);
        assert_eq!(err.message, "Row 3: quantity must be at least 1");
    }

    #[test]
    fn quantity_is_capped() {
        let rows = vec![row(json!({"qty": "1e18"}))];
        let err = total_quantity(&rows, &schema()).unwrap_err();
        assert_eq!(err.row, 1);
        assert!(err.message.starts_with("Total quantity may not exceed"));

        let at_cap = vec![row(json!({"qty": MAX_TOTAL_QUANTITY}))];
        assert_eq!(total_quantity(&at_cap, &schema()), Ok(MAX_TOTAL_QUANTITY));
    }

    #[test]
    fn quantity_defaults_to_row_count() {
        let plain: FieldSchema = serde_json::from_value(json!([{"name": "url"}])).unwrap();
        let rows = vec![
            row(json!({"url": "a"})),
            row(json!({"url": " "})),
            row(json!({"url": "b"})),
        ];
        assert_eq!(total_quantity(&rows, &plain), Ok(2));
    }

    #[test]
    fn duplicate_field_names_are_rejected() {
        let dup: FieldSchema =
            serde_json::from_value(json!([{"name": "a"}, {"name": "a"}])).unwrap();
        assert!(dup.check().is_err());
        assert!(schema().check().is_ok());
    }
}
