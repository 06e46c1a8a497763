//! In-memory widget data pipeline: filter rows, group and aggregate, infer
//! column types. Operates on already-materialized JSON rows.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WidgetFilter {
    Equals { column: String, value: Value },
    Contains { column: String, value: String },
    GreaterThan { column: String, value: f64 },
    LessThan { column: String, value: f64 },
    DateRange { column: String, start_date: String, end_date: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WidgetAggregation {
    GroupBy { column: String },
    Sum { column: String, output_column: Option<String> },
    Avg { column: String, output_column: Option<String> },
    Count { column: String, output_column: Option<String> },
    Min { column: String, output_column: Option<String> },
    Max { column: String, output_column: Option<String> },
}

pub fn apply_filters(rows: Vec<Value>, filters: &[WidgetFilter]) -> Vec<Value> {
    let mut filtered = rows;
    for filter in filters {
        filtered = filtered.into_iter().filter(|row| matches(row, filter)).collect();
    }
    filtered
}

fn matches(row: &Value, filter: &WidgetFilter) -> bool {
    match filter {
        WidgetFilter::Equals { column, value } => row.get(column) == Some(value),
        WidgetFilter::Contains { column, value } => as_text(row.get(column))
            .to_lowercase()
            .contains(&value.to_lowercase()),
        WidgetFilter::GreaterThan { column, value } => as_number(row.get(column)) > *value,
        WidgetFilter::LessThan { column, value } => as_number(row.get(column)) < *value,
        WidgetFilter::DateRange { column, start_date, end_date } => {
            // ISO-8601 strings compare lexicographically in date order
            let cell = as_text(row.get(column));
            !cell.is_empty() && cell.as_str() >= start_date.as_str() && cell.as_str() <= end_date.as_str()
        }
    }
}

/// Group rows by the group_by columns and fold the remaining aggregations
/// over each group. Without a group_by the rows pass through untouched.
pub fn apply_aggregations(rows: Vec<Value>, aggregations: &[WidgetAggregation]) -> Vec<Value> {
    let group_columns: Vec<&String> = aggregations
        .iter()
        .filter_map(|a| match a {
            WidgetAggregation::GroupBy { column } => Some(column),
            _ => None,
        })
        .collect();

    if group_columns.is_empty() {
        return rows;
    }

    // BTreeMap keeps output order deterministic
    let mut groups: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for row in rows {
        let key = group_columns
            .iter()
            .map(|c| as_text(row.get(c.as_str())))
            .collect::<Vec<_>>()
            .join("|");
        groups.entry(key).or_default().push(row);
    }

    let mut out = Vec::with_capacity(groups.len());
    for (key, members) in groups {
        let mut aggregated = Map::new();

        for (column, part) in group_columns.iter().zip(key.split('|')) {
            // Keep the original value when available so numbers stay numbers
            let value = members
                .first()
                .and_then(|r| r.get(column.as_str()))
                .cloned()
                .unwrap_or_else(|| Value::String(part.to_string()));
            aggregated.insert((*column).clone(), value);
        }

        for aggregation in aggregations {
            match aggregation {
                WidgetAggregation::GroupBy { .. } => {}
                WidgetAggregation::Sum { column, output_column } => {
                    let sum: f64 = members.iter().map(|r| as_number(r.get(column.as_str()))).sum();
                    aggregated.insert(output_name(output_column, column, "sum"), number(sum));
                }
                WidgetAggregation::Avg { column, output_column } => {
                    let values: Vec<f64> = members.iter().map(|r| as_number(r.get(column.as_str()))).collect();
                    let avg = if values.is_empty() { 0.0 } else { values.iter().sum::<f64>() / values.len() as f64 };
                    aggregated.insert(output_name(output_column, column, "avg"), number(avg));
                }
                WidgetAggregation::Count { column, output_column } => {
                    aggregated.insert(output_name(output_column, column, "count"), Value::from(members.len()));
                }
                WidgetAggregation::Min { column, output_column } => {
                    let min = members
                        .iter()
                        .map(|r| as_number(r.get(column.as_str())))
                        .fold(f64::INFINITY, f64::min);
                    let min = if min.is_finite() { min } else { 0.0 };
                    aggregated.insert(output_name(output_column, column, "min"), number(min));
                }
                WidgetAggregation::Max { column, output_column } => {
                    let max = members
                        .iter()
                        .map(|r| as_number(r.get(column.as_str())))
                        .fold(f64::NEG_INFINITY, f64::max);
                    let max = if max.is_finite() { max } else { 0.0 };
                    aggregated.insert(output_name(output_column, column, "max"), number(max));
                }
            }
        }

        out.push(Value::Object(aggregated));
    }
    out
}

fn output_name(output_column: &Option<String>, column: &str, suffix: &str) -> String {
    output_column
        .clone()
        .unwrap_or_else(|| format!("{}_{}", column, suffix))
}

/// Column type names inferred from the first row.
pub fn infer_types(sample_row: &Value) -> Map<String, Value> {
    let mut types = Map::new();
    if let Value::Object(obj) = sample_row {
        for (key, value) in obj {
            let name = match value {
                Value::Null => "unknown",
                Value::Bool(_) => "boolean",
                Value::Number(n) => {
                    if n.is_i64() || n.is_u64() {
                        "integer"
                    } else {
                        "float"
                    }
                }
                Value::String(s) => {
                    if looks_like_date(s) {
                        "date"
                    } else {
                        "string"
                    }
                }
                Value::Array(_) | Value::Object(_) => "json",
            };
            types.insert(key.clone(), Value::String(name.to_string()));
        }
    }
    types
}

fn looks_like_date(s: &str) -> bool {
    // YYYY-MM-DD prefix is enough for preview typing
    s.len() >= 10
        && s.as_bytes().get(4) == Some(&b'-')
        && s.as_bytes().get(7) == Some(&b'-')
        && s[..4].chars().all(|c| c.is_ascii_digit())
}

fn as_number(v: Option<&Value>) -> f64 {
    match v {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.parse().unwrap_or(0.0),
        Some(Value::Bool(true)) => 1.0,
        _ => 0.0,
    }
}

fn as_text(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn number(f: f64) -> Value {
    serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sales_rows() -> Vec<Value> {
        vec![
            json!({"region": "south", "amount": 10.5, "day": "2025-01-01"}),
            json!({"region": "north", "amount": 4.0, "day": "2025-01-02"}),
            json!({"region": "south", "amount": 2.25, "day": "2025-01-03"}),
            json!({"region": "north", "amount": 8.0, "day": "2025-02-01"}),
        ]
    }

    #[test]
    fn group_by_sum_produces_one_row_per_group() {
        let out = apply_aggregations(
            sales_rows(),
            &[
                WidgetAggregation::GroupBy { column: "region".into() },
                WidgetAggregation::Sum { column: "amount".into(), output_column: None },
            ],
        );
        assert_eq!(out.len(), 2);
        let north = out.iter().find(|r| r["region"] == "north").unwrap();
        let south = out.iter().find(|r| r["region"] == "south").unwrap();
        assert!((north["amount_sum"].as_f64().unwrap() - 12.0).abs() < 1e-9);
        assert!((south["amount_sum"].as_f64().unwrap() - 12.75).abs() < 1e-9);
    }

    #[test]
    fn avg_count_min_max() {
        let out = apply_aggregations(
            sales_rows(),
            &[
                WidgetAggregation::GroupBy { column: "region".into() },
                WidgetAggregation::Avg { column: "amount".into(), output_column: Some("mean".into()) },
                WidgetAggregation::Count { column: "amount".into(), output_column: None },
                WidgetAggregation::Min { column: "amount".into(), output_column: None },
                WidgetAggregation::Max { column: "amount".into(), output_column: None },
            ],
        );
        let south = out.iter().find(|r| r["region"] == "south").unwrap();
        assert!((south["mean"].as_f64().unwrap() - 6.375).abs() < 1e-9);
        assert_eq!(south["amount_count"], json!(2));
        assert!((south["amount_min"].as_f64().unwrap() - 2.25).abs() < 1e-9);
        assert!((south["amount_max"].as_f64().unwrap() - 10.5).abs() < 1e-9);
    }

    #[test]
    fn no_group_by_passes_rows_through() {
        let rows = sales_rows();
        let out = apply_aggregations(
            rows.clone(),
            &[WidgetAggregation::Sum { column: "amount".into(), output_column: None }],
        );
        assert_eq!(out, rows);
    }

    #[test]
    fn filters_compose() {
        let out = apply_filters(
            sales_rows(),
            &[
                WidgetFilter::Equals { column: "region".into(), value: json!("south") },
                WidgetFilter::GreaterThan { column: "amount".into(), value: 5.0 },
            ],
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["amount"], json!(10.5));
    }

    #[test]
    fn contains_is_case_insensitive() {
        let rows = vec![json!({"name": "Acme Corp"}), json!({"name": "Umbrella"})];
        let out = apply_filters(rows, &[WidgetFilter::Contains { column: "name".into(), value: "acme".into() }]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn date_range_filter() {
        let out = apply_filters(
            sales_rows(),
            &[WidgetFilter::DateRange {
                column: "day".into(),
                start_date: "2025-01-01".into(),
                end_date: "2025-01-31".into(),
            }],
        );
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn type_inference() {
        let types = infer_types(&json!({
            "n": 3, "f": 1.5, "s": "hello", "b": true, "d": "2025-06-01", "j": {"x": 1}, "z": null
        }));
        assert_eq!(types["n"], "integer");
        assert_eq!(types["f"], "float");
        assert_eq!(types["s"], "string");
        assert_eq!(types["b"], "boolean");
        assert_eq!(types["d"], "date");
        assert_eq!(types["j"], "json");
        assert_eq!(types["z"], "unknown");
    }

    #[test]
    fn filter_config_deserializes_from_widget_json() {
        let filters: Vec<WidgetFilter> = serde_json::from_value(json!([
            {"type": "equals", "column": "status", "value": "done"},
            {"type": "date_range", "column": "day", "start_date": "2025-01-01", "end_date": "2025-12-31"}
        ]))
        .unwrap();
        assert_eq!(filters.len(), 2);
    }
}
