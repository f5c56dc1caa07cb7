//! Markdown table rendering

use serde_json::Value;

/// Escape text for a Markdown table cell: pipes are escaped, newlines
/// become spaces.
#[must_use]
pub fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Cell text for a value: absent/null is blank, strings are unquoted.
#[must_use]
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// True for values that belong in the metrics table.
#[must_use]
pub const fn is_scalar(value: &Value) -> bool {
    matches!(
        value,
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_)
    )
}

/// Two-column `| Field | Value |` table.
#[must_use]
pub fn render_kv_table<'a, I>(rows: I) -> String
where
    I: IntoIterator<Item = (&'a str, Option<&'a Value>)>,
{
    let mut out = vec!["| Field | Value |".to_string(), "|---|---|".to_string()];
    for (key, value) in rows {
        out.push(format!(
            "| {} | {} |",
            escape_cell(key),
            escape_cell(&cell_text(value))
        ));
    }
    out.join("\n")
}

/// Metrics table: scalar entries only, sorted by key.
#[must_use]
pub fn render_metrics_table(metrics: &serde_json::Map<String, Value>) -> String {
    let mut rows: Vec<(&str, Option<&Value>)> = metrics
        .iter()
        .filter(|(_, v)| is_scalar(v))
        .map(|(k, v)| (k.as_str(), Some(v)))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(b.0));
    render_kv_table(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape_cell() {
        assert_eq!(escape_cell("a|b\nc"), "a\\|b c");
        assert_eq!(escape_cell("x\r\ny"), "x y");
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(None), "");
        assert_eq!(cell_text(Some(&Value::Null)), "");
        assert_eq!(cell_text(Some(&json!("run"))), "run");
        assert_eq!(cell_text(Some(&json!(0.5))), "0.5");
        assert_eq!(cell_text(Some(&json!(false))), "false");
    }

    #[test]
    fn test_metrics_table_scalars_sorted() {
        let metrics = json!({
            "n_test": 30,
            "accuracy": 0.9,
            "confusion_matrix": [[1, 0], [0, 1]],
            "note": "a|b",
            "extra": {"k": 1},
            "missing": null
        });
        let table = render_metrics_table(metrics.as_object().unwrap());
        assert_eq!(
            table,
            "| Field | Value |\n|---|---|\n| accuracy | 0.9 |\n| missing |  |\n| n_test | 30 |\n| note | a\\|b |"
        );
    }
}
