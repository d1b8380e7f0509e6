//! Markdown previews of item tables.

use comfy_table::presets::ASCII_MARKDOWN;
use comfy_table::Table;
use serde_json::Value;

use crate::domain::ItemTable;

/// Render the first `n` rows of `table` as a Markdown table with a leading index column
pub fn table_preview(table: &ItemTable, n: usize) -> String {
    let mut preview = Table::new();
    preview.load_preset(ASCII_MARKDOWN);

    let mut header = vec![String::new()];
    header.extend(table.columns().iter().map(|c| escape(c)));
    preview.set_header(header);

    for (i, row) in table.head(n).rows().enumerate() {
        let mut cells = vec![i.to_string()];
        cells.extend(row.iter().map(|cell| cell.as_ref().map(cell_text).unwrap_or_default()));
        preview.add_row(cells);
    }

    preview.to_string()
}

fn cell_text(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    escape(&text)
}

fn escape(text: &str) -> String {
    text.replace('|', "\\|").replace(['\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> ItemTable {
        let records = (0..8)
            .map(|i| {
                json!({"id": i, "title": format!("story | {}", i)})
                    .as_object()
                    .cloned()
                    .unwrap()
            })
            .collect();
        ItemTable::from_records(records).unwrap()
    }

    #[test]
    fn test_preview_is_limited_to_head() {
        let preview = table_preview(&table(), 5);
        // header, separator, five rows
        assert_eq!(preview.lines().count(), 7);
        assert!(preview.contains("title"));
        assert!(preview.contains("story \\| 4"));
        assert!(!preview.contains("story \\| 5"));
    }

    #[test]
    fn test_preview_of_empty_table() {
        let preview = table_preview(&ItemTable::default(), 5);
        assert!(preview.starts_with('|'));
        assert!(preview.lines().count() <= 2);
    }

    #[test]
    fn test_missing_cells_are_blank() {
        let records = vec![
            json!({"id": 1, "title": "a"}).as_object().cloned().unwrap(),
            json!({"id": 2}).as_object().cloned().unwrap(),
        ];
        let preview = table_preview(&ItemTable::from_records(records).unwrap(), 5);
        assert!(!preview.contains("null"));
    }
}
