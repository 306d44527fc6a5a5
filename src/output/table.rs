use std::borrow::Cow;
use std::collections::HashSet;

use comfy_table::{Table, presets::ASCII_BORDERS_ONLY_CONDENSED};

use super::QueryResult;

/// Maximum width for document columns (spec, status, labels, data)
const MAX_DOCUMENT_WIDTH: usize = 60;

/// Columns that should have width limits in table mode
const WIDE_COLUMNS: &[&str] = &["spec", "status", "labels", "data"];

/// Truncate a string to max_len chars, adding "..." if truncated
fn truncate_value(s: &str, max_len: usize) -> Cow<'_, str> {
    if s.chars().count() <= max_len {
        Cow::Borrowed(s)
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        Cow::Owned(format!("{}...", truncated))
    }
}

pub struct TableFormatter;

impl TableFormatter {
    pub fn format(result: &QueryResult, no_headers: bool) -> String {
        if result.is_empty() {
            return "(no objects)".to_string();
        }

        let mut table = Table::new();
        table.load_preset(ASCII_BORDERS_ONLY_CONDENSED);

        let wide: HashSet<usize> = result
            .columns
            .iter()
            .enumerate()
            .filter(|(_, col)| WIDE_COLUMNS.contains(&col.as_str()))
            .map(|(idx, _)| idx)
            .collect();

        if !no_headers {
            table.set_header(&result.columns);
        }

        for row in &result.rows {
            let cells: Vec<Cow<'_, str>> = row
                .iter()
                .enumerate()
                .map(|(idx, val)| {
                    if wide.contains(&idx) {
                        truncate_value(val, MAX_DOCUMENT_WIDTH)
                    } else {
                        Cow::Borrowed(val.as_str())
                    }
                })
                .collect();
            table.add_row(cells);
        }

        let count = result.row_count();
        let noun = if count == 1 { "object" } else { "objects" };
        format!("{}\n({} {})", table, count, noun)
    }
}
