//! CSV, JSON and fixed-width table output

use crate::error::{CollectionError, Result};
use serde::Serialize;

/// Serialize rows as CSV with a header row taken from the field names.
/// Fields are quoted only when they contain a delimiter, quote or newline.
pub fn to_csv<T: Serialize>(rows: &[T]) -> Result<String> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(vec![]);
    for row in rows {
        wtr.serialize(row)?;
    }
    let data = wtr
        .into_inner()
        .map_err(|e| CollectionError::Io(e.into_error()))?;
    String::from_utf8(data).map_err(|e| CollectionError::InvalidInput(e.to_string()))
}

/// CSV from an explicit header row and string records
pub fn records_to_csv(headers: &[&str], records: &[Vec<String>]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(headers)?;
    for record in records {
        wtr.write_record(record)?;
    }
    let data = wtr
        .into_inner()
        .map_err(|e| CollectionError::Io(e.into_error()))?;
    String::from_utf8(data).map_err(|e| CollectionError::InvalidInput(e.to_string()))
}

/// Pretty-printed JSON terminated by a newline
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Column-aligned text table with a dashed rule under the header
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    aligns: Vec<Align>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: &[(&str, Align)]) -> Self {
        Self {
            headers: columns.iter().map(|(h, _)| h.to_string()).collect(),
            aligns: columns.iter().map(|(_, a)| *a).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; missing trailing cells render empty, extra cells are dropped
    pub fn push(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let widths: Vec<usize> = (0..self.headers.len())
            .map(|col| {
                self.rows
                    .iter()
                    .map(|row| row[col].chars().count())
                    .chain(std::iter::once(self.headers[col].chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let render_row = |values: &[String]| -> String {
            values
                .iter()
                .enumerate()
                .map(|(col, value)| pad(value, widths[col], self.aligns[col]))
                .collect::<Vec<_>>()
                .join("  ")
        };

        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        let mut lines = vec![render_row(&self.headers), render_row(&rule)];
        lines.extend(self.rows.iter().map(|row| render_row(row)));
        lines.join("\n")
    }
}

fn pad(value: &str, width: usize, align: Align) -> String {
    match align {
        Align::Left => format!("{:<width$}", value),
        Align::Right => format!("{:>width$}", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        arena_id: u32,
        name: String,
        set: Option<String>,
    }

    #[test]
    fn csv_quotes_only_when_needed() {
        let rows = vec![
            Row {
                arena_id: 1,
                name: "Opt".to_string(),
                set: Some("XLN".to_string()),
            },
            Row {
                arena_id: 2,
                name: "Fire, Ice".to_string(),
                set: None,
            },
        ];
        assert_eq!(
            to_csv(&rows).unwrap(),
            "arena_id,name,set\n1,Opt,XLN\n2,\"Fire, Ice\",\n"
        );
    }

    #[test]
    fn records_keep_given_headers() {
        let records = vec![vec!["Mono Red".to_string(), "3".to_string()]];
        assert_eq!(
            records_to_csv(&["deck", "Matches"], &records).unwrap(),
            "deck,Matches\nMono Red,3\n"
        );
        assert_eq!(records_to_csv(&["deck"], &[]).unwrap(), "deck\n");
    }

    #[test]
    fn json_is_pretty_with_newline() {
        let out = to_json(&serde_json::json!({"a": 1})).unwrap();
        assert_eq!(out, "{\n  \"a\": 1\n}\n");
    }

    #[test]
    fn table_aligns_columns() {
        let mut table = Table::new(&[("Name", Align::Left), ("Count", Align::Right)]);
        table.push(vec!["Island".to_string(), "4".to_string()]);
        table.push(vec!["Bolt".to_string()]);
        assert_eq!(
            table.render(),
            "Name    Count\n------  -----\nIsland      4\nBolt         "
        );
    }
}
