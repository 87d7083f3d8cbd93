use anyhow::{Context, Result};
use std::path::Path;

/// One data line of a TSV file, keyed by header, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    /// Build a row from (header, value) pairs. A repeated header keeps its
    /// first position and takes the later value.
    pub fn new(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut cells: Vec<(String, String)> = Vec::new();
        for (header, value) in pairs {
            match cells.iter_mut().find(|(h, _)| *h == header) {
                Some(cell) => cell.1 = value,
                None => cells.push((header, value)),
            }
        }
        Self { cells }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(h, v)| (h.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

/// Parse tab-separated text. The first record is the header.
///
/// Quoted cells are unquoted and may span lines. Short records leave their
/// trailing columns absent; cells past the last header are dropped. Empty
/// lines are ignored.
pub fn parse(contents: &str) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(contents.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read TSV header")?
        .iter()
        .map(String::from)
        .collect();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read TSV record {}", i + 1))?;
        let pairs = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()));
        rows.push(Row::new(pairs));
    }

    Ok(Table { headers, rows })
}

pub fn read_file(path: &Path) -> Result<Table> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read TSV from {}", path.display()))?;
    parse(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_header_and_rows() {
        let table = parse("issue\tPROJECT_FIELD_Status\n10\tOpen\n11\tClosed\n").unwrap();
        assert_eq!(table.headers, vec!["issue", "PROJECT_FIELD_Status"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("issue"), Some("10"));
        assert_eq!(table.rows[1].get("PROJECT_FIELD_Status"), Some("Closed"));
    }

    #[test]
    fn preserves_column_order() {
        let table = parse("c\ta\tb\n1\t2\t3\n").unwrap();
        let order: Vec<&str> = table.rows[0].iter().map(|(h, _)| h).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn short_rows_leave_columns_absent() {
        let table = parse("a\tb\tc\n1\t2\n").unwrap();
        assert_eq!(table.rows[0].get("b"), Some("2"));
        assert_eq!(table.rows[0].get("c"), None);
    }

    #[test]
    fn extra_cells_are_dropped() {
        let table = parse("a\n1\t2\t3\n").unwrap();
        assert_eq!(table.rows[0].iter().count(), 1);
    }

    #[test]
    fn handles_crlf_and_blank_lines() {
        let table = parse("a\tb\r\n1\t2\r\n\r\n3\t4\r\n").unwrap();
        assert_eq!(table.headers, vec!["a", "b"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("b"), Some("2"));
        assert_eq!(table.rows[1].get("a"), Some("3"));
    }

    #[test]
    fn quoted_cells_are_unquoted() {
        let table = parse("issue_number\tPROJECT_FIELD_Status\n10\t\"Closed\"\n").unwrap();
        assert_eq!(table.rows[0].get("PROJECT_FIELD_Status"), Some("Closed"));
    }

    #[test]
    fn quoted_cell_may_span_lines() {
        let table = parse("issue_number\tPROJECT_FIELD_Notes\n10\t\"a\nb\"\n11\tc\n").unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("PROJECT_FIELD_Notes"), Some("a\nb"));
        assert_eq!(table.rows[1].get("issue_number"), Some("11"));
    }

    #[test]
    fn quoted_cell_keeps_tabs_and_doubled_quotes() {
        let table = parse("a\tb\n\"x\ty\"\t\"say \"\"hi\"\"\"\n").unwrap();
        assert_eq!(table.rows[0].get("a"), Some("x\ty"));
        assert_eq!(table.rows[0].get("b"), Some("say \"hi\""));
    }

    #[test]
    fn repeated_header_takes_last_value() {
        let table = parse("a\tPROJECT_FIELD_S\tPROJECT_FIELD_S\n1\tfirst\tsecond\n").unwrap();
        let row = &table.rows[0];
        assert_eq!(row.get("PROJECT_FIELD_S"), Some("second"));
        let headers: Vec<&str> = row.iter().map(|(h, _)| h).collect();
        assert_eq!(headers, vec!["a", "PROJECT_FIELD_S"]);
    }

    #[test]
    fn empty_input_is_empty_table() {
        let table = parse("").unwrap();
        assert!(table.headers.is_empty());
        assert!(table.rows.is_empty());
    }

    #[test]
    fn empty_cells_are_kept_as_empty_strings() {
        let table = parse("a\tb\n\t2\n").unwrap();
        assert_eq!(table.rows[0].get("a"), Some(""));
    }

    #[test]
    fn reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "issue_number\tPROJECT_FIELD_Due\n7\t2025-08-04\n").unwrap();
        let table = read_file(file.path()).unwrap();
        assert_eq!(table.rows[0].get("PROJECT_FIELD_Due"), Some("2025-08-04"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = read_file(Path::new("/nonexistent/boardsync.tsv"));
        assert!(result.unwrap_err().to_string().contains("Failed to read TSV"));
    }
}
