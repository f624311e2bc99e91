use crate::error::{ExgError, Result};
use crate::table::{Cell, Column, Table};
use ::csv::ReaderBuilder;
use log::{debug, warn};
use std::collections::HashSet;
use std::path::Path;

/// Read a recording CSV from disk. Invalid UTF-8 sequences are dropped rather than
/// failing the read.
pub fn read_recording_csv(path: &Path) -> Result<Table> {
    let bytes = std::fs::read(path).map_err(|e| ExgError::io(path, e))?;
    let text: String = bytes.utf8_chunks().map(|chunk| chunk.valid()).collect();
    parse_recording_csv(&text)
}

/// Remove lines whose first non-whitespace character is `#`, wherever they occur.
pub fn strip_comment_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        if line.trim_start().starts_with('#') {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Parse CSV text (comments allowed) into a column-major `Table`. The first
/// non-comment line is the header.
pub fn parse_recording_csv(text: &str) -> Result<Table> {
    let cleaned = strip_comment_lines(text.trim_start_matches('\u{feff}'));
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(cleaned.as_bytes());
    let headers = reader.headers()?.clone();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ExgError::MissingHeader);
    }
    let names = normalize_headers(headers.iter());
    let mut cells: Vec<Vec<Cell>> = vec![Vec::new(); names.len()];
    let mut ragged = 0usize;
    for record in reader.records() {
        let record = record?;
        if record.len() != names.len() {
            ragged += 1;
        }
        for (idx, column) in cells.iter_mut().enumerate() {
            column.push(record.get(idx).map(Cell::parse).unwrap_or(Cell::Missing));
        }
    }
    if ragged > 0 {
        warn!(
            "{} row(s) did not have {} fields; short rows were padded and long rows truncated",
            ragged,
            names.len()
        );
    }
    let columns: Vec<Column> = names
        .into_iter()
        .zip(cells)
        .map(|(name, cells)| Column::new(name, cells))
        .collect();
    let table = Table::new(columns);
    debug!(
        "parsed {} columns x {} rows",
        table.columns().len(),
        table.row_count()
    );
    Ok(table)
}

/// Give blank headers an `Unnamed: <idx>` label and suffix repeats with `.1`, `.2`, ...
fn normalize_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (idx, header) in raw.enumerate() {
        let base = if header.trim().is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            header.to_string()
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", base, n);
            n += 1;
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn skips_comment_lines_anywhere() {
        let text = "# device: demo\nTime,Fz\n0.0,1\n  #note\n0.1,2\n# trailing\n0.2,3\n";
        let table = parse_recording_csv(text).unwrap();
        assert_eq!(table.column_names(), vec!["Time", "Fz"]);
        assert_eq!(table.row_count(), 3);
        assert_eq!(
            table.column("Fz").unwrap().to_numeric(),
            vec![Some(1.0), Some(2.0), Some(3.0)]
        );
    }

    #[test]
    fn ragged_rows_are_not_fatal() {
        let text = "a,b,c\n1,2\n4,5,6,7\n";
        let table = parse_recording_csv(text).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("c").unwrap().cells[0], Cell::Missing);
        assert_eq!(table.column("c").unwrap().cells[1], Cell::Number(6.0));
    }

    #[test]
    fn normalizes_blank_and_duplicate_headers() {
        let table = parse_recording_csv("Fz,,Fz,Fz\n1,2,3,4\n").unwrap();
        assert_eq!(table.column_names(), vec!["Fz", "Unnamed: 1", "Fz.1", "Fz.2"]);
    }

    #[test]
    fn empty_input_has_no_header() {
        let err = parse_recording_csv("# only comments\n").unwrap_err();
        assert!(matches!(err, ExgError::MissingHeader));
    }

    #[test]
    fn drops_invalid_utf8_bytes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Time,F\xffz\n0,1\n1,2\n").unwrap();
        let table = read_recording_csv(file.path()).unwrap();
        assert_eq!(table.column_names(), vec!["Time", "Fz"]);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = read_recording_csv(Path::new("/nonexistent/recording.csv")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/recording.csv"));
    }

    #[test]
    fn reads_sample_recording() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .and_then(|p| p.parent())
            .expect("workspace root")
            .join("test_data/quasar_sample.csv");
        let table = read_recording_csv(&path).expect("read sample");
        assert_eq!(table.row_count(), 12);
        assert!(table.column("Trigger").is_some());
    }
}
