//! Newline-delimited JSON codec for record files.
//!
//! One record per line. Reading is lenient: a line that does not parse is
//! logged and skipped so one bad line never hides the rest of the file.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

use super::error::CatalogResult;

/// Result of decoding a record file.
#[derive(Debug)]
pub struct Decoded<T> {
    pub records: Vec<T>,
    /// Number of non-blank lines that failed to parse.
    pub skipped: usize,
}

/// Serializes `record` as a single line, including the trailing newline.
pub fn encode_line<T: Serialize>(record: &T) -> CatalogResult<String> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    Ok(line)
}

/// Serializes every record, one per line.
pub fn encode_lines<T: Serialize>(records: &[T]) -> CatalogResult<String> {
    let mut out = String::new();
    for record in records {
        out.push_str(&encode_line(record)?);
    }
    Ok(out)
}

/// Parses `text` line by line. `source` is only used in log messages.
pub fn decode_lines<T: DeserializeOwned>(text: &str, source: &Path) -> Decoded<T> {
    let mut records = Vec::new();
    let mut skipped = 0;

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(line) {
            Ok(record) => records.push(record),
            Err(err) => {
                skipped += 1;
                warn!(
                    "Skipping malformed record at {}:{}: {}",
                    source.display(),
                    index + 1,
                    err
                );
            }
        }
    }

    Decoded { records, skipped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: String,
        n: u32,
    }

    fn row(id: &str, n: u32) -> Row {
        Row {
            id: id.to_string(),
            n,
        }
    }

    #[test]
    fn test_encode_line_is_single_line() {
        let line = encode_line(&row("a", 1)).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn test_decode_skips_malformed_lines() {
        let text = "{\"id\":\"a\",\"n\":1}\nnot json\n{\"id\":\"b\"}\n{\"id\":\"c\",\"n\":3}\n";
        let decoded: Decoded<Row> = decode_lines(text, Path::new("rows.jsonl"));
        assert_eq!(decoded.records, vec![row("a", 1), row("c", 3)]);
        assert_eq!(decoded.skipped, 2);
    }

    #[test]
    fn test_decode_ignores_blank_lines_and_crlf() {
        let text = "\n{\"id\":\"a\",\"n\":1}\r\n   \n{\"id\":\"b\",\"n\":2}";
        let decoded: Decoded<Row> = decode_lines(text, Path::new("rows.jsonl"));
        assert_eq!(decoded.records, vec![row("a", 1), row("b", 2)]);
        assert_eq!(decoded.skipped, 0);
    }

    #[test]
    fn test_encode_lines_then_decode() {
        let rows = vec![row("x", 7), row("y", 8)];
        let text = encode_lines(&rows).unwrap();
        let decoded: Decoded<Row> = decode_lines(&text, Path::new("rows.jsonl"));
        assert_eq!(decoded.records, rows);
    }
}
