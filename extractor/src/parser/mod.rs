//! Delimited text inputs with encoding and delimiter auto-detection.
//!
//! Three kinds of file are read here:
//!
//! - manual override files (pipe-delimited reference rows)
//! - reference CSVs written by an earlier run (for `reconcile`)
//! - single-series CSV downloads (metadata block, then date/value rows)

use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::Path;
use encoding_rs::{Encoding, UTF_8};
use tracing::{debug, warn};

use crate::error::{CsvError, CsvResult};
use crate::extract::text::{coerce_number, non_blank};
use crate::models::{DataRecord, Frequency, ReferenceEntry};

/// First data row of a series CSV (0-based).
pub const SERIES_DATA_START: usize = 8;

/// Decoded file content with the settings used to read it.
#[derive(Debug, Clone)]
pub struct DecodedText {
    pub content: String,
    pub encoding: String,
    pub delimiter: char,
}

/// A single published series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesData {
    pub title: String,
    /// Four-character series identifier; used as the sheet name of its records.
    pub cdid: String,
    pub dataset_code: String,
    pub records: Vec<DataRecord>,
}

/// Name of the encoding chardet guesses for `bytes`.
///
/// Charset names are resolved through the WHATWG label table, so `ISO-8859-1`
/// reads as `windows-1252`. Plain ASCII and unknown charsets read as UTF-8.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let (charset, confidence, _) = chardet::detect(bytes);
    let encoding = if charset.eq_ignore_ascii_case("ascii") {
        UTF_8
    } else {
        Encoding::for_label(charset.as_bytes()).unwrap_or(UTF_8)
    };
    debug!(%charset, confidence, encoding = encoding.name(), "detected encoding");
    encoding.name().to_string()
}

/// Decode `bytes` with the encoding named by `label`.
///
/// A leading byte order mark wins over `label` and is removed. Bytes the
/// encoding cannot map become U+FFFD.
pub fn decode_content(bytes: &[u8], label: &str) -> String {
    let encoding = Encoding::for_label(label.trim().as_bytes()).unwrap_or(UTF_8);
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        warn!(encoding = used.name(), "input has undecodable bytes");
    }
    text.into_owned()
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Read a file, detecting its encoding and (unless given) its delimiter.
pub fn read_text_auto(path: &Path, delimiter: Option<char>) -> CsvResult<DecodedText> {
    let bytes = std::fs::read(path)?;
    if bytes.is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let encoding = detect_encoding(&bytes);
    let content = decode_content(&bytes, &encoding);
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));

    debug!(path = %path.display(), %encoding, ?delimiter, "decoded input");
    Ok(DecodedText {
        content,
        encoding,
        delimiter,
    })
}

/// Parse reference rows from delimited text with a header row.
///
/// Columns other than `agg_sic_code` may be missing; short rows are padded
/// with empty values and unknown columns are ignored.
pub fn parse_reference_entries(content: &str, delimiter: char) -> CsvResult<Vec<ReferenceEntry>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(CsvError::EmptyFile);
    }
    if !headers.iter().any(|h| h == "agg_sic_code") {
        return Err(CsvError::MissingColumn("agg_sic_code".to_string()));
    }

    let mut entries = Vec::new();
    for result in reader.records() {
        let mut record = result?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        while record.len() < headers.len() {
            record.push_field("");
        }
        entries.push(record.deserialize(Some(&headers))?);
    }
    Ok(entries)
}

/// Read a pipe-delimited manual override file.
pub fn read_overrides(path: &Path) -> CsvResult<Vec<ReferenceEntry>> {
    let text = read_text_auto(path, Some('|'))?;
    parse_reference_entries(&text.content, text.delimiter)
}

/// Read a reference CSV, detecting its delimiter.
pub fn read_reference_csv(path: &Path) -> CsvResult<Vec<ReferenceEntry>> {
    let text = read_text_auto(path, None)?;
    parse_reference_entries(&text.content, text.delimiter)
}

/// Parse a single-series CSV download.
///
/// Layout: B1 title, B2 CDID, B3 source dataset id, then from row
/// [`SERIES_DATA_START`] one `date,value` row per observation.
pub fn parse_series(content: &str, delimiter: char) -> CsvResult<SeriesData> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let rows: Vec<StringRecord> = reader.records().collect::<Result<_, _>>()?;
    if rows.is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let meta = |row: usize, what: &str| -> CsvResult<String> {
        rows.get(row)
            .and_then(|r| non_blank(r.get(1)))
            .map(str::to_string)
            .ok_or_else(|| CsvError::ParseError {
                line: row + 1,
                message: format!("missing {} in column B", what),
            })
    };
    let title = meta(0, "title")?;
    let cdid = meta(1, "CDID")?;
    let dataset_code = meta(2, "dataset id")?;

    let records = rows
        .iter()
        .skip(SERIES_DATA_START)
        .filter_map(|row| {
            let date = non_blank(row.get(0))?;
            let value = row.get(1).and_then(coerce_number)?;
            Some(DataRecord {
                sheet_name: cdid.clone(),
                table_name: String::new(),
                date: date.to_string(),
                value,
                frequency: Frequency::classify(date),
                agg_sic_code: String::new(),
                dataset_code: dataset_code.clone(),
                time_period_description: String::new(),
                note_ref: String::new(),
                average_sales_2022: String::new(),
            })
        })
        .collect();

    Ok(SeriesData {
        title,
        cdid,
        dataset_code,
        records,
    })
}

/// Read a single-series CSV download from disk.
pub fn read_series(path: &Path) -> CsvResult<SeriesData> {
    let text = read_text_auto(path, None)?;
    let series = parse_series(&text.content, text.delimiter)?;
    debug!(cdid = %series.cdid, records = series.records.len(), "series read");
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SERIES: &str = "\"Title\",\"RSI: Value, all retailing\"\n\
\"CDID\",\"J5EK\"\n\
\"Source dataset ID\",\"DRSI\"\n\
\"PreUnit\",\"\"\n\
\"Unit\",\"\"\n\
\"Release date\",\"21-03-2025\"\n\
\"Next release\",\"25 April 2025\"\n\
\"Important notes\",\"\"\n\
\"1986\",\"38.5\"\n\
\"1986 Q1\",\"37.9\"\n\
\"1986 JAN\",\"37.1\"\n\
\"\",\"1\"\n\
\"1986 FEB\",\"x\"\n";

    #[test]
    fn test_detect_delimiter_comma() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
    }

    #[test]
    fn test_detect_delimiter_semicolon() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
    }

    #[test]
    fn test_detect_delimiter_pipe() {
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
    }

    #[test]
    fn test_latin1_decoding() {
        // "£8,500" in ISO-8859-1
        let bytes: &[u8] = &[0xA3, 0x38, 0x2C, 0x35, 0x30, 0x30];
        assert_eq!(decode_content(bytes, "iso-8859-1"), "£8,500");
    }

    #[test]
    fn test_latin1_label_uses_windows_1252() {
        // 0x80 is the euro sign and 0xA4 the currency sign in windows-1252
        let bytes: &[u8] = &[0x80, 0x31, 0x20, 0xA4];
        assert_eq!(decode_content(bytes, "ISO-8859-1"), "€1 ¤");
        assert_eq!(decode_content(bytes, "latin1"), "€1 ¤");
    }

    #[test]
    fn test_unknown_label_reads_as_utf8() {
        assert_eq!(decode_content("£5".as_bytes(), "no-such-charset"), "£5");
    }

    #[test]
    fn test_bom_stripped() {
        let decoded = decode_content("\u{feff}a|b".as_bytes(), "utf-8");
        assert_eq!(decoded, "a|b");
    }

    #[test]
    fn test_detect_ascii_as_utf8() {
        assert_eq!(detect_encoding(b"agg_sic_code|note_ref\nALL|note1\n"), "UTF-8");
    }

    #[test]
    fn test_overrides_missing_columns_tolerated() {
        let content = "agg_sic_code|time_period_description|note_ref\n\
47.3 | Automotive fuel | note7\n\
ALL|All retailing\n\
\n";
        let entries = parse_reference_entries(content, '|').unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].agg_sic_code, "47.3");
        assert_eq!(entries[0].note_ref, "note7");
        assert_eq!(entries[1].note_ref, "");
        assert_eq!(entries[1].sales_in_2022_mln, "");
    }

    #[test]
    fn test_reference_sales_alias() {
        let content = "agg_sic_code,time_period_description,sales_in_2022\nX,Thing,\"1,200\"\n";
        let entries = parse_reference_entries(content, ',').unwrap();
        assert_eq!(entries[0].sales_in_2022_mln, "1,200");
    }

    #[test]
    fn test_reference_without_code_column() {
        let err = parse_reference_entries("description\nx\n", ',').unwrap_err();
        assert!(matches!(err, CsvError::MissingColumn(_)));
    }

    #[test]
    fn test_parse_series() {
        let series = parse_series(SERIES, ',').unwrap();
        assert_eq!(series.title, "RSI: Value, all retailing");
        assert_eq!(series.cdid, "J5EK");
        assert_eq!(series.dataset_code, "DRSI");
        assert_eq!(series.records.len(), 3);
        assert_eq!(series.records[0].frequency, Frequency::Annual);
        assert_eq!(series.records[1].frequency, Frequency::Quarterly);
        assert_eq!(series.records[2].frequency, Frequency::Monthly);
        assert_eq!(series.records[2].sheet_name, "J5EK");
        assert!(series.records.iter().all(|r| r.agg_sic_code.is_empty()));
    }

    #[test]
    fn test_series_missing_cdid() {
        let err = parse_series("\"Title\",\"x\"\n", ',').unwrap_err();
        assert!(matches!(err, CsvError::ParseError { line: 2, .. }));
    }

    #[test]
    fn test_read_series_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SERIES.as_bytes()).unwrap();
        let series = read_series(file.path()).unwrap();
        assert_eq!(series.records.len(), 3);
    }

    #[test]
    fn test_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(read_overrides(file.path()), Err(CsvError::EmptyFile)));
    }
}
