use crate::core::cell::CellRef;
use crate::domain::ports::AssetSource;
use crate::utils::error::Result;
use regex::Regex;
use std::sync::LazyLock;

static NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("number pattern is valid"));

/// Cells whose value is fixed in the workbook rather than read from the export.
const SHEET_OVERRIDES: &[(&str, f64)] = &[("H20", 0.0), ("H21", 3000.0)];

/// Extracts the first number in a cell's text, ignoring thousands separators
/// and surrounding units (`"1,250 kcal"` reads as 1250).
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let without_commas = trimmed.replace(',', "");
    NUMBER_PATTERN
        .find(&without_commas)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Counts the empty lines starting at byte `start`; the csv reader skips
/// these silently before the next record.
fn blank_lines(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    // LF that completes the previous record's CRLF
    if i > 0 && bytes.get(i - 1) == Some(&b'\r') && bytes.get(i) == Some(&b'\n') {
        i += 1;
    }
    let mut count = 0;
    while let Some(&b) = bytes.get(i) {
        match b {
            b'\n' => i += 1,
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => i += 2,
            b'\r' => i += 1,
            _ => break,
        }
        count += 1;
    }
    count
}

/// The CSV export of the formulation workbook, held in memory read-only.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn from_reader<R: std::io::Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Parses the export, keeping blank lines as empty rows so row numbers
    /// match the workbook.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);

        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut record = csv::StringRecord::new();
        loop {
            let start = csv_reader.position().byte() as usize;
            let more = csv_reader.read_record(&mut record)?;
            rows.extend(std::iter::repeat_with(Vec::new).take(blank_lines(bytes, start)));
            if !more {
                break;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self { rows })
    }

    pub async fn load<A: AssetSource>(assets: &A, path: &str) -> Result<Self> {
        let bytes = assets.read_file(path).await?;
        Self::from_bytes(&bytes)
    }

    /// Loads the sheet, falling back to an empty one so the server can still
    /// report the problem on `/` and `/health`.
    pub async fn load_or_empty<A: AssetSource>(assets: &A, path: &str) -> Self {
        match Self::load(assets, path).await {
            Ok(sheet) => {
                tracing::info!("✓ CSV loaded successfully: {} rows", sheet.row_count());
                sheet
            }
            Err(e) => {
                tracing::error!("✗ Error loading CSV {}: {}", path, e);
                tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
                Self::empty()
            }
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_loaded(&self) -> bool {
        !self.rows.is_empty()
    }

    pub fn raw(&self, cell: &CellRef) -> Option<&str> {
        let (row, col) = cell.csv_position();
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
    }

    /// Numeric value of a cell; blank, textual or missing cells read as 0.
    pub fn value(&self, cell: &CellRef) -> f64 {
        let name = cell.to_string();
        if let Some((_, fixed)) = SHEET_OVERRIDES.iter().find(|(c, _)| *c == name) {
            return *fixed;
        }
        self.raw(cell).and_then(parse_number).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(s: &str) -> CellRef {
        CellRef::parse(s).unwrap()
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number("  -3.5 "), Some(-3.5));
        assert_eq!(parse_number("1,250 kcal"), Some(1250.0));
        assert_eq!(parse_number("12%"), Some(12.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("   "), None);
        assert_eq!(parse_number("n/a"), None);
    }

    #[test]
    fn test_value_maps_through_header_row_and_column() {
        let csv = "hdr,A,B,C\n1,x,y,z\n2,a,10,8.5\n3,b,\"1,000\",text\n";
        let sheet = Sheet::from_reader(csv.as_bytes()).unwrap();

        assert_eq!(sheet.row_count(), 4);
        assert_eq!(sheet.value(&cell("B2")), 10.0);
        assert_eq!(sheet.value(&cell("C2")), 8.5);
        assert_eq!(sheet.value(&cell("B3")), 1000.0);
        assert_eq!(sheet.value(&cell("C3")), 0.0);
        assert_eq!(sheet.value(&cell("Z90")), 0.0);
    }

    #[test]
    fn test_overrides_take_precedence() {
        let sheet = Sheet::empty();
        assert_eq!(sheet.value(&cell("H21")), 3000.0);
        assert_eq!(sheet.value(&cell("H20")), 0.0);
        assert!(!sheet.is_loaded());
    }

    #[test]
    fn test_blank_lines_keep_their_row() {
        let sheet = Sheet::from_reader("hdr,A,B\n1,x,5\n\n3,y,7\n".as_bytes()).unwrap();
        assert_eq!(sheet.row_count(), 4);
        assert_eq!(sheet.value(&cell("B1")), 5.0);
        assert_eq!(sheet.raw(&cell("A2")), None);
        assert_eq!(sheet.value(&cell("B3")), 7.0);

        let crlf = Sheet::from_reader("hdr,A,B\r\n1,x,5\r\n\r\n\r\n4,z,9\r\n".as_bytes()).unwrap();
        assert_eq!(crlf.row_count(), 5);
        assert_eq!(crlf.value(&cell("B4")), 9.0);

        let leading_and_trailing = Sheet::from_reader("\nhdr,A\n1,x\n\n".as_bytes()).unwrap();
        assert_eq!(leading_and_trailing.row_count(), 4);
        assert_eq!(leading_and_trailing.raw(&cell("A2")), Some("x"));
    }

    #[test]
    fn test_quoted_newlines_are_not_blank_lines() {
        let sheet = Sheet::from_reader("hdr,A\n1,\"two\n\nlines\"\n2,8\n".as_bytes()).unwrap();
        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.raw(&cell("A1")), Some("two\n\nlines"));
        assert_eq!(sheet.value(&cell("A2")), 8.0);
    }

    #[test]
    fn test_flexible_row_widths() {
        let csv = "a\nb,c,d,e,f\n,\n";
        let sheet = Sheet::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.raw(&cell("C1")), Some("e"));
        assert_eq!(sheet.raw(&cell("C2")), None);
    }
}
