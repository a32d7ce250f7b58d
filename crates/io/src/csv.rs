// CSV collector: delimiter sniffing, encoding fallback, column type inference

use std::io::Read;
use std::path::Path;

use dbrecon_recon::{Dataset, Value};

use crate::error::SourceError;

/// Read a delimited file into a dataset. The first record is the header.
///
/// With no explicit delimiter the file is sniffed. Each column is typed as a
/// whole: integers if every non-empty cell parses as one, floats if every
/// non-empty cell is a finite number, text otherwise. Empty cells are null.
pub fn read_dataset(path: &Path, delimiter: Option<u8>) -> Result<Dataset, SourceError> {
    let content = read_file_as_utf8(path)?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(content));
    parse_dataset(content, delimiter).map_err(|e| match e {
        ParseError::Csv(source) => SourceError::Csv {
            path: path.to_path_buf(),
            source,
        },
        ParseError::Recon(e) => SourceError::Recon(e),
    })
}

#[derive(Debug)]
enum ParseError {
    Csv(csv::Error),
    Recon(dbrecon_recon::ReconError),
}

fn parse_dataset(content: &str, delimiter: u8) -> Result<Dataset, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let header: Vec<String> = reader
        .headers()
        .map_err(ParseError::Csv)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let width = header.len();

    let mut cells: Vec<Vec<String>> = Vec::new();
    for result in reader.records() {
        let record = result.map_err(ParseError::Csv)?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        // Short rows pad with empties; long rows are rejected by the dataset.
        if row.len() < width {
            row.resize(width, String::new());
        }
        cells.push(row);
    }

    let kinds: Vec<ColumnKind> = (0..width)
        .map(|col| ColumnKind::infer(cells.iter().filter_map(|r| r.get(col)).map(String::as_str)))
        .collect();

    let mut dataset = Dataset::new(header).map_err(ParseError::Recon)?;
    for row in cells {
        let values = row
            .iter()
            .enumerate()
            .map(|(i, cell)| kinds.get(i).copied().unwrap_or(ColumnKind::Text).parse(cell))
            .collect();
        dataset.push_row(values).map_err(ParseError::Recon)?;
    }
    Ok(dataset)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Int,
    Float,
    Text,
}

impl ColumnKind {
    fn infer<'a>(cells: impl Iterator<Item = &'a str>) -> Self {
        let mut kind = ColumnKind::Int;
        let mut seen = false;
        for cell in cells.map(str::trim).filter(|c| !c.is_empty()) {
            seen = true;
            if kind == ColumnKind::Int && cell.parse::<i64>().is_err() {
                kind = ColumnKind::Float;
            }
            if kind == ColumnKind::Float && !cell.parse::<f64>().is_ok_and(f64::is_finite) {
                return ColumnKind::Text;
            }
        }
        // All-empty columns stay text so their nulls never force a numeric type.
        if seen {
            kind
        } else {
            ColumnKind::Text
        }
    }

    fn parse(self, cell: &str) -> Value {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        match self {
            ColumnKind::Int => trimmed.parse().map(Value::Int).unwrap_or_else(|_| Value::text(cell)),
            ColumnKind::Float => trimmed.parse().map(Value::float).unwrap_or_else(|_| Value::text(cell)),
            ColumnKind::Text => Value::text(cell),
        }
    }
}

const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Records checked per candidate after the header.
const SNIFF_RECORDS: usize = 20;

/// Pick the delimiter that splits the header into the most columns while every
/// sampled record keeps that width. Comma wins ties and the no-candidate case.
fn sniff_delimiter(content: &str) -> u8 {
    DELIMITERS
        .into_iter()
        .filter_map(|delimiter| sampled_width(content, delimiter).map(|width| (width, delimiter)))
        .max_by_key(|&(width, delimiter)| (width, delimiter == b','))
        .map_or(b',', |(_, delimiter)| delimiter)
}

/// Header width under `delimiter`, or `None` for a single column or a ragged sample.
fn sampled_width(content: &str, delimiter: u8) -> Option<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());
    let width = reader.headers().ok()?.len();
    if width < 2 {
        return None;
    }
    reader
        .records()
        .take(SNIFF_RECORDS)
        .all(|record| record.is_ok_and(|r| r.len() == width || r.iter().all(str::is_empty)))
        .then_some(width)
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, SourceError> {
    let read_err = |source| SourceError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut file = std::fs::File::open(path).map_err(read_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(read_err)?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            tracing::debug!(path = %path.display(), "not valid UTF-8, decoding as Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(e.as_bytes());
            Ok(decoded.into_owned())
        }
    }
}
