use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type,
    Int8Type, TimeUnit, TimestampMicrosecondType, TimestampMillisecondType,
    TimestampNanosecondType, TimestampSecondType, UInt16Type, UInt32Type, UInt8Type,
};
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use regex::Regex;
use serde_json::Value as JsonValue;

use super::model::{CellValue, Column, DType, Table};
use crate::config::SourceConfig;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Fetch the remote spreadsheet once and parse it as a table.
///
/// Google Sheets edit links are rewritten to their CSV export; any other URL
/// is expected to serve CSV directly.
pub fn fetch_sheet(source: &SourceConfig) -> Result<Table> {
    let csv_url = sheet_csv_url(&source.url);
    log::info!("Fetching spreadsheet from {csv_url}");

    let response = reqwest::blocking::get(&csv_url)
        .with_context(|| format!("requesting {csv_url}"))?
        .error_for_status()
        .context("spreadsheet request failed")?;
    let body = response.bytes().context("reading spreadsheet body")?;

    read_csv(body.as_ref(), source)
}

/// Load a table from a local file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – same layout as the spreadsheet export
/// * `.json`    – `[{ "Player": "...", "Age": 25, ... }, ...]`
/// * `.parquet` – any flat schema
pub fn load_file(path: &Path, source: &SourceConfig) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => {
            let file = std::fs::File::open(path).context("opening CSV file")?;
            read_csv(file, source)
        }
        "json" => load_json(path, source),
        "parquet" | "pq" => load_parquet(path, source),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

/// Rewrite a Google Sheets link to its CSV export URL, keeping the `gid`
/// of the selected worksheet. Other URLs are returned unchanged.
pub fn sheet_csv_url(url: &str) -> String {
    let Ok(doc_re) = Regex::new(r"^https?://docs\.google\.com/spreadsheets/d/([^/?#]+)") else {
        return url.to_string();
    };
    let Some(doc) = doc_re.captures(url) else {
        return url.to_string();
    };
    let mut export = format!(
        "https://docs.google.com/spreadsheets/d/{}/export?format=csv",
        &doc[1]
    );
    if let Some(gid) = Regex::new(r"[#?&]gid=(\d+)")
        .ok()
        .and_then(|re| re.captures(url))
    {
        export.push_str("&gid=");
        export.push_str(&gid[1]);
    }
    export
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: `header_row` lines to skip, then the header row, then data.
/// Column `index_col` (if set) becomes the table index.
pub fn read_csv<R: Read>(reader: R, source: &SourceConfig) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = reader.records().enumerate().skip(source.header_row);

    let headers: Vec<String> = match records.next() {
        Some((_, header)) => header
            .context("reading CSV header")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect(),
        None => bail!("CSV has no header row (expected at line {})", source.header_row + 1),
    };
    let headers = dedupe_headers(headers);

    let mut columns: Vec<Vec<CellValue>> = vec![Vec::new(); headers.len()];
    for (row_no, result) in records {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() > headers.len() {
            bail!(
                "CSV row {row_no}: {} fields but only {} columns",
                record.len(),
                headers.len()
            );
        }
        for (col_idx, cells) in columns.iter_mut().enumerate() {
            cells.push(guess_cell_type(record.get(col_idx).unwrap_or("")));
        }
    }

    let named: Vec<(String, Vec<CellValue>)> = headers.into_iter().zip(columns).collect();
    build_table(named, source.index_col, source)
}

/// Blank headers become `Unnamed: <n>`, repeated ones get a `.1`, `.2` suffix.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    headers
        .into_iter()
        .enumerate()
        .map(|(i, h)| {
            let base = if h.is_empty() { format!("Unnamed: {i}") } else { h };
            let mut name = base.clone();
            let mut n = 1;
            while !seen.insert(name.clone()) {
                name = format!("{base}.{n}");
                n += 1;
            }
            name
        })
        .collect()
}

fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    match s {
        "true" | "TRUE" | "True" => CellValue::Bool(true),
        "false" | "FALSE" | "False" => CellValue::Bool(false),
        _ => CellValue::String(s.to_string()),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Player": "Nikola Jokic", "Type": "RS", "Age": 27, "eRT": 12.1 },
///   ...
/// ]
/// ```
///
/// Keys missing from a record are null.
fn load_json(path: &Path, source: &SourceConfig) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    read_json(&text, source)
}

fn read_json(text: &str, source: &SourceConfig) -> Result<Table> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut names: Vec<String> = Vec::new();
    let mut columns: BTreeMap<String, Vec<CellValue>> = BTreeMap::new();

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for (key, val) in obj {
            let cells = columns.entry(key.clone()).or_insert_with(|| {
                names.push(key.clone());
                vec![CellValue::Null; i]
            });
            cells.push(json_to_cell(val));
        }
        for cells in columns.values_mut() {
            if cells.len() == i {
                cells.push(CellValue::Null);
            }
        }
    }

    let named = names
        .into_iter()
        .map(|name| {
            let cells = columns.remove(&name).unwrap_or_default();
            (name, cells)
        })
        .collect();
    build_table(named, None, source)
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet file. Works with files written by both **Pandas**
/// (`df.to_parquet()`) and **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path, source: &SourceConfig) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut columns: Vec<Vec<CellValue>> = vec![Vec::new(); names.len()];
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for (col_idx, cells) in columns.iter_mut().enumerate() {
            let array = batch.column(col_idx);
            for row in 0..batch.num_rows() {
                cells.push(
                    extract_cell_value(array, row)
                        .with_context(|| format!("Row {row}: failed to read '{}'", names[col_idx]))?,
                );
            }
        }
    }

    build_table(names.into_iter().zip(columns).collect(), None, source)
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell_value(col: &Arc<dyn Array>, row: usize) -> Result<CellValue> {
    if col.is_null(row) {
        return Ok(CellValue::Null);
    }
    let value = match col.data_type() {
        DataType::Utf8 => CellValue::String(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => CellValue::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Boolean => CellValue::Bool(col.as_boolean().value(row)),
        DataType::Int8 => CellValue::Integer(col.as_primitive::<Int8Type>().value(row) as i64),
        DataType::Int16 => CellValue::Integer(col.as_primitive::<Int16Type>().value(row) as i64),
        DataType::Int32 => CellValue::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => CellValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => CellValue::Integer(col.as_primitive::<UInt8Type>().value(row) as i64),
        DataType::UInt16 => CellValue::Integer(col.as_primitive::<UInt16Type>().value(row) as i64),
        DataType::UInt32 => CellValue::Integer(col.as_primitive::<UInt32Type>().value(row) as i64),
        DataType::Float32 => CellValue::Float(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => CellValue::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Date32 => datetime_cell(col.as_primitive::<Date32Type>().value_as_datetime(row)),
        DataType::Date64 => datetime_cell(col.as_primitive::<Date64Type>().value_as_datetime(row)),
        DataType::Timestamp(unit, _) => datetime_cell(match unit {
            TimeUnit::Second => col
                .as_primitive::<TimestampSecondType>()
                .value_as_datetime(row),
            TimeUnit::Millisecond => col
                .as_primitive::<TimestampMillisecondType>()
                .value_as_datetime(row),
            TimeUnit::Microsecond => col
                .as_primitive::<TimestampMicrosecondType>()
                .value_as_datetime(row),
            TimeUnit::Nanosecond => col
                .as_primitive::<TimestampNanosecondType>()
                .value_as_datetime(row),
        }),
        _ => CellValue::String(array_value_to_string(col, row)?),
    };
    Ok(value)
}

fn datetime_cell(dt: Option<chrono::NaiveDateTime>) -> CellValue {
    dt.map_or(CellValue::Null, CellValue::DateTime)
}

// ---------------------------------------------------------------------------
// Shared table assembly
// ---------------------------------------------------------------------------

/// Turn named cell vectors into a [`Table`], pulling out the index column and
/// applying the declared categorical columns.
fn build_table(
    named: Vec<(String, Vec<CellValue>)>,
    index_col: Option<usize>,
    source: &SourceConfig,
) -> Result<Table> {
    let mut index = None;
    let mut columns = Vec::with_capacity(named.len());

    for (i, (name, cells)) in named.into_iter().enumerate() {
        let mut column = Column::new(name, cells);
        if source.categorical_columns.contains(&column.name) {
            column = column.with_dtype(DType::Categorical);
        }
        if index_col == Some(i) {
            index = Some(column);
        } else {
            columns.push(column);
        }
    }

    for declared in &source.categorical_columns {
        if !columns.iter().any(|c| &c.name == declared) {
            log::warn!("declared categorical column '{declared}' is not in the table");
        }
    }

    let table = Table::new(columns)?;
    match index {
        Some(ix) => Ok(table.with_index(ix)?),
        None => Ok(table),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SourceConfig {
        SourceConfig {
            url: String::new(),
            header_row: 1,
            index_col: Some(0),
            categorical_columns: vec!["Type".into()],
        }
    }

    const SHEET: &str = "\
NBA eRaptor,,,,,
ID,Player,Type,Age,eRT,
0,Nikola Jokic,RS,22,1.5,
1,Nikola Jokic,PO,22,,
2,Stephen Curry,RS,30,8,x
";

    #[test]
    fn reads_sheet_layout() {
        let table = read_csv(SHEET.as_bytes(), &source()).unwrap();

        assert_eq!(
            table.column_names(),
            vec!["Player", "Type", "Age", "eRT", "Unnamed: 5"]
        );
        assert_eq!(table.n_rows(), 3);

        let index = table.index.as_ref().unwrap();
        assert_eq!(index.name, "ID");
        assert_eq!(index.values[2], CellValue::Integer(2));

        assert_eq!(table.column("Type").unwrap().dtype, DType::Categorical);
        assert_eq!(table.column("Age").unwrap().dtype, DType::Integer);

        let ert = table.column("eRT").unwrap();
        assert_eq!(ert.dtype, DType::Float);
        assert_eq!(
            ert.values,
            vec![CellValue::Float(1.5), CellValue::Null, CellValue::Float(8.0)]
        );
    }

    #[test]
    fn missing_header_is_an_error() {
        let err = read_csv("only a title\n".as_bytes(), &source()).unwrap_err();
        assert!(err.to_string().contains("no header row"));
    }

    #[test]
    fn too_many_fields_is_an_error() {
        let csv = "title\nA,B\n1,2,3\n";
        assert!(read_csv(csv.as_bytes(), &source()).is_err());
    }

    #[test]
    fn duplicate_headers_are_suffixed() {
        let names = dedupe_headers(vec!["Age".into(), "Age".into(), String::new(), "Age".into()]);
        assert_eq!(names, vec!["Age", "Age.1", "Unnamed: 2", "Age.2"]);
    }

    #[test]
    fn cell_type_guessing() {
        assert_eq!(guess_cell_type(""), CellValue::Null);
        assert_eq!(guess_cell_type("23"), CellValue::Integer(23));
        assert_eq!(guess_cell_type("-1.25"), CellValue::Float(-1.25));
        assert_eq!(guess_cell_type("TRUE"), CellValue::Bool(true));
        assert_eq!(guess_cell_type(" DEN "), CellValue::String("DEN".into()));
    }

    #[test]
    fn json_records_with_missing_keys() {
        let text = r#"[
            {"Player": "Jokic", "Age": 27},
            {"Player": "Curry"},
            {"Player": "Doncic", "Age": 23, "Team": "DAL"}
        ]"#;
        let table = read_json(text, &source()).unwrap();
        assert_eq!(table.n_rows(), 3);
        assert!(table.index.is_none());
        assert_eq!(
            table.column("Age").unwrap().values,
            vec![CellValue::Integer(27), CellValue::Null, CellValue::Integer(23)]
        );
        assert_eq!(
            table.column("Team").unwrap().values,
            vec![CellValue::Null, CellValue::Null, CellValue::String("DAL".into())]
        );
    }

    #[test]
    fn google_sheet_links_become_csv_exports() {
        let url = "https://docs.google.com/spreadsheets/d/abc123/edit#gid=1113356622";
        assert_eq!(
            sheet_csv_url(url),
            "https://docs.google.com/spreadsheets/d/abc123/export?format=csv&gid=1113356622"
        );
        assert_eq!(
            sheet_csv_url("https://docs.google.com/spreadsheets/d/abc123/edit"),
            "https://docs.google.com/spreadsheets/d/abc123/export?format=csv"
        );
        assert_eq!(sheet_csv_url("https://example.com/a.csv"), "https://example.com/a.csv");
    }

    #[test]
    fn unsupported_extension() {
        let err = load_file(Path::new("table.xlsx"), &source()).unwrap_err();
        assert!(err.to_string().contains("Unsupported"));
    }
}
