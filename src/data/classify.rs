use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::model::{CellValue, Column, DType, Table};

// ---------------------------------------------------------------------------
// Column kinds
// ---------------------------------------------------------------------------

/// Columns with fewer distinct values than this are filtered as categories.
pub const CATEGORICAL_THRESHOLD: usize = 10;

/// The semantic kind of a column; decides which filter control it gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Categorical,
    Numeric,
    Temporal,
    Textual,
}

/// Classify a column from its dtype and values.
///
/// Precedence:
/// 1. empty / all-null → `Textual`
/// 2. declared categorical, or fewer than [`CATEGORICAL_THRESHOLD`] distinct
///    values → `Categorical` (this wins over numeric)
/// 3. numeric dtype → `Numeric`
/// 4. datetime dtype → `Temporal`
/// 5. anything else → `Textual`
///
/// Text columns that hold dates should go through [`try_parse_as_temporal`]
/// first; `classify` itself never converts.
pub fn classify(column: &Column) -> ColumnKind {
    if column.is_all_null() {
        return ColumnKind::Textual;
    }
    if column.dtype == DType::Categorical || column.n_unique() < CATEGORICAL_THRESHOLD {
        ColumnKind::Categorical
    } else if column.dtype.is_numeric() {
        ColumnKind::Numeric
    } else if column.dtype == DType::DateTime {
        ColumnKind::Temporal
    } else {
        ColumnKind::Textual
    }
}

// ---------------------------------------------------------------------------
// Date coercion
// ---------------------------------------------------------------------------

/// Re-type a text column as `DateTime` if every non-null value parses.
///
/// Returns `None` (and the caller keeps the original column) when the column
/// is not text, holds no values, or any value fails to parse.
pub fn try_parse_as_temporal(column: &Column) -> Option<Column> {
    if column.dtype != DType::Text || column.is_all_null() {
        return None;
    }

    let values = column
        .values
        .iter()
        .map(|v| match v {
            CellValue::Null => Some(CellValue::Null),
            CellValue::String(s) => parse_datetime(s).map(CellValue::DateTime),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    log::debug!("column '{}' parsed as datetime", column.name);
    Some(Column {
        name: column.name.clone(),
        dtype: DType::DateTime,
        values,
    })
}

/// Apply [`try_parse_as_temporal`] to every column of a table.
pub fn normalize_datetimes(table: &Table) -> Table {
    Table {
        index: table.index.clone(),
        columns: table
            .columns
            .iter()
            .map(|c| try_parse_as_temporal(c).unwrap_or_else(|| c.clone()))
            .collect(),
    }
}

/// Best-effort date/time parsing. Offsets are dropped and the local
/// wall-clock time is kept. Plain numbers are never treated as dates.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    const DATETIME_FMTS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
    ];
    const DATE_FMTS: &[&str] = &[
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%m/%d/%Y",
        "%d %B %Y",
        "%B %d, %Y",
        "%b %d, %Y",
    ];

    let s = s.trim();
    if s.is_empty() || s.parse::<f64>().is_ok() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    DATE_FMTS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(name: &str, vals: &[&str]) -> Column {
        Column::new(
            name,
            vals.iter().map(|s| CellValue::String(s.to_string())).collect(),
        )
    }

    fn ints(name: &str, vals: impl IntoIterator<Item = i64>) -> Column {
        Column::new(name, vals.into_iter().map(CellValue::Integer).collect())
    }

    #[test]
    fn few_distinct_values_are_categorical_even_when_numeric() {
        assert_eq!(classify(&ints("Age", [20, 21, 22, 23, 24, 40])), ColumnKind::Categorical);
        assert_eq!(classify(&text("Type", &["RS", "PO", "RS"])), ColumnKind::Categorical);
    }

    #[test]
    fn many_distinct_numbers_are_numeric() {
        assert_eq!(classify(&ints("Year", 1990..2010)), ColumnKind::Numeric);
    }

    #[test]
    fn declared_categorical_wins_over_cardinality() {
        let letters = ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K"];
        let col = text("Team", &letters);
        assert_eq!(classify(&col), ColumnKind::Textual);
        let col = col.with_dtype(DType::Categorical);
        assert_eq!(classify(&col), ColumnKind::Categorical);
    }

    #[test]
    fn empty_and_all_null_columns_fall_back_to_text() {
        assert_eq!(classify(&Column::new("e", vec![])), ColumnKind::Textual);
        assert_eq!(
            classify(&Column::new("n", vec![CellValue::Null; 4])),
            ColumnKind::Textual
        );
    }

    #[test]
    fn date_strings_become_temporal() {
        let days: Vec<String> = (1..=12).map(|d| format!("2023-01-{d:02}")).collect();
        let refs: Vec<&str> = days.iter().map(String::as_str).collect();
        let col = text("Date", &refs);
        assert_eq!(classify(&col), ColumnKind::Textual);

        let parsed = try_parse_as_temporal(&col).expect("all values are dates");
        assert_eq!(parsed.dtype, DType::DateTime);
        assert_eq!(classify(&parsed), ColumnKind::Temporal);
    }

    #[test]
    fn nulls_survive_date_parsing() {
        let col = Column::new(
            "Date",
            vec![
                CellValue::String("2023-01-01".into()),
                CellValue::Null,
                CellValue::String("2023-01-03".into()),
            ],
        );
        let parsed = try_parse_as_temporal(&col).expect("non-null values are dates");
        assert_eq!(parsed.dtype, DType::DateTime);
        assert_eq!(parsed.values[1], CellValue::Null);
        assert_eq!(
            parsed.values[2],
            CellValue::DateTime(
                NaiveDate::from_ymd_opt(2023, 1, 3)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
            )
        );
    }

    #[test]
    fn one_bad_value_keeps_the_column_as_text() {
        let col = text("Date", &["2023-01-01", "yesterday"]);
        assert!(try_parse_as_temporal(&col).is_none());
        assert!(try_parse_as_temporal(&ints("Year", [2020, 2021])).is_none());
    }

    #[test]
    fn parse_datetime_formats() {
        let midnight = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_datetime("2024-03-05"), Some(midnight));
        assert_eq!(parse_datetime("03/05/2024"), Some(midnight));
        assert_eq!(parse_datetime("March 5, 2024"), Some(midnight));
        assert_eq!(
            parse_datetime("2024-03-05T10:30:00+02:00"),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(10, 30, 0)
        );
        assert_eq!(parse_datetime("2019"), None);
        assert_eq!(parse_datetime("LeBron James"), None);
    }
}
