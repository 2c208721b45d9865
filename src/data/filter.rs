use std::collections::BTreeMap;

use super::classify::{
    classify, normalize_datetimes, parse_datetime, try_parse_as_temporal, ColumnKind,
};
use super::model::{CellValue, Column, DType, Table};
use super::predicate::{
    accept_all, build_predicate, temporal_bounds, Constraint, NumericBounds, Predicate,
};

// ---------------------------------------------------------------------------
// Filter state: which columns are filtered and with what parameters
// ---------------------------------------------------------------------------

/// Per-column constraints: column_name → current parameter.
pub type ConstraintMap = BTreeMap<String, Constraint>;

/// Session-scoped filter settings, passed explicitly to the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    /// Master switch; when off the table passes through untouched.
    pub enabled: bool,
    /// Columns the user chose to filter on.
    pub columns: Vec<String>,
    /// Current constraint for each column that has one.
    pub constraints: ConstraintMap,
}

impl FilterState {
    pub fn is_column_enabled(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Start filtering on `name`, pre-populating its constraint with the
    /// accept-all default for the column's kind.
    pub fn enable_column(&mut self, table: &Table, name: &str) {
        if self.is_column_enabled(name) {
            return;
        }
        let Some(column) = table.column(name) else {
            log::warn!("cannot filter on unknown column '{name}'");
            return;
        };
        let column = prepared(column);
        let kind = classify(&column);
        self.constraints
            .insert(name.to_string(), default_constraint(&column, kind));
        self.columns.push(name.to_string());
    }

    /// Stop filtering on `name`; its constraint is dropped too.
    pub fn disable_column(&mut self, name: &str) {
        self.columns.retain(|c| c != name);
        self.constraints.remove(name);
    }
}

/// The column as the engine sees it: text dates already parsed.
fn prepared(column: &Column) -> Column {
    try_parse_as_temporal(column).unwrap_or_else(|| column.clone())
}

/// Accept-all constraint for a column of `kind`: every distinct value,
/// the full numeric range, the full date range, or an empty pattern.
pub fn default_constraint(column: &Column, kind: ColumnKind) -> Constraint {
    match kind {
        ColumnKind::Categorical => {
            let mut values = column.unique_values();
            if column.values.iter().any(CellValue::is_null) {
                values.insert(CellValue::Null);
            }
            Constraint::Categorical(values)
        }
        ColumnKind::Numeric => {
            let b = NumericBounds::of(column).unwrap_or(NumericBounds { min: 0.0, max: 0.0 });
            Constraint::Numeric {
                min: b.min,
                max: b.max,
            }
        }
        ColumnKind::Temporal => Constraint::Temporal(
            temporal_bounds(column)
                .map(|(lo, hi)| [Some(lo), Some(hi)])
                .unwrap_or([None, None]),
        ),
        ColumnKind::Textual => Constraint::Textual(String::new()),
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Row mask: `true` for rows passing every enabled column's constraint.
///
/// A column is classified on the full table with text dates parsed. A
/// missing constraint, or one made for a different kind, accepts every row.
pub fn row_mask(table: &Table, state: &FilterState) -> Vec<bool> {
    if !state.enabled {
        return vec![true; table.n_rows()];
    }
    mask_of(&normalize_datetimes(table), state)
}

fn mask_of(normalized: &Table, state: &FilterState) -> Vec<bool> {
    let mut mask = vec![true; normalized.n_rows()];
    for name in &state.columns {
        let Some(column) = normalized.column(name) else {
            log::warn!("skipping filter on unknown column '{name}'");
            continue;
        };
        let kind = classify(column);
        log::debug!("filtering '{name}' as {kind:?}");

        let predicate = column_predicate(column, kind, state.constraints.get(name));
        for (keep, value) in mask.iter_mut().zip(&column.values) {
            *keep = *keep && predicate(value);
        }
    }
    mask
}

fn column_predicate(
    column: &Column,
    kind: ColumnKind,
    constraint: Option<&Constraint>,
) -> Predicate {
    let Some(constraint) = constraint else {
        return accept_all();
    };
    build_predicate(kind, &match_dates(constraint, column)).unwrap_or_else(|| {
        log::debug!(
            "'{}' is {kind:?} now, ignoring its {:?} constraint",
            column.name,
            constraint.kind()
        );
        accept_all()
    })
}

/// Allowed values picked as text still match once the column is parsed as
/// dates.
fn match_dates(constraint: &Constraint, column: &Column) -> Constraint {
    match constraint {
        Constraint::Categorical(allowed) if column.dtype == DType::DateTime => {
            Constraint::Categorical(
                allowed
                    .iter()
                    .map(|v| match v {
                        CellValue::String(s) => parse_datetime(s)
                            .map(CellValue::DateTime)
                            .unwrap_or_else(|| v.clone()),
                        _ => v.clone(),
                    })
                    .collect(),
            )
        }
        _ => constraint.clone(),
    }
}

/// Return indices of rows that pass all active filters.
pub fn filtered_indices(table: &Table, state: &FilterState) -> Vec<usize> {
    row_mask(table, state)
        .into_iter()
        .enumerate()
        .filter(|(_, keep)| *keep)
        .map(|(i, _)| i)
        .collect()
}

/// Restrict `table` to the rows passing all active filters.
///
/// With filtering disabled, or no column enabled, the table comes back
/// unchanged. Otherwise the output carries the parsed date columns, including
/// text columns that only parse once the failing rows are gone. Every column,
/// the index and the column order are kept.
pub fn filter_dataframe(table: &Table, state: &FilterState) -> Table {
    if !state.enabled || state.columns.is_empty() {
        return table.clone();
    }
    let normalized = normalize_datetimes(table);
    let mask = mask_of(&normalized, state);
    let out = normalize_datetimes(&normalized.filter_mask(&mask));
    log::debug!("{} of {} rows pass the filters", out.n_rows(), table.n_rows());
    out
}
