use std::collections::HashMap;

use thiserror::Error;

use crate::config::ChartConfig;
use crate::data::model::{CellValue, Table};

// ---------------------------------------------------------------------------
// Chart specifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartType {
    Scatter,
    Line,
}

/// What to plot; the renderer decides how.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub chart_type: ChartType,
    pub x: String,
    pub y: String,
    /// Column whose values split the points into coloured groups.
    pub color: String,
    /// Column shown as the label of a hovered point.
    pub hover: String,
    pub title: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum ChartError {
    #[error("column '{0}' is not in the table")]
    MissingColumn(String),
}

/// Scatter of the two configured metrics, coloured by `color`.
pub fn scatter_spec(config: &ChartConfig, color: &str) -> ChartSpec {
    ChartSpec {
        chart_type: ChartType::Scatter,
        x: config.scatter_x.clone(),
        y: config.scatter_y.clone(),
        color: color.to_string(),
        hover: config.scatter_hover.clone(),
        title: config.scatter_title.clone(),
    }
}

/// The regular-season and playoff line charts, one line per entity.
pub fn comparison_specs(config: &ChartConfig) -> (ChartSpec, ChartSpec) {
    let line = |title: &str| ChartSpec {
        chart_type: ChartType::Line,
        x: config.line_x.clone(),
        y: config.line_y.clone(),
        color: config.entity.clone(),
        hover: config.line_hover.clone(),
        title: title.to_string(),
    };
    (
        line(&config.regular_season_title),
        line(&config.playoffs_title),
    )
}

/// Default colour column: the configured position, else the first column.
pub fn default_color_column(table: &Table, config: &ChartConfig) -> Option<String> {
    table
        .columns
        .get(config.scatter_color_index)
        .or_else(|| table.columns.first())
        .map(|c| c.name.clone())
}

/// Distinct entities available for comparison, sorted.
pub fn entity_choices(table: &Table, config: &ChartConfig) -> Vec<CellValue> {
    table
        .column(&config.entity)
        .map(|c| c.unique_values().into_iter().collect())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Row selection for the comparison charts
// ---------------------------------------------------------------------------

/// Rows whose `column` equals `value`.
pub fn select_equal(table: &Table, column: &str, value: &CellValue) -> Result<Table, ChartError> {
    let col = table
        .column(column)
        .ok_or_else(|| ChartError::MissingColumn(column.to_string()))?;
    let mask: Vec<bool> = col.values.iter().map(|v| v == value).collect();
    Ok(table.filter_mask(&mask))
}

/// Rows of each entity, in the given entity order, restricted to one record
/// type (`RS` or `PO`).
pub fn comparison_table(
    table: &Table,
    config: &ChartConfig,
    entities: &[CellValue],
    record_type: &str,
) -> Result<Table, ChartError> {
    let record_type = CellValue::String(record_type.to_string());
    let parts = entities
        .iter()
        .map(|entity| {
            let rows = select_equal(table, &config.entity, entity)?;
            select_equal(&rows, &config.record_type, &record_type)
        })
        .collect::<Result<Vec<_>, _>>()?;

    if parts.is_empty() {
        return Ok(table.take_rows(&[]));
    }
    // Same schema by construction.
    Ok(Table::concat(&parts).unwrap_or_else(|_| table.take_rows(&[])))
}

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

/// Points of one colour group, in row order.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub group: CellValue,
    pub points: Vec<[f64; 2]>,
    /// Hover label per point.
    pub labels: Vec<String>,
}

/// Group the rows of `table` into series by the chart's colour column.
/// Groups appear in first-seen order; rows without a numeric x or y are
/// skipped.
pub fn build_series(table: &Table, spec: &ChartSpec) -> Result<Vec<Series>, ChartError> {
    let column = |name: &str| {
        table
            .column(name)
            .ok_or_else(|| ChartError::MissingColumn(name.to_string()))
    };
    let x = column(&spec.x)?;
    let y = column(&spec.y)?;
    let color = column(&spec.color)?;
    let hover = column(&spec.hover)?;

    let mut series: Vec<Series> = Vec::new();
    let mut slot: HashMap<&CellValue, usize> = HashMap::new();

    for row in 0..table.n_rows() {
        let (Some(xv), Some(yv)) = (x.values[row].as_f64(), y.values[row].as_f64()) else {
            continue;
        };
        let group = &color.values[row];
        let idx = *slot.entry(group).or_insert_with(|| {
            series.push(Series {
                group: group.clone(),
                points: Vec::new(),
                labels: Vec::new(),
            });
            series.len() - 1
        });
        series[idx].points.push([xv, yv]);
        series[idx].labels.push(hover.values[row].to_string());
    }
    Ok(series)
}
