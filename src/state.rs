use std::path::Path;

use anyhow::Result;

use crate::charts;
use crate::color::ColorMap;
use crate::config::DashboardConfig;
use crate::data::classify::{classify, normalize_datetimes, ColumnKind};
use crate::data::filter::{filter_dataframe, FilterState};
use crate::data::loader;
use crate::data::model::{CellValue, Table};
use crate::data::predicate::Constraint;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering. One per window session.
pub struct AppState {
    pub config: DashboardConfig,

    /// Loaded table (None until the first successful load).
    pub table: Option<Table>,

    /// The loaded table with text dates parsed; drives control generation.
    pub prepared: Table,

    /// Filter switch, enabled columns and their constraints.
    pub filters: FilterState,

    /// Rows passing the current filters, recomputed on every change.
    pub filtered: Table,

    /// Which column colours the scatter plot.
    pub color_column: Option<String>,

    /// Active colour map for `color_column`.
    pub color_map: Option<ColorMap>,

    /// The two entities compared in the line charts.
    pub entities: [Option<CellValue>; 2],

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            table: None,
            prepared: Table::default(),
            filters: FilterState::default(),
            filtered: Table::default(),
            color_column: None,
            color_map: None,
            entities: [None, None],
            status_message: None,
        }
    }

    // -- Loading --

    /// Fetch the configured spreadsheet. On failure the current table stays.
    pub fn load_from_source(&mut self) {
        let origin = self.config.source.url.clone();
        let result = loader::fetch_sheet(&self.config.source);
        self.apply_load(result, &origin);
    }

    /// Load a local file. On failure the current table stays.
    pub fn load_from_file(&mut self, path: &Path) {
        let result = loader::load_file(path, &self.config.source);
        self.apply_load(result, &path.display().to_string());
    }

    fn apply_load(&mut self, result: Result<Table>, origin: &str) {
        match result {
            Ok(table) => {
                log::info!(
                    "Loaded {} rows with columns {:?} from {origin}",
                    table.n_rows(),
                    table.column_names()
                );
                self.set_table(table);
            }
            Err(e) => {
                log::warn!("Failed to load {origin}: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Ingest a newly loaded table; reset filters, colour and comparisons.
    pub fn set_table(&mut self, table: Table) {
        self.prepared = normalize_datetimes(&table);
        self.filters = FilterState {
            enabled: self.filters.enabled,
            ..FilterState::default()
        };
        self.color_column = charts::default_color_column(&table, &self.config.charts);
        self.entities = [None, None];
        self.table = Some(table);
        self.status_message = None;
        self.refilter();
    }

    // -- Filtering --

    /// Recompute the filtered table and everything derived from it.
    pub fn refilter(&mut self) {
        let Some(table) = &self.table else {
            return;
        };
        self.filtered = filter_dataframe(table, &self.filters);
        self.rebuild_color_map();
        self.reconcile_entities();
    }

    /// Kind of a column as the filter engine will classify it.
    pub fn column_kind(&self, name: &str) -> Option<ColumnKind> {
        self.prepared.column(name).map(classify)
    }

    pub fn set_filters_enabled(&mut self, enabled: bool) {
        self.filters.enabled = enabled;
        self.refilter();
    }

    /// Add or remove a column from the filtered set.
    pub fn toggle_filter_column(&mut self, name: &str) {
        if self.filters.is_column_enabled(name) {
            self.filters.disable_column(name);
        } else {
            self.filters.enable_column(&self.prepared, name);
        }
        self.refilter();
    }

    pub fn set_constraint(&mut self, column: &str, constraint: Constraint) {
        self.filters
            .constraints
            .insert(column.to_string(), constraint);
        self.refilter();
    }

    /// Toggle a single value in a categorical column's allowed set.
    pub fn toggle_category_value(&mut self, column: &str, value: &CellValue) {
        if let Some(Constraint::Categorical(selected)) = self.filters.constraints.get_mut(column) {
            if !selected.remove(value) {
                selected.insert(value.clone());
            }
        }
        self.refilter();
    }

    /// Select all values in a categorical column.
    pub fn select_all(&mut self, column: &str) {
        if let Some(col) = self.prepared.column(column) {
            let mut all = col.unique_values();
            if col.values.iter().any(CellValue::is_null) {
                all.insert(CellValue::Null);
            }
            self.set_constraint(column, Constraint::Categorical(all));
        }
    }

    /// Deselect all values in a categorical column.
    pub fn select_none(&mut self, column: &str) {
        self.set_constraint(column, Constraint::Categorical(Default::default()));
    }

    // -- Charts --

    /// Set colour column and rebuild the map.
    pub fn set_color_column(&mut self, col: String) {
        self.color_column = Some(col);
        self.rebuild_color_map();
    }

    /// Rebuild the colour map from the current `color_column`.
    fn rebuild_color_map(&mut self) {
        self.color_map = self.color_column.as_ref().and_then(|col| {
            let column = self.filtered.column(col)?;
            Some(ColorMap::new(col, &column.unique_values()))
        });
    }

    pub fn set_entity(&mut self, slot: usize, value: CellValue) {
        if let Some(entry) = self.entities.get_mut(slot) {
            *entry = Some(value);
        }
    }

    /// Keep the compared entities within the filtered table; missing picks
    /// fall back to the first and second available entity.
    fn reconcile_entities(&mut self) {
        let choices = charts::entity_choices(&self.filtered, &self.config.charts);
        for (slot, entry) in self.entities.iter_mut().enumerate() {
            let still_there = entry.as_ref().is_some_and(|e| choices.contains(e));
            if !still_there {
                *entry = choices.get(slot).or(choices.first()).cloned();
            }
        }
    }

    /// Entities currently picked, in slot order.
    pub fn picked_entities(&self) -> Vec<CellValue> {
        self.entities.iter().flatten().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;

    fn s(v: &str) -> CellValue {
        CellValue::String(v.to_string())
    }

    fn table() -> Table {
        let players = ["A", "A", "B", "C", "C", "D", "E", "F", "G", "H", "I", "J"];
        Table::new(vec![
            Column::new("Player", players.iter().map(|p| s(p)).collect()),
            Column::new("Age", (20..32).map(CellValue::Integer).collect()),
        ])
        .unwrap()
    }

    #[test]
    fn new_table_shows_everything() {
        let mut state = AppState::new(DashboardConfig::default());
        state.set_table(table());
        assert_eq!(state.filtered.n_rows(), 12);
        assert_eq!(state.color_column.as_deref(), Some("Player"));
        assert_eq!(state.entities, [Some(s("A")), Some(s("B"))]);
    }

    #[test]
    fn filter_controls_drive_the_table() {
        let mut state = AppState::new(DashboardConfig::default());
        state.set_table(table());

        state.set_filters_enabled(true);
        state.toggle_filter_column("Age");
        assert_eq!(state.column_kind("Age"), Some(ColumnKind::Numeric));
        assert_eq!(state.filtered.n_rows(), 12);

        state.set_constraint("Age", Constraint::Numeric { min: 22.0, max: 25.0 });
        assert_eq!(state.filtered.n_rows(), 4);
        // A dropped out of the table, so the first pick moves on to B.
        assert_eq!(state.entities, [Some(s("B")), Some(s("B"))]);

        state.set_filters_enabled(false);
        assert_eq!(state.filtered.n_rows(), 12);
    }

    #[test]
    fn category_toggles() {
        let mut state = AppState::new(DashboardConfig::default());
        let t = Table::new(vec![Column::new("Type", vec![s("RS"), s("PO"), s("RS")])]).unwrap();
        state.set_table(t);
        state.set_filters_enabled(true);
        state.toggle_filter_column("Type");

        state.toggle_category_value("Type", &s("PO"));
        assert_eq!(state.filtered.n_rows(), 2);

        state.select_none("Type");
        assert_eq!(state.filtered.n_rows(), 0);

        state.select_all("Type");
        assert_eq!(state.filtered.n_rows(), 3);

        state.toggle_filter_column("Type");
        assert!(state.filters.columns.is_empty());
    }
}
