use chrono::{NaiveDate, NaiveDateTime};
use eframe::egui::{self, Color32, RichText, ScrollArea, Slider, Ui};
use egui_extras::DatePickerButton;

use crate::data::classify::ColumnKind;
use crate::data::filter::default_constraint;
use crate::data::model::CellValue;
use crate::data::predicate::{temporal_bounds, Constraint, NumericBounds};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    if state.table.is_none() {
        ui.label("No table loaded.");
        return;
    }

    let mut enabled = state.filters.enabled;
    if ui.checkbox(&mut enabled, "Add filters").changed() {
        state.set_filters_enabled(enabled);
    }
    if !state.filters.enabled {
        return;
    }

    let columns = state.prepared.column_names();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Column multiselect ----
            let header = format!(
                "Filter data on  ({}/{})",
                state.filters.columns.len(),
                columns.len()
            );
            egui::CollapsingHeader::new(RichText::new(header).strong())
                .id_salt("filter_columns")
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    for col in &columns {
                        let mut checked = state.filters.is_column_enabled(col);
                        if ui.checkbox(&mut checked, col.as_str()).changed() {
                            state.toggle_filter_column(col);
                        }
                    }
                });
            ui.separator();

            // ---- One control per enabled column ----
            for col in state.filters.columns.clone() {
                match state.column_kind(&col) {
                    Some(ColumnKind::Categorical) => categorical_control(ui, state, &col),
                    Some(ColumnKind::Numeric) => numeric_control(ui, state, &col),
                    Some(ColumnKind::Temporal) => temporal_control(ui, state, &col),
                    Some(ColumnKind::Textual) => text_control(ui, state, &col),
                    None => continue,
                }
                ui.add_space(6.0);
            }
        });
}

/// The constraint for `col`, or its default if it has none of the right kind.
fn current_constraint(state: &AppState, col: &str, kind: ColumnKind) -> Option<Constraint> {
    match state.filters.constraints.get(col) {
        Some(c) if c.kind() == kind => Some(c.clone()),
        _ => state
            .prepared
            .column(col)
            .map(|column| default_constraint(column, kind)),
    }
}

fn categorical_control(ui: &mut Ui, state: &mut AppState, col: &str) {
    let Some(column) = state.prepared.column(col) else {
        return;
    };
    let mut all_values: Vec<CellValue> = column.unique_values().into_iter().collect();
    if column.values.iter().any(CellValue::is_null) {
        all_values.push(CellValue::Null);
    }
    let Some(Constraint::Categorical(selected)) =
        current_constraint(state, col, ColumnKind::Categorical)
    else {
        return;
    };

    let header_text = format!("Values for {col}  ({}/{})", selected.len(), all_values.len());
    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .id_salt(("values", col))
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            // Select all / none buttons
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    state.select_all(col);
                }
                if ui.small_button("None").clicked() {
                    state.select_none(col);
                }
            });

            for val in &all_values {
                // Show colour swatch if this is the colour column
                let mut text = RichText::new(val.to_string());
                if state.color_column.as_deref() == Some(col) {
                    if let Some(cm) = &state.color_map {
                        text = text.color(cm.color_for(val));
                    }
                }

                let mut checked = selected.contains(val);
                if ui.checkbox(&mut checked, text).changed() {
                    state.toggle_category_value(col, val);
                }
            }
        });
}

fn numeric_control(ui: &mut Ui, state: &mut AppState, col: &str) {
    let Some(bounds) = state.prepared.column(col).and_then(NumericBounds::of) else {
        return;
    };
    let Some(Constraint::Numeric { min, max }) =
        current_constraint(state, col, ColumnKind::Numeric)
    else {
        return;
    };

    ui.strong(format!("Values for {col}"));
    let (mut lo, mut hi) = (min, max);
    let range = bounds.min..=bounds.max;
    let lo_changed = ui
        .add(Slider::new(&mut lo, range.clone()).step_by(bounds.step()).text("min"))
        .changed();
    let hi_changed = ui
        .add(Slider::new(&mut hi, range).step_by(bounds.step()).text("max"))
        .changed();

    if lo_changed || hi_changed {
        // The handle being dragged pushes the other one along.
        if lo > hi {
            if lo_changed {
                hi = lo;
            } else {
                lo = hi;
            }
        }
        state.set_constraint(col, Constraint::Numeric { min: lo, max: hi });
    }
}

fn temporal_control(ui: &mut Ui, state: &mut AppState, col: &str) {
    let Some((first, last)) = state.prepared.column(col).and_then(temporal_bounds) else {
        return;
    };
    let Some(Constraint::Temporal(endpoints)) =
        current_constraint(state, col, ColumnKind::Temporal)
    else {
        return;
    };

    let mut picked = picks_of(endpoints);
    let fallback = [first.date(), last.date()];

    ui.strong(format!("Values for {col}"));
    let mut changed = false;
    for (i, label) in ["from", "to"].into_iter().enumerate() {
        ui.horizontal(|ui: &mut Ui| {
            ui.label(label);
            match &mut picked[i] {
                Some(date) => {
                    let id = format!("{col}_{label}");
                    changed |= ui.add(DatePickerButton::new(date).id_salt(&id)).changed();
                    if ui.small_button("×").clicked() {
                        picked[i] = None;
                        changed = true;
                    }
                }
                None => {
                    if ui.small_button("pick…").clicked() {
                        picked[i] = Some(fallback[i]);
                        changed = true;
                    }
                }
            }
        });
    }

    if changed {
        state.set_constraint(col, Constraint::Temporal(endpoints_of(picked)));
    }
    if picked.iter().any(Option::is_none) {
        ui.small("Pick both dates to filter on this column.");
    }
}

/// Date-picker values per slot. An empty "from" leaves "to" where it is.
fn picks_of(endpoints: [Option<NaiveDateTime>; 2]) -> [Option<NaiveDate>; 2] {
    endpoints.map(|t| t.map(|t| t.date()))
}

fn endpoints_of(picked: [Option<NaiveDate>; 2]) -> [Option<NaiveDateTime>; 2] {
    picked.map(|d| d.and_then(|d| d.and_hms_opt(0, 0, 0)))
}

fn text_control(ui: &mut Ui, state: &mut AppState, col: &str) {
    let Some(Constraint::Textual(mut pattern)) =
        current_constraint(state, col, ColumnKind::Textual)
    else {
        return;
    };
    ui.strong(format!("Substring or regex in {col}"));
    if ui.text_edit_singleline(&mut pattern).changed() {
        state.set_constraint(col, Constraint::Textual(pattern));
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Reload from source").clicked() {
                state.load_from_source();
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(table) = &state.table {
            ui.label(format!(
                "{} rows loaded, {} shown",
                table.n_rows(),
                state.filtered.n_rows()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open table")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.load_from_file(&path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleared_start_date_keeps_end_in_its_slot() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 5, d).unwrap();
        let picked = [None, Some(day(20))];

        let endpoints = endpoints_of(picked);
        assert_eq!(endpoints[0], None);
        assert_eq!(endpoints[1], day(20).and_hms_opt(0, 0, 0));

        // Next frame redraws the same slots.
        assert_eq!(picks_of(endpoints), picked);
    }
}
