use std::collections::BTreeSet;

use eframe::egui::{self, Color32, RichText, Ui};
use egui_plot::{Legend, Line, Plot, PlotPoint, PlotPoints, Points};

use crate::charts::{self, ChartSpec, ChartType, Series};
use crate::color::ColorMap;
use crate::data::model::{CellValue, Table};
use crate::state::AppState;
use crate::ui::table;

const PLOT_HEIGHT: f32 = 320.0;

/// The central page: filtered table, scatter and the two comparison charts.
pub fn dashboard(ui: &mut Ui, state: &mut AppState) {
    ui.heading(state.config.title.as_str());
    ui.separator();

    if state.table.is_none() {
        ui.label("No data loaded. Use File → Open… or Reload from source.");
        return;
    }

    ui.heading("Filter Player Data!");
    table::data_table(ui, &state.filtered);
    ui.add_space(12.0);

    ui.heading("Create 2x2 Plot");
    scatter_section(ui, state);
    ui.add_space(12.0);

    ui.heading("Player Comparison");
    comparison_section(ui, state);
}

// ---------------------------------------------------------------------------
// Scatter section
// ---------------------------------------------------------------------------

/// Colour picker plus the scatter of the two configured metrics.
pub fn scatter_section(ui: &mut Ui, state: &mut AppState) {
    let columns = state.filtered.column_names();
    let current = state.color_column.clone().unwrap_or_default();

    ui.horizontal(|ui: &mut Ui| {
        ui.label("Select Circle Color");
        egui::ComboBox::from_id_salt("circle_color")
            .selected_text(current.as_str())
            .show_ui(ui, |ui: &mut Ui| {
                for col in &columns {
                    if ui.selectable_label(current == *col, col.as_str()).clicked() {
                        state.set_color_column(col.clone());
                    }
                }
            });
    });

    let Some(color) = state.color_column.clone() else {
        return;
    };
    let spec = charts::scatter_spec(&state.config.charts, &color);
    chart(ui, "scatter_plot", &spec, &state.filtered, state.color_map.as_ref());
}

// ---------------------------------------------------------------------------
// Comparison section
// ---------------------------------------------------------------------------

/// Two entity pickers and the regular-season / playoff line charts.
pub fn comparison_section(ui: &mut Ui, state: &mut AppState) {
    let config = state.config.charts.clone();
    let choices = charts::entity_choices(&state.filtered, &config);
    if choices.is_empty() {
        ui.label(format!("No '{}' values to compare.", config.entity));
        return;
    }

    for slot in 0..2 {
        let current = state.entities[slot].clone();
        ui.horizontal(|ui: &mut Ui| {
            ui.label(format!("Select Player {}", slot + 1));
            egui::ComboBox::from_id_salt(("entity", slot))
                .selected_text(current.as_ref().map(|v| v.to_string()).unwrap_or_default())
                .show_ui(ui, |ui: &mut Ui| {
                    for value in &choices {
                        let selected = current.as_ref() == Some(value);
                        if ui.selectable_label(selected, value.to_string()).clicked() {
                            state.set_entity(slot, value.clone());
                        }
                    }
                });
        });
    }

    let picked = state.picked_entities();
    let (rs_spec, po_spec) = charts::comparison_specs(&config);
    for (id, spec, record_type) in [
        ("regular_season_plot", &rs_spec, &config.regular_season),
        ("playoffs_plot", &po_spec, &config.playoffs),
    ] {
        match charts::comparison_table(&state.filtered, &config, &picked, record_type) {
            Ok(rows) => chart(ui, id, spec, &rows, None),
            Err(e) => {
                ui.label(RichText::new(e.to_string()).color(Color32::RED));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Shared chart renderer
// ---------------------------------------------------------------------------

/// Render one chart. Without a colour map, one is built from the groups.
fn chart(ui: &mut Ui, id: &str, spec: &ChartSpec, table: &Table, color_map: Option<&ColorMap>) {
    ui.strong(spec.title.as_str());

    let series = match charts::build_series(table, spec) {
        Ok(series) => series,
        Err(e) => {
            ui.label(RichText::new(e.to_string()).color(Color32::RED));
            return;
        }
    };

    let local_map;
    let color_map = match color_map {
        Some(cm) => cm,
        None => {
            let groups: BTreeSet<CellValue> = series.iter().map(|s| s.group.clone()).collect();
            local_map = ColorMap::new(&spec.color, &groups);
            &local_map
        }
    };

    let hover = hover_index(&series);
    let (x_name, y_name) = (spec.x.clone(), spec.y.clone());

    Plot::new(id)
        .legend(Legend::default())
        .height(PLOT_HEIGHT)
        .x_axis_label(spec.x.as_str())
        .y_axis_label(spec.y.as_str())
        .label_formatter(move |name, value| hover_label(&hover, &x_name, &y_name, name, value))
        .show(ui, |plot_ui| {
            for s in &series {
                let color = color_map.color_for(&s.group);
                let name = s.group.to_string();
                let points: PlotPoints = s.points.iter().copied().collect();

                match spec.chart_type {
                    ChartType::Scatter => {
                        plot_ui.points(Points::new(points).name(&name).color(color).radius(3.0));
                    }
                    ChartType::Line => {
                        plot_ui.line(Line::new(points).name(&name).color(color).width(1.5));
                    }
                }
            }
        });
}

/// (series name, point, hover label) for every plotted point.
fn hover_index(series: &[Series]) -> Vec<(String, [f64; 2], String)> {
    series
        .iter()
        .flat_map(|s| {
            let name = s.group.to_string();
            s.points
                .iter()
                .zip(&s.labels)
                .map(move |(p, label)| (name.clone(), *p, label.clone()))
        })
        .collect()
}

/// Tooltip text: the hover label of the nearest point of the hovered series.
fn hover_label(
    index: &[(String, [f64; 2], String)],
    x_name: &str,
    y_name: &str,
    series: &str,
    value: &PlotPoint,
) -> String {
    let nearest = index
        .iter()
        .filter(|(name, _, _)| name == series)
        .min_by(|(_, a, _), (_, b, _)| {
            let da = (a[0] - value.x).powi(2) + (a[1] - value.y).powi(2);
            let db = (b[0] - value.x).powi(2) + (b[1] - value.y).powi(2);
            da.total_cmp(&db)
        });

    match nearest {
        Some((name, _, label)) => format!(
            "{label}\n{name}\n{x_name}: {:.2}\n{y_name}: {:.2}",
            value.x, value.y
        ),
        None => format!("{x_name}: {:.2}\n{y_name}: {:.2}", value.x, value.y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tooltip_uses_nearest_point_of_the_series() {
        let series = vec![
            Series {
                group: CellValue::String("A".into()),
                points: vec![[20.0, 1.0], [21.0, 2.0]],
                labels: vec!["2019".into(), "2020".into()],
            },
            Series {
                group: CellValue::String("B".into()),
                points: vec![[21.0, 2.0]],
                labels: vec!["2015".into()],
            },
        ];
        let index = hover_index(&series);
        assert_eq!(index.len(), 3);

        let text = hover_label(&index, "Age", "eRT", "A", &PlotPoint::new(21.0, 2.0));
        assert!(text.starts_with("2020\nA"));

        let text = hover_label(&index, "Age", "eRT", "", &PlotPoint::new(1.0, 2.0));
        assert_eq!(text, "Age: 1.00\neRT: 2.00");
    }
}
