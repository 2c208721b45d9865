use eframe::egui::Ui;
use egui_extras::{Column as TableColumn, TableBuilder};

use crate::data::model::{Column, Table};

const ROW_HEIGHT: f32 = 18.0;

// ---------------------------------------------------------------------------
// Data table (central panel)
// ---------------------------------------------------------------------------

/// Render the filtered table, index column first.
pub fn data_table(ui: &mut Ui, table: &Table) {
    if table.n_columns() == 0 {
        ui.label("Nothing to show.");
        return;
    }

    let shown: Vec<&Column> = table.index.iter().chain(&table.columns).collect();

    ui.push_id("data_table", |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .max_scroll_height(320.0)
            .columns(TableColumn::auto().at_least(48.0), shown.len())
            .header(ROW_HEIGHT + 4.0, |mut header| {
                for col in &shown {
                    header.col(|ui: &mut Ui| {
                        ui.strong(col.name.as_str());
                    });
                }
            })
            .body(|body| {
                body.rows(ROW_HEIGHT, table.n_rows(), |mut row| {
                    let i = row.index();
                    for col in &shown {
                        row.col(|ui: &mut Ui| {
                            let value = &col.values[i];
                            if !value.is_null() {
                                ui.label(value.to_string());
                            }
                        });
                    }
                });
            });
    });
}
