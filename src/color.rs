use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::CellValue;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: cell value → Color32
// ---------------------------------------------------------------------------

/// Blank spreadsheet cells, e.g. a season with no playoff team.
pub const NULL_COLOR: Color32 = Color32::from_rgb(120, 120, 120);

/// Maps the distinct values of the colour-by column to distinct colours.
/// Hues go to non-null values only, so blanks never take a palette slot.
#[derive(Debug, Clone)]
pub struct ColorMap {
    pub column: String,
    mapping: BTreeMap<CellValue, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map for the given column from its distinct values.
    pub fn new(column: &str, values: &BTreeSet<CellValue>) -> Self {
        let present: Vec<&CellValue> = values.iter().filter(|v| !v.is_null()).collect();
        let palette = generate_palette(present.len());
        let mut mapping: BTreeMap<CellValue, Color32> = present
            .into_iter()
            .zip(palette)
            .map(|(v, c)| (v.clone(), c))
            .collect();
        mapping.insert(CellValue::Null, NULL_COLOR);

        ColorMap {
            column: column.to_string(),
            mapping,
            default_color: Color32::LIGHT_GRAY,
        }
    }

    /// Look up the colour for a given value; values outside the map, such as
    /// a player filtered out after the map was built, are light grey.
    pub fn color_for(&self, value: &CellValue) -> Color32 {
        self.mapping
            .get(value)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_distinct_colours() {
        let palette = generate_palette(4);
        assert_eq!(palette.len(), 4);
        let unique: BTreeSet<[u8; 4]> = palette.iter().map(|c| c.to_array()).collect();
        assert_eq!(unique.len(), 4);
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn unknown_values_are_light_grey() {
        let values: BTreeSet<CellValue> =
            [CellValue::String("RS".into()), CellValue::String("PO".into())].into();
        let map = ColorMap::new("Type", &values);
        assert_ne!(map.color_for(&CellValue::String("RS".into())), Color32::LIGHT_GRAY);
        assert_eq!(map.color_for(&CellValue::String("??".into())), Color32::LIGHT_GRAY);
    }

    #[test]
    fn blank_cells_share_the_null_colour() {
        let teams: BTreeSet<CellValue> = [
            CellValue::String("TOR".into()),
            CellValue::String("DEN".into()),
        ]
        .into();
        let map = ColorMap::new("Tm", &teams);
        assert_eq!(map.color_for(&CellValue::Null), NULL_COLOR);

        // A blank in the column does not shift the teams' hues.
        let mut with_blank = teams.clone();
        with_blank.insert(CellValue::Null);
        let map_with_blank = ColorMap::new("Tm", &with_blank);
        for team in &teams {
            assert_eq!(map.color_for(team), map_with_blank.color_for(team));
        }
    }
}
