use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Looked up in the working directory when no path is given.
pub const CONFIG_FILE: &str = "raptor-viz.toml";
/// Environment variable holding an explicit config path.
pub const CONFIG_ENV: &str = "RAPTOR_VIZ_CONFIG";

const RAPTOR_SHEET_URL: &str = "https://docs.google.com/spreadsheets/d/1CsPkNuDvHunzTiNeqSq_QC9Nr2f4Ioco2wUggJ9VQsI/edit#gid=1113356622";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Dashboard configuration. Every field has a default, so a config file
/// only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Window and page title.
    pub title: String,
    pub source: SourceConfig,
    pub charts: ChartConfig,
}

/// Where the table comes from and how to read it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Spreadsheet link or direct CSV URL.
    pub url: String,
    /// Lines to skip before the header row.
    pub header_row: usize,
    /// Column position used as the row index.
    pub index_col: Option<usize>,
    /// Columns filtered as categories regardless of how many values they hold.
    pub categorical_columns: Vec<String>,
}

/// Column names and titles for the derived charts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub scatter_x: String,
    pub scatter_y: String,
    pub scatter_hover: String,
    /// Position of the default colour column; falls back to the first column.
    pub scatter_color_index: usize,
    pub scatter_title: String,

    /// Column holding the compared entities (players).
    pub entity: String,
    /// Column separating regular season from playoff rows.
    pub record_type: String,
    pub regular_season: String,
    pub playoffs: String,
    pub line_x: String,
    pub line_y: String,
    pub line_hover: String,
    pub regular_season_title: String,
    pub playoffs_title: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            title: "NBA Raptor Data from Neil Paine".to_string(),
            source: SourceConfig::default(),
            charts: ChartConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            url: RAPTOR_SHEET_URL.to_string(),
            header_row: 1,
            index_col: Some(0),
            categorical_columns: Vec::new(),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        ChartConfig {
            scatter_x: "eRO".to_string(),
            scatter_y: "eRD".to_string(),
            scatter_hover: "Player".to_string(),
            scatter_color_index: 11,
            scatter_title:
                "Offensive eRaptor vs Defensive eRaptor for Both Playoffs and Regular Season"
                    .to_string(),
            entity: "Player".to_string(),
            record_type: "Type".to_string(),
            regular_season: "RS".to_string(),
            playoffs: "PO".to_string(),
            line_x: "Age".to_string(),
            line_y: "eRT".to_string(),
            line_hover: "Year".to_string(),
            regular_season_title: "Regular Season eRaptor (eRT) by Age".to_string(),
            playoffs_title: "Playoffs Raptor (eRT) by Age".to_string(),
        }
    }
}

impl DashboardConfig {
    /// Load from `$RAPTOR_VIZ_CONFIG`, else `./raptor-viz.toml` if present,
    /// else the defaults.
    pub fn load() -> Result<Self> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        match explicit {
            Some(path) => Self::from_file(&path),
            None if Path::new(CONFIG_FILE).exists() => Self::from_file(Path::new(CONFIG_FILE)),
            None => {
                log::debug!("no {CONFIG_FILE} found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_toml_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(
            DashboardConfig::from_toml_str("").unwrap(),
            DashboardConfig::default()
        );
    }

    #[test]
    fn partial_override() {
        let config = DashboardConfig::from_toml_str(
            r#"
            title = "Local copy"

            [source]
            url = "https://example.com/raptor.csv"
            categorical_columns = ["Team"]

            [charts]
            line_y = "eRD"
            "#,
        )
        .unwrap();

        assert_eq!(config.title, "Local copy");
        assert_eq!(config.source.url, "https://example.com/raptor.csv");
        assert_eq!(config.source.header_row, 1);
        assert_eq!(config.source.categorical_columns, vec!["Team"]);
        assert_eq!(config.charts.line_y, "eRD");
        assert_eq!(config.charts.line_x, "Age");
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(DashboardConfig::from_toml_str("title = ").is_err());
    }
}
