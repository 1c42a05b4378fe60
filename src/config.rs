use crate::error::ConfigError;
use log::info;
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_ENV: &str = "ENERGY_REPORT_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "energy_report.json";

/// File locations and preview size for the terminal front end.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_input_path")]
    pub input_path: String,
    #[serde(default = "default_template_path")]
    pub template_path: String,
    #[serde(default = "default_summary_path")]
    pub summary_path: String,
    #[serde(default = "default_chart_path")]
    pub chart_path: String,
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            template_path: default_template_path(),
            summary_path: default_summary_path(),
            chart_path: default_chart_path(),
            preview_rows: default_preview_rows(),
        }
    }
}

fn default_input_path() -> String {
    "analise-energetica.xlsx".to_owned()
}

fn default_template_path() -> String {
    "modelo-analise-energetica.csv".to_owned()
}

fn default_summary_path() -> String {
    "summary.json".to_owned()
}

fn default_chart_path() -> String {
    "chart.json".to_owned()
}

fn default_preview_rows() -> usize {
    10
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// `$ENERGY_REPORT_CONFIG`, else `energy_report.json` if present, else defaults.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            info!("Loading config from {} ({})", path, CONFIG_ENV);
            return Self::from_file(Path::new(&path));
        }
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            info!("Loading config from {}", DEFAULT_CONFIG_PATH);
            return Self::from_file(default_path);
        }
        Ok(Self::default())
    }
}
