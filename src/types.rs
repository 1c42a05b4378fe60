use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tabled::Tabled;

/// A single spreadsheet cell, already lifted out of the workbook/CSV reader.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    DateTime(NaiveDateTime),
    Bool(bool),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text rendering used for names and warning messages.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::DateTime(dt) => dt.to_string(),
            Cell::Bool(b) => b.to_string(),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

/// One sheet row keyed by the header text of its column.
pub type SheetRow = HashMap<String, Cell>;

/// The six columns every input sheet must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Instant,
    Complex,
    GeneratedEnergy,
    PotentialEnergy,
    OnsLimitationLoss,
    AdjustedLoss,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::Instant,
        Column::Complex,
        Column::GeneratedEnergy,
        Column::PotentialEnergy,
        Column::OnsLimitationLoss,
        Column::AdjustedLoss,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            Column::Instant => "INSTANTE",
            Column::Complex => "COMPLEXO",
            Column::GeneratedEnergy => "ENERGIA GERADA (MWH)",
            Column::PotentialEnergy => "ENERGIA POTENCIAL (MWH)",
            Column::OnsLimitationLoss => "PERDA ENERGÉTICA POR LIMITAÇÕES ONS (MWH)",
            Column::AdjustedLoss => "PERDA ENERGÉTICA AJUSTADA (MWH)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRecord {
    pub complex: String,
    pub timestamp: Option<NaiveDateTime>,
    pub potential_energy_mwh: f64,
    pub generated_energy_mwh: f64,
    pub adjusted_loss_mwh: f64,
    pub ons_limitation_loss_mwh: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComplexRecords {
    pub complex: String,
    pub records: Vec<RawRecord>,
}

/// Imported records grouped per complex. Groups keep first-seen order and
/// records keep input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    groups: Vec<ComplexRecords>,
    index: HashMap<String, usize>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: RawRecord) {
        match self.index.get(&record.complex) {
            Some(&idx) => self.groups[idx].records.push(record),
            None => {
                self.index.insert(record.complex.clone(), self.groups.len());
                self.groups.push(ComplexRecords {
                    complex: record.complex.clone(),
                    records: vec![record],
                });
            }
        }
    }

    pub fn get(&self, complex: &str) -> Option<&[RawRecord]> {
        self.index
            .get(complex)
            .map(|&idx| self.groups[idx].records.as_slice())
    }

    pub fn complexes(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.complex.as_str())
    }

    pub fn groups(&self) -> &[ComplexRecords] {
        &self.groups
    }

    pub fn record_count(&self) -> usize {
        self.groups.iter().map(|g| g.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl FromIterator<RawRecord> for RecordSet {
    fn from_iter<I: IntoIterator<Item = RawRecord>>(iter: I) -> Self {
        let mut set = RecordSet::new();
        for r in iter {
            set.push(r);
        }
        set
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexAggregate {
    pub complex: String,
    pub potential_energy_mwh: f64,
    pub generated_energy_mwh: f64,
    /// Always <= 0.
    pub adjusted_loss_mwh: f64,
    /// Always <= 0.
    pub ons_limitation_loss_mwh: f64,
    pub tariff_rate: f64,
    pub unavailability_percent: f64,
    pub total_lost_value_brl: f64,
    pub total_adjusted_lost_value_brl: f64,
    #[serde(skip)]
    pub source_records: Vec<RawRecord>,
}

impl ComplexAggregate {
    pub fn total_loss_mwh(&self) -> f64 {
        self.adjusted_loss_mwh.abs() + self.ons_limitation_loss_mwh.abs()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    Total,
    Today,
    Yesterday,
    CurrentMonth,
    PreviousMonth,
    Custom {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplexSelector {
    All,
    Only(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub period: Period,
    pub complex: ComplexSelector,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            period: Period::Total,
            complex: ComplexSelector::All,
        }
    }
}

impl FilterSpec {
    pub fn period(period: Period) -> Self {
        Self {
            period,
            complex: ComplexSelector::All,
        }
    }

    pub fn with_complex(mut self, complex: &str) -> Self {
        self.complex = ComplexSelector::Only(complex.to_string());
        self
    }
}

/// What the presentation layer receives after every filter change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub period_label: String,
    pub filter: FilterSpec,
    pub aggregates: Vec<ComplexAggregate>,
    pub total: Option<ComplexAggregate>,
}

impl Report {
    /// Per-complex rows followed by the Total row, if any.
    pub fn rows(&self) -> impl Iterator<Item = &ComplexAggregate> {
        self.aggregates.iter().chain(self.total.iter())
    }

    pub fn has_data(&self) -> bool {
        self.total.is_some()
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SummaryCard {
    #[serde(rename = "Complex")]
    #[tabled(rename = "Complex")]
    pub complex: String,
    #[serde(rename = "Potential")]
    #[tabled(rename = "Potential")]
    pub potential: String,
    #[serde(rename = "Generated")]
    #[tabled(rename = "Generated")]
    pub generated: String,
    #[serde(rename = "AdjustedLoss")]
    #[tabled(rename = "AdjustedLoss")]
    pub adjusted_loss: String,
    #[serde(rename = "OnsLimitation")]
    #[tabled(rename = "OnsLimitation")]
    pub ons_limitation: String,
    #[serde(rename = "TotalLoss")]
    #[tabled(rename = "TotalLoss")]
    pub total_loss: String,
    #[serde(rename = "Unavailability")]
    #[tabled(rename = "Unavailability")]
    pub unavailability: String,
    #[serde(rename = "Tariff")]
    #[tabled(rename = "Tariff")]
    pub tariff: String,
    #[serde(rename = "LostValue")]
    #[tabled(rename = "LostValue")]
    pub lost_value: String,
    #[serde(rename = "AdjustedLostValue")]
    #[tabled(rename = "AdjustedLostValue")]
    pub adjusted_lost_value: String,
}

/// Row shape of the downloadable input template. Numbers are written in
/// pt-BR notation so the file imports back unchanged.
#[derive(Debug, Serialize, Clone)]
pub struct TemplateRow {
    #[serde(rename = "INSTANTE")]
    pub instant: String,
    #[serde(rename = "COMPLEXO")]
    pub complex: String,
    #[serde(rename = "ENERGIA POTENCIAL (MWH)")]
    pub potential_energy: String,
    #[serde(rename = "ENERGIA GERADA (MWH)")]
    pub generated_energy: String,
    #[serde(rename = "PERDA ENERGÉTICA AJUSTADA (MWH)")]
    pub adjusted_loss: String,
    #[serde(rename = "PERDA ENERGÉTICA POR LIMITAÇÕES ONS (MWH)")]
    pub ons_limitation_loss: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ChartBar {
    pub key: &'static str,
    pub name: &'static str,
    pub color: &'static str,
    pub stack: Option<&'static str>,
    pub values: Vec<f64>,
}

/// Chart-ready data for an external renderer.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ChartSeries {
    pub title: String,
    pub period_label: String,
    pub categories: Vec<String>,
    pub bars: Vec<ChartBar>,
    pub y_domain: (f64, f64),
    pub y_ticks: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub period_label: String,
    pub total_complexes: usize,
    pub total_records: usize,
    pub total_potential_mwh: f64,
    pub total_generated_mwh: f64,
    pub total_unavailability_percent: f64,
    pub total_lost_value_brl: f64,
    pub rows: Vec<ComplexAggregate>,
}
