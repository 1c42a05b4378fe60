use crate::aggregate::synthesize_total;
use crate::error::Result;
use crate::filter::{apply_filter, period_label, resolve_period, Resolved};
use crate::loader::{ingest, load_file, LoadReport};
use crate::types::{FilterSpec, RecordSet, Report, SheetRow};
use chrono::{Local, NaiveDate};
use log::{debug, info};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    Applied,
    /// The filter could not be resolved yet; the previous report is kept.
    Deferred,
}

/// In-memory state for one user: the imported records, the active filter and
/// the report derived from them.
#[derive(Debug, Default)]
pub struct Session {
    records: Option<RecordSet>,
    filter: FilterSpec,
    report: Option<Report>,
    reference_date: Option<NaiveDate>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin "today" instead of reading the local clock.
    pub fn with_reference_date(mut self, today: NaiveDate) -> Self {
        self.reference_date = Some(today);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Local::now().date_naive())
    }

    pub fn records(&self) -> Option<&RecordSet> {
        self.records.as_ref()
    }

    pub fn filter(&self) -> &FilterSpec {
        &self.filter
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    /// Replace the dataset with `rows`. On error nothing changes.
    pub fn import_rows(&mut self, rows: &[SheetRow]) -> Result<LoadReport> {
        let (records, load_report) = ingest(rows)?;
        self.replace_records(records);
        Ok(load_report)
    }

    /// Read a spreadsheet file and replace the dataset. On error nothing changes.
    pub fn import_file(&mut self, path: &Path) -> Result<LoadReport> {
        let (records, load_report) = load_file(path)?;
        info!("Loaded {} records from {}", load_report.kept_records, path.display());
        self.replace_records(records);
        Ok(load_report)
    }

    fn replace_records(&mut self, records: RecordSet) {
        let today = self.today();
        let report = match build_report(&records, &self.filter, today) {
            Some(report) => report,
            None => {
                // A deferred custom range has no previous view of the new data.
                self.filter = FilterSpec::default();
                build_report(&records, &self.filter, today)
                    .unwrap_or_else(|| empty_report(&self.filter, today))
            }
        };
        self.report = Some(report);
        self.records = Some(records);
    }

    /// Switch filters, rebuilding the report from the imported records.
    pub fn set_filter(&mut self, spec: FilterSpec) -> FilterOutcome {
        if resolve_period(&spec.period, self.today()) == Resolved::Incomplete {
            debug!("Custom range incomplete, keeping {:?}", self.filter.period);
            return FilterOutcome::Deferred;
        }
        let Some(records) = &self.records else {
            self.filter = spec;
            return FilterOutcome::Applied;
        };
        match build_report(records, &spec, self.today()) {
            Some(report) => {
                info!("Filter applied: {}", report.period_label);
                self.report = Some(report);
                self.filter = spec;
                FilterOutcome::Applied
            }
            None => FilterOutcome::Deferred,
        }
    }
}

/// Filter, aggregate and total in one pass; `None` when the filter is deferred.
pub fn build_report(records: &RecordSet, spec: &FilterSpec, today: NaiveDate) -> Option<Report> {
    let aggregates = apply_filter(records, spec, today)?;
    let total = synthesize_total(&aggregates);
    Some(Report {
        period_label: period_label(spec, today),
        filter: spec.clone(),
        aggregates,
        total,
    })
}

fn empty_report(spec: &FilterSpec, today: NaiveDate) -> Report {
    Report {
        period_label: period_label(spec, today),
        filter: spec.clone(),
        aggregates: Vec::new(),
        total: None,
    }
}
