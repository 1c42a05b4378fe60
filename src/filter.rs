use crate::aggregate::aggregate;
use crate::tariff::canonical_complex;
use crate::types::{ComplexAggregate, ComplexSelector, FilterSpec, Period, RawRecord, RecordSet};
use crate::util::{format_date, to_comparable_key};
use chrono::{Datelike, Duration, NaiveDate};
use log::debug;

/// Inclusive window of comparable `YYYY-MM-DD` keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    start_key: String,
    end_key: String,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            start_key: to_comparable_key(start),
            end_key: to_comparable_key(end),
        }
    }

    /// Undated records never fall inside a window.
    pub fn contains(&self, record: &RawRecord) -> bool {
        match record.timestamp {
            Some(ts) => {
                let key = to_comparable_key(ts.date());
                key >= self.start_key && key <= self.end_key
            }
            None => false,
        }
    }
}

/// How a period narrows the record set once reference dates are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Everything,
    Window(DateWindow),
    /// A custom range that is still missing an endpoint.
    Incomplete,
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Resolve a period against `today`.
pub fn resolve_period(period: &Period, today: NaiveDate) -> Resolved {
    match period {
        Period::Total => Resolved::Everything,
        Period::Today => Resolved::Window(DateWindow::new(today, today)),
        Period::Yesterday => {
            let yesterday = today - Duration::days(1);
            Resolved::Window(DateWindow::new(yesterday, yesterday))
        }
        Period::CurrentMonth => Resolved::Window(DateWindow::new(first_of_month(today), today)),
        Period::PreviousMonth => {
            let end = first_of_month(today) - Duration::days(1);
            Resolved::Window(DateWindow::new(first_of_month(end), end))
        }
        Period::Custom {
            start: Some(start),
            end: Some(end),
        } => Resolved::Window(DateWindow::new(*start, *end)),
        Period::Custom { .. } => Resolved::Incomplete,
    }
}

/// Re-slice the imported records and rebuild every aggregate.
///
/// Returns `None` while a custom range is missing an endpoint; callers keep
/// whatever they were showing before. Complexes left without records are
/// still returned, zeroed, so the row set stays stable.
pub fn apply_filter(
    records: &RecordSet,
    spec: &FilterSpec,
    today: NaiveDate,
) -> Option<Vec<ComplexAggregate>> {
    let resolved = resolve_period(&spec.period, today);
    if resolved == Resolved::Incomplete {
        debug!("Custom range incomplete, filter deferred");
        return None;
    }

    let selected = match &spec.complex {
        ComplexSelector::All => None,
        ComplexSelector::Only(name) => Some(canonical_complex(name)),
    };

    let aggregates = records
        .groups()
        .iter()
        .filter(|g| selected.as_deref().map_or(true, |name| g.complex == name))
        .map(|g| {
            let surviving: Vec<RawRecord> = match &resolved {
                Resolved::Window(window) => g
                    .records
                    .iter()
                    .filter(|r| window.contains(r))
                    .cloned()
                    .collect(),
                _ => g.records.clone(),
            };
            debug!(
                "{}: {} of {} records kept",
                g.complex,
                surviving.len(),
                g.records.len()
            );
            aggregate(&g.complex, &surviving)
        })
        .collect();
    Some(aggregates)
}

/// Human-readable description of the active filter.
pub fn period_label(spec: &FilterSpec, today: NaiveDate) -> String {
    let period = match resolve_period(&spec.period, today) {
        Resolved::Everything => "All records".to_string(),
        Resolved::Incomplete => "Custom range (incomplete)".to_string(),
        Resolved::Window(w) => {
            let name = match spec.period {
                Period::Today => "Today",
                Period::Yesterday => "Yesterday",
                Period::CurrentMonth => "Current month",
                Period::PreviousMonth => "Previous month",
                _ => "Custom range",
            };
            if w.start == w.end {
                format!("{} ({})", name, format_date(w.start))
            } else {
                format!("{} ({} to {})", name, format_date(w.start), format_date(w.end))
            }
        }
    };
    match &spec.complex {
        ComplexSelector::All => period,
        ComplexSelector::Only(name) => format!("{} - {}", period, canonical_complex(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dated(complex: &str, date: Option<NaiveDate>, potential: f64) -> RawRecord {
        RawRecord {
            complex: complex.to_string(),
            timestamp: date.map(|d| d.and_hms_opt(13, 45, 0).unwrap()),
            potential_energy_mwh: potential,
            generated_energy_mwh: potential / 2.0,
            adjusted_loss_mwh: 1.0,
            ons_limitation_loss_mwh: 1.0,
        }
    }

    #[test]
    fn test_resolve_reference_windows() {
        let today = ymd(2025, 3, 21);
        assert_eq!(
            resolve_period(&Period::Yesterday, today),
            Resolved::Window(DateWindow::new(ymd(2025, 3, 20), ymd(2025, 3, 20)))
        );
        assert_eq!(
            resolve_period(&Period::CurrentMonth, today),
            Resolved::Window(DateWindow::new(ymd(2025, 3, 1), today))
        );
        assert_eq!(
            resolve_period(&Period::PreviousMonth, today),
            Resolved::Window(DateWindow::new(ymd(2025, 2, 1), ymd(2025, 2, 28)))
        );
    }

    #[test]
    fn test_windows_cross_year_boundaries() {
        let today = ymd(2025, 1, 1);
        assert_eq!(
            resolve_period(&Period::Yesterday, today),
            Resolved::Window(DateWindow::new(ymd(2024, 12, 31), ymd(2024, 12, 31)))
        );
        assert_eq!(
            resolve_period(&Period::PreviousMonth, today),
            Resolved::Window(DateWindow::new(ymd(2024, 12, 1), ymd(2024, 12, 31)))
        );
    }

    #[test]
    fn test_total_keeps_undated_records() {
        let set: RecordSet = vec![dated("Morgado", None, 10.0), dated("Morgado", Some(ymd(2025, 3, 1)), 5.0)]
            .into_iter()
            .collect();
        let out = apply_filter(&set, &FilterSpec::default(), ymd(2025, 3, 21)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].potential_energy_mwh, 15.0);
    }

    #[test]
    fn test_window_ignores_time_of_day_and_undated_records() {
        let today = ymd(2025, 3, 21);
        let set: RecordSet = vec![
            dated("Morgado", Some(today), 10.0),
            dated("Morgado", None, 100.0),
        ]
        .into_iter()
        .collect();
        let out = apply_filter(&set, &FilterSpec::period(Period::Today), today).unwrap();
        assert_eq!(out[0].potential_energy_mwh, 10.0);
    }

    #[test]
    fn test_custom_range_is_inclusive() {
        let set: RecordSet = (1..=10)
            .map(|d| dated("Papagaios", Some(ymd(2025, 3, d)), 1.0))
            .collect();
        let spec = FilterSpec::period(Period::Custom {
            start: Some(ymd(2025, 3, 3)),
            end: Some(ymd(2025, 3, 5)),
        });
        let out = apply_filter(&set, &spec, ymd(2025, 3, 21)).unwrap();
        assert_eq!(out[0].potential_energy_mwh, 3.0);
        assert_eq!(out[0].source_records.len(), 3);
    }

    #[test]
    fn test_incomplete_custom_range_is_deferred() {
        let set: RecordSet = vec![dated("Morgado", Some(ymd(2025, 3, 1)), 1.0)]
            .into_iter()
            .collect();
        let spec = FilterSpec::period(Period::Custom {
            start: Some(ymd(2025, 3, 1)),
            end: None,
        });
        assert!(apply_filter(&set, &spec, ymd(2025, 3, 21)).is_none());
    }

    #[test]
    fn test_complex_selector_accepts_abbreviations() {
        let set: RecordSet = vec![
            dated("Morgado", Some(ymd(2025, 3, 1)), 1.0),
            dated("Papagaios", Some(ymd(2025, 3, 1)), 2.0),
        ]
        .into_iter()
        .collect();
        let out = apply_filter(&set, &FilterSpec::default().with_complex("pap"), ymd(2025, 3, 21)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].complex, "Papagaios");

        let none = apply_filter(&set, &FilterSpec::default().with_complex("Nowhere"), ymd(2025, 3, 21)).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_period_labels() {
        let today = ymd(2025, 3, 21);
        assert_eq!(period_label(&FilterSpec::default(), today), "All records");
        assert_eq!(
            period_label(&FilterSpec::period(Period::Yesterday), today),
            "Yesterday (20/03/2025)"
        );
        assert_eq!(
            period_label(&FilterSpec::period(Period::PreviousMonth).with_complex("MOR"), today),
            "Previous month (01/02/2025 to 28/02/2025) - Morgado"
        );
    }
}
