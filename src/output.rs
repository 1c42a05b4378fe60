use crate::aggregate::TOTAL_LABEL;
use crate::error::OutputError;
use crate::types::{
    ChartBar, ChartSeries, ComplexAggregate, Report, SummaryCard, SummaryStats, TemplateRow,
};
use crate::util::{format_currency, format_mwh, format_number, format_percent};
use log::debug;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table};

pub const CHART_TITLE: &str = "Análise Energética dos Complexos";

pub fn write_csv<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> Result<(), OutputError> {
    let path = path.as_ref();
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<(), OutputError> {
    let path = path.as_ref();
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Markdown card table under the chart title and period, at most `max_rows`
/// cards. The Total card is always kept as the last line.
pub fn render_report(report: &Report, max_rows: usize) -> String {
    let mut out = format!("{}\n(Period: {})\n\n", CHART_TITLE, report.period_label);
    let cards = summary_cards(report);
    if cards.is_empty() {
        out.push_str("(no rows)\n");
        return out;
    }
    let per_complex = cards.len() - usize::from(report.total.is_some());
    let shown = per_complex.min(max_rows);
    let mut slice: Vec<SummaryCard> = cards[..shown].to_vec();
    slice.extend(cards[per_complex..].iter().cloned());

    out.push_str(&Table::new(slice).with(Style::markdown()).to_string());
    out.push('\n');
    if shown < per_complex {
        out.push_str(&format!("({} more complexes not shown)\n", per_complex - shown));
    }
    out
}

pub fn preview_report(report: &Report, max_rows: usize) {
    println!("{}", render_report(report, max_rows));
}

/// Example rows shipped with the downloadable template.
pub fn template_rows() -> Vec<TemplateRow> {
    vec![
        TemplateRow {
            instant: "21/03/2025".to_string(),
            complex: "Morgado".to_string(),
            potential_energy: format_number(2102.83, 2),
            generated_energy: format_number(3.89, 2),
            adjusted_loss: format_number(1651.55, 2),
            ons_limitation_loss: format_number(451.28, 2),
        },
        TemplateRow {
            instant: "21/03/2025".to_string(),
            complex: "Papagaios".to_string(),
            potential_energy: format_number(2785.47, 2),
            generated_energy: format_number(6.8, 2),
            adjusted_loss: format_number(2369.51, 2),
            ons_limitation_loss: format_number(415.96, 2),
        },
    ]
}

/// What the CLI prints after [`write_template`]. The file is always CSV, so a
/// path with another extension gets a note saying so.
pub fn template_notice(path: &str) -> String {
    let is_csv = Path::new(path)
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        format!("CSV template written to {} (comma-separated, pt-BR decimals)", path)
    } else {
        format!(
            "CSV template written to {} (comma-separated, pt-BR decimals; \
             the file is CSV despite its extension)",
            path
        )
    }
}

pub fn write_template(path: impl AsRef<Path>) -> Result<(), OutputError> {
    write_csv(path, &template_rows())
}

/// Formatted card per chart row; the Total card has no tariff.
pub fn summary_cards(report: &Report) -> Vec<SummaryCard> {
    report
        .rows()
        .map(|a| SummaryCard {
            complex: a.complex.clone(),
            potential: format_mwh(a.potential_energy_mwh),
            generated: format_mwh(a.generated_energy_mwh),
            adjusted_loss: format_mwh(a.adjusted_loss_mwh),
            ons_limitation: format_mwh(a.ons_limitation_loss_mwh),
            total_loss: format_mwh(a.total_loss_mwh()),
            unavailability: format_percent(a.unavailability_percent),
            tariff: if a.complex == TOTAL_LABEL {
                String::new()
            } else {
                format_currency(a.tariff_rate)
            },
            lost_value: format_currency(a.total_lost_value_brl),
            adjusted_lost_value: format_currency(a.total_adjusted_lost_value_brl),
        })
        .collect()
}

pub fn chart_series(report: &Report) -> ChartSeries {
    let rows: Vec<&ComplexAggregate> = report.rows().collect();
    let values = |f: fn(&ComplexAggregate) -> f64| -> Vec<f64> {
        rows.iter().map(|a| f(a)).collect()
    };
    let (min, max) = y_axis_domain(&rows);

    ChartSeries {
        title: CHART_TITLE.to_string(),
        period_label: report.period_label.clone(),
        categories: rows.iter().map(|a| a.complex.clone()).collect(),
        bars: vec![
            ChartBar {
                key: "potential_energy_mwh",
                name: "Energia Potencial (MWh)",
                color: "#4299e1",
                stack: Some("a"),
                values: values(|a| a.potential_energy_mwh),
            },
            ChartBar {
                key: "adjusted_loss_mwh",
                name: "Perda Energética Ajustada (MWh)",
                color: "#f56565",
                stack: Some("b"),
                values: values(|a| a.adjusted_loss_mwh),
            },
            ChartBar {
                key: "ons_limitation_loss_mwh",
                name: "Limitações ONS (MWh)",
                color: "#c53030",
                stack: Some("b"),
                values: values(|a| a.ons_limitation_loss_mwh),
            },
            ChartBar {
                key: "generated_energy_mwh",
                name: "Energia Gerada (MWh)",
                color: "#48bb78",
                stack: None,
                values: values(|a| a.generated_energy_mwh),
            },
        ],
        y_domain: (min, max),
        y_ticks: y_axis_ticks(min, max),
    }
}

/// Y range covering every bar with a 10% margin, rounded to 1/2/5 x 10^n and
/// never narrower than +-1000.
pub fn y_axis_domain(rows: &[&ComplexAggregate]) -> (f64, f64) {
    if rows.is_empty() {
        return (0.0, 0.0);
    }
    let mut max_positive: f64 = 0.0;
    let mut min_negative: f64 = 0.0;
    for a in rows {
        max_positive = max_positive
            .max(a.potential_energy_mwh)
            .max(a.generated_energy_mwh);
        min_negative = min_negative
            .min(a.adjusted_loss_mwh)
            .min(a.ons_limitation_loss_mwh);
    }
    (
        round_axis_down(min_negative * 1.1),
        round_axis_up(max_positive * 1.1),
    )
}

fn nice_step(magnitude: f64, abs: f64) -> f64 {
    if abs <= 2.0 * magnitude {
        magnitude
    } else if abs <= 5.0 * magnitude {
        2.0 * magnitude
    } else {
        5.0 * magnitude
    }
}

fn round_axis_up(v: f64) -> f64 {
    if v < 1000.0 {
        return 1000.0;
    }
    let magnitude = 10f64.powi(v.log10().floor() as i32);
    let step = nice_step(magnitude, v);
    (v / step).ceil() * step
}

fn round_axis_down(v: f64) -> f64 {
    if v > -1000.0 {
        return -1000.0;
    }
    let magnitude = 10f64.powi(v.abs().log10().floor() as i32);
    let step = nice_step(magnitude, v.abs());
    (v / step).floor() * step
}

/// Zero plus evenly spaced ticks of at least 1000 MWh in both directions.
pub fn y_axis_ticks(min: f64, max: f64) -> Vec<f64> {
    let interval = (((max - min) / 6.0 / 1000.0).ceil() * 1000.0).max(1000.0);
    let mut ticks = vec![0.0];
    let mut i = interval;
    while i <= max {
        ticks.push(i);
        i += interval;
    }
    let mut i = -interval;
    while i >= min {
        ticks.push(i);
        i -= interval;
    }
    ticks.sort_by(|a, b| a.total_cmp(b));
    ticks
}

pub fn summary_stats(report: &Report, total_records: usize) -> SummaryStats {
    let total = report.total.as_ref();
    SummaryStats {
        period_label: report.period_label.clone(),
        total_complexes: report.aggregates.len(),
        total_records,
        total_potential_mwh: total.map_or(0.0, |t| t.potential_energy_mwh),
        total_generated_mwh: total.map_or(0.0, |t| t.generated_energy_mwh),
        total_unavailability_percent: total.map_or(0.0, |t| t.unavailability_percent),
        total_lost_value_brl: total.map_or(0.0, |t| t.total_lost_value_brl),
        rows: report.rows().cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, synthesize_total};
    use crate::types::{FilterSpec, RawRecord};

    fn report_from(values: &[(&str, f64, f64, f64, f64)]) -> Report {
        let aggregates: Vec<ComplexAggregate> = values
            .iter()
            .map(|(c, p, g, adj, ons)| {
                aggregate(
                    c,
                    &[RawRecord {
                        complex: c.to_string(),
                        timestamp: None,
                        potential_energy_mwh: *p,
                        generated_energy_mwh: *g,
                        adjusted_loss_mwh: *adj,
                        ons_limitation_loss_mwh: *ons,
                    }],
                )
            })
            .collect();
        let total = synthesize_total(&aggregates);
        Report {
            period_label: "All records".to_string(),
            filter: FilterSpec::default(),
            aggregates,
            total,
        }
    }

    #[test]
    fn test_summary_cards_hide_total_tariff() {
        let report = report_from(&[("Morgado", 100.0, 80.0, 10.0, 10.0)]);
        let cards = summary_cards(&report);

        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].tariff, "R$ 770,14");
        assert_eq!(cards[0].unavailability, "20,00%");
        assert_eq!(cards[0].adjusted_loss, "-10,00 MWh");
        assert_eq!(cards[0].total_loss, "20,00 MWh");
        assert_eq!(cards[1].complex, "Total");
        assert!(cards[1].tariff.is_empty());
    }

    #[test]
    fn test_chart_series_includes_total_category() {
        let report = report_from(&[
            ("Morgado", 2102.83, 3.89, 1651.55, 451.28),
            ("Papagaios", 2785.47, 6.8, 2369.51, 415.96),
        ]);
        let series = chart_series(&report);

        assert_eq!(series.categories, vec!["Morgado", "Papagaios", "Total"]);
        assert_eq!(series.bars.len(), 4);
        assert!(series.bars[1].values.iter().all(|v| *v <= 0.0));
        assert_eq!(series.y_domain, (-6000.0, 10000.0));
        assert_eq!(
            series.y_ticks,
            vec![-6000.0, -3000.0, 0.0, 3000.0, 6000.0, 9000.0]
        );
    }

    #[test]
    fn test_y_axis_minimum_span() {
        let report = report_from(&[("Morgado", 1500.0, 10.0, 200.0, 100.0)]);
        let rows: Vec<&ComplexAggregate> = report.aggregates.iter().collect();
        assert_eq!(y_axis_domain(&rows), (-1000.0, 2000.0));
        assert_eq!(y_axis_ticks(-1000.0, 1000.0), vec![-1000.0, 0.0, 1000.0]);
        assert_eq!(y_axis_domain(&[]), (0.0, 0.0));
    }

    #[test]
    fn test_write_template_has_required_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.csv");
        write_template(path.to_str().unwrap()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let header = contents.lines().next().unwrap();
        for column in crate::types::Column::ALL {
            assert!(header.contains(column.header()), "missing {}", column.header());
        }
        assert_eq!(contents.lines().count(), 3);
    }

    #[test]
    fn test_template_notice_names_the_csv_format() {
        assert_eq!(
            template_notice("modelo-analise-energetica.csv"),
            "CSV template written to modelo-analise-energetica.csv (comma-separated, pt-BR decimals)"
        );
        let odd = template_notice("modelo.xlsx");
        assert!(odd.starts_with("CSV template written to modelo.xlsx"));
        assert!(odd.contains("the file is CSV despite its extension"));
    }

    #[test]
    fn test_render_report_titles_the_table_and_keeps_total_last() {
        let mut report = report_from(&[
            ("Morgado", 2102.83, 3.89, 1651.55, 451.28),
            ("Papagaios", 2785.47, 6.8, 2369.51, 415.96),
        ]);
        report.period_label = "Yesterday (20/03/2025)".to_string();

        let full = render_report(&report, 10);
        assert!(full.starts_with(CHART_TITLE));
        assert!(full.contains("(Period: Yesterday (20/03/2025))"));
        assert!(full.contains("Papagaios"));
        assert!(!full.contains("not shown"));

        let cut = render_report(&report, 1);
        assert!(cut.contains("Morgado"));
        assert!(!cut.contains("Papagaios"));
        assert!(cut.contains("| Total"));
        assert!(cut.contains("(1 more complexes not shown)"));
    }
}
