use crate::error::{IngestError, Result};
use crate::tariff::canonical_complex;
use crate::types::{Cell, Column, RawRecord, RecordSet, SheetRow};
use crate::util::{parse_date, try_parse_number};
use calamine::{open_workbook_auto, Data, ExcelDateTime, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::iter;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_records: usize,
    pub skipped_rows: usize,
    pub number_warnings: usize,
    pub date_warnings: usize,
}

/// Read the first sheet of a workbook (or a CSV file) into header-keyed rows.
pub fn read_rows(path: &Path) -> Result<Vec<SheetRow>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => read_csv_rows(path),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook_rows(path),
        _ => Err(IngestError::UnsupportedFormat(path.display().to_string())),
    }
}

fn read_workbook_rows(path: &Path) -> Result<Vec<SheetRow>> {
    let mut workbook = open_workbook_auto(path)?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| IngestError::EmptyWorkbook(path.display().to_string()))?;
    let range = workbook.worksheet_range(&first)?;
    debug!("Reading sheet '{}' from {}", first, path.display());

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row.iter().map(header_text).collect();

    let mut out = Vec::new();
    for row in rows {
        if row.iter().all(|cell| matches!(cell, Data::Empty)) {
            continue;
        }
        out.push(zip_row(&headers, row.iter().map(cell_from_data)));
    }
    Ok(out)
}

fn read_csv_rows(path: &Path) -> Result<Vec<SheetRow>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut out = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        out.push(zip_row(&headers, record.iter().map(Cell::from)));
    }
    Ok(out)
}

// Every named header gets an entry so the first row always carries the full
// key set. Unnamed columns still consume their cell to keep positions aligned.
fn zip_row(headers: &[String], cells: impl Iterator<Item = Cell>) -> SheetRow {
    headers
        .iter()
        .zip(cells.chain(iter::repeat(Cell::Empty)))
        .filter(|(h, _)| !h.is_empty())
        .map(|(h, cell)| (h.clone(), cell))
        .collect()
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

fn cell_from_data(cell: &Data) -> Cell {
    match cell {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::String(s) => Cell::from(s.as_str()),
        Data::DateTime(dt) => excel_datetime(dt)
            .map(Cell::DateTime)
            .unwrap_or(Cell::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Empty,
    }
}

// Calendar components come from calamine, which knows whether the workbook
// counts from 1900 or 1904. Durations and Excel's phantom 1900-02-29 yield None.
fn excel_datetime(dt: &ExcelDateTime) -> Option<NaiveDateTime> {
    if !dt.is_datetime() {
        return None;
    }
    let (year, month, day, hour, minute, second, milli) = dt.to_ymd_hms_milli();
    NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))?.and_hms_milli_opt(
        u32::from(hour),
        u32::from(minute),
        u32::from(second),
        u32::from(milli),
    )
}

/// Map each required column to the header actually used in the sheet.
///
/// Headers match case-insensitively and ignore surrounding whitespace.
pub fn resolve_columns(first_row: &SheetRow) -> Result<HashMap<Column, String>> {
    let by_upper: HashMap<String, &String> = first_row
        .keys()
        .map(|k| (k.trim().to_uppercase(), k))
        .collect();

    let mut resolved = HashMap::new();
    let mut missing = Vec::new();
    for column in Column::ALL {
        match by_upper.get(column.header()) {
            Some(actual) => {
                resolved.insert(column, (*actual).clone());
            }
            None => missing.push(column.header().to_string()),
        }
    }
    if !missing.is_empty() {
        return Err(IngestError::MissingColumns(missing));
    }
    Ok(resolved)
}

/// Turn sheet rows into per-complex record groups.
///
/// Fails only when a required column is absent. Bad numbers become 0 and bad
/// dates become `None`; both are logged and counted but never abort the batch.
pub fn ingest(rows: &[SheetRow]) -> Result<(RecordSet, LoadReport)> {
    let mut report = LoadReport {
        total_rows: rows.len(),
        ..LoadReport::default()
    };
    let Some(first) = rows.first() else {
        warn!("Spreadsheet has no data rows");
        return Ok((RecordSet::new(), report));
    };
    let columns = resolve_columns(first)?;
    let empty = Cell::Empty;
    let cell = |row: &SheetRow, column: Column| -> Cell {
        columns
            .get(&column)
            .and_then(|h| row.get(h))
            .unwrap_or(&empty)
            .clone()
    };

    let mut set = RecordSet::new();
    for (idx, row) in rows.iter().enumerate() {
        // Spreadsheet line number: header is line 1.
        let line = idx + 2;

        let code = cell(row, Column::Complex);
        if code.is_empty() {
            warn!("Line {}: empty complex code, row skipped", line);
            report.skipped_rows += 1;
            continue;
        }
        let complex = canonical_complex(&code.as_text());

        let mut number = |column: Column| -> f64 {
            let raw = cell(row, column);
            match try_parse_number(&raw) {
                Some(v) => v,
                None => {
                    if !raw.is_empty() {
                        warn!(
                            "Line {}: invalid value '{}' for {}, using 0",
                            line,
                            raw.as_text(),
                            column.header()
                        );
                        report.number_warnings += 1;
                    }
                    0.0
                }
            }
        };
        let potential_energy_mwh = number(Column::PotentialEnergy);
        let generated_energy_mwh = number(Column::GeneratedEnergy);
        let adjusted_loss_mwh = number(Column::AdjustedLoss);
        let ons_limitation_loss_mwh = number(Column::OnsLimitationLoss);

        let instant = cell(row, Column::Instant);
        let timestamp = parse_date(&instant);
        if timestamp.is_none() {
            warn!(
                "Line {}: unrecognized date '{}', record kept without a date",
                line,
                instant.as_text()
            );
            report.date_warnings += 1;
        }

        set.push(RawRecord {
            complex,
            timestamp,
            potential_energy_mwh,
            generated_energy_mwh,
            adjusted_loss_mwh,
            ons_limitation_loss_mwh,
        });
    }

    report.kept_records = set.record_count();
    info!(
        "Ingested {} records for {} complexes ({} rows skipped)",
        report.kept_records,
        set.groups().len(),
        report.skipped_rows
    );
    Ok((set, report))
}

/// Read and ingest a spreadsheet file in one step.
pub fn load_file(path: &Path) -> Result<(RecordSet, LoadReport)> {
    let rows = read_rows(path)?;
    ingest(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::ExcelDateTimeType;
    use std::io::Write;

    fn row(pairs: &[(&str, &str)]) -> SheetRow {
        pairs.iter().map(|(k, v)| (k.to_string(), Cell::from(*v))).collect()
    }

    fn full_row(instant: &str, complex: &str, potential: &str, generated: &str) -> SheetRow {
        row(&[
            ("Instante", instant),
            ("Complexo", complex),
            ("Energia Potencial (MWh)", potential),
            ("Energia Gerada (MWh)", generated),
            ("Perda Energética Ajustada (MWh)", "10"),
            ("Perda Energética por Limitações ONS (MWh)", "5"),
        ])
    }

    #[test]
    fn test_ingest_groups_by_canonical_complex() {
        let rows = vec![
            full_row("01/03/2025", "MOR", "100", "80"),
            full_row("01/03/2025", "PAP", "200", "150"),
            full_row("02/03/2025", "Morgado", "50", "40"),
        ];
        let (set, report) = ingest(&rows).unwrap();

        let names: Vec<&str> = set.complexes().collect();
        assert_eq!(names, vec!["Morgado", "Papagaios"]);
        assert_eq!(set.get("Morgado").unwrap().len(), 2);
        assert_eq!(report.kept_records, 3);
        assert_eq!(report.number_warnings, 0);
    }

    #[test]
    fn test_header_match_is_case_insensitive() {
        let rows = vec![row(&[
            ("  instante ", "01/03/2025"),
            ("COMPLEXO", "MOR"),
            ("energia potencial (mwh)", "1"),
            ("ENERGIA GERADA (MWH)", "1"),
            ("perda energética ajustada (mwh)", "1"),
            ("Perda Energética Por Limitações Ons (Mwh)", "1"),
        ])];
        assert!(ingest(&rows).is_ok());
    }

    #[test]
    fn test_missing_columns_are_listed() {
        let rows = vec![row(&[("Instante", "01/03/2025"), ("Complexo", "MOR")])];
        match ingest(&rows) {
            Err(IngestError::MissingColumns(cols)) => {
                assert_eq!(
                    cols,
                    vec![
                        "ENERGIA GERADA (MWH)",
                        "ENERGIA POTENCIAL (MWH)",
                        "PERDA ENERGÉTICA POR LIMITAÇÕES ONS (MWH)",
                        "PERDA ENERGÉTICA AJUSTADA (MWH)",
                    ]
                );
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_values_degrade_without_failing() {
        let rows = vec![
            full_row("garbage", "MOR", "abc", "1.000,5"),
            full_row("05/03/2025", "MOR", "", "2"),
        ];
        let (set, report) = ingest(&rows).unwrap();
        let records = set.get("Morgado").unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].potential_energy_mwh, 0.0);
        assert_eq!(records[0].generated_energy_mwh, 1000.5);
        assert!(records[0].timestamp.is_none());
        assert_eq!(
            records[1].timestamp.unwrap().date(),
            NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()
        );
        assert_eq!(report.number_warnings, 1);
        assert_eq!(report.date_warnings, 1);
    }

    #[test]
    fn test_rows_without_complex_are_skipped() {
        let rows = vec![
            full_row("01/03/2025", "MOR", "1", "1"),
            full_row("01/03/2025", "  ", "1", "1"),
        ];
        let (set, report) = ingest(&rows).unwrap();
        assert_eq!(set.record_count(), 1);
        assert_eq!(report.skipped_rows, 1);
    }

    #[test]
    fn test_empty_input_is_not_an_error() {
        let (set, report) = ingest(&[]).unwrap();
        assert!(set.is_empty());
        assert_eq!(report.total_rows, 0);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = read_rows(Path::new("data.txt")).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_unnamed_column_keeps_later_cells_aligned() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(
            file,
            "INSTANTE,,COMPLEXO,ENERGIA POTENCIAL (MWH),ENERGIA GERADA (MWH),\
             PERDA ENERGÉTICA AJUSTADA (MWH),PERDA ENERGÉTICA POR LIMITAÇÕES ONS (MWH)"
        )
        .unwrap();
        writeln!(file, "01/03/2025,note,MOR,100,50,10,5").unwrap();
        file.flush().unwrap();

        let rows = read_rows(file.path()).unwrap();
        assert_eq!(rows[0].len(), 6);
        assert_eq!(rows[0]["COMPLEXO"], Cell::from("MOR"));

        let (set, _) = ingest(&rows).unwrap();
        assert_eq!(set.complexes().collect::<Vec<_>>(), vec!["Morgado"]);
        let record = &set.get("Morgado").unwrap()[0];
        assert_eq!(record.potential_energy_mwh, 100.0);
        assert_eq!(record.generated_energy_mwh, 50.0);
        assert_eq!(record.ons_limitation_loss_mwh, 5.0);
    }

    #[test]
    fn test_short_rows_pad_with_empty_cells() {
        let headers = vec!["A".to_string(), String::new(), "B".to_string()];
        let row = zip_row(&headers, vec![Cell::from("x")].into_iter());
        assert_eq!(row.len(), 2);
        assert_eq!(row["A"], Cell::from("x"));
        assert_eq!(row["B"], Cell::Empty);
    }

    #[test]
    fn test_excel_dates_respect_the_workbook_epoch() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 20)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let from_1900 = ExcelDateTime::new(45736.5, ExcelDateTimeType::DateTime, false);
        let from_1904 = ExcelDateTime::new(44274.5, ExcelDateTimeType::DateTime, true);
        assert_eq!(excel_datetime(&from_1900), Some(expected));
        assert_eq!(excel_datetime(&from_1904), Some(expected));
    }

    #[test]
    fn test_excel_durations_stay_numeric() {
        let duration = Data::DateTime(ExcelDateTime::new(1.5, ExcelDateTimeType::TimeDelta, false));
        assert_eq!(cell_from_data(&duration), Cell::Number(1.5));
        assert_eq!(cell_from_data(&Data::Int(7)), Cell::Number(7.0));
        assert_eq!(
            cell_from_data(&Data::Error(calamine::CellErrorType::NA)),
            Cell::Empty
        );
    }
}
