// Entry point and high-level CLI flow.
//
// - Option [1] loads a spreadsheet and prints import diagnostics.
// - Options [2] and [3] change the period / complex filter.
// - Option [4] prints the summary cards and exports chart + summary JSON.
// - Option [5] writes the input template.
use energy_report::config::AppConfig;
use energy_report::output;
use energy_report::util::{self, parse_date_str};
use energy_report::{ComplexSelector, FilterOutcome, FilterSpec, IngestError, Period, Session};
use log::{error, info};
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

// One session per run: the import is kept in memory so filters can be
// switched without re-reading the file.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        session: Session::new(),
    })
});

struct AppState {
    session: Session,
}

fn state() -> MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(PoisonError::into_inner)
}

fn prompt(label: &str) -> String {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_choice() -> String {
    prompt("Enter choice: ")
}

/// Ask the user whether to go back to the menu after showing a report.
fn prompt_back_to_menu() -> bool {
    loop {
        match prompt("Back to Menu (Y/N): ").to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn handle_load(config: &AppConfig) {
    let entered = prompt(&format!("File to import [{}]: ", config.input_path));
    let path = if entered.is_empty() {
        config.input_path.clone()
    } else {
        entered
    };

    let mut state = state();
    match state.session.import_file(Path::new(&path)) {
        Ok(load_report) => {
            println!(
                "Processing dataset... ({} rows read, {} records kept)",
                util::format_int(load_report.total_rows as u64),
                util::format_int(load_report.kept_records as u64)
            );
            if load_report.skipped_rows > 0 {
                println!(
                    "Note: {} rows skipped without a complex code.",
                    util::format_int(load_report.skipped_rows as u64)
                );
            }
            if load_report.number_warnings + load_report.date_warnings > 0 {
                println!(
                    "Note: {} invalid numbers defaulted to 0, {} dates not recognized.",
                    util::format_int(load_report.number_warnings as u64),
                    util::format_int(load_report.date_warnings as u64)
                );
            }
            println!();
        }
        Err(IngestError::MissingColumns(cols)) => {
            eprintln!("Import failed. Missing columns: {}\n", cols.join(", "));
        }
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
        }
    }
}

fn read_optional_date(label: &str) -> Option<chrono::NaiveDate> {
    let raw = prompt(label);
    if raw.is_empty() {
        return None;
    }
    let parsed = parse_date_str(&raw).map(|dt| dt.date());
    if parsed.is_none() {
        println!("Unrecognized date '{}', left unset.", raw);
    }
    parsed
}

fn handle_period() {
    println!("[1] All records");
    println!("[2] Today");
    println!("[3] Yesterday");
    println!("[4] Current month");
    println!("[5] Previous month");
    println!("[6] Custom range\n");
    let period = match read_choice().as_str() {
        "1" => Period::Total,
        "2" => Period::Today,
        "3" => Period::Yesterday,
        "4" => Period::CurrentMonth,
        "5" => Period::PreviousMonth,
        "6" => Period::Custom {
            start: read_optional_date("Start date (DD/MM/YYYY): "),
            end: read_optional_date("End date (DD/MM/YYYY): "),
        },
        _ => {
            println!("Invalid choice.\n");
            return;
        }
    };

    let mut state = state();
    let spec = FilterSpec {
        period,
        complex: state.session.filter().complex.clone(),
    };
    match state.session.set_filter(spec) {
        FilterOutcome::Applied => println!("Period updated.\n"),
        FilterOutcome::Deferred => {
            println!("Custom range needs both dates; keeping the current view.\n")
        }
    }
}

fn handle_complex() {
    let mut state = state();
    let names: Vec<String> = state
        .session
        .records()
        .map(|r| r.complexes().map(str::to_string).collect())
        .unwrap_or_default();
    println!("[0] All complexes");
    for (i, name) in names.iter().enumerate() {
        println!("[{}] {}", i + 1, name);
    }
    println!();

    let choice = read_choice();
    let mut spec = state.session.filter().clone();
    match choice.parse::<usize>() {
        Ok(0) => spec.complex = ComplexSelector::All,
        Ok(n) if n <= names.len() => {
            spec.complex = ComplexSelector::Only(names[n - 1].clone())
        }
        _ => {
            println!("Invalid choice.\n");
            return;
        }
    }
    state.session.set_filter(spec);
    println!("Complex filter updated.\n");
}

/// Print the cards and export chart + summary files.
fn handle_report(config: &AppConfig) {
    let state = state();
    let Some(report) = state.session.report() else {
        println!("Error: No data loaded. Please load a spreadsheet first (option 1).\n");
        return;
    };

    if !report.has_data() {
        println!("{}\n(Period: {})\n", output::CHART_TITLE, report.period_label);
        println!("No data available for this selection.\n");
        return;
    }
    output::preview_report(report, config.preview_rows);

    let chart = output::chart_series(report);
    if let Err(e) = output::write_json(&config.chart_path, &chart) {
        error!("Write error: {}", e);
    }
    let total_records = state
        .session
        .records()
        .map_or(0, |r| r.record_count());
    let summary = output::summary_stats(report, total_records);
    if let Err(e) = output::write_json(&config.summary_path, &summary) {
        error!("Write error: {}", e);
    }
    println!(
        "(Chart data exported to {}, summary to {})\n",
        config.chart_path, config.summary_path
    );
}

fn handle_template(config: &AppConfig) {
    match output::write_template(&config.template_path) {
        Ok(()) => println!("{}\n", output::template_notice(&config.template_path)),
        Err(e) => eprintln!("Failed to write template: {}\n", e),
    }
}

fn main() {
    env_logger::init();
    let mut config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };
    if let Some(path) = std::env::args().nth(1) {
        config.input_path = path;
    }
    info!("Using config: {:?}", config);

    loop {
        println!("Energy Loss Report:");
        println!("[1] Load a spreadsheet");
        println!("[2] Select period");
        println!("[3] Select complex");
        println!("[4] Show report");
        println!("[5] Download template (CSV)");
        println!("[0] Exit\n");
        match read_choice().as_str() {
            "1" => handle_load(&config),
            "2" => handle_period(),
            "3" => handle_complex(),
            "4" => {
                println!();
                handle_report(&config);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "5" => handle_template(&config),
            "0" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 0-5.\n"),
        }
    }
}
