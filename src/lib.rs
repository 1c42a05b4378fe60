//! # Energy Report
//!
//! Turns per-interval production spreadsheets of power-generation complexes
//! into per-complex loss and availability figures.
//!
//! Records are imported once into a [`RecordSet`]. Every filter change
//! re-slices that set by date window and complex, re-aggregates each complex
//! and appends a synthetic "Total" row, producing a fresh [`Report`]:
//!
//! ```rust,ignore
//! use energy_report::*;
//!
//! let mut session = Session::new();
//! session.import_file(std::path::Path::new("analise.xlsx"))?;
//! session.set_filter(FilterSpec::period(Period::PreviousMonth));
//! for card in summary_cards(session.report().unwrap()) {
//!     println!("{}: {}", card.complex, card.unavailability);
//! }
//! ```

pub mod aggregate;
pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod output;
pub mod session;
pub mod tariff;
pub mod types;
pub mod util;

pub use aggregate::{aggregate, synthesize_total, unavailability_percent, TOTAL_LABEL};
pub use config::AppConfig;
pub use error::{ConfigError, IngestError, OutputError};
pub use filter::{apply_filter, period_label, resolve_period, DateWindow, Resolved};
pub use loader::{ingest, load_file, read_rows, LoadReport};
pub use output::{chart_series, summary_cards, summary_stats, write_template};
pub use session::{build_report, FilterOutcome, Session};
pub use tariff::{canonical_complex, tariff_for};
pub use types::*;
pub use util::{parse_date, parse_number, to_comparable_key};
