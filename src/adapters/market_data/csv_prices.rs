//! CSV Price Table
//!
//! Wide layout: one date column (`YYYY-MM-DD`) followed by one column per
//! ticker. Empty cells are missing observations.
//!
//! ```text
//! date,PEP,KO
//! 2024-01-02,170.1,60.2
//! 2024-01-03,171.0,
//! ```

use chrono::NaiveDate;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::domain::error::{EngineError, EngineResult};
use crate::domain::price::{PriceSeries, PriceTable};
use crate::ports::PriceSource;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_DATE_COLUMN: &str = "date";

/// Price source backed by a CSV file loaded once
#[derive(Debug, Clone)]
pub struct CsvPriceSource {
    path: PathBuf,
    table: PriceTable,
}

impl CsvPriceSource {
    pub fn open(path: impl AsRef<Path>, date_column: &str) -> EngineResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let table = read_price_table(file, date_column)?;
        tracing::info!(
            path = %path.display(),
            rows = table.dates().len(),
            tickers = table.tickers().len(),
            "price table loaded"
        );
        Ok(Self { path, table })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> &PriceTable {
        &self.table
    }
}

impl PriceSource for CsvPriceSource {
    fn series(&self, ticker: &str) -> EngineResult<PriceSeries> {
        self.table.series(ticker)
    }

    fn tickers(&self) -> Vec<String> {
        self.table.tickers().to_vec()
    }
}

/// Parse a wide price table. The date column is matched case-insensitively.
pub fn read_price_table<R: Read>(reader: R, date_column: &str) -> EngineResult<PriceTable> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = reader.headers()?.clone();

    let date_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(date_column))
        .ok_or_else(|| {
            EngineError::degenerate("csv header", None, format!("no '{date_column}' column"))
        })?;
    let tickers: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != date_idx)
        .map(|(i, h)| (i, h.to_string()))
        .collect();

    let mut dates = Vec::new();
    let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); tickers.len()];

    for record in reader.records() {
        let record = record?;
        let raw_date = record.get(date_idx).unwrap_or_default();
        let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT).map_err(|e| {
            EngineError::degenerate(date_column, None, format!("invalid date '{raw_date}': {e}"))
        })?;

        for (col, (idx, ticker)) in columns.iter_mut().zip(&tickers) {
            let cell = record.get(*idx).unwrap_or_default();
            let value = if cell.is_empty() {
                None
            } else {
                let v = cell.parse::<f64>().map_err(|e| {
                    EngineError::degenerate(
                        ticker.as_str(),
                        Some(date),
                        format!("invalid price '{cell}': {e}"),
                    )
                })?;
                Some(v)
            };
            col.push(value);
        }
        dates.push(date);
    }

    let mut table = PriceTable::new(dates)?;
    for ((_, ticker), values) in tickers.into_iter().zip(columns) {
        table.insert_column(ticker, values)?;
    }
    Ok(table)
}

/// Write a price table in the same wide layout
pub fn write_price_table<W: Write>(writer: W, table: &PriceTable) -> EngineResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec![DEFAULT_DATE_COLUMN.to_string()];
    header.extend(table.tickers().iter().cloned());
    wtr.write_record(&header)?;

    let columns: Vec<PriceSeries> = table
        .tickers()
        .iter()
        .map(|t| table.series(t))
        .collect::<EngineResult<_>>()?;
    let mut cursors = vec![0usize; columns.len()];

    for date in table.dates() {
        let mut row = vec![date.format(DATE_FORMAT).to_string()];
        for (series, cursor) in columns.iter().zip(cursors.iter_mut()) {
            match series.dates().get(*cursor) {
                Some(d) if d == date => {
                    row.push(series.values()[*cursor].to_string());
                    *cursor += 1;
                }
                _ => row.push(String::new()),
            }
        }
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}
