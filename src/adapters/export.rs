//! Result Export
//!
//! Backtest table as CSV (one row per date), trades as CSV and full reports
//! as pretty JSON.

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::application::backtester::BacktestResult;
use crate::domain::error::{EngineError, EngineResult};
use crate::domain::trade::TradeRecord;

pub fn write_backtest_csv<W: Write>(writer: W, result: &BacktestResult) -> EngineResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in &result.rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_trades_csv<W: Write>(writer: W, trades: &[TradeRecord]) -> EngineResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for trade in trades {
        wtr.serialize(trade)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<W: Write, T: Serialize + ?Sized>(writer: W, value: &T) -> EngineResult<()> {
    serde_json::to_writer_pretty(writer, value)
        .map_err(|e| EngineError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))
}

/// Backtest table to a CSV file
pub fn export_backtest_csv(path: impl AsRef<Path>, result: &BacktestResult) -> EngineResult<()> {
    let path = path.as_ref();
    write_backtest_csv(BufWriter::new(File::create(path)?), result)?;
    tracing::info!(path = %path.display(), rows = result.len(), "backtest exported");
    Ok(())
}

pub fn export_trades_csv(path: impl AsRef<Path>, trades: &[TradeRecord]) -> EngineResult<()> {
    let path = path.as_ref();
    write_trades_csv(BufWriter::new(File::create(path)?), trades)?;
    tracing::info!(path = %path.display(), trades = trades.len(), "trades exported");
    Ok(())
}

/// Any serializable report to a pretty JSON file
pub fn export_json<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> EngineResult<()> {
    let path = path.as_ref();
    let mut out = BufWriter::new(File::create(path)?);
    write_json(&mut out, value)?;
    out.flush()?;
    tracing::info!(path = %path.display(), "report exported");
    Ok(())
}
