//! Price Data
//!
//! Price series, the multi-ticker price table supplied by the data
//! collaborator, and the inner-joined pair every computation runs on.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::error::{EngineError, EngineResult};

/// Ordered (date, price) observations for one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: String,
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl PriceSeries {
    /// Build a series, rejecting unordered or duplicate dates and
    /// negative or non-finite prices.
    ///
    /// A price of exactly zero is accepted; the backtester flags the bar.
    pub fn new(ticker: impl Into<String>, points: Vec<(NaiveDate, f64)>) -> EngineResult<Self> {
        let ticker = ticker.into();
        let mut dates = Vec::with_capacity(points.len());
        let mut values = Vec::with_capacity(points.len());

        for (date, value) in points {
            if let Some(prev) = dates.last() {
                if date <= *prev {
                    return Err(EngineError::degenerate(
                        ticker.clone(),
                        Some(date),
                        format!("dates must be strictly increasing (previous {prev})"),
                    ));
                }
            }
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::degenerate(
                    ticker.clone(),
                    Some(date),
                    format!("invalid price {value}"),
                ));
            }
            dates.push(date);
            values.push(value);
        }

        Ok(Self { ticker, dates, values })
    }

    /// Convenience constructor for consecutive calendar days starting at `start`
    pub fn daily(
        ticker: impl Into<String>,
        start: NaiveDate,
        values: &[f64],
    ) -> EngineResult<Self> {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + Duration::days(i as i64), *v))
            .collect();
        Self::new(ticker, points)
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Cleaned price table: ascending unique dates, one column per ticker.
///
/// Cells may be missing for a ticker on a date; tickers that failed
/// retrieval are simply absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    columns: Vec<Vec<Option<f64>>>,
}

impl PriceTable {
    pub fn new(dates: Vec<NaiveDate>) -> EngineResult<Self> {
        if let Some(w) = dates.windows(2).find(|w| w[1] <= w[0]) {
            return Err(EngineError::degenerate(
                "date_index",
                Some(w[1]),
                "dates must be ascending and unique",
            ));
        }
        Ok(Self {
            dates,
            tickers: Vec::new(),
            columns: Vec::new(),
        })
    }

    /// Add or replace a ticker column. Its length must match the date index.
    pub fn insert_column(
        &mut self,
        ticker: impl Into<String>,
        values: Vec<Option<f64>>,
    ) -> EngineResult<()> {
        let ticker = ticker.into();
        if values.len() != self.dates.len() {
            return Err(EngineError::degenerate(
                ticker,
                None,
                format!(
                    "column has {} values but the date index has {}",
                    values.len(),
                    self.dates.len()
                ),
            ));
        }
        match self.tickers.iter().position(|t| *t == ticker) {
            Some(idx) => self.columns[idx] = values,
            None => {
                self.tickers.push(ticker);
                self.columns.push(values);
            }
        }
        Ok(())
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.tickers.iter().any(|t| t == ticker)
    }

    /// Extract one ticker's observations, dropping missing cells
    pub fn series(&self, ticker: &str) -> EngineResult<PriceSeries> {
        let idx = self
            .tickers
            .iter()
            .position(|t| t == ticker)
            .ok_or_else(|| EngineError::UnknownTicker(ticker.to_string()))?;

        let points = self
            .dates
            .iter()
            .zip(&self.columns[idx])
            .filter_map(|(d, v)| v.map(|v| (*d, v)))
            .collect();
        PriceSeries::new(ticker, points)
    }

    /// Inner-join two columns into a pair (`y` dependent, `x` independent)
    pub fn pair(&self, y: &str, x: &str) -> EngineResult<AlignedPair> {
        AlignedPair::new(&self.series(y)?, &self.series(x)?)
    }
}

/// Two price series restricted to their common dates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedPair {
    pub y_ticker: String,
    pub x_ticker: String,
    pub dates: Vec<NaiveDate>,
    pub y: Vec<f64>,
    pub x: Vec<f64>,
}

impl AlignedPair {
    /// Inner join on dates. Fails with `EmptySeries` when nothing overlaps.
    pub fn new(y: &PriceSeries, x: &PriceSeries) -> EngineResult<Self> {
        let (mut i, mut j) = (0, 0);
        let mut dates = Vec::new();
        let mut ys = Vec::new();
        let mut xs = Vec::new();

        while i < y.len() && j < x.len() {
            let (dy, dx) = (y.dates[i], x.dates[j]);
            if dy == dx {
                dates.push(dy);
                ys.push(y.values[i]);
                xs.push(x.values[j]);
                i += 1;
                j += 1;
            } else if dy < dx {
                i += 1;
            } else {
                j += 1;
            }
        }

        if dates.is_empty() {
            return Err(EngineError::EmptySeries {
                context: format!("no common dates between {} and {}", y.ticker, x.ticker),
            });
        }

        tracing::debug!(
            y = %y.ticker,
            x = %x.ticker,
            aligned = dates.len(),
            dropped_y = y.len() - dates.len(),
            dropped_x = x.len() - dates.len(),
            "aligned pair"
        );

        Ok(Self {
            y_ticker: y.ticker.clone(),
            x_ticker: x.ticker.clone(),
            dates,
            y: ys,
            x: xs,
        })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Label used in logs and reports, e.g. `PEP/KO`
    pub fn label(&self) -> String {
        format!("{}/{}", self.y_ticker, self.x_ticker)
    }
}

/// Close-to-close simple return, `None` when the prior price is zero
pub fn simple_return(prev: f64, current: f64) -> Option<f64> {
    if prev == 0.0 {
        None
    } else {
        Some((current - prev) / prev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_simple_return() {
        assert_eq!(simple_return(100.0, 110.0), Some(0.1));
        assert_eq!(simple_return(0.0, 5.0), None);
    }

    #[test]
    fn test_series_rejects_unordered_dates() {
        let result = PriceSeries::new("KO", vec![(d(2), 10.0), (d(1), 11.0)]);
        assert!(matches!(result, Err(EngineError::DegenerateInput { .. })));

        let result = PriceSeries::new("KO", vec![(d(2), 10.0), (d(2), 11.0)]);
        assert!(matches!(result, Err(EngineError::DegenerateInput { .. })));
    }

    #[test]
    fn test_series_rejects_negative_and_nan() {
        assert!(PriceSeries::new("KO", vec![(d(1), -1.0)]).is_err());
        assert!(PriceSeries::new("KO", vec![(d(1), f64::NAN)]).is_err());
        assert!(PriceSeries::new("KO", vec![(d(1), 0.0)]).is_ok());
    }

    #[test]
    fn test_inner_join_drops_unmatched_dates() {
        let y = PriceSeries::new("PEP", vec![(d(1), 1.0), (d(2), 2.0), (d(4), 4.0)]).unwrap();
        let x = PriceSeries::new("KO", vec![(d(2), 20.0), (d(3), 30.0), (d(4), 40.0)]).unwrap();

        let pair = AlignedPair::new(&y, &x).unwrap();
        assert_eq!(pair.dates, vec![d(2), d(4)]);
        assert_eq!(pair.y, vec![2.0, 4.0]);
        assert_eq!(pair.x, vec![20.0, 40.0]);
        assert_eq!(pair.label(), "PEP/KO");
    }

    #[test]
    fn test_disjoint_series_is_empty_error() {
        let y = PriceSeries::new("PEP", vec![(d(1), 1.0)]).unwrap();
        let x = PriceSeries::new("KO", vec![(d(2), 1.0)]).unwrap();
        assert!(matches!(AlignedPair::new(&y, &x), Err(EngineError::EmptySeries { .. })));
    }

    #[test]
    fn test_table_missing_cells_and_unknown_ticker() {
        let mut table = PriceTable::new(vec![d(1), d(2), d(3)]).unwrap();
        table.insert_column("KO", vec![Some(1.0), None, Some(3.0)]).unwrap();
        table.insert_column("PEP", vec![Some(5.0), Some(6.0), Some(7.0)]).unwrap();

        let ko = table.series("KO").unwrap();
        assert_eq!(ko.len(), 2);

        let pair = table.pair("PEP", "KO").unwrap();
        assert_eq!(pair.dates, vec![d(1), d(3)]);

        assert!(matches!(table.series("MSFT"), Err(EngineError::UnknownTicker(_))));
    }

    #[test]
    fn test_table_rejects_bad_column_length() {
        let mut table = PriceTable::new(vec![d(1), d(2)]).unwrap();
        assert!(table.insert_column("KO", vec![Some(1.0)]).is_err());
    }
}
