use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::domain::error::{EngineError, EngineResult};
use crate::domain::price::{PriceSeries, PriceTable};
use crate::ports::market_data::PriceSource;

/// In-memory price source that records requested tickers
#[derive(Debug, Default, Clone)]
pub struct InMemoryPriceSource {
    series: BTreeMap<String, PriceSeries>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl InMemoryPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to add (or replace) a series
    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.series.insert(series.ticker().to_string(), series);
        self
    }

    /// Every ticker column of a price table
    pub fn from_table(table: &PriceTable) -> EngineResult<Self> {
        let mut source = Self::new();
        for ticker in table.tickers() {
            source = source.with_series(table.series(ticker)?);
        }
        Ok(source)
    }

    /// Tickers requested so far, in order
    pub fn get_calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|c| c.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl PriceSource for InMemoryPriceSource {
    fn series(&self, ticker: &str) -> EngineResult<PriceSeries> {
        match self.calls.lock() {
            Ok(mut calls) => calls.push(ticker.to_string()),
            Err(poisoned) => poisoned.into_inner().push(ticker.to_string()),
        }
        self.series
            .get(ticker)
            .cloned()
            .ok_or_else(|| EngineError::UnknownTicker(ticker.to_string()))
    }

    fn tickers(&self) -> Vec<String> {
        self.series.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_in_memory_source_records_calls() {
        let source = InMemoryPriceSource::new()
            .with_series(PriceSeries::daily("KO", start(), &[60.0, 61.0]).unwrap())
            .with_series(PriceSeries::daily("PEP", start(), &[170.0, 171.0, 172.0]).unwrap());

        let pair = source.pair("PEP", "KO").unwrap();
        assert_eq!(pair.len(), 2);
        assert_eq!(source.get_calls(), vec!["PEP", "KO"]);
        assert_eq!(source.tickers(), vec!["KO", "PEP"]);
    }

    #[test]
    fn test_missing_ticker() {
        let source = InMemoryPriceSource::new();
        assert!(matches!(source.series("XOM"), Err(EngineError::UnknownTicker(t)) if t == "XOM"));
    }

    #[test]
    fn test_from_table() {
        let dates: Vec<NaiveDate> = (0..3).map(|i| start() + chrono::Duration::days(i)).collect();
        let mut table = PriceTable::new(dates).unwrap();
        table.insert_column("A", vec![Some(1.0), None, Some(3.0)]).unwrap();
        let source = InMemoryPriceSource::from_table(&table).unwrap();
        assert_eq!(source.series("A").unwrap().len(), 2);
    }
}
