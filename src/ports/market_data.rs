//! Price Source Port
//!
//! Contract with the data collaborator: a cleaned price table keyed by
//! ticker. Tickers that failed retrieval are simply absent.

use crate::domain::error::EngineResult;
use crate::domain::price::{AlignedPair, PriceSeries};

/// Supplies price series by ticker
pub trait PriceSource: Send + Sync {
    /// Series for `ticker`, or `EngineError::UnknownTicker` when absent
    fn series(&self, ticker: &str) -> EngineResult<PriceSeries>;

    /// Available tickers
    fn tickers(&self) -> Vec<String>;

    /// Both legs inner-joined on date
    fn pair(&self, y: &str, x: &str) -> EngineResult<AlignedPair> {
        let y = self.series(y)?;
        let x = self.series(x)?;
        AlignedPair::new(&y, &x)
    }
}
