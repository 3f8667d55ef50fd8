//! Domain Layer - Core data types for the pairs engine
//!
//! Pure types with no I/O. Price data comes in through the ports layer;
//! results flow out through the adapters.

pub mod error;
pub mod position;
pub mod price;
pub mod trade;

pub use error::{EngineError, EngineResult};
pub use position::{ExitReason, PositionState};
pub use price::{simple_return, AlignedPair, PriceSeries, PriceTable};
pub use trade::{TradeRecord, TradeSpan};
