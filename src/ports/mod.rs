//! Ports Layer - Trait definitions for external dependencies
//!
//! The engine never fetches prices itself. Adapters (CSV files, in-memory
//! tables) implement `PriceSource`.

pub mod market_data;
pub mod mocks;

pub use market_data::PriceSource;
pub use mocks::InMemoryPriceSource;
