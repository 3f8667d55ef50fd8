//! Butters Pairs - Cointegration Pairs-Trading Engine

use anyhow::Result;

use butters_pairs::adapters::cli;

fn main() -> Result<()> {
    // Load .env file if it exists (PAIRS_PRICES_CSV may live there)
    dotenvy::dotenv().ok();

    let app = cli::init();
    cli::execute(app)
}
