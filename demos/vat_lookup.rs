//! Look up the VAT rates of a few countries.
//!
//! ```sh
//! cargo run --example vat_lookup -- 2024-05-14 NL BE DE
//! ```

use acumulus::complete::{VatRateLookup, VatRateTable};
use acumulus::config::Config;
use acumulus::web::{AcumulusService, ReqwestTransport};
use chrono::{NaiveDate, Utc};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("acumulus=info")))
        .init();

    let mut args = std::env::args().skip(1);
    let date = match args.next() {
        Some(d) => NaiveDate::parse_from_str(&d, "%Y-%m-%d")?,
        None => Utc::now().date_naive(),
    };
    let countries: Vec<String> = args.collect();
    let countries: Vec<&str> = if countries.is_empty() {
        vec!["NL", "BE", "DE"]
    } else {
        countries.iter().map(String::as_str).collect()
    };

    let config = Config::default().with_env_overrides();
    let transport = ReqwestTransport::from_environment(&config.environment)?;
    let service = AcumulusService::new(config, transport);

    let (mut table, result) = service.fetch_vat_rates(&countries, date).await;
    if result.has_error() {
        eprintln!("{}", result.format_messages());
        eprintln!("falling back to the built-in Dutch rates");
        table.merge(VatRateTable::dutch_defaults());
    }

    for country in table.countries() {
        let rates = table.vat_rates(country, date)?;
        let listed: Vec<String> = rates
            .iter()
            .map(|r| format!("{}% ({})", r.rate, r.kind.as_deref().unwrap_or("?")))
            .collect();
        println!("{country}: {}", listed.join(", "));
    }
    Ok(())
}
