//! Send an order to Acumulus in test mode.
//!
//! ```sh
//! ACUMULUS_CONTRACT_CODE=... ACUMULUS_USERNAME=... ACUMULUS_PASSWORD=... \
//!     RUST_LOG=acumulus=debug cargo run --example send_invoice
//! ```

use acumulus::Acumulus;
use acumulus::collect::{DocumentSource, NoHooks};
use acumulus::config::Config;
use acumulus::web::{InvoiceAdded, ReqwestTransport};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("acumulus=info")))
        .init();

    let mut config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    }
    .with_env_overrides();
    config.environment.test_mode = true;
    config.connector.application = "Demo shop".into();

    let transport = ReqwestTransport::from_environment(&config.environment)?;
    let acumulus = Acumulus::new(config, transport);

    let order = DocumentSource::from_json_str(
        r#"{
            "id": 1001,
            "date": "2024-05-14",
            "customer": {"email": "jan@example.nl"},
            "billing_address": {"first_name": "Jan", "last_name": "Jansen", "country_code": "NL"},
            "totals": {"amount": "9.00", "vat_amount": "0.81"},
            "lines": [{"name": "Koffie", "quantity": 2, "unit_price": "4.50", "vat_amount": "0.405"}]
        }"#,
    )?;

    let outcome = acumulus.send_invoice(&order, &NoHooks).await?;
    println!("Sent: {}, status: {}", outcome.result.is_sent(), outcome.result.status().label());
    if let Ok(added) = outcome.result.response_as::<InvoiceAdded>() {
        println!("Invoice {} (token {})", added.invoicenumber, added.token);
        println!("PDF: {}", acumulus.service().invoice_pdf_uri(&added.token));
    }
    if !outcome.result.messages().is_empty() {
        println!("{}", outcome.result.format_messages());
    }
    Ok(())
}
