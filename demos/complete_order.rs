use acumulus::collect::{Collector, DocumentSource, NoHooks};
use acumulus::complete::{Completor, VatRateTable};
use acumulus::config::Config;

const ORDER: &str = r#"{
    "id": 2024117,
    "reference": "WEB-2024117",
    "date": "2024-05-14",
    "payment_status": "paid",
    "payment_date": "2024-05-14",
    "payment_method": "ideal",
    "customer": {"id": 88, "email": "anna@example.nl"},
    "billing_address": {
        "first_name": "Anna",
        "last_name": "de Vries",
        "street": "Kerkstraat 1",
        "postcode": "3011 AA",
        "city": "Rotterdam",
        "country_code": "NL"
    },
    "totals": {"amount": "38.00", "vat_amount": "7.02"},
    "lines": [
        {"sku": "TH-01", "name": "Thee", "quantity": 2, "unit_price": "4.00", "vat_rate": 9},
        {
            "sku": "LMP-7",
            "name": "Lamp",
            "quantity": 1,
            "unit_price_inc": "36.30",
            "vat_amount": "6.30",
            "children": [{"name": "Wit"}, {"name": "E27 fitting"}]
        }
    ],
    "shipping": [{"name": "Verzending", "quantity": 1, "unit_price": "5.00", "vat_amount": "1.05"}],
    "discounts": [{"name": "Kortingscode ZOMER", "quantity": 1, "unit_price": "-5.00"}]
}"#;

fn main() {
    // Field mappings can be overridden per shop, here the customer's mark
    // gets the payment method.
    let config = Config::from_json_str(
        r#"{"mappings": {"customer": {"mark": "[source::payment_method]"}}}"#,
    )
    .expect("valid configuration");

    let order = DocumentSource::from_json_str(ORDER).expect("valid order");
    let (mut invoice, mut result) = Collector::new(&config)
        .collect(&order, &NoHooks)
        .expect("order collects");
    println!("Collected {} lines for {}", invoice.lines.len(), order_reference(&invoice));

    result.merge(Completor::new(&config, &VatRateTable::dutch_defaults()).complete(&mut invoice));

    println!("Customer: {:?} ({:?})", invoice.customer.invoice_address.full_name, invoice.customer.mark);
    println!("VAT type: {:?}, concept: {:?}", invoice.vat_type, invoice.concept);
    for line in &invoice.lines {
        println!(
            "  {:<32} {:>8} {:>6}%  {}",
            line.product_name(),
            line.line_amount().round_dp(2),
            line.vat_rate.unwrap_or_default(),
            line.meta.vat_rate_source.code()
        );
    }
    println!("Status: {}", result.status().label());
    for message in result.messages() {
        println!("  {message}");
    }

    let json = serde_json::to_string_pretty(&invoice).expect("invoice serializes");
    println!("\n{json}");
}

fn order_reference(invoice: &acumulus::core::Invoice) -> &str {
    invoice.meta.source_reference.as_deref().unwrap_or("?")
}
