use chrono::NaiveDate;
use rust_decimal_macros::dec;

use acumulus::complete::{Completor, VatRateTable};
use acumulus::config::Config;
use acumulus::core::*;
use acumulus::web::invoice_add_message;
use acumulus::web::xml::value_to_xml;

fn main() {
    let config = Config::default();

    // A Dutch consumer order as a shop would hand it over: one line with a
    // known rate, one line with only amounts and a discount without a rate.
    let mut invoice = InvoiceBuilder::new()
        .issue_date(NaiveDate::from_ymd_opt(2024, 5, 14).unwrap())
        .customer(
            CustomerBuilder::new()
                .email("anna@example.nl")
                .invoice_address(
                    AddressBuilder::new("NL")
                        .full_name("Anna de Vries")
                        .street("Kerkstraat 1")
                        .postal_code("3011 AA")
                        .city("Rotterdam")
                        .build(),
                )
                .build(),
        )
        .paid(NaiveDate::from_ymd_opt(2024, 5, 14))
        .shop_totals(dec!(45), dec!(7.29))
        .add_line(
            LineBuilder::new("Kookboek", dec!(1), dec!(20))
                .item_number("BK-112")
                .vat_rate(dec!(9))
                .build(),
        )
        .add_line(
            LineBuilder::new("Pepermolen", dec!(2), dec!(15))
                .item_number("PM-7")
                .vat_amount(dec!(3.15), dec!(0.01), dec!(0.01))
                .build(),
        )
        .add_line(
            LineBuilder::new("Kortingscode WELKOM", dec!(1), dec!(-5))
                .line_type(LineType::Discount)
                .strategy()
                .build(),
        )
        .build();

    let result = Completor::new(&config, &VatRateTable::dutch_defaults()).complete(&mut invoice);

    println!("VAT type: {:?}", invoice.vat_type);
    println!("---");
    for line in &invoice.lines {
        println!(
            "  {} x {} @ {} ({}%, {})",
            line.quantity,
            line.product_name(),
            line.unit_price.unwrap_or_default(),
            line.vat_rate.unwrap_or_default(),
            line.meta.vat_rate_source.code()
        );
    }
    if let Some(totals) = &invoice.meta.calculated_totals {
        println!("---");
        println!("Net:   {}", totals.amount.round_dp(2));
        println!("VAT:   {}", totals.vat_amount.round_dp(2));
        println!("Gross: {}", totals.amount_inc.round_dp(2));
    }
    if !result.messages().is_empty() {
        println!("---");
        println!("{}", result.format_messages());
    }

    let xml = value_to_xml("myxml", &invoice_add_message(&invoice, false), true).expect("message encodes");
    println!("\n{xml}");
}
