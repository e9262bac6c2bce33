use chrono::NaiveDate;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use acumulus::collect::{Collector, DocumentSource, NoHooks};
use acumulus::complete::{Completor, VatRateTable};
use acumulus::config::Config;
use acumulus::core::*;
use acumulus::web::xml::{value_to_xml, xml_to_value};
use acumulus::web::{build_request, invoice_add_message, normalize};

fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 14).unwrap()
}

/// Lines with rates derived from rounded amounts, a bundle and a discount.
fn build_invoice(lines: usize) -> Invoice {
    let mut builder = InvoiceBuilder::new()
        .issue_date(test_date())
        .customer(
            CustomerBuilder::new()
                .email("bench@example.nl")
                .invoice_address(AddressBuilder::new("NL").full_name("Bench Klant").build())
                .build(),
        );

    let mut amount = Decimal::ZERO;
    let mut vat = Decimal::ZERO;
    for i in 1..=lines {
        let rate = if i % 3 == 0 { dec!(9) } else { dec!(21) };
        let price = Decimal::from(i as u64) + dec!(0.95);
        let line_vat = round_half_up(price * rate / dec!(100), 2);
        amount += price;
        vat += line_vat;
        builder = builder.add_line(
            LineBuilder::new(format!("Artikel {i}"), dec!(1), price)
                .item_number(format!("SKU-{i:04}"))
                .vat_amount(line_vat, dec!(0.01), dec!(0.01))
                .build(),
        );
    }
    builder = builder.add_line(
        LineBuilder::new("Bundel", dec!(1), dec!(0))
            .add_child(LineBuilder::new("Onderdeel A", dec!(1), dec!(10)).vat_rate(dec!(21)).build())
            .add_child(LineBuilder::new("Onderdeel B", dec!(1), dec!(5)).vat_rate(dec!(21)).build())
            .build(),
    );
    amount += dec!(15);
    vat += dec!(3.15);
    builder = builder.add_line(
        LineBuilder::new("Korting", dec!(1), dec!(-5))
            .line_type(LineType::Discount)
            .strategy()
            .build(),
    );
    amount -= dec!(5);
    vat -= dec!(1.05);

    builder.shop_totals(amount, vat).build()
}

fn order_json() -> serde_json::Value {
    json!({
        "id": 2024117,
        "date": "2024-05-14",
        "customer": {"email": "anna@example.nl"},
        "billing_address": {"first_name": "Anna", "last_name": "de Vries", "country_code": "NL"},
        "totals": {"amount": "38.00", "vat_amount": "7.02"},
        "lines": [
            {"name": "Thee", "quantity": 2, "unit_price": "4.00", "vat_rate": 9},
            {"name": "Lamp", "quantity": 1, "unit_price_inc": "36.30", "vat_amount": "6.30",
             "children": [{"name": "Wit"}, {"name": "E27 fitting"}]}
        ],
        "shipping": [{"name": "Verzending", "quantity": 1, "unit_price": "5.00", "vat_amount": "1.05"}],
        "discounts": [{"name": "Kortingscode ZOMER", "quantity": 1, "unit_price": "-5.00"}]
    })
}

fn bench_collect(c: &mut Criterion) {
    let config = Config::default();
    let source = DocumentSource::new(order_json()).unwrap();
    c.bench_function("collect_web_shop_order", |b| {
        b.iter(|| black_box(Collector::new(&config).collect(black_box(&source), &NoHooks)));
    });
}

fn bench_complete(c: &mut Criterion) {
    let config = Config::default();
    let rates = VatRateTable::dutch_defaults();
    for lines in [10, 100] {
        let invoice = build_invoice(lines);
        c.bench_function(&format!("complete_{lines}_lines"), |b| {
            b.iter(|| {
                let mut invoice = invoice.clone();
                let result = Completor::new(&config, &rates)
                    .with_today(test_date())
                    .complete(black_box(&mut invoice));
                black_box((invoice, result))
            });
        });
    }
}

fn bench_encode_request(c: &mut Criterion) {
    let config = Config::default();
    let mut invoice = build_invoice(100);
    Completor::new(&config, &VatRateTable::dutch_defaults())
        .with_today(test_date())
        .complete(&mut invoice);
    c.bench_function("encode_invoice_add_100_lines", |b| {
        b.iter(|| {
            let request = build_request(&config, invoice_add_message(black_box(&invoice), true), true);
            black_box(value_to_xml("myxml", &request, false))
        });
    });
}

fn bench_decode_response(c: &mut Criterion) {
    let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?><myxml>\
        <invoice><invoicenumber>20240042</invoicenumber><token>aBc123</token><entryid>9000001</entryid></invoice>\
        <errors><count_errors>0</count_errors></errors>\
        <warnings><warning><code>553</code><codetag>P2XFELO12</codetag><message>Test mode</message></warning>\
        <count_warnings>1</count_warnings></warnings><status>2</status></myxml>";
    c.bench_function("decode_invoice_add_response", |b| {
        b.iter(|| black_box(xml_to_value(black_box(xml)).map(normalize)));
    });
}

criterion_group!(
    benches,
    bench_collect,
    bench_complete,
    bench_encode_request,
    bench_decode_response,
);
criterion_main!(benches);
