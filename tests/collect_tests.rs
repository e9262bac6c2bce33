use acumulus::collect::{CollectHooks, Collector, DocumentSource, InvoiceSource, NoHooks, Token, Variables, collect_fields};
use acumulus::config::{Config, FieldMapping};
use acumulus::core::*;
use rust_decimal_macros::dec;
use serde_json::{Value, json};

fn order() -> Value {
    json!({
        "id": 2024117,
        "reference": "WEB-2024117",
        "date": "2024-05-14",
        "payment_status": "paid",
        "payment_date": "2024-05-14",
        "payment_method": "ideal",
        "customer": {"id": 88, "email": "anna@example.nl", "telephone": "010-1234567"},
        "billing_address": {
            "first_name": "Anna",
            "last_name": "de Vries",
            "street": "Kerkstraat 1",
            "postcode": "3011 AA",
            "city": "Rotterdam",
            "country_code": "nl"
        },
        "shipping_address": {
            "first_name": "Bram",
            "last_name": "de Vries",
            "street": "Dorpsweg 12",
            "postcode": "2611 BB",
            "city": "Delft",
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
                "children": [
                    {"name": "Wit"},
                    {"name": "E27 fitting"}
                ]
            }
        ],
        "shipping": [{"name": "Verzending", "quantity": 1, "unit_price": "5.00", "vat_amount": "1.05"}],
        "discounts": [{"name": "Kortingscode ZOMER", "quantity": 1, "unit_price": "-5.00"}]
    })
}

fn collect(config: &Config, document: Value) -> (Invoice, acumulus::AcumulusResult) {
    let source = DocumentSource::new(document).unwrap();
    Collector::new(config).collect(&source, &NoHooks).unwrap()
}

// --- Tokens ---

#[test]
fn token_alternatives_and_literals() {
    let customer = json!({"company": "", "first_name": "Anna", "last_name": "de Vries"});
    let vars = Variables::new().with("customer", &customer);
    let token = Token::parse("[customer::company|customer::first_name+customer::last_name]").unwrap();
    assert_eq!(token.evaluate(&vars), Some(json!("Anna de Vries")));

    let literal = Token::parse("Webwinkel").unwrap();
    assert!(literal.is_literal());
    assert_eq!(literal.evaluate(&vars), Some(json!("Webwinkel")));
}

#[test]
fn token_without_value_is_none() {
    let customer = json!({"first_name": "Anna"});
    let vars = Variables::new().with("customer", &customer);
    assert_eq!(Token::parse("[customer::vat_number]").unwrap().evaluate(&vars), None);
    assert_eq!(Token::parse("[unknown::name]").unwrap().evaluate(&vars), None);
}

#[test]
fn unterminated_token_does_not_parse() {
    assert!(matches!(Token::parse("[customer::name"), Err(AcumulusError::Token(_))));
}

#[test]
fn collect_fields_skips_absent_values() {
    let customer = json!({"email": "anna@example.nl"});
    let vars = Variables::new().with("customer", &customer);
    let mut mapping = FieldMapping::default();
    mapping.set("email", "[customer::email]");
    mapping.set("website", "[customer::website]");
    let fields = collect_fields(&mapping, &vars).unwrap();
    assert_eq!(fields.get("email"), Some(&json!("anna@example.nl")));
    assert!(!fields.contains_key("website"));
}

// --- Document source ---

#[test]
fn document_source_basics() {
    let source = DocumentSource::new(order()).unwrap();
    assert_eq!(source.source_type(), SourceType::Order);
    assert_eq!(source.id(), "2024117");
    assert_eq!(source.reference(), "WEB-2024117");
    assert_eq!(source.country_code().as_deref(), Some("nl"));
    assert_eq!(source.item_lines().len(), 2);
    assert_eq!(source.item_lines()[1].children.len(), 2);
}

#[test]
fn document_source_rejects_bad_shapes() {
    assert!(DocumentSource::new(json!([])).is_err());
    assert!(DocumentSource::new(json!({"lines": {"name": "x"}})).is_err());
    assert!(DocumentSource::new(json!({"type": "quote"})).is_err());
}

// --- Collector ---

#[test]
fn collects_customer_and_addresses() {
    let (invoice, result) = collect(&Config::default(), order());
    let customer = &invoice.customer;
    assert_eq!(customer.email.as_deref(), Some("anna@example.nl"));
    assert_eq!(customer.contact_your_id.as_deref(), Some("88"));
    assert_eq!(customer.invoice_address.full_name.as_deref(), Some("Anna de Vries"));
    assert_eq!(customer.shipping_address.city.as_deref(), Some("Delft"));
    assert!(!result.has_error(), "{}", result.format_messages());
}

#[test]
fn collects_all_line_kinds_in_order() {
    let (invoice, _) = collect(&Config::default(), order());
    let types: Vec<LineType> = invoice.lines.iter().map(|l| l.meta.line_type).collect();
    assert_eq!(
        types,
        vec![LineType::Item, LineType::Item, LineType::Shipping, LineType::Discount]
    );
}

#[test]
fn vat_information_per_line() {
    let (invoice, _) = collect(&Config::default(), order());
    let thee = &invoice.lines[0];
    assert_eq!(thee.vat_rate, Some(dec!(9)));
    assert_eq!(thee.meta.vat_rate_source, VatRateSource::Exact);
    assert_eq!(thee.item_number.as_deref(), Some("TH-01"));

    let lamp = &invoice.lines[1];
    assert_eq!(lamp.meta.vat_rate_source, VatRateSource::Calculated);
    assert_eq!(lamp.unit_price, Some(dec!(30.00)));
    assert!(lamp.meta.vat_range.as_ref().unwrap().contains(dec!(21)));
    assert_eq!(lamp.children.len(), 2);

    let discount = &invoice.lines[3];
    assert_eq!(discount.meta.vat_rate_source, VatRateSource::Strategy);
}

#[test]
fn collects_invoice_meta() {
    let (invoice, _) = collect(&Config::default(), order());
    assert_eq!(invoice.meta.source_reference.as_deref(), Some("WEB-2024117"));
    assert_eq!(invoice.meta.payment_method.as_deref(), Some("ideal"));
    assert_eq!(invoice.payment_status, Some(PaymentStatus::Paid));
    let totals = invoice.meta.totals.unwrap();
    assert_eq!(totals.amount, dec!(38.00));
    assert_eq!(totals.amount_inc, dec!(45.02));
}

#[test]
fn unsigned_refund_is_negated() {
    let mut refund = order();
    refund["type"] = json!("refund");
    let (invoice, _) = collect(&Config::default(), refund);
    assert_eq!(invoice.meta.source_type, SourceType::CreditNote);
    assert_eq!(invoice.lines[0].unit_price, Some(dec!(-4.00)));
    assert_eq!(invoice.lines[3].unit_price, Some(dec!(5.00)));
    assert_eq!(invoice.meta.totals.unwrap().vat_amount, dec!(-7.02));
}

#[test]
fn configured_mapping_overrides_default() {
    let config = Config::from_json_str(
        r#"{"mappings": {"customer": {"mark": "[source::payment_method]", "telephone": null}}}"#,
    )
    .unwrap();
    let (invoice, _) = collect(&config, order());
    assert_eq!(invoice.customer.mark.as_deref(), Some("ideal"));
    assert_eq!(invoice.customer.telephone, None);
}

#[test]
fn unknown_field_is_logged_not_fatal() {
    let config = Config::from_json_str(r#"{"mappings": {"customer": {"shoesize": "[customer::id]"}}}"#).unwrap();
    let (_, result) = collect(&config, order());
    assert!(!result.has_error());
    assert!(!result.messages().is_empty());
}

struct GiftWrapHooks;

impl CollectHooks for GiftWrapHooks {
    fn after_invoice(&self, invoice: &mut Invoice, _source: &dyn InvoiceSource) {
        invoice.lines.push(
            LineBuilder::new("Cadeauverpakking", dec!(1), dec!(2.50))
                .line_type(LineType::GiftWrapping)
                .vat_rate(dec!(21))
                .build(),
        );
    }
}

#[test]
fn hooks_can_add_lines() {
    let source = DocumentSource::new(order()).unwrap();
    let (invoice, _) = Collector::new(&Config::default()).collect(&source, &GiftWrapHooks).unwrap();
    assert_eq!(invoice.lines.len(), 5);
    assert_eq!(invoice.lines[4].meta.line_type, LineType::GiftWrapping);
}
