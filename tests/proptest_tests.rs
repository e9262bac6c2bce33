//! Property-based tests for the amount handling of the completor.
//!
//! Run with: `cargo test --test proptest_tests`

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use acumulus::collect::{Token, Variables};
use acumulus::complete::{Completor, LineHierarchy, VatRateTable, calculate_totals};
use acumulus::config::{Config, OptionsSettings};
use acumulus::core::*;
use acumulus::result::{AcumulusResult, ApiStatus, Message, Severity};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn cents(n: i64) -> Decimal {
    Decimal::new(n, 2)
}

fn dutch_rate() -> impl Strategy<Value = Decimal> {
    prop_oneof![Just(dec!(0)), Just(dec!(9)), Just(dec!(21))]
}

fn total_amount(lines: &[Line]) -> Decimal {
    lines.iter().map(Line::line_amount).sum()
}

// --- VAT ranges ---

proptest! {
    /// A VAT amount rounded to cents still yields a range around the true rate.
    #[test]
    fn range_from_rounded_vat_contains_real_rate(
        amount in 2i64..10_000_000,
        rate in prop_oneof![Just(dec!(0)), Just(dec!(5.5)), Just(dec!(6)), Just(dec!(9)), Just(dec!(19)), Just(dec!(21)), Just(dec!(27))],
    ) {
        let amount = cents(amount);
        let vat = round_half_up(amount * rate / dec!(100), 2);
        let range = VatRange::from_amounts(amount, vat, dec!(0.01), dec!(0.01)).unwrap();
        prop_assert!(range.contains(rate), "{rate} not in {range:?}");
        prop_assert!(range.min <= range.calculated && range.calculated <= range.max);
    }

    /// Amounts including VAT: both the price and the VAT were rounded.
    #[test]
    fn range_from_inc_amounts_contains_real_rate(amount in 100i64..1_000_000, rate in dutch_rate()) {
        let amount = cents(amount);
        let vat = round_half_up(amount * rate / dec!(100), 2);
        let inc = amount + vat;
        let range = VatRange::from_inc_amounts(inc, vat, dec!(0.01), dec!(0.01)).unwrap();
        prop_assert!(range.contains(rate));
    }

    /// The sign of the amounts does not matter.
    #[test]
    fn range_is_sign_independent(amount in 2i64..1_000_000, rate in dutch_rate()) {
        let amount = cents(amount);
        let vat = round_half_up(amount * rate / dec!(100), 2);
        let positive = VatRange::from_amounts(amount, vat, dec!(0.01), dec!(0.01));
        let negative = VatRange::from_amounts(-amount, -vat, dec!(0.01), dec!(0.01));
        prop_assert_eq!(positive, negative);
    }
}

// --- Completor ---

fn invoice_with(lines: &[(i64, i64, Decimal)]) -> Invoice {
    let mut builder = InvoiceBuilder::new()
        .issue_date(date(2024, 5, 14))
        .customer(CustomerBuilder::new().invoice_address(AddressBuilder::new("NL").build()).build());
    for (i, (quantity, price, rate)) in lines.iter().enumerate() {
        builder = builder.add_line(
            LineBuilder::new(format!("Artikel {i}"), Decimal::from(*quantity), cents(*price))
                .vat_rate(*rate)
                .build(),
        );
    }
    let invoice = builder.build();
    let totals = calculate_totals(&invoice.lines);
    let mut invoice = invoice;
    invoice.meta.totals = Some(totals);
    invoice
}

proptest! {
    /// Lines with known rates that match the shop totals pass unchanged.
    #[test]
    fn matching_totals_need_no_correction(
        lines in prop::collection::vec((1i64..10, 1i64..100_000, dutch_rate()), 1..12),
    ) {
        let config = Config::default();
        let mut invoice = invoice_with(&lines);
        let before = total_amount(&invoice.lines);
        let result = Completor::new(&config, &VatRateTable::dutch_defaults())
            .with_today(date(2024, 5, 14))
            .complete(&mut invoice);
        prop_assert!(!result.has_code_tag("totals-corrector"));
        prop_assert_eq!(invoice.lines.len(), lines.len());
        prop_assert_eq!(total_amount(&invoice.lines), before);
    }

    /// A discount without a rate is spread over the rates on the invoice,
    /// whatever the outcome of the strategies, without changing the amount.
    #[test]
    fn discount_resolution_keeps_the_amount(
        lines in prop::collection::vec((1i64..5, 100i64..50_000, prop_oneof![Just(dec!(9)), Just(dec!(21))]), 1..6),
        discount in 1i64..1_000,
        shop_vat_offset in -50i64..50,
    ) {
        let config = Config::default();
        let mut invoice = invoice_with(&lines);
        let discount = -cents(discount);
        invoice.lines.push(
            LineBuilder::new("Korting", dec!(1), discount)
                .line_type(LineType::Discount)
                .strategy()
                .build(),
        );
        let before = total_amount(&invoice.lines);
        if let Some(totals) = invoice.meta.totals.as_mut() {
            totals.amount += discount;
            totals.vat_amount += cents(shop_vat_offset);
            totals.amount_inc = totals.amount + totals.vat_amount;
        }

        Completor::new(&config, &VatRateTable::dutch_defaults())
            .with_today(date(2024, 5, 14))
            .complete(&mut invoice);

        prop_assert!(invoice.lines.iter().all(|l| l.vat_rate.is_some()));
        let after: Decimal = invoice
            .lines
            .iter()
            .filter(|l| l.meta.line_type != LineType::Corrector)
            .map(Line::line_amount)
            .sum();
        prop_assert!(amounts_equal(after, before, dec!(0.001)), "{after} != {before}");
    }
}

proptest! {
    /// When the shop's VAT total is consistent with some rate for the
    /// discount, the strategies reach it.
    #[test]
    fn strategies_reach_consistent_vat_total(
        lines in prop::collection::vec((1i64..5, 100i64..50_000, prop_oneof![Just(dec!(9)), Just(dec!(21))]), 1..6),
        discount in 1i64..2_000,
        discount_rate in prop_oneof![Just(dec!(9)), Just(dec!(21))],
    ) {
        let config = Config::default();
        let mut invoice = invoice_with(&lines);
        let discount = -cents(discount);
        invoice.lines.push(
            LineBuilder::new("Korting", dec!(1), discount)
                .line_type(LineType::Discount)
                .strategy()
                .build(),
        );
        let shop_vat = {
            let totals = invoice.meta.totals.as_mut().unwrap();
            totals.amount += discount;
            totals.vat_amount += discount * discount_rate / dec!(100);
            totals.amount_inc = totals.amount + totals.vat_amount;
            totals.vat_amount
        };

        let result = Completor::new(&config, &VatRateTable::dutch_defaults())
            .with_today(date(2024, 5, 14))
            .complete(&mut invoice);

        prop_assert!(!result.has_code_tag("strategy-failed"), "{}", result.format_messages());
        let vat: Decimal = invoice.lines.iter().map(Line::line_vat_amount).sum();
        prop_assert!(amounts_equal(vat, shop_vat, dec!(0.02)), "{vat} != {shop_vat}");
    }
}

// --- Hierarchy ---

proptest! {
    /// Flattening a bundle whose parent carries no price keeps the children's total.
    #[test]
    fn unpriced_parent_keeps_children_total(
        children in prop::collection::vec((1i64..4, 1i64..20_000), 1..6),
    ) {
        let mut parent = LineBuilder::new("Bundel", dec!(1), dec!(0));
        for (i, (quantity, price)) in children.iter().enumerate() {
            parent = parent.add_child(
                LineBuilder::new(format!("Onderdeel {i}"), Decimal::from(*quantity), cents(*price))
                    .vat_rate(dec!(21))
                    .build(),
            );
        }
        let parent = parent.build();
        let expected: Decimal = parent.children.iter().map(Line::line_amount).sum();

        let options = OptionsSettings::default();
        let flat = LineHierarchy::new(&options, dec!(0.02)).flatten(vec![parent]);
        prop_assert!(flat.iter().all(|l| l.children.is_empty()));
        prop_assert_eq!(total_amount(&flat), expected);
    }

    /// Informative children never add to the amount of their parent.
    #[test]
    fn informative_children_add_nothing(
        price in 1i64..100_000,
        names in prop::collection::vec("[a-zA-Z ]{1,40}", 0..8),
    ) {
        let mut parent = LineBuilder::new("Lamp", dec!(1), cents(price)).vat_rate(dec!(21));
        for name in &names {
            parent = parent.add_child(LineBuilder::new(name.clone(), dec!(1), dec!(0)).build());
        }
        let options = OptionsSettings::default();
        let flat = LineHierarchy::new(&options, dec!(0.02)).flatten(vec![parent.build()]);
        prop_assert_eq!(total_amount(&flat), cents(price));
    }
}

// --- Tokens and results ---

proptest! {
    /// Parsing arbitrary text never panics, and a parsed token evaluates.
    #[test]
    fn token_parsing_never_panics(expression in ".{0,64}") {
        let item = serde_json::json!({"name": "Thee", "sku": "TH-01"});
        let vars = Variables::new().with("item", &item);
        if let Ok(token) = Token::parse(&expression) {
            let _ = token.evaluate(&vars);
        }
    }

    /// The status of a merged result is the most severe of both.
    #[test]
    fn merged_status_is_most_severe(
        a in prop_oneof![Just(Severity::Notice), Just(Severity::Warning), Just(Severity::Error)],
        b in prop_oneof![Just(Severity::Notice), Just(Severity::Warning), Just(Severity::Exception)],
        api in prop_oneof![Just(ApiStatus::Success), Just(ApiStatus::Warnings), Just(ApiStatus::Errors)],
    ) {
        let mut left = AcumulusResult::new();
        left.add_message(Message::tagged(a, "left", "left"));
        let mut right = AcumulusResult::new();
        right.add_message(Message::tagged(b, "right", "right"));
        right.set_api_status(api);
        let expected = a.max(b).max(api.severity());
        left.merge(right);
        prop_assert_eq!(left.status(), expected);
    }
}
