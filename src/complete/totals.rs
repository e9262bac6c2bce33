use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::InvoiceSettings;
use crate::core::{Invoice, Line, LineType, Totals, VatRange, VatRateSource, round_half_up};
use crate::result::Message;

use super::lines::{RangeMatch, match_range, most_used_rate};

/// Precision assumed for the difference amounts of a corrector line.
const CORRECTOR_PRECISION: Decimal = Decimal::from_parts(2, 0, 0, false, 2);

/// Sum of the completed lines.
pub fn calculate_totals(lines: &[Line]) -> Totals {
    let (amount, vat_amount) = lines.iter().fold((Decimal::ZERO, Decimal::ZERO), |(ex, vat), l| {
        (ex + l.line_amount(), vat + l.line_vat_amount())
    });
    let amount = round_half_up(amount, 4);
    let vat_amount = round_half_up(vat_amount, 4);
    Totals {
        amount,
        vat_amount,
        amount_inc: amount + vat_amount,
    }
}

/// Compute the invoice totals and compare them with the shop's.
///
/// A difference larger than the tolerance is either corrected with an extra
/// line or reported, depending on `add_missing_amount_line`.
pub fn complete_totals(
    invoice: &mut Invoice,
    settings: &InvoiceSettings,
    candidates: &[Decimal],
    messages: &mut Vec<Message>,
) {
    let calculated = calculate_totals(&invoice.lines);
    invoice.meta.calculated_totals = Some(calculated);

    let Some(shop) = invoice.meta.totals else {
        return;
    };
    let inc_difference = shop.amount_inc - calculated.amount_inc;
    if inc_difference.abs() <= settings.amount_tolerance {
        return;
    }
    let vat_difference = shop.vat_amount - calculated.vat_amount;

    if !settings.add_missing_amount_line {
        warn!(%inc_difference, "invoice total differs from the shop total");
        messages.push(
            Message::warning(
                "totals-mismatch",
                format!(
                    "the invoice lines add up to {} but the shop total is {} (difference {})",
                    calculated.amount_inc.round_dp(2),
                    shop.amount_inc.round_dp(2),
                    inc_difference.round_dp(2)
                ),
            )
            .with_field("invoice.line"),
        );
        return;
    }

    let line = corrector_line(
        &settings.missing_amount_text,
        inc_difference,
        vat_difference,
        candidates,
        most_used_rate(&invoice.lines),
    );
    debug!(amount = ?line.unit_price, rate = ?line.vat_rate, "corrector line added");
    messages.push(Message::notice(
        "totals-corrector",
        format!(
            "a line of {} was added to match the shop total",
            inc_difference.round_dp(2)
        ),
    ));
    invoice.lines.push(line);
    invoice.meta.calculated_totals = Some(calculate_totals(&invoice.lines));
}

fn corrector_line(
    text: &str,
    inc_difference: Decimal,
    vat_difference: Decimal,
    candidates: &[Decimal],
    fallback: Option<Decimal>,
) -> Line {
    let ex_difference = inc_difference - vat_difference;
    let range = VatRange::from_amounts(ex_difference, vat_difference, CORRECTOR_PRECISION, CORRECTOR_PRECISION);
    let matched = range.map(|range| match_range(&range, candidates, fallback));
    let rate = match matched {
        Some(RangeMatch::Range(rate) | RangeMatch::RangeLookup(rate) | RangeMatch::Lookup(rate)) => rate,
        _ => fallback.unwrap_or(Decimal::ZERO),
    };

    let mut line = Line {
        product: Some(text.to_string()),
        quantity: Decimal::ONE,
        unit_price: Some(round_half_up(ex_difference, 4)),
        vat_rate: Some(rate),
        ..Default::default()
    };
    line.meta.line_type = LineType::Corrector;
    line.meta.unit_price_inc = Some(inc_difference);
    line.meta.vat_amount = Some(vat_difference);
    line.meta.vat_range = range;
    line.meta.vat_rate_source = VatRateSource::CorrectorRange;
    line
}
