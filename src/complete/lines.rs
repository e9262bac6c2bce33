//! Per-line completion: defaults and matching calculated VAT rates against
//! the real ones.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::{NatureShop, Config};
use crate::core::{
    Line, LineType, Nature, VatRange, VatRateSource, ex_from_inc, round_half_up,
};
use crate::result::Message;

fn default_product(line_type: LineType) -> Option<&'static str> {
    match line_type {
        LineType::Shipping => Some("Shipping costs"),
        LineType::PaymentFee => Some("Payment fee"),
        LineType::GiftWrapping => Some("Gift wrapping"),
        LineType::Discount => Some("Discount"),
        LineType::Voucher => Some("Voucher"),
        _ => None,
    }
}

fn complete_line(line: &mut Line, nature_shop: NatureShop) {
    if line.nature.is_none() {
        line.nature = if line.meta.line_type.is_service() {
            Some(Nature::Service)
        } else if matches!(line.meta.line_type, LineType::Item | LineType::Manual) {
            match nature_shop {
                NatureShop::Products => Some(Nature::Product),
                NatureShop::Services => Some(Nature::Service),
                NatureShop::Both => None,
            }
        } else {
            None
        };
    }

    line.product = line
        .product
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .or_else(|| default_product(line.meta.line_type).map(str::to_string));

    if line.unit_price.is_none() {
        if let (Some(inc), Some(rate)) = (line.meta.unit_price_inc, line.vat_rate) {
            line.unit_price = Some(round_half_up(ex_from_inc(inc, rate), 4));
        }
    }

    for child in &mut line.children {
        complete_line(child, nature_shop);
    }
}

/// Line defaults: nature, product text, price excluding VAT; optionally drop
/// free shipping lines.
pub fn complete_line_basics(lines: &mut Vec<Line>, config: &Config) {
    if config.invoice.remove_empty_shipping {
        lines.retain(|l| !(l.meta.line_type == LineType::Shipping && l.is_zero_price()));
    }
    for line in lines.iter_mut() {
        complete_line(line, config.shop.nature_shop);
    }
}

/// Outcome of matching a VAT range against the candidate rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeMatch {
    /// Exactly one candidate in range, or the closest of several.
    Range(Decimal),
    /// Several candidates in range, the looked up rate was one of them.
    RangeLookup(Decimal),
    /// No candidate in range; the looked up rate is a candidate.
    Lookup(Decimal),
    NoMatch,
}

/// Match `range` against `candidates`. Among several matches the looked up
/// rate wins, then the rate closest to the calculated one (ties go to the
/// higher rate).
pub fn match_range(range: &VatRange, candidates: &[Decimal], lookup: Option<Decimal>) -> RangeMatch {
    let matches: Vec<Decimal> = candidates.iter().copied().filter(|r| range.contains(*r)).collect();
    match matches.as_slice() {
        [] => match lookup {
            Some(rate) if candidates.contains(&rate) => RangeMatch::Lookup(rate),
            _ => RangeMatch::NoMatch,
        },
        [only] => RangeMatch::Range(*only),
        several => match lookup {
            Some(rate) if several.contains(&rate) => RangeMatch::RangeLookup(rate),
            _ => several
                .iter()
                .copied()
                .min_by(|a, b| range.distance(*a).cmp(&range.distance(*b)).then(b.cmp(a)))
                .map_or(RangeMatch::NoMatch, RangeMatch::Range),
        },
    }
}

fn match_line(line: &mut Line, index: &str, candidates: &[Decimal], messages: &mut Vec<Message>) -> bool {
    let mut made_concept = false;
    match (line.meta.vat_rate_source, line.meta.vat_range) {
        (VatRateSource::Calculated, Some(range)) => {
            let outcome = match_range(&range, candidates, line.meta.lookup_vat_rate);
            debug!(product = line.product_name(), ?range, ?outcome, "VAT range matched");
            let (rate, source) = match outcome {
                RangeMatch::Range(rate) => (rate, VatRateSource::CompletorRange),
                RangeMatch::RangeLookup(rate) => (rate, VatRateSource::CompletorRangeLookup),
                RangeMatch::Lookup(rate) => (rate, VatRateSource::CompletorLookup),
                RangeMatch::NoMatch => {
                    warn!(product = line.product_name(), ?range, "no VAT rate matches");
                    messages.push(
                        Message::warning(
                            "vatrate-no-match",
                            format!(
                                "no known VAT rate lies between {} and {} for '{}', {} is used",
                                range.min.round_dp(2),
                                range.max.round_dp(2),
                                line.product_name(),
                                round_half_up(range.calculated, 1)
                            ),
                        )
                        .with_field(format!("invoice.line[{index}].vatrate")),
                    );
                    made_concept = true;
                    (round_half_up(range.calculated, 1), VatRateSource::Calculated)
                }
            };
            line.vat_rate = Some(rate);
            line.meta.vat_rate_source = source;
        }
        (VatRateSource::Exact, _) => {
            if let Some(rate) = line.vat_rate {
                if !candidates.is_empty() && !candidates.contains(&rate) {
                    messages.push(
                        Message::notice(
                            "vatrate-unknown",
                            format!("VAT rate {rate} of '{}' is not a known rate", line.product_name()),
                        )
                        .with_field(format!("invoice.line[{index}].vatrate")),
                    );
                }
            }
        }
        _ => {}
    }

    for (i, child) in line.children.iter_mut().enumerate() {
        made_concept |= match_line(child, &format!("{index}.{i}"), candidates, messages);
    }
    made_concept
}

/// Give every line with a calculated VAT range a real VAT rate. Returns
/// whether the invoice must be reviewed.
pub fn complete_vat_ranges(lines: &mut [Line], candidates: &[Decimal], messages: &mut Vec<Message>) -> bool {
    let mut made_concept = false;
    for (i, line) in lines.iter_mut().enumerate() {
        made_concept |= match_line(line, &i.to_string(), candidates, messages);
    }
    made_concept
}

/// Most used rate among lines with an amount (ties go to the higher rate).
pub fn most_used_rate(lines: &[Line]) -> Option<Decimal> {
    let mut counts: Vec<(Decimal, usize)> = Vec::new();
    for rate in lines
        .iter()
        .filter(|l| !l.line_amount().is_zero())
        .filter_map(|l| l.vat_rate)
    {
        match counts.iter_mut().find(|(r, _)| *r == rate) {
            Some((_, count)) => *count += 1,
            None => counts.push((rate, 1)),
        }
    }
    counts
        .into_iter()
        .max_by(|(ra, ca), (rb, cb)| ca.cmp(cb).then(ra.cmp(rb)))
        .map(|(rate, _)| rate)
}

/// Zero price lines without a rate get the most used rate.
pub fn complete_zero_price_lines(lines: &mut [Line]) {
    let rate = most_used_rate(lines).unwrap_or(Decimal::ZERO);
    for line in lines.iter_mut() {
        if line.vat_rate.is_none() && line.is_zero_price() {
            line.vat_rate = Some(rate);
            line.meta.vat_rate_source = VatRateSource::Completor;
            if line.unit_price.is_none() {
                line.unit_price = Some(Decimal::ZERO);
            }
        }
    }
}
