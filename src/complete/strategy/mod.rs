//! VAT rate strategies for lines whose rate cannot be derived from their own
//! amounts (discounts over mixed-rate orders, fees, manual corrections).
//!
//! The only thing known about such lines is that, together with the other
//! lines, they must add up to the shop's VAT total. Each [`Strategy`] proposes
//! rates (possibly splitting a line over several rates) and the first one
//! that reaches the target VAT within the tolerance wins.

mod permutations;
mod same_rate;
mod split_known_discount;
mod split_non_matching;

pub use permutations::TryAllVatRatePermutations;
pub use same_rate::ApplySameVatRate;
pub use split_known_discount::SplitKnownDiscountLine;
pub use split_non_matching::SplitNonMatchingLine;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::core::{Invoice, Line, VatRateSource, amounts_equal, ex_from_inc, round_half_up};
use crate::result::Message;

/// What a strategy gets to work with.
#[derive(Debug, Clone)]
pub struct StrategyInput<'a> {
    /// Lines to find a rate for, in invoice order.
    pub lines: &'a [Line],
    /// VAT the strategy lines must add up to.
    pub target_vat: Decimal,
    /// Rates used by the other lines, most frequent first.
    pub used_rates: Vec<Decimal>,
    /// Rates to try: the used ones first, then the remaining candidates.
    pub candidates: Vec<Decimal>,
    /// Amount excluding VAT of the other lines, per rate.
    pub subtotals: Vec<(Decimal, Decimal)>,
    pub tolerance: Decimal,
}

impl StrategyInput<'_> {
    /// Whether `vat` is close enough to the target.
    pub fn accepts(&self, vat: Decimal) -> bool {
        amounts_equal(vat, self.target_vat, self.tolerance)
    }
}

/// One way of assigning VAT rates to strategy lines.
pub trait Strategy {
    fn name(&self) -> &'static str;

    /// Replacement lines for each input line (same order), or `None` when
    /// this strategy finds no solution.
    fn apply(&self, input: &StrategyInput<'_>) -> Option<Vec<Vec<Line>>>;
}

/// Strategies in the order they are tried.
pub fn default_strategies() -> Vec<Box<dyn Strategy>> {
    vec![
        Box::new(ApplySameVatRate),
        Box::new(SplitKnownDiscountLine),
        Box::new(SplitNonMatchingLine),
        Box::new(TryAllVatRatePermutations),
    ]
}

/// Total including VAT of a line, from whichever price is known.
pub(crate) fn amount_inc(line: &Line) -> Option<Decimal> {
    line.meta.unit_price_inc.map(|inc| inc * line.quantity)
}

/// `line` with `rate` applied. A line known only including VAT gets its
/// price excluding VAT derived from the rate.
pub(crate) fn with_rate(line: &Line, rate: Decimal) -> Line {
    let mut line = line.clone();
    if line.unit_price.is_none() {
        if let Some(inc) = line.meta.unit_price_inc {
            line.unit_price = Some(round_half_up(ex_from_inc(inc, rate), 4));
        }
    }
    line.vat_rate = Some(rate);
    line.meta.vat_rate_source = VatRateSource::StrategyCompleted;
    line
}

/// Split `line` into one line per `(rate, amount excluding VAT)` part. The
/// last part absorbs the rounding so the parts add up to the rounded total.
pub(crate) fn split_line(line: &Line, parts: &[(Decimal, Decimal)]) -> Vec<Line> {
    if let [(rate, _)] = parts {
        return vec![with_rate(line, *rate)];
    }
    let total = round_half_up(parts.iter().map(|(_, amount)| *amount).sum(), 4);
    let mut assigned = Decimal::ZERO;
    parts
        .iter()
        .enumerate()
        .map(|(i, (rate, amount))| {
            let amount = if i + 1 == parts.len() {
                total - assigned
            } else {
                round_half_up(*amount, 4)
            };
            assigned += amount;
            let mut part = line.clone();
            part.quantity = Decimal::ONE;
            part.unit_price = Some(amount);
            part.vat_rate = Some(*rate);
            part.meta.unit_price_inc = None;
            part.meta.vat_amount = None;
            part.meta.vat_range = None;
            part.meta.vat_rate_source = VatRateSource::StrategyCompleted;
            part.meta.strategy_split = true;
            part
        })
        .collect()
}

/// VAT of a set of replacement lines.
pub(crate) fn vat_of<'a>(lines: impl IntoIterator<Item = &'a Line>) -> Decimal {
    lines.into_iter().map(Line::line_vat_amount).sum()
}

/// Spread `line` over the rates of `subtotals`, proportional to their
/// amounts. `None` when the subtotals add up to zero.
pub(crate) fn pro_rata(line: &Line, subtotals: &[(Decimal, Decimal)]) -> Option<Vec<Line>> {
    let total: Decimal = subtotals.iter().map(|(_, amount)| *amount).sum();
    if subtotals.is_empty() || total.is_zero() {
        return None;
    }
    let parts: Vec<(Decimal, Decimal)> = match (line.unit_price, amount_inc(line)) {
        (Some(_), _) => {
            let ex = line.line_amount();
            subtotals.iter().map(|(rate, amount)| (*rate, ex * *amount / total)).collect()
        }
        (None, Some(inc)) => subtotals
            .iter()
            .map(|(rate, amount)| (*rate, ex_from_inc(inc * *amount / total, *rate)))
            .collect(),
        (None, None) => return None,
    };
    Some(split_line(line, &parts))
}

/// Rates of `lines` with an amount, most frequent first (ties: higher rate).
fn rates_by_frequency(lines: &[Line]) -> Vec<Decimal> {
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
    counts.sort_by(|(ra, ca), (rb, cb)| cb.cmp(ca).then(rb.cmp(ra)));
    counts.into_iter().map(|(rate, _)| rate).collect()
}

fn subtotals(lines: &[Line]) -> Vec<(Decimal, Decimal)> {
    let mut subtotals: Vec<(Decimal, Decimal)> = Vec::new();
    for line in lines.iter().filter(|l| !l.line_amount().is_zero()) {
        let Some(rate) = line.vat_rate else { continue };
        match subtotals.iter_mut().find(|(r, _)| *r == rate) {
            Some((_, amount)) => *amount += line.line_amount(),
            None => subtotals.push((rate, line.line_amount())),
        }
    }
    subtotals.sort_by(|(a, _), (b, _)| b.cmp(a));
    subtotals
}

fn is_strategy_line(line: &Line) -> bool {
    line.meta.vat_rate_source == VatRateSource::Strategy
}

/// Resolve all strategy lines of `invoice`. Returns whether the invoice
/// must be reviewed.
pub fn complete_strategies(
    invoice: &mut Invoice,
    candidates: &[Decimal],
    tolerance: Decimal,
    messages: &mut Vec<Message>,
) -> bool {
    complete_strategies_with(invoice, candidates, tolerance, &default_strategies(), messages)
}

/// [`complete_strategies`] with an explicit list of strategies.
pub fn complete_strategies_with(
    invoice: &mut Invoice,
    candidates: &[Decimal],
    tolerance: Decimal,
    strategies: &[Box<dyn Strategy>],
    messages: &mut Vec<Message>,
) -> bool {
    let (strategy_lines, others): (Vec<Line>, Vec<Line>) =
        invoice.lines.iter().cloned().partition(is_strategy_line);
    if strategy_lines.is_empty() {
        return false;
    }

    let used_rates = rates_by_frequency(&others);
    let mut ordered = used_rates.clone();
    ordered.extend(candidates.iter().filter(|r| !used_rates.contains(r)));

    let mut made_concept = false;
    let replacements = match invoice.meta.totals {
        None => {
            let rate = used_rates.first().or(ordered.first()).copied().unwrap_or(Decimal::ZERO);
            warn!(%rate, "no shop totals, strategy lines get the most used rate");
            messages.push(
                Message::warning(
                    "strategy-unverified",
                    format!("the shop reported no totals, {rate}% VAT was used for lines without a known rate"),
                )
                .with_field("invoice.line"),
            );
            strategy_lines.iter().map(|l| vec![with_rate(l, rate)]).collect()
        }
        Some(totals) => {
            let input = StrategyInput {
                lines: &strategy_lines,
                target_vat: totals.vat_amount - vat_of(&others),
                used_rates,
                candidates: ordered,
                subtotals: subtotals(&others),
                tolerance,
            };
            match strategies.iter().find_map(|s| s.apply(&input).map(|r| (s.name(), r))) {
                Some((name, replacements)) => {
                    debug!(strategy = name, target = %input.target_vat, "strategy succeeded");
                    replacements
                }
                None => {
                    warn!(target = %input.target_vat, "no strategy reached the shop VAT total");
                    messages.push(
                        Message::warning(
                            "strategy-failed",
                            "the VAT rate of some lines could not be determined, please check the invoice",
                        )
                        .with_field("invoice.line"),
                    );
                    made_concept = true;
                    fallback(&input)
                }
            }
        }
    };

    let mut replacements = replacements.into_iter();
    let mut lines = Vec::with_capacity(invoice.lines.len());
    for line in std::mem::take(&mut invoice.lines) {
        if is_strategy_line(&line) {
            lines.extend(replacements.next().unwrap_or_else(|| vec![line]));
        } else {
            lines.push(line);
        }
    }
    invoice.lines = lines;
    made_concept
}

fn fallback(input: &StrategyInput<'_>) -> Vec<Vec<Line>> {
    let highest = input.candidates.iter().max().copied().unwrap_or(Decimal::ZERO);
    input
        .lines
        .iter()
        .map(|line| pro_rata(line, &input.subtotals).unwrap_or_else(|| vec![with_rate(line, highest)]))
        .collect()
}
