use rust_decimal::Decimal;

use super::{Strategy, StrategyInput, amount_inc, split_line, vat_of};
use crate::core::Line;

/// Splits a single discount line over two used rates.
///
/// With `E` the discount excluding VAT and `T` the target VAT, the amounts
/// `a` at rate `r1` and `b` at rate `r2` solve `a + b = E` and
/// `a * r1 + b * r2 = 100 * T`. Only solutions where both parts have the
/// sign of the discount (or are 0) make sense. A zero part is left out.
pub struct SplitKnownDiscountLine;

impl SplitKnownDiscountLine {
    fn solve(total: Decimal, target: Decimal, r1: Decimal, r2: Decimal) -> Option<(Decimal, Decimal)> {
        let (p1, p2) = (r1.max(Decimal::ZERO), r2.max(Decimal::ZERO));
        if p1 == p2 {
            return None;
        }
        let a = (Decimal::ONE_HUNDRED * target - total * p2) / (p1 - p2);
        let b = total - a;
        let same_sign = |x: Decimal| x.is_zero() || x.is_sign_negative() == total.is_sign_negative();
        (same_sign(a) && same_sign(b)).then_some((a, b))
    }
}

impl Strategy for SplitKnownDiscountLine {
    fn name(&self) -> &'static str {
        "split-known-discount-line"
    }

    fn apply(&self, input: &StrategyInput<'_>) -> Option<Vec<Vec<Line>>> {
        let [line] = input.lines else {
            return None;
        };
        let total = match line.unit_price {
            Some(_) => line.line_amount(),
            None => amount_inc(line)? - input.target_vat,
        };
        if total.is_zero() {
            return None;
        }

        let rates = &input.used_rates;
        for (i, r1) in rates.iter().enumerate() {
            for r2 in &rates[i + 1..] {
                let (high, low) = if r1 > r2 { (*r1, *r2) } else { (*r2, *r1) };
                let Some((a, b)) = Self::solve(total, input.target_vat, high, low) else {
                    continue;
                };
                let amounts: Vec<(Decimal, Decimal)> =
                    [(high, a), (low, b)].into_iter().filter(|(_, amount)| !amount.is_zero()).collect();
                let parts = split_line(line, &amounts);
                if input.accepts(vat_of(&parts)) {
                    return Some(vec![parts]);
                }
            }
        }
        None
    }
}
