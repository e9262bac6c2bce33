//! VAT rate ranges: what a VAT rate computed from rounded amounts can
//! actually have been.
//!
//! Shops store amounts rounded to cents (or sometimes to 4 decimals). Dividing
//! a rounded VAT amount by a rounded price gives a rate like 20.96% where the
//! real rate is 21%. The range records the minimum and maximum rate that are
//! consistent with the precision of both inputs, so the completor can match
//! it against the real rates later on.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::rounding::round_half_up;

/// Upper bound used when the price is so small that any rate is possible.
const UNBOUNDED_RATE: Decimal = Decimal::from_parts(10000, 0, 0, false, 0);

/// Plausible VAT rate interval for a line whose rate was calculated from
/// amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatRange {
    /// Rate as computed directly from the amounts (`100 * vat / amount`).
    pub calculated: Decimal,
    /// Lowest rate consistent with the amounts and their precision.
    pub min: Decimal,
    /// Highest rate consistent with the amounts and their precision.
    pub max: Decimal,
}

impl VatRange {
    /// Range from an amount excluding VAT and the VAT amount.
    ///
    /// Returns `None` when the amount is within its own precision of zero:
    /// a zero price does not say anything about the VAT rate. Amounts too
    /// large to compute a rate from give `None` as well.
    pub fn from_amounts(
        amount: Decimal,
        vat_amount: Decimal,
        precision_amount: Decimal,
        precision_vat: Decimal,
    ) -> Option<Self> {
        let amount_abs = amount.abs();
        let vat_abs = vat_amount.abs();
        let precision_amount = precision_amount.abs();
        let precision_vat = precision_vat.abs();

        if amount_abs <= precision_amount || amount_abs.is_zero() {
            return None;
        }

        let percentage =
            |vat: Decimal, base: Decimal| Decimal::ONE_HUNDRED.checked_mul(vat)?.checked_div(base);

        let calculated = percentage(vat_abs, amount_abs)?;
        let min_vat = (vat_abs - precision_vat).max(Decimal::ZERO);
        let min = percentage(min_vat, amount_abs.checked_add(precision_amount)?)?;
        let max_base = amount_abs - precision_amount;
        let max = if max_base.is_zero() {
            UNBOUNDED_RATE
        } else {
            percentage(vat_abs.checked_add(precision_vat)?, max_base)
                .map_or(UNBOUNDED_RATE, |max| max.min(UNBOUNDED_RATE))
        };

        Some(Self {
            calculated: round_half_up(calculated, 4),
            min: min.round_dp_with_strategy(4, rust_decimal::RoundingStrategy::ToNegativeInfinity),
            max: max.round_dp_with_strategy(4, rust_decimal::RoundingStrategy::ToPositiveInfinity),
        })
    }

    /// Range from an amount including VAT and the VAT amount.
    ///
    /// The amount excluding VAT is derived as `inc - vat`; its precision is
    /// the sum of both input precisions.
    pub fn from_inc_amounts(
        amount_inc: Decimal,
        vat_amount: Decimal,
        precision_inc: Decimal,
        precision_vat: Decimal,
    ) -> Option<Self> {
        Self::from_amounts(
            amount_inc.checked_sub(vat_amount)?,
            vat_amount,
            precision_inc.abs().checked_add(precision_vat.abs())?,
            precision_vat,
        )
    }

    /// Whether `rate` lies within the range. A VAT free rate (-1) counts as
    /// 0%.
    pub fn contains(&self, rate: Decimal) -> bool {
        let rate = rate.max(Decimal::ZERO);
        self.min <= rate && rate <= self.max
    }

    /// Distance of `rate` to the calculated rate.
    pub fn distance(&self, rate: Decimal) -> Decimal {
        (rate.max(Decimal::ZERO) - self.calculated).abs()
    }
}
