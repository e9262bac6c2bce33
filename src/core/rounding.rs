use rust_decimal::{Decimal, RoundingStrategy};

/// Largest absolute amount or quantity accepted on an invoice (10^12).
///
/// Amounts within this bound can be multiplied by a quantity and a rate and
/// summed over many lines without leaving the range of [`Decimal`].
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Highest VAT rate (percent) accepted on an invoice.
pub const MAX_VAT_RATE: Decimal = Decimal::ONE_HUNDRED;

/// Whether `value` is an amount or quantity within [`MAX_AMOUNT`].
pub fn amount_in_range(value: Decimal) -> bool {
    value.abs() <= MAX_AMOUNT
}

/// Whether `rate` is a VAT rate between -1 (VAT free) and [`MAX_VAT_RATE`].
pub fn vat_rate_in_range(rate: Decimal) -> bool {
    rate >= Decimal::NEGATIVE_ONE && rate <= MAX_VAT_RATE
}

/// Round a Decimal to `dp` decimal places using half-up (commercial rounding).
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Whether two amounts differ by no more than `tolerance`.
pub fn amounts_equal(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    (a - b).abs() <= tolerance.abs()
}

/// Amount excluding VAT for an amount including VAT at `rate` percent.
pub fn ex_from_inc(amount_inc: Decimal, rate: Decimal) -> Decimal {
    let rate = rate.max(Decimal::ZERO);
    amount_inc * Decimal::ONE_HUNDRED / (Decimal::ONE_HUNDRED + rate)
}

/// VAT on `amount` (excluding VAT) at `rate` percent; -1 (VAT free) gives 0.
pub fn vat_on(amount: Decimal, rate: Decimal) -> Decimal {
    amount * rate.max(Decimal::ZERO) / Decimal::ONE_HUNDRED
}
