use rust_decimal::Decimal;
use tracing::debug;

use crate::core::{
    Currency, Invoice, Line, Totals, amount_in_range, is_currency_code, is_euro, round_half_up,
};
use crate::result::Message;

/// `amount / rate` at 4 dp, `None` when the result is out of range.
fn converted(amount: Decimal, rate: Decimal) -> Option<Decimal> {
    amount
        .checked_div(rate)
        .filter(|value| amount_in_range(*value))
        .map(|value| round_half_up(value, 4))
}

fn convert(amount: &mut Option<Decimal>, rate: Decimal) -> Option<()> {
    if let Some(value) = amount {
        *value = converted(*value, rate)?;
    }
    Some(())
}

fn convert_line(line: &mut Line, rate: Decimal) -> Option<()> {
    convert(&mut line.unit_price, rate)?;
    convert(&mut line.cost_price, rate)?;
    convert(&mut line.meta.unit_price_inc, rate)?;
    convert(&mut line.meta.vat_amount, rate)?;
    line.children.iter_mut().try_for_each(|child| convert_line(child, rate))
}

fn convert_totals(totals: &mut Totals, rate: Decimal) -> Option<()> {
    totals.amount = converted(totals.amount, rate)?;
    totals.vat_amount = converted(totals.vat_amount, rate)?;
    totals.amount_inc = converted(totals.amount_inc, rate)?;
    Some(())
}

/// Convert amounts in a foreign currency to euro.
///
/// `rate` is the number of foreign units per euro. VAT ranges are relative
/// and stay as they are.
pub fn complete_currency(invoice: &mut Invoice, messages: &mut Vec<Message>) {
    let currency = invoice.meta.currency.clone();
    if is_euro(&currency.code) || !currency.do_convert {
        return;
    }
    if !is_currency_code(&currency.code) {
        messages.push(Message::warning(
            "currency-code",
            format!("'{}' is not a currency code, amounts are sent unconverted", currency.code),
        ));
        return;
    }
    if currency.rate <= Decimal::ZERO {
        messages.push(Message::warning(
            "currency-rate",
            format!(
                "amounts are in {} but no usable conversion rate is known, they are sent unconverted",
                currency.code
            ),
        ));
        return;
    }

    let rate = currency.rate;
    let mut lines = invoice.lines.clone();
    let mut totals = invoice.meta.totals;
    let all_converted = lines.iter_mut().try_for_each(|line| convert_line(line, rate)).is_some()
        && totals.as_mut().is_none_or(|totals| convert_totals(totals, rate).is_some());
    if !all_converted {
        messages.push(Message::warning(
            "currency-rate",
            format!(
                "converting from {} at rate {rate} gives amounts out of range, they are sent unconverted",
                currency.code
            ),
        ));
        return;
    }
    invoice.lines = lines;
    invoice.meta.totals = totals;
    debug!(code = %currency.code, %rate, "amounts converted to euro");
    invoice.meta.currency = Currency::default();
}
