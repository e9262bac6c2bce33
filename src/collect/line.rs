use rust_decimal::Decimal;
use tracing::trace;

use crate::config::FieldMapping;
use crate::core::{
    AcumulusError, Line, VatRange, VatRateSource, amount_in_range, vat_rate_in_range,
};
use crate::result::Message;

use super::fields::{apply_fields, apply_line_field, collect_fields};
use super::source::{CollectHooks, SourceLine};
use super::token::Variables;

/// Collects shop lines into invoice lines.
pub(crate) struct LineCollector<'a> {
    pub mapping: &'a FieldMapping,
    pub hooks: &'a dyn CollectHooks,
    /// Negate all amounts (credit notes stored with positive amounts).
    pub negate: bool,
}

/// Rejects amounts no invoice can carry before any arithmetic is done on them.
fn check_amounts(source_line: &SourceLine) -> Result<(), AcumulusError> {
    let amounts = &source_line.amounts;
    let values = [
        ("quantity", source_line.quantity),
        ("cost price", source_line.cost_price),
        ("unit price", amounts.unit_price),
        ("unit price inc", amounts.unit_price_inc),
        ("VAT amount", amounts.vat_amount),
    ];
    if let Some((name, value)) = values
        .into_iter()
        .find_map(|(name, value)| value.filter(|v| !amount_in_range(*v)).map(|v| (name, v)))
    {
        return Err(AcumulusError::Collect(format!("{name} {value} is out of range")));
    }
    if let Some(rate) = amounts.vat_rate.filter(|r| !vat_rate_in_range(*r)) {
        return Err(AcumulusError::Collect(format!("VAT rate {rate} is out of range")));
    }
    Ok(())
}

impl LineCollector<'_> {
    /// Collect `source_line` and its children. `vars` are the invoice level
    /// variables; the line itself is added as `item`.
    pub fn collect(
        &self,
        source_line: &SourceLine,
        vars: &Variables<'_>,
        messages: &mut Vec<Message>,
    ) -> Result<Line, AcumulusError> {
        check_amounts(source_line)?;
        let mut line_vars = vars.clone();
        line_vars.push("item", &source_line.item);
        let fields = collect_fields(self.mapping, &line_vars)?;

        let mut line = Line {
            quantity: source_line.quantity.unwrap_or(Decimal::ONE),
            ..Default::default()
        };
        line.meta.line_type = source_line.line_type;
        apply_fields(&mut line, "line", &fields, apply_line_field, messages);

        let amounts = if self.negate {
            source_line.amounts.negated()
        } else {
            source_line.amounts.clone()
        };
        let cost_price = line.cost_price.or(source_line.cost_price);
        line.cost_price = if self.negate { cost_price.map(|c| -c) } else { cost_price };
        line.unit_price = amounts.unit_price;
        line.meta.unit_price_inc = amounts.unit_price_inc;
        line.meta.lookup_vat_rate = source_line.lookup_vat_rate;
        line.meta.vat_amount = amounts
            .vat_amount
            .or_else(|| Some(amounts.unit_price_inc? - amounts.unit_price?));

        let has_price = [amounts.unit_price, amounts.unit_price_inc]
            .into_iter()
            .flatten()
            .any(|p| !p.is_zero());

        if let Some(rate) = amounts.vat_rate {
            line.vat_rate = Some(rate);
            line.meta.vat_rate_source = VatRateSource::Exact;
        } else if !has_price {
            line.meta.vat_rate_source = VatRateSource::Completor;
        } else if let Some(vat_amount) = line.meta.vat_amount {
            let precision_vat = if amounts.vat_amount.is_some() {
                amounts.precision_vat
            } else {
                // Derived from two prices, so both errors add up.
                amounts.precision * Decimal::TWO
            };
            line.meta.vat_range = match (amounts.unit_price, amounts.unit_price_inc) {
                (Some(ex), _) => {
                    VatRange::from_amounts(ex, vat_amount, amounts.precision, precision_vat)
                }
                (None, Some(inc)) => {
                    line.unit_price = Some(inc - vat_amount);
                    VatRange::from_inc_amounts(inc, vat_amount, amounts.precision, precision_vat)
                }
                (None, None) => None,
            };
            line.meta.vat_rate_source = if line.meta.vat_range.is_some() {
                VatRateSource::Calculated
            } else {
                VatRateSource::Completor
            };
        } else {
            line.meta.vat_rate_source = VatRateSource::Strategy;
        }

        trace!(
            product = line.product_name(),
            source = line.meta.vat_rate_source.code(),
            "collected line"
        );

        for child in &source_line.children {
            line.children.push(self.collect(child, vars, messages)?);
        }

        self.hooks.after_line(&mut line, source_line);
        Ok(line)
    }
}
