//! Completor: turns a collected invoice into one Acumulus accepts.
//!
//! Shops deliver incomplete and sometimes inconsistent data: VAT amounts
//! instead of rates, prices including VAT, bundles with options, discounts
//! without any VAT information, foreign currencies. [`Completor::complete`]
//! runs a fixed sequence of passes that fill in defaults, infer what is
//! missing and record every decision as a [`Message`] on the result.
//!
//! ```
//! use acumulus::complete::{Completor, VatRateTable};
//! use acumulus::config::Config;
//! use acumulus::core::{AddressBuilder, CustomerBuilder, InvoiceBuilder, LineBuilder};
//! use rust_decimal_macros::dec;
//!
//! let config = Config::default();
//! let rates = VatRateTable::dutch_defaults();
//! let mut invoice = InvoiceBuilder::new()
//!     .customer(CustomerBuilder::new().invoice_address(AddressBuilder::new("NL").build()).build())
//!     .add_line(
//!         LineBuilder::new("Koffie", dec!(2), dec!(4.50))
//!             .vat_amount(dec!(0.41), dec!(0.01), dec!(0.01))
//!             .build(),
//!     )
//!     .build();
//!
//! let result = Completor::new(&config, &rates).complete(&mut invoice);
//! assert!(!result.has_error());
//! assert_eq!(invoice.lines[0].vat_rate, Some(dec!(9)));
//! ```

mod currency;
mod customer;
mod hierarchy;
mod invoice;
mod lines;
pub mod strategy;
mod totals;
mod vat_rates;
mod vat_type;

pub use currency::complete_currency;
pub use customer::complete_customer;
pub use hierarchy::LineHierarchy;
pub use invoice::{complete_email_as_pdf, complete_invoice_defaults};
pub use lines::{
    RangeMatch, complete_line_basics, complete_vat_ranges, complete_zero_price_lines, match_range,
    most_used_rate,
};
pub use strategy::{Strategy, StrategyInput, complete_strategies, default_strategies};
pub use totals::{calculate_totals, complete_totals};
pub use vat_rates::{VatRateInfo, VatRateLookup, VatRateTable};
pub use vat_type::{
    VatCandidates, complete_possible_vat_types, complete_vat_type, possible_vat_types, used_rates,
};

use chrono::{NaiveDate, Utc};
use tracing::{debug, info_span, warn};

use crate::config::{ConceptSetting, Config};
use crate::core::{Invoice, validate_amounts, validate_invoice};
use crate::result::{AcumulusResult, Message};

/// Runs all completion passes over an invoice.
pub struct Completor<'a> {
    config: &'a Config,
    lookup: &'a dyn VatRateLookup,
    today: NaiveDate,
    strategies: Vec<Box<dyn Strategy>>,
}

impl<'a> Completor<'a> {
    pub fn new(config: &'a Config, lookup: &'a dyn VatRateLookup) -> Self {
        Self {
            config,
            lookup,
            today: Utc::now().date_naive(),
            strategies: default_strategies(),
        }
    }

    /// Date used for invoices without a date and for rate lookups.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Replace the VAT rate strategies (tried in the given order).
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn Strategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Complete `invoice` in place. Problems are returned as messages; the
    /// invoice is always left in a state that can be inspected.
    ///
    /// An invoice with amounts out of range is returned untouched with an
    /// "amount-range" error.
    pub fn complete(&self, invoice: &mut Invoice) -> AcumulusResult {
        let _span = info_span!(
            "complete",
            reference = invoice.meta.source_reference.as_deref().unwrap_or("")
        )
        .entered();
        let config = self.config;
        let mut result = AcumulusResult::new();

        let out_of_range = validate_amounts(invoice);
        if !out_of_range.is_empty() {
            warn!(problems = out_of_range.len(), "invoice amounts out of range, not completed");
            result.add_messages(out_of_range);
            return result;
        }

        let mut messages: Vec<Message> = Vec::new();

        complete_invoice_defaults(invoice, &config.invoice, self.today);
        complete_customer(&mut invoice.customer, &config.customer, &mut messages);
        complete_currency(invoice, &mut messages);

        let candidates =
            complete_possible_vat_types(invoice, &config.shop, self.lookup, self.today, &mut messages);
        let rates = candidates.all_rates();

        complete_line_basics(&mut invoice.lines, config);
        if complete_vat_ranges(&mut invoice.lines, &rates, &mut messages) {
            invoice.meta.made_concept = true;
        }

        let lines = std::mem::take(&mut invoice.lines);
        invoice.lines = LineHierarchy::new(&config.options, config.invoice.amount_tolerance).flatten(lines);
        complete_zero_price_lines(&mut invoice.lines);

        if strategy::complete_strategies_with(
            invoice,
            &rates,
            config.invoice.amount_tolerance,
            &self.strategies,
            &mut messages,
        ) {
            invoice.meta.made_concept = true;
        }

        complete_totals(invoice, &config.invoice, &rates, &mut messages);
        complete_vat_type(invoice, &candidates, &mut messages);
        complete_email_as_pdf(invoice, &config.email_as_pdf, &mut messages);

        messages.extend(validate_invoice(invoice));
        if invoice.meta.made_concept && config.invoice.concept == ConceptSetting::FromCompletor {
            invoice.concept = Some(true);
        }

        debug!(
            lines = invoice.lines.len(),
            vat_type = ?invoice.vat_type,
            concept = ?invoice.concept,
            messages = messages.len(),
            "invoice completed"
        );
        result.add_messages(messages);
        result
    }
}
