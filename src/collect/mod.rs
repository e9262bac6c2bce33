//! Collector: turns shop data into an Acumulus-shaped [`Invoice`].
//!
//! The collector does not judge: it copies what the shop knows, records
//! where VAT information came from and leaves everything else to the
//! completor.
//!
//! ```
//! use acumulus::collect::{Collector, DocumentSource, NoHooks};
//! use acumulus::config::Config;
//!
//! let source = DocumentSource::from_json_str(r#"{
//!     "id": 17,
//!     "reference": "ORD-17",
//!     "date": "2024-05-02",
//!     "customer": {"email": "jan@example.nl"},
//!     "billing_address": {"first_name": "Jan", "last_name": "Jansen", "country_code": "nl"},
//!     "lines": [{"name": "Thee", "unit_price": "4.13", "vat_rate": 9}]
//! }"#).unwrap();
//!
//! let (invoice, result) = Collector::new(&Config::default()).collect(&source, &NoHooks).unwrap();
//! assert_eq!(invoice.customer.invoice_address.full_name.as_deref(), Some("Jan Jansen"));
//! assert_eq!(invoice.lines.len(), 1);
//! assert!(!result.has_error());
//! ```

pub mod convert;
mod fields;
mod line;
mod source;
pub mod token;

pub use fields::collect_fields;
pub use source::{CollectHooks, DocumentSource, InvoiceSource, NoHooks, SourceAmounts, SourceLine};
pub use token::{PropertySource, Token, Variables};

use tracing::debug;

use crate::config::{Config, DateSource, NumberSource};
use crate::core::{AcumulusError, Customer, EmailAsPdf, Invoice, SourceType};
use crate::result::{AcumulusResult, Message};

use fields::{
    apply_address_field, apply_customer_field, apply_email_field, apply_fields,
    apply_invoice_field,
};
use line::LineCollector;

/// Collects invoices according to one shop configuration.
pub struct Collector<'c> {
    config: &'c Config,
}

impl<'c> Collector<'c> {
    pub fn new(config: &'c Config) -> Self {
        Self { config }
    }

    /// Collect the invoice for `source`.
    ///
    /// Field-level problems (unknown field names, unparseable values) end up
    /// as messages in the returned result.
    ///
    /// # Errors
    ///
    /// `AcumulusError::Token` when a field mapping does not parse.
    /// `AcumulusError::Collect` when an amount, quantity or VAT rate is out
    /// of range.
    pub fn collect(
        &self,
        source: &dyn InvoiceSource,
        hooks: &dyn CollectHooks,
    ) -> Result<(Invoice, AcumulusResult), AcumulusError> {
        let vars = source.variables();
        let mut messages = Vec::new();
        let negate = source.source_type() == SourceType::CreditNote && !source.amounts_signed();

        let mut invoice = Invoice::default();
        self.collect_meta(source, &mut invoice, negate);
        if invoice.meta.totals.is_some_and(|totals| !totals.in_range()) {
            return Err(AcumulusError::Collect("invoice totals are out of range".into()));
        }

        invoice.customer = self.collect_customer(source, &vars, &mut messages)?;
        hooks.after_customer(&mut invoice.customer, source);

        let fields = collect_fields(&self.config.mappings.invoice, &vars)?;
        apply_fields(&mut invoice, "invoice", &fields, apply_invoice_field, &mut messages);
        if invoice.description.is_none() {
            invoice.description = self.template(self.config.invoice.description.as_deref(), &vars)?;
        }

        let lines = LineCollector {
            mapping: &self.config.mappings.line,
            hooks,
            negate,
        };
        let source_lines = source
            .item_lines()
            .into_iter()
            .chain(source.shipping_lines())
            .chain(source.fee_lines())
            .chain(source.discount_lines())
            .chain(source.manual_lines());
        for source_line in source_lines {
            let line = lines.collect(&source_line, &vars, &mut messages)?;
            invoice.lines.push(line);
        }

        if self.config.email_as_pdf.send {
            let fields = collect_fields(&self.config.mappings.email_as_pdf, &vars)?;
            let mut email = EmailAsPdf::default();
            apply_fields(&mut email, "emailaspdf", &fields, apply_email_field, &mut messages);
            if email.subject.is_none() {
                email.subject = self.template(self.config.email_as_pdf.subject.as_deref(), &vars)?;
            }
            invoice.email_as_pdf = Some(email);
        }

        hooks.after_invoice(&mut invoice, source);

        debug!(
            source = %source.source_type().label(),
            reference = %source.reference(),
            lines = invoice.lines.len(),
            "invoice collected"
        );

        let mut result = AcumulusResult::new();
        result.add_messages(messages);
        Ok((invoice, result))
    }

    /// Text of a configured template such as `"Order [source::reference]"`.
    fn template(&self, template: Option<&str>, vars: &Variables<'_>) -> Result<Option<String>, AcumulusError> {
        let Some(template) = template else {
            return Ok(None);
        };
        Ok(token::evaluate(template, vars)?
            .map(|value| token::render(&value))
            .filter(|text| !text.trim().is_empty()))
    }

    fn collect_meta(&self, source: &dyn InvoiceSource, invoice: &mut Invoice, negate: bool) {
        let settings = &self.config.invoice;
        let reference = source.reference();

        invoice.number = match settings.number_source {
            NumberSource::Acumulus => None,
            NumberSource::ShopInvoice => source.invoice_reference().or(Some(reference.clone())),
            NumberSource::ShopOrder => Some(reference.clone()),
        };
        invoice.issue_date = match settings.date_source {
            DateSource::OrderDate => source.date(),
            DateSource::InvoiceDate => source.invoice_date().or_else(|| source.date()),
            DateSource::Today => None,
        };
        invoice.payment_status = source.payment_status();
        invoice.payment_date = source.payment_date();
        invoice.vat_type = source.vat_type();

        let meta = &mut invoice.meta;
        meta.source_type = source.source_type();
        meta.source_id = Some(source.id()).filter(|id| !id.is_empty());
        meta.source_reference = Some(reference).filter(|r| !r.is_empty());
        meta.payment_method = source.payment_method();
        meta.currency = source.currency();
        meta.totals = source
            .totals()
            .map(|totals| if negate { totals.negated() } else { totals });
    }

    fn collect_customer(
        &self,
        source: &dyn InvoiceSource,
        vars: &Variables<'_>,
        messages: &mut Vec<Message>,
    ) -> Result<Customer, AcumulusError> {
        let settings = &self.config.customer;
        let mappings = &self.config.mappings;
        let mut customer = Customer {
            main_address: settings.main_address,
            ..Default::default()
        };

        if settings.send_customer {
            let fields = collect_fields(&mappings.customer, vars)?;
            apply_fields(&mut customer, "customer", &fields, apply_customer_field, messages);
            let fields = collect_fields(&mappings.invoice_address, vars)?;
            apply_fields(
                &mut customer.invoice_address,
                "customer",
                &fields,
                apply_address_field,
                messages,
            );
            let fields = collect_fields(&mappings.shipping_address, vars)?;
            apply_fields(
                &mut customer.shipping_address,
                "customer.alt",
                &fields,
                apply_address_field,
                messages,
            );
        } else {
            messages.push(Message::log(
                "collect-no-customer",
                "customer data is not sent, the invoice is booked on a generic consumer",
            ));
        }

        if customer.country_code().is_none() {
            customer.main_mut().country_code = source.country_code();
        }
        Ok(customer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LineType, PaymentStatus, VatRateSource};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn document() -> serde_json::Value {
        json!({
            "type": "credit_note",
            "id": 90,
            "reference": "CN-90",
            "invoice_reference": "F-2024-0012",
            "date": "2024-06-01 10:00:00",
            "payment_status": "paid",
            "payment_date": "2024-06-02",
            "totals": {"amount": "20.00", "vat_amount": "4.20"},
            "customer": {"email": "piet@example.be", "id": 4},
            "billing_address": {"company": "Piet BV", "country_code": "BE"},
            "lines": [{"name": "Stoel", "unit_price": "20.00", "vat_rate": 21}],
            "shipping": [{"name": "Verzending", "unit_price": 0}]
        })
    }

    fn collect(config: &Config, doc: serde_json::Value) -> (Invoice, AcumulusResult) {
        let source = DocumentSource::new(doc).unwrap();
        Collector::new(config).collect(&source, &NoHooks).unwrap()
    }

    #[test]
    fn credit_note_amounts_are_negated() {
        let (invoice, _) = collect(&Config::default(), document());
        assert_eq!(invoice.lines[0].unit_price, Some(dec!(-20.00)));
        assert_eq!(invoice.meta.totals.unwrap().amount_inc, dec!(-24.20));
        assert_eq!(invoice.meta.source_type, SourceType::CreditNote);
        assert_eq!(invoice.lines[1].meta.line_type, LineType::Shipping);
        assert_eq!(invoice.lines[1].meta.vat_rate_source, VatRateSource::Completor);
    }

    #[test]
    fn number_and_date_follow_settings() {
        let mut config = Config::default();
        let (invoice, _) = collect(&config, document());
        assert_eq!(invoice.number, None);
        assert_eq!(invoice.issue_date, NaiveDate::from_ymd_opt(2024, 6, 1));

        config.invoice.number_source = NumberSource::ShopInvoice;
        config.invoice.date_source = DateSource::Today;
        let (invoice, _) = collect(&config, document());
        assert_eq!(invoice.number.as_deref(), Some("F-2024-0012"));
        assert_eq!(invoice.issue_date, None);
        assert_eq!(invoice.payment_status, Some(PaymentStatus::Paid));
    }

    #[test]
    fn customer_fields_are_mapped() {
        let (invoice, result) = collect(&Config::default(), document());
        let customer = &invoice.customer;
        assert_eq!(customer.email.as_deref(), Some("piet@example.be"));
        assert_eq!(customer.contact_your_id.as_deref(), Some("4"));
        assert_eq!(customer.invoice_address.company_name1.as_deref(), Some("Piet BV"));
        assert!(customer.shipping_address.is_empty());
        assert!(result.messages().is_empty());
    }

    #[test]
    fn no_customer_keeps_country_only() {
        let mut config = Config::default();
        config.customer.send_customer = false;
        let (invoice, result) = collect(&config, document());
        assert_eq!(invoice.customer.email, None);
        assert_eq!(invoice.customer.country_code(), Some("BE"));
        assert!(result.has_code_tag("collect-no-customer"));
    }

    #[test]
    fn email_as_pdf_is_collected_when_enabled() {
        let mut config = Config::default();
        config.email_as_pdf.send = true;
        let (invoice, _) = collect(&config, document());
        assert_eq!(
            invoice.email_as_pdf.unwrap().email_to.as_deref(),
            Some("piet@example.be")
        );
    }

    #[test]
    fn templates_fill_description_and_subject() {
        let mut config = Config::default();
        config.invoice.description = Some("Creditnota [source::reference] ([source::invoice_reference])".into());
        config.email_as_pdf.send = true;
        config.email_as_pdf.subject = Some("Uw creditnota [source::reference]".into());
        let (invoice, _) = collect(&config, document());
        assert_eq!(invoice.description.as_deref(), Some("Creditnota CN-90 (F-2024-0012)"));
        assert_eq!(
            invoice.email_as_pdf.unwrap().subject.as_deref(),
            Some("Uw creditnota CN-90")
        );
    }

    struct MarkHooks;

    impl CollectHooks for MarkHooks {
        fn after_customer(&self, customer: &mut Customer, source: &dyn InvoiceSource) {
            customer.mark = Some(format!("shop-{}", source.id()));
        }

        fn after_invoice(&self, invoice: &mut Invoice, _source: &dyn InvoiceSource) {
            invoice.invoice_notes = Some("via hooks".into());
        }
    }

    #[test]
    fn hooks_run_after_each_step() {
        let source = DocumentSource::new(document()).unwrap();
        let (invoice, _) = Collector::new(&Config::default())
            .collect(&source, &MarkHooks)
            .unwrap();
        assert_eq!(invoice.customer.mark.as_deref(), Some("shop-90"));
        assert_eq!(invoice.invoice_notes.as_deref(), Some("via hooks"));
    }

    #[test]
    fn broken_mapping_is_an_error() {
        let mut config = Config::default();
        config.mappings.invoice.set("description", "[source::reference");
        let source = DocumentSource::new(document()).unwrap();
        let err = Collector::new(&config).collect(&source, &NoHooks).unwrap_err();
        assert!(matches!(err, AcumulusError::Token(_)));
    }
}
