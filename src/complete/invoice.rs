use chrono::NaiveDate;

use crate::config::{ConceptSetting, DateSource, EmailAsPdfSettings, InvoiceSettings};
use crate::core::{EmailAsPdf, Invoice, PaymentStatus};
use crate::result::Message;

/// Fill in invoice level defaults.
pub fn complete_invoice_defaults(invoice: &mut Invoice, settings: &InvoiceSettings, today: NaiveDate) {
    if invoice.concept.is_none() {
        invoice.concept = match settings.concept {
            ConceptSetting::Concept => Some(true),
            ConceptSetting::Plain | ConceptSetting::FromCompletor => Some(false),
        };
    }

    if settings.date_source == DateSource::Today || invoice.issue_date.is_none() {
        invoice.issue_date = Some(today);
    }

    if invoice.payment_status == Some(PaymentStatus::Paid) && invoice.payment_date.is_none() {
        invoice.payment_date = invoice.issue_date;
    }
    if invoice.payment_status == Some(PaymentStatus::Due) {
        invoice.payment_date = None;
    }

    if invoice.description.is_none() {
        invoice.description = invoice
            .meta
            .source_reference
            .as_deref()
            .map(|reference| format!("{} {reference}", invoice.meta.source_type.label()));
    }

    if invoice.template.is_none() {
        invoice.template = match invoice.payment_status {
            Some(PaymentStatus::Paid) => settings
                .paid_template
                .clone()
                .or_else(|| settings.default_template.clone()),
            _ => settings.default_template.clone(),
        };
    }
    if invoice.cost_center.is_none() {
        invoice.cost_center = settings.default_cost_center.clone();
    }
    if invoice.account_number.is_none() {
        invoice.account_number = settings.default_account_number.clone();
    }
}

/// Complete or drop the email-as-pdf section.
pub fn complete_email_as_pdf(
    invoice: &mut Invoice,
    settings: &EmailAsPdfSettings,
    messages: &mut Vec<Message>,
) {
    if !settings.send && invoice.email_as_pdf.is_none() {
        return;
    }

    let mut email = invoice.email_as_pdf.take().unwrap_or_default();
    if email.email_to.is_none() {
        email.email_to = invoice.customer.email.clone();
    }
    if email.email_to.is_none() {
        messages.push(
            Message::notice(
                "emailaspdf-no-address",
                "the customer has no email address, the invoice is not mailed",
            )
            .with_field("invoice.emailaspdf.emailto"),
        );
        return;
    }

    let EmailAsPdf {
        email_from,
        email_bcc,
        subject,
        confirm_reading,
        ubl,
        ..
    } = &mut email;
    if email_from.is_none() {
        email_from.clone_from(&settings.email_from);
    }
    if email_bcc.is_none() {
        email_bcc.clone_from(&settings.email_bcc);
    }
    if subject.is_none() {
        subject.clone_from(&invoice.description);
    }
    confirm_reading.get_or_insert(settings.confirm_reading);
    ubl.get_or_insert(settings.ubl);

    invoice.email_as_pdf = Some(email);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InvoiceBuilder, SourceType};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
    }

    #[test]
    fn paid_invoice_gets_date_and_template() {
        let settings = InvoiceSettings {
            paid_template: Some("Betaald".into()),
            default_template: Some("Standaard".into()),
            ..Default::default()
        };
        let mut invoice = InvoiceBuilder::new()
            .paid(None)
            .source(SourceType::CreditNote, "CN-3")
            .build();
        complete_invoice_defaults(&mut invoice, &settings, today());
        assert_eq!(invoice.issue_date, Some(today()));
        assert_eq!(invoice.payment_date, Some(today()));
        assert_eq!(invoice.template.as_deref(), Some("Betaald"));
        assert_eq!(invoice.description.as_deref(), Some("Credit note CN-3"));
        assert_eq!(invoice.concept, Some(false));
    }

    #[test]
    fn explicit_values_are_kept() {
        let settings = InvoiceSettings {
            concept: ConceptSetting::Concept,
            default_cost_center: Some("2".into()),
            ..Default::default()
        };
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let mut invoice = InvoiceBuilder::new()
            .issue_date(date)
            .description("Eigen omschrijving")
            .cost_center("5")
            .build();
        complete_invoice_defaults(&mut invoice, &settings, today());
        assert_eq!(invoice.issue_date, Some(date));
        assert_eq!(invoice.description.as_deref(), Some("Eigen omschrijving"));
        assert_eq!(invoice.cost_center.as_deref(), Some("5"));
        assert_eq!(invoice.concept, Some(true));
    }

    #[test]
    fn email_falls_back_to_customer_address() {
        let settings = EmailAsPdfSettings {
            send: true,
            ubl: true,
            email_bcc: Some("archief@shop.nl".into()),
            ..Default::default()
        };
        let mut invoice = InvoiceBuilder::new().description("Order 12").build();
        invoice.customer.email = Some("klant@example.nl".into());
        let mut messages = Vec::new();
        complete_email_as_pdf(&mut invoice, &settings, &mut messages);
        let email = invoice.email_as_pdf.unwrap();
        assert_eq!(email.email_to.as_deref(), Some("klant@example.nl"));
        assert_eq!(email.email_bcc.as_deref(), Some("archief@shop.nl"));
        assert_eq!(email.subject.as_deref(), Some("Order 12"));
        assert_eq!(email.ubl, Some(true));
        assert!(messages.is_empty());
    }

    #[test]
    fn email_without_address_is_dropped() {
        let settings = EmailAsPdfSettings {
            send: true,
            ..Default::default()
        };
        let mut invoice = InvoiceBuilder::new().build();
        let mut messages = Vec::new();
        complete_email_as_pdf(&mut invoice, &settings, &mut messages);
        assert!(invoice.email_as_pdf.is_none());
        assert_eq!(messages.len(), 1);
    }
}
