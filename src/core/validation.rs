use crate::result::Message;

use super::countries::is_known_country_code;
use super::rounding::{amount_in_range, vat_rate_in_range};
use super::types::*;

/// Validate a completed invoice before it is sent.
/// Returns all problems found (not just the first).
///
/// Only problems that would make Acumulus reject the invoice are errors;
/// things Acumulus fills in itself are warnings or notices.
pub fn validate_invoice(invoice: &Invoice) -> Vec<Message> {
    let mut messages = Vec::new();

    validate_customer(&invoice.customer, &mut messages);

    if invoice.lines.is_empty() {
        messages.push(
            Message::error("invoice-empty", "invoice has no lines").with_field("invoice.line"),
        );
    }

    for (i, line) in invoice.lines.iter().enumerate() {
        validate_line(line, i, &mut messages);
    }

    if let Some(email) = &invoice.email_as_pdf {
        if email.email_to.as_deref().is_none_or(|e| e.trim().is_empty()) {
            messages.push(
                Message::error("emailaspdf-to", "email as pdf requires an address to send to")
                    .with_field("invoice.emailaspdf.emailto"),
            );
        } else if email.email_to.as_deref().is_some_and(|e| !looks_like_email(e)) {
            messages.push(
                Message::warning("emailaspdf-to", "email as pdf address looks invalid")
                    .with_field("invoice.emailaspdf.emailto"),
            );
        }
    }

    if invoice.payment_status == Some(PaymentStatus::Paid) && invoice.payment_date.is_none() {
        messages.push(
            Message::notice(
                "payment-date",
                "invoice is paid but has no payment date, Acumulus will use today",
            )
            .with_field("invoice.paymentdate"),
        );
    }

    messages
}

/// Amounts, quantities and VAT rates out of the range the completor can
/// compute with. Run before completing: an invoice with any of these is
/// not completed.
pub fn validate_amounts(invoice: &Invoice) -> Vec<Message> {
    let mut messages = Vec::new();
    if invoice.meta.totals.is_some_and(|totals| !totals.in_range()) {
        messages.push(
            Message::error("amount-range", "invoice totals are out of range")
                .with_field("invoice.totals"),
        );
    }
    for (i, line) in invoice.lines.iter().enumerate() {
        validate_line_amounts(line, &format!("invoice.line[{i}]"), &mut messages);
    }
    messages
}

fn validate_line_amounts(line: &Line, field: &str, messages: &mut Vec<Message>) {
    let amounts = [
        ("quantity", Some(line.quantity)),
        ("unitprice", line.unit_price),
        ("costprice", line.cost_price),
        ("unitpriceinc", line.meta.unit_price_inc),
        ("vatamount", line.meta.vat_amount),
    ];
    for (name, value) in amounts {
        if value.is_some_and(|v| !amount_in_range(v)) {
            messages.push(
                Message::error("amount-range", format!("{name} is out of range"))
                    .with_field(format!("{field}.{name}")),
            );
        }
    }
    if line.vat_rate.is_some_and(|r| !vat_rate_in_range(r)) {
        messages.push(
            Message::error("amount-range", "VAT rate is out of range")
                .with_field(format!("{field}.vatrate")),
        );
    }
    for (i, child) in line.children.iter().enumerate() {
        validate_line_amounts(child, &format!("{field}.line[{i}]"), messages);
    }
}

fn validate_customer(customer: &Customer, messages: &mut Vec<Message>) {
    match customer.country_code().map(str::trim) {
        None | Some("") => messages.push(
            Message::error("customer-country", "customer country code must not be empty")
                .with_field("customer.countrycode"),
        ),
        Some(code) if code.len() != 2 => messages.push(
            Message::error(
                "customer-country",
                format!("country code '{code}' must be 2 characters (ISO 3166-1 alpha-2)"),
            )
            .with_field("customer.countrycode"),
        ),
        Some(code) if !is_known_country_code(code) => messages.push(
            Message::warning(
                "customer-country",
                format!("country code '{code}' is not a known ISO 3166-1 alpha-2 code"),
            )
            .with_field("customer.countrycode"),
        ),
        Some(_) => {}
    }

    if let Some(email) = &customer.email {
        if !looks_like_email(email) {
            messages.push(
                Message::warning("customer-email", format!("email address '{email}' looks invalid"))
                    .with_field("customer.email"),
            );
        }
    }
}

fn validate_line(line: &Line, index: usize, messages: &mut Vec<Message>) {
    let field = format!("invoice.line[{index}]");

    if line.product.as_deref().is_none_or(|p| p.trim().is_empty()) {
        messages.push(
            Message::error("line-product", "product description must not be empty")
                .with_field(format!("{field}.product")),
        );
    }

    if line.unit_price.is_none() {
        messages.push(
            Message::error("line-unitprice", "unit price is missing")
                .with_field(format!("{field}.unitprice")),
        );
    }

    if line.vat_rate.is_none() {
        messages.push(
            Message::error("line-vatrate", "VAT rate is missing")
                .with_field(format!("{field}.vatrate")),
        );
    } else if line.vat_rate.is_some_and(|r| r.is_sign_negative() && r != VAT_RATE_FREE) {
        messages.push(
            Message::error("line-vatrate", "VAT rate must not be negative")
                .with_field(format!("{field}.vatrate")),
        );
    }

    if line.quantity.is_zero() && !line.is_zero_price() {
        messages.push(
            Message::warning("line-quantity", "quantity is zero on a priced line")
                .with_field(format!("{field}.quantity")),
        );
    }

    if !line.children.is_empty() {
        messages.push(
            Message::error("line-children", "line hierarchy has not been flattened")
                .with_field(field),
        );
    }
}

fn looks_like_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !email.contains(' ')
        }
        None => false,
    }
}
