//! Encoding of invoices into the Acumulus `invoice_add` message.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Map, Value, json};

use crate::core::{Address, AddressRole, Customer, EmailAsPdf, Invoice, Line, VatRange};

use super::xml::format_amount;

/// Field map that only keeps present values.
#[derive(Default)]
pub(crate) struct Fields(Map<String, Value>);

impl Fields {
    pub(crate) fn text(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
            self.0.insert(key.to_string(), Value::String(v.to_string()));
        }
        self
    }

    pub(crate) fn flag(&mut self, key: &str, value: Option<bool>) -> &mut Self {
        if let Some(v) = value {
            self.0.insert(key.to_string(), json!(u8::from(v)));
        }
        self
    }

    pub(crate) fn code(&mut self, key: &str, value: Option<u8>) -> &mut Self {
        if let Some(v) = value {
            self.0.insert(key.to_string(), json!(v));
        }
        self
    }

    pub(crate) fn amount(&mut self, key: &str, value: Option<Decimal>) -> &mut Self {
        if let Some(v) = value {
            self.0.insert(key.to_string(), Value::String(format_amount(v)));
        }
        self
    }

    pub(crate) fn date(&mut self, key: &str, value: Option<NaiveDate>) -> &mut Self {
        if let Some(v) = value {
            self.0.insert(key.to_string(), Value::String(v.format("%Y-%m-%d").to_string()));
        }
        self
    }

    pub(crate) fn value(&mut self, key: &str, value: Value) -> &mut Self {
        self.0.insert(key.to_string(), value);
        self
    }

    pub(crate) fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

fn address(fields: &mut Fields, prefix: &str, address: &Address) {
    let key = |name: &str| format!("{prefix}{name}");
    fields
        .text(&key("companyname1"), address.company_name1.as_deref())
        .text(&key("companyname2"), address.company_name2.as_deref())
        .text(&key("fullname"), address.full_name.as_deref())
        .text(&key("salutation"), address.salutation.as_deref())
        .text(&key("address1"), address.address1.as_deref())
        .text(&key("address2"), address.address2.as_deref())
        .text(&key("postalcode"), address.postal_code.as_deref())
        .text(&key("city"), address.city.as_deref())
        .text(&key("countrycode"), address.country_code.as_deref())
        .text(&key("country"), address.country.as_deref());
}

fn customer_fields(customer: &Customer) -> Fields {
    let mut fields = Fields::default();
    fields
        .code("type", customer.customer_type.map(|t| t.code()))
        .code("vattypeid", customer.vat_type_id.map(|t| t.code()))
        .text("contactyourid", customer.contact_your_id.as_deref())
        .flag("contactstatus", customer.contact_status);
    address(&mut fields, "", customer.main());
    if customer.main_address == AddressRole::Shipping || !customer.alt().is_empty() {
        address(&mut fields, "alt", customer.alt());
    }
    fields
        .text("website", customer.website.as_deref())
        .text("vatnumber", customer.vat_number.as_deref())
        .text("telephone", customer.telephone.as_deref())
        .text("telephone2", customer.telephone2.as_deref())
        .text("fax", customer.fax.as_deref())
        .text("email", customer.email.as_deref())
        .flag("overwriteifexists", customer.overwrite_if_exists)
        .text("bankaccountnumber", customer.bank_account_number.as_deref())
        .text("mark", customer.mark.as_deref())
        .flag("disableduplicates", customer.disable_duplicates);
    fields
}

fn range_fields(fields: &mut Fields, range: &VatRange) {
    fields
        .amount("meta-vatrate-min", Some(range.min))
        .amount("meta-vatrate-max", Some(range.max));
}

fn line_value(line: &Line, include_meta: bool) -> Value {
    let mut fields = Fields::default();
    fields
        .text("itemnumber", line.item_number.as_deref())
        .text("product", line.product.as_deref())
        .text("nature", line.nature.map(|n| n.code()))
        .amount("unitprice", line.unit_price)
        .amount("vatrate", line.vat_rate)
        .amount("quantity", Some(line.quantity))
        .amount("costprice", line.cost_price);

    if include_meta {
        let meta = &line.meta;
        fields
            .text("meta-line-type", Some(meta.line_type.code()))
            .text("meta-vatrate-source", Some(meta.vat_rate_source.code()))
            .amount("meta-unitprice-inc", meta.unit_price_inc)
            .amount("meta-vatamount", meta.vat_amount)
            .amount("meta-lookup-vatrate", meta.lookup_vat_rate);
        if let Some(range) = &meta.vat_range {
            range_fields(&mut fields, range);
        }
        if let Some(index) = meta.parent_index {
            fields.value("meta-parent-index", json!(index));
        }
        if let Some(count) = meta.children_count {
            fields.value("meta-children-count", json!(count));
        }
        if meta.strategy_split {
            fields.flag("meta-strategy-split", Some(true));
        }
        if meta.recalculated_price {
            fields.flag("meta-recalculated-price", Some(true));
        }
    }
    fields.into_value()
}

pub(crate) fn email_value(email: &EmailAsPdf) -> Value {
    let mut fields = Fields::default();
    fields
        .text("emailto", email.email_to.as_deref())
        .text("emailbcc", email.email_bcc.as_deref())
        .text("emailfrom", email.email_from.as_deref())
        .text("subject", email.subject.as_deref())
        .text("message", email.message.as_deref())
        .flag("confirmreading", email.confirm_reading)
        .flag("ubl", email.ubl);
    fields.into_value()
}

/// The `customer` structure Acumulus expects for `invoice_add`, with the
/// invoice nested inside the customer.
///
/// `include_meta` adds the `meta-*` fields that explain how the completor
/// arrived at its values. Acumulus stores but ignores them; they are sent in
/// test mode to help support.
pub fn invoice_add_message(invoice: &Invoice, include_meta: bool) -> Value {
    let mut inv = Fields::default();
    inv.flag("concept", invoice.concept)
        .text("number", invoice.number.as_deref())
        .code("vattype", invoice.vat_type.map(|t| t.code()))
        .date("issuedate", invoice.issue_date)
        .text("costcenter", invoice.cost_center.as_deref())
        .text("accountnumber", invoice.account_number.as_deref())
        .code("paymentstatus", invoice.payment_status.map(|s| s.code()))
        .date("paymentdate", invoice.payment_date)
        .text("description", invoice.description.as_deref())
        .text("descriptiontext", invoice.description_text.as_deref())
        .text("template", invoice.template.as_deref())
        .text("invoicenotes", invoice.invoice_notes.as_deref());

    if include_meta {
        let meta = &invoice.meta;
        inv.text("meta-source-type", Some(meta.source_type.label()))
            .text("meta-source-id", meta.source_id.as_deref())
            .text("meta-source-reference", meta.source_reference.as_deref())
            .text("meta-payment-method", meta.payment_method.as_deref());
        if let Some(totals) = &meta.totals {
            inv.amount("meta-invoice-amount", Some(totals.amount))
                .amount("meta-invoice-vatamount", Some(totals.vat_amount))
                .amount("meta-invoice-amountinc", Some(totals.amount_inc));
        }
        if let Some(totals) = &meta.calculated_totals {
            inv.amount("meta-lines-amount", Some(totals.amount))
                .amount("meta-lines-vatamount", Some(totals.vat_amount))
                .amount("meta-lines-amountinc", Some(totals.amount_inc));
        }
        if !meta.possible_vat_types.is_empty() {
            let types: Vec<String> = meta.possible_vat_types.iter().map(|t| t.code().to_string()).collect();
            inv.text("meta-vattypes-possible", Some(&types.join(",")));
        }
    }

    let lines: Vec<Value> = invoice.lines.iter().map(|l| line_value(l, include_meta)).collect();
    inv.value("line", Value::Array(lines));
    if let Some(email) = &invoice.email_as_pdf {
        inv.value("emailaspdf", email_value(email));
    }

    let mut customer = customer_fields(&invoice.customer);
    customer.value("invoice", inv.into_value());
    json!({ "customer": customer.into_value() })
}
