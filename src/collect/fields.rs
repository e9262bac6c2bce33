//! Applying collected values to data objects by Acumulus field name.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::config::FieldMapping;
use crate::core::{
    AcumulusError, Address, Customer, CustomerType, EmailAsPdf, Invoice, Line, Nature, VatTypeId,
};
use crate::result::Message;

use super::convert::{to_bool, to_code, to_decimal, to_text};
use super::token::{Token, Variables};

/// Why a collected value was not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FieldError {
    Unknown,
    Invalid(&'static str),
}

type FieldResult = Result<(), FieldError>;

/// Evaluate every expression of `mapping`. Fields without a value are left
/// out.
///
/// # Errors
///
/// `AcumulusError::Token` when an expression does not parse.
pub fn collect_fields(
    mapping: &FieldMapping,
    vars: &Variables<'_>,
) -> Result<BTreeMap<String, Value>, AcumulusError> {
    let mut fields = BTreeMap::new();
    for (field, expression) in mapping.iter() {
        let token = Token::parse(expression)
            .map_err(|e| AcumulusError::Token(format!("mapping for '{field}': {e}")))?;
        if let Some(value) = token.evaluate(vars) {
            fields.insert(field.to_string(), value);
        }
    }
    Ok(fields)
}

/// Apply `fields` with `apply`, turning problems into messages on `entity`.
pub(crate) fn apply_fields<T>(
    target: &mut T,
    entity: &str,
    fields: &BTreeMap<String, Value>,
    apply: fn(&mut T, &str, &Value) -> FieldResult,
    messages: &mut Vec<Message>,
) {
    for (field, value) in fields {
        match apply(target, field, value) {
            Ok(()) => {}
            Err(FieldError::Unknown) => messages.push(
                Message::log(
                    "collect-unknown-field",
                    format!("no {entity} field '{field}', mapping ignored"),
                )
                .with_field(format!("{entity}.{field}")),
            ),
            Err(FieldError::Invalid(expected)) => messages.push(
                Message::warning(
                    "collect-invalid-value",
                    format!("value '{value}' for {entity} field '{field}' is not {expected}"),
                )
                .with_field(format!("{entity}.{field}")),
            ),
        }
    }
}

fn text(value: &Value) -> Option<String> {
    to_text(value)
}

fn flag(value: &Value) -> Result<Option<bool>, FieldError> {
    to_bool(value).map(Some).ok_or(FieldError::Invalid("a boolean"))
}

pub(crate) fn apply_customer_field(customer: &mut Customer, field: &str, value: &Value) -> FieldResult {
    match field {
        "type" => {
            customer.customer_type = Some(
                to_code(value)
                    .and_then(CustomerType::from_code)
                    .ok_or(FieldError::Invalid("a customer type (1-3)"))?,
            )
        }
        "vattypeid" => {
            customer.vat_type_id = Some(
                to_code(value)
                    .and_then(VatTypeId::from_code)
                    .ok_or(FieldError::Invalid("a VAT type id (1-2)"))?,
            )
        }
        "contactyourid" => customer.contact_your_id = text(value),
        "contactstatus" => customer.contact_status = flag(value)?,
        "website" => customer.website = text(value),
        "vatnumber" => customer.vat_number = text(value),
        "telephone" => customer.telephone = text(value),
        "telephone2" => customer.telephone2 = text(value),
        "fax" => customer.fax = text(value),
        "email" => customer.email = text(value),
        "overwriteifexists" => customer.overwrite_if_exists = flag(value)?,
        "bankaccountnumber" => customer.bank_account_number = text(value),
        "mark" => customer.mark = text(value),
        "disableduplicates" => customer.disable_duplicates = flag(value)?,
        _ => return Err(FieldError::Unknown),
    }
    Ok(())
}

pub(crate) fn apply_address_field(address: &mut Address, field: &str, value: &Value) -> FieldResult {
    let value = text(value);
    match field {
        "companyname1" => address.company_name1 = value,
        "companyname2" => address.company_name2 = value,
        "fullname" => address.full_name = value,
        "salutation" => address.salutation = value,
        "address1" => address.address1 = value,
        "address2" => address.address2 = value,
        "postalcode" => address.postal_code = value,
        "city" => address.city = value,
        "countrycode" => address.country_code = value,
        "country" => address.country = value,
        _ => return Err(FieldError::Unknown),
    }
    Ok(())
}

pub(crate) fn apply_invoice_field(invoice: &mut Invoice, field: &str, value: &Value) -> FieldResult {
    match field {
        "concept" => invoice.concept = flag(value)?,
        "number" => invoice.number = text(value),
        "costcenter" => invoice.cost_center = text(value),
        "accountnumber" => invoice.account_number = text(value),
        "template" => invoice.template = text(value),
        "description" => invoice.description = text(value),
        "descriptiontext" => invoice.description_text = text(value),
        "invoicenotes" => invoice.invoice_notes = text(value),
        _ => return Err(FieldError::Unknown),
    }
    Ok(())
}

pub(crate) fn apply_line_field(line: &mut Line, field: &str, value: &Value) -> FieldResult {
    match field {
        "itemnumber" => line.item_number = text(value),
        "product" => line.product = text(value),
        "nature" => {
            line.nature = Some(
                text(value)
                    .and_then(|n| Nature::from_code(&n))
                    .ok_or(FieldError::Invalid("Product or Service"))?,
            )
        }
        "costprice" => {
            line.cost_price = Some(to_decimal(value).ok_or(FieldError::Invalid("an amount"))?)
        }
        _ => return Err(FieldError::Unknown),
    }
    Ok(())
}

pub(crate) fn apply_email_field(email: &mut EmailAsPdf, field: &str, value: &Value) -> FieldResult {
    match field {
        "emailto" => email.email_to = text(value),
        "emailbcc" => email.email_bcc = text(value),
        "emailfrom" => email.email_from = text(value),
        "subject" => email.subject = text(value),
        "message" => email.message = text(value),
        "confirmreading" => email.confirm_reading = flag(value)?,
        "ubl" => email.ubl = flag(value)?,
        _ => return Err(FieldError::Unknown),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Severity;
    use serde_json::json;

    #[test]
    fn collects_only_present_fields() {
        let data = json!({"email": "a@b.nl", "phone": ""});
        let vars = Variables::new().with("customer", &data);
        let mapping: FieldMapping = [
            ("email", "[customer::email]"),
            ("telephone", "[customer::phone]"),
        ]
        .into_iter()
        .collect();
        let fields = collect_fields(&mapping, &vars).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["email"], json!("a@b.nl"));
    }

    #[test]
    fn bad_mapping_names_the_field() {
        let mapping: FieldMapping = [("email", "[customer::email")].into_iter().collect();
        let err = collect_fields(&mapping, &Variables::new()).unwrap_err();
        assert!(err.to_string().contains("'email'"));
    }

    #[test]
    fn unknown_and_invalid_fields_become_messages() {
        let fields = BTreeMap::from([
            ("email".to_string(), json!("jan@example.nl")),
            ("shoesize".to_string(), json!(44)),
            ("contactstatus".to_string(), json!("sometimes")),
        ]);
        let mut customer = Customer::default();
        let mut messages = Vec::new();
        apply_fields(&mut customer, "customer", &fields, apply_customer_field, &mut messages);

        assert_eq!(customer.email.as_deref(), Some("jan@example.nl"));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].severity, Severity::Warning);
        assert_eq!(messages[0].field.as_deref(), Some("customer.contactstatus"));
        assert_eq!(messages[1].severity, Severity::Log);
    }

    #[test]
    fn line_nature_and_cost_price() {
        let mut line = Line::default();
        assert!(apply_line_field(&mut line, "nature", &json!("service")).is_ok());
        assert!(apply_line_field(&mut line, "costprice", &json!("3.10")).is_ok());
        assert_eq!(line.nature, Some(Nature::Service));
        assert_eq!(
            apply_line_field(&mut line, "costprice", &json!("n/a")),
            Err(FieldError::Invalid("an amount"))
        );
    }
}
