use tracing::debug;

use crate::config::CustomerSettings;
use crate::core::{
    AddressRole, Customer, HOME_COUNTRY, VatTypeId, is_eu_country, normalize_country_code,
    normalize_vat_number, validate_vat_format,
};
use crate::result::Message;

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Normalize customer data and fill in defaults from the settings.
pub fn complete_customer(customer: &mut Customer, settings: &CustomerSettings, messages: &mut Vec<Message>) {
    for address in [&mut customer.invoice_address, &mut customer.shipping_address] {
        if let Some(code) = address.country_code.as_deref() {
            let code = normalize_country_code(code);
            address.country_code = (!code.is_empty()).then_some(code);
        }
    }

    // Virtual products have no shipping address: the other one leads then.
    if customer.main().is_empty() && !customer.alt().is_empty() {
        customer.main_address = match customer.main_address {
            AddressRole::Invoice => AddressRole::Shipping,
            AddressRole::Shipping => AddressRole::Invoice,
        };
        debug!(main = ?customer.main_address, "main address switched to the non-empty one");
    }

    let main = customer.main_mut();
    if main.country_code.is_none() {
        main.country_code = Some(HOME_COUNTRY.to_string());
    }
    if !non_empty(&main.full_name) && non_empty(&main.company_name1) {
        main.full_name.clone_from(&main.company_name1);
    }
    let country = main.country_code.clone().unwrap_or_default();

    if !non_empty(&customer.email) {
        customer.email.clone_from(&settings.email_if_absent);
    }

    if let Some(vat_number) = customer.vat_number.as_deref() {
        let normalized = normalize_vat_number(vat_number, &country);
        if normalized.is_empty() {
            customer.vat_number = None;
        } else {
            if is_eu_country(&country) {
                if let Err(e) = validate_vat_format(&normalized) {
                    messages.push(
                        Message::warning("customer-vatnumber", e.to_string())
                            .with_field("customer.vatnumber"),
                    );
                }
            }
            customer.vat_number = Some(normalized);
        }
    }

    if customer.vat_type_id.is_none() {
        customer.vat_type_id = Some(
            if non_empty(&customer.main().company_name1) && non_empty(&customer.vat_number) {
                VatTypeId::Business
            } else {
                VatTypeId::Private
            },
        );
    }

    customer.contact_status.get_or_insert(settings.contact_status);
    customer.overwrite_if_exists.get_or_insert(settings.overwrite_if_exists);
    customer.customer_type.get_or_insert(settings.default_customer_type);
}
