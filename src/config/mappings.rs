use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Acumulus field name → token expression, for one entity.
///
/// Expressions are evaluated by [`crate::collect::Token`] against the
/// variables an invoice source exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping(BTreeMap<String, String>);

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn set(&mut self, field: impl Into<String>, expression: impl Into<String>) {
        self.0.insert(field.into(), expression.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.0.remove(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Apply overrides: `Some` replaces or adds, `None` removes a default.
    fn overlay(&mut self, overrides: BTreeMap<String, Option<String>>) {
        for (field, expression) in overrides {
            match expression {
                Some(expression) => {
                    self.0.insert(field, expression);
                }
                None => {
                    self.0.remove(&field);
                }
            }
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Field mappings for every collected entity.
///
/// Configured mappings are laid over the defaults: a field set to `null`
/// removes the default mapping for that field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "MappingOverrides")]
pub struct FieldMappings {
    pub invoice: FieldMapping,
    pub customer: FieldMapping,
    pub invoice_address: FieldMapping,
    pub shipping_address: FieldMapping,
    pub line: FieldMapping,
    pub email_as_pdf: FieldMapping,
}

impl Default for FieldMappings {
    fn default() -> Self {
        Self {
            invoice: [("invoicenotes", "[source::customer_note]")]
                .into_iter()
                .collect(),
            customer: [
                ("contactyourid", "[customer::id]"),
                ("email", "[customer::email|billing_address::email]"),
                ("telephone", "[customer::telephone|billing_address::telephone]"),
                ("vatnumber", "[customer::vat_number|billing_address::vat_number]"),
                ("website", "[customer::website]"),
            ]
            .into_iter()
            .collect(),
            invoice_address: address_mapping("billing_address"),
            shipping_address: address_mapping("shipping_address"),
            line: [
                ("itemnumber", "[item::sku]"),
                ("product", "[item::name]"),
                ("nature", "[item::nature]"),
            ]
            .into_iter()
            .collect(),
            email_as_pdf: [("emailto", "[customer::email|billing_address::email]")]
                .into_iter()
                .collect(),
        }
    }
}

fn address_mapping(variable: &str) -> FieldMapping {
    [
        ("companyname1", format!("[{variable}::company]")),
        (
            "fullname",
            format!("[{variable}::first_name+{variable}::last_name]"),
        ),
        ("address1", format!("[{variable}::street]")),
        ("address2", format!("[{variable}::street2]")),
        ("postalcode", format!("[{variable}::postcode]")),
        ("city", format!("[{variable}::city]")),
        ("countrycode", format!("[{variable}::country_code]")),
    ]
    .into_iter()
    .collect()
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct MappingOverrides {
    invoice: BTreeMap<String, Option<String>>,
    customer: BTreeMap<String, Option<String>>,
    invoice_address: BTreeMap<String, Option<String>>,
    shipping_address: BTreeMap<String, Option<String>>,
    line: BTreeMap<String, Option<String>>,
    email_as_pdf: BTreeMap<String, Option<String>>,
}

impl From<MappingOverrides> for FieldMappings {
    fn from(overrides: MappingOverrides) -> Self {
        let mut mappings = Self::default();
        mappings.invoice.overlay(overrides.invoice);
        mappings.customer.overlay(overrides.customer);
        mappings.invoice_address.overlay(overrides.invoice_address);
        mappings.shipping_address.overlay(overrides.shipping_address);
        mappings.line.overlay(overrides.line);
        mappings.email_as_pdf.overlay(overrides.email_as_pdf);
        mappings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_are_laid_over_defaults() {
        let mappings: FieldMappings = serde_json::from_str(
            r#"{"customer": {"website": null, "mark": "[customer::group]"}}"#,
        )
        .unwrap();
        assert_eq!(mappings.customer.get("website"), None);
        assert_eq!(mappings.customer.get("mark"), Some("[customer::group]"));
        assert_eq!(mappings.customer.get("contactyourid"), Some("[customer::id]"));
        assert_eq!(mappings.line, FieldMappings::default().line);
    }

    #[test]
    fn address_defaults_use_their_variable() {
        let mappings = FieldMappings::default();
        assert_eq!(
            mappings.shipping_address.get("city"),
            Some("[shipping_address::city]")
        );
    }
}
