//! VAT type inference: which Acumulus VAT regimes fit the customer, the shop
//! and, once the lines are complete, the VAT rates actually used.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::{MarginProducts, ShopSettings};
use crate::core::{
    HOME_COUNTRY, Invoice, Line, VAT_RATE_FREE, VatType, is_eu_country, is_home_country,
};
use crate::result::Message;

use super::vat_rates::{VatRateLookup, VatRateTable};

/// Candidate VAT rates per possible VAT type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VatCandidates {
    by_type: BTreeMap<VatType, Vec<Decimal>>,
}

impl VatCandidates {
    pub fn insert(&mut self, vat_type: VatType, mut rates: Vec<Decimal>) {
        rates.sort_by(|a, b| b.cmp(a));
        rates.dedup();
        self.by_type.insert(vat_type, rates);
    }

    pub fn types(&self) -> impl Iterator<Item = VatType> + '_ {
        self.by_type.keys().copied()
    }

    pub fn rates_for(&self, vat_type: VatType) -> &[Decimal] {
        self.by_type.get(&vat_type).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All candidate rates of all types, highest first.
    pub fn all_rates(&self) -> Vec<Decimal> {
        let mut rates: Vec<Decimal> = self.by_type.values().flatten().copied().collect();
        rates.sort_by(|a, b| b.cmp(a));
        rates.dedup();
        rates
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

/// Rates are compared with VAT free (-1) counting as 0%.
fn same_rate(a: Decimal, b: Decimal) -> bool {
    a.max(Decimal::ZERO) == b.max(Decimal::ZERO)
}

fn any_line(lines: &[Line], pred: &dyn Fn(&Line) -> bool) -> bool {
    lines.iter().any(|l| pred(l) || any_line(&l.children, pred))
}

/// VAT types possible for the customer and shop of `invoice`, before looking
/// at the lines.
pub fn possible_vat_types(invoice: &Invoice, shop: &ShopSettings) -> Vec<VatType> {
    if shop.margin_products == MarginProducts::Only {
        return vec![VatType::MarginScheme];
    }

    let country = invoice.customer.country_code().unwrap_or(HOME_COUNTRY);
    let business = invoice.customer.is_business();
    let mut types = vec![VatType::National];

    if is_home_country(country) {
        if shop.reversed_national && business {
            types.push(VatType::NationalReversed);
        }
    } else if is_eu_country(country) {
        if business {
            types.push(VatType::EuReversed);
        } else if shop.foreign_vat {
            types.push(VatType::ForeignVat);
        }
    } else {
        types.push(VatType::RestOfWorld);
    }

    if shop.margin_products == MarginProducts::Yes
        && any_line(&invoice.lines, &|l| l.cost_price.is_some())
    {
        types.push(VatType::MarginScheme);
    }

    types.sort();
    types
}

/// Determine the possible VAT types of `invoice` and their candidate rates.
///
/// A VAT type set by the shop is kept when it is possible; otherwise it is
/// dropped with a warning.
pub fn complete_possible_vat_types(
    invoice: &mut Invoice,
    shop: &ShopSettings,
    lookup: &dyn VatRateLookup,
    today: NaiveDate,
    messages: &mut Vec<Message>,
) -> VatCandidates {
    let mut types = possible_vat_types(invoice, shop);

    if let Some(vat_type) = invoice.vat_type {
        if types.contains(&vat_type) {
            types = vec![vat_type];
        } else {
            warn!(vat_type = vat_type.code(), "VAT type from shop is not possible");
            messages.push(
                Message::warning(
                    "vattype-source",
                    format!(
                        "VAT type {} set by the shop does not fit the customer, it is inferred instead",
                        vat_type.code()
                    ),
                )
                .with_field("invoice.vattype"),
            );
            invoice.vat_type = None;
        }
    }

    let date = invoice.issue_date.unwrap_or(today);
    let country = invoice
        .customer
        .country_code()
        .unwrap_or(HOME_COUNTRY)
        .to_string();

    let mut candidates = VatCandidates::default();
    for vat_type in types {
        let rates = match vat_type {
            VatType::National | VatType::NationalReversed | VatType::MarginScheme => {
                Some(dutch_rates(lookup, date, messages))
            }
            VatType::EuReversed | VatType::RestOfWorld => Some(vec![Decimal::ZERO]),
            VatType::ForeignVat => match lookup.vat_rates(&country, date) {
                Ok(rates) if !rates.is_empty() => Some(rates.into_iter().map(|r| r.rate).collect()),
                Ok(_) | Err(_) => {
                    messages.push(Message::warning(
                        "vatrates-lookup",
                        format!("VAT rates of {country} are not known, foreign VAT is not considered"),
                    ));
                    None
                }
            },
        };
        if let Some(mut rates) = rates {
            if shop.vat_free_products {
                rates.push(VAT_RATE_FREE);
            }
            if shop.zero_vat_products && vat_type == VatType::National {
                rates.push(Decimal::ZERO);
            }
            candidates.insert(vat_type, rates);
        }
    }

    invoice.meta.possible_vat_types = candidates.types().collect();
    debug!(types = ?invoice.meta.possible_vat_types, "possible VAT types");
    candidates
}

fn dutch_rates(lookup: &dyn VatRateLookup, date: NaiveDate, messages: &mut Vec<Message>) -> Vec<Decimal> {
    match lookup.vat_rates(HOME_COUNTRY, date) {
        Ok(rates) if !rates.is_empty() => rates.into_iter().map(|r| r.rate).collect(),
        failed => {
            if let Err(e) = &failed {
                warn!(error = %e, "Dutch VAT rate lookup failed");
            }
            let message = Message::warning(
                "vatrates-lookup",
                "Dutch VAT rates could not be looked up, built-in rates are used",
            );
            if !messages.contains(&message) {
                messages.push(message);
            }
            VatRateTable::dutch_defaults()
                .vat_rates(HOME_COUNTRY, date)
                .map(|rates| rates.into_iter().map(|r| r.rate).collect())
                .unwrap_or_default()
        }
    }
}

/// Rates used by lines that carry an amount.
pub fn used_rates(lines: &[Line]) -> Vec<Decimal> {
    let mut rates: Vec<Decimal> = lines
        .iter()
        .filter(|l| !l.line_amount().is_zero())
        .filter_map(|l| l.vat_rate)
        .collect();
    rates.sort_by(|a, b| b.cmp(a));
    rates.dedup();
    rates
}

/// Preference among equally possible types.
const PREFERENCE: [VatType; 6] = [
    VatType::National,
    VatType::EuReversed,
    VatType::ForeignVat,
    VatType::RestOfWorld,
    VatType::MarginScheme,
    VatType::NationalReversed,
];

/// Pick the final VAT type from the rates the completed lines use.
pub fn complete_vat_type(invoice: &mut Invoice, candidates: &VatCandidates, messages: &mut Vec<Message>) {
    if invoice.vat_type.is_some() {
        return;
    }

    let used = used_rates(&invoice.lines);
    let remaining: Vec<VatType> = candidates
        .types()
        .filter(|t| {
            let rates = candidates.rates_for(*t);
            used.iter().all(|u| rates.iter().any(|r| same_rate(*r, *u)))
        })
        .collect();

    match remaining.as_slice() {
        [] => {
            warn!(rates = ?used, "no VAT type fits the used VAT rates");
            messages.push(
                Message::warning(
                    "vattype-none",
                    "no VAT type fits the VAT rates on the invoice, please check the VAT type",
                )
                .with_field("invoice.vattype"),
            );
            invoice.meta.made_concept = true;
        }
        [only] => invoice.vat_type = Some(*only),
        several => {
            let all_zero = used.iter().all(|r| (*r).max(Decimal::ZERO).is_zero());
            let country = invoice.customer.country_code().unwrap_or(HOME_COUNTRY);
            let chosen = if all_zero
                && invoice.customer.is_business()
                && is_eu_country(country)
                && several.contains(&VatType::EuReversed)
            {
                VatType::EuReversed
            } else if all_zero && !is_eu_country(country) && several.contains(&VatType::RestOfWorld) {
                VatType::RestOfWorld
            } else {
                PREFERENCE
                    .into_iter()
                    .find(|t| several.contains(t))
                    .unwrap_or(several[0])
            };
            debug!(?chosen, options = ?several, "VAT type chosen by preference");
            messages.push(
                Message::notice(
                    "vattype-choice",
                    format!(
                        "VAT types {} all fit, {} was chosen",
                        several
                            .iter()
                            .map(|t| t.code().to_string())
                            .collect::<Vec<_>>()
                            .join(", "),
                        chosen.code()
                    ),
                )
                .with_field("invoice.vattype"),
            );
            invoice.vat_type = Some(chosen);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AddressBuilder, CustomerBuilder, InvoiceBuilder, LineBuilder};
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn invoice_for(country: &str, business: bool) -> Invoice {
        let mut customer = CustomerBuilder::new();
        let mut address = AddressBuilder::new(country);
        if business {
            address = address.company_name("Klant BV");
            customer = customer.vat_number(format!("{country}123456789B01"));
        }
        InvoiceBuilder::new()
            .issue_date(date())
            .customer(customer.invoice_address(address.build()).build())
            .build()
    }

    #[test]
    fn possible_types_per_customer() {
        let shop = ShopSettings {
            foreign_vat: true,
            reversed_national: true,
            ..Default::default()
        };
        assert_eq!(
            possible_vat_types(&invoice_for("NL", false), &shop),
            vec![VatType::National]
        );
        assert_eq!(
            possible_vat_types(&invoice_for("NL", true), &shop),
            vec![VatType::National, VatType::NationalReversed]
        );
        assert_eq!(
            possible_vat_types(&invoice_for("BE", true), &shop),
            vec![VatType::National, VatType::EuReversed]
        );
        assert_eq!(
            possible_vat_types(&invoice_for("BE", false), &shop),
            vec![VatType::National, VatType::ForeignVat]
        );
        assert_eq!(
            possible_vat_types(&invoice_for("US", false), &shop),
            vec![VatType::National, VatType::RestOfWorld]
        );
    }

    #[test]
    fn margin_only_shop() {
        let shop = ShopSettings {
            margin_products: MarginProducts::Only,
            ..Default::default()
        };
        assert_eq!(
            possible_vat_types(&invoice_for("DE", true), &shop),
            vec![VatType::MarginScheme]
        );
    }

    #[test]
    fn impossible_shop_type_is_dropped() {
        let mut invoice = invoice_for("NL", false);
        invoice.vat_type = Some(VatType::EuReversed);
        let mut messages = Vec::new();
        let candidates = complete_possible_vat_types(
            &mut invoice,
            &ShopSettings::default(),
            &VatRateTable::dutch_defaults(),
            date(),
            &mut messages,
        );
        assert_eq!(invoice.vat_type, None);
        assert_eq!(messages[0].code_tag.as_deref(), Some("vattype-source"));
        assert_eq!(candidates.rates_for(VatType::National), &[dec!(21), dec!(9), dec!(0)]);
    }

    #[test]
    fn unknown_foreign_rates_drop_foreign_vat() {
        let mut invoice = invoice_for("FR", false);
        let shop = ShopSettings {
            foreign_vat: true,
            vat_free_products: true,
            ..Default::default()
        };
        let mut messages = Vec::new();
        let candidates =
            complete_possible_vat_types(
            &mut invoice,
            &shop,
            &VatRateTable::dutch_defaults(),
            date(),
            &mut messages,
        );
        assert_eq!(invoice.meta.possible_vat_types, vec![VatType::National]);
        assert!(candidates.rates_for(VatType::National).contains(&VAT_RATE_FREE));
        assert_eq!(messages.len(), 1);
    }

    fn candidates(types: &[(VatType, Vec<Decimal>)]) -> VatCandidates {
        let mut c = VatCandidates::default();
        for (t, rates) in types {
            c.insert(*t, rates.clone());
        }
        c
    }

    #[test]
    fn zero_rated_eu_business_prefers_reverse_charge() {
        let mut invoice = invoice_for("BE", true);
        invoice.lines.push(LineBuilder::new("Stoel", dec!(1), dec!(100)).vat_rate(dec!(0)).build());
        let c = candidates(&[
            (VatType::National, vec![dec!(21), dec!(9), dec!(0)]),
            (VatType::EuReversed, vec![dec!(0)]),
        ]);
        let mut messages = Vec::new();
        complete_vat_type(&mut invoice, &c, &mut messages);
        assert_eq!(invoice.vat_type, Some(VatType::EuReversed));
        assert_eq!(messages[0].code_tag.as_deref(), Some("vattype-choice"));
    }

    #[test]
    fn single_fitting_type_is_set_silently() {
        let mut invoice = invoice_for("BE", true);
        invoice.lines.push(LineBuilder::new("Stoel", dec!(1), dec!(100)).vat_rate(dec!(21)).build());
        let c = candidates(&[
            (VatType::National, vec![dec!(21), dec!(9), dec!(0)]),
            (VatType::EuReversed, vec![dec!(0)]),
        ]);
        let mut messages = Vec::new();
        complete_vat_type(&mut invoice, &c, &mut messages);
        assert_eq!(invoice.vat_type, Some(VatType::National));
        assert!(messages.is_empty());
    }

    #[test]
    fn no_fitting_type_makes_concept() {
        let mut invoice = invoice_for("NL", false);
        invoice.lines.push(LineBuilder::new("Stoel", dec!(1), dec!(100)).vat_rate(dec!(20)).build());
        let c = candidates(&[(VatType::National, vec![dec!(21), dec!(9), dec!(0)])]);
        let mut messages = Vec::new();
        complete_vat_type(&mut invoice, &c, &mut messages);
        assert_eq!(invoice.vat_type, None);
        assert!(invoice.meta.made_concept);
    }

    #[test]
    fn vat_free_counts_as_zero() {
        let mut invoice = invoice_for("US", false);
        invoice.lines.push(LineBuilder::new("Les", dec!(1), dec!(50)).vat_rate(VAT_RATE_FREE).build());
        let c = candidates(&[
            (VatType::National, vec![dec!(21), dec!(9), dec!(0)]),
            (VatType::RestOfWorld, vec![dec!(0)]),
        ]);
        let mut messages = Vec::new();
        complete_vat_type(&mut invoice, &c, &mut messages);
        assert_eq!(invoice.vat_type, Some(VatType::RestOfWorld));
    }
}
