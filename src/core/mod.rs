//! Core invoice types, VAT ranges, country data and validation.
//!
//! This module provides the Acumulus-shaped data model that the collector
//! fills, the completor corrects and the web layer serializes.

mod builder;
mod countries;
mod currencies;
mod error;
mod rounding;
mod types;
mod validation;
mod vat_number;
mod vat_range;

pub use builder::*;
pub use countries::{
    HOME_COUNTRY, is_eu_country, is_home_country, is_known_country_code, normalize_country_code,
};
pub use currencies::{EURO, is_currency_code, is_euro};
pub use error::*;
pub use rounding::{
    MAX_AMOUNT, MAX_VAT_RATE, amount_in_range, amounts_equal, ex_from_inc, round_half_up, vat_on,
    vat_rate_in_range,
};
pub use types::*;
pub use validation::*;
pub use vat_number::{VatNumberError, normalize_vat_number, validate_vat_format, vat_prefix};
pub use vat_range::VatRange;
