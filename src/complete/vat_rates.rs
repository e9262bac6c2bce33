//! VAT rates per country, as known at a given date.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::core::{AcumulusError, HOME_COUNTRY, normalize_country_code};

/// One VAT rate of a country, optionally limited to a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatRateInfo {
    pub country_code: String,
    pub rate: Decimal,
    /// Kind of rate as Acumulus names it ("normal", "reduced", "zero", ...).
    pub kind: Option<String>,
    pub valid_from: Option<NaiveDate>,
    /// Last day on which the rate applies.
    pub valid_to: Option<NaiveDate>,
}

impl VatRateInfo {
    pub fn new(country_code: &str, rate: Decimal) -> Self {
        Self {
            country_code: normalize_country_code(country_code),
            rate,
            kind: None,
            valid_from: None,
            valid_to: None,
        }
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn valid(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.valid_from = from;
        self.valid_to = to;
        self
    }

    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        self.valid_from.is_none_or(|from| from <= date) && self.valid_to.is_none_or(|to| date <= to)
    }
}

/// Source of VAT rates for the completor.
pub trait VatRateLookup {
    /// Rates that apply in `country_code` on `date`.
    ///
    /// # Errors
    ///
    /// When the rates of the country are not known.
    fn vat_rates(&self, country_code: &str, date: NaiveDate) -> Result<Vec<VatRateInfo>, AcumulusError>;
}

/// In-memory, date-aware VAT rate table.
///
/// Filled from [`VatRateTable::dutch_defaults`] or from Acumulus lookups
/// (see `AcumulusService::fetch_vat_rates`).
#[derive(Debug, Clone, Default)]
pub struct VatRateTable {
    rates: BTreeMap<String, Vec<VatRateInfo>>,
}

impl VatRateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dutch rates since 2000: 19/6 until the 2012 and 2019 increases, 0
    /// always.
    pub fn dutch_defaults() -> Self {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d);
        let mut table = Self::new();
        table.insert(VatRateInfo::new(HOME_COUNTRY, dec!(19)).kind("normal").valid(None, date(2012, 9, 30)));
        table.insert(VatRateInfo::new(HOME_COUNTRY, dec!(21)).kind("normal").valid(date(2012, 10, 1), None));
        table.insert(VatRateInfo::new(HOME_COUNTRY, dec!(6)).kind("reduced").valid(None, date(2018, 12, 31)));
        table.insert(VatRateInfo::new(HOME_COUNTRY, dec!(9)).kind("reduced").valid(date(2019, 1, 1), None));
        table.insert(VatRateInfo::new(HOME_COUNTRY, Decimal::ZERO).kind("zero"));
        table
    }

    pub fn insert(&mut self, info: VatRateInfo) {
        let rates = self.rates.entry(info.country_code.clone()).or_default();
        if !rates.contains(&info) {
            rates.push(info);
        }
    }

    /// Add all rates of `other`.
    pub fn merge(&mut self, other: VatRateTable) {
        for info in other.rates.into_values().flatten() {
            self.insert(info);
        }
    }

    pub fn has_country(&self, country_code: &str) -> bool {
        self.rates.contains_key(&normalize_country_code(country_code))
    }

    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.rates.keys().map(String::as_str)
    }
}

impl VatRateLookup for VatRateTable {
    fn vat_rates(&self, country_code: &str, date: NaiveDate) -> Result<Vec<VatRateInfo>, AcumulusError> {
        let code = normalize_country_code(country_code);
        let rates = self
            .rates
            .get(&code)
            .ok_or_else(|| AcumulusError::Complete(format!("no VAT rates known for '{code}'")))?;
        Ok(rates.iter().filter(|r| r.is_valid_on(date)).cloned().collect())
    }
}
