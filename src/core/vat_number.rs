//! EU VAT number normalization and format checks.

use std::fmt;

/// Error returned when a VAT number fails format validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VatNumberError {
    /// The invalid input value.
    pub value: String,
    /// Why the value failed validation.
    pub reason: String,
}

impl fmt::Display for VatNumberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid VAT number '{}': {}", self.value, self.reason)
    }
}

impl std::error::Error for VatNumberError {}

/// VAT number prefix for a country code. Greece uses "EL".
pub fn vat_prefix(country_code: &str) -> String {
    let cc = country_code.trim().to_ascii_uppercase();
    if cc == "GR" { "EL".to_string() } else { cc }
}

/// Normalize a VAT number as typed by a customer: separators removed, upper
/// case, and the country prefix added when the customer left it out.
///
/// ```
/// use acumulus::core::normalize_vat_number;
///
/// assert_eq!(normalize_vat_number(" nl 1234.56.789.b01", "NL"), "NL123456789B01");
/// assert_eq!(normalize_vat_number("123456789B01", "nl"), "NL123456789B01");
/// ```
pub fn normalize_vat_number(vat_number: &str, country_code: &str) -> String {
    let cleaned: String = vat_number
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase();
    let has_prefix = cleaned.len() > 2 && cleaned[..2].chars().all(|c| c.is_ascii_alphabetic());
    if has_prefix || country_code.trim().is_empty() {
        cleaned
    } else {
        format!("{}{cleaned}", vat_prefix(country_code))
    }
}

/// Validate an EU VAT number by format (no network call).
///
/// The input must include the 2-letter country prefix (e.g. "NL123456789B01").
/// Returns the (prefix, number) split on success.
pub fn validate_vat_format(vat_id: &str) -> Result<(&str, &str), VatNumberError> {
    let vat_id = vat_id.trim();
    if vat_id.len() < 4 || !vat_id.is_ascii() {
        return Err(VatNumberError {
            value: vat_id.into(),
            reason: "too short, must be at least 4 characters".into(),
        });
    }

    let country = &vat_id[..2];
    let number = &vat_id[2..];

    type VatValidator = fn(&str) -> bool;
    let pattern: &[(&str, VatValidator)] = &[
        ("AT", |n| {
            n.len() == 9 && n.starts_with('U') && n[1..].chars().all(|c| c.is_ascii_digit())
        }),
        ("BE", |n| {
            n.len() == 10 && n.chars().all(|c| c.is_ascii_digit())
        }),
        ("BG", |n| {
            (n.len() == 9 || n.len() == 10) && n.chars().all(|c| c.is_ascii_digit())
        }),
        ("CY", |n| {
            n.len() == 9
                && n[..8].chars().all(|c| c.is_ascii_digit())
                && n.as_bytes()[8].is_ascii_alphabetic()
        }),
        ("CZ", |n| {
            (8..=10).contains(&n.len()) && n.chars().all(|c| c.is_ascii_digit())
        }),
        ("DE", |n| {
            n.len() == 9 && n.chars().all(|c| c.is_ascii_digit()) && n.as_bytes()[0] != b'0'
        }),
        ("DK", |n| {
            n.len() == 8 && n.chars().all(|c| c.is_ascii_digit())
        }),
        ("EE", |n| {
            n.len() == 9 && n.chars().all(|c| c.is_ascii_digit())
        }),
        ("EL", |n| {
            n.len() == 9 && n.chars().all(|c| c.is_ascii_digit())
        }),
        ("ES", |n| {
            n.len() == 9 && n.chars().all(|c| c.is_ascii_alphanumeric())
        }),
        ("FI", |n| {
            n.len() == 8 && n.chars().all(|c| c.is_ascii_digit())
        }),
        ("FR", |n| {
            n.len() == 11
                && n[..2].chars().all(|c| c.is_ascii_alphanumeric())
                && n[2..].chars().all(|c| c.is_ascii_digit())
        }),
        ("HR", |n| {
            n.len() == 11 && n.chars().all(|c| c.is_ascii_digit())
        }),
        ("HU", |n| {
            n.len() == 8 && n.chars().all(|c| c.is_ascii_digit())
        }),
        ("IE", |n| {
            (n.len() == 8 || n.len() == 9) && n.chars().all(|c| c.is_ascii_alphanumeric())
        }),
        ("IT", |n| {
            n.len() == 11 && n.chars().all(|c| c.is_ascii_digit())
        }),
        ("LT", |n| {
            (n.len() == 9 || n.len() == 12) && n.chars().all(|c| c.is_ascii_digit())
        }),
        ("LU", |n| {
            n.len() == 8 && n.chars().all(|c| c.is_ascii_digit())
        }),
        ("LV", |n| {
            n.len() == 11 && n.chars().all(|c| c.is_ascii_digit())
        }),
        ("MT", |n| {
            n.len() == 8 && n.chars().all(|c| c.is_ascii_digit())
        }),
        ("NL", |n| {
            n.len() == 12
                && n[..9].chars().all(|c| c.is_ascii_digit())
                && n.as_bytes()[9] == b'B'
                && n[10..].chars().all(|c| c.is_ascii_digit())
        }),
        ("PL", |n| {
            n.len() == 10 && n.chars().all(|c| c.is_ascii_digit())
        }),
        ("PT", |n| {
            n.len() == 9 && n.chars().all(|c| c.is_ascii_digit())
        }),
        ("RO", |n| {
            (2..=10).contains(&n.len()) && n.chars().all(|c| c.is_ascii_digit())
        }),
        ("SE", |n| {
            n.len() == 12 && n.chars().all(|c| c.is_ascii_digit())
        }),
        ("SI", |n| {
            n.len() == 8 && n.chars().all(|c| c.is_ascii_digit())
        }),
        ("SK", |n| {
            n.len() == 10 && n.chars().all(|c| c.is_ascii_digit())
        }),
    ];

    let country_upper = country.to_uppercase();
    if let Some((code, validator)) = pattern.iter().find(|(code, _)| *code == country_upper) {
        return if validator(number) {
            Ok((country, number))
        } else {
            Err(VatNumberError {
                value: vat_id.into(),
                reason: format!("invalid format for country {code}"),
            })
        };
    }

    // XI (Northern Ireland) uses the GB format
    if country_upper == "XI" {
        if number.len() == 9 && number.chars().all(|c| c.is_ascii_digit()) {
            return Ok((country, number));
        }
        return Err(VatNumberError {
            value: vat_id.into(),
            reason: "invalid format for country XI".into(),
        });
    }

    Err(VatNumberError {
        value: vat_id.into(),
        reason: format!("unknown country prefix '{country}'"),
    })
}
