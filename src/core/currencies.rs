//! Currency codes.
//!
//! Acumulus books in euro. Orders placed in another currency are converted
//! by the completor, which needs a usable code and rate first.

/// The only currency Acumulus accepts.
pub const EURO: &str = "EUR";

/// Whether `code` has the shape of an ISO 4217 code: three ASCII letters,
/// any case.
pub fn is_currency_code(code: &str) -> bool {
    let code = code.trim();
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphabetic())
}

/// Whether `code` denotes the euro (case insensitive). An empty code is
/// taken as euro.
pub fn is_euro(code: &str) -> bool {
    let code = code.trim();
    code.is_empty() || code.eq_ignore_ascii_case(EURO)
}
