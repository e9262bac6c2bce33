//! # acumulus
//!
//! Shop-agnostic library for sending shop orders and credit notes as
//! invoices to the [Acumulus](https://www.siel.nl/acumulus/) bookkeeping
//! web API.
//!
//! An invoice passes three stages:
//!
//! 1. [`collect`]: field mappings and a shop's [`InvoiceSource`](collect::InvoiceSource)
//!    turn order data into an Acumulus-shaped [`Invoice`](core::Invoice).
//! 2. [`complete`]: defaults, VAT rates derived from amounts, the VAT type,
//!    flattened bundles and discount lines split over VAT rates.
//! 3. [`web`]: the envelope, XML/JSON encoding, the HTTP call and a
//!    normalized [`AcumulusResult`](result::AcumulusResult).
//!
//! [`pipeline::Acumulus`] runs all three.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//!
//! ## Quick Start
//!
//! ```rust
//! use acumulus::collect::{Collector, DocumentSource, NoHooks};
//! use acumulus::complete::{Completor, VatRateTable};
//! use acumulus::config::Config;
//! use acumulus::web::invoice_add_message;
//! use rust_decimal_macros::dec;
//!
//! let config = Config::default();
//! let order = DocumentSource::from_json_str(r#"{
//!     "id": 1001,
//!     "date": "2024-05-14",
//!     "billing_address": {"first_name": "Jan", "last_name": "Jansen", "country_code": "NL"},
//!     "lines": [{"name": "Koffie", "quantity": 2, "unit_price": "4.50", "vat_amount": "0.41"}]
//! }"#).unwrap();
//!
//! let (mut invoice, _) = Collector::new(&config).collect(&order, &NoHooks).unwrap();
//! let result = Completor::new(&config, &VatRateTable::dutch_defaults()).complete(&mut invoice);
//! assert!(!result.has_error());
//! assert_eq!(invoice.lines[0].vat_rate, Some(dec!(9)));
//!
//! let message = invoice_add_message(&invoice, false);
//! assert_eq!(message["customer"]["invoice"]["line"][0]["vatrate"], "9.00");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `http` (default) | [`web::ReqwestTransport`], a `reqwest` based transport |

pub mod collect;
pub mod complete;
pub mod config;
pub mod core;
pub mod pipeline;
pub mod result;
pub mod web;

pub use crate::core::AcumulusError;
pub use crate::pipeline::{Acumulus, SendOutcome};
pub use crate::result::AcumulusResult;
