//! Communication with the Acumulus web API.
//!
//! Requests are the message of a call merged into a common envelope
//! (format, test mode, contract, connector), encoded as XML or JSON and
//! posted as the `xmlstring` form field. Responses are decoded, normalized
//! and turned into an [`AcumulusResult`](crate::result::AcumulusResult).
//!
//! The HTTP layer sits behind the [`Transport`] trait. With the `http`
//! feature [`ReqwestTransport`] implements it; tests and alternative stacks
//! bring their own.

mod communicator;
mod envelope;
mod message;
pub mod response;
mod service;
mod transport;
pub mod xml;

pub use communicator::{ApiCommunicator, decode};
pub use envelope::{PASSWORD_MASK, build_request, envelope, masked};
pub use message::invoice_add_message;
pub use response::{ResponseKey, extract, normalize};
pub use service::{AcumulusService, InvoiceAdded, PicklistKind, VatInfo};
pub use transport::{HttpResponse, Transport};
#[cfg(feature = "http")]
pub use transport::ReqwestTransport;
