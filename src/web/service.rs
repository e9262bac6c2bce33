//! Typed access to the Acumulus API calls the library needs.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::complete::{VatRateInfo, VatRateTable};
use crate::config::Config;
use crate::core::{AcumulusError, EmailAsPdf, Invoice, PaymentStatus, normalize_country_code};
use crate::result::{AcumulusResult, Message};

use super::communicator::ApiCommunicator;
use super::message::{email_value, invoice_add_message};
use super::response::{ResponseKey, extract};
use super::transport::Transport;

fn vat_info_unreadable(country: &str, error: &AcumulusError) -> Message {
    warn!(%country, %error, "VAT rate entry not understood");
    Message::warning(
        "vatinfo-response",
        format!("a VAT rate of {country} could not be read from the response: {error}"),
    )
}

/// Accepts `"123"` as well as `123`.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!("expected string or number, got {other}"))),
    }
}

fn lenient_option<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Some(lenient_string(deserializer)?).filter(|s| !s.is_empty()))
}

/// Answer of `invoice_add`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InvoiceAdded {
    #[serde(deserialize_with = "lenient_string")]
    pub invoicenumber: String,
    #[serde(deserialize_with = "lenient_string")]
    pub token: String,
    #[serde(deserialize_with = "lenient_string")]
    pub entryid: String,
}

/// One rate from `lookup_vatinfo`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VatInfo {
    #[serde(deserialize_with = "lenient_string")]
    pub vattype: String,
    pub vatrate: Decimal,
    #[serde(default, deserialize_with = "lenient_option")]
    pub countryregion: Option<String>,
}

/// Lists that can be requested with [`AcumulusService::picklist`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PicklistKind {
    ContactTypes,
    Accounts,
    CostCenters,
    InvoiceTemplates,
    VatTypes,
}

impl PicklistKind {
    /// Plural name, used in the path and as the list key.
    pub fn key(&self) -> &'static str {
        match self {
            Self::ContactTypes => "contacttypes",
            Self::Accounts => "accounts",
            Self::CostCenters => "costcenters",
            Self::InvoiceTemplates => "invoicetemplates",
            Self::VatTypes => "vattypes",
        }
    }

    /// Name of one list element.
    pub fn item(&self) -> &'static str {
        match self {
            Self::ContactTypes => "contacttype",
            Self::Accounts => "account",
            Self::CostCenters => "costcenter",
            Self::InvoiceTemplates => "invoicetemplate",
            Self::VatTypes => "vattype",
        }
    }
}

fn date_text(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// The Acumulus web service.
///
/// Every call returns the normalized result, with the main part of the
/// answer as its response (see [`AcumulusResult::response_as`]). Errors and
/// warnings reported by Acumulus are messages on that result; `Err` is
/// reserved for calls that did not produce an Acumulus answer at all.
pub struct AcumulusService<T> {
    communicator: ApiCommunicator<T>,
}

impl<T: Transport> AcumulusService<T> {
    pub fn new(config: Config, transport: T) -> Self {
        Self {
            communicator: ApiCommunicator::new(config, transport),
        }
    }

    pub fn config(&self) -> &Config {
        self.communicator.config()
    }

    pub fn transport(&self) -> &T {
        self.communicator.transport()
    }

    /// Full URI of an API path such as `invoices/invoice_add`.
    pub fn uri(&self, path: &str) -> String {
        let env = &self.config().environment;
        format!("{}/{}/{path}.php", env.base_uri.trim_end_matches('/'), env.api_version)
    }

    async fn call(
        &self,
        path: &str,
        message: Value,
        needs_contract: bool,
        key: ResponseKey,
    ) -> Result<AcumulusResult, AcumulusError> {
        let mut result = self.communicator.call_api(&self.uri(path), message, needs_contract).await?;
        extract(&mut result, key);
        Ok(result)
    }

    /// Send an invoice. Meta fields are included in test mode.
    pub async fn invoice_add(&self, invoice: &Invoice) -> Result<AcumulusResult, AcumulusError> {
        let include_meta = self.config().environment.test_mode;
        let message = invoice_add_message(invoice, include_meta);
        self.call("invoices/invoice_add", message, true, ResponseKey::Key("invoice"))
            .await
    }

    /// VAT rates of `country_code` on `date`, as a list of [`VatInfo`].
    pub async fn vat_info(&self, country_code: &str, date: NaiveDate) -> Result<AcumulusResult, AcumulusError> {
        let message = json!({
            "vatdate": date_text(date),
            "vatcountry": normalize_country_code(country_code),
        });
        self.call(
            "lookups/lookup_vatinfo",
            message,
            true,
            ResponseKey::List { key: "vatinfo", item: "vat" },
        )
        .await
    }

    pub async fn entry_info(&self, entry_id: &str) -> Result<AcumulusResult, AcumulusError> {
        self.call("entry/entry_info", json!({ "entryid": entry_id }), true, ResponseKey::Key("entry"))
            .await
    }

    /// Move an entry to or from the trash bin.
    pub async fn set_delete_status(&self, entry_id: &str, deleted: bool) -> Result<AcumulusResult, AcumulusError> {
        let message = json!({
            "entryid": entry_id,
            "entrydeletestatus": u8::from(deleted),
        });
        self.call("entry/entry_deletestatus_set", message, true, ResponseKey::Key("entry"))
            .await
    }

    pub async fn payment_status(&self, token: &str) -> Result<AcumulusResult, AcumulusError> {
        self.call("entry/entry_paymentstatus_get", json!({ "token": token }), true, ResponseKey::Key("entry"))
            .await
    }

    /// Set the payment status of an invoice. Without a date Acumulus uses
    /// today.
    pub async fn set_payment_status(
        &self,
        token: &str,
        status: PaymentStatus,
        date: Option<NaiveDate>,
    ) -> Result<AcumulusResult, AcumulusError> {
        let mut message = json!({
            "token": token,
            "paymentstatus": status.code(),
        });
        if let Some(date) = date {
            message["paymentdate"] = json!(date_text(date));
        }
        self.call("entry/entry_paymentstatus_set", message, true, ResponseKey::Key("entry"))
            .await
    }

    /// Mail an existing invoice as PDF.
    pub async fn email_as_pdf(
        &self,
        token: &str,
        email: &EmailAsPdf,
        invoice_notes: Option<&str>,
    ) -> Result<AcumulusResult, AcumulusError> {
        let mut message = json!({
            "token": token,
            "emailaspdf": email_value(email),
        });
        if let Some(notes) = invoice_notes.filter(|n| !n.trim().is_empty()) {
            message["invoicenotes"] = json!(notes);
        }
        self.call("invoices/invoice_mail", message, true, ResponseKey::Key("invoice"))
            .await
    }

    pub async fn picklist(&self, kind: PicklistKind) -> Result<AcumulusResult, AcumulusError> {
        let path = format!("picklists/picklist_{}", kind.key());
        self.call(
            &path,
            json!({}),
            true,
            ResponseKey::List {
                key: kind.key(),
                item: kind.item(),
            },
        )
        .await
    }

    /// Information about the contract and the user the credentials belong to.
    pub async fn about(&self) -> Result<AcumulusResult, AcumulusError> {
        self.call("general/general_about", json!({}), true, ResponseKey::Key("general"))
            .await
    }

    /// EU e-commerce threshold report for `year`, or the current year.
    pub async fn report_threshold_eu_ecommerce(&self, year: Option<i32>) -> Result<AcumulusResult, AcumulusError> {
        let message = year.map_or_else(|| json!({}), |year| json!({ "year": year }));
        self.call("reports/report_threshold_eu_ecommerce", message, true, ResponseKey::Whole)
            .await
    }

    /// Link to the PDF of an invoice. Nothing is called.
    pub fn invoice_pdf_uri(&self, token: &str) -> String {
        format!("{}?token={token}", self.uri("invoices/invoice_get_pdf"))
    }

    /// Link to the packing slip of an invoice. Nothing is called.
    pub fn packing_slip_uri(&self, token: &str) -> String {
        format!("{}?token={token}", self.uri("delivery/packing_slip_get_pdf"))
    }

    /// Look up the VAT rates of `countries` on `date` and collect them in a
    /// table for the completor.
    ///
    /// A failing lookup does not stop the others; its problem is added to
    /// the returned result.
    pub async fn fetch_vat_rates(&self, countries: &[&str], date: NaiveDate) -> (VatRateTable, AcumulusResult) {
        let mut table = VatRateTable::new();
        let mut result = AcumulusResult::new();
        let mut seen: Vec<String> = Vec::new();
        for &country in countries {
            let code = normalize_country_code(country);
            if seen.contains(&code) {
                continue;
            }
            seen.push(code.clone());
            match self.vat_info(&code, date).await {
                Ok(lookup) => {
                    result.add_messages(lookup.messages().iter().cloned());
                    if lookup.response().is_none() {
                        continue;
                    }
                    let entries = lookup.response_as::<Vec<Value>>().unwrap_or_else(|e| {
                        result.add_message(vat_info_unreadable(&code, &e));
                        Vec::new()
                    });
                    let mut rates = 0;
                    for entry in entries {
                        match serde_json::from_value::<VatInfo>(entry) {
                            Ok(info) => {
                                table.insert(VatRateInfo::new(&code, info.vatrate).kind(info.vattype));
                                rates += 1;
                            }
                            Err(e) => {
                                result.add_message(vat_info_unreadable(&code, &e.into()));
                            }
                        }
                    }
                    debug!(country = %code, rates, "VAT rates looked up");
                }
                Err(e) => {
                    warn!(country = %code, error = %e, "VAT rate lookup failed");
                    result.add_exception(&e);
                }
            }
        }
        (table, result)
    }
}
