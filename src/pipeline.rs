//! Collect, complete and send in one go.

use chrono::{NaiveDate, Utc};
use tracing::{Instrument, info, info_span, warn};

use crate::collect::{CollectHooks, Collector, InvoiceSource};
use crate::complete::{Completor, VatRateTable};
use crate::config::Config;
use crate::core::{AcumulusError, HOME_COUNTRY, Invoice};
use crate::result::{AcumulusResult, Message, Severity};
use crate::web::{AcumulusService, Transport};

/// Invoice as it was (or would have been) sent, with everything that was
/// reported along the way.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub invoice: Invoice,
    pub result: AcumulusResult,
}

/// One shop's connection to Acumulus.
///
/// ```no_run
/// # #[cfg(feature = "http")]
/// # async fn run() -> Result<(), acumulus::core::AcumulusError> {
/// use acumulus::collect::{DocumentSource, NoHooks};
/// use acumulus::config::Config;
/// use acumulus::pipeline::Acumulus;
/// use acumulus::web::ReqwestTransport;
///
/// let config = Config::from_file("acumulus.json")?.with_env_overrides();
/// let transport = ReqwestTransport::from_environment(&config.environment)?;
/// let acumulus = Acumulus::new(config, transport);
///
/// let order = DocumentSource::from_json_str(r#"{"id": "1001", "lines": []}"#)?;
/// let outcome = acumulus.send_invoice(&order, &NoHooks).await?;
/// println!("{}", outcome.result.format_messages());
/// # Ok(())
/// # }
/// ```
pub struct Acumulus<T> {
    service: AcumulusService<T>,
    today: Option<NaiveDate>,
}

impl<T: Transport> Acumulus<T> {
    pub fn new(config: Config, transport: T) -> Self {
        Self {
            service: AcumulusService::new(config, transport),
            today: None,
        }
    }

    /// Fix the date used for undated invoices.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn config(&self) -> &Config {
        self.service.config()
    }

    pub fn service(&self) -> &AcumulusService<T> {
        &self.service
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// VAT rates for the home country and `country`, looked up at Acumulus.
    ///
    /// Lookup problems are reported as warnings: they never stop the
    /// invoice from being sent. Without home country rates the built-in
    /// Dutch rates are used.
    async fn vat_rates(&self, country: Option<&str>, date: NaiveDate, result: &mut AcumulusResult) -> VatRateTable {
        let mut countries = vec![HOME_COUNTRY];
        countries.extend(country);
        let (mut table, lookup) = self.service.fetch_vat_rates(&countries, date).await;
        if lookup.has_error() {
            warn!(error = %lookup.format_messages(), "VAT rate lookup failed");
        }
        result.add_messages(lookup.messages().iter().cloned().map(|mut message| {
            message.severity = message.severity.min(Severity::Warning);
            message
        }));
        if !table.has_country(HOME_COUNTRY) {
            result.add_message(Message::warning(
                "vatinfo-failed",
                "VAT rates could not be looked up, built-in Dutch rates used",
            ));
            table.merge(VatRateTable::dutch_defaults());
        }
        table
    }

    /// Collect and complete the invoice for `source` without sending it.
    ///
    /// # Errors
    ///
    /// As [`Collector::collect`].
    pub async fn prepare_invoice(
        &self,
        source: &dyn InvoiceSource,
        hooks: &dyn CollectHooks,
    ) -> Result<SendOutcome, AcumulusError> {
        let config = self.config();
        let today = self.today();
        let (mut invoice, mut result) = Collector::new(config).collect(source, hooks)?;

        let date = invoice.issue_date.unwrap_or(today);
        let country = invoice.customer.country_code().map(str::to_string);
        let rates = self.vat_rates(country.as_deref(), date, &mut result).await;

        let completed = Completor::new(config, &rates).with_today(today).complete(&mut invoice);
        result.merge(completed);
        Ok(SendOutcome { invoice, result })
    }

    /// Collect, complete and send the invoice for `source`.
    ///
    /// The invoice is not sent when collecting or completing produced an
    /// error or when it has no lines; the outcome then has `is_sent()`
    /// false. Transport failures are reported as an exception message.
    ///
    /// # Errors
    ///
    /// As [`Collector::collect`].
    pub async fn send_invoice(
        &self,
        source: &dyn InvoiceSource,
        hooks: &dyn CollectHooks,
    ) -> Result<SendOutcome, AcumulusError> {
        let reference = source.reference();
        let span = info_span!("send_invoice", %reference);
        async {
            let SendOutcome { invoice, mut result } = self.prepare_invoice(source, hooks).await?;

            if let Err(e) = self.config().validate() {
                result.add_exception(&e);
            }
            if invoice.lines.is_empty() {
                result.add_message(Message::notice("invoice-empty", "invoice has no lines and is not sent"));
            } else if !result.has_error() {
                match self.service.invoice_add(&invoice).await {
                    Ok(remote) => {
                        result.merge(remote);
                    }
                    Err(e) => {
                        warn!(error = %e, "sending invoice failed");
                        result.add_exception(&e);
                    }
                }
            }

            info!(
                %reference,
                sent = result.is_sent(),
                status = result.status().label(),
                "invoice processed"
            );
            Ok(SendOutcome { invoice, result })
        }
        .instrument(span)
        .await
    }
}
