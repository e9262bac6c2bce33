use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::core::{AddressRole, CustomerType};

/// Default Acumulus API location.
pub const DEFAULT_BASE_URI: &str = "https://api.sielsystems.nl/acumulus";

/// Encoding of a request or response body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    #[default]
    Xml,
    Json,
}

impl WireFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xml => "xml",
            Self::Json => "json",
        }
    }
}

/// Where and how to reach the web service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    pub base_uri: String,
    pub api_version: String,
    /// Language of the messages returned by Acumulus.
    pub lang: String,
    pub request_format: WireFormat,
    pub response_format: WireFormat,
    /// Acumulus validates but does not store invoices in test mode.
    pub test_mode: bool,
    pub timeout_secs: u64,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            base_uri: DEFAULT_BASE_URI.to_string(),
            api_version: "stable".to_string(),
            lang: "nl".to_string(),
            request_format: WireFormat::Xml,
            response_format: WireFormat::Json,
            test_mode: false,
            timeout_secs: 20,
        }
    }
}

/// Acumulus account credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Contract {
    pub contract_code: String,
    pub user_name: String,
    pub password: String,
    pub email_on_error: Option<String>,
    pub email_on_warning: Option<String>,
}

/// Identification of the shop software, sent with every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Connector {
    pub application: String,
    pub webkit: String,
    pub development: String,
    pub remark: Option<String>,
    pub source_uri: Option<String>,
}

impl Default for Connector {
    fn default() -> Self {
        Self {
            application: "Unknown shop".to_string(),
            webkit: format!("Acumulus Rust library {}", env!("CARGO_PKG_VERSION")),
            development: String::new(),
            remark: None,
            source_uri: None,
        }
    }
}

/// Whether invoices are created as concept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConceptSetting {
    /// Always definitive.
    Plain,
    /// Always concept.
    Concept,
    /// Definitive unless the completor found something to review.
    #[default]
    FromCompletor,
}

/// Source of the invoice number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberSource {
    /// Acumulus assigns the next number.
    #[default]
    Acumulus,
    /// The shop's invoice number, falling back to the order reference.
    ShopInvoice,
    /// The shop's order (or credit note) reference.
    ShopOrder,
}

/// Source of the invoice date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    #[default]
    OrderDate,
    /// The shop's invoice date, falling back to the order date.
    InvoiceDate,
    Today,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceSettings {
    pub concept: ConceptSetting,
    pub number_source: NumberSource,
    pub date_source: DateSource,
    pub default_cost_center: Option<String>,
    pub default_account_number: Option<String>,
    pub default_template: Option<String>,
    /// Template for invoices that are already paid.
    pub paid_template: Option<String>,
    /// Token expression for the invoice description.
    pub description: Option<String>,
    /// Add a correction line when the lines do not add up to the shop total.
    pub add_missing_amount_line: bool,
    /// Product text of that correction line.
    pub missing_amount_text: String,
    /// Drop shipping lines with a zero amount.
    pub remove_empty_shipping: bool,
    /// Maximum absolute difference between amounts considered equal.
    pub amount_tolerance: Decimal,
}

impl Default for InvoiceSettings {
    fn default() -> Self {
        Self {
            concept: ConceptSetting::default(),
            number_source: NumberSource::default(),
            date_source: DateSource::default(),
            default_cost_center: None,
            default_account_number: None,
            default_template: None,
            paid_template: None,
            description: None,
            add_missing_amount_line: true,
            missing_amount_text: "Correction".to_string(),
            remove_empty_shipping: false,
            amount_tolerance: dec!(0.02),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerSettings {
    /// Send customer data at all; when off, a generic "consumer" is booked.
    pub send_customer: bool,
    pub overwrite_if_exists: bool,
    pub default_customer_type: CustomerType,
    /// Email used when the customer has none (Acumulus requires one for
    /// email as pdf).
    pub email_if_absent: Option<String>,
    pub contact_status: bool,
    pub main_address: AddressRole,
}

impl Default for CustomerSettings {
    fn default() -> Self {
        Self {
            send_customer: true,
            overwrite_if_exists: true,
            default_customer_type: CustomerType::Debtor,
            email_if_absent: None,
            contact_status: true,
            main_address: AddressRole::Invoice,
        }
    }
}

/// Whether the shop sells second hand goods under the margin scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginProducts {
    #[default]
    No,
    Yes,
    Only,
}

/// What the shop sells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NatureShop {
    Products,
    Services,
    #[default]
    Both,
}

/// Tax profile of the shop; narrows the possible VAT types and rates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopSettings {
    /// Shop sells VAT free (vrijgesteld) products or services.
    pub vat_free_products: bool,
    /// Shop sells 0% products.
    pub zero_vat_products: bool,
    /// Shop charges foreign VAT to EU consumers (one-stop shop).
    pub foreign_vat: bool,
    pub margin_products: MarginProducts,
    pub nature_shop: NatureShop,
    /// Shop sells goods under the Dutch domestic reverse charge.
    pub reversed_national: bool,
}

/// How product options and bundle components end up on the invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsSettings {
    /// Up to this many unpriced children are merged into the parent line.
    pub all_on_1_line: usize,
    /// From this many unpriced children on, each gets a line of its own.
    pub all_on_own_line: usize,
    /// Maximum length of a merged product description.
    pub max_length: usize,
}

impl Default for OptionsSettings {
    fn default() -> Self {
        Self {
            all_on_1_line: 2,
            all_on_own_line: 4,
            max_length: 120,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailAsPdfSettings {
    pub send: bool,
    pub email_from: Option<String>,
    pub email_bcc: Option<String>,
    /// Token expression for the subject; defaults to the invoice description.
    pub subject: Option<String>,
    pub confirm_reading: bool,
    pub ubl: bool,
}
