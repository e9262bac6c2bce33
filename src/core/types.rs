use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::vat_range::VatRange;

/// Acumulus `vatrate` value for "VAT free" (vrijgesteld van btw).
pub const VAT_RATE_FREE: Decimal = Decimal::NEGATIVE_ONE;

/// The invoice as it will be sent to Acumulus, plus metadata gathered on the
/// way.
///
/// On the wire the invoice is nested inside the customer
/// (`<customer>…<invoice>…</invoice></customer>`); here it is the other way
/// around because the invoice is the unit of work.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Invoice {
    pub customer: Customer,
    /// `concept`: create as concept (draft) instead of a definitive entry.
    pub concept: Option<bool>,
    /// `number`: explicit invoice number, `None` lets Acumulus number it.
    pub number: Option<String>,
    /// `vattype`.
    pub vat_type: Option<VatType>,
    /// `issuedate`.
    pub issue_date: Option<NaiveDate>,
    /// `costcenter`.
    pub cost_center: Option<String>,
    /// `accountnumber`.
    pub account_number: Option<String>,
    /// `paymentstatus`.
    pub payment_status: Option<PaymentStatus>,
    /// `paymentdate`.
    pub payment_date: Option<NaiveDate>,
    /// `description`.
    pub description: Option<String>,
    /// `descriptiontext`: multi-line extended description.
    pub description_text: Option<String>,
    /// `template`.
    pub template: Option<String>,
    /// `invoicenotes`.
    pub invoice_notes: Option<String>,
    /// `line`.
    pub lines: Vec<Line>,
    /// `emailaspdf`.
    pub email_as_pdf: Option<EmailAsPdf>,
    pub meta: InvoiceMeta,
}

/// Invoice metadata: never required by Acumulus, sent as `meta-*` fields in
/// test mode only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceMeta {
    pub source_type: SourceType,
    pub source_id: Option<String>,
    pub source_reference: Option<String>,
    pub payment_method: Option<String>,
    /// Totals as reported by the shop.
    pub totals: Option<Totals>,
    /// Totals as computed from the completed lines.
    pub calculated_totals: Option<Totals>,
    pub currency: Currency,
    /// VAT types still possible after customer and shop analysis.
    pub possible_vat_types: Vec<VatType>,
    /// Set when a completor pass decided the invoice needs manual review.
    pub made_concept: bool,
}

/// Invoice totals: amount excluding VAT, VAT amount, amount including VAT.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub amount: Decimal,
    pub vat_amount: Decimal,
    pub amount_inc: Decimal,
}

impl Totals {
    /// Build totals from any two of the three amounts. `None` when fewer
    /// than two are known or the third does not fit in a [`Decimal`].
    pub fn from_parts(
        amount: Option<Decimal>,
        vat_amount: Option<Decimal>,
        amount_inc: Option<Decimal>,
    ) -> Option<Self> {
        match (amount, vat_amount, amount_inc) {
            (Some(amount), Some(vat_amount), Some(amount_inc)) => Some(Self {
                amount,
                vat_amount,
                amount_inc,
            }),
            (Some(amount), Some(vat_amount), None) => Some(Self {
                amount,
                vat_amount,
                amount_inc: amount.checked_add(vat_amount)?,
            }),
            (Some(amount), None, Some(amount_inc)) => Some(Self {
                amount,
                vat_amount: amount_inc.checked_sub(amount)?,
                amount_inc,
            }),
            (None, Some(vat_amount), Some(amount_inc)) => Some(Self {
                amount: amount_inc.checked_sub(vat_amount)?,
                vat_amount,
                amount_inc,
            }),
            _ => None,
        }
    }

    /// Whether all three amounts lie within [`MAX_AMOUNT`](crate::core::MAX_AMOUNT).
    pub fn in_range(&self) -> bool {
        [self.amount, self.vat_amount, self.amount_inc]
            .into_iter()
            .all(super::rounding::amount_in_range)
    }

    pub fn negated(self) -> Self {
        Self {
            amount: -self.amount,
            vat_amount: -self.vat_amount,
            amount_inc: -self.amount_inc,
        }
    }
}

/// Currency of the shop order. Acumulus books in euro only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// ISO 4217 code.
    pub code: String,
    /// Units of `code` per euro.
    pub rate: Decimal,
    /// Whether amounts are still in `code` and must be converted.
    pub do_convert: bool,
}

impl Default for Currency {
    fn default() -> Self {
        Self {
            code: "EUR".to_string(),
            rate: Decimal::ONE,
            do_convert: false,
        }
    }
}

/// Kind of shop document the invoice was created from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    #[default]
    Order,
    CreditNote,
}

impl SourceType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Order => "Order",
            Self::CreditNote => "Credit note",
        }
    }
}

/// Customer (contact) data, including both addresses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Customer {
    /// `type`.
    pub customer_type: Option<CustomerType>,
    /// `vattypeid`.
    pub vat_type_id: Option<VatTypeId>,
    /// `contactyourid`: the shop's customer id.
    pub contact_your_id: Option<String>,
    /// `contactstatus`: active (true) or disabled.
    pub contact_status: Option<bool>,
    /// `website`.
    pub website: Option<String>,
    /// `vatnumber`.
    pub vat_number: Option<String>,
    /// `telephone`.
    pub telephone: Option<String>,
    /// `telephone2`.
    pub telephone2: Option<String>,
    /// `fax`.
    pub fax: Option<String>,
    /// `email`.
    pub email: Option<String>,
    /// `overwriteifexists`.
    pub overwrite_if_exists: Option<bool>,
    /// `bankaccountnumber`.
    pub bank_account_number: Option<String>,
    /// `mark`.
    pub mark: Option<String>,
    /// `disableduplicates`.
    pub disable_duplicates: Option<bool>,
    pub invoice_address: Address,
    pub shipping_address: Address,
    /// Which address goes into the main fields; the other one becomes the
    /// `alt*` fields.
    pub main_address: AddressRole,
}

impl Customer {
    /// The address that is sent in the main (non-`alt`) fields and that
    /// determines the VAT treatment.
    pub fn main(&self) -> &Address {
        match self.main_address {
            AddressRole::Invoice => &self.invoice_address,
            AddressRole::Shipping => &self.shipping_address,
        }
    }

    pub fn main_mut(&mut self) -> &mut Address {
        match self.main_address {
            AddressRole::Invoice => &mut self.invoice_address,
            AddressRole::Shipping => &mut self.shipping_address,
        }
    }

    pub fn alt(&self) -> &Address {
        match self.main_address {
            AddressRole::Invoice => &self.shipping_address,
            AddressRole::Shipping => &self.invoice_address,
        }
    }

    /// Country code of the main address, if any.
    pub fn country_code(&self) -> Option<&str> {
        self.main().country_code.as_deref()
    }

    /// A business customer is one with a company name and a VAT number.
    pub fn is_business(&self) -> bool {
        match self.vat_type_id {
            Some(id) => id == VatTypeId::Business,
            None => {
                self.main().company_name1.as_deref().is_some_and(|s| !s.is_empty())
                    && self.vat_number.as_deref().is_some_and(|s| !s.is_empty())
            }
        }
    }
}

/// Postal address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// `companyname1`.
    pub company_name1: Option<String>,
    /// `companyname2`.
    pub company_name2: Option<String>,
    /// `fullname`.
    pub full_name: Option<String>,
    /// `salutation`.
    pub salutation: Option<String>,
    /// `address1`.
    pub address1: Option<String>,
    /// `address2`.
    pub address2: Option<String>,
    /// `postalcode`.
    pub postal_code: Option<String>,
    /// `city`.
    pub city: Option<String>,
    /// `countrycode` (ISO 3166-1 alpha-2).
    pub country_code: Option<String>,
    /// `country`: country name, printed on the invoice for foreign addresses.
    pub country: Option<String>,
}

impl Address {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Which of the two customer addresses is leading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressRole {
    #[default]
    Invoice,
    Shipping,
}

/// Invoice line. Children (bundle components, product options) are nested
/// until the completor flattens them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Line {
    /// `itemnumber`.
    pub item_number: Option<String>,
    /// `product`.
    pub product: Option<String>,
    /// `nature`.
    pub nature: Option<Nature>,
    /// `unitprice`: per unit, excluding VAT.
    pub unit_price: Option<Decimal>,
    /// `vatrate`: percentage, or -1 for VAT free.
    pub vat_rate: Option<Decimal>,
    /// `quantity`.
    pub quantity: Decimal,
    /// `costprice`: purchase price, margin scheme only.
    pub cost_price: Option<Decimal>,
    pub meta: LineMeta,
    pub children: Vec<Line>,
}

impl Line {
    /// Line total excluding VAT.
    pub fn line_amount(&self) -> Decimal {
        self.unit_price.unwrap_or_default() * self.quantity
    }

    /// Line VAT amount according to the (completed) VAT rate.
    pub fn line_vat_amount(&self) -> Decimal {
        match self.vat_rate {
            Some(rate) if rate > Decimal::ZERO => self.line_amount() * rate / Decimal::ONE_HUNDRED,
            _ => Decimal::ZERO,
        }
    }

    /// Line total including VAT.
    pub fn line_amount_inc(&self) -> Decimal {
        self.line_amount() + self.line_vat_amount()
    }

    /// Whether this line carries no monetary amount.
    pub fn is_zero_price(&self) -> bool {
        self.unit_price.unwrap_or_default().is_zero()
            && self.meta.unit_price_inc.unwrap_or_default().is_zero()
    }

    /// Product name, empty if absent.
    pub fn product_name(&self) -> &str {
        self.product.as_deref().unwrap_or("")
    }
}

/// Line metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineMeta {
    pub line_type: LineType,
    /// Unit price including VAT, as reported by the shop.
    pub unit_price_inc: Option<Decimal>,
    /// VAT amount per unit, as reported by the shop.
    pub vat_amount: Option<Decimal>,
    pub vat_range: Option<VatRange>,
    pub vat_rate_source: VatRateSource,
    /// Rate of the product's VAT class as currently configured in the shop.
    pub lookup_vat_rate: Option<Decimal>,
    /// Position of the parent line after flattening.
    pub parent_index: Option<usize>,
    /// Number of child lines that followed this line before flattening.
    pub children_count: Option<usize>,
    /// Set on lines produced by splitting a strategy line.
    pub strategy_split: bool,
    /// Set when the unit price was zeroed or recomputed by the completor.
    pub recalculated_price: bool,
}

/// Kind of invoice line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineType {
    #[default]
    Item,
    Shipping,
    PaymentFee,
    GiftWrapping,
    Discount,
    Voucher,
    Manual,
    Corrector,
    Other,
}

impl LineType {
    /// Value of the `meta-line-type` field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Item => "product",
            Self::Shipping => "shipping",
            Self::PaymentFee => "payment",
            Self::GiftWrapping => "gift-wrapping",
            Self::Discount => "discount",
            Self::Voucher => "voucher",
            Self::Manual => "manual",
            Self::Corrector => "corrector",
            Self::Other => "other",
        }
    }

    /// Lines of these types are services rather than goods.
    pub fn is_service(&self) -> bool {
        matches!(self, Self::Shipping | Self::PaymentFee | Self::GiftWrapping)
    }
}

/// Where the VAT rate of a line came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VatRateSource {
    /// Not yet known.
    #[default]
    Unknown,
    /// Taken as-is from the shop.
    Exact,
    /// Computed from amounts, still to be matched against real rates.
    Calculated,
    /// Single real rate within the calculated range.
    CompletorRange,
    /// Multiple rates in range, the looked up rate decided.
    CompletorRangeLookup,
    /// No rate in range, the looked up rate was used.
    CompletorLookup,
    /// Inherited from the parent line.
    Parent,
    /// Filled in by the completor (zero-price lines).
    Completor,
    /// To be determined by a split strategy.
    Strategy,
    /// Determined by a split strategy.
    StrategyCompleted,
    /// Rate of a line added to correct the invoice total.
    CorrectorRange,
}

impl VatRateSource {
    /// Value of the `meta-vatrate-source` field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Exact => "exact",
            Self::Calculated => "calculated",
            Self::CompletorRange => "completor-range",
            Self::CompletorRangeLookup => "completor-range-lookup",
            Self::CompletorLookup => "completor-lookup",
            Self::Parent => "parent",
            Self::Completor => "completor",
            Self::Strategy => "strategy",
            Self::StrategyCompleted => "strategy-completed",
            Self::CorrectorRange => "corrector-range",
        }
    }
}

/// `emailaspdf`: instructs Acumulus to mail the invoice to the customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAsPdf {
    /// `emailto`.
    pub email_to: Option<String>,
    /// `emailbcc`.
    pub email_bcc: Option<String>,
    /// `emailfrom`.
    pub email_from: Option<String>,
    /// `subject`.
    pub subject: Option<String>,
    /// `message`.
    pub message: Option<String>,
    /// `confirmreading`.
    pub confirm_reading: Option<bool>,
    /// `ubl`: attach the UBL XML as well.
    pub ubl: Option<bool>,
}

/// Acumulus `vattype`: the VAT regime of the whole invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VatType {
    /// 1: Dutch VAT.
    National,
    /// 2: Dutch VAT reverse charge (verlegd).
    NationalReversed,
    /// 3: EU reverse charge (intracommunautaire levering).
    EuReversed,
    /// 4: Export outside the EU.
    RestOfWorld,
    /// 5: Margin scheme (second hand goods).
    MarginScheme,
    /// 6: Foreign (EU) VAT, one-stop shop.
    ForeignVat,
}

impl VatType {
    pub const ALL: [VatType; 6] = [
        Self::National,
        Self::NationalReversed,
        Self::EuReversed,
        Self::RestOfWorld,
        Self::MarginScheme,
        Self::ForeignVat,
    ];

    pub fn code(&self) -> u8 {
        match self {
            Self::National => 1,
            Self::NationalReversed => 2,
            Self::EuReversed => 3,
            Self::RestOfWorld => 4,
            Self::MarginScheme => 5,
            Self::ForeignVat => 6,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::National),
            2 => Some(Self::NationalReversed),
            3 => Some(Self::EuReversed),
            4 => Some(Self::RestOfWorld),
            5 => Some(Self::MarginScheme),
            6 => Some(Self::ForeignVat),
            _ => None,
        }
    }
}

/// Acumulus `paymentstatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// 1: Due.
    Due,
    /// 2: Paid.
    Paid,
}

impl PaymentStatus {
    pub fn code(&self) -> u8 {
        match self {
            Self::Due => 1,
            Self::Paid => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Due),
            2 => Some(Self::Paid),
            _ => None,
        }
    }
}

/// Acumulus `nature` of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Nature {
    Product,
    Service,
}

impl Nature {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Product => "Product",
            Self::Service => "Service",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "product" => Some(Self::Product),
            "service" => Some(Self::Service),
            _ => None,
        }
    }
}

/// Acumulus customer `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerType {
    /// 1: Debtor.
    Debtor,
    /// 2: Creditor.
    Creditor,
    /// 3: Relation (both).
    Relation,
}

impl CustomerType {
    pub fn code(&self) -> u8 {
        match self {
            Self::Debtor => 1,
            Self::Creditor => 2,
            Self::Relation => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Debtor),
            2 => Some(Self::Creditor),
            3 => Some(Self::Relation),
            _ => None,
        }
    }
}

/// Acumulus `vattypeid`: private person or business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VatTypeId {
    /// 1: Private.
    Private,
    /// 2: Business.
    Business,
}

impl VatTypeId {
    pub fn code(&self) -> u8 {
        match self {
            Self::Private => 1,
            Self::Business => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Private),
            2 => Some(Self::Business),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn vat_type_codes_round_trip() {
        for vat_type in VatType::ALL {
            assert_eq!(VatType::from_code(vat_type.code()), Some(vat_type));
        }
        assert_eq!(VatType::from_code(0), None);
    }

    #[test]
    fn line_amounts() {
        let line = Line {
            unit_price: Some(dec!(10)),
            vat_rate: Some(dec!(21)),
            quantity: dec!(3),
            ..Default::default()
        };
        assert_eq!(line.line_amount(), dec!(30));
        assert_eq!(line.line_vat_amount(), dec!(6.30));
        assert_eq!(line.line_amount_inc(), dec!(36.30));
    }

    #[test]
    fn vat_free_line_has_no_vat() {
        let line = Line {
            unit_price: Some(dec!(10)),
            vat_rate: Some(VAT_RATE_FREE),
            quantity: dec!(1),
            ..Default::default()
        };
        assert_eq!(line.line_vat_amount(), Decimal::ZERO);
    }

    #[test]
    fn totals_from_two_parts() {
        let t = Totals::from_parts(None, Some(dec!(21)), Some(dec!(121))).unwrap();
        assert_eq!(t.amount, dec!(100));
        assert!(Totals::from_parts(Some(dec!(1)), None, None).is_none());
    }

    #[test]
    fn main_address_follows_role() {
        let mut customer = Customer::default();
        customer.invoice_address.city = Some("Utrecht".into());
        customer.shipping_address.city = Some("Gent".into());
        assert_eq!(customer.main().city.as_deref(), Some("Utrecht"));
        customer.main_address = AddressRole::Shipping;
        assert_eq!(customer.main().city.as_deref(), Some("Gent"));
        assert_eq!(customer.alt().city.as_deref(), Some("Utrecht"));
    }

    #[test]
    fn nature_parsing_is_lenient() {
        assert_eq!(Nature::from_code(" service "), Some(Nature::Service));
        assert_eq!(Nature::from_code("goods"), None);
    }
}
