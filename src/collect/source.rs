//! The seam between a shop and the collector.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use crate::core::{
    AcumulusError, Currency, Customer, Invoice, Line, LineType, PaymentStatus, SourceType, Totals,
    VatType,
};

use super::convert::{to_bool, to_code, to_date, to_decimal, to_text};
use super::token::Variables;

/// Amounts of a shop line as the shop knows them. Any combination may be
/// present; the collector derives the VAT information from what is there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAmounts {
    /// Unit price excluding VAT.
    pub unit_price: Option<Decimal>,
    /// Unit price including VAT.
    pub unit_price_inc: Option<Decimal>,
    /// VAT amount per unit.
    pub vat_amount: Option<Decimal>,
    /// VAT rate as stored with the line, when the shop stores it.
    pub vat_rate: Option<Decimal>,
    /// Precision of the unit price(s).
    pub precision: Decimal,
    /// Precision of the VAT amount.
    pub precision_vat: Decimal,
}

impl Default for SourceAmounts {
    fn default() -> Self {
        Self {
            unit_price: None,
            unit_price_inc: None,
            vat_amount: None,
            vat_rate: None,
            precision: dec!(0.01),
            precision_vat: dec!(0.01),
        }
    }
}

impl SourceAmounts {
    pub fn negated(&self) -> Self {
        Self {
            unit_price: self.unit_price.map(|v| -v),
            unit_price_inc: self.unit_price_inc.map(|v| -v),
            vat_amount: self.vat_amount.map(|v| -v),
            ..self.clone()
        }
    }
}

/// One line of a shop order, before collection.
#[derive(Debug, Clone)]
pub struct SourceLine {
    pub line_type: LineType,
    /// Raw shop data of the line, exposed to field mappings as `item`.
    pub item: Value,
    /// `None` means 1.
    pub quantity: Option<Decimal>,
    pub amounts: SourceAmounts,
    /// Rate of the product's VAT class as configured in the shop today.
    pub lookup_vat_rate: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub children: Vec<SourceLine>,
}

impl SourceLine {
    pub fn new(line_type: LineType, item: Value) -> Self {
        Self {
            line_type,
            item,
            quantity: None,
            amounts: SourceAmounts::default(),
            lookup_vat_rate: None,
            cost_price: None,
            children: Vec::new(),
        }
    }
}

/// A shop order or credit note, as seen by the collector.
///
/// Only the identification, the field-mapping variables and the item lines
/// are required; everything else has a neutral default that a shop wrapper
/// overrides when it knows better.
pub trait InvoiceSource {
    fn source_type(&self) -> SourceType;

    /// Internal id of the order or credit note.
    fn id(&self) -> String;

    /// Reference shown to customers (order number).
    fn reference(&self) -> String;

    /// Variables that field mappings are evaluated against.
    fn variables(&self) -> Variables<'_>;

    fn item_lines(&self) -> Vec<SourceLine>;

    fn date(&self) -> Option<NaiveDate> {
        None
    }

    /// Number of the shop's own invoice for this order, if it has one.
    fn invoice_reference(&self) -> Option<String> {
        None
    }

    fn invoice_date(&self) -> Option<NaiveDate> {
        None
    }

    fn status(&self) -> Option<String> {
        None
    }

    fn payment_method(&self) -> Option<String> {
        None
    }

    fn payment_status(&self) -> Option<PaymentStatus> {
        None
    }

    fn payment_date(&self) -> Option<NaiveDate> {
        None
    }

    /// Country of the customer, used when the mapped address has none.
    fn country_code(&self) -> Option<String> {
        None
    }

    fn currency(&self) -> Currency {
        Currency::default()
    }

    /// Totals as stored by the shop.
    fn totals(&self) -> Option<Totals> {
        None
    }

    /// VAT type when the shop records it explicitly.
    fn vat_type(&self) -> Option<VatType> {
        None
    }

    fn shipping_lines(&self) -> Vec<SourceLine> {
        Vec::new()
    }

    fn fee_lines(&self) -> Vec<SourceLine> {
        Vec::new()
    }

    fn discount_lines(&self) -> Vec<SourceLine> {
        Vec::new()
    }

    fn manual_lines(&self) -> Vec<SourceLine> {
        Vec::new()
    }

    /// Whether credit note amounts are already negative. Most shops store
    /// refunds as positive amounts.
    fn amounts_signed(&self) -> bool {
        self.source_type() == SourceType::Order
    }
}

/// Shop specific corrections applied after each collect step.
pub trait CollectHooks {
    fn after_customer(&self, _customer: &mut Customer, _source: &dyn InvoiceSource) {}

    fn after_line(&self, _line: &mut Line, _source_line: &SourceLine) {}

    fn after_invoice(&self, _invoice: &mut Invoice, _source: &dyn InvoiceSource) {}
}

/// Hooks that change nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl CollectHooks for NoHooks {}

/// Generic invoice source backed by a JSON order document.
///
/// The document is exposed to field mappings as `source`; its `customer`,
/// `billing_address` and `shipping_address` objects also as variables of
/// their own.
///
/// ```
/// use acumulus::collect::{DocumentSource, InvoiceSource};
/// use acumulus::core::SourceType;
///
/// let source = DocumentSource::from_json_str(r#"{
///     "type": "credit_note",
///     "id": 12,
///     "reference": "CN-12",
///     "lines": [{"name": "Thee", "quantity": 2, "unit_price": "4.13", "vat_rate": 9}]
/// }"#).unwrap();
/// assert_eq!(source.source_type(), SourceType::CreditNote);
/// assert_eq!(source.item_lines()[0].quantity.unwrap().to_string(), "2");
/// ```
#[derive(Debug, Clone)]
pub struct DocumentSource {
    document: Value,
    source_type: SourceType,
}

const LINE_LISTS: [&str; 5] = ["lines", "shipping", "fees", "discounts", "manual"];
const ADDRESS_VARIABLES: [&str; 3] = ["customer", "billing_address", "shipping_address"];

impl DocumentSource {
    pub fn new(document: Value) -> Result<Self, AcumulusError> {
        if !document.is_object() {
            return Err(AcumulusError::Collect(
                "order document must be a JSON object".into(),
            ));
        }
        for key in LINE_LISTS {
            if document.get(key).is_some_and(|v| !v.is_array() && !v.is_null()) {
                return Err(AcumulusError::Collect(format!("'{key}' must be an array")));
            }
        }
        let source_type = match document.get("type").and_then(to_text).as_deref() {
            None | Some("order") => SourceType::Order,
            Some("credit_note") | Some("creditnote") | Some("refund") => SourceType::CreditNote,
            Some(other) => {
                return Err(AcumulusError::Collect(format!(
                    "unknown document type '{other}'"
                )));
            }
        };
        Ok(Self {
            document,
            source_type,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, AcumulusError> {
        Self::new(serde_json::from_str(json)?)
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    fn field(&self, key: &str) -> Option<&Value> {
        self.document.get(key)
    }

    fn lines(&self, key: &str, line_type: LineType) -> Vec<SourceLine> {
        self.field(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().map(|item| document_line(item, line_type)).collect())
            .unwrap_or_default()
    }
}

/// Read a line object: amounts, quantity and children from well-known keys,
/// the object itself as the `item` variable.
fn document_line(item: &Value, default_type: LineType) -> SourceLine {
    let decimal = |key: &str| item.get(key).and_then(to_decimal);
    let mut line = SourceLine::new(
        item.get("type")
            .and_then(to_text)
            .and_then(|t| line_type_from_str(&t))
            .unwrap_or(default_type),
        item.clone(),
    );
    line.quantity = decimal("quantity");
    line.amounts = SourceAmounts {
        unit_price: decimal("unit_price"),
        unit_price_inc: decimal("unit_price_inc"),
        vat_amount: decimal("vat_amount"),
        vat_rate: decimal("vat_rate"),
        precision: decimal("precision").unwrap_or(dec!(0.01)),
        precision_vat: decimal("precision_vat").unwrap_or(dec!(0.01)),
    };
    line.lookup_vat_rate = decimal("lookup_vat_rate");
    line.cost_price = decimal("cost_price");
    line.children = item
        .get("children")
        .and_then(Value::as_array)
        .map(|children| {
            children
                .iter()
                .map(|child| document_line(child, LineType::Item))
                .collect()
        })
        .unwrap_or_default();
    line
}

fn line_type_from_str(text: &str) -> Option<LineType> {
    Some(match text.trim().to_ascii_lowercase().as_str() {
        "item" | "product" => LineType::Item,
        "shipping" => LineType::Shipping,
        "payment" | "payment-fee" | "fee" => LineType::PaymentFee,
        "gift-wrapping" => LineType::GiftWrapping,
        "discount" => LineType::Discount,
        "voucher" => LineType::Voucher,
        "manual" => LineType::Manual,
        "other" => LineType::Other,
        _ => return None,
    })
}

impl InvoiceSource for DocumentSource {
    fn source_type(&self) -> SourceType {
        self.source_type
    }

    fn id(&self) -> String {
        self.field("id").and_then(to_text).unwrap_or_default()
    }

    fn reference(&self) -> String {
        self.field("reference")
            .and_then(to_text)
            .unwrap_or_else(|| self.id())
    }

    fn variables(&self) -> Variables<'_> {
        let mut vars = Variables::new().with("source", &self.document);
        for name in ADDRESS_VARIABLES {
            if let Some(value) = self.field(name).filter(|v| v.is_object()) {
                vars.push(name, value);
            }
        }
        vars
    }

    fn item_lines(&self) -> Vec<SourceLine> {
        self.lines("lines", LineType::Item)
    }

    fn date(&self) -> Option<NaiveDate> {
        self.field("date").and_then(to_date)
    }

    fn invoice_reference(&self) -> Option<String> {
        self.field("invoice_reference").and_then(to_text)
    }

    fn invoice_date(&self) -> Option<NaiveDate> {
        self.field("invoice_date").and_then(to_date)
    }

    fn status(&self) -> Option<String> {
        self.field("status").and_then(to_text)
    }

    fn payment_method(&self) -> Option<String> {
        self.field("payment_method").and_then(to_text)
    }

    fn payment_status(&self) -> Option<PaymentStatus> {
        let value = self.field("payment_status")?;
        match to_text(value)?.to_ascii_lowercase().as_str() {
            "paid" => Some(PaymentStatus::Paid),
            "due" | "open" | "pending" => Some(PaymentStatus::Due),
            _ => to_code(value).and_then(PaymentStatus::from_code),
        }
    }

    fn payment_date(&self) -> Option<NaiveDate> {
        self.field("payment_date").and_then(to_date)
    }

    fn country_code(&self) -> Option<String> {
        self.field("country_code")
            .or_else(|| self.field("billing_address")?.get("country_code"))
            .and_then(to_text)
    }

    fn currency(&self) -> Currency {
        match self.field("currency") {
            Some(Value::Object(currency)) => {
                let mut result = Currency::default();
                if let Some(code) = currency.get("code").and_then(to_text) {
                    result.code = code.to_ascii_uppercase();
                }
                if let Some(rate) = currency.get("rate").and_then(to_decimal) {
                    result.rate = rate;
                }
                result.do_convert = currency
                    .get("do_convert")
                    .and_then(to_bool)
                    .unwrap_or(false);
                result
            }
            Some(code) => Currency {
                code: to_text(code)
                    .map(|c| c.to_ascii_uppercase())
                    .unwrap_or_else(|| Currency::default().code),
                ..Currency::default()
            },
            None => Currency::default(),
        }
    }

    fn totals(&self) -> Option<Totals> {
        let totals = self.field("totals")?;
        let decimal = |key: &str| totals.get(key).and_then(to_decimal);
        Totals::from_parts(decimal("amount"), decimal("vat_amount"), decimal("amount_inc"))
    }

    fn vat_type(&self) -> Option<VatType> {
        self.field("vat_type")
            .and_then(to_code)
            .and_then(VatType::from_code)
    }

    fn shipping_lines(&self) -> Vec<SourceLine> {
        self.lines("shipping", LineType::Shipping)
    }

    fn fee_lines(&self) -> Vec<SourceLine> {
        self.lines("fees", LineType::PaymentFee)
    }

    fn discount_lines(&self) -> Vec<SourceLine> {
        self.lines("discounts", LineType::Discount)
    }

    fn manual_lines(&self) -> Vec<SourceLine> {
        self.lines("manual", LineType::Manual)
    }

    fn amounts_signed(&self) -> bool {
        self.field("amounts_signed")
            .and_then(to_bool)
            .unwrap_or(self.source_type == SourceType::Order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_non_objects_and_bad_lists() {
        assert!(DocumentSource::new(json!([])).is_err());
        assert!(DocumentSource::new(json!({"lines": {}})).is_err());
        assert!(DocumentSource::new(json!({"type": "quote"})).is_err());
    }

    #[test]
    fn reads_lines_with_children() {
        let source = DocumentSource::new(json!({
            "id": "5",
            "lines": [{
                "name": "Bundle",
                "unit_price": 10,
                "vat_amount": "2.10",
                "children": [{"name": "Part", "quantity": 2}]
            }],
            "shipping": [{"name": "Verzending", "unit_price_inc": "4.95", "type": "shipping"}]
        }))
        .unwrap();
        let lines = source.item_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].amounts.vat_amount, Some(dec!(2.10)));
        assert_eq!(lines[0].children[0].quantity, Some(dec!(2)));
        assert_eq!(source.shipping_lines()[0].line_type, LineType::Shipping);
        assert_eq!(source.reference(), "5");
    }

    #[test]
    fn currency_as_code_or_object() {
        let source = DocumentSource::new(json!({"currency": "usd"})).unwrap();
        assert_eq!(source.currency().code, "USD");
        let source = DocumentSource::new(
            json!({"currency": {"code": "GBP", "rate": "0.85", "do_convert": 1}}),
        )
        .unwrap();
        let currency = source.currency();
        assert_eq!(currency.rate, dec!(0.85));
        assert!(currency.do_convert);
    }

    #[test]
    fn payment_status_words_and_codes() {
        let paid = DocumentSource::new(json!({"payment_status": "Paid"})).unwrap();
        assert_eq!(paid.payment_status(), Some(PaymentStatus::Paid));
        let due = DocumentSource::new(json!({"payment_status": 1})).unwrap();
        assert_eq!(due.payment_status(), Some(PaymentStatus::Due));
    }

    #[test]
    fn credit_notes_are_unsigned_by_default() {
        let source = DocumentSource::new(json!({"type": "refund"})).unwrap();
        assert!(!source.amounts_signed());
        let source =
            DocumentSource::new(json!({"type": "refund", "amounts_signed": true})).unwrap();
        assert!(source.amounts_signed());
    }

    #[test]
    fn variables_expose_address_objects() {
        let source = DocumentSource::new(json!({
            "billing_address": {"city": "Utrecht"},
            "customer": "not an object"
        }))
        .unwrap();
        let vars = source.variables();
        assert_eq!(
            vars.names().collect::<Vec<_>>(),
            vec!["source", "billing_address"]
        );
    }
}
