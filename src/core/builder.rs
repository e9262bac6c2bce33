use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::types::*;
use super::vat_range::VatRange;

/// Builder for constructing invoices by hand (tests, manual entries, shops
/// without a collector).
///
/// ```
/// use acumulus::core::*;
/// use rust_decimal_macros::dec;
/// use chrono::NaiveDate;
///
/// let invoice = InvoiceBuilder::new()
///     .issue_date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
///     .customer(CustomerBuilder::new()
///         .email("jan@example.nl")
///         .invoice_address(AddressBuilder::new("NL").full_name("Jan Jansen").city("Utrecht").build())
///         .build())
///     .add_line(LineBuilder::new("Koffiebonen", dec!(2), dec!(7.50)).vat_rate(dec!(9)).build())
///     .build();
/// assert_eq!(invoice.lines[0].line_amount(), dec!(15.00));
/// ```
#[derive(Default)]
pub struct InvoiceBuilder {
    invoice: Invoice,
}

impl InvoiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn customer(mut self, customer: Customer) -> Self {
        self.invoice.customer = customer;
        self
    }

    pub fn concept(mut self, concept: bool) -> Self {
        self.invoice.concept = Some(concept);
        self
    }

    pub fn number(mut self, number: impl Into<String>) -> Self {
        self.invoice.number = Some(number.into());
        self
    }

    pub fn vat_type(mut self, vat_type: VatType) -> Self {
        self.invoice.vat_type = Some(vat_type);
        self
    }

    pub fn issue_date(mut self, date: NaiveDate) -> Self {
        self.invoice.issue_date = Some(date);
        self
    }

    pub fn cost_center(mut self, cost_center: impl Into<String>) -> Self {
        self.invoice.cost_center = Some(cost_center.into());
        self
    }

    pub fn account_number(mut self, account: impl Into<String>) -> Self {
        self.invoice.account_number = Some(account.into());
        self
    }

    pub fn paid(mut self, date: Option<NaiveDate>) -> Self {
        self.invoice.payment_status = Some(PaymentStatus::Paid);
        self.invoice.payment_date = date;
        self
    }

    pub fn due(mut self) -> Self {
        self.invoice.payment_status = Some(PaymentStatus::Due);
        self.invoice.payment_date = None;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.invoice.description = Some(description.into());
        self
    }

    pub fn description_text(mut self, text: impl Into<String>) -> Self {
        self.invoice.description_text = Some(text.into());
        self
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.invoice.template = Some(template.into());
        self
    }

    pub fn invoice_notes(mut self, notes: impl Into<String>) -> Self {
        self.invoice.invoice_notes = Some(notes.into());
        self
    }

    pub fn add_line(mut self, line: Line) -> Self {
        self.invoice.lines.push(line);
        self
    }

    pub fn email_as_pdf(mut self, email: EmailAsPdf) -> Self {
        self.invoice.email_as_pdf = Some(email);
        self
    }

    /// Source document this invoice is created for.
    pub fn source(mut self, source_type: SourceType, reference: impl Into<String>) -> Self {
        self.invoice.meta.source_type = source_type;
        self.invoice.meta.source_reference = Some(reference.into());
        self
    }

    /// Totals as reported by the shop; used to verify the completed lines.
    pub fn shop_totals(mut self, amount: Decimal, vat_amount: Decimal) -> Self {
        self.invoice.meta.totals = Some(Totals {
            amount,
            vat_amount,
            amount_inc: amount + vat_amount,
        });
        self
    }

    pub fn currency(mut self, code: impl Into<String>, rate: Decimal, do_convert: bool) -> Self {
        self.invoice.meta.currency = Currency {
            code: code.into(),
            rate,
            do_convert,
        };
        self
    }

    pub fn build(self) -> Invoice {
        self.invoice
    }
}

/// Builder for Customer.
#[derive(Default)]
pub struct CustomerBuilder {
    customer: Customer,
}

impl CustomerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn customer_type(mut self, customer_type: CustomerType) -> Self {
        self.customer.customer_type = Some(customer_type);
        self
    }

    pub fn vat_type_id(mut self, id: VatTypeId) -> Self {
        self.customer.vat_type_id = Some(id);
        self
    }

    pub fn contact_your_id(mut self, id: impl Into<String>) -> Self {
        self.customer.contact_your_id = Some(id.into());
        self
    }

    pub fn vat_number(mut self, vat_number: impl Into<String>) -> Self {
        self.customer.vat_number = Some(vat_number.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.customer.email = Some(email.into());
        self
    }

    pub fn telephone(mut self, telephone: impl Into<String>) -> Self {
        self.customer.telephone = Some(telephone.into());
        self
    }

    pub fn website(mut self, website: impl Into<String>) -> Self {
        self.customer.website = Some(website.into());
        self
    }

    pub fn mark(mut self, mark: impl Into<String>) -> Self {
        self.customer.mark = Some(mark.into());
        self
    }

    pub fn invoice_address(mut self, address: Address) -> Self {
        self.customer.invoice_address = address;
        self
    }

    pub fn shipping_address(mut self, address: Address) -> Self {
        self.customer.shipping_address = address;
        self
    }

    pub fn main_address(mut self, role: AddressRole) -> Self {
        self.customer.main_address = role;
        self
    }

    pub fn build(self) -> Customer {
        self.customer
    }
}

/// Builder for Address.
pub struct AddressBuilder {
    address: Address,
}

impl AddressBuilder {
    pub fn new(country_code: impl Into<String>) -> Self {
        Self {
            address: Address {
                country_code: Some(country_code.into()),
                ..Default::default()
            },
        }
    }

    pub fn company_name(mut self, name: impl Into<String>) -> Self {
        self.address.company_name1 = Some(name.into());
        self
    }

    pub fn company_name2(mut self, name: impl Into<String>) -> Self {
        self.address.company_name2 = Some(name.into());
        self
    }

    pub fn full_name(mut self, name: impl Into<String>) -> Self {
        self.address.full_name = Some(name.into());
        self
    }

    pub fn salutation(mut self, salutation: impl Into<String>) -> Self {
        self.address.salutation = Some(salutation.into());
        self
    }

    pub fn street(mut self, street: impl Into<String>) -> Self {
        self.address.address1 = Some(street.into());
        self
    }

    pub fn address2(mut self, line: impl Into<String>) -> Self {
        self.address.address2 = Some(line.into());
        self
    }

    pub fn postal_code(mut self, postal_code: impl Into<String>) -> Self {
        self.address.postal_code = Some(postal_code.into());
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.address.city = Some(city.into());
        self
    }

    pub fn country(mut self, name: impl Into<String>) -> Self {
        self.address.country = Some(name.into());
        self
    }

    pub fn build(self) -> Address {
        self.address
    }
}

/// Builder for Line.
///
/// Amounts can be given the way the shop knows them: an exact VAT rate, or
/// amounts plus their precision from which a [`VatRange`] is computed.
pub struct LineBuilder {
    line: Line,
}

impl LineBuilder {
    pub fn new(product: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            line: Line {
                product: Some(product.into()),
                quantity,
                unit_price: Some(unit_price),
                ..Default::default()
            },
        }
    }

    /// Line of which only the price including VAT is known.
    pub fn with_price_inc(
        product: impl Into<String>,
        quantity: Decimal,
        unit_price_inc: Decimal,
    ) -> Self {
        let mut builder = Self::new(product, quantity, Decimal::ZERO);
        builder.line.unit_price = None;
        builder.line.meta.unit_price_inc = Some(unit_price_inc);
        builder
    }

    pub fn line_type(mut self, line_type: LineType) -> Self {
        self.line.meta.line_type = line_type;
        self
    }

    pub fn item_number(mut self, number: impl Into<String>) -> Self {
        self.line.item_number = Some(number.into());
        self
    }

    pub fn nature(mut self, nature: Nature) -> Self {
        self.line.nature = Some(nature);
        self
    }

    /// Exact VAT rate as known by the shop.
    pub fn vat_rate(mut self, rate: Decimal) -> Self {
        self.line.vat_rate = Some(rate);
        self.line.meta.vat_rate_source = VatRateSource::Exact;
        self
    }

    /// VAT amount per unit with the precision of price and VAT amount; the
    /// rate is computed as a range to be matched by the completor.
    pub fn vat_amount(mut self, vat_amount: Decimal, precision: Decimal, precision_vat: Decimal) -> Self {
        self.line.meta.vat_amount = Some(vat_amount);
        self.line.meta.vat_range = match (self.line.unit_price, self.line.meta.unit_price_inc) {
            (Some(ex), _) => VatRange::from_amounts(ex, vat_amount, precision, precision_vat),
            (None, Some(inc)) => {
                self.line.unit_price = inc.checked_sub(vat_amount);
                VatRange::from_inc_amounts(inc, vat_amount, precision, precision_vat)
            }
            (None, None) => None,
        };
        self.line.meta.vat_rate_source = if self.line.meta.vat_range.is_some() {
            VatRateSource::Calculated
        } else {
            VatRateSource::Completor
        };
        self
    }

    /// Rate of the product's VAT class as configured in the shop today.
    pub fn lookup_vat_rate(mut self, rate: Decimal) -> Self {
        self.line.meta.lookup_vat_rate = Some(rate);
        self
    }

    /// VAT rate to be decided by a split strategy.
    pub fn strategy(mut self) -> Self {
        self.line.vat_rate = None;
        self.line.meta.vat_rate_source = VatRateSource::Strategy;
        self
    }

    pub fn cost_price(mut self, cost_price: Decimal) -> Self {
        self.line.cost_price = Some(cost_price);
        self
    }

    pub fn add_child(mut self, child: Line) -> Self {
        self.line.children.push(child);
        self
    }

    pub fn build(self) -> Line {
        self.line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn line_with_vat_amount_gets_range() {
        let line = LineBuilder::new("Boek", dec!(1), dec!(18.35))
            .vat_amount(dec!(1.65), dec!(0.01), dec!(0.01))
            .build();
        assert_eq!(line.meta.vat_rate_source, VatRateSource::Calculated);
        assert!(line.meta.vat_range.unwrap().contains(dec!(9)));
        assert!(line.vat_rate.is_none());
    }

    #[test]
    fn price_inc_line_derives_ex() {
        let line = LineBuilder::with_price_inc("Boek", dec!(1), dec!(20.00))
            .vat_amount(dec!(1.65), dec!(0.01), dec!(0.01))
            .build();
        assert_eq!(line.unit_price, Some(dec!(18.35)));
    }

    #[test]
    fn zero_price_line_has_no_range() {
        let line = LineBuilder::new("Gratis", dec!(1), dec!(0))
            .vat_amount(dec!(0), dec!(0.01), dec!(0.01))
            .build();
        assert_eq!(line.meta.vat_rate_source, VatRateSource::Completor);
    }

    #[test]
    fn address_builder_sets_country() {
        let address = AddressBuilder::new("BE").city("Gent").build();
        assert_eq!(address.country_code.as_deref(), Some("BE"));
        assert!(!address.is_empty());
    }
}
