//! Flattening of parent/child lines (bundles, configurable products, product
//! options) into the flat line list Acumulus expects.
//!
//! How a parent and its children end up on the invoice depends on which of
//! them carry the price:
//!
//! * only the parent: children are informative. A few short ones are merged
//!   into the parent's product text, many or long ones get their own
//!   zero-price line(s).
//! * only the children: the parent becomes a zero-price heading line.
//! * both: when the children add up to the parent, the parent's price was
//!   counted twice and is zeroed; otherwise both are kept.

use rust_decimal::Decimal;
use tracing::debug;

use crate::config::OptionsSettings;
use crate::core::{Line, VatRateSource, amounts_equal};

const CHILD_PREFIX: &str = "- ";

/// Flattens line hierarchies according to the option settings.
pub struct LineHierarchy<'a> {
    options: &'a OptionsSettings,
    tolerance: Decimal,
}

impl<'a> LineHierarchy<'a> {
    pub fn new(options: &'a OptionsSettings, tolerance: Decimal) -> Self {
        Self { options, tolerance }
    }

    /// Flatten `lines`. The result has no children left.
    pub fn flatten(&self, lines: Vec<Line>) -> Vec<Line> {
        let mut out = Vec::with_capacity(lines.len());
        for line in lines {
            self.flatten_into(line, &mut out);
        }
        out
    }

    fn flatten_into(&self, mut parent: Line, out: &mut Vec<Line>) {
        if parent.children.is_empty() {
            out.push(parent);
            return;
        }

        // Bottom up: grandchildren are resolved before looking at this level.
        let mut children = Vec::new();
        for child in std::mem::take(&mut parent.children) {
            self.flatten_into(child, &mut children);
        }

        let children_priced = children.iter().any(|c| !c.is_zero_price());
        let parent_priced = !parent.is_zero_price();

        if !children_priced {
            self.informative_children(parent, children, out);
            return;
        }

        if !parent_priced {
            if parent.vat_rate.is_none() {
                parent.vat_rate = children.iter().filter_map(|c| c.vat_rate).max();
                parent.meta.vat_rate_source = VatRateSource::Parent;
            }
            parent.unit_price = Some(Decimal::ZERO);
            debug!(product = parent.product_name(), "parent without price becomes heading");
        } else {
            let children_total: Decimal = children.iter().map(Line::line_amount).sum();
            if amounts_equal(children_total, parent.line_amount(), self.tolerance) {
                debug!(product = parent.product_name(), "parent price counted twice, zeroed");
                parent.unit_price = Some(Decimal::ZERO);
                parent.meta.unit_price_inc = None;
                parent.meta.vat_amount = None;
                parent.meta.recalculated_price = true;
            }
        }
        self.push_family(parent, children, out);
    }

    /// Children without a price.
    fn informative_children(&self, mut parent: Line, children: Vec<Line>, out: &mut Vec<Line>) {
        let names: Vec<&str> = children
            .iter()
            .map(|c| c.product_name().trim_start_matches(CHILD_PREFIX).trim())
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            // Nameless children without a price add nothing.
            out.push(parent);
            return;
        }
        let count = children.len();
        let merged = format!("{} ({})", parent.product_name(), names.join(", "));
        let too_long = merged.chars().count() > self.options.max_length;

        if count <= self.options.all_on_1_line && !too_long {
            parent.product = Some(merged);
            out.push(parent);
        } else if count >= self.options.all_on_own_line || too_long {
            self.push_family(parent, children, out);
        } else {
            let mut summary = children[0].clone();
            summary.product = Some(names.join(", "));
            summary.item_number = None;
            summary.quantity = Decimal::ONE;
            self.push_family(parent, vec![summary], out);
        }
    }

    /// Push the parent followed by its (already flat) children.
    fn push_family(&self, mut parent: Line, children: Vec<Line>, out: &mut Vec<Line>) {
        let parent_index = out.len();
        parent.meta.children_count = Some(children.len());
        let parent_rate = parent.vat_rate;
        out.push(parent);

        for mut child in children {
            if child.vat_rate.is_none() && parent_rate.is_some() {
                child.vat_rate = parent_rate;
                child.meta.vat_rate_source = VatRateSource::Parent;
            }
            if child.is_zero_price() && child.unit_price.is_none() {
                child.unit_price = Some(Decimal::ZERO);
            }
            child.product = Some(format!("{CHILD_PREFIX}{}", child.product_name()));
            if child.meta.parent_index.is_none() {
                child.meta.parent_index = Some(parent_index);
            } else if let Some(index) = child.meta.parent_index.as_mut() {
                // Grandchild: re-base on the position in the final list.
                *index += parent_index + 1;
            }
            out.push(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LineBuilder;
    use rust_decimal_macros::dec;

    fn options() -> OptionsSettings {
        OptionsSettings::default()
    }

    fn flatten(lines: Vec<Line>) -> Vec<Line> {
        LineHierarchy::new(&options(), dec!(0.02)).flatten(lines)
    }

    fn option(name: &str) -> Line {
        LineBuilder::new(name, dec!(1), dec!(0)).build()
    }

    fn parent(children: Vec<Line>) -> Line {
        let mut builder = LineBuilder::new("Laptop", dec!(1), dec!(800)).vat_rate(dec!(21));
        for child in children {
            builder = builder.add_child(child);
        }
        builder.build()
    }

    fn products(lines: &[Line]) -> Vec<&str> {
        lines.iter().map(Line::product_name).collect()
    }

    #[test]
    fn few_options_are_merged() {
        let lines = flatten(vec![parent(vec![option("16GB"), option("Zilver")])]);
        assert_eq!(products(&lines), vec!["Laptop (16GB, Zilver)"]);
        assert_eq!(lines[0].line_amount(), dec!(800));
    }

    #[test]
    fn nameless_options_leave_parent_name_alone() {
        let lines = flatten(vec![parent(vec![option(""), option("  ")])]);
        assert_eq!(products(&lines), vec!["Laptop"]);
        assert_eq!(lines[0].line_amount(), dec!(800));
    }

    #[test]
    fn three_options_share_one_line() {
        let lines = flatten(vec![parent(vec![option("16GB"), option("Zilver"), option("NL")])]);
        assert_eq!(products(&lines), vec!["Laptop", "- 16GB, Zilver, NL"]);
        assert_eq!(lines[1].vat_rate, Some(dec!(21)));
        assert_eq!(lines[1].meta.vat_rate_source, VatRateSource::Parent);
        assert_eq!(lines[1].meta.parent_index, Some(0));
        assert_eq!(lines[0].meta.children_count, Some(1));
    }

    #[test]
    fn many_options_get_own_lines() {
        let children = ["A", "B", "C", "D"].into_iter().map(option).collect();
        let lines = flatten(vec![parent(children)]);
        assert_eq!(products(&lines), vec!["Laptop", "- A", "- B", "- C", "- D"]);
        assert!(lines[1..].iter().all(|l| l.line_amount().is_zero()));
    }

    #[test]
    fn long_text_is_not_merged() {
        let long = "x".repeat(130);
        let lines = flatten(vec![parent(vec![option(&long)])]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].product_name(), format!("- {long}"));
    }

    #[test]
    fn priced_children_under_free_parent() {
        let bundle = LineBuilder::new("Pakket", dec!(1), dec!(0))
            .add_child(LineBuilder::new("Boek", dec!(1), dec!(20)).vat_rate(dec!(9)).build())
            .add_child(LineBuilder::new("Pen", dec!(2), dec!(5)).vat_rate(dec!(21)).build())
            .build();
        let lines = flatten(vec![bundle]);
        assert_eq!(products(&lines), vec!["Pakket", "- Boek", "- Pen"]);
        assert_eq!(lines[0].vat_rate, Some(dec!(21)));
        assert_eq!(lines[0].meta.vat_rate_source, VatRateSource::Parent);
        let total: Decimal = lines.iter().map(Line::line_amount).sum();
        assert_eq!(total, dec!(30));
    }

    #[test]
    fn double_counted_parent_is_zeroed() {
        let bundle = LineBuilder::new("Set", dec!(1), dec!(30))
            .vat_rate(dec!(21))
            .add_child(LineBuilder::new("A", dec!(1), dec!(10)).build())
            .add_child(LineBuilder::new("B", dec!(1), dec!(20)).vat_rate(dec!(9)).build())
            .build();
        let lines = flatten(vec![bundle]);
        assert_eq!(lines[0].line_amount(), dec!(0));
        assert!(lines[0].meta.recalculated_price);
        assert_eq!(lines[1].vat_rate, Some(dec!(21)));
        assert_eq!(lines[2].vat_rate, Some(dec!(9)));
    }

    #[test]
    fn extra_priced_children_keep_parent_price() {
        let bundle = LineBuilder::new("Fiets", dec!(1), dec!(500))
            .vat_rate(dec!(21))
            .add_child(LineBuilder::new("Bel", dec!(1), dec!(10)).vat_rate(dec!(21)).build())
            .build();
        let lines = flatten(vec![bundle]);
        let total: Decimal = lines.iter().map(Line::line_amount).sum();
        assert_eq!(total, dec!(510));
    }

    #[test]
    fn grandchildren_are_flattened_bottom_up() {
        let tree = LineBuilder::new("Kast", dec!(1), dec!(0))
            .add_child(
                LineBuilder::new("Deur", dec!(1), dec!(50))
                    .vat_rate(dec!(21))
                    .add_child(option("Eiken"))
                    .build(),
            )
            .add_child(LineBuilder::new("Plank", dec!(3), dec!(10)).vat_rate(dec!(21)).build())
            .build();
        let lines = flatten(vec![option("Los"), tree]);
        assert_eq!(products(&lines), vec!["Los", "Kast", "- Deur (Eiken)", "- Plank"]);
        assert!(lines.iter().all(|l| l.children.is_empty()));
        assert_eq!(lines[2].meta.parent_index, Some(1));
        assert_eq!(lines[1].meta.children_count, Some(2));
    }
}
