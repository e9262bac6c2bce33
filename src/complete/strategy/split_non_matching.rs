use super::{Strategy, StrategyInput, pro_rata, vat_of};
use crate::core::Line;

/// Spreads every strategy line over the rates of the other lines, in
/// proportion to what was ordered at each rate.
pub struct SplitNonMatchingLine;

impl Strategy for SplitNonMatchingLine {
    fn name(&self) -> &'static str {
        "split-non-matching-line"
    }

    fn apply(&self, input: &StrategyInput<'_>) -> Option<Vec<Vec<Line>>> {
        let replacements = input
            .lines
            .iter()
            .map(|line| pro_rata(line, &input.subtotals))
            .collect::<Option<Vec<Vec<Line>>>>()?;
        input
            .accepts(vat_of(replacements.iter().flatten()))
            .then_some(replacements)
    }
}
