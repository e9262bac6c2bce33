use super::{Strategy, StrategyInput, vat_of, with_rate};
use crate::core::Line;

/// All strategy lines get the same rate, trying the candidates in order.
pub struct ApplySameVatRate;

impl Strategy for ApplySameVatRate {
    fn name(&self) -> &'static str {
        "apply-same-vat-rate"
    }

    fn apply(&self, input: &StrategyInput<'_>) -> Option<Vec<Vec<Line>>> {
        input.candidates.iter().find_map(|rate| {
            let lines: Vec<Line> = input.lines.iter().map(|l| with_rate(l, *rate)).collect();
            input
                .accepts(vat_of(&lines))
                .then(|| lines.into_iter().map(|l| vec![l]).collect())
        })
    }
}
