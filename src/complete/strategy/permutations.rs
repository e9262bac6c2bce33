use super::{Strategy, StrategyInput, vat_of, with_rate};
use crate::core::Line;

const MAX_LINES: usize = 6;
const MAX_RATES: usize = 5;

/// Tries every assignment of candidate rates to the strategy lines.
///
/// The search space is `rates ^ lines`, so it only runs for a handful of
/// lines and rates.
pub struct TryAllVatRatePermutations;

impl Strategy for TryAllVatRatePermutations {
    fn name(&self) -> &'static str {
        "try-all-vat-rate-permutations"
    }

    fn apply(&self, input: &StrategyInput<'_>) -> Option<Vec<Vec<Line>>> {
        let n = input.lines.len();
        let rates: Vec<_> = input.candidates.iter().copied().take(MAX_RATES).collect();
        if n == 0 || n > MAX_LINES || rates.is_empty() {
            return None;
        }

        // Odometer over rate indices; the first line turns fastest.
        let mut indices = vec![0usize; n];
        loop {
            let lines: Vec<Line> = input
                .lines
                .iter()
                .zip(&indices)
                .map(|(line, i)| with_rate(line, rates[*i]))
                .collect();
            if input.accepts(vat_of(&lines)) {
                return Some(lines.into_iter().map(|l| vec![l]).collect());
            }

            let mut position = 0;
            loop {
                if position == n {
                    return None;
                }
                indices[position] += 1;
                if indices[position] < rates.len() {
                    break;
                }
                indices[position] = 0;
                position += 1;
            }
        }
    }
}
