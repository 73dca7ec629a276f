use crate::classify::outcome::{Summary, Verdict};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Decimal places kept in `Summary::average_score`.
pub const AVERAGE_SCALE: u32 = 2;

/// Summarize a batch of verdicts.
///
/// Documents without a statement count towards `total` only; they never
/// enter the histogram or the average.
pub fn summarize<'a>(verdicts: impl IntoIterator<Item = &'a Verdict>) -> Summary {
    let mut total = 0;
    let mut score_histogram: BTreeMap<u32, usize> = BTreeMap::new();
    let mut score_sum = Decimal::ZERO;

    for verdict in verdicts {
        total += 1;
        if let Some(score) = verdict.score() {
            *score_histogram.entry(score).or_default() += 1;
            score_sum += Decimal::from(score);
        }
    }

    let with_statement: usize = score_histogram.values().sum();
    let average_score = if with_statement == 0 {
        Decimal::ZERO
    } else {
        (score_sum / Decimal::from(with_statement)).round_dp(AVERAGE_SCALE)
    };

    Summary {
        total,
        with_statement,
        without_statement: total - with_statement,
        score_histogram,
        average_score,
    }
}
