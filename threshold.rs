//! Cold-function threshold selection (§4.6).
//!
//! The reduction metric picks one distribution assumption over the sampled
//! frequencies and turns the integer parameter `C` into a concrete
//! `ScaledNumber` threshold: any function whose frequency sits below it is
//! "cold" for the purposes of partitioning (§4.7) and trimming (§4.8).

use crate::scaled::ScaledNumber;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReductionMetric {
    Normal,
    LongTail,
    AveragePercent,
}

/// The configuration registry exposes the three metric toggles as
/// independent booleans (§6); more than one may be set at once, in which
/// case §9 documents normal > long-tail > average-percent precedence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetricFlags {
    pub normal: bool,
    pub long_tail: bool,
    pub average_percent: bool,
}

impl MetricFlags {
    pub fn resolve(self) -> Option<ReductionMetric> {
        if self.normal {
            Some(ReductionMetric::Normal)
        } else if self.long_tail {
            Some(ReductionMetric::LongTail)
        } else if self.average_percent {
            Some(ReductionMetric::AveragePercent)
        } else {
            None
        }
    }
}

/// Selects the cold threshold from a bag of per-function frequency samples.
/// Zero-frequency samples are silently dropped (§4.6): they carry no
/// information about the shape of the distribution.
///
/// Returns `ScaledNumber::MAX` (nothing is ever cold) when there are no
/// non-zero samples, or when `metric` is `None` — a disabled reduction
/// metric behaves exactly like the inert default threshold.
pub fn select_threshold(samples: &[ScaledNumber], metric: Option<ReductionMetric>, parameter_c: u32) -> ScaledNumber {
    let Some(metric) = metric else {
        return ScaledNumber::MAX;
    };
    let mut samples: Vec<ScaledNumber> = samples.iter().copied().filter(|s| !s.is_zero()).collect();
    if samples.is_empty() {
        return ScaledNumber::MAX;
    }

    match metric {
        ReductionMetric::Normal => normal_threshold(&samples, parameter_c),
        ReductionMetric::LongTail => long_tail_threshold(&mut samples, parameter_c),
        ReductionMetric::AveragePercent => average_percent_threshold(&samples, parameter_c),
    }
}

/// `C` is taken as tenths of a standard deviation below the mean log10
/// frequency, `C` ranging over `[0, 30]` (§6). Picks the smallest sampled
/// value at or above that target, so the threshold always lands exactly on
/// a real sample instead of an interpolated point no function actually has.
fn normal_threshold(samples: &[ScaledNumber], c: u32) -> ScaledNumber {
    let logs: Vec<(f64, ScaledNumber)> = samples.iter().filter_map(|&s| s.log10().map(|l| (l, s))).collect();
    let mean = logs.iter().map(|(l, _)| l).sum::<f64>() / logs.len() as f64;
    let variance = logs.iter().map(|(l, _)| (l - mean).powi(2)).sum::<f64>() / logs.len() as f64;
    let target = mean - (c as f64 / 10.0) * variance.sqrt();

    logs.iter()
        .filter(|(l, _)| *l >= target)
        .min_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap())
        .map(|&(_, s)| s)
        .unwrap_or_else(|| logs.iter().map(|&(_, s)| s).max().unwrap())
}

/// `C` is a percentile in `(0, 100]` (§6): the threshold is the frequency at
/// the `C`-th percentile of the sorted sample population.
fn long_tail_threshold(samples: &mut [ScaledNumber], c: u32) -> ScaledNumber {
    samples.sort();
    let n = samples.len();
    let idx = ((n as u64 * c as u64) / 100).min(n as u64 - 1) as usize;
    samples[idx]
}

/// `C` is a percentage in `(0, 100]` (§6): the threshold is `mean * (C /
/// 1000)`, computed in `ScaledNumber` space so the wide dynamic range of the
/// inputs survives the average. The extra factor of 10 (not just `/100`)
/// matches the reference implementation's `C/10` rescale before applying it
/// as a percentage.
fn average_percent_threshold(samples: &[ScaledNumber], c: u32) -> ScaledNumber {
    let mut sum = ScaledNumber::ZERO;
    for &s in samples {
        sum = sum.add(s);
    }
    let mean = sum.div(ScaledNumber::from_u64(samples.len() as u64));
    mean.mul(ScaledNumber::from_u64(c as u64)).div(ScaledNumber::from_u64(1000))
}
