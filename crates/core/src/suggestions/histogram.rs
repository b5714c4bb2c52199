use serde::{Deserialize, Serialize};

pub const DEFAULT_BINS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub bins: Vec<HistogramBin>,
}

impl Histogram {
    pub fn total(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }
}

/// Equal-width histogram over the observed range of `values`.
///
/// Returns `None` when there is no finite value to bin.
pub fn build_histogram(values: &[f64], bins: usize) -> Option<Histogram> {
    let mut finite = values.iter().copied().filter(|v| v.is_finite());
    let first = finite.next()?;
    let (min, max) = finite.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    Some(build_histogram_in_range(values, bins, min, max))
}

/// Equal-width histogram over `[min, max]`. Values equal to `max` land in the last bin;
/// values outside the range and non-finite values are dropped.
pub fn build_histogram_in_range(values: &[f64], bins: usize, min: f64, max: f64) -> Histogram {
    let bins = bins.max(1);
    let width = (max - min) / bins as f64;

    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            start: min + width * i as f64,
            end: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count: 0,
        })
        .collect();

    for &v in values {
        if !v.is_finite() || v < min || v > max {
            continue;
        }
        let idx = if v >= max || width <= 0.0 {
            bins - 1
        } else {
            (((v - min) / width).floor() as usize).min(bins - 1)
        };
        out[idx].count += 1;
    }

    Histogram { min, max, bins: out }
}
