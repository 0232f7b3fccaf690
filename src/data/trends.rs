//! Per-species trend lines drawn over the equilibrium plots.

use std::collections::BTreeMap;

use crate::data::state::{TransitionState, TrendAxis};

/// Straight-line summary of abundance against one axis for one species.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendLine {
    pub slope: Option<f64>,
    pub intercept: Option<f64>,
    pub median: f64,
    /// Population standard deviation of the abundances.
    pub sigma: f64,
    pub n: usize,
}

impl TrendLine {
    /// Two end points spanning `[x0, x1]`, if a slope is defined.
    pub fn segment(&self, x0: f64, x1: f64) -> Option<[[f64; 2]; 2]> {
        let (m, b) = (self.slope?, self.intercept?);
        Some([[x0, m * x0 + b], [x1, m * x1 + b]])
    }

    /// `log ε(X) = median ± σ (N = n)`.
    pub fn abundance_label(&self, element: &str) -> Option<String> {
        (self.n > 0 && self.median.is_finite()).then(|| {
            format!(
                "log ε({}) = {:.2} ± {:.2} (N = {})",
                element, self.median, self.sigma, self.n
            )
        })
    }

    /// Slope readout; only the excitation slope carries a unit.
    pub fn slope_label(&self, axis: TrendAxis) -> Option<String> {
        let m = self.slope.filter(|m| m.is_finite())?;
        Some(match axis {
            TrendAxis::Excitation => format!("{:+.3} dex/eV", m),
            TrendAxis::LineStrength => format!("{:+.3}", m),
        })
    }
}

/// `[min, max]` of `xs` widened by `margin` of its width on each side.
///
/// A single distinct value is widened by `margin` in absolute terms.
pub fn padded_span(xs: impl IntoIterator<Item = f64>, margin: f64) -> Option<(f64, f64)> {
    let (lo, hi) = xs
        .into_iter()
        .filter(|x| x.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)));
    if lo > hi {
        return None;
    }
    let pad = if hi > lo { (hi - lo) * margin } else { margin };
    Some((lo - pad, hi + pad))
}

/// Species code compared by bit pattern so it can key a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SpeciesKey(u64);

impl SpeciesKey {
    pub fn new(species: f64) -> Self {
        Self(species.to_bits())
    }

    pub fn species(self) -> f64 {
        f64::from_bits(self.0)
    }
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

/// Least-squares fit through `points`. Points must already be finite.
pub fn fit_trend(points: &[[f64; 2]]) -> Option<TrendLine> {
    let n = points.len();
    if n == 0 {
        return None;
    }
    let nf = n as f64;
    let mean_x = points.iter().map(|p| p[0]).sum::<f64>() / nf;
    let mean_y = points.iter().map(|p| p[1]).sum::<f64>() / nf;
    let sxx: f64 = points.iter().map(|p| (p[0] - mean_x).powi(2)).sum();
    let sxy: f64 = points.iter().map(|p| (p[0] - mean_x) * (p[1] - mean_y)).sum();
    let syy: f64 = points.iter().map(|p| (p[1] - mean_y).powi(2)).sum();

    let (slope, intercept) = if n >= 2 && sxx > 0.0 {
        let m = sxy / sxx;
        (Some(m), Some(mean_y - m * mean_x))
    } else {
        (None, None)
    };

    let mut ys: Vec<f64> = points.iter().map(|p| p[1]).collect();
    ys.sort_by(f64::total_cmp);

    Some(TrendLine {
        slope,
        intercept,
        median: median(&ys),
        sigma: (syy / nf).sqrt(),
        n,
    })
}

/// Trend lines for each species present in `rows`, against `axis`.
pub fn equilibrium_state(rows: &[TransitionState], axis: TrendAxis) -> BTreeMap<SpeciesKey, TrendLine> {
    let mut grouped: BTreeMap<SpeciesKey, Vec<[f64; 2]>> = BTreeMap::new();
    for r in rows {
        let p = [r.x(axis), r.abundance];
        if p[0].is_finite() && p[1].is_finite() {
            grouped.entry(SpeciesKey::new(r.species)).or_default().push(p);
        }
    }
    grouped
        .into_iter()
        .filter_map(|(k, pts)| fit_trend(&pts).map(|t| (k, t)))
        .collect()
}
