//! Row-rejection stage predicates.
//!
//! Each stage inspects one criterion over a whole extension's rows and
//! returns a boolean mask, true where the row fails. The reader unions the
//! masks into a cumulative bad mask; every stage still sees every row, so
//! the per-criterion counters stay independent of each other.

use ndarray::ArrayViewD;

use crate::BIG;

/// Rows whose extraction flags intersect the rejection mask.
pub fn flagged(flags: &[u32], flag_mask: u32) -> Vec<bool> {
    flags.iter().map(|&f| f & flag_mask != 0).collect()
}

/// Rows whose signal-to-noise ratio falls below `min_sn`.
///
/// A non-positive flux error yields a sentinel far below any real S/N, so
/// the row is rejected without a division fault.
pub fn low_signal_to_noise(flux: &[f64], flux_err: &[f64], min_sn: f64) -> Vec<bool> {
    flux.iter()
        .zip(flux_err)
        .map(|(&f, &e)| {
            let sn = if e > 0.0 { f / e } else { -BIG };
            sn < min_sn
        })
        .collect()
}

/// Rows whose flux radius falls below the accepted range.
pub fn below_flux_radius_min(flux_radius: &[f64], fr_min: f64) -> Vec<bool> {
    flux_radius.iter().map(|&r| r < fr_min).collect()
}

/// Rows whose flux radius falls above the accepted range.
pub fn above_flux_radius_max(flux_radius: &[f64], fr_max: f64) -> Vec<bool> {
    flux_radius.iter().map(|&r| r > fr_max).collect()
}

/// Rows more elongated than the ceiling.
pub fn elongated(elongation: &[f64], max_elongation: f64) -> Vec<bool> {
    elongation.iter().map(|&e| e > max_elongation).collect()
}

/// Rows with more masked vignette pixels than allowed.
///
/// Masked pixels sit at or below `-BIG` in the cutout. Expects the
/// byte-order-normalized `rows x height x width` stack.
pub fn excess_bad_pixels(vignettes: &ArrayViewD<f32>, max_bad: usize) -> Vec<bool> {
    let sentinel = (-BIG) as f32;
    vignettes
        .outer_iter()
        .map(|cutout| cutout.iter().filter(|&&p| p <= sentinel).count() > max_bad)
        .collect()
}
