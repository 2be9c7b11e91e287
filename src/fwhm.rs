//! FWHM range estimation.
//!
//! Finds the dominant mode of a set of FWHM measurements with a
//! sliding-window density estimate and derives a clamped acceptance
//! interval around it.

use crate::error::SelectionError;

/// Mode and acceptance bounds of a FWHM distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FwhmRange {
    /// Dominant mode of the measurements.
    pub mode: f64,
    /// Lower acceptance bound.
    pub min: f64,
    /// Upper acceptance bound.
    pub max: f64,
}

/// Estimate the FWHM mode and acceptance range of `measurements`.
///
/// The mode is the midpoint of the narrowest window of width `max(1, n/4)`
/// over the sorted measurements, a density estimate robust to the long
/// tails of galaxy-contaminated distributions. Ties go to the earliest
/// window. A single measurement is its own mode.
///
/// The range spreads the mode by `cbrt(max_variation + 1)` downward and by
/// its square upward, clamped to `[min_allowed, max_allowed]`.
///
/// The measurement vector is consumed: it is sorted in place and dropped.
pub fn fwhm_range(
    mut measurements: Vec<f64>,
    max_variation: f64,
    min_allowed: f64,
    max_allowed: f64,
) -> Result<FwhmRange, SelectionError> {
    if measurements.is_empty() {
        return Err(SelectionError::NoFwhmMeasurements);
    }

    measurements.sort_unstable_by(f64::total_cmp);

    let n = measurements.len();
    let mode = if n < 2 {
        measurements[0]
    } else {
        let width = (n / 4).max(1);
        let mut narrowest = f64::INFINITY;
        let mut mode = 0.0;
        for i in 0..n - width {
            let spread = measurements[i + width] - measurements[i];
            if spread < narrowest {
                narrowest = spread;
                mode = (measurements[i + width] + measurements[i]) / 2.0;
            }
        }
        mode
    };

    let spread = (max_variation + 1.0).cbrt();
    let min = if spread > 0.0 { mode / spread } else { 0.0 };
    let max = mode * spread * spread;

    Ok(FwhmRange {
        mode,
        min: min.max(min_allowed),
        max: max.min(max_allowed),
    })
}
