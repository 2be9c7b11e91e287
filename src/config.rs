//! Selection preferences and the per-run thresholds derived from them.

use serde::{Deserialize, Serialize};

/// How the PSF is allowed to vary with the context variables. Decides
/// whether FWHM auto-selection pools candidates across catalogs or
/// estimates each catalog independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextVariation {
    /// No variation: one pooled FWHM estimate shared by every catalog.
    None,
    /// Per-source variation: each catalog gets an independent estimate.
    PerSource,
}

/// Which extensions of each catalog are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtensionScope {
    /// Every extension, in ascending order.
    All,
    /// A single extension, by index.
    Single(usize),
}

/// Sample selection preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Extraction flag bits that reject a source outright.
    pub flag_mask: u32,
    /// Maximum source ellipticity before rejection.
    pub max_ellipticity: f64,
    /// Minimum signal-to-noise ratio.
    pub min_sn: f64,
    /// Absolute FWHM acceptance bounds (pixels).
    pub fwhm_range: (f64, f64),
    /// Maximum allowed FWHM variation factor around the mode.
    pub max_fwhm_variation: f64,
    /// Estimate per-catalog FWHM ranges instead of using `fwhm_range` as-is.
    pub autoselect_fwhm: bool,
    /// Reject sources with more than this many masked vignette pixels.
    pub max_bad_pixels: usize,
    /// Enable the bad-pixel rejection stage.
    pub reject_bad_pixels: bool,
    /// Object-table column holding the normalization flux.
    pub flux_key: String,
    /// Object-table column holding the flux measurement error.
    pub flux_err_key: String,
    /// Context field names; a leading `:` reads the field from the
    /// extension header instead of the object table.
    pub context_names: Vec<String>,
    /// Context variation mode.
    pub context_variation: ContextVariation,
    /// Number of externally supplied principal-component context fields.
    pub n_principal_components: usize,
    /// PSF interpolation factor, used by the theoretical FWHM fallback.
    pub interpolation_factor: f64,
    /// Extensions to read from each catalog.
    pub extension_scope: ExtensionScope,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            flag_mask: 0x00fe,
            max_ellipticity: 0.3,
            min_sn: 20.0,
            fwhm_range: (2.0, 10.0),
            max_fwhm_variation: 0.2,
            autoselect_fwhm: true,
            max_bad_pixels: 0,
            reject_bad_pixels: true,
            flux_key: "FLUX_APER".to_string(),
            flux_err_key: "FLUXERR_APER".to_string(),
            context_names: vec!["X_IMAGE".to_string(), "Y_IMAGE".to_string()],
            context_variation: ContextVariation::None,
            n_principal_components: 0,
            interpolation_factor: 3.0,
            extension_scope: ExtensionScope::All,
        }
    }
}

impl SelectionConfig {
    /// Elongation ceiling derived from the ellipticity preference:
    /// `(e + 1)/(1 - e)`, or effectively unbounded at 100 for `e >= 1`.
    pub fn max_elongation(&self) -> f64 {
        if self.max_ellipticity < 1.0 {
            (self.max_ellipticity + 1.0) / (1.0 - self.max_ellipticity)
        } else {
            100.0
        }
    }

    /// Theoretical FWHM used when auto-selection finds no usable candidates.
    pub fn fallback_fwhm(&self) -> f64 {
        2.35 / (1.0 - 1.0 / self.interpolation_factor)
    }

    /// Fix the thresholds the per-extension reader applies.
    pub fn thresholds(&self) -> SelectionThresholds {
        SelectionThresholds {
            flag_mask: self.flag_mask,
            min_sn: self.min_sn,
            max_elongation: self.max_elongation(),
            max_bad_pixels: self.max_bad_pixels,
            reject_bad_pixels: self.reject_bad_pixels,
            flux_key: self.flux_key.clone(),
            flux_err_key: self.flux_err_key.clone(),
        }
    }
}

/// Row-rejection thresholds, fixed once per run.
#[derive(Debug, Clone)]
pub struct SelectionThresholds {
    pub flag_mask: u32,
    pub min_sn: f64,
    pub max_elongation: f64,
    pub max_bad_pixels: usize,
    pub reject_bad_pixels: bool,
    pub flux_key: String,
    pub flux_err_key: String,
}
