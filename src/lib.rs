//! Stellar sample selection for point-spread-function modeling.
//!
//! Given source-extraction catalogs (one per exposure, each holding one or
//! more image extensions), this crate picks out a clean sample of point-like
//! sources suitable as PSF training data. The pipeline has three layers:
//!
//! 1. **FWHM range estimation** ([`fwhm`]): a sliding-window mode finder
//!    over half-light-radius measurements yields a per-catalog acceptance
//!    interval for genuine stars.
//! 2. **Per-extension reading** ([`reader`], [`filters`]): every row of an
//!    extension's object table passes through six independent rejection
//!    stages (flags, signal-to-noise, flux-radius bounds, elongation,
//!    masked pixels); accepted rows become [`sample::Sample`] records.
//! 3. **Cross-catalog loading** ([`loader`]): orchestrates the two passes,
//!    threads one [`sample::SampleSet`] through each catalog's extensions,
//!    and finalizes context-variable scaling and the shared reference FWHM.
//!
//! Catalog container parsing lives outside this crate; the pipeline consumes
//! the in-memory [`catalog`] types a tabular reader materializes.

pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod filters;
pub mod fwhm;
pub mod loader;
pub mod reader;
pub mod sample;

pub use catalog::{Catalog, CardValue, Extension, ExtensionHeader, ObjectTable, VignetteStack};
pub use config::{ContextVariation, ExtensionScope, SelectionConfig, SelectionThresholds};
pub use context::{Context, ContextSource};
pub use error::SelectionError;
pub use fwhm::{fwhm_range, FwhmRange};
pub use loader::SampleLoader;
pub use sample::{RejectionCounts, Sample, SampleSet};

/// Sentinel magnitude for undefined measurements.
///
/// Vignette pixels at or below `-BIG` mark masked detector area; context
/// extrema start at `±BIG` until the first sample is accepted.
pub const BIG: f64 = 1e30;
