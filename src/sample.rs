//! Accepted samples and the sets that own them.

use ndarray::Array2;

use crate::context::Context;
use crate::BIG;

/// One accepted point source.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Index of the source catalog in the input list.
    pub catalog_index: usize,
    /// Index of the image extension within that catalog.
    pub extension_index: usize,
    /// Pixel cutout around the source, in native byte order.
    pub vignette: Array2<f32>,
    /// Normalization flux.
    pub norm: f64,
    /// Background noise variance (header noise deviation squared).
    pub backnoise2: f64,
    /// Detector gain.
    pub gain: f64,
    /// Center x position (pixels).
    pub x: f64,
    /// Center y position (pixels).
    pub y: f64,
    /// Half-light radius (pixels).
    pub flux_radius: f64,
    /// One scalar per context field, in definition order.
    pub context: Vec<f64>,
}

/// Per-criterion rejection tallies.
///
/// The criteria are independent: a row rejected by several stages is
/// counted by each of them, so the sum of the fields may exceed the number
/// of rejected rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RejectionCounts {
    /// Extraction flags intersected the rejection mask.
    pub flagged: usize,
    /// Signal-to-noise below the minimum.
    pub low_sn: usize,
    /// Flux radius below the accepted range.
    pub below_fr_min: usize,
    /// Flux radius above the accepted range.
    pub above_fr_max: usize,
    /// Elongation above the ceiling.
    pub elongated: usize,
    /// Too many masked vignette pixels.
    pub bad_pixels: usize,
}

/// Ordered, append-only collection of samples sharing one context
/// configuration.
///
/// The set carries the running per-context extrema explicitly; scale and
/// offset are recomputed from them after each batch of insertions and hold
/// sentinel values (never zero) while the set is empty, so "no data" cannot
/// masquerade as "zero spread".
#[derive(Debug, Clone)]
pub struct SampleSet {
    samples: Vec<Sample>,
    vignette_size: Option<(usize, usize)>,
    context_names: Vec<String>,
    context_min: Vec<f64>,
    context_max: Vec<f64>,
    context_scale: Vec<f64>,
    context_offset: Vec<f64>,
    fwhm: f64,
    /// Rejection tallies accumulated over every extension read into the set.
    pub rejects: RejectionCounts,
}

impl SampleSet {
    /// Create an empty set for the given context definition.
    pub fn new(context: &Context) -> Self {
        let n = context.len();
        Self {
            samples: Vec::new(),
            vignette_size: None,
            context_names: context.names().map(str::to_string).collect(),
            context_min: vec![BIG; n],
            context_max: vec![-BIG; n],
            context_scale: vec![-BIG; n],
            context_offset: vec![BIG; n],
            fwhm: BIG,
            rejects: RejectionCounts::default(),
        }
    }

    /// Number of accepted samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Accepted samples in insertion order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of context fields.
    pub fn n_context(&self) -> usize {
        self.context_names.len()
    }

    /// Context field names in definition order.
    pub fn context_names(&self) -> &[String] {
        &self.context_names
    }

    /// Cutout size pinned by the first accepted sample, as
    /// `(height, width)`.
    pub fn vignette_size(&self) -> Option<(usize, usize)> {
        self.vignette_size
    }

    /// Set the cutout size. Mutable only while the set holds no samples;
    /// the first accepted sample freezes it.
    pub(crate) fn lock_vignette_size(&mut self, height: usize, width: usize) {
        if self.samples.is_empty() {
            self.vignette_size = Some((height, width));
        }
    }

    /// Append an accepted sample and fold its context values into the
    /// running extrema.
    pub(crate) fn push(&mut self, sample: Sample) {
        debug_assert_eq!(Some(sample.vignette.dim()), self.vignette_size);
        for (i, &v) in sample.context.iter().enumerate() {
            if v < self.context_min[i] {
                self.context_min[i] = v;
            }
            if v > self.context_max[i] {
                self.context_max[i] = v;
            }
        }
        self.samples.push(sample);
    }

    /// Recompute scale and offset from the running extrema.
    ///
    /// Idempotent, and a no-op while the set is empty: the sentinels stay
    /// in place until at least one sample exists.
    pub(crate) fn update_context_scaling(&mut self) {
        if self.samples.is_empty() {
            return;
        }
        for i in 0..self.context_min.len() {
            self.context_scale[i] = self.context_max[i] - self.context_min[i];
            self.context_offset[i] = (self.context_min[i] + self.context_max[i]) / 2.0;
        }
    }

    /// Per-context scales: `max - min` over all accepted samples so far.
    /// Sentinel `-BIG` while the set is empty.
    pub fn context_scales(&self) -> &[f64] {
        &self.context_scale
    }

    /// Per-context offsets: `(min + max) / 2` over all accepted samples so
    /// far. Sentinel `BIG` while the set is empty.
    pub fn context_offsets(&self) -> &[f64] {
        &self.context_offset
    }

    /// Representative FWHM of the set.
    pub fn fwhm(&self) -> f64 {
        self.fwhm
    }

    pub(crate) fn set_fwhm(&mut self, fwhm: f64) {
        self.fwhm = fwhm;
    }

    /// Release excess capacity once a catalog's extensions are read.
    pub(crate) fn trim_memory(&mut self) {
        self.samples.shrink_to_fit();
    }
}
