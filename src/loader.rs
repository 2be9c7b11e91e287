//! Cross-catalog sample loading.
//!
//! Drives the two-pass pipeline: a coarse prefilter pass collecting FWHM
//! candidates (auto-select mode), then the full per-extension filter pass
//! building one finalized sample set per catalog. Catalogs are processed
//! strictly in input order: the pooled estimation mode needs every
//! catalog's candidates before any filtering starts, and the reference
//! FWHM is a running minimum over the catalogs seen so far.

use crate::catalog::{Catalog, Extension, BACKNOISE_KEY};
use crate::config::{ContextVariation, ExtensionScope, SelectionConfig};
use crate::context::Context;
use crate::error::SelectionError;
use crate::fwhm::{fwhm_range, FwhmRange};
use crate::reader::read_extension;
use crate::sample::SampleSet;
use crate::BIG;

/// Builds one finalized sample set per input catalog.
#[derive(Debug, Clone)]
pub struct SampleLoader {
    config: SelectionConfig,
    context: Context,
}

impl SampleLoader {
    /// Create a loader; the context definition is resolved from the
    /// configured field names once, here.
    pub fn new(config: SelectionConfig) -> Self {
        let context = Context::new(&config.context_names, config.n_principal_components);
        Self { config, context }
    }

    /// The resolved context definition.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Load every catalog into a finalized sample set.
    ///
    /// `pc_values` supplies the externally computed principal-component
    /// context values, one vector per catalog, when the context defines
    /// any. A catalog whose finalized set holds no samples aborts the run
    /// with [`SelectionError::NoUsableSources`].
    pub fn load(
        &self,
        catalogs: &[Catalog],
        pc_values: Option<&[Vec<f64>]>,
    ) -> Result<Vec<SampleSet>, SelectionError> {
        let ranges = self.fwhm_ranges(catalogs)?;
        let thresholds = self.config.thresholds();

        let mut sets = Vec::with_capacity(catalogs.len());
        let mut min_mode = BIG;
        for (catalog_index, catalog) in catalogs.iter().enumerate() {
            let range = ranges[catalog_index];
            let pc = pc_values
                .and_then(|v| v.get(catalog_index))
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            let mut set = SampleSet::new(&self.context);
            for (extension_index, extension) in self.scoped(catalog) {
                read_extension(
                    &mut set,
                    &catalog.name,
                    catalog_index,
                    extension_index,
                    extension,
                    (range.min / 2.0, range.max / 2.0),
                    &thresholds,
                    &self.context,
                    pc,
                )?;
            }

            // Every set carries the smallest mode seen so far, keeping the
            // reference FWHM comparable across catalogs.
            if range.mode < min_mode {
                min_mode = range.mode;
            }
            set.set_fwhm(min_mode);

            if set.is_empty() {
                return Err(SelectionError::NoUsableSources {
                    catalog: catalog.name.clone(),
                });
            }
            log::info!("{}: {} samples loaded", catalog.name, set.len());
            sets.push(set);
        }
        Ok(sets)
    }

    /// Extensions of `catalog` selected by the configured scope, with
    /// their indices.
    fn scoped<'c>(&self, catalog: &'c Catalog) -> impl Iterator<Item = (usize, &'c Extension)> {
        let scope = self.config.extension_scope;
        catalog
            .extensions
            .iter()
            .enumerate()
            .filter(move |(index, _)| match scope {
                ExtensionScope::All => true,
                ExtensionScope::Single(k) => *index == k,
            })
    }

    /// First pass: one FWHM acceptance range per catalog.
    fn fwhm_ranges(&self, catalogs: &[Catalog]) -> Result<Vec<FwhmRange>, SelectionError> {
        let (min_allowed, max_allowed) = self.config.fwhm_range;

        if !self.config.autoselect_fwhm {
            let fixed = FwhmRange {
                mode: (min_allowed + max_allowed) / 2.0,
                min: min_allowed,
                max: max_allowed,
            };
            return Ok(vec![fixed; catalogs.len()]);
        }

        // Each catalog's candidates are gathered independently; no
        // estimation state leaks from one catalog to the next.
        let mut candidates = Vec::with_capacity(catalogs.len());
        for catalog in catalogs {
            candidates.push(self.fwhm_candidates(catalog)?);
        }

        match self.config.context_variation {
            ContextVariation::None => {
                let pooled: Vec<f64> = candidates.into_iter().flatten().collect();
                let range = if pooled.is_empty() {
                    log::warn!(
                        "no source with appropriate FWHM found in any catalog, \
                         using theoretical default"
                    );
                    self.fallback_range()
                } else {
                    fwhm_range(
                        pooled,
                        self.config.max_fwhm_variation,
                        min_allowed,
                        max_allowed,
                    )?
                };
                Ok(vec![range; catalogs.len()])
            }
            ContextVariation::PerSource => catalogs
                .iter()
                .zip(candidates)
                .map(|(catalog, found)| {
                    if found.is_empty() {
                        log::warn!(
                            "{}: no source with appropriate FWHM found, \
                             using theoretical default",
                            catalog.name
                        );
                        Ok(self.fallback_range())
                    } else {
                        fwhm_range(
                            found,
                            self.config.max_fwhm_variation,
                            min_allowed,
                            max_allowed,
                        )
                    }
                })
                .collect(),
        }
    }

    /// Degenerate range at the theoretical FWHM, used when no candidates
    /// survive the prefilter.
    fn fallback_range(&self) -> FwhmRange {
        let mode = self.config.fallback_fwhm();
        FwhmRange {
            mode,
            min: mode,
            max: mode,
        }
    }

    /// Candidate FWHM values (`2 x flux radius`) from rows passing the
    /// coarse prefilter.
    ///
    /// The prefilter is coarser than the full selection: peak flux over
    /// header noise, clear flags, elongation, and the absolute FWHM bounds
    /// only. It never applies the flux-radius window being estimated, which
    /// would feed the estimate back into itself.
    fn fwhm_candidates(&self, catalog: &Catalog) -> Result<Vec<f64>, SelectionError> {
        let (min_allowed, max_allowed) = self.config.fwhm_range;
        let max_elongation = self.config.max_elongation();
        let mut found = Vec::new();

        for (_, extension) in self.scoped(catalog) {
            let table = &extension.table;
            table.validate(&catalog.name)?;

            let mut backnoise = extension.header.require_f64(BACKNOISE_KEY, &catalog.name)?;
            if backnoise < 1.0 / BIG {
                backnoise = 1.0;
            }

            for row in 0..table.len() {
                let fwhm = 2.0 * table.flux_radius[row];
                if table.peak_flux[row] / backnoise > self.config.min_sn
                    && table.flags[row] & self.config.flag_mask == 0
                    && table.elongation[row] < max_elongation
                    && fwhm >= min_allowed
                    && fwhm < max_allowed
                {
                    found.push(fwhm);
                }
            }
        }
        Ok(found)
    }
}
