//! Per-extension sample reading.
//!
//! Applies the staged rejection pipeline to one extension's object table
//! and appends the accepted rows to a sample set. All selection state is
//! threaded explicitly through the [`SampleSet`]; the transient column and
//! mask buffers live only for the duration of one call.

use ndarray::{Axis, Ix3};

use crate::catalog::{Extension, BACKNOISE_KEY, GAIN_KEY};
use crate::config::SelectionThresholds;
use crate::context::Context;
use crate::error::SelectionError;
use crate::filters;
use crate::sample::{Sample, SampleSet};

/// Read one catalog extension into `set`.
///
/// Rows are tested by six independent stages (flags, signal-to-noise,
/// flux-radius bounds, elongation, masked pixels); a row is accepted only
/// when every stage passes, while each stage's rejection count accumulates
/// into the set regardless of the others. Accepted rows are copied into
/// [`Sample`] records with their context values, and the set's context
/// scaling is recomputed over everything accepted so far.
///
/// `fr_range` is the accepted flux-radius interval for this catalog,
/// `pc_values` the externally computed principal-component values (one per
/// principal-component context field).
#[allow(clippy::too_many_arguments)]
pub fn read_extension(
    set: &mut SampleSet,
    catalog_name: &str,
    catalog_index: usize,
    extension_index: usize,
    extension: &Extension,
    fr_range: (f64, f64),
    thresholds: &SelectionThresholds,
    context: &Context,
    pc_values: &[f64],
) -> Result<(), SelectionError> {
    let table = &extension.table;
    table.validate(catalog_name)?;
    let n_rows = table.len();

    let backnoise = extension.header.require_f64(BACKNOISE_KEY, catalog_name)?;
    let backnoise2 = backnoise * backnoise;
    let gain = extension.header.require_f64(GAIN_KEY, catalog_name)?;

    let flux = table.require_column(&thresholds.flux_key, catalog_name)?;
    let flux_err = table.require_column(&thresholds.flux_err_key, catalog_name)?;

    // Normalize the whole vignette batch to native byte order up front;
    // per-row copies below must never see foreign-endian data.
    let (_, height, width) = table.vignettes.dims(catalog_name)?;
    let vignettes = table
        .vignettes
        .to_native()
        .into_dimensionality::<Ix3>()
        .map_err(|_| SelectionError::InvalidVignette {
            catalog: catalog_name.to_string(),
            ndim: 0,
        })?;

    // The cutout size floats until the first sample is accepted; after
    // that, a differently-shaped extension is a format error.
    if n_rows > 0 {
        if set.is_empty() {
            set.lock_vignette_size(height, width);
        } else if set.vignette_size() != Some((height, width)) {
            return Err(SelectionError::VignetteSizeMismatch {
                catalog: catalog_name.to_string(),
                expected: set.vignette_size().unwrap_or((height, width)),
                found: (height, width),
            });
        }
    }

    let resolved = context.resolve(extension, pc_values, catalog_name)?;

    let (fr_min, fr_max) = fr_range;

    let mut bad = filters::flagged(&table.flags, thresholds.flag_mask);
    set.rejects.flagged += count_true(&bad);

    let stage = filters::low_signal_to_noise(flux, flux_err, thresholds.min_sn);
    set.rejects.low_sn += count_true(&stage);
    union(&mut bad, &stage);

    let stage = filters::below_flux_radius_min(&table.flux_radius, fr_min);
    set.rejects.below_fr_min += count_true(&stage);
    union(&mut bad, &stage);

    let stage = filters::above_flux_radius_max(&table.flux_radius, fr_max);
    set.rejects.above_fr_max += count_true(&stage);
    union(&mut bad, &stage);

    let stage = filters::elongated(&table.elongation, thresholds.max_elongation);
    set.rejects.elongated += count_true(&stage);
    union(&mut bad, &stage);

    if thresholds.reject_bad_pixels {
        let stage = filters::excess_bad_pixels(&vignettes.view().into_dyn(), thresholds.max_bad_pixels);
        set.rejects.bad_pixels += count_true(&stage);
        union(&mut bad, &stage);
    }

    let mut accepted = 0usize;
    for row in 0..n_rows {
        if bad[row] {
            continue;
        }
        set.push(Sample {
            catalog_index,
            extension_index,
            vignette: vignettes.index_axis(Axis(0), row).to_owned(),
            norm: flux[row],
            backnoise2,
            gain,
            x: table.x[row],
            y: table.y[row],
            flux_radius: table.flux_radius[row],
            context: resolved.iter().map(|values| values.at(row)).collect(),
        });
        accepted += 1;
    }

    set.update_context_scaling();
    set.trim_memory();

    log::debug!(
        "{catalog_name}[{extension_index}]: {accepted}/{n_rows} rows accepted \
         (rejected: flags={}, s/n={}, frmin={}, frmax={}, elongation={}, badpix={})",
        set.rejects.flagged,
        set.rejects.low_sn,
        set.rejects.below_fr_min,
        set.rejects.above_fr_max,
        set.rejects.elongated,
        set.rejects.bad_pixels,
    );

    Ok(())
}

fn count_true(mask: &[bool]) -> usize {
    mask.iter().filter(|&&b| b).count()
}

fn union(accumulated: &mut [bool], stage: &[bool]) {
    for (acc, &s) in accumulated.iter_mut().zip(stage) {
        *acc |= s;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ExtensionHeader, ObjectTable, VignetteStack};
    use crate::config::SelectionConfig;
    use ndarray::Array3;
    use std::collections::HashMap;

    fn thresholds() -> SelectionThresholds {
        SelectionConfig::default().thresholds()
    }

    fn context() -> Context {
        Context::new(&["X_IMAGE".to_string(), "Y_IMAGE".to_string()], 0)
    }

    /// Extension with `n` clean rows: unflagged, high S/N, flux radius 2.0,
    /// round, clean cutouts.
    fn clean_extension(n: usize) -> Extension {
        let mut columns = HashMap::new();
        columns.insert("FLUX_APER".to_string(), vec![1000.0; n]);
        columns.insert("FLUXERR_APER".to_string(), vec![10.0; n]);
        Extension {
            header: ExtensionHeader::from_cards(["SEXBKDEV= 2.0", "SEXGAIN = 4.0"]),
            table: ObjectTable {
                x: (0..n).map(|i| 10.0 + i as f64).collect(),
                y: (0..n).map(|i| 20.0 + i as f64).collect(),
                flux_radius: vec![2.0; n],
                peak_flux: vec![500.0; n],
                elongation: vec![1.1; n],
                flags: vec![0; n],
                vignettes: VignetteStack::native(Array3::zeros((n, 5, 5)).into_dyn()),
                columns,
            },
        }
    }

    fn read(set: &mut SampleSet, extension: &Extension) -> Result<(), SelectionError> {
        read_extension(
            set,
            "cat.fits",
            0,
            0,
            extension,
            (1.0, 5.0),
            &thresholds(),
            &context(),
            &[],
        )
    }

    #[test]
    fn test_clean_rows_all_accepted() {
        let ctx = context();
        let mut set = SampleSet::new(&ctx);
        read(&mut set, &clean_extension(10)).unwrap();

        assert_eq!(set.len(), 10);
        assert_eq!(set.rejects, Default::default());
        assert_eq!(set.vignette_size(), Some((5, 5)));

        let sample = &set.samples()[0];
        assert_eq!(sample.norm, 1000.0);
        assert_eq!(sample.backnoise2, 4.0);
        assert_eq!(sample.gain, 4.0);
        assert_eq!(sample.context, vec![10.0, 20.0]);
    }

    #[test]
    fn test_counters_are_independent_per_criterion() {
        let mut extension = clean_extension(6);
        // Row 0 fails flags only; row 1 fails flags AND elongation; row 2
        // fails S/N only.
        extension.table.flags[0] = 4;
        extension.table.flags[1] = 4;
        extension.table.elongation[1] = 50.0;
        extension.table.columns.get_mut("FLUXERR_APER").unwrap()[2] = 0.0;

        let ctx = context();
        let mut set = SampleSet::new(&ctx);
        read(&mut set, &extension).unwrap();

        assert_eq!(set.rejects.flagged, 2);
        assert_eq!(set.rejects.elongated, 1);
        assert_eq!(set.rejects.low_sn, 1);
        // Three distinct rows were bad under at least one criterion.
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_accepted_plus_rejected_accounts_for_every_row() {
        let mut extension = clean_extension(8);
        extension.table.flags[0] = 4;
        extension.table.flux_radius[1] = 0.5;
        extension.table.flux_radius[2] = 9.0;
        extension.table.elongation[3] = 50.0;

        let ctx = context();
        let mut set = SampleSet::new(&ctx);
        read(&mut set, &extension).unwrap();
        assert_eq!(set.len() + 4, 8);
        assert_eq!(set.rejects.below_fr_min, 1);
        assert_eq!(set.rejects.above_fr_max, 1);
    }

    #[test]
    fn test_widening_radius_range_is_monotonic() {
        let mut extension = clean_extension(10);
        for (i, r) in extension.table.flux_radius.iter_mut().enumerate() {
            *r = 0.5 + i as f64 * 0.5;
        }

        let ctx = context();
        let mut narrow = SampleSet::new(&ctx);
        read_extension(
            &mut narrow, "cat.fits", 0, 0, &extension, (2.0, 3.0),
            &thresholds(), &ctx, &[],
        )
        .unwrap();

        let mut wide = SampleSet::new(&ctx);
        read_extension(
            &mut wide, "cat.fits", 0, 0, &extension, (1.0, 4.0),
            &thresholds(), &ctx, &[],
        )
        .unwrap();

        assert!(wide.len() >= narrow.len());
    }

    #[test]
    fn test_bad_pixel_stage_honors_enablement() {
        let mut extension = clean_extension(3);
        let masked = (-crate::BIG) as f32;
        let mut stack = Array3::<f32>::zeros((3, 5, 5));
        stack[[1, 2, 2]] = masked;
        extension.table.vignettes = VignetteStack::native(stack.into_dyn());

        let ctx = context();
        let mut set = SampleSet::new(&ctx);
        read(&mut set, &extension).unwrap();
        assert_eq!(set.rejects.bad_pixels, 1);
        assert_eq!(set.len(), 2);

        // Disabled stage neither counts nor rejects.
        let mut config = SelectionConfig::default();
        config.reject_bad_pixels = false;
        let mut set = SampleSet::new(&ctx);
        read_extension(
            &mut set, "cat.fits", 0, 0, &extension, (1.0, 5.0),
            &config.thresholds(), &ctx, &[],
        )
        .unwrap();
        assert_eq!(set.rejects.bad_pixels, 0);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_vignette_size_mismatch_is_fatal() {
        let ctx = context();
        let mut set = SampleSet::new(&ctx);
        read(&mut set, &clean_extension(4)).unwrap();

        let mut second = clean_extension(4);
        second.table.vignettes = VignetteStack::native(Array3::zeros((4, 7, 7)).into_dyn());
        let err = read(&mut set, &second).unwrap_err();
        assert!(matches!(
            err,
            SelectionError::VignetteSizeMismatch {
                expected: (5, 5),
                found: (7, 7),
                ..
            }
        ));
    }

    #[test]
    fn test_missing_gain_is_fatal() {
        let mut extension = clean_extension(2);
        extension.header = ExtensionHeader::from_cards(["SEXBKDEV= 2.0"]);
        let ctx = context();
        let mut set = SampleSet::new(&ctx);
        let err = read(&mut set, &extension).unwrap_err();
        assert!(matches!(err, SelectionError::MissingHeaderKey { .. }));
        assert!(err.to_string().contains("SEXGAIN"));
    }

    #[test]
    fn test_counters_accumulate_across_extensions() {
        let mut first = clean_extension(5);
        first.table.flags[0] = 4;
        let mut second = clean_extension(5);
        second.table.flags[0] = 4;
        second.table.flags[1] = 4;

        let ctx = context();
        let mut set = SampleSet::new(&ctx);
        read(&mut set, &first).unwrap();
        read(&mut set, &second).unwrap();
        assert_eq!(set.rejects.flagged, 3);
        assert_eq!(set.len(), 7);
    }

    #[test]
    fn test_foreign_endian_vignettes_are_normalized() {
        let mut extension = clean_extension(1);
        let logical = Array3::from_shape_fn((1, 5, 5), |(_, r, c)| (r * 5 + c) as f32);
        let swapped = logical.mapv(|v| f32::from_bits(v.to_bits().swap_bytes()));
        extension.table.vignettes =
            VignetteStack::new(swapped.into_dyn(), !cfg!(target_endian = "big"));

        let ctx = context();
        let mut set = SampleSet::new(&ctx);
        read(&mut set, &extension).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.samples()[0].vignette,
            logical.index_axis(Axis(0), 0).to_owned()
        );
    }
}
