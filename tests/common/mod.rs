//! Shared synthetic-catalog builders for the integration tests.

use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use starsieve::{Catalog, Extension, ExtensionHeader, ObjectTable, VignetteStack};
use std::collections::HashMap;

pub const BACKNOISE: f64 = 2.0;
pub const GAIN: f64 = 4.0;
pub const VIGNETTE: (usize, usize) = (9, 9);

/// One synthetic source row.
#[derive(Debug, Clone)]
pub struct Row {
    pub x: f64,
    pub y: f64,
    pub flux_radius: f64,
    pub flux: f64,
    pub flux_err: f64,
    pub peak_flux: f64,
    pub elongation: f64,
    pub flags: u32,
}

impl Row {
    /// A row that passes the default selection, at the given position and
    /// flux radius.
    pub fn clean(x: f64, y: f64, flux_radius: f64) -> Self {
        Self {
            x,
            y,
            flux_radius,
            flux: 1000.0,
            flux_err: 10.0,
            peak_flux: 500.0,
            elongation: 1.1,
            flags: 0,
        }
    }
}

/// Extension with the default header and cutout size.
pub fn extension(rows: &[Row]) -> Extension {
    extension_with(rows, VIGNETTE, BACKNOISE, GAIN)
}

pub fn extension_with(
    rows: &[Row],
    vignette: (usize, usize),
    backnoise: f64,
    gain: f64,
) -> Extension {
    let n = rows.len();
    let mut columns = HashMap::new();
    columns.insert(
        "FLUX_APER".to_string(),
        rows.iter().map(|r| r.flux).collect::<Vec<_>>(),
    );
    columns.insert(
        "FLUXERR_APER".to_string(),
        rows.iter().map(|r| r.flux_err).collect::<Vec<_>>(),
    );

    let cards = [
        format!("SEXBKDEV= {backnoise}"),
        format!("SEXGAIN = {gain}"),
    ];
    Extension {
        header: ExtensionHeader::from_cards(cards.iter().map(String::as_str)),
        table: ObjectTable {
            x: rows.iter().map(|r| r.x).collect(),
            y: rows.iter().map(|r| r.y).collect(),
            flux_radius: rows.iter().map(|r| r.flux_radius).collect(),
            peak_flux: rows.iter().map(|r| r.peak_flux).collect(),
            elongation: rows.iter().map(|r| r.elongation).collect(),
            flags: rows.iter().map(|r| r.flags).collect(),
            vignettes: VignetteStack::native(
                Array3::zeros((n, vignette.0, vignette.1)).into_dyn(),
            ),
            columns,
        },
    }
}

/// Single-extension catalog.
pub fn catalog(name: &str, rows: &[Row]) -> Catalog {
    Catalog {
        name: name.to_string(),
        extensions: vec![extension(rows)],
    }
}

/// Clean rows at distinct positions with flux radii drawn uniformly from
/// `[lo, hi)`, deterministic per seed.
pub fn clean_rows(n: usize, lo: f64, hi: f64, seed: u64) -> Vec<Row> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            Row::clean(
                50.0 + (i % 10) as f64 * 100.0,
                50.0 + (i / 10) as f64 * 100.0,
                rng.gen_range(lo..hi),
            )
        })
        .collect()
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
