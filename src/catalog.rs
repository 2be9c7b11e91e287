//! In-memory catalog interface types.
//!
//! The on-disk container format is handled by an external tabular reader;
//! this module defines the shapes that reader materializes: per-extension
//! header records (free-text card lines) paired with object tables holding
//! fixed astrometry/shape columns, named photometry columns, and a vignette
//! stack. Header cards are parsed here because the interface delivers them
//! as raw `KEY = value` lines.

use std::collections::HashMap;

use ndarray::ArrayD;

use crate::error::SelectionError;

/// Header key for the background noise standard deviation.
pub const BACKNOISE_KEY: &str = "SEXBKDEV";

/// Header key for the detector gain.
pub const GAIN_KEY: &str = "SEXGAIN";

/// A header card value, coerced on parse: integer first, then float,
/// otherwise kept as text.
#[derive(Debug, Clone, PartialEq)]
pub enum CardValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl CardValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CardValue::Int(v) => Some(*v as f64),
            CardValue::Float(v) => Some(*v),
            CardValue::Text(_) => None,
        }
    }
}

/// Split a header card line into its key and value.
///
/// The split happens at the first `=`; quotes around the value are trimmed
/// and the value is coerced to integer, then float, else kept as text.
/// Lines without `=` (comments, `END`, history) yield `None`.
pub fn parse_card(line: &str) -> Option<(String, CardValue)> {
    let (key, rest) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let raw = rest.split_whitespace().next()?.trim_matches('\'');
    if raw.is_empty() {
        return None;
    }
    let value = if let Ok(v) = raw.parse::<i64>() {
        CardValue::Int(v)
    } else if let Ok(v) = raw.parse::<f64>() {
        CardValue::Float(v)
    } else {
        CardValue::Text(raw.to_string())
    };
    Some((key.to_string(), value))
}

/// Parsed header record of one image extension.
#[derive(Debug, Clone, Default)]
pub struct ExtensionHeader {
    cards: HashMap<String, CardValue>,
}

impl ExtensionHeader {
    /// Parse raw card lines into a header. Unparseable lines are skipped;
    /// a repeated key keeps the last occurrence.
    pub fn from_cards<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let cards = lines.into_iter().filter_map(parse_card).collect();
        Self { cards }
    }

    /// Look up a card by key.
    pub fn get(&self, key: &str) -> Option<&CardValue> {
        self.cards.get(key)
    }

    /// Numeric header value, failing with the key and catalog name when the
    /// card is absent or non-numeric.
    pub fn require_f64(&self, key: &str, catalog: &str) -> Result<f64, SelectionError> {
        match self.get(key) {
            None => Err(SelectionError::MissingHeaderKey {
                key: key.to_string(),
                catalog: catalog.to_string(),
            }),
            Some(value) => value.as_f64().ok_or_else(|| SelectionError::NonNumericHeaderKey {
                key: key.to_string(),
                catalog: catalog.to_string(),
            }),
        }
    }
}

/// Raw vignette cutouts for every row of an object table: an
/// `n_rows x height x width` stack, possibly still in the file's byte order.
#[derive(Debug, Clone)]
pub struct VignetteStack {
    data: ArrayD<f32>,
    big_endian: bool,
}

impl VignetteStack {
    /// Wrap a stack whose byte order is declared by the reader.
    pub fn new(data: ArrayD<f32>, big_endian: bool) -> Self {
        Self { data, big_endian }
    }

    /// Wrap a stack already in native byte order.
    pub fn native(data: ArrayD<f32>) -> Self {
        Self::new(data, cfg!(target_endian = "big"))
    }

    /// Number of rows in the stack.
    pub fn len(&self) -> usize {
        self.data.shape().first().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate that the stack is a batch of 2D cutouts and return
    /// `(rows, height, width)`.
    pub fn dims(&self, catalog: &str) -> Result<(usize, usize, usize), SelectionError> {
        match self.data.shape() {
            &[n, h, w] => Ok((n, h, w)),
            s => Err(SelectionError::InvalidVignette {
                catalog: catalog.to_string(),
                ndim: s.len(),
            }),
        }
    }

    /// Copy of the whole batch in native byte order. Applied once per
    /// extension, before any per-row copy.
    pub fn to_native(&self) -> ArrayD<f32> {
        if self.big_endian == cfg!(target_endian = "big") {
            self.data.clone()
        } else {
            self.data.mapv(|v| f32::from_bits(v.to_bits().swap_bytes()))
        }
    }
}

/// Object table of one extension: equal-length per-row columns.
#[derive(Debug, Clone)]
pub struct ObjectTable {
    /// Source center x positions (pixels).
    pub x: Vec<f64>,
    /// Source center y positions (pixels).
    pub y: Vec<f64>,
    /// Half-light radius (pixels), the FWHM proxy.
    pub flux_radius: Vec<f64>,
    /// Peak pixel flux above background.
    pub peak_flux: Vec<f64>,
    /// Major-to-minor axis ratio.
    pub elongation: Vec<f64>,
    /// Extraction flag bitmask.
    pub flags: Vec<u32>,
    /// Pixel cutouts, one per row.
    pub vignettes: VignetteStack,
    /// Named photometry and context columns.
    pub columns: HashMap<String, Vec<f64>>,
}

impl ObjectTable {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Look up a column by its catalog name. Well-known fixed columns
    /// resolve ahead of the named-column map.
    pub fn column(&self, key: &str) -> Option<&[f64]> {
        match key {
            "X_IMAGE" => Some(&self.x),
            "Y_IMAGE" => Some(&self.y),
            "FLUX_RADIUS" => Some(&self.flux_radius),
            "FLUX_MAX" => Some(&self.peak_flux),
            "ELONGATION" => Some(&self.elongation),
            _ => self.columns.get(key).map(Vec::as_slice),
        }
    }

    /// Column lookup that fails with the key and catalog name.
    pub fn require_column(&self, key: &str, catalog: &str) -> Result<&[f64], SelectionError> {
        self.column(key).ok_or_else(|| SelectionError::MissingColumn {
            key: key.to_string(),
            catalog: catalog.to_string(),
        })
    }

    /// Check that every column, the flag vector, and the vignette stack
    /// agree on the row count.
    pub fn validate(&self, catalog: &str) -> Result<(), SelectionError> {
        let expected = self.len();
        let mismatch = |column: &str, found: usize| SelectionError::ColumnLengthMismatch {
            catalog: catalog.to_string(),
            column: column.to_string(),
            expected,
            found,
        };

        let fixed: [(&str, usize); 5] = [
            ("Y_IMAGE", self.y.len()),
            ("FLUX_RADIUS", self.flux_radius.len()),
            ("FLUX_MAX", self.peak_flux.len()),
            ("ELONGATION", self.elongation.len()),
            ("FLAGS", self.flags.len()),
        ];
        for (column, found) in fixed {
            if found != expected {
                return Err(mismatch(column, found));
            }
        }

        let (rows, _, _) = self.vignettes.dims(catalog)?;
        if rows != expected {
            return Err(mismatch("VIGNET", rows));
        }

        for (name, values) in &self.columns {
            if values.len() != expected {
                return Err(mismatch(name, values.len()));
            }
        }
        Ok(())
    }
}

/// One image extension: the header record paired with its object table.
#[derive(Debug, Clone)]
pub struct Extension {
    pub header: ExtensionHeader,
    pub table: ObjectTable,
}

/// A source-extraction catalog for one exposure.
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Name used in log and error messages (typically the file path).
    pub name: String,
    /// Image extensions in file order.
    pub extensions: Vec<Extension>,
}
