use thiserror::Error;

/// Errors produced by the sample selection pipeline.
///
/// Every fatal condition names the catalog (and key, where one is involved)
/// that triggered it; misconfigured context keys and malformed catalogs are
/// the dominant failure mode in practice.
#[derive(Error, Debug)]
pub enum SelectionError {
    /// The FWHM range estimator was handed an empty measurement array.
    #[error("no FWHM measurements to estimate a range from")]
    NoFwhmMeasurements,

    /// An extension's vignette stack is not a batch of 2D cutouts.
    #[error("vignettes in {catalog} should be 2D cutouts; saw a {ndim}-dimensional stack")]
    InvalidVignette { catalog: String, ndim: usize },

    /// A later extension's cutout shape disagrees with the size locked in
    /// by the first samples of the set.
    #[error("vignette size {found:?} in {catalog} does not match sample set size {expected:?}")]
    VignetteSizeMismatch {
        catalog: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// A required header key is absent from an extension.
    #[error("{key} parameter not found in the header of {catalog}")]
    MissingHeaderKey { key: String, catalog: String },

    /// A required header key holds text where a number is needed.
    #[error("{key} in the header of {catalog} is not numeric")]
    NonNumericHeaderKey { key: String, catalog: String },

    /// A required table column is absent from an extension.
    #[error("{key} column not found in the object table of {catalog}")]
    MissingColumn { key: String, catalog: String },

    /// Two columns of one object table disagree in length.
    #[error("column {column} in {catalog} has {found} rows, expected {expected}")]
    ColumnLengthMismatch {
        catalog: String,
        column: String,
        expected: usize,
        found: usize,
    },

    /// Every row of a catalog was rejected.
    #[error("no appropriate source found in {catalog}")]
    NoUsableSources { catalog: String },
}
