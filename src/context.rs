//! Context variables: auxiliary scalars attached to each accepted sample.
//!
//! A context describes where a source sits in some parameter space (focal
//! plane position, airmass, ...) so the downstream fit can model PSF
//! variation. Each field's source is fixed once when the definition is
//! built and resolved once per extension, never per row.

use crate::catalog::Extension;
use crate::error::SelectionError;

/// Name prefix marking a field read from the extension header instead of
/// the object table.
pub const HEADER_PREFIX: char = ':';

/// Where a context field's scalar comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextSource {
    /// Per-row value from a named object-table column.
    TableColumn(String),
    /// One header value shared by every row of an extension.
    HeaderKey(String),
    /// Externally computed principal-component value, supplied per catalog.
    PrincipalComponent(usize),
}

/// One named context field.
#[derive(Debug, Clone)]
pub struct ContextField {
    pub name: String,
    pub source: ContextSource,
}

/// Ordered context definition shared by all samples of a run.
#[derive(Debug, Clone, Default)]
pub struct Context {
    fields: Vec<ContextField>,
}

impl Context {
    /// Build a context from configured field names, with
    /// `n_principal_components` externally-supplied fields appended after
    /// them. A leading `:` selects the header as the field's source.
    pub fn new(names: &[String], n_principal_components: usize) -> Self {
        let mut fields: Vec<ContextField> = names
            .iter()
            .map(|name| {
                let source = match name.strip_prefix(HEADER_PREFIX) {
                    Some(key) => ContextSource::HeaderKey(key.to_string()),
                    None => ContextSource::TableColumn(name.clone()),
                };
                ContextField {
                    name: name.clone(),
                    source,
                }
            })
            .collect();
        for pc in 0..n_principal_components {
            fields.push(ContextField {
                name: format!("PC{}", pc + 1),
                source: ContextSource::PrincipalComponent(pc),
            });
        }
        Self { fields }
    }

    /// Number of context fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[ContextField] {
        &self.fields
    }

    /// Field names in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Resolve every field against one extension. Fails fast when a used
    /// header key, table column, or principal-component value is absent.
    pub fn resolve<'t>(
        &self,
        extension: &'t Extension,
        pc_values: &[f64],
        catalog: &str,
    ) -> Result<Vec<ContextValues<'t>>, SelectionError> {
        self.fields
            .iter()
            .map(|field| match &field.source {
                ContextSource::TableColumn(name) => extension
                    .table
                    .require_column(name, catalog)
                    .map(ContextValues::PerRow),
                ContextSource::HeaderKey(key) => extension
                    .header
                    .require_f64(key, catalog)
                    .map(ContextValues::Shared),
                ContextSource::PrincipalComponent(index) => pc_values
                    .get(*index)
                    .copied()
                    .map(ContextValues::Shared)
                    .ok_or_else(|| SelectionError::MissingColumn {
                        key: field.name.clone(),
                        catalog: catalog.to_string(),
                    }),
            })
            .collect()
    }
}

/// Context values of one extension after resolution.
#[derive(Debug, Clone)]
pub enum ContextValues<'t> {
    /// Same value for every row (header fields, principal components).
    Shared(f64),
    /// One value per row (table columns).
    PerRow(&'t [f64]),
}

impl ContextValues<'_> {
    /// Value for the given row.
    pub fn at(&self, row: usize) -> f64 {
        match self {
            ContextValues::Shared(v) => *v,
            ContextValues::PerRow(column) => column[row],
        }
    }
}
