//! Ingestor: raw schema text in, one raw model per source out.
//!
//! Each source is parsed in isolation; no state is shared between sources,
//! so the per-source work is independent by construction. Parse diagnostics
//! are collected per source and returned alongside the models; a source with
//! diagnostics still contributes whatever parsed cleanly.

pub mod lexer;
pub mod parser;

use crate::diagnostics::Diagnostic;
use crate::schema::RawModel;

pub use parser::parse_source;

/// One named unit of schema-definition text, already loaded by the caller.
#[derive(Debug, Clone)]
pub struct SchemaSource {
    /// Identifier for the source, typically a file path
    pub name: String,
    /// The schema-definition text itself
    pub text: String,
}

impl SchemaSource {
    /// Create a schema source.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Parse every source independently, accumulating diagnostics in source order.
pub fn ingest(sources: &[SchemaSource]) -> (Vec<RawModel>, Vec<Diagnostic>) {
    let mut models = Vec::with_capacity(sources.len());
    let mut diagnostics = Vec::new();

    for source in sources {
        let (model, mut source_diagnostics) = parse_source(&source.name, &source.text);
        tracing::debug!(
            source = %source.name,
            tables = model.tables.len(),
            views = model.views.len(),
            diagnostics = source_diagnostics.len(),
            "parsed schema source"
        );
        models.push(model);
        diagnostics.append(&mut source_diagnostics);
    }

    (models, diagnostics)
}
