//! ddl-gen-entities library
//!
//! This crate turns SQL DDL schema sources into strongly typed Rust entity
//! models. Sources are parsed into raw per-file models, merged into a single
//! validated schema, resolved against configurable type-mapping rules, and
//! emitted as formatted Rust source artifacts.

#![deny(warnings)]
#![deny(missing_docs)]

pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod generator;
pub mod ingest;
pub mod model;
pub mod refine;
pub mod schema;
pub mod types;

use thiserror::Error;

pub use generator::{GenerateOutput, GenerateRequest, Phase};

/// Errors that can occur during code generation
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// A pipeline phase reported fatal diagnostics and the run was halted
    #[error("{phase} phase failed with {} diagnostic(s)", .diagnostics.len())]
    PhaseFailed {
        /// The phase that failed
        phase: Phase,
        /// Everything that phase diagnosed before the halt
        diagnostics: Vec<diagnostics::Diagnostic>,
    },

    /// General code generation failure
    #[error("Code generation failed: {0}")]
    CodeGen(String),
}

impl GeneratorError {
    /// The diagnostics behind this error, if it carries any.
    pub fn diagnostics(&self) -> &[diagnostics::Diagnostic] {
        match self {
            GeneratorError::PhaseFailed { diagnostics, .. } => diagnostics,
            GeneratorError::CodeGen(_) => &[],
        }
    }
}

/// Run the full generation pipeline for a request.
///
/// This is the main entry point for the code generator.
pub fn generate(request: &GenerateRequest) -> Result<GenerateOutput, GeneratorError> {
    generator::generate(request)
}
