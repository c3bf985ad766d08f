//! Pipeline orchestrator.
//!
//! Runs the phases in order (ingest, refine, rule compilation, transform,
//! emit) and halts at the first phase that reports a fatal diagnostic, so no
//! phase ever runs on input a prior phase rejected. Output is a map ordered by
//! artifact name; given the same request, two runs produce byte-identical
//! output.

use std::collections::BTreeMap;

use crate::codegen;
use crate::config::GeneratorConfig;
use crate::diagnostics::{any_fatal, Diagnostic, DiagnosticKind};
use crate::ingest::{self, SchemaSource};
use crate::model;
use crate::refine;
use crate::types::RuleSet;
use crate::GeneratorError;

/// The pipeline phase a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Parsing schema sources into raw models
    Ingest,
    /// Merging and cross-referencing raw models
    Refine,
    /// Compiling the configured type-mapping rules
    CompileRules,
    /// Building target entity models
    Transform,
    /// Emitting artifacts
    Emit,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Ingest => "ingest",
            Phase::Refine => "refine",
            Phase::CompileRules => "rule compilation",
            Phase::Transform => "transform",
            Phase::Emit => "emit",
        };
        f.write_str(name)
    }
}

/// Everything one pipeline run needs: schema sources plus configuration.
#[derive(Debug, Default)]
pub struct GenerateRequest {
    /// Schema sources, processed in the order given
    pub sources: Vec<SchemaSource>,
    /// Type-mapping rules and value-set designations
    pub config: GeneratorConfig,
}

/// The output of a successful pipeline run.
#[derive(Debug, Default)]
pub struct GenerateOutput {
    /// Generated artifacts keyed by name, ordered for deterministic writing
    pub artifacts: BTreeMap<String, String>,
}

/// Run the full generation pipeline.
pub fn generate(request: &GenerateRequest) -> Result<GenerateOutput, GeneratorError> {
    tracing::info!(sources = request.sources.len(), "starting generation");

    let (raw_models, diagnostics) = ingest::ingest(&request.sources);
    if any_fatal(&diagnostics) {
        return Err(GeneratorError::PhaseFailed {
            phase: Phase::Ingest,
            diagnostics,
        });
    }

    let schema = refine::refine(raw_models).map_err(|diagnostics| GeneratorError::PhaseFailed {
        phase: Phase::Refine,
        diagnostics,
    })?;

    let rules = RuleSet::compile(&request.config.rules).map_err(|diagnostics| {
        GeneratorError::PhaseFailed {
            phase: Phase::CompileRules,
            diagnostics,
        }
    })?;

    let entities = model::transform(&schema, &rules, &request.config);
    tracing::info!(entities = entities.len(), "transformed schema");

    let mut artifacts = BTreeMap::new();
    // Artifact name -> display name of the entity that produced it, kept so a
    // collision can implicate both parties.
    let mut owners: BTreeMap<String, String> = BTreeMap::new();
    let mut emit_diagnostics = Vec::new();

    // One entity failing to render must not keep the rest from being checked,
    // so per-entity failures accumulate like collisions do.
    for entity in &entities {
        let entity_artifacts = match codegen::generate_entity(entity) {
            Ok(entity_artifacts) => entity_artifacts,
            Err(GeneratorError::CodeGen(message)) => {
                emit_diagnostics.push(Diagnostic::new(
                    DiagnosticKind::Emission,
                    format!("{}: {}", entity.name, message),
                ));
                continue;
            }
            Err(other) => return Err(other),
        };
        for artifact in entity_artifacts {
            match owners.get(&artifact.name) {
                Some(previous) => emit_diagnostics.push(Diagnostic::new(
                    DiagnosticKind::OutputCollision,
                    format!(
                        "artifact '{}' is produced by both {} and {}",
                        artifact.name, previous, entity.name
                    ),
                )),
                None => {
                    owners.insert(artifact.name.clone(), entity.name.to_string());
                    artifacts.insert(artifact.name, artifact.content);
                }
            }
        }
    }

    if !emit_diagnostics.is_empty() {
        return Err(GeneratorError::PhaseFailed {
            phase: Phase::Emit,
            diagnostics: emit_diagnostics,
        });
    }

    tracing::info!(artifacts = artifacts.len(), "generation complete");
    Ok(GenerateOutput { artifacts })
}
